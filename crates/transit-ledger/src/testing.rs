//! Fixtures shared by the in-crate tests.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use transit_core::{Card, CardClass, CardStatus, FarePolicy, Money, TransactionKind};
use transit_db::{AccountRecord, Database, DbConfig, RouteRecord, StaffRecord, VehicleRecord};

use crate::audit::{AuditRecorder, SqliteAuditSink};
use crate::card::CardService;
use crate::collaborators::SqliteDirectory;
use crate::recorder::TransactionRecorder;
use crate::retry::RetryPolicy;
use crate::selector::Selector;
use crate::trip::TripWorkflow;

/// In-memory store with:
///
/// - accounts A1, A2, A3 and ADMIN
/// - staff S1, S2 (active) and S3 (inactive)
/// - vehicles V1, V2 (active) and V3 (inactive)
/// - routes R1, R2
pub(crate) async fn seeded_db() -> Database {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let refs = db.reference();

    for (id, document) in [
        ("A1", "1000000001"),
        ("A2", "1000000002"),
        ("A3", "1000000003"),
        ("ADMIN", "9999999999"),
    ] {
        refs.insert_account(&AccountRecord {
            id: id.into(),
            document: document.into(),
            full_name: format!("Account {id}"),
        })
        .await
        .unwrap();
    }

    for (id, status) in [("S1", "active"), ("S2", "active"), ("S3", "inactive")] {
        refs.insert_staff(&StaffRecord {
            id: id.into(),
            full_name: format!("Staff {id}"),
            role: "conductor".into(),
            status: status.into(),
        })
        .await
        .unwrap();
    }

    for (id, status) in [("V1", "active"), ("V2", "active"), ("V3", "inactive")] {
        refs.insert_vehicle(&VehicleRecord {
            id: id.into(),
            kind: "metro".into(),
            plate: format!("PL-{id}"),
            capacity: 100,
            status: status.into(),
        })
        .await
        .unwrap();
    }

    for id in ["R1", "R2"] {
        refs.insert_route(&RouteRecord {
            id: id.into(),
            name: format!("Route {id}"),
            origin: "North".into(),
            destination: "West".into(),
            status: "active".into(),
        })
        .await
        .unwrap();
    }

    db
}

/// Inserts a standard card straight through a unit, bypassing the service.
/// A positive seed is booked as a recharge.
pub(crate) async fn issue(db: &Database, account_id: &str, card_number: &str, seed_cents: i64) -> Card {
    let now = Utc::now();
    let card = Card {
        id: Uuid::new_v4().to_string(),
        card_number: card_number.into(),
        account_id: account_id.into(),
        card_class: CardClass::Standard,
        status: CardStatus::Active,
        balance_cents: seed_cents,
        last_recharge_at: (seed_cents > 0).then_some(now),
        created_at: now,
        updated_at: now,
    };

    let mut unit = db.begin_unit().await.unwrap();
    unit.insert_card(&card).await.unwrap();
    if seed_cents > 0 {
        unit.insert_transaction(card_number, TransactionKind::Recharge, Money::from_cents(seed_cents))
            .await
            .unwrap();
    }
    unit.commit().await.unwrap();
    card
}

fn selector(seed: Option<u64>) -> Arc<Selector> {
    Arc::new(Selector::from_seed(seed))
}

fn audit(db: &Database) -> Arc<AuditRecorder> {
    Arc::new(AuditRecorder::new(Arc::new(SqliteAuditSink::new(db.audit()))))
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(2, Duration::from_millis(1))
}

pub(crate) fn card_service(db: &Database, seed: Option<u64>) -> CardService {
    CardService::new(
        db.clone(),
        Arc::new(SqliteDirectory::new(db.reference())),
        TransactionRecorder::new(db.clone()),
        audit(db),
        selector(seed),
        fast_retry(),
        5,
    )
}

pub(crate) fn trip_workflow(db: &Database, seed: Option<u64>) -> TripWorkflow {
    let directory = Arc::new(SqliteDirectory::new(db.reference()));
    TripWorkflow::new(
        db.clone(),
        directory.clone(),
        directory,
        TransactionRecorder::new(db.clone()),
        audit(db),
        selector(seed),
        FarePolicy::default(),
        fast_retry(),
    )
}
