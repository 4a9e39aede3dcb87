//! Fixtures shared by the in-crate tests.

use chrono::Utc;
use uuid::Uuid;

use crate::repository::reference::{AccountRecord, RouteRecord, StaffRecord, VehicleRecord};
use crate::{Database, DbConfig};
use transit_core::{Assignment, Card, CardClass, CardStatus, Money, TransactionKind};

/// In-memory database with a small reference fixture:
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

/// Issues a card directly through a unit, recording a seed recharge when
/// `seed_cents` is non-zero.
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

/// An admin-style assignment with no originating transaction.
pub(crate) fn assignment(account: &str, staff: &str, vehicle: &str, route: &str) -> Assignment {
    let now = Utc::now();
    Assignment {
        id: Uuid::new_v4().to_string(),
        account_id: account.into(),
        staff_id: staff.into(),
        vehicle_id: vehicle.into(),
        route_id: route.into(),
        transaction_id: None,
        created_at: now,
        updated_at: now,
    }
}
