//! Fixtures shared by the integration tests.

#![allow(dead_code)]

use std::path::Path;

use transit_db::{AccountRecord, Database, RouteRecord, StaffRecord, VehicleRecord};
use transit_ledger::{Ledger, LedgerConfig};

pub const ACCOUNTS: &[&str] = &["A1", "A2", "A3", "A4", "A5", "A6", "ADMIN"];

/// Accounts A1..A6 and ADMIN, staff S1 and S2, vehicle V1, route R1.
pub async fn seed_reference(db: &Database) {
    let refs = db.reference();
    for (i, id) in ACCOUNTS.iter().enumerate() {
        refs.insert_account(&AccountRecord {
            id: (*id).into(),
            document: format!("10000000{:02}", i),
            full_name: format!("Account {id}"),
        })
        .await
        .unwrap();
    }
    for id in ["S1", "S2"] {
        refs.insert_staff(&StaffRecord {
            id: id.into(),
            full_name: format!("Staff {id}"),
            role: "operator".into(),
            status: "active".into(),
        })
        .await
        .unwrap();
    }
    refs.insert_vehicle(&VehicleRecord {
        id: "V1".into(),
        kind: "metro".into(),
        plate: "MTR001".into(),
        capacity: 1000,
        status: "active".into(),
    })
    .await
    .unwrap();
    refs.insert_route(&RouteRecord {
        id: "R1".into(),
        name: "North Route".into(),
        origin: "Niquia".into(),
        destination: "La Estrella".into(),
        status: "active".into(),
    })
    .await
    .unwrap();
}

/// In-memory ledger with reference data.
pub async fn memory_ledger(configure: impl FnOnce(&mut LedgerConfig)) -> Ledger {
    let mut config = LedgerConfig::in_memory();
    config.ledger.retry_backoff_ms = 1;
    configure(&mut config);
    let ledger = Ledger::open(&config).await.unwrap();
    seed_reference(ledger.database()).await;
    ledger
}

/// On-disk ledger with a multi-connection pool and reference data.
pub async fn file_ledger(dir: &Path, configure: impl FnOnce(&mut LedgerConfig)) -> Ledger {
    let mut config = LedgerConfig::default();
    config.database.path = dir.join("ledger.db");
    config.database.max_connections = 8;
    config.ledger.retry_backoff_ms = 5;
    configure(&mut config);
    let ledger = Ledger::open(&config).await.unwrap();
    seed_reference(ledger.database()).await;
    ledger
}
