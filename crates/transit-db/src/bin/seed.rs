//! # Seed Data Generator
//!
//! Populates the reference tables (accounts, staff, vehicles, routes) and two
//! starter cards for local development.
//!
//! ## Usage
//! ```bash
//! # Seed ./transit_dev.db
//! cargo run -p transit-db --bin seed
//!
//! # Specify database path
//! cargo run -p transit-db --bin seed -- --db ./data/ledger.db
//!
//! # Reference tables only
//! cargo run -p transit-db --bin seed -- --no-cards
//! ```
//!
//! Every insert is idempotent; running the binary twice changes nothing.

use anyhow::Context;
use chrono::Utc;
use std::env;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use transit_core::{Card, CardClass, CardStatus, Money, TransactionKind};
use transit_db::{
    AccountRecord, Database, DbConfig, RouteRecord, StaffRecord, VehicleRecord,
};

/// (id, document, full name)
const ACCOUNTS: &[(&str, &str, &str)] = &[
    ("acct-1152717416", "1152717416", "Cristian Calle"),
    ("acct-1152717417", "1152717417", "Laura Martinez"),
];

/// (id, full name, role)
const STAFF: &[(&str, &str, &str)] = &[
    ("staff-1001", "Juan Gomez", "operator"),
    ("staff-1002", "Ana Lopez", "supervisor"),
];

/// (id, kind, plate, capacity)
const VEHICLES: &[(&str, &str, &str, i64)] = &[
    ("veh-mtr001", "metro", "MTR001", 1000),
    ("veh-mtr002", "metro", "MTR002", 1000),
    ("veh-trv001", "tram", "TRV001", 300),
    ("veh-mcb001", "cable_car", "MCB001", 50),
    ("veh-mcb002", "cable_car", "MCB002", 50),
];

/// (id, name, origin, destination)
const ROUTES: &[(&str, &str, &str, &str)] = &[
    ("route-north", "North Route", "Niquia", "La Estrella"),
    ("route-west", "West Route", "San Javier", "Estrella"),
];

/// (account id, card number, class, opening balance in cents)
const CARDS: &[(&str, &str, CardClass, i64)] = &[
    ("acct-1152717416", "1234567890123456", CardClass::Standard, 5000),
    ("acct-1152717417", "6543210987654321", CardClass::Student, 3000),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./transit_dev.db");
    let mut with_cards = true;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--no-cards" => with_cards = false,
            "--help" | "-h" => {
                println!("Transit Ledger Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./transit_dev.db)");
                println!("      --no-cards     Seed reference tables only");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            other => warn!(argument = %other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    let db = Database::new(DbConfig::new(&db_path))
        .await
        .with_context(|| format!("opening {db_path}"))?;
    info!(path = %db_path, "Connected, migrations applied");

    let refs = db.reference();

    let mut inserted = 0usize;
    for (id, document, full_name) in ACCOUNTS {
        let record = AccountRecord {
            id: (*id).into(),
            document: (*document).into(),
            full_name: (*full_name).into(),
        };
        inserted += refs.insert_account(&record).await? as usize;
    }
    info!(inserted, "Accounts seeded");

    let mut inserted = 0usize;
    for (id, full_name, role) in STAFF {
        let record = StaffRecord {
            id: (*id).into(),
            full_name: (*full_name).into(),
            role: (*role).into(),
            status: "active".into(),
        };
        inserted += refs.insert_staff(&record).await? as usize;
    }
    info!(inserted, "Staff seeded");

    let mut inserted = 0usize;
    for (id, kind, plate, capacity) in VEHICLES {
        let record = VehicleRecord {
            id: (*id).into(),
            kind: (*kind).into(),
            plate: (*plate).into(),
            capacity: *capacity,
            status: "active".into(),
        };
        inserted += refs.insert_vehicle(&record).await? as usize;
    }
    info!(inserted, "Vehicles seeded");

    let mut inserted = 0usize;
    for (id, name, origin, destination) in ROUTES {
        let record = RouteRecord {
            id: (*id).into(),
            name: (*name).into(),
            origin: (*origin).into(),
            destination: (*destination).into(),
            status: "active".into(),
        };
        inserted += refs.insert_route(&record).await? as usize;
    }
    info!(inserted, "Routes seeded");

    if with_cards {
        seed_cards(&db).await?;
    }

    info!("Seed complete");
    Ok(())
}

/// Issues the starter cards with an opening recharge so that each card's
/// ledger sums to its balance.
async fn seed_cards(db: &Database) -> anyhow::Result<()> {
    for (account_id, card_number, class, opening) in CARDS {
        if db.cards().get_by_account(account_id).await?.is_some() {
            info!(account_id = %account_id, "Card already issued, skipping");
            continue;
        }

        let now = Utc::now();
        let card = Card {
            id: Uuid::new_v4().to_string(),
            card_number: (*card_number).into(),
            account_id: (*account_id).into(),
            card_class: *class,
            status: CardStatus::Active,
            balance_cents: *opening,
            last_recharge_at: Some(now),
            created_at: now,
            updated_at: now,
        };

        let mut unit = db.begin_unit().await?;
        unit.insert_card(&card).await?;
        unit.insert_transaction(card_number, TransactionKind::Recharge, Money::from_cents(*opening))
            .await?;
        unit.commit().await?;

        info!(card_number = %card_number, balance = %card.balance(), "Card issued");
    }
    Ok(())
}
