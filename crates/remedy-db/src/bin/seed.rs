//! # Development Seeder
//!
//! Fills a database with a small pharmacy catalog and opens a shift, so a
//! checkout can be exercised immediately after a fresh clone.
//!
//! ```bash
//! cargo run -p remedy-db --bin seed
//! cargo run -p remedy-db --bin seed -- --db ./data/remedy.db
//! ```
//!
//! Every product gets two batches with staggered expiry dates; the FEFO
//! selector needs a choice to make, or demos prove nothing.

use std::env;

use chrono::{Duration, Utc};
use remedy_core::types::Batch;
use remedy_db::{Database, DbConfig};
use uuid::Uuid;

/// product, category, code, pack price (cents), units per pack, packs per batch
const CATALOG: &[(&str, &str, &str, i64, i64, i64)] = &[
    ("Paracetamol 500mg", "analgesics", "PCM-500", 500, 10, 40),
    ("Ibuprofen 200mg", "analgesics", "IBU-200", 650, 10, 30),
    ("Amoxicillin 500mg", "antibiotics", "AMX-500", 2000, 10, 20),
    ("Azithromycin 250mg", "antibiotics", "AZT-250", 3200, 6, 15),
    ("Cetirizine 10mg", "antihistamines", "CTZ-010", 450, 10, 25),
    ("Loratadine 10mg", "antihistamines", "LRT-010", 520, 10, 25),
    ("Omeprazole 20mg", "antacids", "OMP-020", 1400, 14, 20),
    ("Cough Syrup 120ml", "syrups", "CSY-120", 850, 1, 30),
    ("ORS Sachets", "rehydration", "ORS-001", 300, 20, 50),
    ("Vitamin C 500mg", "supplements", "VTC-500", 950, 20, 35),
];

const DEFAULT_DB_PATH: &str = "./remedy_dev.db";

fn print_usage() {
    println!("Remedy POS development seeder");
    println!();
    println!("Usage: seed [--db <PATH>]");
    println!();
    println!("  -d, --db <PATH>   database file (default: {})", DEFAULT_DB_PATH);
    println!("  -h, --help        this message");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut db_path = String::from(DEFAULT_DB_PATH);
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--db" | "-d" => {
                db_path = args.next().unwrap_or(db_path);
            }
            "--help" | "-h" => {
                print_usage();
                return Ok(());
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                print_usage();
                std::process::exit(2);
            }
        }
    }

    println!("Seeding {} ...", db_path);

    let db = Database::new(DbConfig::new(&db_path)).await?;

    let mut seeded = 0;
    for (idx, (name, category, code, pack_price_cents, units_per_pack, packs)) in
        CATALOG.iter().enumerate()
    {
        // One batch expiring within months, one comfortably later.
        let expiries = [
            Utc::now().date_naive() + Duration::days(60 + 7 * idx as i64),
            Utc::now().date_naive() + Duration::days(300 + 11 * idx as i64),
        ];

        for (batch_no, expiry) in expiries.iter().enumerate() {
            let batch = Batch {
                id: Uuid::new_v4().to_string(),
                product_name: name.to_string(),
                stock_units: packs * units_per_pack,
                pack_price_cents: *pack_price_cents,
                cost_cents: Some(pack_price_cents * 70 / 100),
                units_per_pack: *units_per_pack,
                expiry_date: *expiry,
                max_discount_bps: 1000,
                barcode: Some(format!("590{:04}{:03}{:03}", idx, batch_no, units_per_pack)),
                internal_code: Some(format!("{}-{}", code, batch_no + 1)),
                category: Some(category.to_string()),
            };

            db.batches().put(&batch).await?;
            seeded += 1;
        }
    }

    println!("  {} batches across {} products", seeded, CATALOG.len());

    match db.shifts().get_open().await? {
        Some(shift) => println!("  shift already open ({})", shift.id),
        None => {
            let shift = db.shifts().open_shift("seed-operator").await?;
            println!("  opened shift {}", shift.id);
        }
    }

    println!("Done.");
    Ok(())
}
