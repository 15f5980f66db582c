//! # Seed Data Generator
//!
//! Populates a development database with reference data and sample drafts.
//!
//! ## Usage
//! ```bash
//! # Reference data plus 40 sample documents (default)
//! cargo run -p lanna-db --bin seed
//!
//! # More documents
//! cargo run -p lanna-db --bin seed -- --documents 200
//!
//! # Specify database path
//! cargo run -p lanna-db --bin seed -- --db ./data/lanna.db
//! ```
//!
//! ## Generated Data
//! - Suppliers and locations with Thai names
//! - SKUs: `{GROUP}-{NNN}`
//! - Delivery notes and tax invoices in DRAFT, spread over January 2025,
//!   every fourth delivery note posted so the list screens show mixed status

use chrono::NaiveDate;
use lanna_core::{
    DnDraftPayload, DnLineInput, DocumentKind, DomainHint, Money, Quantity, TaxRate,
    TiDraftPayload, TiLineInput,
};
use lanna_db::{Database, DbConfig};
use std::env;

const SUPPLIERS: &[(&str, &str)] = &[
    ("SUP-001", "บริษัท สยามฟู้ด จำกัด"),
    ("SUP-002", "ห้างหุ้นส่วน เชียงใหม่ค้าข้าว"),
    ("SUP-003", "Lanna Beverage Co., Ltd."),
    ("SUP-004", "บริษัท ดอยคำ ซัพพลาย จำกัด"),
];

const LOCATIONS: &[(&str, &str)] = &[
    ("WH-MAIN", "คลังสินค้าหลัก"),
    ("SHOP-01", "หน้าร้าน นิมมาน"),
    ("SHOP-02", "หน้าร้าน สันทราย"),
];

/// SKU groups: (prefix, names)
const SKU_GROUPS: &[(&str, &[&str])] = &[
    ("RICE", &["Jasmine rice 5kg", "Sticky rice 2kg", "Brown rice 1kg"]),
    ("BEV", &["Drinking water 600ml", "Soy milk 300ml", "Thai tea 500ml"]),
    ("SAUCE", &["Fish sauce 700ml", "Oyster sauce 600ml", "Soy sauce 500ml"]),
    ("DRY", &["Rice noodles 400g", "Dried chili 100g", "Palm sugar 1kg"]),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut documents: usize = 40;
    let mut db_path = String::from("./lanna_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--documents" | "-n" => {
                if i + 1 < args.len() {
                    documents = args[i + 1].parse().unwrap_or(40);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Lanna Back-Office Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -n, --documents <N>  Sample documents to generate (default: 40)");
                println!("  -d, --db <PATH>      Database file path (default: ./lanna_dev.db)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Lanna Back-Office Seed Data Generator");
    println!("========================================");
    println!("Database:  {}", db_path);
    println!("Documents: {}", documents);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.suppliers().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} suppliers", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Reference data
    let mut supplier_ids = Vec::new();
    for (code, name) in SUPPLIERS {
        supplier_ids.push(db.suppliers().insert(code, name).await?.id);
    }
    let mut location_ids = Vec::new();
    for (code, name) in LOCATIONS {
        location_ids.push(db.locations().insert(code, name).await?.id);
    }
    let mut sku_ids = Vec::new();
    for (prefix, names) in SKU_GROUPS {
        for (idx, name) in names.iter().enumerate() {
            let code = format!("{}-{:03}", prefix, idx + 1);
            sku_ids.push(db.skus().insert(&code, name).await?.id);
        }
    }

    println!(
        "✓ Reference data: {} suppliers, {} locations, {} SKUs",
        supplier_ids.len(),
        location_ids.len(),
        sku_ids.len()
    );

    println!();
    println!("Generating documents...");

    let start = std::time::Instant::now();
    let gate = db.status_gate();
    let mut posted = 0;

    for n in 0..documents {
        let supplier_id = supplier_ids[n % supplier_ids.len()].clone();
        let location_id = location_ids[n % location_ids.len()].clone();
        let doc_date = NaiveDate::from_ymd_opt(2025, 1, (n % 31) as u32 + 1)
            .ok_or("invalid seed date")?;
        let line_count = 1 + n % 4;

        if n % 2 == 0 {
            let lines = (0..line_count)
                .map(|l| DnLineInput {
                    line_no: l as u32 + 1,
                    sku_id: sku_ids[(n + l) % sku_ids.len()].clone(),
                    quantity: Quantity::from_units(((n + l) % 12 + 1) as i64),
                    provisional_unit_cost: (l % 2 == 0)
                        .then(|| Money::from_satang(((n * 37 + l * 11) % 5_000 + 500) as i64)),
                })
                .collect();

            let id = db
                .delivery_notes()
                .save_draft(&DnDraftPayload {
                    id: None,
                    supplier_id,
                    location_id,
                    doc_no: Some(format!("DN-2501-{:04}", n + 1)),
                    doc_date,
                    remark: None,
                    domain_hint: if n % 3 == 0 { DomainHint::NonTax } else { DomainHint::Taxed },
                    status: None,
                    idempotency_key: None,
                    lines,
                })
                .await?;

            if n % 4 == 0 {
                gate.post(DocumentKind::DeliveryNote, &id, "seed").await?;
                posted += 1;
            }
        } else {
            let lines = (0..line_count)
                .map(|l| TiLineInput {
                    line_no: l as u32 + 1,
                    sku_id: sku_ids[(n + l) % sku_ids.len()].clone(),
                    quantity: Quantity::from_units(((n + l) % 12 + 1) as i64),
                    unit_cost: Money::from_satang(((n * 41 + l * 13) % 5_000 + 500) as i64),
                    line_discount: Money::zero(),
                    tax_rate: TaxRate::THAI_VAT,
                })
                .collect();

            db.tax_invoices()
                .save_draft(&TiDraftPayload {
                    id: None,
                    supplier_id,
                    location_id,
                    doc_no: Some(format!("TI-2501-{:04}", n + 1)),
                    doc_date,
                    remark: None,
                    discount_amount: Money::zero(),
                    freight_amount: if n % 5 == 0 { Money::from_baht_satang(150, 0) } else { Money::zero() },
                    other_charge_amount: Money::zero(),
                    status: None,
                    idempotency_key: None,
                    lines,
                })
                .await?;
        }

        if (n + 1) % 20 == 0 {
            println!("  Generated {} documents...", n + 1);
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!(
        "✓ Generated {} documents ({} delivery notes posted) in {:?}",
        documents, posted, elapsed
    );
    println!(
        "  Pending document events: {}",
        db.document_events().count_pending().await?
    );

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
