//! # Seed Data Generator
//!
//! Populates a database with a small catalog for trying the sale engine.
//!
//! ## Usage
//! ```bash
//! cargo run -p till-db --bin seed
//!
//! # Specify database path
//! cargo run -p till-db --bin seed -- --db ./data/till.db
//! ```
//!
//! ## Generated Catalog
//! - Payment methods: Cash, PIX, Credit Card, Debit Card
//! - Fixed-price products with tracked stock
//! - Fixed-price products with untracked stock (made to order)
//! - Variable-price products (priced at the till)
//! - Add-on categories, add-ons, and which products accept them

use anyhow::Context;
use std::env;
use till_db::{Database, DbConfig, NewProduct};

const PAYMENT_METHODS: &[&str] = &["Cash", "PIX", "Credit Card", "Debit Card"];

/// (name, price in cents, stock; `None` = untracked, category)
const FIXED_PRODUCTS: &[(&str, i64, Option<i64>, &str)] = &[
    ("Burger", 1000, Some(50), "Kitchen"),
    ("Cheeseburger", 1200, Some(40), "Kitchen"),
    ("Hot Dog", 800, Some(30), "Kitchen"),
    ("French Fries", 600, None, "Kitchen"),
    ("Soda Can", 500, Some(120), "Drinks"),
    ("Orange Juice", 700, None, "Drinks"),
    ("Mineral Water", 300, Some(200), "Drinks"),
];

const VARIABLE_PRODUCTS: &[(&str, &str)] = &[("Self-Service Buffet", "Kitchen"), ("Cake by Weight", "Bakery")];

/// (category, add-ons as (name, price in cents), products that accept it)
const ADD_ONS: &[(&str, &[(&str, i64)], &[&str])] = &[
    (
        "Burger Extras",
        &[("Extra Cheese", 200), ("Bacon", 300), ("Fried Egg", 250)],
        &["Burger", "Cheeseburger"],
    ),
    (
        "Sauces",
        &[("Ketchup", 0), ("Garlic Mayo", 150), ("Barbecue", 150)],
        &["Burger", "Cheeseburger", "Hot Dog", "French Fries"],
    ),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./till_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Till POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./till_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Till POS Seed Data Generator");
    println!("===============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path))
        .await
        .with_context(|| format!("opening {db_path}"))?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.catalog().count_products().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let catalog = db.catalog();

    println!();
    println!("Payment methods...");
    for name in PAYMENT_METHODS {
        let method = catalog.insert_payment_method(name).await?;
        println!("  #{} {}", method.id, method.name);
    }

    println!();
    println!("Products...");
    let mut product_ids = Vec::new();
    for (name, price_cents, stock, category) in FIXED_PRODUCTS {
        let mut product = NewProduct::fixed(*name, *price_cents).category(*category);
        if let Some(count) = stock {
            product = product.stock(*count);
        }
        let product = catalog.insert_product(&product).await?;
        println!("  #{} {} {} (stock {:?})", product.id, product.name, product.price(), product.stock);
        product_ids.push((product.name.clone(), product.id));
    }
    for (name, category) in VARIABLE_PRODUCTS {
        let product = catalog
            .insert_product(&NewProduct::variable(*name).category(*category))
            .await?;
        println!("  #{} {} (variable price)", product.id, product.name);
        product_ids.push((product.name.clone(), product.id));
    }

    println!();
    println!("Add-ons...");
    for (category_name, add_ons, accepted_by) in ADD_ONS {
        let category = catalog.insert_additional_category(category_name).await?;
        println!("  {} (#{})", category.name, category.id);

        for (name, price_cents) in add_ons.iter() {
            let add_on = catalog.insert_additional(name, *price_cents, category.id).await?;
            println!("    #{} {} {}", add_on.id, add_on.name, till_core::Money::from_cents(add_on.price_cents));
        }

        for product_name in accepted_by.iter() {
            let Some((_, product_id)) = product_ids.iter().find(|(name, _)| name == product_name) else {
                eprintln!("Unknown product {} for {}", product_name, category.name);
                continue;
            };
            catalog.allow_category(*product_id, category.id).await?;
        }
    }

    db.close().await;

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
