use clap::Subcommand;
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

use super::database::connect;
use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::database::models::Package;
use crate::database::{seed_packages, PackageStore, PgStore};

#[derive(Subcommand)]
pub enum PackageCommands {
    #[command(about = "List subscription packages")]
    List,

    #[command(about = "Create or replace a package by name")]
    Upsert {
        #[arg(help = "Package name")]
        name: String,

        #[arg(long, help = "Employee limit granted by the package")]
        limit: i32,

        #[arg(long, help = "Price in major currency units, e.g. 15.00")]
        price: Decimal,

        #[arg(long = "feature", help = "Feature line shown to customers (repeatable)")]
        features: Vec<String>,
    },

    #[command(about = "Insert the default Basic, Standard and Premium packages")]
    Seed,
}

pub async fn handle(cmd: PackageCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let store = PgStore::new(connect().await?);

    match cmd {
        PackageCommands::List => {
            let packages = store.list_packages().await?;
            if packages.is_empty() {
                return output_empty_collection(&output_format, "packages", "No packages configured");
            }

            match output_format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&json!({ "packages": packages }))?);
                }
                OutputFormat::Text => {
                    println!("{:<15} {:>8} {:>10}  {}", "NAME", "LIMIT", "PRICE", "FEATURES");
                    println!("{}", "-".repeat(60));
                    for p in &packages {
                        println!("{:<15} {:>8} {:>10}  {}", p.name, p.employee_limit, p.price, p.features.join(", "));
                    }
                }
            }
            Ok(())
        }
        PackageCommands::Upsert { name, limit, price, features } => {
            if limit < 0 || price.is_sign_negative() {
                anyhow::bail!("limit and price must not be negative");
            }
            let package = store
                .upsert_package(Package { id: Uuid::new_v4(), name, employee_limit: limit, price, features })
                .await?;
            output_success(
                &output_format,
                &format!("Package '{}' saved", package.name),
                Some(json!({ "package": package })),
            )
        }
        PackageCommands::Seed => {
            let saved = seed_packages(&store).await?;
            output_success(
                &output_format,
                &format!("Seeded {} packages", saved.len()),
                Some(json!({ "packages": saved })),
            )
        }
    }
}
