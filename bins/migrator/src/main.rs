//! Database migration runner for Dossier.
//!
//! Reads `DATABASE_URL` from the environment or `.env`.
//!
//! Usage:
//!   migrator up      - Create the documents table
//!   migrator down    - Drop it again
//!   migrator status  - Show migration status

use sea_orm_migration::prelude::*;
use dossier_db::migration::Migrator;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    cli::run_cli(Migrator).await;
}
