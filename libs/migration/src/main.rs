//! Schema CLI for the booking database, e.g. `cargo run -p migration -- up`.

use sea_orm_migration::cli;

#[tokio::main]
async fn main() {
    cli::run_cli(migration::Migrator).await;
}
