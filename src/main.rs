use chrono::Utc;
use dotenvy::dotenv;
use gear_tracker::{
    config::{database, settings},
    core::{item, ledger},
    errors::Result,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, non-fatal since env vars can be set externally
    dotenv().ok();

    // 3. Load depreciation policy and seed items
    let config = settings::load_default_config()
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;

    // 4. Connect and make sure the schema exists
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db).await?;

    // 5. Seed an empty inventory from config.toml
    item::seed_items(&db, &config.items).await?;

    // 6. Report the current valuation
    let (rows, valuation) =
        ledger::generate_ledger(&db, &config.depreciation, Utc::now().naive_utc()).await?;
    info!(
        "{} items: purchase value {}, book value {}, {} fully depreciated, {} not computable",
        rows.len(),
        valuation.total_purchase_value,
        valuation.total_book_value,
        valuation.fully_depreciated_items,
        valuation.not_computable_items
    );
    for (status, count) in &valuation.items_by_status {
        info!("  {:?}: {}", status, count);
    }

    Ok(())
}
