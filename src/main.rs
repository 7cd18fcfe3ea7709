use std::sync::Arc;

use clap::Parser;
use tracing::{debug, info};

use rulestore::adapter::{Adapter, DocumentAdapter};
use rulestore::cli::{Cli, Command};
use rulestore::observability::init_tracing;
use rulestore::policy::{load_policy_file, Model};
use rulestore::storage::PostgresStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse configuration
    let cli = Cli::parse();
    let config = cli.config;

    // Initialize tracing
    init_tracing(&config.log_level);

    debug!(
        version = env!("CARGO_PKG_VERSION"),
        collection = %config.collection,
        "Starting rulestore"
    );

    let store = PostgresStore::connect(
        &config.database_url,
        config.min_connections,
        config.max_connections,
    )
    .await?;

    if config.run_migrations || matches!(cli.command, Command::Migrate) {
        store.run_migrations().await?;
        info!("Migrations applied");
    }

    let adapter = DocumentAdapter::new(Arc::new(store), config.adapter_config());

    match cli.command {
        Command::Migrate => {}
        Command::Load { filters } => {
            let mut model = Model::new();
            adapter.load_filtered_policy(&mut model, &filters).await?;
            for line in model.to_lines() {
                println!("{}", line);
            }
        }
        Command::Import { path } => {
            let model = load_policy_file(&path)?;
            adapter.save_policy(&model).await?;
            info!(path = %path.display(), count = model.len(), "Imported policy file");
        }
        Command::Add { ptype, fields } => {
            adapter.add_policy("", &ptype, &fields).await?;
        }
        Command::Remove { ptype, fields } => {
            let deleted = adapter.remove_policy("", &ptype, &fields).await?;
            info!(deleted, "Removed rules");
        }
        Command::RemoveFiltered {
            ptype,
            field_index,
            fields,
        } => {
            let deleted = adapter
                .remove_filtered_policy("", &ptype, field_index, &fields)
                .await?;
            info!(deleted, "Removed rules");
        }
    }

    debug!(metrics = %adapter.metrics().to_prometheus(), "Adapter counters");
    Ok(())
}
