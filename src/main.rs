//! Transfer Switch - service entry point
//!
//! Wires the transfers core to its collaborators and runs two tasks:
//!
//! ```text
//! ┌──────────┐    ┌───────────────┐    ┌─────────────┐
//! │  Config  │───▶│  BatchWorker  │───▶│   Ledger    │
//! │  (YAML)  │    │ (one cycle at │    │  (batched)  │
//! └──────────┘    │    a time)    │    └─────────────┘
//!                 └───────┬───────┘
//!                         ▼
//!                 ┌───────────────┐    ┌─────────────┐
//!                 │  Repository   │◀───│  Admin API  │
//!                 └───────────────┘    └─────────────┘
//! ```
//!
//! The message-bus adapter feeds commands into the worker queue; the local
//! adapters here stand in for the external services in development.

use std::sync::Arc;

use tracing::info;

use transfer_switch::admin_api::{self, AdminState};
use transfer_switch::config::AppConfig;
use transfer_switch::transfers::accounts::{AccountResolver, AccountResolverConfig};
use transfer_switch::transfers::adapters::{
    ApprovingLedger, FixedSettlementPolicy, InMemoryTransfersRepository, LoggingEventPublisher,
    ParticipantDirectory, StaticParticipantDirectory, TransfersRepository,
};
use transfer_switch::transfers::worker::{BatchWorker, WorkerConfig, command_channel};
use transfer_switch::{BatchProcessor, logging};

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let config = AppConfig::load(&env);
    let _log_guard = logging::init_logging(&config);

    info!(env = %env, "starting transfer-switch");

    let repository: Arc<dyn TransfersRepository> = Arc::new(InMemoryTransfersRepository::new());
    let directory: Arc<dyn ParticipantDirectory> =
        Arc::new(StaticParticipantDirectory::new(config.participants.clone()));
    let settlement = Arc::new(FixedSettlementPolicy::new(config.settlement_model.clone()));
    let ledger = Arc::new(ApprovingLedger);
    let publisher = Arc::new(LoggingEventPublisher);

    let resolver = AccountResolver::new(
        directory,
        AccountResolverConfig {
            cache_ttl: std::time::Duration::from_secs(config.resolver.participant_cache_ttl_secs),
            cache_capacity: config.resolver.participant_cache_capacity,
        },
    );

    let processor = BatchProcessor::new(
        repository.clone(),
        ledger,
        settlement,
        publisher,
        resolver,
    );

    // The bus adapter owns the sender half; dropping it stops the worker.
    let (command_tx, command_rx) = command_channel(config.worker.queue_size);
    let worker = BatchWorker::new(
        processor,
        command_rx,
        WorkerConfig {
            batch_size: config.worker.batch_size,
        },
    );
    let worker_handle = tokio::spawn(worker.run());

    let admin_state = Arc::new(AdminState {
        repository: repository.clone(),
    });
    let admin = admin_api::serve(admin_state, &config.admin_api.host, config.admin_api.port);

    tokio::select! {
        result = admin => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    drop(command_tx);
    worker_handle.await?;

    info!("transfer-switch stopped");
    Ok(())
}
