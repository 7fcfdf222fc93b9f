//! Batch worker.
//!
//! Single consumer of the inbound command queue. Owning the processor on one
//! task is what makes the one-batch-at-a-time invariant explicit: the next
//! batch cannot start before the previous cycle has flushed and published.

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::commands::CommandEnvelope;
use super::processor::BatchProcessor;

/// Configuration for the batch worker
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum commands drained into one batch
    pub batch_size: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { batch_size: 100 }
    }
}

/// Create the inbound command channel pair.
pub fn command_channel(
    buffer: usize,
) -> (mpsc::Sender<CommandEnvelope>, mpsc::Receiver<CommandEnvelope>) {
    mpsc::channel(buffer)
}

/// Single-worker processing loop around a [`BatchProcessor`].
pub struct BatchWorker {
    processor: BatchProcessor,
    rx: mpsc::Receiver<CommandEnvelope>,
    config: WorkerConfig,
}

impl BatchWorker {
    pub fn new(
        processor: BatchProcessor,
        rx: mpsc::Receiver<CommandEnvelope>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            processor,
            rx,
            config,
        }
    }

    /// Run until the command channel closes.
    ///
    /// Waits for the first command of a batch, then drains whatever is
    /// already queued up to `batch_size` and runs one full cycle.
    pub async fn run(mut self) {
        info!(batch_size = self.config.batch_size, "starting transfer batch worker");

        while let Some(first) = self.rx.recv().await {
            let mut batch = Vec::with_capacity(self.config.batch_size);
            batch.push(first);

            while batch.len() < self.config.batch_size {
                match self.rx.try_recv() {
                    Ok(envelope) => batch.push(envelope),
                    Err(_) => break,
                }
            }

            debug!(count = batch.len(), "processing command batch");
            if let Err(err) = self.processor.process_batch(batch).await {
                error!(error = %err, "command batch failed");
            }
        }

        info!("command channel closed, batch worker stopping");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_config_default() {
        let config = WorkerConfig::default();
        assert_eq!(config.batch_size, 100);
    }

    #[tokio::test]
    async fn test_command_channel_delivers_in_order() {
        let (tx, mut rx) = command_channel(8);

        for name in ["first", "second"] {
            tx.send(CommandEnvelope {
                msg_type: crate::transfers::commands::MessageType::Command,
                msg_name: name.into(),
                payload: None,
                opaque_token: None,
            })
            .await
            .unwrap();
        }

        assert_eq!(rx.recv().await.unwrap().msg_name, "first");
        assert_eq!(rx.recv().await.unwrap().msg_name, "second");
    }
}
