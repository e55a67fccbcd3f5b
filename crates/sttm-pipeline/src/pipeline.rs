//! Batch transformation
//!
//! Runs the mapping engine over an ordered list of records. Each record is
//! transformed on its own blocking worker; results are collected back in
//! input order by index.

use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use sttm_mapping::{EngineConfig, MappingOutput, SttmEngine};
use sttm_schema::Registry;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

use crate::batch::{BatchResult, FailedItem, TransformedItem};
use crate::{AcceptancePolicy, Error, Result};

/// Configuration for batch processing
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// What to do with a record that fails to transform
    pub acceptance_policy: AcceptancePolicy,
    /// Maximum number of records transformed at the same time
    pub max_workers: usize,
    /// Collect results in input order; otherwise in completion order
    pub preserve_order: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            acceptance_policy: AcceptancePolicy::default(),
            max_workers: std::thread::available_parallelism().map_or(4, usize::from),
            preserve_order: true,
        }
    }
}

/// Transforms batches of records with a shared engine
#[derive(Debug, Clone)]
pub struct BatchTransformer {
    engine: Arc<SttmEngine>,
    config: BatchConfig,
}

impl BatchTransformer {
    /// Create a transformer around an engine
    pub fn new(engine: SttmEngine, config: BatchConfig) -> Self {
        Self {
            engine: Arc::new(engine),
            config,
        }
    }

    /// Create a transformer with a default engine over a registry
    pub fn from_registry(registry: Arc<Registry>, config: BatchConfig) -> Self {
        Self::new(
            SttmEngine::with_config(registry, EngineConfig::default()),
            config,
        )
    }

    pub fn engine(&self) -> &SttmEngine {
        &self.engine
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Transform records concurrently, one blocking worker per record.
    ///
    /// With `preserve_order` the outcomes are collected in input order;
    /// otherwise as workers finish. Every item keeps its input index.
    ///
    /// # Errors
    ///
    /// Under [`AcceptancePolicy::FailFast`] returns [`Error::Record`] for the
    /// first failing record collected. Returns [`Error::Batch`] if a worker
    /// panics.
    pub async fn run(&self, records: Vec<Value>) -> Result<BatchResult> {
        let start = Instant::now();
        let permits = Arc::new(Semaphore::new(self.config.max_workers.max(1)));
        let total = records.len();
        debug!(total, max_workers = self.config.max_workers, "Starting batch");

        let mut result = BatchResult::empty();
        if self.config.preserve_order {
            let mut handles = Vec::with_capacity(total);
            for (index, record) in records.into_iter().enumerate() {
                let permit = acquire(&permits).await?;
                let engine = Arc::clone(&self.engine);
                handles.push(tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    let outcome = engine.transform(&record);
                    (index, record, outcome)
                }));
            }
            for handle in handles {
                let (index, record, outcome) = handle.await.map_err(worker_failed)?;
                self.collect(&mut result, index, record, outcome)?;
            }
        } else {
            let mut workers = JoinSet::new();
            for (index, record) in records.into_iter().enumerate() {
                let permit = acquire(&permits).await?;
                let engine = Arc::clone(&self.engine);
                workers.spawn_blocking(move || {
                    let _permit = permit;
                    let outcome = engine.transform(&record);
                    (index, record, outcome)
                });
            }
            while let Some(joined) = workers.join_next().await {
                let (index, record, outcome) = joined.map_err(worker_failed)?;
                self.collect(&mut result, index, record, outcome)?;
            }
        }

        result.processing_time = start.elapsed();
        self.log_summary(&result);
        Ok(result)
    }

    /// Transform records one after another on the calling thread.
    ///
    /// # Errors
    ///
    /// Under [`AcceptancePolicy::FailFast`] returns [`Error::Record`] for the
    /// first failing record.
    pub fn run_sequential(&self, records: Vec<Value>) -> Result<BatchResult> {
        let start = Instant::now();
        let mut result = BatchResult::empty();

        for (index, record) in records.into_iter().enumerate() {
            let outcome = self.engine.transform(&record);
            self.collect(&mut result, index, record, outcome)?;
        }

        result.processing_time = start.elapsed();
        self.log_summary(&result);
        Ok(result)
    }

    fn collect(
        &self,
        result: &mut BatchResult,
        index: usize,
        record: Value,
        outcome: sttm_mapping::Result<MappingOutput>,
    ) -> Result<()> {
        match outcome {
            Ok(output) => {
                debug!(index, "Record transformed");
                result.successful.push(TransformedItem { index, output });
                Ok(())
            }
            Err(error) if self.config.acceptance_policy.aborts_on_failure() => {
                Err(Error::Record {
                    index,
                    source: error,
                })
            }
            Err(error) => {
                warn!(index, %error, "Skipping record");
                result.failed.push(FailedItem {
                    index,
                    record,
                    error,
                });
                Ok(())
            }
        }
    }

    fn log_summary(&self, result: &BatchResult) {
        info!(
            processed = result.processed_count(),
            successful = result.successful.len(),
            failed = result.failed.len(),
            elapsed_ms = result.processing_time.as_millis(),
            "Batch complete"
        );
    }
}

async fn acquire(permits: &Arc<Semaphore>) -> Result<OwnedSemaphorePermit> {
    Arc::clone(permits)
        .acquire_owned()
        .await
        .map_err(|e| Error::Batch(format!("worker pool closed: {e}")))
}

fn worker_failed(e: JoinError) -> Error {
    Error::Batch(format!("worker failed: {e}"))
}
