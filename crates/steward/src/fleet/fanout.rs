//! Concurrent per-entity task execution.
//!
//! [`run_all`] spawns one tokio task per entity and waits for all of them.
//! A task's error or panic is converted into a progress event and a
//! [`EntityFailure`] record; it never reaches sibling tasks or the caller.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;

use super::error::{Step, StepFailure};
use super::progress::{FleetProgress, ProgressCallback};
use crate::gitlab::{EntityRef, short_error_message};

/// Handle given to each task for attributing status text to its entity.
#[derive(Clone)]
pub struct EntityReporter {
    entity_id: u64,
    on_progress: Option<Arc<ProgressCallback>>,
}

impl EntityReporter {
    pub fn new(entity_id: u64, on_progress: Option<Arc<ProgressCallback>>) -> Self {
        Self {
            entity_id,
            on_progress,
        }
    }

    #[inline]
    pub fn entity_id(&self) -> u64 {
        self.entity_id
    }

    /// Emit a status line for this entity.
    pub fn say(&self, text: impl Into<String>) {
        self.emit(FleetProgress::entity(self.entity_id, text));
    }

    pub(crate) fn emit(&self, event: FleetProgress) {
        if let Some(cb) = &self.on_progress {
            cb(event);
        }
    }
}

/// One entity whose task did not finish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityFailure {
    pub entity_id: u64,
    /// `None` when the task panicked or never started.
    pub step: Option<Step>,
    pub error: String,
}

/// Outcome of a fan-out run.
#[derive(Debug, Clone, Default)]
pub struct FanOutStats {
    pub succeeded: usize,
    pub failed: Vec<EntityFailure>,
}

impl FanOutStats {
    #[inline]
    pub fn total(&self) -> usize {
        self.succeeded + self.failed.len()
    }
}

/// Run `task` once for every entity and wait for all of them.
///
/// With `concurrency = None` every task starts immediately. `Some(n)` caps the
/// number of tasks in flight (a cap of 0 is treated as 1). No task is retried
/// and none is cancelled; wrap the call in a timeout to bound run time.
pub async fn run_all<F, Fut>(
    operation: &str,
    entities: Vec<EntityRef>,
    concurrency: Option<usize>,
    on_progress: Option<Arc<ProgressCallback>>,
    task: F,
) -> FanOutStats
where
    F: Fn(EntityRef, EntityReporter) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), StepFailure>> + Send + 'static,
{
    let mut stats = FanOutStats::default();
    let emit = |event: FleetProgress| {
        if let Some(cb) = &on_progress {
            cb(event);
        }
    };

    let semaphore = concurrency.map(|n| Arc::new(Semaphore::new(n.max(1))));
    emit(FleetProgress::FanOutStarted {
        operation: operation.to_string(),
        count: entities.len(),
        concurrency: concurrency.map(|n| n.max(1)),
    });

    if entities.is_empty() {
        emit(FleetProgress::FanOutComplete {
            operation: operation.to_string(),
            succeeded: 0,
            failed: 0,
        });
        return stats;
    }

    let task = Arc::new(task);
    let mut handles = Vec::with_capacity(entities.len());

    for entity in entities {
        let task = Arc::clone(&task);
        let semaphore = semaphore.clone();
        let reporter = EntityReporter::new(entity.id, on_progress.clone());

        let handle = tokio::spawn(async move {
            let _permit = match &semaphore {
                Some(semaphore) => match Arc::clone(semaphore).acquire_owned().await {
                    Ok(permit) => Some(permit),
                    Err(_) => {
                        return Err(EntityFailure {
                            entity_id: entity.id,
                            step: None,
                            error: "Semaphore closed unexpectedly".to_string(),
                        });
                    }
                },
                None => None,
            };

            match task(entity, reporter.clone()).await {
                Ok(()) => {
                    reporter.emit(FleetProgress::EntityDone {
                        entity_id: entity.id,
                    });
                    Ok(())
                }
                Err(failure) => {
                    let error = short_error_message(&failure.error);
                    reporter.emit(FleetProgress::EntityFailed {
                        entity_id: entity.id,
                        step: Some(failure.step),
                        error: error.clone(),
                    });
                    Err(EntityFailure {
                        entity_id: entity.id,
                        step: Some(failure.step),
                        error,
                    })
                }
            }
        });

        handles.push((entity.id, handle));
    }

    for (entity_id, handle) in handles {
        match handle.await {
            Ok(Ok(())) => stats.succeeded += 1,
            Ok(Err(failure)) => stats.failed.push(failure),
            Err(e) => {
                let error = format!("Task panic: {e}");
                tracing::warn!(entity_id, %error, "Fleet task aborted");
                emit(FleetProgress::EntityFailed {
                    entity_id,
                    step: None,
                    error: error.clone(),
                });
                stats.failed.push(EntityFailure {
                    entity_id,
                    step: None,
                    error,
                });
            }
        }
    }

    emit(FleetProgress::FanOutComplete {
        operation: operation.to_string(),
        succeeded: stats.succeeded,
        failed: stats.failed.len(),
    });

    stats
}
