//! Progress reporting types for fleet operations.
//!
//! Every orchestrator reports through a single event enum so the CLI can
//! render walks, fan-outs and resyncs with one renderer.

use super::error::Step;

/// A line of status text attributed to one entity.
///
/// Messages for a single entity arrive in the order they were produced;
/// messages for different entities interleave arbitrarily.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressMessage {
    pub entity_id: u64,
    pub text: String,
}

/// Progress events emitted during fleet operations.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum FleetProgress {
    /// Starting to exhaust a paginated collection.
    WalkingCollection {
        /// Collection path, e.g. "projects".
        collection: String,
    },

    /// Fetched a non-empty page.
    FetchedPage {
        collection: String,
        /// Page number (1-indexed).
        page: u32,
        /// Entities on this page.
        count: usize,
        /// Running total so far.
        total_so_far: usize,
    },

    /// The walker hit an empty page.
    WalkComplete { collection: String, total: usize },

    /// A fan-out run is starting.
    FanOutStarted {
        /// Human-readable operation name, e.g. "remediate".
        operation: String,
        /// Number of entities (one task each).
        count: usize,
        /// In-flight cap; `None` means every task starts at once.
        concurrency: Option<usize>,
    },

    /// Status text from inside an entity task.
    Entity(ProgressMessage),

    /// An entity task finished all of its steps.
    EntityDone { entity_id: u64 },

    /// An entity task stopped early.
    EntityFailed {
        entity_id: u64,
        /// The step that failed. `None` when the task itself panicked.
        step: Option<Step>,
        error: String,
    },

    /// Every task of a fan-out run has finished.
    FanOutComplete {
        operation: String,
        succeeded: usize,
        failed: usize,
    },

    /// Sequential mirror resync is starting.
    ResyncStarted { count: usize },

    /// Sequential mirror resync finished.
    ResyncComplete {
        resynced: usize,
        skipped: usize,
        failed: usize,
    },

    /// Something worth surfacing that is not tied to a single entity.
    Warning { message: String },
}

impl FleetProgress {
    /// Shorthand for an [`FleetProgress::Entity`] message.
    pub fn entity(entity_id: u64, text: impl Into<String>) -> Self {
        Self::Entity(ProgressMessage {
            entity_id,
            text: text.into(),
        })
    }
}

/// Callback type for progress reporting.
pub type ProgressCallback = Box<dyn Fn(FleetProgress) + Send + Sync>;

/// Emit a progress event if a callback is provided.
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: FleetProgress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}
