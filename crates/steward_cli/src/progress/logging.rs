use steward::fleet::FleetProgress;

/// Logging reporter using tracing for structured output.
pub struct LoggingReporter;

impl LoggingReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, event: FleetProgress) {
        match event {
            FleetProgress::WalkingCollection { collection } => {
                tracing::info!(collection = %collection, "Listing collection");
            }

            FleetProgress::FetchedPage {
                collection,
                page,
                count,
                total_so_far,
            } => {
                tracing::debug!(collection = %collection, page, count, total_so_far, "Fetched page");
            }

            FleetProgress::WalkComplete { collection, total } => {
                tracing::info!(collection = %collection, total, "Listing complete");
            }

            FleetProgress::FanOutStarted {
                operation,
                count,
                concurrency,
            } => {
                tracing::info!(operation = %operation, count, concurrency = ?concurrency, "Starting fan-out");
            }

            FleetProgress::Entity(message) => {
                tracing::info!(entity = message.entity_id, "{}", message.text);
            }

            FleetProgress::EntityDone { entity_id } => {
                tracing::debug!(entity = entity_id, "Done");
            }

            FleetProgress::EntityFailed {
                entity_id,
                step,
                error,
            } => {
                let step = step.map_or("task", |s| s.as_str());
                tracing::warn!(entity = entity_id, step, error = %error, "Failed");
            }

            FleetProgress::FanOutComplete {
                operation,
                succeeded,
                failed,
            } => {
                tracing::info!(operation = %operation, succeeded, failed, "Fan-out complete");
            }

            FleetProgress::ResyncStarted { count } => {
                tracing::info!(count, "Resyncing mirrors");
            }

            FleetProgress::ResyncComplete {
                resynced,
                skipped,
                failed,
            } => {
                tracing::info!(resynced, skipped, failed, "Mirror resync complete");
            }

            FleetProgress::Warning { message } => {
                tracing::warn!(message = %message, "Warning");
            }

            _ => {}
        }
    }
}

impl Default for LoggingReporter {
    fn default() -> Self {
        Self::new()
    }
}
