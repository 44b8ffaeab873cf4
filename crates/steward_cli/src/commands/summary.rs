use clap::ValueEnum;
use console::style;
use serde::Serialize;
use steward::fleet::{EntityFailure, FanOutStats, MirrorResyncStats};

/// Output format for run summaries.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Display as a formatted table (default)
    #[default]
    Table,
    /// Display as JSON
    Json,
}

/// One failed entity in a run summary.
#[derive(Debug, Clone, Serialize, tabled::Tabled)]
pub(crate) struct FailureRow {
    #[tabled(rename = "Entity")]
    pub(crate) entity_id: u64,
    #[tabled(rename = "Step")]
    pub(crate) step: String,
    #[tabled(rename = "Error")]
    pub(crate) error: String,
}

impl From<&EntityFailure> for FailureRow {
    fn from(failure: &EntityFailure) -> Self {
        Self {
            entity_id: failure.entity_id,
            step: failure
                .step
                .map_or("task", |s| s.as_str())
                .to_string(),
            error: failure.error.clone(),
        }
    }
}

/// Outcome of a fleet command, printed once progress output has finished.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct RunSummary {
    pub(crate) operation: String,
    pub(crate) succeeded: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) skipped: Option<usize>,
    pub(crate) failed: Vec<FailureRow>,
}

impl RunSummary {
    pub(crate) fn from_fan_out(operation: &str, stats: &FanOutStats) -> Self {
        Self {
            operation: operation.to_string(),
            succeeded: stats.succeeded,
            skipped: None,
            failed: stats.failed.iter().map(FailureRow::from).collect(),
        }
    }

    pub(crate) fn from_resync(stats: &MirrorResyncStats) -> Self {
        Self {
            operation: "mirroring".to_string(),
            succeeded: stats.resynced,
            skipped: Some(stats.skipped),
            failed: stats.failed.iter().map(FailureRow::from).collect(),
        }
    }

    pub(crate) fn render(&self, format: OutputFormat) -> Result<String, serde_json::Error> {
        match format {
            OutputFormat::Table => Ok(self.render_table()),
            OutputFormat::Json => serde_json::to_string_pretty(self),
        }
    }

    fn render_table(&self) -> String {
        let mut headline = format!("{}: {} succeeded", self.operation, self.succeeded);
        if let Some(skipped) = self.skipped {
            headline.push_str(&format!(", {} skipped", skipped));
        }

        if self.failed.is_empty() {
            return format!("{} {}", style("✓").green().bold(), headline);
        }

        headline.push_str(&format!(", {} failed", self.failed.len()));
        let mut table = tabled::Table::new(self.failed.clone());
        table.with(tabled::settings::Style::rounded());
        format!("{} {}\n{}", style("✗").red().bold(), headline, table)
    }

    pub(crate) fn print(&self, format: OutputFormat) -> Result<(), serde_json::Error> {
        println!("{}", self.render(format)?);
        Ok(())
    }
}
