use std::collections::HashMap;
use std::sync::Mutex;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use steward::fleet::FleetProgress;

/// Which kind of run owns the task bar.
#[derive(Clone, Copy, PartialEq, Eq)]
enum TaskKind {
    FanOut,
    Resync,
}

/// Consolidated progress state to avoid multiple mutex locks.
#[derive(Default)]
struct ProgressState {
    /// Walk spinners by collection path.
    walk_bars: HashMap<String, ProgressBar>,
    /// Single bar for the fan-out or resync run.
    task_bar: Option<(TaskKind, ProgressBar)>,
}

/// Interactive progress reporter using indicatif.
pub struct InteractiveReporter {
    multi: MultiProgress,
    state: Mutex<ProgressState>,
}

impl InteractiveReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            state: Mutex::new(ProgressState::default()),
        }
    }

    pub fn handle(&self, event: FleetProgress) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        match event {
            FleetProgress::WalkingCollection { collection } => {
                let pb = self.multi.add(ProgressBar::new_spinner());
                pb.set_style(Self::spinner_style());
                pb.set_prefix(format!("{:12}", collection));
                pb.set_message("Listing...");
                pb.enable_steady_tick(std::time::Duration::from_millis(100));
                state.walk_bars.insert(collection, pb);
            }

            FleetProgress::FetchedPage {
                collection,
                page,
                total_so_far,
                ..
            } => {
                if let Some(pb) = state.walk_bars.get(&collection) {
                    pb.set_message(format!("{} found (page {})", total_so_far, page));
                }
            }

            FleetProgress::WalkComplete { collection, total } => {
                if let Some(pb) = state.walk_bars.get(&collection) {
                    pb.finish_with_message(format!("✓ {} found", total));
                }
            }

            FleetProgress::FanOutStarted {
                operation,
                count,
                concurrency,
            } => {
                let pb = self.multi.add(ProgressBar::new(count as u64));
                pb.set_style(Self::bar_style());
                pb.set_prefix(format!("{:12}", operation));
                match concurrency {
                    Some(n) => pb.set_message(format!("Running ({} at a time)...", n)),
                    None => pb.set_message("Running..."),
                }
                state.task_bar = Some((TaskKind::FanOut, pb));
            }

            FleetProgress::ResyncStarted { count } => {
                let pb = self.multi.add(ProgressBar::new(count as u64));
                pb.set_style(Self::counter_style());
                pb.set_prefix(format!("{:12}", "mirrors"));
                pb.set_message(format!("Checking {} projects...", count));
                pb.enable_steady_tick(std::time::Duration::from_millis(100));
                state.task_bar = Some((TaskKind::Resync, pb));
            }

            FleetProgress::Entity(message) => {
                let task_bar = state.task_bar.clone();
                drop(state);
                match task_bar {
                    Some((kind, pb)) => {
                        if kind == TaskKind::Resync {
                            pb.inc(1);
                        }
                        pb.set_message(format!("#{} {}", message.entity_id, message.text));
                    }
                    // No run in progress (project bootstrap): print each step.
                    None => {
                        self.multi
                            .println(format!("  #{} {}", message.entity_id, message.text))
                            .ok();
                    }
                }
            }

            FleetProgress::EntityDone { .. } => {
                if let Some((TaskKind::FanOut, ref pb)) = state.task_bar {
                    pb.inc(1);
                }
            }

            FleetProgress::EntityFailed {
                entity_id,
                step,
                error,
            } => {
                if let Some((_, ref pb)) = state.task_bar {
                    pb.inc(1);
                }
                drop(state);
                let step = step.map_or("task", |s| s.as_str());
                self.multi
                    .println(format!("✗ #{} {} failed: {}", entity_id, step, error))
                    .ok();
            }

            FleetProgress::FanOutComplete {
                succeeded, failed, ..
            } => {
                if let Some((_, ref pb)) = state.task_bar {
                    let msg = if failed > 0 {
                        format!("✓ {} done, {} failed", succeeded, failed)
                    } else {
                        format!("✓ {} done", succeeded)
                    };
                    pb.finish_with_message(msg);
                }
            }

            FleetProgress::ResyncComplete {
                resynced,
                skipped,
                failed,
            } => {
                if let Some((_, ref pb)) = state.task_bar {
                    let msg = if failed > 0 {
                        format!(
                            "✓ {} resynced, {} skipped, {} failed",
                            resynced, skipped, failed
                        )
                    } else {
                        format!("✓ {} resynced, {} skipped", resynced, skipped)
                    };
                    pb.finish_with_message(msg);
                }
            }

            FleetProgress::Warning { message } => {
                drop(state);
                self.multi.println(format!("⚠ {}", message)).ok();
            }

            _ => {}
        }
    }

    pub fn finish(&self) {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        for pb in state.walk_bars.values() {
            if !pb.is_finished() {
                pb.finish();
            }
        }
        if let Some((_, ref pb)) = state.task_bar
            && !pb.is_finished()
        {
            pb.finish();
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.cyan} {spinner:.green} {msg}")
            .expect("Invalid template")
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
    }

    fn counter_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.cyan} {spinner:.green} {pos:>4} {msg}")
            .expect("Invalid template")
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos:>3}/{len:3} {msg}")
            .expect("Invalid template")
            .progress_chars("█▓░")
    }
}

impl Default for InteractiveReporter {
    fn default() -> Self {
        Self::new()
    }
}
