//! Periodic refresh of extracted saves and status reporting.
//!
//! A [`Monitor`] owns all mutable state. Ticks and status queries both take
//! it by reference from a single task, so a query always sees the state from
//! before or after a tick, never halfway through one.

mod collector;
mod runner;
pub mod types;

pub use collector::{collect_saves, save_name};
pub use runner::run_monitor;
pub use types::*;

use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;
use indicatif::ProgressBar;
use log::{debug, info};
use tokio::sync::mpsc;

use crate::cache::{Freshness, check_freshness, invalidate, mark_fresh};
use crate::extractor::ExtractionRun;
use crate::pipeline::{ShipLoss, read_dataset, run_pipeline};
use crate::types::{DerivationConfig, ExtractorConfig, MonitorConfig, SaveIdentity};

/// Extract a save and derive its datasets, then mark it fresh.
///
/// The cache entry is removed first, so a run that fails part way leaves the
/// save stale and the next tick retries it.
pub fn process_save(
    save: &SaveIdentity,
    extractor: &ExtractorConfig,
    derivation: &DerivationConfig,
) -> Result<SaveAnalysis> {
    process_save_with_progress(save, extractor, derivation, None)
}

/// [`process_save`] reporting bytes read on `progress`
pub fn process_save_with_progress(
    save: &SaveIdentity,
    extractor: &ExtractorConfig,
    derivation: &DerivationConfig,
    progress: Option<ProgressBar>,
) -> Result<SaveAnalysis> {
    invalidate(save)?;

    let mut run = ExtractionRun::new(&save.source, &save.output_dir, extractor);
    if let Some(progress) = progress {
        run = run.with_progress(progress);
    }
    let extraction = run
        .run()
        .with_context(|| format!("Extraction of save {} failed", save.name))?;
    let pipeline = run_pipeline(&save.output_dir, derivation)
        .with_context(|| format!("Post-processing of save {} failed", save.name))?;

    mark_fresh(save, extraction.section_names())?;
    Ok(SaveAnalysis { extraction, pipeline })
}

/// Tracks the saves of one directory and keeps their output fresh
pub struct Monitor {
    config: MonitorConfig,
    /// Saves found by the last successful tick, newest first
    saves: Vec<SaveIdentity>,
    ticks: u64,
    processed_total: u64,
    events: Option<mpsc::UnboundedSender<MonitorEvent>>,
}

impl Monitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            config,
            saves: Vec::new(),
            ticks: 0,
            processed_total: 0,
            events: None,
        }
    }

    /// Forward every tick event to `sender`
    pub fn with_events(mut self, sender: mpsc::UnboundedSender<MonitorEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Number of ticks run so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Number of saves extracted over all ticks
    pub fn processed_total(&self) -> u64 {
        self.processed_total
    }

    /// The most recently modified save
    pub fn current_save(&self) -> Option<&SaveIdentity> {
        self.saves.first()
    }

    fn emit(&self, report: &mut TickReport, event: MonitorEvent) {
        event.log();
        if let Some(sender) = &self.events {
            // a dropped receiver only means nobody is listening any more
            let _ = sender.send(event.clone());
        }
        report.events.push(event);
    }

    /// Run one tick: list saves, process the stale ones, move the current
    /// save pointer to the newest save.
    pub fn tick(&mut self) -> TickReport {
        self.ticks += 1;
        let mut report = TickReport {
            tick: self.ticks,
            save_count: 0,
            latest_save: None,
            processed: 0,
            skipped: 0,
            failed: 0,
            events: Vec::new(),
        };
        self.emit(
            &mut report,
            MonitorEvent::TickStarted {
                at: Utc::now(),
                tick: self.ticks,
            },
        );

        let saves = match collect_saves(&self.config.save_dir, &self.config.output_dir) {
            Ok(saves) => saves,
            Err(e) => {
                let event = MonitorEvent::TickFailed {
                    at: Utc::now(),
                    tick: self.ticks,
                    error: format!("{:#}", e),
                };
                self.emit(&mut report, event);
                report.save_count = self.saves.len();
                report.latest_save = self.current_save().map(|s| s.name.clone());
                return report;
            }
        };

        for save in &saves {
            let freshness = check_freshness(save);
            if freshness.is_fresh() {
                report.skipped += 1;
                let event = MonitorEvent::SaveSkipped {
                    at: Utc::now(),
                    save: save.name.clone(),
                };
                self.emit(&mut report, event);
                continue;
            }

            debug!("Save {} is {}", save.name, freshness);
            let start_time = Instant::now();
            let event = match process_save(save, &self.config.extractor, &self.config.derivation) {
                Ok(analysis) => {
                    report.processed += 1;
                    self.processed_total += 1;
                    MonitorEvent::SaveProcessed {
                        at: Utc::now(),
                        save: save.name.clone(),
                        sections: analysis.extraction.sections.len(),
                        datasets: analysis.pipeline.datasets.len(),
                        elapsed_ms: start_time.elapsed().as_millis() as u64,
                    }
                }
                Err(e) => {
                    report.failed += 1;
                    MonitorEvent::SaveFailed {
                        at: Utc::now(),
                        save: save.name.clone(),
                        error: format!("{:#}", e),
                    }
                }
            };
            self.emit(&mut report, event);
        }

        if let Some(newest) = saves.first() {
            if !self.current_save().is_some_and(|current| current.unchanged(newest)) {
                info!("Current save is now {}", newest.name);
            }
        }
        self.saves = saves;
        report.save_count = self.saves.len();
        report.latest_save = self.current_save().map(|s| s.name.clone());
        report
    }

    /// Summary of the current save, or why there is none
    pub fn status(&self) -> StatusReport {
        let save_count = self.saves.len();
        let Some(save) = self.current_save() else {
            return StatusReport::NotReady {
                save_count,
                latest_save: None,
                reason: "no saves found".to_string(),
            };
        };
        let not_ready = |reason: String| StatusReport::NotReady {
            save_count,
            latest_save: Some(save.name.clone()),
            reason,
        };

        let freshness = check_freshness(save);
        if freshness != Freshness::Fresh {
            return not_ready(freshness.to_string());
        }

        let losses: Vec<ShipLoss> = match read_dataset(&save.output_dir, "ship-losses") {
            Ok(Some(losses)) => losses,
            Ok(None) => return not_ready("ship losses not derived".to_string()),
            Err(e) => return not_ready(format!("ship losses unreadable: {:#}", e)),
        };

        let recent_losses = losses
            .iter()
            .rev()
            .take(self.config.recent_losses)
            .map(|loss| LossSummary {
                time: loss.time,
                title: loss.title.clone(),
                text: loss.text.clone(),
            })
            .collect();

        StatusReport::Ready(StatusSnapshot {
            save_count,
            latest_save: save.name.clone(),
            freshness,
            loss_count: losses.len(),
            recent_losses,
        })
    }
}
