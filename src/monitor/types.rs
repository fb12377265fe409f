use chrono::{DateTime, Utc};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::cache::Freshness;
use crate::extractor::ExtractionSummary;
use crate::pipeline::PipelineSummary;

/// Structured event emitted during a tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum MonitorEvent {
    #[serde(rename_all = "camelCase")]
    TickStarted { at: DateTime<Utc>, tick: u64 },
    /// The save's output already matches its source
    #[serde(rename_all = "camelCase")]
    SaveSkipped { at: DateTime<Utc>, save: String },
    #[serde(rename_all = "camelCase")]
    SaveProcessed {
        at: DateTime<Utc>,
        save: String,
        sections: usize,
        datasets: usize,
        elapsed_ms: u64,
    },
    /// Extraction or post-processing of one save failed; the tick goes on
    #[serde(rename_all = "camelCase")]
    SaveFailed { at: DateTime<Utc>, save: String, error: String },
    /// The tick could not run at all
    #[serde(rename_all = "camelCase")]
    TickFailed { at: DateTime<Utc>, tick: u64, error: String },
}

impl MonitorEvent {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            MonitorEvent::TickStarted { at, .. }
            | MonitorEvent::SaveSkipped { at, .. }
            | MonitorEvent::SaveProcessed { at, .. }
            | MonitorEvent::SaveFailed { at, .. }
            | MonitorEvent::TickFailed { at, .. } => *at,
        }
    }

    /// Write the event to the log at a matching level
    pub fn log(&self) {
        match self {
            MonitorEvent::TickStarted { tick, .. } => info!("Tick {} started", tick),
            MonitorEvent::SaveSkipped { save, .. } => info!("Save {} is fresh, skipping", save),
            MonitorEvent::SaveProcessed {
                save,
                sections,
                datasets,
                elapsed_ms,
                ..
            } => info!(
                "Processed save {}: {} sections, {} datasets in {} ms",
                save, sections, datasets, elapsed_ms
            ),
            MonitorEvent::SaveFailed { save, error, .. } => warn!("Processing save {} failed: {}", save, error),
            MonitorEvent::TickFailed { tick, error, .. } => error!("Tick {} failed: {}", tick, error),
        }
    }
}

/// Everything that happened during one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickReport {
    /// Tick number, starting at 1
    pub tick: u64,
    /// Number of saves found
    pub save_count: usize,
    /// Most recently modified save after the tick
    pub latest_save: Option<String>,
    /// Saves extracted during this tick
    pub processed: usize,
    /// Saves that were already fresh
    pub skipped: usize,
    /// Saves whose processing failed
    pub failed: usize,
    /// Events in emission order
    pub events: Vec<MonitorEvent>,
}

/// Result of processing one save
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveAnalysis {
    pub extraction: ExtractionSummary,
    pub pipeline: PipelineSummary,
}

/// One loss as shown in a status report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossSummary {
    pub time: f64,
    pub title: String,
    pub text: String,
}

/// Derived summary of the current save
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    /// Number of saves found by the last tick
    pub save_count: usize,
    /// Name of the current save
    pub latest_save: String,
    pub freshness: Freshness,
    /// Total number of ship losses in the current save
    pub loss_count: usize,
    /// Most recent losses, newest first
    pub recent_losses: Vec<LossSummary>,
}

/// Answer to a status query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum StatusReport {
    Ready(StatusSnapshot),
    /// No fully derived data for the current save yet
    #[serde(rename_all = "camelCase")]
    NotReady {
        save_count: usize,
        latest_save: Option<String>,
        reason: String,
    },
}

impl StatusReport {
    pub fn is_ready(&self) -> bool {
        matches!(self, StatusReport::Ready(_))
    }
}

/// A status query waiting for its answer
#[derive(Debug)]
pub struct StatusRequest {
    pub reply: oneshot::Sender<StatusReport>,
}

impl StatusRequest {
    pub fn new() -> (Self, oneshot::Receiver<StatusReport>) {
        let (reply, receiver) = oneshot::channel();
        (Self { reply }, receiver)
    }
}
