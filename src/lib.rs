pub mod types;
pub mod matcher;
pub mod sections;
pub mod scanner;
pub mod extractor;
pub mod pipeline;
pub mod cache;
pub mod monitor;
pub mod utils;

// Re-export main types and functions for easier access
pub use types::*;
pub use matcher::{Attributes, TagPathSpec, TagToken};
pub use sections::{SectionHandler, default_handlers};
pub use scanner::{ScanOutcome, ScanReport, SectionSink, StreamScanner, scan_to_memory};
pub use extractor::{
    ExtractionRun,
    extract_save,
    read_section,
    types::{ExtractionSummary, SectionDocument},
};
pub use pipeline::{
    DerivationStep,
    Pipeline,
    read_dataset,
    run_pipeline,
    types::PipelineSummary,
};
pub use cache::{
    Freshness,
    StaleReason,
    check_freshness,
};
pub use monitor::{
    Monitor,
    collect_saves,
    process_save,
    process_save_with_progress,
    run_monitor,
    types::{MonitorEvent, StatusReport, StatusRequest, TickReport},
};
