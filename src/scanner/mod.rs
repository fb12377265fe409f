//! Stream scanner.
//!
//! Reads a save line by line, keeps the stack of open tags, skips ignored
//! subtrees wholesale and routes every tag inside a recognised section to
//! that section's handler. Nothing outside recognised sections is kept, so
//! memory stays bounded by the handlers' own accumulations.


mod scanner;
pub mod types;

pub use scanner::StreamScanner;
pub use types::*;

use std::io::BufRead;

use anyhow::Result;

use crate::sections::default_handlers;
use crate::types::ExtractorConfig;

/// Scan `reader` with every default handler, collecting sections in memory
pub fn scan_to_memory<R: BufRead>(reader: R, config: &ExtractorConfig) -> Result<(ScanReport, Vec<ClosedSection>)> {
    let mut sections = Vec::new();
    let scanner = StreamScanner::new(default_handlers(config), config);
    let report = scanner.scan(reader, &mut sections)?;
    Ok((report, sections))
}
