use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use indicatif::ProgressBar;
use log::{debug, info, warn};
use serde_json::Value;

use super::section_path;
use super::types::{ExtractionSummary, SectionDocument, SectionProvenance};
use crate::scanner::{SectionSink, StreamScanner};
use crate::sections::{default_handlers, is_empty_data};
use crate::types::ExtractorConfig;
use crate::utils::{create_dir_if_not_exists, remove_file_if_exists, write_json};

/// Writes each section to disk the moment it closes
struct FileSink<'a> {
    output_dir: &'a Path,
    written: Vec<SectionProvenance>,
}

impl SectionSink for FileSink<'_> {
    fn section_closed(&mut self, name: &str, start_at: usize, end_at: usize, data: Value) -> Result<()> {
        if is_empty_data(&data) {
            debug!("Section {} is empty, nothing written", name);
            return Ok(());
        }

        let document = SectionDocument { start_at, end_at, data };
        write_json(&section_path(self.output_dir, name), &document)?;
        info!("Wrote section {} (lines {}-{})", name, start_at, end_at);

        self.written.push(SectionProvenance {
            name: name.to_string(),
            start_at,
            end_at,
        });
        Ok(())
    }
}

/// One full pass over one save file
pub struct ExtractionRun<'a> {
    /// Save file, plain or gzip-compressed
    source: &'a Path,
    /// Directory receiving the section documents
    output_dir: &'a Path,
    /// Scanner configuration
    config: &'a ExtractorConfig,
    /// Optional byte progress over the raw file
    progress: Option<ProgressBar>,
}

impl<'a> ExtractionRun<'a> {
    /// Create a new extraction run
    pub fn new(source: &'a Path, output_dir: &'a Path, config: &'a ExtractorConfig) -> Self {
        Self {
            source,
            output_dir,
            config,
            progress: None,
        }
    }

    /// Report bytes read on `progress`
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Scan the source and write every completed section.
    ///
    /// Section files left over from an earlier run are removed first, so a
    /// section dropped by this run never survives from a previous one.
    pub fn run(&self) -> Result<ExtractionSummary> {
        info!("Extracting {} into {}", self.source.display(), self.output_dir.display());
        let start_time = Instant::now();

        create_dir_if_not_exists(self.output_dir)?;
        let handlers = default_handlers(self.config);
        for handler in &handlers {
            remove_file_if_exists(&section_path(self.output_dir, handler.name()))?;
        }

        let reader = self.open_source()?;
        let mut sink = FileSink {
            output_dir: self.output_dir,
            written: Vec::new(),
        };
        let report = StreamScanner::new(handlers, self.config)
            .scan(reader, &mut sink)
            .with_context(|| format!("Failed to extract {}", self.source.display()))?;

        if let Some(progress) = &self.progress {
            progress.finish_with_message(format!("{} sections", sink.written.len()));
        }
        if !report.outcome.is_complete() {
            warn!(
                "Extraction of {} stopped at line {}: {}",
                self.source.display(),
                report.stopped_at,
                report.outcome
            );
        }

        let summary = ExtractionSummary {
            source: self.source.to_path_buf(),
            output_dir: self.output_dir.to_path_buf(),
            sections: sink.written,
            lines: report.lines,
            stopped_at: report.stopped_at,
            outcome: report.outcome,
            elapsed_ms: start_time.elapsed().as_millis() as u64,
        };
        info!(
            "Extracted {} sections from {} lines in {} ms",
            summary.sections.len(),
            summary.lines,
            summary.elapsed_ms
        );
        Ok(summary)
    }

    fn open_source(&self) -> Result<BufReader<Box<dyn Read>>> {
        let file = File::open(self.source)
            .with_context(|| format!("Failed to open save file: {}", self.source.display()))?;

        let raw: Box<dyn Read> = match &self.progress {
            Some(progress) => {
                if let Ok(meta) = file.metadata() {
                    progress.set_length(meta.len());
                }
                Box::new(progress.wrap_read(file))
            }
            None => Box::new(file),
        };

        let reader: Box<dyn Read> = if is_gzip(self.source) {
            Box::new(GzDecoder::new(raw))
        } else {
            raw
        };
        Ok(BufReader::with_capacity(256 * 1024, reader))
    }
}

/// Whether a save path names a gzip-compressed file
pub fn is_gzip(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("gz"))
        .unwrap_or(false)
}

/// Run a full extraction of `source` into `output_dir`
pub fn extract_save(source: &Path, output_dir: &Path, config: &ExtractorConfig) -> Result<ExtractionSummary> {
    ExtractionRun::new(source, output_dir, config).run()
}

/// Output directory of a save under `output_root`
pub fn output_dir_for(output_root: &Path, save_name: &str) -> PathBuf {
    output_root.join(save_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::read_section;
    use crate::scanner::ScanOutcome;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;
    use tempfile::tempdir;

    const SAVE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<savegame>
<info>
<save name="Test" date="1700000000"/>
<player name="Pilot" location="Argon Prime" money="1500"/>
</info>
<stats>
</stats>
<log>
<entry time="100" category="upkeep" title="Eagle Eye (ABC-123) was destroyed." text="Location: Segaris&#10;Commander: Smith"/>
</log>
</savegame>
"#;

    #[test]
    fn test_run_writes_non_empty_sections() -> Result<()> {
        let dir = tempdir()?;
        let source = dir.path().join("quicksave.xml");
        std::fs::write(&source, SAVE)?;
        let out = dir.path().join("out");

        let summary = extract_save(&source, &out, &ExtractorConfig::default())?;

        assert_eq!(summary.outcome, ScanOutcome::Completed);
        assert_eq!(summary.section_names(), vec!["info".to_string(), "log".to_string()]);
        assert!(!section_path(&out, "stats").exists(), "empty sections are not written");

        let log = read_section(&out, "log")?.expect("log written");
        assert_eq!((log.start_at, log.end_at), (9, 11));
        assert_eq!(log.data[0]["text"], "Location: Segaris\nCommander: Smith");

        let raw: Value = serde_json::from_str(&std::fs::read_to_string(section_path(&out, "info"))?)?;
        assert_eq!(raw["startAt"], 3);
        assert_eq!(raw["endAt"], 6);
        assert_eq!(raw["data"]["money"], 1500);
        Ok(())
    }

    #[test]
    fn test_gzip_source() -> Result<()> {
        let dir = tempdir()?;
        let source = dir.path().join("autosave_01.xml.gz");
        let mut encoder = GzEncoder::new(File::create(&source)?, Compression::default());
        encoder.write_all(SAVE.as_bytes())?;
        encoder.finish()?;

        let out = dir.path().join("out");
        let summary = extract_save(&source, &out, &ExtractorConfig::default())?;
        assert_eq!(summary.sections.len(), 2);
        assert_eq!(read_section(&out, "info")?.map(|d| d.data["name"].clone()), Some(Value::from("Pilot")));
        Ok(())
    }

    #[test]
    fn test_stale_sections_removed_before_run() -> Result<()> {
        let dir = tempdir()?;
        let out = dir.path().join("out");
        let source = dir.path().join("save.xml");

        std::fs::write(&source, SAVE)?;
        extract_save(&source, &out, &ExtractorConfig::default())?;
        assert!(section_path(&out, "log").exists());

        // truncated before </log>
        let truncated: String = SAVE.lines().take(10).map(|l| format!("{}\n", l)).collect();
        std::fs::write(&source, truncated)?;
        let summary = extract_save(&source, &out, &ExtractorConfig::default())?;

        assert_eq!(summary.outcome, ScanOutcome::TruncatedInSection { section: "log".to_string() });
        assert!(!section_path(&out, "log").exists());
        assert!(section_path(&out, "info").exists());
        Ok(())
    }

    #[test]
    fn test_missing_source_is_an_error() {
        let dir = tempdir().unwrap();
        let result = extract_save(&dir.path().join("nope.xml"), &dir.path().join("out"), &ExtractorConfig::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_is_gzip() {
        assert!(is_gzip(Path::new("a/save_001.xml.gz")));
        assert!(!is_gzip(Path::new("a/save_001.xml")));
    }
}
