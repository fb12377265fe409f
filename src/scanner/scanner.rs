use std::io::BufRead;

use anyhow::Result;
use log::{debug, trace, warn};

use super::types::{ScanOutcome, ScanReport, SectionSink};
use crate::matcher::{Attributes, TagToken, is_ignored, tokenize_line};
use crate::sections::SectionHandler;
use crate::types::ExtractorConfig;

/// A section currently receiving events
#[derive(Debug, Clone, Copy)]
struct ActiveSection {
    /// Index into the handler list
    handler: usize,
    /// Path length once the section root is pushed
    depth: usize,
    /// Line of the opening tag
    start_at: usize,
}

/// Skipped subtree, tracked by tag name and nesting depth
#[derive(Debug, Clone)]
struct IgnoredSubtree {
    tag: String,
    depth: usize,
}

enum Flow {
    Continue,
    Stop(ScanOutcome),
}

/// Line-oriented scanner dispatching tag events to section handlers
pub struct StreamScanner {
    handlers: Vec<Box<dyn SectionHandler>>,
    used: Vec<bool>,
    ignored_tags: Vec<String>,
    path: Vec<String>,
    active: Vec<ActiveSection>,
    ignoring: Option<IgnoredSubtree>,
    sections_closed: usize,
}

impl StreamScanner {
    /// Create a scanner over the given handlers
    pub fn new(handlers: Vec<Box<dyn SectionHandler>>, config: &ExtractorConfig) -> Self {
        let used = vec![false; handlers.len()];
        Self {
            handlers,
            used,
            ignored_tags: config.ignored_tags.clone(),
            path: Vec::new(),
            active: Vec::new(),
            ignoring: None,
            sections_closed: 0,
        }
    }

    /// Scan the whole input, handing each closed section to `sink`.
    ///
    /// Only I/O failures (reading the input, or the sink failing to store a
    /// section) are errors. Truncated or inconsistent input ends the scan
    /// with the matching [`ScanOutcome`]; sections still open at that point
    /// are dropped.
    pub fn scan<R: BufRead>(mut self, mut reader: R, sink: &mut dyn SectionSink) -> Result<ScanReport> {
        let mut buf = Vec::with_capacity(1024);
        let mut line_no = 0;

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            line_no += 1;
            let line = String::from_utf8_lossy(&buf);

            if let Some(ignored) = &self.ignoring {
                if !line.contains(ignored.tag.as_str()) {
                    continue;
                }
            }

            for token in tokenize_line(&line) {
                if let Flow::Stop(outcome) = self.step(token, line_no, sink)? {
                    warn!("Scan stopped at line {}: {}", line_no, outcome);
                    return Ok(self.report(line_no, outcome));
                }
            }
        }

        let outcome = if let Some(ignored) = &self.ignoring {
            ScanOutcome::TruncatedInIgnore { tag: ignored.tag.clone() }
        } else if let Some(outer) = self.active.first() {
            ScanOutcome::TruncatedInSection {
                section: self.handlers[outer.handler].name().to_string(),
            }
        } else {
            ScanOutcome::Completed
        };
        if !outcome.is_complete() {
            warn!("Input ended early: {}", outcome);
        }
        Ok(self.report(line_no, outcome))
    }

    fn report(&self, line_no: usize, outcome: ScanOutcome) -> ScanReport {
        ScanReport {
            lines: line_no,
            stopped_at: line_no,
            sections_closed: self.sections_closed,
            outcome,
        }
    }

    fn step(&mut self, token: TagToken, line_no: usize, sink: &mut dyn SectionSink) -> Result<Flow> {
        if let Some(ignored) = self.ignoring.as_mut() {
            if token.name() == ignored.tag {
                match token {
                    TagToken::Open { self_closing: false, .. } => ignored.depth += 1,
                    TagToken::Close { .. } => {
                        ignored.depth -= 1;
                        if ignored.depth == 0 {
                            trace!("Leaving ignored <{}> at line {}", ignored.tag, line_no);
                            self.ignoring = None;
                        }
                    }
                    _ => {}
                }
            }
            return Ok(Flow::Continue);
        }

        match token {
            TagToken::Open { name, attrs, self_closing } => {
                if is_ignored(&name, &self.ignored_tags) {
                    trace!("Ignoring <{}> from line {}", name, line_no);
                    if !self_closing {
                        self.ignoring = Some(IgnoredSubtree { tag: name, depth: 1 });
                    }
                    return Ok(Flow::Continue);
                }

                self.path.push(name);
                self.open_tag(&attrs, line_no);
                if self_closing {
                    self.close_tag(line_no, sink)?;
                }
                Ok(Flow::Continue)
            }
            TagToken::Close { name } => {
                if self.path.last().is_some_and(|top| *top == name) {
                    self.close_tag(line_no, sink)?;
                    Ok(Flow::Continue)
                } else {
                    Ok(Flow::Stop(ScanOutcome::Mismatch {
                        expected: self.path.last().cloned(),
                        found: name,
                    }))
                }
            }
        }
    }

    /// The tag at the top of the path was just pushed
    fn open_tag(&mut self, attrs: &Attributes, line_no: usize) {
        let matched = self.find_sections(attrs);
        if !matched.is_empty() {
            for index in matched {
                debug!(
                    "Section {} opened at line {} ({})",
                    self.handlers[index].name(),
                    line_no,
                    self.handlers[index].path_spec()
                );
                self.used[index] = true;
                self.handlers[index].open(attrs);
                self.active.push(ActiveSection {
                    handler: index,
                    depth: self.path.len(),
                    start_at: line_no,
                });
            }
            return;
        }

        if let Some(depth) = self.innermost_depth() {
            let rel_path = self.path[depth..].join(".");
            for active in self.active.iter().rev().take_while(|a| a.depth == depth) {
                self.handlers[active.handler].child_open(&rel_path, attrs);
            }
        }
    }

    /// Close the tag at the top of the path
    fn close_tag(&mut self, line_no: usize, sink: &mut dyn SectionSink) -> Result<()> {
        if let Some(depth) = self.innermost_depth() {
            if self.path.len() == depth {
                let split = self.active.iter().rposition(|a| a.depth != depth).map_or(0, |i| i + 1);
                let closing: Vec<ActiveSection> = self.active.drain(split..).collect();
                for active in closing {
                    let handler = &mut self.handlers[active.handler];
                    let data = handler.finish();
                    debug!("Section {} closed at line {}", handler.name(), line_no);
                    sink.section_closed(handler.name(), active.start_at, line_no, data)?;
                    self.sections_closed += 1;
                }
            } else {
                let rel_path = self.path[depth..].join(".");
                for active in self.active.iter().rev().take_while(|a| a.depth == depth) {
                    self.handlers[active.handler].child_close(&rel_path);
                }
            }
        }
        self.path.pop();
        Ok(())
    }

    /// Root depth of the innermost open sections. Sections opened by the
    /// same tag share it and all receive its children.
    fn innermost_depth(&self) -> Option<usize> {
        self.active.last().map(|a| a.depth)
    }

    /// Every unused handler matching the current tag. Outside any section all
    /// of them may match; inside one only predicate specs may open a nested
    /// section.
    fn find_sections(&self, attrs: &Attributes) -> Vec<usize> {
        let nested = !self.active.is_empty();
        (0..self.handlers.len())
            .filter(|&i| {
                let spec = self.handlers[i].path_spec();
                !self.used[i] && (!nested || spec.is_predicate()) && spec.matches(&self.path, attrs)
            })
            .collect()
    }
}
