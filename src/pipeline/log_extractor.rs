//! Ban line extraction from fail2ban logs
//!
//! Scans the log line by line, keeps only lines stamped with the requested
//! date, and captures the IPv4 address of every `Ban` action issued by the
//! configured jail.

use regex::Regex;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::info;

use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::models::BanEvent;

/// Extracts ban events for a single jail
#[derive(Debug, Clone)]
pub struct BanLogExtractor {
    jail: String,
    pattern: Regex,
}

impl BanLogExtractor {
    /// Build an extractor for `jail`
    ///
    /// The jail name is matched literally, so names containing regex
    /// metacharacters (e.g. `nginx.http-auth`) are safe.
    pub fn new(jail: &str) -> PipelineResult<Self> {
        let pattern = format!(
            r"fail2ban\.actions\s+\[\d+\]:\s+NOTICE\s+\[{}\]\s+Ban\s+([0-9]{{1,3}}(?:\.[0-9]{{1,3}}){{3}})\b",
            regex::escape(jail)
        );
        let pattern = Regex::new(&pattern).map_err(|source| PipelineError::Pattern {
            jail: jail.to_string(),
            source,
        })?;

        Ok(Self {
            jail: jail.to_string(),
            pattern,
        })
    }

    /// Extract ban events from the log file at `path`
    ///
    /// # Arguments
    /// * `path` - fail2ban log file
    /// * `date_filter` - literal date (`YYYY-MM-DD`) a line must contain
    ///
    /// # Returns
    /// One event per matching line, in file order, duplicates preserved
    pub fn extract(&self, path: &Path, date_filter: &str) -> PipelineResult<Vec<BanEvent>> {
        info!(
            "Parsing log file '{}' for jail '{}'",
            path.display(),
            self.jail
        );

        let file = File::open(path).map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let events = self
            .extract_from_reader(BufReader::new(file), date_filter)
            .map_err(|source| PipelineError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        info!("Found {} ban events for {}", events.len(), date_filter);
        Ok(events)
    }

    /// Extract ban events from any buffered reader
    ///
    /// Lines are decoded lossily so stray invalid UTF-8 never aborts the scan.
    pub fn extract_from_reader<R: BufRead>(
        &self,
        reader: R,
        date_filter: &str,
    ) -> std::io::Result<Vec<BanEvent>> {
        let mut events = Vec::new();

        for line in reader.split(b'\n') {
            let line = line?;
            let line = String::from_utf8_lossy(&line);

            if !line.contains(date_filter) {
                continue;
            }

            if let Some(ip) = self.match_line(&line) {
                events.push(BanEvent::new(ip));
            }
        }

        Ok(events)
    }

    /// Return the banned address if `line` is a ban notice for this jail
    pub fn match_line<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.pattern
            .captures(line)
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str())
    }
}

/// Convenience wrapper around [`BanLogExtractor`]
pub fn extract_bans(path: &Path, jail: &str, date_filter: &str) -> PipelineResult<Vec<BanEvent>> {
    BanLogExtractor::new(jail)?.extract(path, date_filter)
}
