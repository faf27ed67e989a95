//! Line-oriented progress protocol for the host process
//!
//! The host (a desktop viewer) launches the fetcher and parses stdout line by
//! line. Every line has the shape `Progress <0-100> <message>`; a run starts
//! with `Progress 0 Initializing...` and a successful one ends with
//! `Progress 100 Done!`. Percentages are checkpoints assigned per pipeline
//! stage. During a download whose size is known, [`ProgressBand`] interpolates
//! between the stage's checkpoint and the next one.

use std::io::{self, Write};
use std::sync::Mutex;

use crate::constants::progress;

/// Sink for progress checkpoints
pub trait ProgressReporter: Send + Sync {
    /// Emit one protocol line
    fn checkpoint(&self, percent: u8, message: &str);

    /// Raw transfer counters, for reporters that draw a byte-level display
    fn transfer(&self, _name: &str, _downloaded: u64, _total: Option<u64>) {}

    fn initializing(&self) {
        self.checkpoint(0, progress::INITIALIZING);
    }

    fn done(&self) {
        self.checkpoint(100, progress::DONE);
    }
}

/// Format a protocol line without the trailing newline
pub fn format_line(percent: u8, message: &str) -> String {
    format!("{} {} {}", progress::LINE_PREFIX, percent.min(100), message)
}

/// Writes protocol lines to stdout, flushing each one
#[derive(Debug, Default)]
pub struct StdoutReporter;

impl ProgressReporter for StdoutReporter {
    fn checkpoint(&self, percent: u8, message: &str) {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        // A closed stdout means the host is gone; nothing useful to do about it
        let _ = writeln!(handle, "{}", format_line(percent, message));
        let _ = handle.flush();
        tracing::debug!(percent, "{}", message);
    }
}

/// Keeps protocol lines in memory
#[derive(Debug, Default)]
pub struct MemoryReporter {
    lines: Mutex<Vec<String>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines emitted so far
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// Percentages emitted so far
    pub fn percents(&self) -> Vec<u8> {
        self.lines()
            .iter()
            .filter_map(|line| line.split_whitespace().nth(1)?.parse().ok())
            .collect()
    }
}

impl ProgressReporter for MemoryReporter {
    fn checkpoint(&self, percent: u8, message: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(format_line(percent, message));
        }
    }
}

/// Percent range owned by one download stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressBand {
    start: u8,
    end: u8,
}

impl ProgressBand {
    pub fn new(start: u8, end: u8) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    /// Percent reached after `downloaded` of `total` bytes
    pub fn interpolate(&self, downloaded: u64, total: u64) -> u8 {
        if total == 0 {
            return self.start;
        }
        let span = u64::from(self.end.saturating_sub(self.start));
        let step = span * downloaded.min(total) / total;
        self.start + step as u8
    }
}

/// Emits interpolated lines for one transfer, at most one per percent
pub struct TransferProgress<'a> {
    reporter: &'a dyn ProgressReporter,
    band: ProgressBand,
    name: String,
    total: Option<u64>,
    downloaded: u64,
    last_percent: u8,
}

impl<'a> TransferProgress<'a> {
    pub fn new(
        reporter: &'a dyn ProgressReporter,
        band: ProgressBand,
        name: &str,
        total: Option<u64>,
    ) -> Self {
        Self {
            reporter,
            band,
            name: name.to_string(),
            total: total.filter(|t| *t > 0),
            downloaded: 0,
            last_percent: band.start,
        }
    }

    /// Record `bytes` more bytes written
    pub fn advance(&mut self, bytes: u64) {
        self.downloaded += bytes;
        self.reporter
            .transfer(&self.name, self.downloaded, self.total);

        let Some(total) = self.total else {
            return;
        };
        let percent = self.band.interpolate(self.downloaded, total);
        if percent > self.last_percent && percent < self.band.end {
            self.last_percent = percent;
            let done = self.downloaded.min(total) * 100 / total;
            self.reporter
                .checkpoint(percent, &format!("Downloading {} ({}%)", self.name, done));
        }
    }

    pub fn downloaded(&self) -> u64 {
        self.downloaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_shape() {
        assert_eq!(format_line(0, "Initializing..."), "Progress 0 Initializing...");
        assert_eq!(format_line(100, "Done!"), "Progress 100 Done!");
        assert_eq!(format_line(250, "clamped"), "Progress 100 clamped");
    }

    #[test]
    fn test_memory_reporter_records_lines() {
        let reporter = MemoryReporter::new();
        reporter.initializing();
        reporter.checkpoint(40, "Decompressing reflectivity...");
        reporter.done();

        assert_eq!(
            reporter.lines(),
            vec![
                "Progress 0 Initializing...",
                "Progress 40 Decompressing reflectivity...",
                "Progress 100 Done!",
            ]
        );
        assert_eq!(reporter.percents(), vec![0, 40, 100]);
    }

    #[test]
    fn test_band_interpolation() {
        let band = ProgressBand::new(30, 40);
        assert_eq!(band.interpolate(0, 1000), 30);
        assert_eq!(band.interpolate(500, 1000), 35);
        assert_eq!(band.interpolate(1000, 1000), 40);
        assert_eq!(band.interpolate(5000, 1000), 40);
        assert_eq!(band.interpolate(10, 0), 30);
    }

    #[test]
    fn test_reversed_band_collapses_to_start() {
        let band = ProgressBand::new(50, 10);
        assert_eq!(band.interpolate(0, 1000), 50);
        assert_eq!(band.interpolate(500, 1000), 50);
        assert_eq!(band.interpolate(1000, 1000), 50);
    }

    #[test]
    fn test_transfer_progress_stays_inside_band() {
        let reporter = MemoryReporter::new();
        let mut transfer =
            TransferProgress::new(&reporter, ProgressBand::new(30, 85), "a.grib2", Some(1000));

        for _ in 0..100 {
            transfer.advance(10);
        }

        let percents = reporter.percents();
        assert!(!percents.is_empty());
        assert!(percents.windows(2).all(|w| w[0] < w[1]));
        assert!(percents.iter().all(|p| *p > 30 && *p < 85));
        assert_eq!(transfer.downloaded(), 1000);
    }

    #[test]
    fn test_unknown_length_emits_nothing() {
        let reporter = MemoryReporter::new();
        let mut transfer =
            TransferProgress::new(&reporter, ProgressBand::new(30, 40), "a.grib2.gz", None);
        transfer.advance(4096);
        transfer.advance(4096);
        assert!(reporter.lines().is_empty());
    }
}
