//! Optional terminal progress bar
//!
//! The host process reads protocol lines from stdout, which must stay clean.
//! When a person runs the tool in a terminal with `--progress-bar`, an
//! indicatif byte bar is drawn on stderr next to the protocol lines. Without a
//! terminal the wrapper is a plain pass-through.

use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressStyle};

use crate::app::ProgressReporter;

const BAR_TEMPLATE: &str =
    "{spinner:.green} {msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";
const SPINNER_TEMPLATE: &str = "{spinner:.green} {msg} {bytes} ({bytes_per_sec})";

/// Bar of the transfer currently in flight
struct ActiveBar {
    name: String,
    bar: ProgressBar,
}

/// Protocol reporter that also draws byte-level transfer bars
pub struct ProgressDisplay<R> {
    inner: R,
    bars_enabled: bool,
    active: Mutex<Option<ActiveBar>>,
}

impl<R: ProgressReporter> ProgressDisplay<R> {
    /// Wrap `inner`; bars are drawn only when requested and stderr is a terminal
    pub fn new(inner: R, requested: bool) -> Self {
        let is_terminal = atty::is(atty::Stream::Stderr);
        if requested && !is_terminal {
            tracing::debug!("stderr is not a terminal, progress bar disabled");
        }
        Self::with_bars(inner, requested && is_terminal)
    }

    fn with_bars(inner: R, bars_enabled: bool) -> Self {
        Self {
            inner,
            bars_enabled,
            active: Mutex::new(None),
        }
    }

    pub fn bars_enabled(&self) -> bool {
        self.bars_enabled
    }

    fn new_bar(name: &str, total: Option<u64>) -> ProgressBar {
        let (bar, template) = match total {
            Some(total) => (ProgressBar::new(total), BAR_TEMPLATE),
            None => (ProgressBar::new_spinner(), SPINNER_TEMPLATE),
        };
        let style = ProgressStyle::default_bar()
            .template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-");
        bar.set_style(style);
        bar.set_message(name.to_string());
        bar
    }

    fn finish_active(&self) {
        if let Ok(mut active) = self.active.lock() {
            if let Some(active) = active.take() {
                active.bar.finish_and_clear();
            }
        }
    }
}

impl<R: ProgressReporter> ProgressReporter for ProgressDisplay<R> {
    fn checkpoint(&self, percent: u8, message: &str) {
        self.inner.checkpoint(percent, message);
    }

    fn transfer(&self, name: &str, downloaded: u64, total: Option<u64>) {
        self.inner.transfer(name, downloaded, total);
        if !self.bars_enabled {
            return;
        }

        let Ok(mut active) = self.active.lock() else {
            return;
        };
        let is_current = active.as_ref().map_or(false, |a| a.name == name);
        if !is_current {
            if let Some(previous) = active.take() {
                previous.bar.finish_and_clear();
            }
            *active = Some(ActiveBar {
                name: name.to_string(),
                bar: Self::new_bar(name, total),
            });
        }
        if let Some(current) = active.as_ref() {
            current.bar.set_position(downloaded);
            if total.map_or(false, |t| downloaded >= t) {
                current.bar.finish_and_clear();
            }
        }
    }

    fn done(&self) {
        self.finish_active();
        self.inner.done();
    }
}

impl<R> Drop for ProgressDisplay<R> {
    fn drop(&mut self) {
        if let Ok(mut active) = self.active.lock() {
            if let Some(active) = active.take() {
                active.bar.abandon();
            }
        }
    }
}
