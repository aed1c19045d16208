//! Scan progress reporting.
//!
//! `aidx scan` walks a repository tree, then folds each version directory
//! into records. Events follow those two phases and close with a summary.
//! Everything goes to **stderr** so stdout stays parseable.

use std::io::Write;

/// Files walked between two [`ScanProgressEvent::Walking`] reports.
pub const WALK_REPORT_EVERY: u64 = 1000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScanProgressEvent {
    /// Tree walk in progress. The number of candidate files is not known up
    /// front, so only running counts are reported.
    Walking {
        repository: String,
        files_seen: u64,
        skipped: u64,
    },
    /// One version directory (relative path) turned into `artifacts` records.
    Folded {
        repository: String,
        directory: String,
        artifacts: u64,
        done: u64,
        total: u64,
    },
    Finished {
        repository: String,
        artifacts: u64,
        skipped: u64,
    },
}

impl ScanProgressEvent {
    fn phase(&self) -> &'static str {
        match self {
            ScanProgressEvent::Walking { .. } => "walking",
            ScanProgressEvent::Folded { .. } => "folding",
            ScanProgressEvent::Finished { .. } => "finished",
        }
    }

    /// One line for a terminal, e.g. `scan central  folding  3 / 40 directories  org/acme/tool/1.0 (2)`.
    pub fn human_line(&self) -> String {
        match self {
            ScanProgressEvent::Walking {
                repository,
                files_seen,
                skipped,
            } => format!(
                "scan {}  walking  {} files, {} skipped",
                repository,
                format_number(*files_seen),
                format_number(*skipped)
            ),
            ScanProgressEvent::Folded {
                repository,
                directory,
                artifacts,
                done,
                total,
            } => format!(
                "scan {}  folding  {} / {} directories  {} ({})",
                repository,
                format_number(*done),
                format_number(*total),
                directory,
                artifacts
            ),
            ScanProgressEvent::Finished {
                repository,
                artifacts,
                skipped,
            } => format!(
                "scan {}  done  {} artifacts, {} files skipped",
                repository,
                format_number(*artifacts),
                format_number(*skipped)
            ),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut obj = match self {
            ScanProgressEvent::Walking {
                repository,
                files_seen,
                skipped,
            } => serde_json::json!({
                "repository": repository,
                "files_seen": files_seen,
                "skipped": skipped,
            }),
            ScanProgressEvent::Folded {
                repository,
                directory,
                artifacts,
                done,
                total,
            } => serde_json::json!({
                "repository": repository,
                "directory": directory,
                "artifacts": artifacts,
                "n": done,
                "total": total,
            }),
            ScanProgressEvent::Finished {
                repository,
                artifacts,
                skipped,
            } => serde_json::json!({
                "repository": repository,
                "artifacts": artifacts,
                "skipped": skipped,
            }),
        };
        obj["event"] = "progress".into();
        obj["phase"] = self.phase().into();
        obj
    }
}

pub trait ScanProgressReporter: Send + Sync {
    fn report(&self, event: ScanProgressEvent);
}

/// Human-friendly progress on stderr.
pub struct StderrProgress;

impl ScanProgressReporter for StderrProgress {
    fn report(&self, event: ScanProgressEvent) {
        let mut err = std::io::stderr().lock();
        let _ = writeln!(err, "{}", event.human_line());
        let _ = err.flush();
    }
}

/// One JSON object per line on stderr.
pub struct JsonProgress;

impl ScanProgressReporter for JsonProgress {
    fn report(&self, event: ScanProgressEvent) {
        if let Ok(line) = serde_json::to_string(&event.to_json()) {
            let mut err = std::io::stderr().lock();
            let _ = writeln!(err, "{}", line);
            let _ = err.flush();
        }
    }
}

pub struct NoProgress;

impl ScanProgressReporter for NoProgress {
    fn report(&self, _event: ScanProgressEvent) {}
}

pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn ScanProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn folded_line_names_directory() {
        let event = ScanProgressEvent::Folded {
            repository: "central".into(),
            directory: "org/acme/tool/1.0".into(),
            artifacts: 2,
            done: 3,
            total: 1200,
        };
        assert_eq!(
            event.human_line(),
            "scan central  folding  3 / 1,200 directories  org/acme/tool/1.0 (2)"
        );
    }

    #[test]
    fn json_carries_phase_and_counts() {
        let event = ScanProgressEvent::Finished {
            repository: "central".into(),
            artifacts: 10,
            skipped: 1,
        };
        let json = event.to_json();
        assert_eq!(json["event"], "progress");
        assert_eq!(json["phase"], "finished");
        assert_eq!(json["artifacts"], 10);
        assert_eq!(json["skipped"], 1);
    }
}
