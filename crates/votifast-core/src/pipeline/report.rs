//! Per-item outcome of one batch.

use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resolve,
    Download,
    Decrypt,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Resolve => "resolve",
            Stage::Download => "download",
            Stage::Decrypt => "decrypt",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyPresent,
    Unplayable,
    /// Same source file as an earlier item of the batch.
    Duplicate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Completed { path: PathBuf },
    Skipped(SkipReason),
    Failed { stage: Stage, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemReport {
    pub track_id: String,
    pub label: String,
    pub outcome: ItemOutcome,
}

/// Outcomes in request order plus job counters for the batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub items: Vec<ItemReport>,
    pub downloads_enqueued: usize,
    pub decrypts_enqueued: usize,
}

impl BatchReport {
    pub fn completed(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Completed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Failed { .. }))
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    fn count(&self, pred: impl Fn(&ItemOutcome) -> bool) -> usize {
        self.items.iter().filter(|i| pred(&i.outcome)).count()
    }
}

impl fmt::Display for ItemReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            ItemOutcome::Completed { path } => write!(f, "done     {}", path.display()),
            ItemOutcome::Skipped(SkipReason::AlreadyPresent) => {
                write!(f, "skipped  {} (already downloaded)", self.label)
            }
            ItemOutcome::Skipped(SkipReason::Unplayable) => {
                write!(f, "skipped  {} (not playable)", self.label)
            }
            ItemOutcome::Skipped(SkipReason::Duplicate) => {
                write!(f, "skipped  {} (listed twice)", self.label)
            }
            ItemOutcome::Failed { stage, message } => {
                write!(f, "FAILED   {} [{}]: {}", self.label, stage, message)
            }
        }
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for item in &self.items {
            writeln!(f, "{item}")?;
        }
        write!(
            f,
            "{} completed, {} skipped, {} failed",
            self.completed(),
            self.skipped(),
            self.failed()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_and_summary() {
        let item = |outcome| ItemReport {
            track_id: "t".to_string(),
            label: "A - T".to_string(),
            outcome,
        };
        let report = BatchReport {
            items: vec![
                item(ItemOutcome::Completed { path: PathBuf::from("/m/A - T.m4a") }),
                item(ItemOutcome::Skipped(SkipReason::AlreadyPresent)),
                item(ItemOutcome::Failed {
                    stage: Stage::Download,
                    message: "server returned HTTP 404".to_string(),
                }),
            ],
            downloads_enqueued: 2,
            decrypts_enqueued: 1,
        };
        assert_eq!((report.completed(), report.skipped(), report.failed()), (1, 1, 1));
        assert!(report.has_failures());
        let text = report.to_string();
        assert!(text.contains("FAILED   A - T [download]: server returned HTTP 404"));
        assert!(text.ends_with("1 completed, 1 skipped, 1 failed"));
    }

    #[test]
    fn duplicate_is_a_skip() {
        let report = BatchReport {
            items: vec![ItemReport {
                track_id: "t".to_string(),
                label: "A - T".to_string(),
                outcome: ItemOutcome::Skipped(SkipReason::Duplicate),
            }],
            ..BatchReport::default()
        };
        assert_eq!(report.skipped(), 1);
        assert!(!report.has_failures());
        assert!(report.to_string().contains("skipped  A - T (listed twice)"));
    }
}
