//! Shared types for batch extraction

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

use crate::archive::EntryId;

/// One unit of work: extract `entry` to `destination`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    pub entry: EntryId,
    pub destination: PathBuf,
}

impl JobSpec {
    #[must_use]
    pub fn new(entry: EntryId, destination: impl Into<PathBuf>) -> Self {
        Self {
            entry,
            destination: destination.into(),
        }
    }
}

/// Scheduling hint applied by each task before it extracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionPriority {
    #[default]
    Normal,
    Background,
}

impl ExecutionPriority {
    fn to_u8(self) -> u8 {
        match self {
            ExecutionPriority::Normal => 0,
            ExecutionPriority::Background => 1,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => ExecutionPriority::Background,
            _ => ExecutionPriority::Normal,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionPriority::Normal => "normal",
            ExecutionPriority::Background => "background",
        }
    }
}

impl fmt::Display for ExecutionPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "normal" | "n" => Ok(ExecutionPriority::Normal),
            "background" | "bg" | "low" => Ok(ExecutionPriority::Background),
            _ => Err(format!(
                "Invalid priority '{s}'. Valid values: normal, background"
            )),
        }
    }
}

/// Priority value readable by every task of a batch and writable by the
/// caller while the batch runs. Reads are a best-effort hint.
#[derive(Debug, Clone, Default)]
pub struct SharedPriority(Arc<AtomicU8>);

impl SharedPriority {
    #[must_use]
    pub fn new(priority: ExecutionPriority) -> Self {
        Self(Arc::new(AtomicU8::new(priority.to_u8())))
    }

    #[must_use]
    pub fn get(&self) -> ExecutionPriority {
        ExecutionPriority::from_u8(self.0.load(Ordering::Relaxed))
    }

    pub fn set(&self, priority: ExecutionPriority) {
        self.0.store(priority.to_u8(), Ordering::Relaxed);
    }
}

/// Terminal result of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    Success,
    Cancelled,
    Failed,
}

impl BatchOutcome {
    /// Code reported to the invoking layer: `1` success, `0` cancelled,
    /// `-1` failed.
    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            BatchOutcome::Success => 1,
            BatchOutcome::Cancelled => 0,
            BatchOutcome::Failed => -1,
        }
    }
}

impl fmt::Display for BatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BatchOutcome::Success => "success",
            BatchOutcome::Cancelled => "cancelled",
            BatchOutcome::Failed => "failed",
        })
    }
}

/// Consistent snapshot of a batch's progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressState {
    pub total: usize,
    pub completed: usize,
    pub outcome: Option<BatchOutcome>,
}

impl ProgressState {
    /// Completed fraction in `0.0..=1.0`; an empty batch counts as done.
    #[must_use]
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.outcome.is_some()
    }
}

/// Callback invoked with progress snapshots as jobs complete.
pub type ProgressObserver = Arc<dyn Fn(&ProgressState) + Send + Sync>;
