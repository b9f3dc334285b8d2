//! Thread priority hint applied by extraction tasks

use thread_priority::{ThreadPriority, ThreadPriorityOsValue, set_current_thread_priority};

use super::types::ExecutionPriority;

/// Applies an [`ExecutionPriority`] to the calling worker thread.
///
/// Hints are best effort: an `Err` is logged by the task and otherwise
/// ignored.
pub trait PriorityHint: Send + Sync {
    fn apply(&self, priority: ExecutionPriority) -> std::io::Result<()>;
}

/// Default hint. Sets the OS priority of the calling thread.
///
/// `Background` drops the thread to the lowest priority of its scheduling
/// policy (nice 19 on Linux, `THREAD_PRIORITY_LOWEST` on Windows).
/// `Normal` asks for the default level again. Raising a thread back after
/// lowering it needs privileges on Linux, so that call usually fails there
/// and the worker stays at background priority.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadPriorityHint;

impl ThreadPriorityHint {
    fn os_priority(priority: ExecutionPriority) -> ThreadPriority {
        match priority {
            ExecutionPriority::Normal => ThreadPriority::Os(ThreadPriorityOsValue::default()),
            ExecutionPriority::Background => ThreadPriority::Min,
        }
    }
}

impl PriorityHint for ThreadPriorityHint {
    fn apply(&self, priority: ExecutionPriority) -> std::io::Result<()> {
        tracing::trace!(
            thread = std::thread::current().name().unwrap_or("unnamed"),
            "Priority hint: {priority}"
        );
        set_current_thread_priority(Self::os_priority(priority)).map_err(std::io::Error::other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_maps_to_min() {
        assert_eq!(
            ThreadPriorityHint::os_priority(ExecutionPriority::Background),
            ThreadPriority::Min
        );
        assert_ne!(
            ThreadPriorityHint::os_priority(ExecutionPriority::Normal),
            ThreadPriority::Min
        );
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_background_hint_on_worker_thread() {
        use crate::extract::executor::{Executor, RayonExecutor};
        use std::sync::mpsc;

        let executor = RayonExecutor::new(1).unwrap();
        let (tx, rx) = mpsc::channel();
        executor.execute(Box::new(move || {
            // Lowering priority never needs privileges
            let lowered = ThreadPriorityHint.apply(ExecutionPriority::Background);
            // Raising it again may be refused; it must not panic
            let _ = ThreadPriorityHint.apply(ExecutionPriority::Normal);
            tx.send(lowered.map_err(|e| e.to_string())).unwrap();
        }));
        assert_eq!(rx.recv().unwrap(), Ok(()));
    }
}
