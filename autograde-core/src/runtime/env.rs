//! Collaborators handed to the interpreter
//!
//! Submitted code never touches process-global state: class lookup, console
//! streams, process exit and cancellation all come in through [`ExecEnv`].

use super::class::RuntimeClass;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Finds classes by qualified or simple name
pub trait ClassResolver: Send + Sync {
    fn find_class(&self, name: &str) -> Option<Arc<RuntimeClass>>;
}

/// The streams submitted code sees
pub trait Console: Send + Sync {
    fn write_out(&self, text: &str);

    fn write_err(&self, text: &str) {
        self.write_out(text);
    }

    /// Next input line without its terminator; `None` once input is exhausted
    fn read_line(&self) -> Option<String>;

    /// Whether `read_line` would return a line. Looking ahead is not a read.
    fn has_line(&self) -> bool;
}

/// Consulted when submitted code asks to terminate the process.
/// Returning means the request was intercepted.
pub trait ExitHook: Send + Sync {
    fn on_exit(&self, status: i32);
}

/// Advisory cancellation flag, optionally chained to a parent token
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    parent: Option<Arc<AtomicBool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that is also cancelled when `self` is
    pub fn child(&self) -> CancelToken {
        CancelToken {
            flag: Arc::new(AtomicBool::new(false)),
            parent: Some(Arc::clone(&self.flag)),
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
            || self
                .parent
                .as_ref()
                .is_some_and(|p| p.load(Ordering::SeqCst))
    }

    /// Whether the parent (not this token) fired
    pub fn parent_cancelled(&self) -> bool {
        self.parent
            .as_ref()
            .is_some_and(|p| p.load(Ordering::SeqCst))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeLimits {
    pub max_call_depth: usize,
}

impl Default for RuntimeLimits {
    fn default() -> Self {
        Self {
            max_call_depth: 512,
        }
    }
}

impl From<&autograde_config::LimitConfig> for RuntimeLimits {
    fn from(config: &autograde_config::LimitConfig) -> Self {
        Self {
            max_call_depth: config.max_call_depth,
        }
    }
}

/// Everything one invocation runs against
#[derive(Clone)]
pub struct ExecEnv {
    pub classes: Arc<dyn ClassResolver>,
    pub console: Arc<dyn Console>,
    pub exit: Arc<dyn ExitHook>,
    pub cancel: CancelToken,
    pub limits: RuntimeLimits,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_token_sees_parent() {
        let parent = CancelToken::new();
        let child = parent.child();
        assert!(!child.is_cancelled());
        parent.cancel();
        assert!(child.is_cancelled());
        assert!(child.parent_cancelled());
    }

    #[test]
    fn test_child_cancel_does_not_reach_parent() {
        let parent = CancelToken::new();
        let child = parent.child();
        child.cancel();
        assert!(child.is_cancelled());
        assert!(!child.parent_cancelled());
        assert!(!parent.is_cancelled());
    }
}
