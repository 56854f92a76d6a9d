//! Process-termination guard
//!
//! [`ExitGuard`] is owned by the orchestrator and is the only thing that can
//! arm or disarm interception. Invocations get an [`ExitGate`], which only
//! consults the guard: while it is armed an exit request is counted and
//! returned to the interpreter as a signal instead of ending the process.

use autograde_core::ExitHook;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct GuardState {
    armed: AtomicBool,
    intercepted: AtomicUsize,
}

/// The single privileged holder of the guard state; deliberately not `Clone`
#[derive(Debug, Default)]
pub struct ExitGuard {
    state: Arc<GuardState>,
}

impl ExitGuard {
    /// A disarmed guard
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&self) {
        if !self.state.armed.swap(true, Ordering::SeqCst) {
            debug!(target: "autograde::guard", "armed");
        }
    }

    pub fn disarm(&self) {
        if self.state.armed.swap(false, Ordering::SeqCst) {
            debug!(target: "autograde::guard", "disarmed");
        }
    }

    pub fn is_armed(&self) -> bool {
        self.state.armed.load(Ordering::SeqCst)
    }

    /// Arm until the returned scope is dropped, then restore the previous state
    pub fn armed(&self) -> ArmedScope<'_> {
        let was_armed = self.is_armed();
        self.arm();
        ArmedScope {
            guard: self,
            was_armed,
        }
    }

    /// Capability handed to one invocation
    pub fn gate(&self) -> ExitGate {
        ExitGate {
            state: Arc::clone(&self.state),
            detached: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Exit requests intercepted so far
    pub fn intercepted(&self) -> usize {
        self.state.intercepted.load(Ordering::SeqCst)
    }

    /// The orchestrator's own shutdown path
    pub fn shutdown(self, status: i32) -> ! {
        self.disarm();
        info!(target: "autograde::guard", status, "shutting down");
        std::process::exit(status)
    }
}

/// Restores the guard's previous state on drop
#[derive(Debug)]
pub struct ArmedScope<'g> {
    guard: &'g ExitGuard,
    was_armed: bool,
}

impl Drop for ArmedScope<'_> {
    fn drop(&mut self) {
        if !self.was_armed {
            self.guard.disarm();
        }
    }
}

/// What submitted code's `System.exit` consults
#[derive(Debug, Clone)]
pub struct ExitGate {
    state: Arc<GuardState>,
    detached: Arc<AtomicBool>,
}

impl ExitGate {
    /// Cut the gate loose from the guard: from now on every request is
    /// intercepted, whatever state the guard is in. Used for workers that
    /// outlive their invocation.
    pub fn detach(&self) {
        self.detached.store(true, Ordering::SeqCst);
    }

    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::SeqCst)
    }

    /// Whether a request made now would be intercepted
    pub fn intercepts(&self) -> bool {
        self.is_detached() || self.state.armed.load(Ordering::SeqCst)
    }
}

impl ExitHook for ExitGate {
    fn on_exit(&self, status: i32) {
        if self.intercepts() {
            let count = self.state.intercepted.fetch_add(1, Ordering::SeqCst) + 1;
            debug!(target: "autograde::guard", status, intercepted = count, "exit intercepted");
            return;
        }
        warn!(target: "autograde::guard", status, "guard disarmed, exiting process");
        std::process::exit(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arm_and_disarm_are_idempotent() {
        let guard = ExitGuard::new();
        assert!(!guard.is_armed());
        guard.arm();
        guard.arm();
        assert!(guard.is_armed());
        guard.disarm();
        guard.disarm();
        assert!(!guard.is_armed());
    }

    #[test]
    fn test_armed_scope_restores_state() {
        let guard = ExitGuard::new();
        {
            let _scope = guard.armed();
            assert!(guard.is_armed());
        }
        assert!(!guard.is_armed());

        guard.arm();
        {
            let _scope = guard.armed();
        }
        assert!(guard.is_armed());
    }

    #[test]
    fn test_gate_intercepts_while_armed() {
        let guard = ExitGuard::new();
        let gate = guard.gate();
        let _scope = guard.armed();
        gate.on_exit(3);
        gate.on_exit(4);
        assert_eq!(guard.intercepted(), 2);
    }

    #[test]
    fn test_detached_gate_ignores_guard_state() {
        let guard = ExitGuard::new();
        let gate = guard.gate();
        assert!(!gate.intercepts());
        gate.detach();
        assert!(gate.intercepts());
        gate.on_exit(1);
        assert_eq!(guard.intercepted(), 1);
        // other gates are unaffected
        assert!(!guard.gate().intercepts());
    }
}
