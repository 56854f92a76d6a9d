//! I/O capture and replay
//!
//! A [`CaptureSession`] is the [`Console`] an invocation runs against: input
//! comes from a pre-seeded list of lines, output goes into a buffer. In
//! withheld mode nothing reaches the [`OutputSink`] until [`CaptureSession::end`];
//! in live mode every write passes straight through as well. Either way the
//! sink ends up with the same text.

use autograde_config::{CaptureConfig, CaptureMode};
use autograde_core::Console;
use std::collections::VecDeque;
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, trace};

/// Appended to the replay when the script ended abnormally
pub const PREMATURE_EXIT_NOTICE: &str = "Grading script ended before running all test cases";

/// Where captured output is shown
pub trait OutputSink: Send + Sync {
    fn emit(&self, text: &str);
}

/// Writes to the process's standard output
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn emit(&self, text: &str) {
        let mut out = std::io::stdout().lock();
        // a closed stdout must not take the harness down
        let _ = out.write_all(text.as_bytes());
        let _ = out.flush();
    }
}

/// Collects everything in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    text: Arc<Mutex<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        self.text
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl OutputSink for MemorySink {
    fn emit(&self, text: &str) {
        self.text
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_str(text);
    }
}

#[derive(Debug, Default)]
struct CaptureState {
    input: VecDeque<String>,
    buffer: String,
    truncated: bool,
    input_exhausted: bool,
    premature_exit: bool,
    ended: bool,
    late_writes: usize,
}

/// What a capture collected
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CaptureReport {
    pub output: String,
    /// The buffer limit was hit and later text dropped
    pub truncated: bool,
    /// The program read past the supplied input, so its output may be partial
    pub incomplete: bool,
    pub premature_exit: bool,
}

pub struct CaptureSession {
    mode: CaptureMode,
    header: Option<String>,
    limit: usize,
    sink: Arc<dyn OutputSink>,
    state: Mutex<CaptureState>,
}

impl CaptureSession {
    /// Start capturing with `input` as the program's standard input
    pub fn begin(config: &CaptureConfig, input: Vec<String>, sink: Arc<dyn OutputSink>) -> Arc<Self> {
        let session = Arc::new(Self {
            mode: config.mode,
            header: config.header.clone(),
            limit: config.max_buffer_bytes,
            sink,
            state: Mutex::new(CaptureState {
                input: input.into(),
                ..CaptureState::default()
            }),
        });
        debug!(target: "autograde::capture", mode = ?session.mode, "capture started");
        if session.mode == CaptureMode::Live {
            if let Some(header) = session.header_block() {
                session.sink.emit(&header);
            }
        }
        session
    }

    fn state(&self) -> MutexGuard<'_, CaptureState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn header_block(&self) -> Option<String> {
        self.header.as_ref().map(|header| format!("{header}\n"))
    }

    /// Tag the capture as ended abnormally; the replay says so
    pub fn mark_premature_exit(&self) {
        self.state().premature_exit = true;
    }

    /// Output buffered so far
    pub fn snapshot(&self) -> String {
        self.state().buffer.clone()
    }

    pub fn is_ended(&self) -> bool {
        self.state().ended
    }

    /// Stop capturing. With `replay`, withheld output is emitted as one
    /// block behind the header. Writes after this point are dropped.
    pub fn end(&self, replay: bool) -> CaptureReport {
        let mut state = self.state();
        state.ended = true;
        let report = CaptureReport {
            output: state.buffer.clone(),
            truncated: state.truncated,
            incomplete: state.input_exhausted,
            premature_exit: state.premature_exit,
        };
        drop(state);

        if replay {
            let mut block = String::new();
            if self.mode == CaptureMode::Withheld {
                block.extend(self.header_block());
                block.push_str(&report.output);
            }
            if report.premature_exit {
                if !block.is_empty() && !block.ends_with('\n') {
                    block.push('\n');
                }
                block.push_str(PREMATURE_EXIT_NOTICE);
                block.push('\n');
            }
            if !block.is_empty() {
                self.sink.emit(&block);
            }
        }
        debug!(
            target: "autograde::capture",
            bytes = report.output.len(),
            truncated = report.truncated,
            incomplete = report.incomplete,
            "capture ended"
        );
        report
    }

    fn write(&self, text: &str) {
        let mut state = self.state();
        if state.ended {
            state.late_writes += 1;
            trace!(target: "autograde::capture", late = state.late_writes, "dropping late write");
            return;
        }
        if state.truncated {
            return;
        }
        let room = self.limit.saturating_sub(state.buffer.len());
        let kept = if text.len() <= room {
            text
        } else {
            let mut cut = room;
            while !text.is_char_boundary(cut) {
                cut -= 1;
            }
            state.truncated = true;
            debug!(target: "autograde::capture", limit = self.limit, "capture truncated");
            &text[..cut]
        };
        state.buffer.push_str(kept);
        if self.mode == CaptureMode::Live && !kept.is_empty() {
            self.sink.emit(kept);
        }
    }
}

impl Console for CaptureSession {
    fn write_out(&self, text: &str) {
        self.write(text);
    }

    fn write_err(&self, text: &str) {
        self.write(text);
    }

    fn read_line(&self) -> Option<String> {
        let mut state = self.state();
        let line = state.input.pop_front();
        if line.is_none() {
            state.input_exhausted = true;
            debug!(target: "autograde::capture", "input exhausted");
        }
        line
    }

    fn has_line(&self) -> bool {
        !self.state().input.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(mode: CaptureMode) -> CaptureConfig {
        CaptureConfig {
            mode,
            header: Some("== test 1 ==".into()),
            ..CaptureConfig::default()
        }
    }

    #[test]
    fn test_withheld_then_replay_equals_live() {
        let run = |mode| {
            let sink = MemorySink::new();
            let capture = CaptureSession::begin(&config(mode), Vec::new(), Arc::new(sink.clone()));
            capture.write_out("a\n");
            capture.write_err("b");
            capture.write_out("c\n");
            let shown_before_end = sink.contents();
            capture.end(true);
            (shown_before_end, sink.contents())
        };
        let (withheld_early, withheld) = run(CaptureMode::Withheld);
        let (live_early, live) = run(CaptureMode::Live);
        assert_eq!(withheld_early, "");
        assert_eq!(live_early, "== test 1 ==\na\nbc\n");
        assert_eq!(withheld, live);
    }

    #[test]
    fn test_no_replay_keeps_output_private() {
        let sink = MemorySink::new();
        let capture = CaptureSession::begin(&config(CaptureMode::Withheld), Vec::new(), Arc::new(sink.clone()));
        capture.write_out("secret");
        let report = capture.end(false);
        assert_eq!(report.output, "secret");
        assert_eq!(sink.contents(), "");
    }

    #[test]
    fn test_input_exhaustion_marks_incomplete() {
        let capture = CaptureSession::begin(
            &CaptureConfig::default(),
            vec!["1".into(), "2".into()],
            Arc::new(MemorySink::new()),
        );
        assert_eq!(capture.read_line().as_deref(), Some("1"));
        assert_eq!(capture.read_line().as_deref(), Some("2"));
        assert_eq!(capture.read_line(), None);
        assert!(capture.end(false).incomplete);
    }

    #[test]
    fn test_truncation() {
        let config = CaptureConfig {
            max_buffer_bytes: 5,
            ..CaptureConfig::default()
        };
        let capture = CaptureSession::begin(&config, Vec::new(), Arc::new(MemorySink::new()));
        capture.write_out("abc");
        capture.write_out("déf");
        capture.write_out("more");
        let report = capture.end(false);
        assert_eq!(report.output, "abcd");
        assert!(report.truncated);
    }

    #[test]
    fn test_premature_exit_annotation() {
        let sink = MemorySink::new();
        let capture = CaptureSession::begin(&CaptureConfig::default(), Vec::new(), Arc::new(sink.clone()));
        capture.write_out("partial");
        capture.mark_premature_exit();
        let report = capture.end(true);
        assert!(report.premature_exit);
        assert_eq!(sink.contents(), format!("partial\n{PREMATURE_EXIT_NOTICE}\n"));
    }

    #[test]
    fn test_late_writes_are_dropped() {
        let sink = MemorySink::new();
        let capture = CaptureSession::begin(&config(CaptureMode::Live), Vec::new(), Arc::new(sink.clone()));
        capture.end(true);
        capture.write_out("straggler");
        assert!(capture.is_ended());
        assert_eq!(capture.snapshot(), "");
        assert_eq!(sink.contents(), "== test 1 ==\n");
    }
}
