//! AutoGrade Config - Pure configuration data structures
//!
//! This crate contains only data structures and validation, no global state.
//! It serves as the shared configuration vocabulary across all AutoGrade crates.
//! Every section deserializes with defaults, so a JSON file only needs to name
//! the values it overrides.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Name of the toolchain shipped with `autograde-core`
pub const EMBEDDED_TOOLCHAIN: &str = "javalite";

/// How the unit compiler treats a submission's namespace declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamespacePolicy {
    /// Always rewrite to a private per-run namespace
    #[default]
    Isolate,
    /// Keep the declared namespace unless it collides with an active unit
    Preserve,
}

/// What to do when a preserved namespace is already held by another unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// Fall back to a private per-run namespace
    #[default]
    Rename,
    /// Refuse to compile the unit
    Reject,
}

/// Configuration for the unit compiler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Toolchain name looked up in the toolchain registry
    pub toolchain: String,
    /// Exact toolchain version required, if any
    pub toolchain_version: Option<String>,
    /// Arguments handed to the toolchain (split on whitespace)
    pub toolchain_args: Vec<String>,
    /// Namespace rewriting policy
    pub namespace: NamespacePolicy,
    /// Collision handling under `NamespacePolicy::Preserve`
    pub collision: CollisionPolicy,
    /// Write each unit to the staging directory before compiling
    pub stage_sources: bool,
    /// Where staged sources go
    pub staging_dir: PathBuf,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            toolchain: EMBEDDED_TOOLCHAIN.to_string(),
            toolchain_version: None,
            toolchain_args: Vec::new(),
            namespace: NamespacePolicy::default(),
            collision: CollisionPolicy::default(),
            stage_sources: false,
            staging_dir: PathBuf::from("autograde-staging"),
        }
    }
}

/// Configuration for the bounded invocation engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Default deadline in milliseconds; `None` means unbounded
    pub default_deadline_ms: Option<u64>,
    /// Force access to non-public members of submitted types
    pub allow_private_access: bool,
    /// Stack size of each invocation worker, in bytes
    pub worker_stack_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_deadline_ms: Some(10_000),
            allow_private_access: true,
            worker_stack_size: 64 * 1024 * 1024,
        }
    }
}

/// Capture buffering mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMode {
    /// Nothing is shown until the capture ends
    #[default]
    Withheld,
    /// Every write is passed through immediately as well as buffered
    Live,
}

/// Configuration for I/O capture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub mode: CaptureMode,
    /// Emit the buffered block when the capture ends
    pub replay: bool,
    /// Header printed in front of the captured block
    pub header: Option<String>,
    /// Buffer limit; text beyond it is dropped and the capture marked truncated
    pub max_buffer_bytes: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            mode: CaptureMode::default(),
            replay: false,
            header: None,
            max_buffer_bytes: 1024 * 1024,
        }
    }
}

/// Configuration for execution limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitConfig {
    /// Maximum nesting of calls inside submitted code
    pub max_call_depth: usize,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self { max_call_depth: 512 }
    }
}

/// Harness component, used to derive log targets
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    Compiler,
    Loader,
    Engine,
    Capture,
    Guard,
    Runtime,
}

impl Phase {
    /// Get the string name of the phase
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Compiler => "compiler",
            Phase::Loader => "loader",
            Phase::Engine => "engine",
            Phase::Capture => "capture",
            Phase::Guard => "guard",
            Phase::Runtime => "runtime",
        }
    }

    /// Get the log target name for this phase
    pub fn target(&self) -> String {
        format!("autograde::{}", self.as_str())
    }

    pub fn all() -> [Phase; 6] {
        [
            Phase::Compiler,
            Phase::Loader,
            Phase::Engine,
            Phase::Capture,
            Phase::Guard,
            Phase::Runtime,
        ]
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Complete harness configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraderConfig {
    pub compiler: CompilerConfig,
    pub engine: EngineConfig,
    pub capture: CaptureConfig,
    pub limits: LimitConfig,
}

impl GraderConfig {
    /// Parse and validate a JSON document
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: GraderConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.compiler.toolchain.trim().is_empty() {
            return Err(ConfigError::Invalid("compiler.toolchain is empty".into()));
        }
        if self.engine.worker_stack_size == 0 {
            return Err(ConfigError::Invalid(
                "engine.worker_stack_size must be positive".into(),
            ));
        }
        if self.limits.max_call_depth == 0 {
            return Err(ConfigError::Invalid(
                "limits.max_call_depth must be positive".into(),
            ));
        }
        if self.capture.max_buffer_bytes == 0 {
            return Err(ConfigError::Invalid(
                "capture.max_buffer_bytes must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_compiler_config() {
        let cfg = CompilerConfig::default();
        assert_eq!(cfg.toolchain, EMBEDDED_TOOLCHAIN);
        assert_eq!(cfg.namespace, NamespacePolicy::Isolate);
        assert_eq!(cfg.collision, CollisionPolicy::Rename);
        assert!(!cfg.stage_sources);
    }

    #[test]
    fn test_default_limits() {
        let cfg = GraderConfig::default();
        assert_eq!(cfg.limits.max_call_depth, 512);
        assert_eq!(cfg.engine.default_deadline_ms, Some(10_000));
        assert!(cfg.engine.allow_private_access);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_phase_target() {
        assert_eq!(Phase::Engine.as_str(), "engine");
        assert_eq!(Phase::Capture.target(), "autograde::capture");
        assert_eq!(Phase::all().len(), 6);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let cfg = GraderConfig::from_json_str(
            r#"{ "capture": { "mode": "live" }, "engine": { "default_deadline_ms": null } }"#,
        )
        .unwrap();
        assert_eq!(cfg.capture.mode, CaptureMode::Live);
        assert_eq!(cfg.capture.max_buffer_bytes, 1024 * 1024);
        assert_eq!(cfg.engine.default_deadline_ms, None);
        assert_eq!(cfg.compiler, CompilerConfig::default());
    }

    #[test]
    fn test_policies_deserialize_snake_case() {
        let cfg = GraderConfig::from_json_str(
            r#"{ "compiler": { "namespace": "preserve", "collision": "reject" } }"#,
        )
        .unwrap();
        assert_eq!(cfg.compiler.namespace, NamespacePolicy::Preserve);
        assert_eq!(cfg.compiler.collision, CollisionPolicy::Reject);
    }

    #[test]
    fn test_validation_rejects_zero_depth() {
        let err = GraderConfig::from_json_str(r#"{ "limits": { "max_call_depth": 0 } }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_malformed_json() {
        let err = GraderConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
