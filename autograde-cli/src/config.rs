//! CLI logging configuration
//!
//! `--log-level` takes a global level optionally followed by per-phase
//! overrides: `warn`, `info,engine=debug`, `capture=trace`.

use autograde_config::Phase;
use std::collections::HashMap;
use std::str::FromStr;
use tracing::Level;

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub global: Level,
    pub phases: HashMap<Phase, Level>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            global: Level::WARN,
            phases: HashMap::new(),
        }
    }
}

impl LogConfig {
    /// Level for one phase's target
    pub fn level_for(&self, phase: Phase) -> Level {
        self.phases.get(&phase).copied().unwrap_or(self.global)
    }
}

impl FromStr for LogConfig {
    type Err = String;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let mut config = LogConfig::default();
        for part in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match part.split_once('=') {
                Some((phase, level)) => {
                    let phase = Phase::all()
                        .into_iter()
                        .find(|p| p.as_str() == phase.trim())
                        .ok_or_else(|| format!("unknown log phase '{phase}'"))?;
                    config.phases.insert(phase, parse_level(level)?);
                }
                None => config.global = parse_level(part)?,
            }
        }
        Ok(config)
    }
}

fn parse_level(text: &str) -> Result<Level, String> {
    match text.trim().to_lowercase().as_str() {
        // silent still reports errors
        "silent" | "error" => Ok(Level::ERROR),
        "warn" => Ok(Level::WARN),
        "info" => Ok(Level::INFO),
        "debug" => Ok(Level::DEBUG),
        "trace" => Ok(Level::TRACE),
        other => Err(format!("unknown log level '{other}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_global_and_overrides() {
        let config: LogConfig = "info, engine=debug ,capture=trace".parse().unwrap();
        assert_eq!(config.global, Level::INFO);
        assert_eq!(config.level_for(Phase::Engine), Level::DEBUG);
        assert_eq!(config.level_for(Phase::Capture), Level::TRACE);
        assert_eq!(config.level_for(Phase::Compiler), Level::INFO);
    }

    #[test]
    fn test_parse_errors() {
        assert!("loud".parse::<LogConfig>().is_err());
        assert!("vm=debug".parse::<LogConfig>().is_err());
    }
}
