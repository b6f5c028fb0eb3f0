use std::{env, path::PathBuf};
use thiserror::Error;

pub const ENTRY_POINT_VAR: &str = "BRS_ENTRY_POINT";
pub const STOP_ON_CRASH_VAR: &str = "BRS_STOP_ON_CRASH";
pub const MAX_CALL_DEPTH_VAR: &str = "BRS_MAX_CALL_DEPTH";
pub const ROOT_VAR: &str = "BRS_ROOT";

pub const DEFAULT_MAX_CALL_DEPTH: usize = 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a boolean (true/false/1/0), got `{value}`")]
    InvalidBool { var: &'static str, value: String },
    #[error("{var} must be a positive integer, got `{value}`")]
    InvalidNumber { var: &'static str, value: String },
}

/// Knobs for a single interpreter run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionOptions {
    /// Call `RunUserInterface`/`Main` after the top-level statements.
    pub entry_point: bool,
    /// Open the debugger on an uncaught runtime error.
    pub stop_on_crash: bool,
    pub max_call_depth: usize,
    /// Directory the `pkg:/` volume maps to.
    pub root_dir: Option<PathBuf>,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            entry_point: true,
            stop_on_crash: false,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            root_dir: None,
        }
    }
}

impl ExecutionOptions {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Some(value) = read_var(ENTRY_POINT_VAR) {
            self.entry_point = parse_bool(ENTRY_POINT_VAR, &value)?;
        }
        if let Some(value) = read_var(STOP_ON_CRASH_VAR) {
            self.stop_on_crash = parse_bool(STOP_ON_CRASH_VAR, &value)?;
        }
        if let Some(value) = read_var(MAX_CALL_DEPTH_VAR) {
            self.max_call_depth = value
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|depth| *depth > 0)
                .ok_or(ConfigError::InvalidNumber {
                    var: MAX_CALL_DEPTH_VAR,
                    value,
                })?;
        }
        if let Some(value) = read_var(ROOT_VAR) {
            self.root_dir = Some(PathBuf::from(value));
        }
        Ok(self)
    }
}

fn read_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            var,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};

    fn env_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars() {
        for var in [ENTRY_POINT_VAR, STOP_ON_CRASH_VAR, MAX_CALL_DEPTH_VAR, ROOT_VAR] {
            env::remove_var(var);
        }
    }

    #[test]
    fn defaults_without_overrides() {
        let _guard = env_lock().lock().unwrap_or_else(|p| p.into_inner());
        clear_vars();
        let options = ExecutionOptions::from_env().expect("defaults");
        assert_eq!(options, ExecutionOptions::default());
        assert!(options.entry_point);
        assert_eq!(options.max_call_depth, 1024);
    }

    #[test]
    fn env_overrides_apply() {
        let _guard = env_lock().lock().unwrap_or_else(|p| p.into_inner());
        clear_vars();
        env::set_var(ENTRY_POINT_VAR, "false");
        env::set_var(STOP_ON_CRASH_VAR, "1");
        env::set_var(MAX_CALL_DEPTH_VAR, "64");
        env::set_var(ROOT_VAR, "/tmp/app");
        let options = ExecutionOptions::from_env();
        clear_vars();
        let options = options.expect("valid overrides");
        assert!(!options.entry_point);
        assert!(options.stop_on_crash);
        assert_eq!(options.max_call_depth, 64);
        assert_eq!(options.root_dir, Some(PathBuf::from("/tmp/app")));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let _guard = env_lock().lock().unwrap_or_else(|p| p.into_inner());
        clear_vars();
        env::set_var(MAX_CALL_DEPTH_VAR, "zero");
        let result = ExecutionOptions::from_env();
        clear_vars();
        assert!(
            matches!(result, Err(ConfigError::InvalidNumber { var: MAX_CALL_DEPTH_VAR, .. })),
            "unexpected result: {:?}",
            result
        );
    }
}
