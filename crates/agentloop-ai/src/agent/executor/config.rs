use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::agent::stuck::LoopDetectorConfig;
use crate::agent::{AgentFinish, AgentStep};
use crate::error::{AgentError, Result};

/// Default Plan-call ceiling.
pub const DEFAULT_MAX_ITERATIONS: usize = 5;

/// Configuration for the executor loop.
///
/// Runtime collaborators (parser-error handler, emitter, journal, memory)
/// are attached on the [`Executor`](super::Executor) itself.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Maximum number of Plan calls before giving up (default: 5).
    pub max_iterations: usize,
    /// Abort when the same action repeats; `None` disables detection.
    pub loop_detection: Option<LoopDetectorConfig>,
    /// Add the step trace under `intermediateSteps` (default: false).
    pub return_intermediate_steps: bool,
    /// Per-tool-call timeout (default: none).
    #[serde(rename = "tool_timeout_secs", deserialize_with = "deserialize_secs")]
    pub tool_timeout: Option<Duration>,
    /// Cut a trailing `"\nObservation:"` fragment off tool inputs (default: true).
    pub trim_observation_suffix: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            loop_detection: Some(LoopDetectorConfig::default()),
            return_intermediate_steps: false,
            tool_timeout: None,
            trim_observation_suffix: true,
        }
    }
}

fn deserialize_secs<'de, D>(deserializer: D) -> std::result::Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_secs))
}

impl ExecutorConfig {
    /// Load from TOML; omitted fields keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)
            .map_err(|e| AgentError::Config(format!("invalid executor config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(AgentError::Config(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if let Some(loop_detection) = &self.loop_detection
            && loop_detection.repeat_threshold == 0
        {
            return Err(AgentError::Config(
                "loop_detection.repeat_threshold must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_loop_detection(mut self, config: LoopDetectorConfig) -> Self {
        self.loop_detection = Some(config);
        self
    }

    pub fn without_loop_detection(mut self) -> Self {
        self.loop_detection = None;
        self
    }

    pub fn with_return_intermediate_steps(mut self, enabled: bool) -> Self {
        self.return_intermediate_steps = enabled;
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = Some(timeout);
        self
    }

    pub fn with_trim_observation_suffix(mut self, enabled: bool) -> Self {
        self.trim_observation_suffix = enabled;
        self
    }
}

type Formatter = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Turns a parse error into an observation so the model can retry.
#[derive(Clone, Default)]
pub struct ParserErrorHandler {
    formatter: Option<Formatter>,
}

impl fmt::Debug for ParserErrorHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserErrorHandler")
            .field("formatter", &self.formatter.is_some())
            .finish()
    }
}

impl ParserErrorHandler {
    /// Use the error message itself as the observation.
    pub fn pass_through() -> Self {
        Self::default()
    }

    /// Format the error message before it becomes the observation.
    pub fn new<F>(formatter: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        Self {
            formatter: Some(Arc::new(formatter)),
        }
    }

    pub fn format(&self, error: &str) -> String {
        match &self.formatter {
            Some(formatter) => formatter(error),
            None => error.to_string(),
        }
    }
}

/// Everything one invocation produced, including the partial trace on failure.
#[derive(Debug)]
pub struct RunOutcome {
    pub result: Result<AgentFinish>,
    pub steps: Vec<AgentStep>,
    /// Plan calls made.
    pub iterations: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExecutorConfig::default();
        assert_eq!(config.max_iterations, 5);
        assert_eq!(config.loop_detection.unwrap().repeat_threshold, 3);
        assert!(!config.return_intermediate_steps);
        assert!(config.tool_timeout.is_none());
        assert!(config.trim_observation_suffix);
    }

    #[test]
    fn test_from_toml_overrides_and_defaults() {
        let config = ExecutorConfig::from_toml_str(
            r#"
            max_iterations = 8
            return_intermediate_steps = true
            tool_timeout_secs = 30

            [loop_detection]
            repeat_threshold = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.max_iterations, 8);
        assert!(config.return_intermediate_steps);
        assert_eq!(config.tool_timeout, Some(Duration::from_secs(30)));
        let loop_detection = config.loop_detection.unwrap();
        assert_eq!(loop_detection.repeat_threshold, 4);
        assert_eq!(loop_detection.window_size, 10);
        assert!(config.trim_observation_suffix);
    }

    #[test]
    fn test_from_toml_empty_is_default() {
        assert_eq!(
            ExecutorConfig::from_toml_str("").unwrap(),
            ExecutorConfig::default()
        );
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let err = ExecutorConfig::from_toml_str("max_iterations = 0").unwrap_err();
        assert!(matches!(err, AgentError::Config(_)));

        let config = ExecutorConfig::default().with_loop_detection(LoopDetectorConfig {
            repeat_threshold: 0,
            window_size: 10,
        });
        assert!(config.validate().is_err());
        assert!(config.without_loop_detection().validate().is_ok());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = ExecutorConfig::from_toml_str("max_iterations = \"many\"").unwrap_err();
        assert!(err.to_string().contains("invalid executor config"));
    }

    #[test]
    fn test_parser_error_handler_formats() {
        assert_eq!(ParserErrorHandler::pass_through().format("bad"), "bad");
        let handler = ParserErrorHandler::new(|e| format!("Invalid format: {e}"));
        assert_eq!(handler.format("bad"), "Invalid format: bad");
    }
}
