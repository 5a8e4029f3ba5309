//! Configuration loading and typed config structures for the build engine.
//!
//! The configuration lives in `mason-config.yaml`. Every field has a default,
//! so an empty file (or no file at all) yields a working setup. Two
//! environment variables override the YAML:
//!
//! - `MASON_BUILD_SPEED` overrides `builder.build_speed`
//! - `MASON_ON_ERROR` overrides `builder.on_error` (`pause` or `cancel`)

use std::path::Path;
use std::time::Duration;

use mason_types::Face;
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value is out of its allowed range.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration, mirroring `mason-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MasonConfig {
    /// Drive loop settings.
    #[serde(default)]
    pub builder: BuilderConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl MasonConfig {
    /// Load configuration from a YAML file, apply environment overrides,
    /// and validate the result.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if it is not valid YAML, and
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, apply environment overrides,
    /// and validate the result.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML and
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.builder.apply_env_overrides()?;
        config.builder.validate()?;
        Ok(config)
    }
}

/// What the drive loop does after an action fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Pause the build; the caller resumes after fixing the cause.
    #[default]
    Pause,
    /// Cancel the build for good.
    Cancel,
}

impl core::str::FromStr for ErrorPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pause" => Ok(Self::Pause),
            "cancel" => Ok(Self::Cancel),
            other => Err(ConfigError::Invalid {
                field: "builder.on_error",
                reason: format!("expected `pause` or `cancel`, got `{other}`"),
            }),
        }
    }
}

/// Drive loop configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BuilderConfig {
    /// Pacing multiplier; the pause between actions is
    /// `pacing_base_ms / build_speed`.
    #[serde(default = "default_build_speed")]
    pub build_speed: f64,

    /// Reaction to a failed action.
    #[serde(default)]
    pub on_error: ErrorPolicy,

    /// Pause between actions at speed 1.0, in milliseconds.
    #[serde(default = "default_pacing_base_ms")]
    pub pacing_base_ms: u64,

    /// Upper bound on one idle wait while paused, in milliseconds.
    #[serde(default = "default_idle_poll_ms")]
    pub idle_poll_ms: u64,

    /// Maximum distance from the actor's eyes to a clicked face.
    #[serde(default = "default_reach")]
    pub reach: f64,

    /// Order in which neighbours are tried as placement references,
    /// named by their direction from the target cell.
    #[serde(default = "default_face_priority")]
    pub face_priority: Vec<Face>,

    /// Buffered events per subscriber before the slowest one lags.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            build_speed: default_build_speed(),
            on_error: ErrorPolicy::default(),
            pacing_base_ms: default_pacing_base_ms(),
            idle_poll_ms: default_idle_poll_ms(),
            reach: default_reach(),
            face_priority: default_face_priority(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl BuilderConfig {
    /// Apply `MASON_BUILD_SPEED` and `MASON_ON_ERROR` from the process
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a variable is set to an
    /// unparsable value.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a value cannot be parsed.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("MASON_BUILD_SPEED") {
            self.build_speed = raw.trim().parse().map_err(|e| ConfigError::Invalid {
                field: "builder.build_speed",
                reason: format!("`{raw}` is not a number: {e}"),
            })?;
        }
        if let Some(raw) = lookup("MASON_ON_ERROR") {
            self.on_error = raw.parse()?;
        }
        Ok(())
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a non-positive or non-finite
    /// speed or reach, for a speed so small that the pacing delay does not
    /// fit in a [`Duration`], and for an empty or repeating face priority.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.build_speed.is_finite() && self.build_speed > 0.0) {
            return Err(ConfigError::Invalid {
                field: "builder.build_speed",
                reason: format!("must be a positive number, got {}", self.build_speed),
            });
        }
        if Duration::try_from_secs_f64(self.pacing_secs()).is_err() {
            return Err(ConfigError::Invalid {
                field: "builder.build_speed",
                reason: format!(
                    "{} is too slow, the pause between actions overflows",
                    self.build_speed
                ),
            });
        }
        if !(self.reach.is_finite() && self.reach > 0.0) {
            return Err(ConfigError::Invalid {
                field: "builder.reach",
                reason: format!("must be a positive number, got {}", self.reach),
            });
        }
        if self.face_priority.is_empty() {
            return Err(ConfigError::Invalid {
                field: "builder.face_priority",
                reason: String::from("must list at least one face"),
            });
        }
        for (i, face) in self.face_priority.iter().enumerate() {
            if self.face_priority.iter().skip(i.saturating_add(1)).any(|f| f == face) {
                return Err(ConfigError::Invalid {
                    field: "builder.face_priority",
                    reason: format!("face `{face}` listed twice"),
                });
            }
        }
        Ok(())
    }

    /// Pause after each completed action.
    ///
    /// Saturates at [`Duration::MAX`] for a speed that never passed
    /// [`Self::validate`].
    pub fn pacing_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.pacing_secs()).unwrap_or(Duration::MAX)
    }

    fn pacing_secs(&self) -> f64 {
        #[allow(clippy::cast_precision_loss)] // Millisecond counts stay far below 2^52.
        let base_secs = self.pacing_base_ms as f64 / 1000.0;
        base_secs / self.build_speed
    }

    /// Longest single idle wait while paused.
    pub const fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_build_speed() -> f64 {
    1.0
}

const fn default_pacing_base_ms() -> u64 {
    1000
}

const fn default_idle_poll_ms() -> u64 {
    1000
}

const fn default_reach() -> f64 {
    4.5
}

fn default_face_priority() -> Vec<Face> {
    Face::ALL.to_vec()
}

const fn default_event_capacity() -> usize {
    256
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn default_config_is_valid() {
        let config = BuilderConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.on_error, ErrorPolicy::Pause);
        assert_eq!(config.pacing_delay(), Duration::from_secs(1));
        assert_eq!(config.face_priority.len(), 6);
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r"
builder:
  build_speed: 4.0
  on_error: cancel
  pacing_base_ms: 800
  idle_poll_ms: 250
  reach: 5.0
  face_priority: [north, down]
  event_capacity: 32
logging:
  level: debug
  json: true
";
        let mut config: MasonConfig = serde_yml::from_str(yaml).unwrap();
        config.builder.apply_overrides(no_env).unwrap();
        config.builder.validate().unwrap();

        assert_eq!(config.builder.on_error, ErrorPolicy::Cancel);
        assert_eq!(config.builder.pacing_delay(), Duration::from_millis(200));
        assert_eq!(config.builder.idle_poll(), Duration::from_millis(250));
        assert_eq!(config.builder.face_priority, vec![Face::North, Face::Down]);
        assert_eq!(config.builder.event_capacity, 32);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
    }

    #[test]
    fn parse_minimal_yaml() {
        let config: MasonConfig = serde_yml::from_str("{}").unwrap();
        assert_eq!(config, MasonConfig::default());
    }

    #[test]
    fn zero_speed_is_rejected() {
        let config = BuilderConfig {
            build_speed: 0.0,
            ..BuilderConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "builder.build_speed",
                ..
            })
        ));
    }

    #[test]
    fn nan_speed_is_rejected() {
        let config = BuilderConfig {
            build_speed: f64::NAN,
            ..BuilderConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn vanishing_speed_is_rejected_and_never_shortens_pacing() {
        let config = BuilderConfig {
            build_speed: 1e-300,
            ..BuilderConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "builder.build_speed",
                ..
            })
        ));
        assert_eq!(config.pacing_delay(), Duration::MAX);
    }

    #[test]
    fn duplicate_faces_are_rejected() {
        let config = BuilderConfig {
            face_priority: vec![Face::Up, Face::Down, Face::Up],
            ..BuilderConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn overrides_replace_yaml_values() {
        let mut config = BuilderConfig::default();
        config
            .apply_overrides(|key| match key {
                "MASON_BUILD_SPEED" => Some("2.5".to_owned()),
                "MASON_ON_ERROR" => Some("Cancel".to_owned()),
                _ => None,
            })
            .unwrap();
        assert!((config.build_speed - 2.5).abs() < f64::EPSILON);
        assert_eq!(config.on_error, ErrorPolicy::Cancel);
    }

    #[test]
    fn bad_override_is_reported() {
        let mut config = BuilderConfig::default();
        let result = config.apply_overrides(|key| {
            (key == "MASON_ON_ERROR").then(|| "retry".to_owned())
        });
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn faster_speed_shortens_pacing() {
        let config = BuilderConfig {
            build_speed: 2.0,
            ..BuilderConfig::default()
        };
        assert_eq!(config.pacing_delay(), Duration::from_millis(500));
    }
}
