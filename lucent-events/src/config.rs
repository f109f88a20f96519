//! Emitter configuration

use std::env;

/// Default nesting limit for re-entrant dispatch.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Emitter configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitterConfig {
    /// Label attached to log records
    pub label: String,

    /// Enable dispatch logging
    pub enable_logging: bool,

    /// Raise `emitter.*` meta-events
    pub meta_events: bool,

    /// Maximum nesting of dispatches on one thread before failing
    pub max_depth: usize,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            label: "emitter".to_string(),
            enable_logging: true,
            meta_events: true,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl EmitterConfig {
    /// Create config from environment variables.
    ///
    /// - `LUCENT_EVENTS_LOG=0|1` toggles logging
    /// - `LUCENT_EVENTS_META=0|1` toggles meta-events
    /// - `LUCENT_EVENTS_MAX_DEPTH=<n>` sets the nesting limit
    ///
    /// Unset or unparsable variables keep their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let enable_logging = env::var("LUCENT_EVENTS_LOG")
            .ok()
            .and_then(|v| parse_flag(&v))
            .unwrap_or(defaults.enable_logging);

        let meta_events = env::var("LUCENT_EVENTS_META")
            .ok()
            .and_then(|v| parse_flag(&v))
            .unwrap_or(defaults.meta_events);

        let max_depth = env::var("LUCENT_EVENTS_MAX_DEPTH")
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|depth| *depth > 0)
            .unwrap_or(defaults.max_depth);

        Self {
            enable_logging,
            meta_events,
            max_depth,
            ..defaults
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Emitter builder
///
/// ```rust
/// use lucent_events::EmitterBuilder;
///
/// let emitter = EmitterBuilder::new()
///     .label("player")
///     .meta_events(false)
///     .build();
/// assert_eq!(emitter.config().label, "player");
/// ```
#[derive(Debug, Clone, Default)]
pub struct EmitterBuilder {
    config: EmitterConfig,
}

impl EmitterBuilder {
    /// Create new emitter builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration
    pub fn from_config(config: EmitterConfig) -> Self {
        Self { config }
    }

    /// Set the log label
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.config.label = label.into();
        self
    }

    /// Enable/disable logging
    pub fn enable_logging(mut self, enabled: bool) -> Self {
        self.config.enable_logging = enabled;
        self
    }

    /// Enable/disable meta-events
    pub fn meta_events(mut self, enabled: bool) -> Self {
        self.config.meta_events = enabled;
        self
    }

    /// Set the dispatch nesting limit
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.config.max_depth = depth.max(1);
        self
    }

    /// Build the emitter
    pub fn build(self) -> crate::Emitter {
        crate::Emitter::with_config(self.config)
    }
}
