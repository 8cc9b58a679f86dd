//! Configuration module - environment variable parsing

use std::env;
use std::str::FromStr;

/// Device class of the host. Read-only capability, never owned by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Platform {
    /// Pointer-driven desktop
    #[default]
    Desktop,
    /// Touch device with virtual stick controls
    Mobile,
}

impl FromStr for Platform {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "desktop" => Ok(Self::Desktop),
            "mobile" => Ok(Self::Mobile),
            _ => Err(()),
        }
    }
}

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Simulation ticks per second
    pub tick_rate: u32,

    /// Slots to fill before the match is won
    pub max_turns: u32,
    /// Fixed RNG seed for the deck shuffle; random when absent
    pub match_seed: Option<u64>,

    /// Host device class
    pub platform: Platform,
    /// Initial sprint toggle state
    pub sprint_default: bool,
    /// Look-around sensitivity multiplier
    pub look_sensitivity: f32,

    /// Tick budget for the demo session before it gives up
    pub demo_max_ticks: u64,
    /// Pace the demo at wall-clock tick rate instead of running flat out
    pub demo_realtime: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let tick_rate: u32 = parse_or(&lookup, "TICK_RATE", 60)?;
        if tick_rate == 0 || tick_rate > 1000 {
            return Err(ConfigError::Invalid {
                key: "TICK_RATE",
                reason: "must be between 1 and 1000",
            });
        }

        // the opponent fills odd slots, so the player must own the last one
        let max_turns: u32 = parse_or(&lookup, "MAX_TURNS", 6)?;
        if max_turns < 2 || max_turns > 40 || max_turns % 2 != 0 {
            return Err(ConfigError::Invalid {
                key: "MAX_TURNS",
                reason: "must be an even number between 2 and 40",
            });
        }

        let match_seed = match lookup("MATCH_SEED") {
            Some(raw) => Some(
                raw.trim()
                    .parse()
                    .map_err(|_| ConfigError::Unparsable("MATCH_SEED"))?,
            ),
            None => None,
        };

        let platform = match lookup("PLATFORM") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Unparsable("PLATFORM"))?,
            None => Platform::Desktop,
        };

        let look_sensitivity: f32 = parse_or(&lookup, "LOOK_SENSITIVITY", 2.0)?;
        if !look_sensitivity.is_finite() || look_sensitivity <= 0.0 {
            return Err(ConfigError::Invalid {
                key: "LOOK_SENSITIVITY",
                reason: "must be a positive number",
            });
        }

        Ok(Self {
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            tick_rate,
            max_turns,
            match_seed,
            platform,
            sprint_default: parse_or(&lookup, "SPRINT_DEFAULT", false)?,
            look_sensitivity,
            demo_max_ticks: parse_or(&lookup, "DEMO_MAX_TICKS", 7200)?,
            demo_realtime: parse_or(&lookup, "DEMO_REALTIME", true)?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            tick_rate: 60,
            max_turns: 6,
            match_seed: None,
            platform: Platform::Desktop,
            sprint_default: false,
            look_sensitivity: 2.0,
            demo_max_ticks: 7200,
            demo_realtime: true,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Unparsable(key)),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Environment variable {0} could not be parsed")]
    Unparsable(&'static str),

    #[error("Invalid value for {key}: {reason}")]
    Invalid {
        key: &'static str,
        reason: &'static str,
    },
}
