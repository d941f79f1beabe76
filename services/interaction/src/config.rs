use cowriter_core::{
    phrases::Language,
    settings::{InteractionSettings, Side},
    trajectory::TrajectoryTimings,
};
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub language: Language,
    pub robot_connected: bool,
    pub robot_speaking: bool,
    pub robot_writing: bool,
    pub robot_standing: bool,
    pub handedness: Side,
    pub person_side: Side,
    pub alternate_sides: bool,
    pub frame_id: String,
    pub tablet_timeout: Duration,
    pub idle_delay: Duration,
    /// Writing surface size in metres.
    pub screen_width: f64,
    pub screen_height: f64,
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Reads `name` and parses it, falling back to `default` when unset.
fn parse_var<T>(name: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = var_or(name, default);
    raw.parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), format!("'{raw}': {e}")))
}

fn parse_flag(name: &str, default: bool) -> Result<bool, ConfigError> {
    let raw = var_or(name, if default { "true" } else { "false" });
    match raw.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue(
            name.to_string(),
            format!("'{raw}' is not a boolean"),
        )),
    }
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address = parse_var::<SocketAddr>("BIND_ADDRESS", "0.0.0.0:3000")?;

        let log_level_str = var_or("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let language = parse_var::<Language>("LANGUAGE", "english")?;

        let robot_connected = parse_flag("USE_ROBOT_IN_INTERACTION", true)?;
        let robot_speaking = parse_flag("NAO_SPEAKING", true)? && robot_connected;
        let robot_writing = parse_flag("NAO_WRITING", true)? && robot_connected;
        let robot_standing = parse_flag("NAO_STANDING", true)?;

        let handedness = parse_var::<Side>("NAO_HANDEDNESS", "right")?;
        let person_side = match std::env::var("PERSON_SIDE") {
            Ok(raw) => raw
                .parse::<Side>()
                .map_err(|e| ConfigError::InvalidValue("PERSON_SIDE".to_string(), e))?,
            Err(_) => handedness,
        };
        let alternate_sides = parse_flag("ALTERNATE_SIDES_LOOKING_AT", false)?;

        let frame_id = var_or("WRITING_SURFACE_FRAME_ID", "writing_surface");
        let tablet_timeout =
            Duration::from_millis(parse_var::<u64>("TABLET_WATCHDOG_TIMEOUT_MS", "400")?);
        let idle_delay = Duration::from_millis(parse_var::<u64>("IDLE_DELAY_MS", "100")?);

        let screen_width = parse_var::<f64>("SCREEN_WIDTH", "0.2")?;
        let screen_height = parse_var::<f64>("SCREEN_HEIGHT", "0.1395")?;
        if screen_width <= 0.0 || screen_height <= 0.0 {
            return Err(ConfigError::InvalidValue(
                "SCREEN_WIDTH/SCREEN_HEIGHT".to_string(),
                "writing surface must have a positive size".to_string(),
            ));
        }

        Ok(Self {
            bind_address,
            log_level,
            language,
            robot_connected,
            robot_speaking,
            robot_writing,
            robot_standing,
            handedness,
            person_side,
            alternate_sides,
            frame_id,
            tablet_timeout,
            idle_delay,
            screen_width,
            screen_height,
        })
    }

    /// The controller's view of this configuration.
    pub fn interaction_settings(&self) -> InteractionSettings {
        InteractionSettings {
            language: self.language,
            robot_connected: self.robot_connected,
            robot_speaking: self.robot_speaking,
            robot_writing: self.robot_writing,
            robot_standing: self.robot_standing,
            handedness: self.handedness,
            person_side: self.person_side,
            alternate_sides: self.alternate_sides,
            frame_id: self.frame_id.clone(),
            timings: TrajectoryTimings::for_writing(self.robot_writing),
            idle_delay: self.idle_delay,
            ..Default::default()
        }
        .normalised()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tracing::Level;

    const VARS: &[&str] = &[
        "BIND_ADDRESS",
        "RUST_LOG",
        "LANGUAGE",
        "NAO_SPEAKING",
        "NAO_WRITING",
        "NAO_STANDING",
        "USE_ROBOT_IN_INTERACTION",
        "NAO_HANDEDNESS",
        "PERSON_SIDE",
        "ALTERNATE_SIDES_LOOKING_AT",
        "WRITING_SURFACE_FRAME_ID",
        "TABLET_WATCHDOG_TIMEOUT_MS",
        "IDLE_DELAY_MS",
        "SCREEN_WIDTH",
        "SCREEN_HEIGHT",
    ];

    fn clear_env_vars() {
        for var in VARS {
            unsafe {
                env::remove_var(var);
            }
        }
    }

    #[test]
    fn test_config_error_display() {
        let invalid_value =
            ConfigError::InvalidValue("TEST_VAR".to_string(), "bad_value".to_string());
        assert_eq!(
            format!("{}", invalid_value),
            "Invalid value for environment variable TEST_VAR: bad_value"
        );
    }

    #[test]
    #[serial]
    fn test_config_defaults() {
        clear_env_vars();

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.bind_address.to_string(), "0.0.0.0:3000");
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.language, Language::English);
        assert!(config.robot_connected);
        assert!(config.robot_speaking);
        assert!(config.robot_writing);
        assert!(config.robot_standing);
        assert_eq!(config.handedness, Side::Right);
        assert_eq!(config.person_side, Side::Right);
        assert!(!config.alternate_sides);
        assert_eq!(config.frame_id, "writing_surface");
        assert_eq!(config.tablet_timeout, Duration::from_millis(400));
        assert_eq!(config.idle_delay, Duration::from_millis(100));
        assert_eq!(config.screen_width, 0.2);
        assert_eq!(config.screen_height, 0.1395);
    }

    #[test]
    #[serial]
    fn test_config_custom_values() {
        clear_env_vars();
        unsafe {
            env::set_var("BIND_ADDRESS", "127.0.0.1:8080");
            env::set_var("RUST_LOG", "debug");
            env::set_var("LANGUAGE", "French");
            env::set_var("NAO_HANDEDNESS", "left");
            env::set_var("ALTERNATE_SIDES_LOOKING_AT", "true");
            env::set_var("NAO_STANDING", "false");
            env::set_var("IDLE_DELAY_MS", "20");
        }

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.bind_address.to_string(), "127.0.0.1:8080");
        assert_eq!(config.log_level, Level::DEBUG);
        assert_eq!(config.language, Language::French);
        assert_eq!(config.handedness, Side::Left);
        // The learner sits on the writing hand's side unless told otherwise.
        assert_eq!(config.person_side, Side::Left);
        assert!(config.alternate_sides);
        assert!(!config.robot_standing);
        assert_eq!(config.idle_delay, Duration::from_millis(20));
    }

    #[test]
    #[serial]
    fn test_config_without_robot_silences_it() {
        clear_env_vars();
        unsafe {
            env::set_var("USE_ROBOT_IN_INTERACTION", "false");
            env::set_var("NAO_SPEAKING", "true");
        }

        let config = Config::from_env().expect("Config should load successfully");
        assert!(!config.robot_speaking);
        assert!(!config.robot_writing);
        assert_eq!(
            config.interaction_settings().timings,
            TrajectoryTimings::DISPLAY_ONLY
        );
    }

    #[test]
    #[serial]
    fn test_config_invalid_handedness() {
        clear_env_vars();
        unsafe {
            env::set_var("NAO_HANDEDNESS", "both");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "NAO_HANDEDNESS"),
        }
    }

    #[test]
    #[serial]
    fn test_config_invalid_bind_address() {
        clear_env_vars();
        unsafe {
            env::set_var("BIND_ADDRESS", "not-a-valid-address");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "BIND_ADDRESS"),
        }
    }

    #[test]
    #[serial]
    fn test_config_invalid_log_level() {
        clear_env_vars();
        unsafe {
            env::set_var("RUST_LOG", "not-a-level");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "RUST_LOG"),
        }
    }

    #[test]
    #[serial]
    fn test_config_invalid_flag() {
        clear_env_vars();
        unsafe {
            env::set_var("NAO_WRITING", "sometimes");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, msg) => {
                assert_eq!(var, "NAO_WRITING");
                assert!(msg.contains("sometimes"));
            }
        }
    }
}
