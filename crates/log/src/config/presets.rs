//! Configuration presets for common scenarios

use super::{
    ACCEPTANCE_VAR, Config, DisplayConfig, Format, LOG_FORMAT_VAR, LOG_VAR, RUST_LOG_VAR, Writer,
};

impl Config {
    /// Create configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_env_with(|name| std::env::var(name).ok())
    }

    /// [`from_env`](Self::from_env) with variables read through `lookup`.
    pub fn from_env_with(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let set = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        // KEYWARD_LOG wins over RUST_LOG
        if let Some(level) = set(LOG_VAR).or_else(|| set(RUST_LOG_VAR)) {
            config.level = level;
            config.enabled = true;
        }

        // Acceptance runs stay quiet regardless of level
        if set(ACCEPTANCE_VAR).is_some() {
            config.enabled = false;
        }

        if let Some(format) = set(LOG_FORMAT_VAR) {
            config.format = format.parse().unwrap_or_default();
        }

        config
    }

    /// Development configuration (pretty, debug level)
    pub fn development() -> Self {
        Self {
            enabled: true,
            level: "debug".to_owned(),
            format: Format::Pretty,
            display: DisplayConfig {
                source: true,
                ..DisplayConfig::default()
            },
            ..Self::default()
        }
    }

    /// Production configuration (JSON, info level)
    pub fn production() -> Self {
        Self {
            enabled: true,
            level: "info".to_owned(),
            format: Format::Json,
            display: DisplayConfig {
                colors: false,
                ..DisplayConfig::default()
            },
            ..Self::default()
        }
    }

    /// Environment configuration routed through libtest's output capture.
    pub fn test() -> Self {
        Self {
            writer: Writer::Test,
            display: DisplayConfig {
                colors: false,
                ..DisplayConfig::default()
            },
            ..Self::from_env()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn env<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |name: &str| {
            pairs
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value).to_owned())
        }
    }

    #[test]
    fn disabled_without_level() {
        let config = Config::from_env_with(env(&[]));
        assert!(!config.enabled);
        assert_eq!(config, Config::default());
    }

    #[test]
    fn keyward_log_wins_over_rust_log() {
        let config = Config::from_env_with(env(&[
            ("RUST_LOG", "warn"),
            ("KEYWARD_LOG", "keyward_credential=debug"),
        ]));
        assert!(config.enabled);
        assert_eq!(config.level, "keyward_credential=debug");
    }

    #[test]
    fn falls_back_to_rust_log() {
        let config = Config::from_env_with(env(&[("KEYWARD_LOG", " "), ("RUST_LOG", "trace")]));
        assert!(config.enabled);
        assert_eq!(config.level, "trace");
    }

    #[test]
    fn acceptance_runs_are_silent() {
        let config =
            Config::from_env_with(env(&[("KEYWARD_LOG", "debug"), ("KEYWARD_ACC", "1")]));
        assert!(!config.enabled);
    }

    #[rstest]
    #[case("json", Format::Json)]
    #[case("Pretty", Format::Pretty)]
    #[case("compact", Format::Compact)]
    #[case("logfmt", Format::Compact)]
    fn format_from_env(#[case] value: &str, #[case] expected: Format) {
        let config = Config::from_env_with(env(&[("KEYWARD_LOG_FORMAT", value)]));
        assert_eq!(config.format, expected);
    }

    #[test]
    fn unknown_format_is_a_config_error() {
        let err = "xml".parse::<Format>().unwrap_err();
        assert!(err.to_string().contains("unknown log format"));
    }
}
