use std::path::Path;

use anyhow::Context;
use seatlink_core::SessionConfig;

/// Load the session configuration from `path`, or the defaults without one.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<SessionConfig> {
    let config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            parse_config(&text).with_context(|| format!("loading {}", path.display()))?
        }
        None => SessionConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

pub fn parse_config(text: &str) -> anyhow::Result<SessionConfig> {
    Ok(toml::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = parse_config(
            r#"
            device_id = "seat014"

            [wifi]
            ssid = "bar-floor-2"
            password = "secret"

            [broker]
            host = "10.0.0.5"
            "#,
        )
        .unwrap();

        assert_eq!(config.device_id, "seat014");
        assert_eq!(config.broker.port, 1883);
        assert_eq!(config.topics().command(), "netbar/seat014/cmd");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_toml_reported() {
        assert!(parse_config("device_id = ").is_err());
    }

    #[test]
    fn test_missing_file_reported() {
        let error = load_config(Some(Path::new("/nonexistent/seatlink.toml"))).unwrap_err();
        assert!(error.to_string().contains("/nonexistent/seatlink.toml"));
    }
}
