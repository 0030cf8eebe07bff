use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

#[derive(Debug, thiserror::Error)]
pub enum PodiumError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("signaling error: {0}")]
    Signaling(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::FileNotFound(PathBuf::from("/tmp/missing.toml"));
        assert_eq!(err.to_string(), "config file not found: /tmp/missing.toml");

        let err = ConfigError::ParseError("unexpected token".into());
        assert_eq!(err.to_string(), "config parse error: unexpected token");

        let err = ConfigError::ValidationError("mute.debounce_ms = 0".into());
        assert_eq!(
            err.to_string(),
            "config validation error: mute.debounce_ms = 0"
        );
    }

    #[test]
    fn podium_error_from_config() {
        let config_err = ConfigError::ParseError("bad toml".into());
        let err: PodiumError = config_err.into();
        assert!(matches!(err, PodiumError::Config(_)));
        assert!(err.to_string().contains("bad toml"));
    }

    #[test]
    fn podium_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: PodiumError = io_err.into();
        assert!(matches!(err, PodiumError::Io(_)));
        assert!(err.to_string().contains("file missing"));
    }

    #[test]
    fn signaling_error_display() {
        let err = PodiumError::Signaling("reconnect attempts exhausted".into());
        assert_eq!(
            err.to_string(),
            "signaling error: reconnect attempts exhausted"
        );
    }
}
