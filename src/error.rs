use thiserror::Error;

/// Errors that abort an optimization run.
#[derive(Debug, Error)]
pub enum SqueezeError {
    #[error("markup parse error at line {line}, column {column}: {message}")]
    MarkupParse {
        message: String,
        line: usize,
        column: usize,
        offset: usize,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Rejected pipeline configuration. Always raised before any pass runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unknown plugin `{0}`")]
    UnknownPlugin(String),

    #[error("invalid parameters for plugin `{plugin}`: {message}")]
    InvalidParams { plugin: String, message: String },
}

/// Unparsable path data. Passes that hit it leave the attribute unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid path data at byte {offset}: {message}")]
pub struct PathError {
    pub message: String,
    pub offset: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_errors() {
        let err = SqueezeError::from(ConfigError::UnknownPlugin("x".into()));
        assert_eq!(err.to_string(), "unknown plugin `x`");
        // only markup and configuration can abort a run
        match err {
            SqueezeError::MarkupParse { .. } | SqueezeError::Config(_) => {}
        }
    }
}
