use std::fmt;

/// CORS configuration error
///
/// Returned while building a [`CorsMiddleware`](super::CorsMiddleware) from a
/// builder or a configuration file. Request processing itself never fails on
/// configuration: a value that cannot be emitted is simply left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsConfigError {
    /// An origin pattern is not a valid regular expression
    InvalidPattern {
        /// The offending pattern
        pattern: String,
        /// Compiler message from the regex engine
        message: String,
    },
    /// The configuration document could not be parsed
    Parse {
        /// `"yaml"` or `"json"`
        format: &'static str,
        message: String,
    },
    /// The configuration file could not be read
    Io { path: String, message: String },
    /// `optionsSuccessStatus` is not a valid HTTP status (and not `0`)
    InvalidStatus { status: u16 },
}

impl fmt::Display for CorsConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorsConfigError::InvalidPattern { pattern, message } => {
                write!(
                    f,
                    "CORS configuration error: Invalid origin pattern '{}': {}",
                    pattern, message
                )
            }
            CorsConfigError::Parse { format, message } => {
                write!(f, "CORS configuration error: Invalid {} document: {}", format, message)
            }
            CorsConfigError::Io { path, message } => {
                write!(f, "CORS configuration error: Cannot read '{}': {}", path, message)
            }
            CorsConfigError::InvalidStatus { status } => {
                write!(
                    f,
                    "CORS configuration error: optionsSuccessStatus {} is not a valid HTTP status. \
                    Use a status between 100 and 999, or 0 to leave the preflight status untouched.",
                    status
                )
            }
        }
    }
}

impl std::error::Error for CorsConfigError {}

/// Compile an origin pattern, mapping failures to [`CorsConfigError::InvalidPattern`]
pub(crate) fn compile_pattern(pattern: &str) -> Result<regex::Regex, CorsConfigError> {
    regex::Regex::new(pattern).map_err(|e| CorsConfigError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

/// `0` is accepted and disables finalizing the preflight status
pub(crate) fn validate_status(status: u16) -> Result<u16, CorsConfigError> {
    if status == 0 || http::StatusCode::from_u16(status).is_ok() {
        Ok(status)
    } else {
        Err(CorsConfigError::InvalidStatus { status })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_pattern_reports_pattern() {
        let err = compile_pattern("(unclosed").unwrap_err();
        match &err {
            CorsConfigError::InvalidPattern { pattern, .. } => assert_eq!(pattern, "(unclosed"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("(unclosed"));
    }

    #[test]
    fn test_validate_status() {
        assert_eq!(validate_status(0), Ok(0));
        assert_eq!(validate_status(204), Ok(204));
        assert_eq!(
            validate_status(42),
            Err(CorsConfigError::InvalidStatus { status: 42 })
        );
    }
}
