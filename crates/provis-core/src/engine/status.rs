//! Outcome of a phase or a whole phase set.

use std::fmt;

#[derive(Debug)]
pub enum Status {
    Ok,
    /// Stopped on request. Not a failure.
    Canceled,
    Error {
        phase: String,
        message: String,
        cause: Option<anyhow::Error>,
    },
}

impl Status {
    pub fn error(phase: &str, message: impl Into<String>) -> Self {
        Status::Error {
            phase: phase.to_string(),
            message: message.into(),
            cause: None,
        }
    }

    pub fn error_with_cause(
        phase: &str,
        message: impl Into<String>,
        cause: impl Into<anyhow::Error>,
    ) -> Self {
        Status::Error {
            phase: phase.to_string(),
            message: message.into(),
            cause: Some(cause.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Status::Ok)
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, Status::Canceled)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Status::Error { .. })
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Status::Error { message, .. } => Some(message),
            _ => None,
        }
    }

    pub fn cause(&self) -> Option<&anyhow::Error> {
        match self {
            Status::Error { cause, .. } => cause.as_ref(),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Ok => f.write_str("ok"),
            Status::Canceled => f.write_str("canceled"),
            Status::Error {
                phase,
                message,
                cause,
            } => {
                write!(f, "error in phase '{}': {}", phase, message)?;
                if let Some(cause) = cause {
                    write!(f, ": {:#}", cause)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_cause_chain() {
        let status = Status::error_with_cause(
            "sizing",
            "could not size artifacts",
            anyhow::anyhow!("repository offline"),
        );
        assert!(status.is_error());
        assert_eq!(
            status.to_string(),
            "error in phase 'sizing': could not size artifacts: repository offline"
        );
        assert_eq!(Status::Canceled.to_string(), "canceled");
    }
}
