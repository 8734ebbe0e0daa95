//! Browser driver errors.

use thiserror::Error;

/// Errors raised by a [`BrowserDriver`](crate::BrowserDriver).
///
/// Only [`DriverError::SessionLost`] and [`DriverError::NotConnected`] mean the
/// session itself is gone; everything else is scoped to the current call.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Browser session lost: {0}")]
    SessionLost(String),

    #[error("Browser not connected")]
    NotConnected,

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Screenshot failed: {0}")]
    Screenshot(String),

    #[error("Script error: {0}")]
    Script(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl DriverError {
    /// Whether a reconnect is required before the driver is usable again.
    pub fn is_session_lost(&self) -> bool {
        matches!(self, DriverError::SessionLost(_) | DriverError::NotConnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_lost_detection() {
        assert!(DriverError::SessionLost("target closed".to_string()).is_session_lost());
        assert!(DriverError::NotConnected.is_session_lost());
        assert!(!DriverError::Navigation("net::ERR_NAME_NOT_RESOLVED".to_string()).is_session_lost());
        assert!(!DriverError::Timeout("screenshot".to_string()).is_session_lost());
    }

    #[test]
    fn test_driver_error_display() {
        let err = DriverError::Navigation("refused".to_string());
        assert_eq!(err.to_string(), "Navigation failed: refused");

        let err = DriverError::SessionLost("socket closed".to_string());
        assert_eq!(err.to_string(), "Browser session lost: socket closed");
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = DriverError::from(io_err);
        assert!(err.to_string().contains("denied"));
        assert!(!err.is_session_lost());
    }
}
