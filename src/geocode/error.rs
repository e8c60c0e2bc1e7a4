//! Geocoding error types

use thiserror::Error;

/// Errors that can occur while resolving a location
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("No match for location")]
    NotFound,

    #[error("Ambiguous location: {0}")]
    Ambiguous(String),

    #[error("Service error {status}: {message}")]
    Service { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl GeocodeError {
    /// Whether retrying the same request could succeed
    ///
    /// Not-found and ambiguous are properties of the location text, not of
    /// the service; retrying them wastes calls.
    pub fn is_transient(&self) -> bool {
        match self {
            GeocodeError::Service { .. } => true,
            GeocodeError::Network(_) => true,
            GeocodeError::NotFound => false,
            GeocodeError::Ambiguous(_) => false,
            GeocodeError::InvalidResponse(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_transient() {
        assert!(
            GeocodeError::Service {
                status: 503,
                message: "busy".to_string()
            }
            .is_transient()
        );
        assert!(!GeocodeError::NotFound.is_transient());
        assert!(!GeocodeError::Ambiguous("two matches".to_string()).is_transient());
        assert!(!GeocodeError::InvalidResponse("bad json".to_string()).is_transient());
    }
}
