//! Transient error classification.
//!
//! Two tiers: the backend's own classification wins when present; only
//! unclassified errors fall back to the message marker table.

use graphsweep_core::BackendError;

/// Message fragments that mark an unclassified error as transient.
///
/// Matched case-insensitively by containment.
pub const TRANSIENT_MESSAGE_MARKERS: &[&str] = &[
    "connection refused",
    "timeout",
    "timed out",
    "temporary",
    "unexpected end of",
    "eof",
    "broken pipe",
    "connection reset",
    "reset by peer",
    "service unavailable",
    "serviceunavailable",
];

/// Retry eligibility of a backend error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transience {
    /// Worth another attempt
    Transient,
    /// Retrying will not help
    Permanent,
}

impl Transience {
    /// True for [`Transience::Transient`]
    #[must_use]
    pub fn is_transient(self) -> bool {
        matches!(self, Self::Transient)
    }
}

/// Classify a backend error for the retry policy
#[must_use]
pub fn classify(err: &BackendError) -> Transience {
    if let Some(class) = &err.class {
        return if class.is_transient() {
            Transience::Transient
        } else {
            Transience::Permanent
        };
    }

    let message = err.message.to_lowercase();
    if TRANSIENT_MESSAGE_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
    {
        Transience::Transient
    } else {
        Transience::Permanent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphsweep_core::ErrorClass;

    #[test]
    fn test_structured_class_wins() {
        let transient = BackendError::new("syntax looks odd")
            .with_code("Neo.TransientError.Transaction.DeadlockDetected");
        assert_eq!(classify(&transient), Transience::Transient);

        // a client error stays permanent even if its message looks like a network failure
        let client = BackendError::new("connection refused by policy")
            .with_code("Neo.ClientError.Security.Forbidden");
        assert_eq!(classify(&client), Transience::Permanent);
    }

    #[test]
    fn test_marker_fallback() {
        for msg in [
            "dial tcp 127.0.0.1:7687: connect: Connection Refused",
            "read tcp: i/o timeout",
            "Temporary failure in name resolution",
            "unexpected EOF",
            "write: broken pipe",
            "connection reset by peer",
            "ServiceUnavailable: no routing servers",
        ] {
            assert!(
                classify(&BackendError::new(msg)).is_transient(),
                "{} should be transient",
                msg
            );
        }
    }

    #[test]
    fn test_unmarked_message_is_permanent() {
        assert_eq!(
            classify(&BackendError::new("Invalid input 'MATCHX'")),
            Transience::Permanent
        );
    }

    #[test]
    fn test_other_class_is_permanent() {
        let err = BackendError::new("timeout").with_class(ErrorClass::Other("Weird".to_string()));
        assert_eq!(classify(&err), Transience::Permanent);
    }
}
