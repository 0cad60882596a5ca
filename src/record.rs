//! Log record input type.
//!
//! Records arrive already line-split by the upstream parser; the core never
//! sees raw log lines. Numeric fields are kept raw and parsed leniently so a
//! malformed record stays in the population instead of being dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Firewall action recorded for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Allowed,
    Blocked,
    Other,
}

impl Action {
    /// Parse the action token as the upstream log format emits it.
    pub fn parse(token: &str) -> Self {
        if token.eq_ignore_ascii_case("allowed") {
            Action::Allowed
        } else if token.eq_ignore_ascii_case("blocked") {
            Action::Blocked
        } else {
            Action::Other
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Action::Blocked)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Allowed => "Allowed",
            Action::Blocked => "Blocked",
            Action::Other => "Other",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One parsed access-log record. Immutable once constructed; the `id` is the
/// opaque handle used to correlate verdicts back to storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub src_ip: String,
    pub dest_ip: String,
    pub domain: String,
    pub action: Action,
    pub method: String,
    /// Raw status code token. Unparsable values read as 0 downstream.
    pub status_code: String,
    pub user_agent: String,
    /// Raw byte-count field: two space-separated counts, sent then received.
    pub bytes: String,
}

impl LogRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        timestamp: DateTime<Utc>,
        src_ip: impl Into<String>,
        dest_ip: impl Into<String>,
        domain: impl Into<String>,
        action: Action,
        method: impl Into<String>,
        status_code: impl Into<String>,
        user_agent: impl Into<String>,
        bytes: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp,
            src_ip: src_ip.into(),
            dest_ip: dest_ip.into(),
            domain: domain.into(),
            action,
            method: method.into(),
            status_code: status_code.into(),
            user_agent: user_agent.into(),
            bytes: bytes.into(),
        }
    }

    /// Status code as a number, 0 if unparsable.
    pub fn status_code_num(&self) -> u32 {
        self.status_code.trim().parse().unwrap_or(0)
    }

    /// Byte counts as `(sent, received)`, `(0, 0)` if the field is malformed.
    pub fn byte_counts(&self) -> (u64, u64) {
        let mut parts = self.bytes.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some(sent), Some(received)) => match (sent.parse(), received.parse()) {
                (Ok(s), Ok(r)) => (s, r),
                _ => (0, 0),
            },
            _ => (0, 0),
        }
    }

    pub fn bytes_sent(&self) -> u64 {
        self.byte_counts().0
    }

    pub fn bytes_received(&self) -> u64 {
        self.byte_counts().1
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record_with_bytes(bytes: &str) -> LogRecord {
        LogRecord::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
            "192.168.1.10",
            "10.0.0.1",
            "example.com",
            Action::Allowed,
            "GET",
            "200",
            "Mozilla/5.0",
            bytes,
        )
    }

    #[test]
    fn test_byte_counts_parsed() {
        assert_eq!(record_with_bytes("1200 3400").byte_counts(), (1200, 3400));
    }

    #[test]
    fn test_byte_counts_malformed_defaults_to_zero() {
        assert_eq!(record_with_bytes("garbage").byte_counts(), (0, 0));
        assert_eq!(record_with_bytes("12").byte_counts(), (0, 0));
        assert_eq!(record_with_bytes("12 x").byte_counts(), (0, 0));
        assert_eq!(record_with_bytes("").byte_counts(), (0, 0));
    }

    #[test]
    fn test_status_code_lenient() {
        let mut r = record_with_bytes("0 0");
        assert_eq!(r.status_code_num(), 200);
        r.status_code = "abc".to_string();
        assert_eq!(r.status_code_num(), 0);
    }

    #[test]
    fn test_action_parse() {
        assert_eq!(Action::parse("Allowed"), Action::Allowed);
        assert_eq!(Action::parse("blocked"), Action::Blocked);
        assert_eq!(Action::parse("DENY"), Action::Other);
    }
}
