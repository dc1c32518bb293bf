//! Typed accessors over the free-form, stringly-typed status snapshot a
//! bridge publishes on the brewery roster.
//!
//! Every parser is infallible from the caller's point of view: a malformed
//! value yields `None` and is logged, never a panic or a propagated error.
//! This is the duck-typed-stat-bag-to-typed-accessor redesign called out in
//! the design notes.

/// Canonical stat names recognised on a bridge's presence status extension.
pub mod keys {
    pub const STRESS_LEVEL: &str = "stress_level";
    pub const AVERAGE_PARTICIPANT_STRESS: &str = "average_participant_stress";
    pub const PACKET_RATE_DOWNLOAD: &str = "packet_rate_download";
    pub const PACKET_RATE_UPLOAD: &str = "packet_rate_upload";
    pub const REGION: &str = "region";
    pub const RELAY_ID: &str = "relay_id";
    pub const VERSION: &str = "version";
    pub const OCTO_VERSION: &str = "octo_version";
    pub const SHUTDOWN_IN_PROGRESS: &str = "shutdown_in_progress";
}

/// Parses a floating-point stat value, logging and discarding on failure.
pub fn parse_f64(field: &str, raw: &str) -> Option<f64> {
    match raw.parse::<f64>() {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(field, raw, %err, "failed to parse stat as f64, ignoring field");
            None
        }
    }
}

/// Parses an integer stat value, logging and discarding on failure.
pub fn parse_u64(field: &str, raw: &str) -> Option<u64> {
    match raw.parse::<u64>() {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(field, raw, %err, "failed to parse stat as u64, ignoring field");
            None
        }
    }
}

/// Parses a boolean-as-string stat value (`"true"` / `"false"`), logging and
/// discarding on anything else.
pub fn parse_bool(field: &str, raw: &str) -> Option<bool> {
    match raw {
        "true" => Some(true),
        "false" => Some(false),
        other => {
            tracing::warn!(field, raw = other, "failed to parse stat as bool, ignoring field");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_f64_ignores_garbage() {
        assert_eq!(parse_f64("stress_level", "0.42"), Some(0.42));
        assert_eq!(parse_f64("stress_level", "not-a-number"), None);
    }

    #[test]
    fn parse_bool_only_accepts_literal_strings() {
        assert_eq!(parse_bool("shutdown_in_progress", "true"), Some(true));
        assert_eq!(parse_bool("shutdown_in_progress", "false"), Some(false));
        assert_eq!(parse_bool("shutdown_in_progress", "yes"), None);
    }

    #[test]
    fn parse_u64_ignores_negative_numbers() {
        assert_eq!(parse_u64("packet_rate_upload", "1200"), Some(1200));
        assert_eq!(parse_u64("packet_rate_upload", "-5"), None);
    }
}
