use anyerror::AnyError;

/// Errors raised when building or validating a [`Config`](crate::config::Config).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ConfigError {
    #[error("failed to parse arguments {args:?}: {source}")]
    ParseError { source: AnyError, args: Vec<String> },

    #[error("election timeout: min({min}) must be < max({max})")]
    ElectionTimeout { min: u64, max: u64 },

    #[error("heartbeat_interval({heartbeat_interval}) must be < election_timeout_min({election_timeout_min}) / 2")]
    HeartbeatGEElectionTimeout {
        election_timeout_min: u64,
        heartbeat_interval: u64,
    },

    #[error("{field} must be > 0")]
    MustBePositive { field: &'static str },
}
