//! Consensus core runtime configuration.

use std::time::Duration;

use anyerror::AnyError;
use clap::Parser;
use rand::Rng;

use crate::config::error::ConfigError;

/// Tunable parameters of one consensus instance.
///
/// All timed values are in milliseconds. Keep the Raft timing inequality in
/// mind: message round trip ≪ `heartbeat_interval` ≪ election timeout.
/// `validate()` enforces `heartbeat_interval < election_timeout_min / 2`.
#[derive(Clone, Debug, PartialEq, Parser)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize), serde(default))]
pub struct Config {
    /// The application-specific name of this cluster.
    #[clap(long, env = "CORERAFT_CLUSTER_NAME", default_value = "coreraft")]
    pub cluster_name: String,

    /// The minimum election timeout in milliseconds.
    #[clap(long, default_value = "500")]
    pub election_timeout_min: u64,

    /// The maximum election timeout in milliseconds.
    #[clap(long, default_value = "1000")]
    pub election_timeout_max: u64,

    /// The interval in milliseconds at which a leader sends heartbeats and
    /// the instance evaluates its timers.
    #[clap(long, default_value = "200")]
    pub heartbeat_interval: u64,

    /// How long a log shipper waits for a follower response before
    /// retransmitting its current probe or batch, in milliseconds.
    #[clap(long, default_value = "100")]
    pub retry_time_millis: u64,

    /// The maximum number of entries shipped to a follower in one
    /// catch-up batch.
    #[clap(long, default_value = "64")]
    pub catchup_batch_size: u64,

    /// How far a follower may lag behind the leader's append index before
    /// the leader stops streaming new entries to it.
    #[clap(long, default_value = "256")]
    pub max_allowed_shipping_lag: u64,

    /// How many recently appended entries the leader keeps in memory for
    /// fast replication reads.
    #[clap(long, default_value = "1024")]
    pub in_flight_cache_entries: u64,
}

impl Default for Config {
    fn default() -> Self {
        <Self as Parser>::parse_from(Vec::<&'static str>::new())
    }
}

impl Config {
    /// Generate a random election timeout within the configured interval.
    pub fn new_rand_election_timeout(&self) -> Duration {
        let millis = rand::thread_rng().gen_range(self.election_timeout_min..self.election_timeout_max);
        Duration::from_millis(millis)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval)
    }

    pub fn retry_time(&self) -> Duration {
        Duration::from_millis(self.retry_time_millis)
    }

    /// Build a `Config` instance from command line arguments.
    pub fn build(args: &[&str]) -> Result<Config, ConfigError> {
        let config = <Self as Parser>::try_parse_from(args).map_err(|e| ConfigError::ParseError {
            source: AnyError::from(&e),
            args: args.iter().map(|x| x.to_string()).collect(),
        })?;
        config.validate()
    }

    /// Validate the state of this config.
    pub fn validate(self) -> Result<Config, ConfigError> {
        if self.election_timeout_min >= self.election_timeout_max {
            return Err(ConfigError::ElectionTimeout {
                min: self.election_timeout_min,
                max: self.election_timeout_max,
            });
        }

        if self.heartbeat_interval >= self.election_timeout_min / 2 {
            return Err(ConfigError::HeartbeatGEElectionTimeout {
                election_timeout_min: self.election_timeout_min,
                heartbeat_interval: self.heartbeat_interval,
            });
        }

        if self.catchup_batch_size == 0 {
            return Err(ConfigError::MustBePositive {
                field: "catchup_batch_size",
            });
        }

        if self.retry_time_millis == 0 {
            return Err(ConfigError::MustBePositive {
                field: "retry_time_millis",
            });
        }

        Ok(self)
    }
}
