use crate::config::Config;
use crate::config::ConfigError;

#[test]
fn test_config_defaults() {
    let c = Config::default();

    assert_eq!("coreraft", c.cluster_name);
    assert_eq!(500, c.election_timeout_min);
    assert_eq!(1000, c.election_timeout_max);
    assert_eq!(200, c.heartbeat_interval);
    assert_eq!(64, c.catchup_batch_size);
    assert_eq!(256, c.max_allowed_shipping_lag);

    c.validate().unwrap();
}

#[test]
fn test_config_from_args() {
    let c = Config::build(&["raft", "--election-timeout-min=10", "--cluster-name=foo"]);
    // 10ms election timeout cannot accommodate the default heartbeat.
    assert!(c.is_err());

    let c = Config::build(&[
        "raft",
        "--election-timeout-min=200",
        "--election-timeout-max=400",
        "--heartbeat-interval=50",
        "--cluster-name=foo",
    ])
    .unwrap();
    assert_eq!("foo", c.cluster_name);
    assert_eq!(200, c.election_timeout_min);
}

#[test]
fn test_config_invalid_intervals() {
    let res = Config {
        election_timeout_min: 300,
        election_timeout_max: 300,
        ..Default::default()
    }
    .validate();
    assert_eq!(Err(ConfigError::ElectionTimeout { min: 300, max: 300 }), res);

    let res = Config {
        election_timeout_min: 100,
        election_timeout_max: 200,
        heartbeat_interval: 80,
        ..Default::default()
    }
    .validate();
    assert_eq!(
        Err(ConfigError::HeartbeatGEElectionTimeout {
            election_timeout_min: 100,
            heartbeat_interval: 80,
        }),
        res
    );
}

#[test]
fn test_rand_election_timeout_within_bounds() {
    let c = Config::default();
    for _ in 0..100 {
        let t = c.new_rand_election_timeout().as_millis() as u64;
        assert!(t >= c.election_timeout_min);
        assert!(t < c.election_timeout_max);
    }
}
