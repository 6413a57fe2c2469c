use std::{env, thread, time::Duration};

use log::{error, info};
use redis::{cluster::ClusterClient, Commands, ErrorKind, RedisResult};
use testcontainers::{runners::SyncRunner, ImageExt};

use crate::cluster::{
    RedisCluster, CLUSTER_PORTS, CLUSTER_STARTUP_TIMEOUT, DEFAULT_REDIS_VERSION,
};

const TEST_KEY: &str = "testkey";
const TEST_VALUE: &str = "Hello, Redis Cluster!";

/// How long [`run`] keeps the cluster alive after a successful probe, so the
/// cluster can be poked at manually before teardown.
pub const DEFAULT_HOLD: Duration = Duration::from_secs(300);

/// Settings for one smoke-test run.
///
/// [`Default`] reproduces the fixed values of the original demo: version
/// `7.2.6`, `localhost`, ports 7000-7002 and a five minute hold.
#[derive(Debug, Clone)]
pub struct SmokeConfig {
    /// Redis version requested from the cluster image.
    pub redis_version: String,
    /// Host the cluster nodes are reachable on. With host networking this is
    /// `localhost`.
    pub host: String,
    /// The three ports the cluster nodes bind.
    pub ports: [u16; 3],
    /// How long to keep the cluster alive after the probe succeeded.
    pub hold: Duration,
}

impl Default for SmokeConfig {
    fn default() -> Self {
        Self {
            redis_version: DEFAULT_REDIS_VERSION.to_owned(),
            host: "localhost".to_owned(),
            ports: CLUSTER_PORTS,
            hold: DEFAULT_HOLD,
        }
    }
}

impl SmokeConfig {
    /// Builds a config from the process environment, reading `REDIS_VERSION`
    /// and falling back to the defaults for everything else.
    pub fn from_env() -> Self {
        Self {
            redis_version: resolve_version(env::var("REDIS_VERSION").ok()),
            ..Self::default()
        }
    }
}

/// Picks the Redis version to run: a non-empty value wins, anything else
/// falls back to [`DEFAULT_REDIS_VERSION`]. The value is not validated.
pub fn resolve_version(value: Option<String>) -> String {
    match value {
        Some(version) if !version.is_empty() => version,
        _ => DEFAULT_REDIS_VERSION.to_owned(),
    }
}

/// Builds the `host:port` address list for the three cluster nodes, in port
/// order.
pub fn cluster_addresses(host: &str, ports: &[u16; 3]) -> Vec<String> {
    ports.iter().map(|port| format!("{host}:{port}")).collect()
}

/// Connects a cluster client to the given addresses and runs the
/// PING/SET/GET sequence.
///
/// The client is constructed lazily; the first network round-trip happens on
/// the PING. The first failing command aborts the probe, there are no
/// retries.
pub fn probe(addrs: &[String]) -> RedisResult<()> {
    let nodes: Vec<_> = addrs.iter().map(|addr| format!("redis://{addr}")).collect();
    let client = ClusterClient::new(nodes)?;
    let mut con = client.get_connection()?;

    let pong: String = redis::cmd("PING").query(&mut con)?;
    if pong != "PONG" {
        return Err((ErrorKind::ResponseError, "unexpected PING reply", pong).into());
    }
    info!("PING response: PONG");

    con.set::<_, _, ()>(TEST_KEY, TEST_VALUE)?;
    info!("SET {TEST_KEY} succeeded");

    let value: String = con.get(TEST_KEY)?;
    if value != TEST_VALUE {
        return Err((ErrorKind::ResponseError, "GET did not round-trip", value).into());
    }
    info!("GET response: {value}");
    Ok(())
}

/// Runs the whole flow: start the cluster container, probe it, hold it open
/// for manual interaction, tear it down.
///
/// The container is terminated when its guard drops, so teardown also runs
/// when the probe fails. Any launch, readiness or command error is returned
/// as-is; the caller decides the exit code.
pub fn run(config: &SmokeConfig) -> Result<(), Box<dyn std::error::Error + 'static>> {
    info!("using Redis version: {}", config.redis_version);

    let container = RedisCluster::default()
        .with_redis_version(&config.redis_version)
        .with_network("host")
        .with_startup_timeout(CLUSTER_STARTUP_TIMEOUT)
        .start()?;
    info!("using host network, cluster running at: {}", config.host);

    let addrs = cluster_addresses(&config.host, &config.ports);
    info!("connecting to cluster at: {}", addrs.join(", "));

    hold_after_probe(container, || probe(&addrs), config.hold).map_err(|err| {
        error!("smoke test failed, cluster addresses: {addrs:?}");
        err.into()
    })
}

/// Probes, then keeps `guard` alive for `hold` before dropping it. On a probe
/// error the guard is dropped right away and the error is passed through.
fn hold_after_probe<G>(
    guard: G,
    probe: impl FnOnce() -> RedisResult<()>,
    hold: Duration,
) -> RedisResult<()> {
    probe()?;
    info!("holding the cluster open for {hold:?} before teardown");
    thread::sleep(hold);
    drop(guard);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn explicit_version_wins() {
        assert_eq!(resolve_version(Some("6.2.14".to_owned())), "6.2.14");
    }

    #[test]
    fn missing_version_falls_back_to_default() {
        assert_eq!(resolve_version(None), "7.2.6");
    }

    #[test]
    fn empty_version_falls_back_to_default() {
        assert_eq!(resolve_version(Some(String::new())), "7.2.6");
    }

    #[test]
    fn addresses_cover_the_three_fixed_ports() {
        let addrs = cluster_addresses("localhost", &CLUSTER_PORTS);
        assert_eq!(
            addrs,
            ["localhost:7000", "localhost:7001", "localhost:7002"]
        );
    }

    #[test]
    fn default_config_matches_the_original_demo() {
        let config = SmokeConfig::default();
        assert_eq!(config.redis_version, "7.2.6");
        assert_eq!(config.host, "localhost");
        assert_eq!(config.ports, [7000, 7001, 7002]);
        assert_eq!(config.hold, Duration::from_secs(300));
    }

    struct DropCounter<'a>(&'a AtomicUsize);

    impl Drop for DropCounter<'_> {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn guard_dropped_once_after_successful_probe() {
        let drops = AtomicUsize::new(0);
        let result = hold_after_probe(DropCounter(&drops), || Ok(()), Duration::ZERO);
        assert!(result.is_ok());
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn guard_dropped_once_even_when_a_command_fails() {
        let drops = AtomicUsize::new(0);
        let result = hold_after_probe(
            DropCounter(&drops),
            || Err((ErrorKind::ResponseError, "probe failed on purpose").into()),
            Duration::from_secs(300),
        );
        assert!(result.is_err());
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }
}
