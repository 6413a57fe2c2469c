use std::{borrow::Cow, collections::HashMap, time::Duration};

use testcontainers::{core::WaitFor, Image};

const NAME: &str = "gacerioni/redis-quick-cluster";
const TAG: &str = "0.1.5-unstable";
const READY_MESSAGE: &str = "Cluster is up and running.";

/// Redis version the cluster image runs when [`RedisCluster::with_redis_version`] is not called.
pub const DEFAULT_REDIS_VERSION: &str = "7.2.6";

/// Ports the cluster nodes bind on the host. The image forms a three-node
/// cluster and expects host networking, so these are reachable on `localhost`
/// directly rather than through mapped ports.
pub const CLUSTER_PORTS: [u16; 3] = [7000, 7001, 7002];

/// Upper bound on how long cluster formation may take before startup is
/// considered failed.
pub const CLUSTER_STARTUP_TIMEOUT: Duration = Duration::from_secs(60);

/// Module to work with a prebuilt [`Redis cluster`] inside of tests.
///
/// Starts one container that forms a complete three-node cluster internally,
/// based on the [`gacerioni/redis-quick-cluster`] image. The cluster nodes
/// listen on ports 7000-7002 ([`CLUSTER_PORTS`]); because cluster nodes
/// advertise their own addresses to clients, the container has to run with
/// host networking (Linux only) so that the advertised addresses stay valid
/// on the host side.
///
/// # Example
/// ```no_run
/// use redis::Commands;
/// use redis_cluster_smoke::{
///     cluster::{RedisCluster, CLUSTER_PORTS, CLUSTER_STARTUP_TIMEOUT},
///     testcontainers::{runners::SyncRunner, ImageExt},
/// };
///
/// let node = RedisCluster::default()
///     .with_network("host")
///     .with_startup_timeout(CLUSTER_STARTUP_TIMEOUT)
///     .start()
///     .unwrap();
///
/// let nodes: Vec<_> = CLUSTER_PORTS
///     .iter()
///     .map(|port| format!("redis://localhost:{port}"))
///     .collect();
/// let client = redis::cluster::ClusterClient::new(nodes).unwrap();
/// let mut con = client.get_connection().unwrap();
///
/// con.set::<_, _, ()>("my_key", 42).unwrap();
/// let result: i64 = con.get("my_key").unwrap();
/// ```
///
/// [`Redis cluster`]: https://redis.io/docs/management/scaling/
/// [`gacerioni/redis-quick-cluster`]: https://hub.docker.com/r/gacerioni/redis-quick-cluster
/// [`CLUSTER_PORTS`]: crate::cluster::CLUSTER_PORTS
#[derive(Debug, Clone)]
pub struct RedisCluster {
    env_vars: HashMap<String, String>,
}

impl RedisCluster {
    /// Sets the Redis version the cluster nodes run, passed to the image via
    /// the `REDIS_VERSION` environment variable.
    pub fn with_redis_version(mut self, version: &str) -> Self {
        self.env_vars
            .insert("REDIS_VERSION".to_owned(), version.to_owned());
        self
    }
}

impl Default for RedisCluster {
    fn default() -> Self {
        let mut env_vars = HashMap::new();
        env_vars.insert(
            "REDIS_VERSION".to_owned(),
            DEFAULT_REDIS_VERSION.to_owned(),
        );

        Self { env_vars }
    }
}

impl Image for RedisCluster {
    fn name(&self) -> &str {
        NAME
    }

    fn tag(&self) -> &str {
        TAG
    }

    fn ready_conditions(&self) -> Vec<WaitFor> {
        vec![WaitFor::message_on_stdout(READY_MESSAGE)]
    }

    fn env_vars(
        &self,
    ) -> impl IntoIterator<Item = (impl Into<Cow<'_, str>>, impl Into<Cow<'_, str>>)> {
        &self.env_vars
    }
}
