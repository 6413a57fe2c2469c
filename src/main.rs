use redis_cluster_smoke::smoke::{self, SmokeConfig};

fn main() -> Result<(), Box<dyn std::error::Error + 'static>> {
    pretty_env_logger::init();

    let config = SmokeConfig::from_env();
    smoke::run(&config)
}
