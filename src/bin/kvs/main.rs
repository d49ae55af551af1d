mod commands;

use clap::Parser;
use commands::{run, ClientArgs};
use kvstores::{StoreConfig, StoreMode};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
  let args = ClientArgs::parse();

  let mut config = match &args.config {
    Some(path) => StoreConfig::from_file(path)?,
    None => StoreConfig::find_and_load()?.unwrap_or_default(),
  };

  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
    )
    .with_writer(std::io::stderr)
    .init();

  if let Some(mode) = args.mode {
    config.mode = mode;
  }
  if let Some(ms) = args.expiration {
    config.expiration = Duration::from_millis(ms);
  }
  if let Some(addr) = &args.addr {
    match config.mode {
      StoreMode::RedisCluster => config.cluster.addrs = vec![addr.clone()],
      _ => config.redis.addr = addr.clone(),
    }
  }

  let store = config.open().await?;
  let result = run(store.as_ref(), &args.action).await;
  store.close().await?;
  result
}
