use clap::{Parser, Subcommand};
use kvstores::{Scalar, Store, StoreMode, ValueMap};

#[derive(Parser)]
#[command(name = "kvs", about = "Key-value store client", version)]
pub struct ClientArgs {
  /// YAML config file (defaults to ./kvstores.yaml when present)
  #[arg(short, long, env = "KVSTORES_CONFIG")]
  pub config: Option<String>,
  /// Backend to use, overriding the config file
  #[arg(short, long)]
  pub mode: Option<StoreMode>,
  /// Redis address (host:port), overriding the config file
  #[arg(short = 'H', long)]
  pub addr: Option<String>,
  /// Expiration in milliseconds for writes, overriding the config file
  #[arg(short, long)]
  pub expiration: Option<u64>,
  #[command(subcommand)]
  pub action: Action,
}

#[derive(Subcommand)]
pub enum Action {
  /// Get a value by key
  Get { key: String },
  /// Set a scalar value (parsed as JSON, else stored as text)
  Set { key: String, value: String },
  /// Get a map
  GetMap { key: String },
  /// Set a map from field=value pairs
  SetMap {
    key: String,
    #[arg(required = true)]
    fields: Vec<String>,
  },
  /// Get a list
  GetSlice { key: String },
  /// Set a list
  SetSlice {
    key: String,
    #[arg(required = true)]
    values: Vec<String>,
  },
  /// Append values to a list
  Append {
    key: String,
    #[arg(required = true)]
    values: Vec<String>,
  },
  /// Check whether a key exists
  Exists { key: String },
  /// Delete a key
  Del { key: String },
  /// Remove every key
  Flush,
  /// Check that the backend is reachable
  Ping,
}

pub async fn run(store: &dyn Store, action: &Action) -> Result<(), anyhow::Error> {
  match action {
    Action::Get { key } => print_json(&store.get(key).await?)?,
    Action::Set { key, value } => {
      store.set(key, parse_scalar(value)).await?;
      println!("OK");
    }
    Action::GetMap { key } => print_json(&store.get_map(key).await?)?,
    Action::SetMap { key, fields } => {
      store.set_map(key, parse_fields(fields)?).await?;
      println!("OK");
    }
    Action::GetSlice { key } => print_json(&store.get_slice(key).await?)?,
    Action::SetSlice { key, values } => {
      store.set_slice(key, parse_scalars(values)).await?;
      println!("OK");
    }
    Action::Append { key, values } => {
      store.append_slice(key, parse_scalars(values)).await?;
      println!("OK");
    }
    Action::Exists { key } => println!("{}", store.exists(key).await?),
    Action::Del { key } => {
      store.delete(key).await?;
      println!("OK");
    }
    Action::Flush => {
      store.flush().await?;
      println!("OK");
    }
    // Opening the store already probed the backend
    Action::Ping => println!("PONG ({})", store.name()),
  }
  Ok(())
}

fn print_json<T: serde::Serialize>(value: &Option<T>) -> Result<(), anyhow::Error> {
  match value {
    Some(v) => println!("{}", serde_json::to_string_pretty(v)?),
    None => println!("(nil)"),
  }
  Ok(())
}

/// JSON if it parses, plain text otherwise
pub fn parse_scalar(input: &str) -> Scalar {
  match serde_json::from_str::<serde_json::Value>(input) {
    Ok(json) => Scalar::from(json),
    Err(_) => Scalar::String(input.to_string()),
  }
}

fn parse_scalars(inputs: &[String]) -> Vec<Scalar> {
  inputs.iter().map(|s| parse_scalar(s)).collect()
}

fn parse_fields(fields: &[String]) -> Result<ValueMap, anyhow::Error> {
  fields
    .iter()
    .map(|pair| {
      let (k, v) = pair
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("expected field=value, got {:?}", pair))?;
      Ok((k.to_string(), parse_scalar(v)))
    })
    .collect()
}
