//! Uniform value model shared by every store backend

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// String-keyed map of scalars, as stored by `set_map`
pub type ValueMap = HashMap<String, Scalar>;

/// A single opaque value (JSON-compatible)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
  #[default]
  Null,
  Bool(bool),
  Integer(i64),
  Float(f64),
  String(String),
}

impl Scalar {
  pub fn is_null(&self) -> bool {
    matches!(self, Scalar::Null)
  }

  /// Text form used when a backend can only store strings.
  /// `Null` becomes the empty string.
  pub fn to_text(&self) -> String {
    match self {
      Scalar::Null => String::new(),
      Scalar::Bool(b) => b.to_string(),
      Scalar::Integer(i) => i.to_string(),
      Scalar::Float(f) => f.to_string(),
      Scalar::String(s) => s.clone(),
    }
  }
}

impl fmt::Display for Scalar {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.to_text())
  }
}

impl From<&str> for Scalar {
  fn from(s: &str) -> Self {
    Scalar::String(s.to_string())
  }
}

impl From<String> for Scalar {
  fn from(s: String) -> Self {
    Scalar::String(s)
  }
}

impl From<i64> for Scalar {
  fn from(i: i64) -> Self {
    Scalar::Integer(i)
  }
}

impl From<f64> for Scalar {
  fn from(f: f64) -> Self {
    Scalar::Float(f)
  }
}

impl From<bool> for Scalar {
  fn from(b: bool) -> Self {
    Scalar::Bool(b)
  }
}

/// Any value a store can hold: a scalar, a map or a list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
  Scalar(Scalar),
  Map(ValueMap),
  List(Vec<Scalar>),
}

impl Value {
  /// Short name of the value's shape, used in fault messages
  pub fn kind(&self) -> &'static str {
    match self {
      Value::Scalar(_) => "scalar",
      Value::Map(_) => "map",
      Value::List(_) => "list",
    }
  }
}

impl From<Scalar> for Value {
  fn from(s: Scalar) -> Self {
    Value::Scalar(s)
  }
}

impl From<ValueMap> for Value {
  fn from(m: ValueMap) -> Self {
    Value::Map(m)
  }
}

impl From<Vec<Scalar>> for Value {
  fn from(l: Vec<Scalar>) -> Self {
    Value::List(l)
  }
}

/// Arrays and objects keep their JSON text
impl From<serde_json::Value> for Scalar {
  fn from(v: serde_json::Value) -> Self {
    match v {
      serde_json::Value::Null => Scalar::Null,
      serde_json::Value::Bool(b) => Scalar::Bool(b),
      serde_json::Value::Number(n) => {
        if let Some(i) = n.as_i64() {
          Scalar::Integer(i)
        } else {
          Scalar::Float(n.as_f64().unwrap_or_default())
        }
      }
      serde_json::Value::String(s) => Scalar::String(s),
      other => Scalar::String(other.to_string()),
    }
  }
}
