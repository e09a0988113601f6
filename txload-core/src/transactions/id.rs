use serde::Serialize;
use serde_json::Value;

/// Server-assigned transaction identifier, kept in the JSON type the server used.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum TransactionId {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl TransactionId {
    pub fn from_json(v: &Value) -> Option<Self> {
        match v {
            // 0 is how some backends spell "no id".
            Value::Number(n) => n.as_i64().filter(|n| *n != 0).map(Self::Number),
            Value::String(s) if !s.is_empty() => Some(Self::Text(s.clone())),
            _ => None,
        }
    }

    /// Pull the id out of a create response: top-level `id`, or `data.id` inside the
    /// `{code, msg, data}` envelope.
    pub fn extract(body: &[u8]) -> Option<Self> {
        let v: Value = serde_json::from_slice(body).ok()?;
        v.get("id")
            .and_then(Self::from_json)
            .or_else(|| v.get("data")?.get("id").and_then(Self::from_json))
    }
}

impl From<i64> for TransactionId {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for TransactionId {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}
