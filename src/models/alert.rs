use std::fmt;

use serde::{Deserialize, Serialize};

/// Backend alert ids are opaque: some deployments send numbers, some strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AlertId {
    Number(i64),
    Text(String),
}

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertId::Number(n) => write!(f, "{n}"),
            AlertId::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertCondition {
    // price >= target
    Above,
    // price <= target
    Below,
}

impl AlertCondition {
    pub fn from_above(above: bool) -> Self {
        if above { Self::Above } else { Self::Below }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Above => "above",
            Self::Below => "below",
        }
    }
}

/// A price alert as returned by `GET /alerts`. Server-owned; read only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "stockAlertId", alias = "id")]
    pub id: AlertId,

    #[serde(rename = "stockSymbol", alias = "symbol")]
    pub symbol: String,

    #[serde(rename = "targetPrice")]
    pub target_price: f64,

    pub above: bool,
}

impl Alert {
    pub fn condition(&self) -> AlertCondition {
        AlertCondition::from_above(self.above)
    }
}
