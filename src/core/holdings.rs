//! Holdings data model, fetch errors and the provider abstraction

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::warn;

/// Reply of the `/etf/holdings` endpoint.
///
/// Only a JSON object decodes; arrays and scalars are rejected.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct HoldingsResponse {
    pub symbol: String,
    pub date_from: String,
    pub date_to: String,
    pub holdings: Vec<Holding>,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct ResponseFields {
    #[serde(deserialize_with = "null_as_default")]
    symbol: String,
    #[serde(deserialize_with = "null_as_default")]
    date_from: String,
    #[serde(deserialize_with = "null_as_default")]
    date_to: String,
    #[serde(deserialize_with = "null_as_default")]
    holdings: Vec<Holding>,
}

impl TryFrom<Map<String, Value>> for HoldingsResponse {
    type Error = serde_json::Error;

    fn try_from(object: Map<String, Value>) -> Result<Self, Self::Error> {
        let fields: ResponseFields = serde_json::from_value(Value::Object(object))?;
        Ok(HoldingsResponse {
            symbol: fields.symbol,
            date_from: fields.date_from,
            date_to: fields.date_to,
            holdings: fields.holdings,
        })
    }
}

/// A single position inside a fund snapshot.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Holding {
    #[serde(deserialize_with = "null_as_default")]
    pub fund: String,
    #[serde(deserialize_with = "null_as_default")]
    pub date: String,
    #[serde(deserialize_with = "null_as_default")]
    pub ticker: String,
    #[serde(deserialize_with = "null_as_default")]
    pub company: String,
    #[serde(deserialize_with = "null_as_default")]
    pub cusip: String,
    #[serde(deserialize_with = "lenient_i64")]
    pub shares: i64,
    #[serde(deserialize_with = "lenient_f64")]
    pub market_value: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub share_price: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub weight: f64,
    #[serde(deserialize_with = "lenient_i64")]
    pub weight_rank: i64,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// Malformed numbers decode to zero rather than failing the whole response.
fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64().unwrap_or_default(),
        Value::String(s) => s.trim().parse().unwrap_or_default(),
        _ => 0.0,
    })
}

fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or_default(),
        Value::String(s) => s.trim().parse().unwrap_or_default(),
        _ => 0,
    })
}

impl HoldingsResponse {
    /// Rank-1 holding of every fund present in the response, keyed by fund.
    ///
    /// Funds without a rank-1 entry are left out. When a fund reports more
    /// than one rank-1 entry the last one in response order is kept.
    pub fn top_holdings(&self) -> BTreeMap<&str, &Holding> {
        let mut top = BTreeMap::new();
        for holding in self.holdings.iter().filter(|h| h.weight_rank == 1) {
            if let Some(previous) = top.insert(holding.fund.as_str(), holding) {
                warn!(
                    fund = %holding.fund,
                    replaced = %previous.ticker,
                    ticker = %holding.ticker,
                    "Duplicate rank-1 holding, keeping the later entry"
                );
            }
        }
        top
    }

    /// Fund symbol to top ticker.
    pub fn top_tickers(&self) -> BTreeMap<&str, &str> {
        self.top_holdings()
            .into_iter()
            .map(|(fund, holding)| (fund, holding.ticker.as_str()))
            .collect()
    }
}

#[derive(Debug, Error)]
pub enum HoldingsError {
    #[error("Request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to read holdings response body")]
    BodyRead(#[source] reqwest::Error),

    #[error("Failed to decode holdings response")]
    Decode(#[source] serde_json::Error),
}

impl HoldingsError {
    /// Fixed text shown to the user; the cause is only logged.
    pub fn user_message(&self) -> &'static str {
        match self {
            HoldingsError::Transport { .. } => "Couldn't connect to endpoint",
            HoldingsError::BodyRead(_) | HoldingsError::Decode(_) => "Error reading response body",
        }
    }
}

#[async_trait]
pub trait HoldingsProvider: Send + Sync {
    async fn fetch_holdings(&self, funds: &[String]) -> Result<HoldingsResponse, HoldingsError>;
}
