use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use eggboard_core::player::{PlayerRecord, YearlyGain, YearlyGainEdge};
use eggboard_core::types::Timestamp;

/// HTTP request timeout for one fetch.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from the upstream fetch.
#[derive(Debug, thiserror::Error)]
pub enum WonkyError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The upstream returned a non-2xx status code.
    #[error("Upstream returned HTTP {0}")]
    HttpStatus(u16),

    /// The upstream returned an empty player array.
    #[error("Upstream returned no players")]
    EmptyPayload,

    /// The payload was not a JSON array of player records.
    #[error("Unexpected upstream payload: {0}")]
    InvalidPayload(String),
}

/// HTTP client for the upstream player-data endpoint.
pub struct WonkyClient {
    client: reqwest::Client,
    endpoint_url: String,
}

impl WonkyClient {
    /// Create a client for the given endpoint URL.
    pub fn new(endpoint_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self {
            client,
            endpoint_url,
        }
    }

    /// Fetch the current player set.
    ///
    /// Returns every record the upstream reported, in upstream order.
    /// Records with unparseable `updatedAt` values come back with
    /// `updated_at = None`; the decision engine keeps them out of
    /// sync-window math.
    pub async fn fetch(&self) -> Result<Vec<PlayerRecord>, WonkyError> {
        let response = self.client.get(&self.endpoint_url).send().await?;

        if !response.status().is_success() {
            return Err(WonkyError::HttpStatus(response.status().as_u16()));
        }

        let payload: serde_json::Value = response.json().await?;
        let raw: Vec<RawPlayer> = match payload {
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(serde_json::from_value)
                .collect::<Result<_, _>>()
                .map_err(|e| WonkyError::InvalidPayload(e.to_string()))?,
            other => {
                return Err(WonkyError::InvalidPayload(format!(
                    "expected an array, got {}",
                    json_type_name(&other)
                )))
            }
        };

        if raw.is_empty() {
            return Err(WonkyError::EmptyPayload);
        }

        let records: Vec<PlayerRecord> = raw.into_iter().map(PlayerRecord::from).collect();
        let unparsed = records.iter().filter(|r| r.updated_at.is_none()).count();
        if unparsed > 0 {
            tracing::warn!(unparsed, "Upstream records with unparseable updatedAt");
        }

        Ok(records)
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// One player as spelled on the wire.
#[derive(Debug, Deserialize)]
struct RawPlayer {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "IGN")]
    ign: String,
    #[serde(rename = "displayName")]
    display_name: Option<String>,
    #[serde(rename = "discordName", default)]
    discord_name: String,
    #[serde(rename = "farmerRole")]
    farmer_role: Option<String>,
    #[serde(default)]
    grade: String,
    #[serde(default)]
    active: bool,
    #[serde(rename = "isGuest", default)]
    is_guest: bool,
    #[serde(rename = "EB", default)]
    eb: f64,
    #[serde(rename = "SE", default)]
    se: f64,
    #[serde(rename = "PE", default)]
    pe: i64,
    #[serde(rename = "TE")]
    te: Option<i64>,
    #[serde(rename = "numPrestiges")]
    num_prestiges: Option<i32>,
    #[serde(rename = "updatedAt")]
    updated_at: Option<String>,
    #[serde(default)]
    gains: RawGains,
    #[serde(rename = "maxMysticalEggs")]
    max_mystical_eggs: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
struct RawGains {
    saturday: Option<f64>,
    #[serde(rename = "eggDay", default)]
    egg_day: Vec<RawYearlyGain>,
}

#[derive(Debug, Deserialize)]
struct RawYearlyGain {
    year: i32,
    start: RawGainEdge,
    end: RawGainEdge,
}

#[derive(Debug, Deserialize)]
struct RawGainEdge {
    #[serde(rename = "SE", default)]
    se: f64,
    #[serde(rename = "PE", default)]
    pe: i64,
    #[serde(rename = "EB", default)]
    eb: f64,
    #[serde(rename = "Role")]
    role: Option<String>,
    #[serde(rename = "Prestiges")]
    prestiges: Option<i32>,
}

impl From<RawPlayer> for PlayerRecord {
    fn from(raw: RawPlayer) -> Self {
        let updated_at = raw.updated_at.as_deref().and_then(parse_instant);
        PlayerRecord {
            id: raw.id,
            ign: raw.ign,
            display_name: raw.display_name,
            discord_name: raw.discord_name,
            farmer_role: raw.farmer_role,
            grade: raw.grade,
            active: raw.active,
            is_guest: raw.is_guest,
            eb: raw.eb,
            se: raw.se,
            pe: raw.pe,
            te: raw.te,
            num_prestiges: raw.num_prestiges,
            updated_at,
            gains_saturday: raw.gains.saturday,
            max_mystical_eggs: raw.max_mystical_eggs,
            egg_day: raw.gains.egg_day.into_iter().map(YearlyGain::from).collect(),
        }
    }
}

impl From<RawYearlyGain> for YearlyGain {
    fn from(raw: RawYearlyGain) -> Self {
        YearlyGain {
            year: raw.year,
            start: raw.start.into(),
            end: raw.end.into(),
        }
    }
}

impl From<RawGainEdge> for YearlyGainEdge {
    fn from(raw: RawGainEdge) -> Self {
        YearlyGainEdge {
            se: raw.se,
            pe: raw.pe,
            eb: raw.eb,
            role: raw.role,
            prestiges: raw.prestiges,
        }
    }
}

/// Parse an upstream timestamp as an absolute instant; `None` when it does
/// not parse.
fn parse_instant(value: &str) -> Option<Timestamp> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
