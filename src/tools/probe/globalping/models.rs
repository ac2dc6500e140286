use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub(super) const DEFAULT_PROBES_PER_LOCATION: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(super) enum MeasurementType {
    Ping,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(super) struct PingOptions {
    #[serde(rename = "packets")]
    pub packets_count: u8,
}

impl Default for PingOptions {
    fn default() -> Self {
        Self { packets_count: 1 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(super) struct Location {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub region: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub country: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub city: String,
    #[serde(default)]
    pub limit: u8,
}

/// Body of `POST /v1/measurements`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(super) struct MeasurementRequest {
    #[serde(rename = "type")]
    pub kind: MeasurementType,
    pub target: String,
    #[serde(rename = "measurementOptions")]
    pub options: PingOptions,
    pub locations: Vec<Location>,
}

impl MeasurementRequest {
    /// A one-packet ping of `target` from up to five probes per region.
    pub fn ping(target: &str, regions: &[String]) -> Result<Self, String> {
        if target.is_empty() {
            return Err(".target is empty".to_string());
        }
        if regions.is_empty() {
            return Err(".locations is empty".to_string());
        }
        Ok(Self {
            kind: MeasurementType::Ping,
            target: target.to_string(),
            options: PingOptions::default(),
            locations: regions
                .iter()
                .map(|r| Location {
                    region: r.clone(),
                    limit: DEFAULT_PROBES_PER_LOCATION,
                    ..Location::default()
                })
                .collect(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(super) struct MeasurementResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub results: Vec<MeasurementResult>,
    #[serde(default, rename = "probesCount")]
    pub probes_count: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(super) struct MeasurementResult {
    #[serde(default)]
    pub result: ProbeOutcome,
    #[serde(default)]
    pub probe: Probe,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(super) struct ProbeOutcome {
    #[serde(default)]
    pub status: String,
    #[serde(default, rename = "resolvedAddress")]
    pub resolved_address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(super) struct Probe {
    #[serde(default)]
    pub location: Location,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(super) struct ErrorResponse {
    #[serde(default)]
    pub error: ApiError,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(super) struct ApiError {
    /// Only present on 400 responses
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub message: String,
}

/// UN M49 geographic regions, the only region names the API accepts.
pub(super) const VALID_REGIONS: [&str; 22] = [
    "Northern Africa",
    "Eastern Africa",
    "Middle Africa",
    "Southern Africa",
    "Western Africa",
    "Caribbean",
    "Central America",
    "South America",
    "Northern America",
    "Central Asia",
    "Eastern Asia",
    "South-eastern Asia",
    "Southern Asia",
    "Western Asia",
    "Eastern Europe",
    "Northern Europe",
    "Southern Europe",
    "Western Europe",
    "Australia and New Zealand",
    "Melanesia",
    "Micronesia",
    "Polynesia",
];
