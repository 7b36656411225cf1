#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the incident map server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the database row types to allow independent evolution of the API
//! contract.

use chrono::{NaiveDateTime, Timelike as _};
use incident_map_database_models::{IncidentFilterParams, IncidentRow, MAX_LIMIT};
use serde::{Deserialize, Serialize};

/// Message returned whenever the request filter is rejected.
pub const FILTER_REJECTED_MESSAGE: &str = "from/to are required and must be valid ISO strings";

/// An incident as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiIncident {
    /// Unique incident ID.
    pub id: i64,
    /// Report number.
    pub dr_no: Option<String>,
    /// Reporting area name.
    pub area_name: Option<String>,
    /// Crime code description.
    pub crime_desc: Option<String>,
    /// Premise description.
    pub premise_desc: Option<String>,
    /// Weapon description.
    pub weapon_desc: Option<String>,
    /// Case status description.
    pub status_desc: Option<String>,
    /// Free-text location.
    pub location: Option<String>,
    /// Latitude.
    pub lat: Option<f64>,
    /// Longitude.
    pub lon: Option<f64>,
    /// Crime type.
    pub crime_type: Option<String>,
    /// When the incident occurred (ISO 8601).
    pub occur_time: Option<String>,
}

impl From<IncidentRow> for ApiIncident {
    fn from(row: IncidentRow) -> Self {
        Self {
            id: row.id,
            dr_no: row.dr_no,
            area_name: row.area_name,
            crime_desc: row.crime_desc,
            premise_desc: row.premise_desc,
            weapon_desc: row.weapon_desc,
            status_desc: row.status_desc,
            location: row.location,
            lat: row.lat,
            lon: row.lon,
            crime_type: row.crime_type,
            occur_time: row.occur_time.map(format_iso8601),
        }
    }
}

/// Formats a naive timestamp as ISO 8601.
///
/// Sub-second precision is rendered as six digits and only when non-zero,
/// e.g. `2020-03-01T14:30:00` or `2020-03-01T14:30:00.250000`.
#[must_use]
pub fn format_iso8601(dt: NaiveDateTime) -> String {
    if dt.nanosecond() == 0 {
        dt.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else {
        dt.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
    }
}

/// Query parameters for the incidents endpoints.
///
/// Built from decoded query-string pairs with [`FromIterator`]. When a key
/// repeats, the first occurrence wins and unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncidentListParams {
    /// Inclusive start of the time range.
    pub from: Option<String>,
    /// Exclusive end of the time range.
    pub to: Option<String>,
    /// Exact crime type to match.
    pub crime_type: Option<String>,
    /// Southern latitude boundary.
    pub min_lat: Option<String>,
    /// Western longitude boundary.
    pub min_lon: Option<String>,
    /// Northern latitude boundary.
    pub max_lat: Option<String>,
    /// Eastern longitude boundary.
    pub max_lon: Option<String>,
    /// Requested page size; clamped by [`effective_limit`].
    pub limit: Option<String>,
}

impl FromIterator<(String, String)> for IncidentListParams {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(pairs: I) -> Self {
        let mut params = Self::default();

        for (key, value) in pairs {
            let slot = match key.as_str() {
                "from" => &mut params.from,
                "to" => &mut params.to,
                "crimeType" => &mut params.crime_type,
                "minLat" => &mut params.min_lat,
                "minLon" => &mut params.min_lon,
                "maxLat" => &mut params.max_lat,
                "maxLon" => &mut params.max_lon,
                "limit" => &mut params.limit,
                _ => continue,
            };
            slot.get_or_insert(value);
        }

        params
    }
}

impl From<&IncidentListParams> for IncidentFilterParams {
    fn from(p: &IncidentListParams) -> Self {
        Self {
            from: p.from.clone(),
            to: p.to.clone(),
            crime_type: p.crime_type.clone(),
            min_lat: p.min_lat.clone(),
            min_lon: p.min_lon.clone(),
            max_lat: p.max_lat.clone(),
            max_lon: p.max_lon.clone(),
        }
    }
}

/// Resolves the row limit for a list request.
///
/// Absent or non-integer values fall back to [`MAX_LIMIT`]; larger values
/// are clamped to it and negative values to zero.
#[must_use]
pub fn effective_limit(requested: Option<&str>) -> u32 {
    requested
        .and_then(|s| s.trim().parse::<i64>().ok())
        .map_or(MAX_LIMIT, |n| {
            u32::try_from(n.clamp(0, i64::from(MAX_LIMIT))).unwrap_or(MAX_LIMIT)
        })
}

/// Response body of `GET /api/incidents`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentListResponse {
    /// Total number of incidents matching the filter.
    pub total: u64,
    /// Maximum number of records a response can carry.
    pub cap: u32,
    /// Whether `total` exceeds `cap`.
    pub truncated: bool,
    /// Matching incidents, most recent first.
    pub records: Vec<ApiIncident>,
}

impl IncidentListResponse {
    /// Builds the response from fetched rows and the true match count.
    #[must_use]
    pub fn new(rows: Vec<IncidentRow>, total: u64) -> Self {
        Self {
            total,
            cap: MAX_LIMIT,
            truncated: total > u64::from(MAX_LIMIT),
            records: rows.into_iter().map(ApiIncident::from).collect(),
        }
    }
}

/// Response body of `GET /api/incidents/count`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentCountResponse {
    /// Number of incidents matching the filter.
    pub count: u64,
    /// Maximum number of records a list response can carry.
    pub cap: u32,
}

impl IncidentCountResponse {
    /// Builds the response from the match count.
    #[must_use]
    pub const fn new(count: u64) -> Self {
        Self {
            count,
            cap: MAX_LIMIT,
        }
    }
}

/// Error response body.
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    /// Human-readable message.
    pub error: String,
}

impl ApiError {
    /// Creates an error body with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct ApiHealth {
    /// Always `"ok"` when the process is serving.
    pub status: &'static str,
}
