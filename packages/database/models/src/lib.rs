#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Database row types and query parameter definitions.
//!
//! These types represent the shapes of data as stored in and retrieved from
//! the `incidents` table, plus the validated filter that every incidents
//! query is built from. They are distinct from the API response types in
//! `incident_map_server_models`.

use chrono::{FixedOffset, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum number of rows ever returned by a single incidents query.
pub const MAX_LIMIT: u32 = 1000;

/// Local datetime layouts accepted for the `from`/`to` parameters, tried in
/// order. A UTC offset, if any, is split off before these are tried.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Reasons a filter request is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// `from` or `to` was missing or empty.
    #[error("from/to are required")]
    MissingTimeRange,

    /// A time range bound could not be parsed as a date or datetime.
    #[error("Invalid timestamp for {param}: {value:?}")]
    InvalidTimestamp {
        /// Query parameter name.
        param: &'static str,
        /// Raw value received.
        value: String,
    },

    /// All four bounding box values were given but one is not a number.
    #[error("Invalid coordinate for {param}: {value:?}")]
    InvalidCoordinate {
        /// Query parameter name.
        param: &'static str,
        /// Raw value received.
        value: String,
    },
}

/// Raw filter parameters as received on the query string.
///
/// Every field is optional here; presence and parsing rules are applied by
/// [`IncidentFilter::try_from`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentFilterParams {
    /// Inclusive lower bound of the time range (ISO 8601 or `YYYY-MM-DD`).
    pub from: Option<String>,
    /// Exclusive upper bound of the time range (ISO 8601 or `YYYY-MM-DD`).
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
}

/// A latitude/longitude bounding box (inclusive on every edge).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Southern latitude boundary.
    pub min_lat: f64,
    /// Western longitude boundary.
    pub min_lon: f64,
    /// Northern latitude boundary.
    pub max_lat: f64,
    /// Eastern longitude boundary.
    pub max_lon: f64,
}

impl BoundingBox {
    /// Creates a new bounding box from the given coordinates.
    #[must_use]
    pub const fn new(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        }
    }
}

/// A validated incidents filter.
///
/// The time range is half-open: `from` is inclusive and `to` is exclusive.
/// A range where `from >= to` is valid and simply matches nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct IncidentFilter {
    /// Inclusive lower bound on `occur_time`.
    pub from: NaiveDateTime,
    /// Exclusive upper bound on `occur_time`.
    pub to: NaiveDateTime,
    /// Exact-match crime type.
    pub crime_type: Option<String>,
    /// Spatial filter.
    pub bbox: Option<BoundingBox>,
}

impl TryFrom<&IncidentFilterParams> for IncidentFilter {
    type Error = FilterError;

    fn try_from(params: &IncidentFilterParams) -> Result<Self, Self::Error> {
        let (Some(from_raw), Some(to_raw)) = (
            non_empty(params.from.as_deref()),
            non_empty(params.to.as_deref()),
        ) else {
            return Err(FilterError::MissingTimeRange);
        };

        let from = parse_timestamp(from_raw).ok_or_else(|| FilterError::InvalidTimestamp {
            param: "from",
            value: from_raw.to_string(),
        })?;
        let to = parse_timestamp(to_raw).ok_or_else(|| FilterError::InvalidTimestamp {
            param: "to",
            value: to_raw.to_string(),
        })?;

        let crime_type = non_empty(params.crime_type.as_deref()).map(str::to_string);

        let bbox = match (
            non_empty(params.min_lat.as_deref()),
            non_empty(params.min_lon.as_deref()),
            non_empty(params.max_lat.as_deref()),
            non_empty(params.max_lon.as_deref()),
        ) {
            (Some(min_lat), Some(min_lon), Some(max_lat), Some(max_lon)) => {
                Some(BoundingBox::new(
                    parse_coordinate("minLat", min_lat)?,
                    parse_coordinate("minLon", min_lon)?,
                    parse_coordinate("maxLat", max_lat)?,
                    parse_coordinate("maxLon", max_lon)?,
                ))
            }
            _ => None,
        };

        Ok(Self {
            from,
            to,
            crime_type,
            bbox,
        })
    }
}

/// Parses a time range bound.
///
/// Accepts an ISO 8601 datetime with minute, second or fractional
/// precision (`T` or space separated), a bare hour (`2020-01-01T14`), or a
/// bare `YYYY-MM-DD` date, which means midnight that day. A trailing `Z` is
/// stripped and the value treated as UTC-naive; an explicit offset such as
/// `+02:00`, `+0200` or `-05` is converted to UTC.
#[must_use]
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    let candidate = trimmed.strip_suffix('Z').unwrap_or(trimmed);

    let (local, offset) = split_offset(candidate);
    let local = parse_local_datetime(local)?;

    match offset {
        None => Some(local),
        Some(offset) => local
            .and_local_timezone(parse_offset(offset)?)
            .single()
            .map(|dt| dt.naive_utc()),
    }
}

fn parse_local_datetime(value: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            // Hour-only times have no minute field for chrono to default.
            ["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(&format!("{value}:00"), fmt).ok())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Splits a trailing `+HH[:MM]` / `-HH[:MM]` offset off the time part.
fn split_offset(value: &str) -> (&str, Option<&str>) {
    let Some(time_start) = value.find(['T', ' ']) else {
        return (value, None);
    };
    value[time_start..]
        .rfind(['+', '-'])
        .map_or((value, None), |i| {
            let (local, offset) = value.split_at(time_start + i);
            (local, Some(offset))
        })
}

/// Parses `+HH`, `+HHMM`, `+HH:MM` (or the `-` forms) into a fixed offset.
fn parse_offset(value: &str) -> Option<FixedOffset> {
    let (sign, rest) = match value.split_at_checked(1)? {
        ("+", rest) => (1, rest),
        ("-", rest) => (-1, rest),
        _ => return None,
    };
    let digits = rest.replacen(':', "", 1);
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().ok()?, 0),
        4 => (digits[..2].parse::<i32>().ok()?, digits[2..].parse::<i32>().ok()?),
        _ => return None,
    };
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

fn parse_coordinate(param: &'static str, value: &str) -> Result<f64, FilterError> {
    value
        .trim()
        .parse()
        .map_err(|_| FilterError::InvalidCoordinate {
            param,
            value: value.to_string(),
        })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

/// An incident row as retrieved from the `incidents` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentRow {
    /// Primary key.
    pub id: i64,
    /// Division of Records report number.
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
    /// Crime type used for exact-match filtering.
    pub crime_type: Option<String>,
    /// When the incident occurred.
    pub occur_time: Option<NaiveDateTime>,
}
