//! Location hints and the location/time species filter.

use crate::analysis::types::RawDetection;
use crate::classifier::Classifier;
use crate::constants::UNSET_COORDINATE;
use crate::error::{Error, Result};
use crate::utils::date::{clamp_week, week_of};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};

/// Where and when a recording was made.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationHint {
    /// Latitude (-90.0 to 90.0).
    pub latitude: f64,
    /// Longitude (-180.0 to 180.0).
    pub longitude: f64,
    /// `BirdNET` week (1-48).
    pub week: u32,
}

/// Raw location fields as submitted by a client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocationFields {
    /// Latitude text.
    pub lat: Option<String>,
    /// Longitude text.
    pub lon: Option<String>,
    /// Week text (1-48, `-1` for unset).
    pub week: Option<String>,
    /// Date text, `YYYY-MM-DD`.
    pub date: Option<String>,
}

impl LocationHint {
    /// Build a hint from client fields.
    ///
    /// Coordinates must come as a pair; a missing, blank or `-1` value for
    /// either one means no hint. The week is taken from `week`, else
    /// derived from `date`, else from `today`. Non-numeric or out-of-range
    /// values are rejected as `InvalidRequest`.
    pub fn from_fields(fields: &LocationFields, today: NaiveDate) -> Result<Option<Self>> {
        let latitude = parse_coordinate(fields.lat.as_deref(), "lat", -90.0, 90.0)?;
        let longitude = parse_coordinate(fields.lon.as_deref(), "lon", -180.0, 180.0)?;

        let (Some(latitude), Some(longitude)) = (latitude, longitude) else {
            if latitude.is_some() || longitude.is_some() {
                debug!("Only one coordinate supplied, ignoring location");
            }
            return Ok(None);
        };

        let week = match parse_week(fields.week.as_deref())? {
            Some(week) => week,
            None => week_of(parse_date(fields.date.as_deref())?.unwrap_or(today)),
        };

        Ok(Some(Self {
            latitude,
            longitude,
            week,
        }))
    }
}

fn invalid(message: String) -> Error {
    Error::InvalidRequest { message }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_coordinate(value: Option<&str>, name: &str, min: f64, max: f64) -> Result<Option<f64>> {
    let Some(text) = non_blank(value) else {
        return Ok(None);
    };

    let value: f64 = text
        .parse()
        .map_err(|_| invalid(format!("'{text}' is not a valid {name}")))?;

    #[allow(clippy::float_cmp)]
    if value == UNSET_COORDINATE {
        return Ok(None);
    }

    if !(min..=max).contains(&value) {
        return Err(invalid(format!(
            "{name} must be between {min} and {max}, got {value}"
        )));
    }

    Ok(Some(value))
}

fn parse_week(value: Option<&str>) -> Result<Option<u32>> {
    let Some(text) = non_blank(value) else {
        return Ok(None);
    };

    let week: i64 = text
        .parse()
        .map_err(|_| invalid(format!("'{text}' is not a valid week")))?;

    if week == -1 {
        return Ok(None);
    }

    Ok(Some(clamp_week(week)))
}

fn parse_date(value: Option<&str>) -> Result<Option<NaiveDate>> {
    non_blank(value)
        .map(|text| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .map_err(|_| invalid(format!("'{text}' is not a valid date (expected YYYY-MM-DD)")))
        })
        .transpose()
}

/// Look up the species expected at a location and week.
///
/// This is a soft dependency: any failure, including a timeout, is logged
/// and reported as `None` so the analysis continues unfiltered.
pub async fn expected_species(
    classifier: &dyn Classifier,
    hint: &LocationHint,
    timeout: Duration,
) -> Option<HashSet<String>> {
    let lookup = classifier.expected_species(hint.latitude, hint.longitude, hint.week);

    match tokio::time::timeout(timeout, lookup).await {
        Ok(Ok(species)) => {
            debug!(
                "Location filter: {} species expected at lat={:.4}, lon={:.4}, week={}",
                species.len(),
                hint.latitude,
                hint.longitude,
                hint.week
            );
            Some(species)
        }
        Ok(Err(e)) => {
            warn!("Location filter unavailable, continuing without it: {e}");
            None
        }
        Err(_) => {
            warn!(
                "Location filter timed out after {}s, continuing without it",
                timeout.as_secs()
            );
            None
        }
    }
}

/// Drop detections whose species is not in `allowed`.
pub fn retain_expected(
    mut detections: Vec<RawDetection>,
    allowed: &HashSet<String>,
) -> Vec<RawDetection> {
    let before_count = detections.len();
    detections.retain(|d| allowed.contains(&d.species));

    let after_count = detections.len();
    if before_count != after_count {
        debug!(
            "Species filter: {} detections before, {} after (filtered {})",
            before_count,
            after_count,
            before_count - after_count
        );
    }

    detections
}
