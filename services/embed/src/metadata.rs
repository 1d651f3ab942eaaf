//! Mapping from a logged reading to the tag values written into an image.
//!
//! The mapping is fixed. Camera-side tooling expects exactly these tags,
//! so a missing source field becomes an empty value rather than a skipped
//! tag, and a coordinate that is absent or non-numeric becomes `0`.

use serde_json::Value;
use vireo_readings::{SensorField, SensorReading};

/// Tag values derived from one reading, ready for the external tool.
///
/// The textual fields carry whatever the device sent, rendered as plain
/// text; coordinates are resolved to numbers because the hemisphere
/// reference depends on their sign.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataFields {
    pub temperature: String,
    pub humidity: String,
    pub pressure: String,
    pub light: String,
    pub timestamp: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl MetadataFields {
    /// Derive tag values from a reading. Total: a raw fallback reading
    /// maps like a reading with every semantic field missing.
    pub fn from_reading(reading: &SensorReading) -> Self {
        MetadataFields {
            temperature: text_value(reading.field(SensorField::Temperature)),
            humidity: text_value(reading.field(SensorField::Humidity)),
            pressure: text_value(reading.field(SensorField::Pressure)),
            light: text_value(reading.field(SensorField::Light)),
            timestamp: reading.timestamp().to_string(),
            latitude: numeric_value(reading.field(SensorField::Latitude)),
            longitude: numeric_value(reading.field(SensorField::Longitude)),
        }
    }

    /// Hemisphere reference for the latitude tag.
    pub fn latitude_ref(&self) -> &'static str {
        if self.latitude >= 0.0 {
            "N"
        } else {
            "S"
        }
    }

    /// Hemisphere reference for the longitude tag.
    pub fn longitude_ref(&self) -> &'static str {
        if self.longitude >= 0.0 {
            "E"
        } else {
            "W"
        }
    }

    /// Human-readable composite written as the image description.
    pub fn description(&self) -> String {
        format!(
            "Temp:{}C Humidity:{}% Pressure:{}hPa Light:{} GPS:{},{}",
            self.temperature, self.humidity, self.pressure, self.light, self.latitude,
            self.longitude
        )
    }
}

/// Render a field value as tag text. Missing and null map to empty;
/// strings are taken as-is; anything else keeps its JSON rendering.
fn text_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Resolve a coordinate to a number, defaulting to 0 when it is missing
/// or not numeric.
fn numeric_value(value: Option<&Value>) -> f64 {
    value.and_then(Value::as_f64).unwrap_or(0.0)
}
