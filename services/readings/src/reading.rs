//! The shape of one sensor transmission.
//!
//! The field node pushes whatever it managed to measure; nothing is
//! mandatory and nothing is validated here. A submission that decodes as a
//! JSON object is kept structured with its known fields pulled out by name;
//! anything else is preserved verbatim so no transmission is ever lost.

use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Wall-clock format used for the `timestamp` stamped onto every reading.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current wall-clock time in the log's timestamp format.
pub fn now_timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// The semantic fields a device is known to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorField {
    Temperature,
    Humidity,
    Pressure,
    Light,
    Latitude,
    Longitude,
}

impl SensorField {
    /// Field name as it appears on the wire and in the log.
    pub fn name(&self) -> &'static str {
        match self {
            SensorField::Temperature => "temperature",
            SensorField::Humidity => "humidity",
            SensorField::Pressure => "pressure",
            SensorField::Light => "light",
            SensorField::Latitude => "latitude",
            SensorField::Longitude => "longitude",
        }
    }
}

/// One device transmission, as recorded in the log.
///
/// `Raw` is listed first so that untagged decoding only assigns the exact
/// fallback shape (`raw` + `timestamp`) to it; every other object falls
/// through to `Environment`. A structured entry whose only extra field is
/// literally named `raw` serializes to that exact shape and therefore
/// reloads as `Raw`; the stored JSON is identical either way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SensorReading {
    /// A submission that could not be decoded, kept verbatim.
    Raw(RawReading),
    /// A submission that decoded as a JSON object.
    Environment(EnvironmentReading),
}

/// Fallback shape for submissions that do not decode as a field mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawReading {
    /// Original submission body, unmodified.
    pub raw: String,
    /// Server-assigned arrival time.
    pub timestamp: String,
}

/// A decoded transmission: the known semantic fields, anything else the
/// device sent, and the server-assigned arrival time.
///
/// Field values stay as JSON values rather than numbers: the device
/// contract does not constrain types, and readings must round-trip through
/// the log without loss.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentReading {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pressure: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub light: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<Value>,
    /// Fields the device sent that are not in the known set.
    #[serde(flatten, default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
    /// Server-assigned arrival time.
    pub timestamp: String,
}

impl SensorReading {
    /// Decode an inbound submission body, stamping it with the arrival time.
    ///
    /// A body that parses as a JSON object becomes an
    /// [`EnvironmentReading`]; anything else - invalid JSON, arrays,
    /// scalars - is preserved verbatim as a [`RawReading`]. Never fails:
    /// a malformed submission is data, not an error.
    pub fn from_payload(body: &str, timestamp: String) -> Self {
        match serde_json::from_str::<Value>(body) {
            Ok(Value::Object(fields)) => {
                SensorReading::Environment(EnvironmentReading::from_fields(fields, timestamp))
            }
            _ => SensorReading::Raw(RawReading {
                raw: body.to_string(),
                timestamp,
            }),
        }
    }

    /// Server-assigned arrival time of this reading.
    pub fn timestamp(&self) -> &str {
        match self {
            SensorReading::Environment(env) => &env.timestamp,
            SensorReading::Raw(raw) => &raw.timestamp,
        }
    }

    /// Look up one of the known semantic fields. `Raw` readings have none.
    pub fn field(&self, field: SensorField) -> Option<&Value> {
        match self {
            SensorReading::Environment(env) => env.field(field),
            SensorReading::Raw(_) => None,
        }
    }

    /// Whether this reading is the undecoded fallback shape.
    pub fn is_raw(&self) -> bool {
        matches!(self, SensorReading::Raw(_))
    }
}

impl EnvironmentReading {
    /// Build a reading from a decoded field mapping.
    ///
    /// The known fields are pulled out by name, everything else lands in
    /// `extra`. The server stamp wins over any client-supplied `timestamp`.
    fn from_fields(mut fields: Map<String, Value>, timestamp: String) -> Self {
        fields.remove("timestamp");

        EnvironmentReading {
            temperature: fields.remove("temperature"),
            humidity: fields.remove("humidity"),
            pressure: fields.remove("pressure"),
            light: fields.remove("light"),
            latitude: fields.remove("latitude"),
            longitude: fields.remove("longitude"),
            extra: fields,
            timestamp,
        }
    }

    /// Look up one of the known semantic fields by name.
    pub fn field(&self, field: SensorField) -> Option<&Value> {
        match field {
            SensorField::Temperature => self.temperature.as_ref(),
            SensorField::Humidity => self.humidity.as_ref(),
            SensorField::Pressure => self.pressure.as_ref(),
            SensorField::Light => self.light.as_ref(),
            SensorField::Latitude => self.latitude.as_ref(),
            SensorField::Longitude => self.longitude.as_ref(),
        }
    }
}
