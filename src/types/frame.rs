//! Decoded telemetry frames

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::{Result, TelemetryError};

/// Speed above which a frame is flagged as an emergency.
pub const EMERGENCY_SPEED: f64 = 100.0;

/// Brake application above which a frame is flagged as an emergency.
pub const EMERGENCY_BRAKE: f64 = 0.9;

/// Vehicle position and heading carried by every frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
#[serde(rename_all = "PascalCase")]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub heading: f64,
}

/// One decoded telemetry message: the vehicle's state at a timestamp.
///
/// Frames are produced by decoding exactly one inbound message and are shared
/// as `Arc<TelemetryFrame>`, so they are never mutated after construction. A
/// newer frame supersedes an older one; no history is kept.
///
/// Scalar units and ranges belong to the producer and are not validated on
/// decode. [`TelemetryFrame::validate`] is available for callers that want
/// the platform's domain checks.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
#[serde(rename_all = "PascalCase")]
pub struct TelemetryFrame {
    /// Producer-assigned capture time, ISO-8601, kept verbatim.
    pub timestamp: String,

    #[serde(rename = "VehicleID")]
    pub vehicle_id: String,

    pub speed: f64,
    pub steering_angle: f64,
    pub throttle: f64,
    pub brake: f64,
    pub gear: i64,
    pub location: Location,

    /// Open-ended producer metadata, passed through unvalidated.
    pub metadata: Map<String, Value>,
}

impl TelemetryFrame {
    /// Decode one complete JSON-encoded frame.
    ///
    /// Accepts both producer shapes: a nested `Location` object, or flat
    /// top-level `Latitude`/`Longitude`/`Heading` fields.
    pub fn decode(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| TelemetryError::decode("telemetry frame", e.to_string()))
    }

    /// Encode the frame in its canonical (nested location) wire shape.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| TelemetryError::decode("frame encoding", e.to_string()))
    }

    /// Parse the capture timestamp as an RFC 3339 instant.
    pub fn captured_at(&self) -> Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(|source| TelemetryError::Timestamp { value: self.timestamp.clone(), source })
    }

    /// Domain validation used by the telemetry service on ingest.
    ///
    /// The client never applies this itself.
    pub fn validate(&self) -> Result<()> {
        if self.vehicle_id.is_empty() {
            return Err(TelemetryError::Validation {
                field: "vehicle id",
                details: "must not be empty".to_string(),
            });
        }
        if self.speed < 0.0 {
            return Err(TelemetryError::Validation {
                field: "speed",
                details: format!("{} is negative", self.speed),
            });
        }
        Ok(())
    }

    /// Whether the frame indicates an emergency (overspeed or hard braking).
    pub fn is_emergency(&self) -> bool {
        self.speed > EMERGENCY_SPEED || self.brake > EMERGENCY_BRAKE
    }
}

/// Inbound wire shape, tolerant of both location layouts.
#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireFrame {
    timestamp: String,
    #[serde(rename = "VehicleID")]
    vehicle_id: String,
    speed: f64,
    steering_angle: f64,
    throttle: f64,
    brake: f64,
    gear: i64,
    location: Option<Location>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    heading: Option<f64>,
    metadata: Option<Map<String, Value>>,
}

impl TryFrom<WireFrame> for TelemetryFrame {
    type Error = String;

    fn try_from(wire: WireFrame) -> std::result::Result<Self, Self::Error> {
        let location = match (wire.location, wire.latitude, wire.longitude, wire.heading) {
            (Some(location), _, _, _) => location,
            (None, Some(latitude), Some(longitude), Some(heading)) => {
                Location { latitude, longitude, heading }
            }
            (None, latitude, longitude, heading) => {
                let missing: Vec<&str> = [
                    ("Latitude", latitude.is_none()),
                    ("Longitude", longitude.is_none()),
                    ("Heading", heading.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, absent)| absent.then_some(name))
                .collect();
                return Err(format!("missing field `Location` (or flat {})", missing.join(", ")));
            }
        };

        Ok(Self {
            timestamp: wire.timestamp,
            vehicle_id: wire.vehicle_id,
            speed: wire.speed,
            steering_angle: wire.steering_angle,
            throttle: wire.throttle,
            brake: wire.brake,
            gear: wire.gear,
            location,
            metadata: wire.metadata.unwrap_or_default(),
        })
    }
}

impl<'de> Deserialize<'de> for TelemetryFrame {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let wire = WireFrame::deserialize(deserializer)?;
        TelemetryFrame::try_from(wire).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    const NESTED: &str = r#"{
        "Timestamp": "2025-01-01T00:00:00Z",
        "VehicleID": "v1",
        "Speed": 12.5,
        "SteeringAngle": -4.25,
        "Throttle": 0.5,
        "Brake": 0.0,
        "Gear": 3,
        "Location": {"Latitude": 35.1, "Longitude": -117.2, "Heading": 90.0},
        "Metadata": {"lap": 4, "driver": "ana"}
    }"#;

    #[test]
    fn decodes_nested_location() {
        let frame = TelemetryFrame::decode(NESTED).unwrap();

        assert_eq!(frame.timestamp, "2025-01-01T00:00:00Z");
        assert_eq!(frame.vehicle_id, "v1");
        assert_eq!(frame.speed, 12.5);
        assert_eq!(frame.steering_angle, -4.25);
        assert_eq!(frame.gear, 3);
        assert_eq!(frame.location, Location { latitude: 35.1, longitude: -117.2, heading: 90.0 });
        assert_eq!(frame.metadata.get("lap"), Some(&json!(4)));
    }

    #[test]
    fn decodes_flat_agent_location() {
        let text = json!({
            "Timestamp": "2025-01-01T00:00:00Z",
            "VehicleID": "test-vehicle",
            "Speed": 64.0,
            "SteeringAngle": 12.0,
            "Throttle": 0.7,
            "Brake": 0.1,
            "Gear": 4,
            "Latitude": 34.5,
            "Longitude": -116.5,
            "Heading": 270.0,
            "Metadata": {}
        })
        .to_string();

        let frame = TelemetryFrame::decode(&text).unwrap();
        assert_eq!(frame.location.latitude, 34.5);
        assert_eq!(frame.location.heading, 270.0);
        assert!(frame.metadata.is_empty());
    }

    #[test]
    fn absent_or_null_metadata_is_empty() {
        let mut value: Value = serde_json::from_str(NESTED).unwrap();
        value["Metadata"] = Value::Null;
        let frame = TelemetryFrame::decode(&value.to_string()).unwrap();
        assert!(frame.metadata.is_empty());

        value.as_object_mut().unwrap().remove("Metadata");
        let frame = TelemetryFrame::decode(&value.to_string()).unwrap();
        assert!(frame.metadata.is_empty());
    }

    #[test]
    fn missing_required_fields_fail() {
        let mut value: Value = serde_json::from_str(NESTED).unwrap();
        value.as_object_mut().unwrap().remove("Speed");
        let err = TelemetryFrame::decode(&value.to_string()).unwrap_err();
        assert!(err.to_string().contains("Speed"), "{err}");

        let mut value: Value = serde_json::from_str(NESTED).unwrap();
        value.as_object_mut().unwrap().remove("Location");
        value["Latitude"] = json!(1.0);
        let err = TelemetryFrame::decode(&value.to_string()).unwrap_err();
        assert!(err.to_string().contains("Longitude"), "{err}");
        assert!(!err.to_string().contains("Latitude,"), "{err}");
    }

    #[test]
    fn malformed_payloads_fail() {
        assert!(TelemetryFrame::decode("not json").is_err());
        assert!(TelemetryFrame::decode("[1, 2, 3]").is_err());
        assert!(TelemetryFrame::decode(&NESTED.replace("\"Gear\": 3", "\"Gear\": 2.5")).is_err());
    }

    #[test]
    fn flat_input_encodes_to_nested_shape() {
        let flat = NESTED.replace(
            r#""Location": {"Latitude": 35.1, "Longitude": -117.2, "Heading": 90.0},"#,
            r#""Latitude": 35.1, "Longitude": -117.2, "Heading": 90.0,"#,
        );
        let frame = TelemetryFrame::decode(&flat).unwrap();

        let encoded: Value = serde_json::from_str(&frame.encode().unwrap()).unwrap();
        assert_eq!(encoded["Location"]["Heading"], json!(90.0));
        assert_eq!(encoded["VehicleID"], json!("v1"));
        assert!(encoded.get("Latitude").is_none());
    }

    #[test]
    fn captured_at_parses_rfc3339() {
        let frame = TelemetryFrame::decode(NESTED).unwrap();
        let ts = frame.captured_at().unwrap();
        assert_eq!(ts.to_rfc3339(), "2025-01-01T00:00:00+00:00");

        let bad = TelemetryFrame { timestamp: "yesterday".to_string(), ..frame };
        assert!(matches!(bad.captured_at(), Err(TelemetryError::Timestamp { .. })));
    }

    #[test]
    fn domain_checks() {
        let frame = TelemetryFrame::decode(NESTED).unwrap();
        assert!(frame.validate().is_ok());
        assert!(!frame.is_emergency());

        let reversing = TelemetryFrame { speed: -1.0, ..frame.clone() };
        assert!(matches!(reversing.validate(), Err(TelemetryError::Validation { field: "speed", .. })));

        let anonymous = TelemetryFrame { vehicle_id: String::new(), ..frame.clone() };
        assert!(anonymous.validate().is_err());

        assert!(TelemetryFrame { speed: 100.5, ..frame.clone() }.is_emergency());
        assert!(TelemetryFrame { brake: 0.95, ..frame }.is_emergency());
    }

    proptest! {
        #[test]
        fn decoded_fields_equal_input_fields(
            vehicle in "[a-z0-9-]{1,16}",
            speed in -1.0e6f64..1.0e6,
            steering in -90.0f64..90.0,
            throttle in 0.0f64..1.0,
            brake in 0.0f64..1.0,
            gear in -1i64..8,
            latitude in -90.0f64..90.0,
            longitude in -180.0f64..180.0,
            heading in 0.0f64..360.0,
            flat in any::<bool>(),
        ) {
            let mut value = json!({
                "Timestamp": "2025-06-01T12:30:00Z",
                "VehicleID": vehicle,
                "Speed": speed,
                "SteeringAngle": steering,
                "Throttle": throttle,
                "Brake": brake,
                "Gear": gear,
                "Metadata": {"source": "proptest"}
            });
            if flat {
                value["Latitude"] = json!(latitude);
                value["Longitude"] = json!(longitude);
                value["Heading"] = json!(heading);
            } else {
                value["Location"] = json!({"Latitude": latitude, "Longitude": longitude, "Heading": heading});
            }

            let frame = TelemetryFrame::decode(&value.to_string()).unwrap();
            prop_assert_eq!(&frame.vehicle_id, &vehicle);
            prop_assert_eq!(frame.speed, speed);
            prop_assert_eq!(frame.steering_angle, steering);
            prop_assert_eq!(frame.throttle, throttle);
            prop_assert_eq!(frame.brake, brake);
            prop_assert_eq!(frame.gear, gear);
            prop_assert_eq!(frame.location, Location { latitude, longitude, heading });
            prop_assert_eq!(frame.metadata.get("source"), Some(&json!("proptest")));
        }
    }
}
