use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DriverStatus {
    Online,
    Offline,
}

impl DriverStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverStatus::Online => "ONLINE",
            DriverStatus::Offline => "OFFLINE",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceRecord {
    pub status: Option<DriverStatus>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub last_seen_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
}

impl PresenceRecord {
    pub fn is_online(&self) -> bool {
        self.status == Some(DriverStatus::Online)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresencePatch {
    pub status: Option<DriverStatus>,
    pub location: Option<GeoPoint>,
    pub speed: Option<f64>,
    pub heading: Option<f64>,
    pub last_seen_ms: i64,
}

impl PresencePatch {
    pub fn apply(self, record: &mut PresenceRecord) {
        if let Some(status) = self.status {
            record.status = Some(status);
        }
        if let Some(location) = self.location {
            record.lat = Some(location.lat);
            record.lng = Some(location.lng);
        }
        if let Some(speed) = self.speed {
            record.speed = Some(speed);
        }
        if let Some(heading) = self.heading {
            record.heading = Some(heading);
        }
        record.last_seen_ms = self.last_seen_ms;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Telemetry {
    pub speed: Option<f64>,
    pub heading: Option<f64>,
    pub ts: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyDriver {
    pub driver_id: String,
    pub distance: f64,
    pub lat: f64,
    pub lng: f64,
    pub last_seen_ms: i64,
}

#[cfg(test)]
mod tests {
    use super::{DriverStatus, GeoPoint, PresencePatch, PresenceRecord};

    #[test]
    fn location_patch_keeps_existing_status() {
        let mut record = PresenceRecord {
            status: Some(DriverStatus::Online),
            last_seen_ms: 1,
            ..PresenceRecord::default()
        };

        PresencePatch {
            location: Some(GeoPoint { lat: 1.0, lng: 2.0 }),
            speed: Some(8.5),
            last_seen_ms: 5,
            ..PresencePatch::default()
        }
        .apply(&mut record);

        assert!(record.is_online());
        assert_eq!(record.lat, Some(1.0));
        assert_eq!(record.lng, Some(2.0));
        assert_eq!(record.speed, Some(8.5));
        assert_eq!(record.heading, None);
        assert_eq!(record.last_seen_ms, 5);
    }

    #[test]
    fn record_without_status_is_not_online() {
        let record = PresenceRecord::default();
        assert!(!record.is_online());
    }
}
