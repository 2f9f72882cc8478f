use serde::{Deserialize, Serialize};

pub const DRIVER_LOCATION_EVENT: &str = "driver.location";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationEvent {
    pub event: String,
    pub driver_id: String,
    pub lat: f64,
    pub lng: f64,
    pub speed: Option<f64>,
    pub heading: Option<f64>,
    pub ts: i64,
}

impl LocationEvent {
    pub fn driver_location(
        driver_id: &str,
        lat: f64,
        lng: f64,
        speed: Option<f64>,
        heading: Option<f64>,
        ts: i64,
    ) -> Self {
        Self {
            event: DRIVER_LOCATION_EVENT.to_string(),
            driver_id: driver_id.to_string(),
            lat,
            lng,
            speed,
            heading,
            ts,
        }
    }
}
