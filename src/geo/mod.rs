use crate::models::presence::GeoPoint;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

pub fn haversine_m(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let sin_lat = (delta_lat / 2.0).sin();
    let sin_lng = (delta_lng / 2.0).sin();

    let haversine = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lng * sin_lng;
    let central_angle = 2.0 * haversine.sqrt().min(1.0).asin();

    EARTH_RADIUS_M * central_angle
}

pub fn is_valid_coordinate(lat: f64, lng: f64) -> bool {
    lat.is_finite()
        && lng.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lng)
}

#[cfg(test)]
mod tests {
    use super::{haversine_m, is_valid_coordinate};
    use crate::models::presence::GeoPoint;

    #[test]
    fn zero_distance_for_same_point() {
        let p = GeoPoint {
            lat: 10.7769,
            lng: 106.7009,
        };
        let distance = haversine_m(&p, &p);
        assert!(distance < 1e-6);
    }

    #[test]
    fn london_to_paris_is_around_343_km() {
        let london = GeoPoint {
            lat: 51.5074,
            lng: -0.1278,
        };
        let paris = GeoPoint {
            lat: 48.8566,
            lng: 2.3522,
        };
        let distance = haversine_m(&london, &paris);
        assert!((distance - 343_000.0).abs() < 5_000.0);
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert!(is_valid_coordinate(0.0, 0.0));
        assert!(!is_valid_coordinate(90.5, 0.0));
        assert!(!is_valid_coordinate(0.0, -180.1));
        assert!(!is_valid_coordinate(f64::NAN, 0.0));
    }
}
