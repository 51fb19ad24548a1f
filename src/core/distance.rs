/// Earth's radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points in kilometers (haversine)
///
/// Coordinates are degrees; callers validate ranges. Pure and deterministic.
#[inline]
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Distance lifted over optional coordinates
///
/// Donor and patient locations are free text with coordinates attached only
/// when geocoding succeeded; a missing side yields `None`, which ranks last
/// but is never excluded by radius.
#[inline]
pub fn distance_between(origin: Option<(f64, f64)>, target: Option<(f64, f64)>) -> Option<f64> {
    match (origin, target) {
        (Some((lat1, lon1)), Some((lat2, lon2))) => {
            Some(haversine_distance(lat1, lon1, lat2, lon2))
        }
        _ => None,
    }
}

/// Geospatial bounding box for candidate pre-filtering
#[derive(Debug, Clone, Copy)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

/// Bounding box around a center point
///
/// Much cheaper than haversine for pre-filtering the candidate pull from the
/// profile service. 1° latitude ≈ 111 km, 1° longitude ≈ 111 km · cos(lat).
pub fn calculate_bounding_box(lat: f64, lon: f64, radius_km: f64) -> BoundingBox {
    let lat_delta = radius_km / 111.0;
    let lon_delta = radius_km / (111.0 * lat.to_radians().cos().abs());

    BoundingBox {
        min_lat: lat - lat_delta,
        max_lat: lat + lat_delta,
        min_lon: lon - lon_delta,
        max_lon: lon + lon_delta,
    }
}

/// Check if a point is within a bounding box
#[inline]
pub fn is_within_bounding_box(lat: f64, lon: f64, bbox: &BoundingBox) -> bool {
    lat >= bbox.min_lat && lat <= bbox.max_lat && lon >= bbox.min_lon && lon <= bbox.max_lon
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_zero_distance() {
        let d = haversine_distance(12.9716, 77.5946, 12.9716, 77.5946);
        assert!(d < 0.01);
    }

    #[test]
    fn test_haversine_chennai_to_bengaluru() {
        // Chennai to Bengaluru is approximately 290 km
        let d = haversine_distance(13.0827, 80.2707, 12.9716, 77.5946);
        assert!((d - 290.0).abs() < 15.0, "expected ~290km, got {}", d);
    }

    #[test]
    fn test_distance_between_requires_both_sides() {
        assert!(distance_between(Some((13.0, 80.2)), None).is_none());
        assert!(distance_between(None, Some((13.0, 80.2))).is_none());

        let d = distance_between(Some((13.0827, 80.2707)), Some((12.9716, 77.5946)));
        assert!(d.unwrap() > 250.0);
    }

    #[test]
    fn test_bounding_box_spans_center() {
        let bbox = calculate_bounding_box(13.0827, 80.2707, 10.0);

        assert!(bbox.min_lat < 13.0827);
        assert!(bbox.max_lat > 13.0827);
        assert!(bbox.min_lon < 80.2707);
        assert!(bbox.max_lon > 80.2707);

        // 20km span / 111km per degree = ~0.18 degrees of latitude
        let lat_span = bbox.max_lat - bbox.min_lat;
        assert!((lat_span - 0.18).abs() < 0.02);
    }

    #[test]
    fn test_point_within_bbox() {
        let bbox = calculate_bounding_box(13.0827, 80.2707, 10.0);

        assert!(is_within_bounding_box(13.0827, 80.2707, &bbox));
        assert!(is_within_bounding_box(13.08, 80.27, &bbox));
        assert!(!is_within_bounding_box(19.0760, 72.8777, &bbox));
        assert!(!is_within_bounding_box(bbox.max_lat + 0.01, 80.27, &bbox));
    }
}
