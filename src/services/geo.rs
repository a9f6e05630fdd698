const EARTH_RADIUS_KM: f64 = 6371.0;

/// Centre point and radius for proximity filtering
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoFilter {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: f64,
}

impl GeoFilter {
    /// Only a fully specified filter applies.
    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>, radius_km: Option<f64>) -> Option<Self> {
        Some(Self {
            latitude: latitude?,
            longitude: longitude?,
            radius_km: radius_km?,
        })
    }

    /// Points without both coordinates are never inside.
    pub fn contains(&self, latitude: Option<f64>, longitude: Option<f64>) -> bool {
        match (latitude, longitude) {
            (Some(lat), Some(lon)) => {
                haversine_km(self.latitude, self.longitude, lat, lon) <= self.radius_km
            }
            _ => false,
        }
    }
}

/// Great-circle distance between two points, in kilometres.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_distance_lagos_to_ibadan() {
        let d = haversine_km(6.5244, 3.3792, 7.3775, 3.9470);
        assert!((d - 113.0).abs() < 5.0, "got {d}");
    }

    #[test]
    fn boundary_distance_is_included() {
        let centre = (6.5, 3.3);
        let point = (6.6, 3.3);
        let exact = haversine_km(centre.0, centre.1, point.0, point.1);

        let filter = GeoFilter { latitude: centre.0, longitude: centre.1, radius_km: exact };
        assert!(filter.contains(Some(point.0), Some(point.1)));

        let tighter = GeoFilter { radius_km: exact - 0.001, ..filter };
        assert!(!tighter.contains(Some(point.0), Some(point.1)));
    }

    #[test]
    fn missing_coordinates_are_excluded() {
        let filter = GeoFilter { latitude: 0.0, longitude: 0.0, radius_km: 20_000.0 };
        assert!(!filter.contains(None, Some(1.0)));
        assert!(!filter.contains(Some(1.0), None));
        assert!(filter.contains(Some(1.0), Some(1.0)));
    }

    #[test]
    fn partial_query_disables_the_filter() {
        assert!(GeoFilter::from_parts(Some(1.0), Some(2.0), None).is_none());
        assert!(GeoFilter::from_parts(Some(1.0), Some(2.0), Some(5.0)).is_some());
    }
}
