use serde::{Deserialize, Serialize};

const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Builds coordinates from a pair of nullable columns; both halves must be present.
    pub fn from_parts(lat: Option<f64>, lng: Option<f64>) -> Option<Self> {
        Some(Self::new(lat?, lng?))
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }

    /// Great-circle distance in kilometers (Haversine).
    pub fn distance_km(&self, other: &Coordinates) -> f64 {
        let lat1_rad = self.lat.to_radians();
        let lat2_rad = other.lat.to_radians();
        let delta_lat = (other.lat - self.lat).to_radians();
        let delta_lng = (other.lng - self.lng).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();

        EARTH_RADIUS_KM * c
    }

    pub fn is_within(&self, center: &Coordinates, radius_km: f64) -> bool {
        self.distance_km(center) <= radius_km
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KAMPALA: Coordinates = Coordinates { lat: 0.3476, lng: 32.5825 };
    const ENTEBBE: Coordinates = Coordinates { lat: 0.0512, lng: 32.4637 };

    #[test]
    fn test_distance_kampala_entebbe() {
        let distance = KAMPALA.distance_km(&ENTEBBE);
        // Roughly 35 km as the crow flies
        assert!(distance > 30.0 && distance < 40.0);
    }

    #[test]
    fn test_within_radius() {
        let nearby = Coordinates::new(0.35, 32.59);
        assert!(nearby.is_within(&KAMPALA, 5.0));
        assert!(!ENTEBBE.is_within(&KAMPALA, 5.0));
    }

    #[test]
    fn test_from_parts_requires_both_halves() {
        assert_eq!(Coordinates::from_parts(Some(0.3), None), None);
        assert!(Coordinates::from_parts(Some(0.3), Some(32.5)).is_some());
    }

    #[test]
    fn test_validity_bounds() {
        assert!(KAMPALA.is_valid());
        assert!(!Coordinates::new(91.0, 0.0).is_valid());
        assert!(!Coordinates::new(0.0, -181.0).is_valid());
    }
}
