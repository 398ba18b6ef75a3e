//! Geographic coordinates and great-circle distance.

use h3o::LatLng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("invalid coordinates ({lat}, {lng})")]
pub struct InvalidCoordinates {
    pub lat: f64,
    pub lng: f64,
}

/// A validated WGS84 point in degrees, serialized as `{ "lat": .., "lng": .. }`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinates")]
pub struct Coordinates {
    lat: f64,
    lng: f64,
}

#[derive(Deserialize)]
struct RawCoordinates {
    lat: f64,
    lng: f64,
}

impl TryFrom<RawCoordinates> for Coordinates {
    type Error = InvalidCoordinates;

    fn try_from(raw: RawCoordinates) -> Result<Self, Self::Error> {
        Coordinates::new(raw.lat, raw.lng)
    }
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Result<Self, InvalidCoordinates> {
        let invalid = InvalidCoordinates { lat, lng };
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err(invalid);
        }
        LatLng::new(lat, lng).map_err(|_| invalid)?;
        Ok(Self { lat, lng })
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lng(&self) -> f64 {
        self.lng
    }

    /// Origin label used in ETA prompts and requests: `"<lat>, <lng>"`.
    pub fn label(&self) -> String {
        format!("{}, {}", self.lat, self.lng)
    }

    pub(crate) fn to_lat_lng(self) -> Option<LatLng> {
        LatLng::new(self.lat, self.lng).ok()
    }
}

/// Haversine distance between two points in kilometres.
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let (Some(a), Some(b)) = (a.to_lat_lng(), b.to_lat_lng()) else {
        return 0.0;
    };
    let (lat1, lon1) = (a.lat().to_radians(), a.lng().to_radians());
    let (lat2, lon2) = (b.lat().to_radians(), b.lng().to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let sin_dlat = (dlat * 0.5).sin();
    let sin_dlon = (dlon * 0.5).sin();
    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_and_non_finite() {
        assert!(Coordinates::new(91.0, 0.0).is_err());
        assert!(Coordinates::new(0.0, -180.5).is_err());
        assert!(Coordinates::new(f64::NAN, 120.0).is_err());
        assert!(Coordinates::new(14.83, f64::INFINITY).is_err());
        assert!(Coordinates::new(14.83, 120.28).is_ok());
    }

    #[test]
    fn label_joins_lat_and_lng() {
        let point = Coordinates::new(14.83, 120.28).expect("coords");
        assert_eq!(point.label(), "14.83, 120.28");
    }

    #[test]
    fn haversine_between_campuses_is_short() {
        let main = Coordinates::new(14.8324, 120.2833).expect("main");
        let annex = Coordinates::new(14.8372648, 120.2798648).expect("annex");
        let distance = haversine_km(main, annex);
        assert!(distance > 0.5 && distance < 0.8, "got {distance}");
        assert_eq!(haversine_km(main, main), 0.0);
    }

    #[test]
    fn deserialization_validates_range() {
        let ok: Coordinates = serde_json::from_str(r#"{"lat":14.83,"lng":120.28}"#).expect("ok");
        assert_eq!(ok.lat(), 14.83);
        let bad = serde_json::from_str::<Coordinates>(r#"{"lat":140.0,"lng":120.28}"#);
        assert!(bad.is_err());
    }
}
