//! Campus zones and the named destination table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::Coordinates;

/// Coarse pickup/destination classification used when no route distance exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    Main,
    Annex,
    Outside,
}

impl Zone {
    pub const ALL: [Zone; 3] = [Zone::Main, Zone::Annex, Zone::Outside];

    pub fn key(self) -> &'static str {
        match self {
            Zone::Main => "main",
            Zone::Annex => "annex",
            Zone::Outside => "outside",
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown zone '{0}' (expected main, annex or outside)")]
pub struct UnknownZone(pub String);

impl FromStr for Zone {
    type Err = UnknownZone;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Zone::ALL
            .into_iter()
            .find(|zone| zone.key().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| UnknownZone(value.to_string()))
    }
}

/// A named destination a rider can route to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Destination {
    pub zone: Zone,
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl Destination {
    pub fn coordinates(&self) -> Option<Coordinates> {
        Coordinates::new(self.lat, self.lng).ok()
    }
}

/// Destinations with known coordinates. `Outside` has no entry.
pub const DESTINATIONS: [Destination; 2] = [
    Destination {
        zone: Zone::Main,
        name: "Gordon College Main Campus",
        lat: 14.8324,
        lng: 120.2833,
    },
    Destination {
        zone: Zone::Annex,
        name: "Gordon College ANNEX Campus",
        lat: 14.8372648,
        lng: 120.2798648,
    },
];

pub fn destination_for(zone: Zone) -> Option<&'static Destination> {
    DESTINATIONS.iter().find(|destination| destination.zone == zone)
}

/// Reverse lookup from a destination name back to its table entry.
pub fn destination_named(name: &str) -> Option<&'static Destination> {
    DESTINATIONS
        .iter()
        .find(|destination| destination.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_zone_keys_case_insensitively() {
        assert_eq!("annex".parse::<Zone>(), Ok(Zone::Annex));
        assert_eq!(" MAIN ".parse::<Zone>(), Ok(Zone::Main));
        assert!("downtown".parse::<Zone>().is_err());
    }

    #[test]
    fn outside_has_no_destination_entry() {
        assert!(destination_for(Zone::Outside).is_none());
        let annex = destination_for(Zone::Annex).expect("annex entry");
        assert_eq!(annex.name, "Gordon College ANNEX Campus");
        assert!(annex.coordinates().is_some());
        assert_eq!(destination_named(annex.name), Some(annex));
    }
}
