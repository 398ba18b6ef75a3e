//! Fare calculation from route distance or campus zone.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::zones::Zone;

/// Minimum fare for any route-priced trip, in pesos.
pub const MIN_FARE: f64 = 50.0;

/// Per-kilometer rate in pesos.
pub const RATE_PER_KM: f64 = 15.0;

/// Base fare for zone-priced trips, in pesos.
pub const BASE_FARE: f64 = 50.0;

pub const CURRENCY_SYMBOL: &str = "₱";

/// Fare amount. Full precision is kept; rounding to two decimals happens on formatting.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Fare(f64);

impl Fare {
    pub fn amount(self) -> f64 {
        self.0
    }

    /// Bare two-decimal form stored in request records (`"80.00"`).
    pub fn to_fixed(self) -> String {
        format!("{:.2}", self.0)
    }
}

impl fmt::Display for Fare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{CURRENCY_SYMBOL}{:.2}", self.0)
    }
}

impl Serialize for Fare {
    fn serialize<S: Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&self.to_fixed())
    }
}

impl<'de> Deserialize<'de> for Fare {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(de)?;
        let trimmed = raw.trim();
        let digits = trimmed.strip_prefix(CURRENCY_SYMBOL).unwrap_or(trimmed);
        let amount: f64 = digits
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid fare '{raw}'")))?;
        if !amount.is_finite() || amount < 0.0 {
            return Err(serde::de::Error::custom(format!("invalid fare '{raw}'")));
        }
        Ok(Fare(amount))
    }
}

/// Which formula produced a fare.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FareBasis {
    Route { distance_km: f64 },
    Zone(Zone),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FareQuote {
    pub fare: Fare,
    pub basis: FareBasis,
}

/// Fare constants. `Default` carries the campus tariff.
#[derive(Debug, Clone, PartialEq)]
pub struct FareSchedule {
    pub min_fare: f64,
    pub rate_per_km: f64,
    pub base_fare: f64,
    pub main_surcharge: f64,
    pub annex_surcharge: f64,
    // TODO: confirm with operations whether trips outside campus should carry a surcharge.
    pub outside_surcharge: f64,
}

impl Default for FareSchedule {
    fn default() -> Self {
        Self {
            min_fare: MIN_FARE,
            rate_per_km: RATE_PER_KM,
            base_fare: BASE_FARE,
            main_surcharge: 0.0,
            annex_surcharge: 20.0,
            outside_surcharge: 0.0,
        }
    }
}

impl FareSchedule {
    pub fn zone_surcharge(&self, zone: Zone) -> f64 {
        match zone {
            Zone::Main => self.main_surcharge,
            Zone::Annex => self.annex_surcharge,
            Zone::Outside => self.outside_surcharge,
        }
    }

    /// Distance-priced fare, or `None` when the distance is negative or non-finite.
    pub fn route_fare(&self, distance_km: f64) -> Option<Fare> {
        if !distance_km.is_finite() || distance_km < 0.0 {
            return None;
        }
        let fare = (self.min_fare + distance_km * self.rate_per_km).max(self.min_fare);
        Some(Fare(fare))
    }

    pub fn zone_fare(&self, zone: Zone) -> Fare {
        Fare(self.base_fare + self.zone_surcharge(zone))
    }

    /// Price a trip. A valid route distance wins; otherwise the zone formula applies.
    pub fn quote(&self, distance_km: Option<f64>, zone: Zone) -> FareQuote {
        if let Some(distance_km) = distance_km {
            if let Some(fare) = self.route_fare(distance_km) {
                return FareQuote {
                    fare,
                    basis: FareBasis::Route { distance_km },
                };
            }
            tracing::warn!(
                distance_km,
                zone = %zone,
                "invalid route distance, falling back to zone fare"
            );
        }
        FareQuote {
            fare: self.zone_fare(zone),
            basis: FareBasis::Zone(zone),
        }
    }
}

/// Price a trip with the default campus tariff.
pub fn compute_fare(distance_km: Option<f64>, zone: Zone) -> FareQuote {
    FareSchedule::default().quote(distance_km, zone)
}
