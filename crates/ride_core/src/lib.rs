//! Campus ride-hailing core: fares, request records, the request lifecycle with
//! simulated matching, route distances and best-effort AI travel-time estimates.

pub mod clock;
pub mod config;
pub mod eta;
pub mod geo;
pub mod lifecycle;
pub mod planner;
pub mod pricing;
pub mod request;
pub mod routing;
pub mod store;
pub mod zones;

#[cfg(feature = "test-helpers")]
pub mod test_helpers;
