//! walkreach core
//!
//! Walking-network proximity from geocoded addresses to categorized
//! destinations: straight-line prefiltering, entry points for areas, parallel
//! foot routing and distance-band aggregation.

pub mod error;
pub mod model;
pub mod traits;
pub mod haversine;
pub mod projection;
pub mod candidates;
pub mod entry_point;
pub mod polyline;
pub mod routing;
pub mod ors;
pub mod orchestrator;
pub mod med_centers;
pub mod dataset;
