//! Brandenburg an der Havel locations for realistic test fixtures.
//!
//! Coordinates are approximate (rounded to about ten meters) and inside UTM
//! zone 33 north.

use walkreach::model::GeoPoint;

/// A named location with coordinates.
#[derive(Debug, Clone)]
pub struct Location {
    pub name: &'static str,
    pub lat: f64,
    pub lon: f64,
}

impl Location {
    pub const fn new(name: &'static str, lat: f64, lon: f64) -> Self {
        Self { name, lat, lon }
    }

    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon).expect("fixture coordinates are valid")
    }
}

// ============================================================================
// Residential addresses
// ============================================================================

pub const ADDRESSES: &[Location] = &[
    Location::new("Hauptstraße 30", 52.4110, 12.5530),
    Location::new("Steinstraße 12", 52.4089, 12.5588),
    Location::new("Ritterstraße 5", 52.4139, 12.5489),
    Location::new("Kurstraße 40", 52.4168, 12.5452),
    Location::new("Bahnhofstraße 3", 52.4030, 12.5545),
];

// ============================================================================
// Shops and pharmacies
// ============================================================================

pub const SHOPS: &[Location] = &[
    Location::new("Neustädtischer Markt", 52.4086, 12.5578),
    Location::new("Altstädtischer Markt", 52.4128, 12.5465),
    Location::new("Sankt-Annen-Galerie", 52.4074, 12.5565),
    Location::new("Hauptbahnhof", 52.4010, 12.5536),
];

pub const PHARMACIES: &[Location] = &[
    Location::new("Apotheke am Neustädtischen Markt", 52.4087, 12.5575),
    Location::new("Dom-Apotheke", 52.4152, 12.5610),
];

/// Somewhere far outside the city, beyond any sensible candidate radius.
pub const POTSDAM: Location = Location::new("Potsdam Hauptbahnhof", 52.3917, 13.0666);

pub fn all_addresses() -> Vec<GeoPoint> {
    ADDRESSES.iter().map(Location::point).collect()
}

pub fn all_shops() -> Vec<GeoPoint> {
    SHOPS.iter().map(Location::point).collect()
}
