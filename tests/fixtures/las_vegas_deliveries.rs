//! Real Las Vegas / Henderson delivery addresses for realistic fixtures.
//!
//! Coordinates sourced from OpenStreetMap via Overpass API.
//! These are real, routable locations that work with OSRM Nevada data.

use route_optimizer::{Coordinate, DriverPosition, Stop};

/// A named address with coordinates.
#[derive(Debug, Clone)]
pub struct Address {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl Address {
    pub const fn new(name: &'static str, lat: f64, lng: f64) -> Self {
        Self { name, lat, lng }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

// ============================================================================
// Driver start points (restaurant pickups)
// ============================================================================

pub const PICKUPS: &[Address] = &[
    Address::new("Hard Rock Cafe", 36.1041592, -115.1722166),
    Address::new("Grand Lux Cafe", 36.1216416, -115.1685024),
    Address::new("Roma Pizza", 36.1012461, -115.0753039),
];

// ============================================================================
// Customer drop-offs
// ============================================================================

pub const STRIP_DROPOFFS: &[Address] = &[
    Address::new("Wynn Las Vegas", 36.1263781, -115.1658180),
    Address::new("Encore at Wynn", 36.1289345, -115.1653620),
    Address::new("MGM Grand", 36.1023654, -115.1688720),
    Address::new("Bellagio", 36.1126, -115.1767),
    Address::new("Caesars Palace", 36.1162, -115.1745),
    Address::new("Brooklyn Bowl", 36.1175388, -115.1695094),
    Address::new("Pyramid Cafe", 36.0956586, -115.1761902),
    Address::new("Budget Suites South", 36.0366259, -115.1713361),
];

pub const EAST_DROPOFFS: &[Address] = &[
    Address::new("Longhorn Casino", 36.1070664, -115.0591256),
    Address::new("Sunset Station Area", 36.0614, -115.0631),
    Address::new("Green Valley Ranch Area", 36.0308, -115.0825),
    Address::new("Islander's Grill", 36.0335058, -114.9856162),
    Address::new("Rivas Mexican Grill North", 36.1450055, -115.0482587),
    Address::new("I Love Sushi Henderson", 35.9916660, -115.1028343),
];

pub fn all_dropoffs() -> Vec<Address> {
    let mut all = Vec::with_capacity(STRIP_DROPOFFS.len() + EAST_DROPOFFS.len());
    all.extend_from_slice(STRIP_DROPOFFS);
    all.extend_from_slice(EAST_DROPOFFS);
    all
}

/// Driver waiting at a pickup, clock at 11:00 (seconds from midnight).
pub fn driver_at(pickup: &Address) -> DriverPosition {
    DriverPosition::new("vegas-driver", pickup.coordinate(), 11.0 * 3600.0)
}

/// One stop per drop-off, ids `d00`, `d01`, ...
pub fn dropoff_stops(addresses: &[Address]) -> Vec<Stop> {
    addresses
        .iter()
        .enumerate()
        .map(|(i, address)| Stop::new(format!("d{i:02}"), address.coordinate()).with_service_duration(120.0))
        .collect()
}
