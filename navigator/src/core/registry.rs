//! Read-only registry of named locations.

use std::collections::HashMap;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::core::geometry::Point;

/// A named point of interest that can be used as a navigation target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub position: Point,
}

impl Location {
    pub fn new(name: impl Into<String>, position: Point) -> Self {
        Self {
            name: name.into(),
            position,
        }
    }
}

/// Immutable name → location mapping.
///
/// Insertion order is kept because it is the order locations are presented to
/// the model and printed by the CLI.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationRegistry {
    locations: Vec<Location>,
    index: HashMap<String, usize>,
}

impl LocationRegistry {
    /// Build a registry, rejecting blank or duplicate names and non-finite
    /// coordinates.
    pub fn new(locations: Vec<Location>) -> Result<Self> {
        let mut index = HashMap::with_capacity(locations.len());
        for (idx, location) in locations.iter().enumerate() {
            if location.name.trim().is_empty() {
                bail!("location #{idx} has an empty name");
            }
            if !location.position.is_finite() {
                bail!("location {} has non-finite coordinates", location.name);
            }
            if index.insert(location.name.clone(), idx).is_some() {
                bail!("duplicate location name {}", location.name);
            }
        }
        Ok(Self { locations, index })
    }

    pub fn get(&self, name: &str) -> Option<&Location> {
        self.index.get(name).map(|&idx| &self.locations[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Location names in registry order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.locations.iter().map(|location| location.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Location> {
        self.locations.iter()
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Distance from `from` to the named location, if registered.
    pub fn distance_from(&self, from: Point, name: &str) -> Option<f64> {
        self.get(name).map(|location| from.distance_to(location.position))
    }
}

/// The six-room house layout used when no locations are configured.
pub fn default_locations() -> Vec<Location> {
    vec![
        Location::new("Kitchen", Point::new(2.0, 1.5)),
        Location::new("LivingRoom", Point::new(-2.0, 1.5)),
        Location::new("Bedroom", Point::new(-3.0, -2.0)),
        Location::new("Bathroom", Point::new(1.0, -2.0)),
        Location::new("Office", Point::new(3.0, 3.0)),
        Location::new("DiningRoom", Point::new(0.0, 1.0)),
    ]
}
