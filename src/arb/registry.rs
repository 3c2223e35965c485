//! Append-only arena of registered venues, addressed by stable index.
use super::error::EngineError;
use super::types::VenueIndex;
use super::venue::Venue;

/// Ordered list of venues. Indices are never reused or compacted.
#[derive(Debug, Default, Clone)]
pub struct VenueRegistry {
    /// Registered venues, in registration order
    venues: Vec<Venue>,
}

impl VenueRegistry {
    /// Creates an empty registry
    #[must_use]
    pub const fn new() -> Self {
        Self { venues: Vec::new() }
    }

    /// Appends `venue` and returns its index, which equals the previous length.
    /// The same handle may be registered more than once.
    pub fn push(&mut self, venue: Venue) -> VenueIndex {
        self.venues.push(venue);
        self.venues.len() - 1
    }

    /// Resolves `index`
    ///
    /// # Errors
    /// * [`EngineError::InvalidVenue`] if `index` is out of range
    pub fn get(&self, index: VenueIndex) -> Result<&Venue, EngineError> {
        self.venues.get(index).ok_or(EngineError::InvalidVenue {
            index,
            count: self.venues.len(),
        })
    }

    /// Number of registered venues
    #[must_use]
    pub fn len(&self) -> usize {
        self.venues.len()
    }

    /// Whether no venue has been registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.venues.is_empty()
    }

    /// Registered venues in index order
    pub fn iter(&self) -> impl Iterator<Item = &Venue> {
        self.venues.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::arb::test_helpers::{addr, fixed_rate_venue};

    #[test]
    fn test_push_returns_previous_length() {
        let mut registry = VenueRegistry::new();
        assert!(registry.is_empty());
        for expected in 0..3 {
            let venue = Venue::new(fixed_rate_venue("R1", 100), format!("DEX{expected}"));
            assert_eq!(registry.push(venue), expected);
            assert_eq!(registry.len(), expected + 1);
        }
    }

    #[test]
    fn test_duplicate_handles_get_distinct_indices() {
        let mut registry = VenueRegistry::new();
        let router = fixed_rate_venue("R1", 100);
        let first = registry.push(Venue::new(router.clone(), "MaliciousDEX"));
        let second = registry.push(Venue::new(router, "MaliciousDEX2"));

        assert_ne!(first, second);
        assert_eq!(registry.get(first).unwrap().handle(), addr("R1"));
        assert_eq!(registry.get(second).unwrap().handle(), addr("R1"));
        assert_eq!(registry.get(second).unwrap().label(), "MaliciousDEX2");
    }

    #[test]
    fn test_get_out_of_range() {
        let mut registry = VenueRegistry::new();
        registry.push(Venue::new(fixed_rate_venue("R1", 100), "DEX1"));
        assert!(matches!(
            registry.get(1),
            Err(EngineError::InvalidVenue { index: 1, count: 1 })
        ));
    }
}
