//! Resource kinds, resource hands and building costs.
//!
//! A [`ResourceHand`] is the unit every transfer in the game is expressed
//! in: player hands, the bank, building costs, trade offers and discards.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The five tradeable resource kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Wood,
    Brick,
    Sheep,
    Wheat,
    Ore,
}

impl Resource {
    /// All resource types
    pub const ALL: [Resource; 5] = [
        Resource::Wood,
        Resource::Brick,
        Resource::Sheep,
        Resource::Wheat,
        Resource::Ore,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Resource::Wood => "wood",
            Resource::Brick => "brick",
            Resource::Sheep => "sheep",
            Resource::Wheat => "wheat",
            Resource::Ore => "ore",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A count of cards per resource kind.
///
/// Missing keys deserialize as zero, so `{"ore": 2}` is a valid hand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceHand {
    pub wood: u32,
    pub brick: u32,
    pub sheep: u32,
    pub wheat: u32,
    pub ore: u32,
}

impl ResourceHand {
    /// Create an empty hand
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a hand with specific amounts
    pub fn with_amounts(wood: u32, brick: u32, sheep: u32, wheat: u32, ore: u32) -> Self {
        Self {
            wood,
            brick,
            sheep,
            wheat,
            ore,
        }
    }

    /// The same amount of every kind
    pub fn uniform(amount: u32) -> Self {
        Self::with_amounts(amount, amount, amount, amount, amount)
    }

    /// Create a hand with a single resource
    pub fn single(resource: Resource, amount: u32) -> Self {
        let mut hand = Self::new();
        hand.add(resource, amount);
        hand
    }

    /// Total number of resource cards. Saturates; use [`checked_total`]
    /// on hands that came off the wire.
    ///
    /// [`checked_total`]: ResourceHand::checked_total
    pub fn total(&self) -> u32 {
        self.checked_total().unwrap_or(u32::MAX)
    }

    /// Total number of resource cards, `None` if it does not fit a `u32`
    pub fn checked_total(&self) -> Option<u32> {
        Resource::ALL
            .iter()
            .try_fold(0u32, |sum, &r| sum.checked_add(self.get(r)))
    }

    pub fn is_empty(&self) -> bool {
        Resource::ALL.iter().all(|&r| self.get(r) == 0)
    }

    /// Get count of a specific resource
    pub fn get(&self, resource: Resource) -> u32 {
        match resource {
            Resource::Wood => self.wood,
            Resource::Brick => self.brick,
            Resource::Sheep => self.sheep,
            Resource::Wheat => self.wheat,
            Resource::Ore => self.ore,
        }
    }

    fn slot_mut(&mut self, resource: Resource) -> &mut u32 {
        match resource {
            Resource::Wood => &mut self.wood,
            Resource::Brick => &mut self.brick,
            Resource::Sheep => &mut self.sheep,
            Resource::Wheat => &mut self.wheat,
            Resource::Ore => &mut self.ore,
        }
    }

    /// Set count of a specific resource
    pub fn set(&mut self, resource: Resource, count: u32) {
        *self.slot_mut(resource) = count;
    }

    pub fn add(&mut self, resource: Resource, amount: u32) {
        *self.slot_mut(resource) += amount;
    }

    /// Add another hand to this one
    pub fn add_hand(&mut self, other: &ResourceHand) {
        for (resource, amount) in other.iter() {
            self.add(resource, amount);
        }
    }

    /// Check if this hand covers `cost`
    pub fn can_afford(&self, cost: &ResourceHand) -> bool {
        Resource::ALL
            .iter()
            .all(|&r| self.get(r) >= cost.get(r))
    }

    /// Try to subtract, returning false (and leaving the hand untouched) if
    /// insufficient
    pub fn try_subtract(&mut self, cost: &ResourceHand) -> bool {
        if !self.can_afford(cost) {
            return false;
        }
        for (resource, amount) in cost.iter() {
            *self.slot_mut(resource) -= amount;
        }
        true
    }

    /// True if some kind appears with a nonzero count in both hands
    pub fn overlaps(&self, other: &ResourceHand) -> bool {
        Resource::ALL
            .iter()
            .any(|&r| self.get(r) > 0 && other.get(r) > 0)
    }

    /// Iterate over the kinds with a nonzero count
    pub fn iter(&self) -> impl Iterator<Item = (Resource, u32)> + '_ {
        Resource::ALL
            .into_iter()
            .map(|r| (r, self.get(r)))
            .filter(|&(_, n)| n > 0)
    }

    /// Pick one card at random, weighted by the hand's composition.
    /// Does not remove it.
    pub fn pick_weighted<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Resource> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        let mut index = rng.gen_range(0..total);
        for (resource, amount) in self.iter() {
            if index < amount {
                return Some(resource);
            }
            index -= amount;
        }
        None
    }
}

impl FromIterator<Resource> for ResourceHand {
    fn from_iter<I: IntoIterator<Item = Resource>>(iter: I) -> Self {
        let mut hand = Self::new();
        for resource in iter {
            hand.add(resource, 1);
        }
        hand
    }
}

/// Building costs
pub mod costs {
    use super::ResourceHand;

    /// 1 brick, 1 wood
    pub fn road() -> ResourceHand {
        ResourceHand::with_amounts(1, 1, 0, 0, 0)
    }

    /// 1 each of brick, wood, sheep, wheat
    pub fn settlement() -> ResourceHand {
        ResourceHand::with_amounts(1, 1, 1, 1, 0)
    }

    /// 3 ore, 2 wheat
    pub fn city() -> ResourceHand {
        ResourceHand::with_amounts(0, 0, 0, 2, 3)
    }

    /// 1 each of sheep, wheat, ore
    pub fn development_card() -> ResourceHand {
        ResourceHand::with_amounts(0, 0, 1, 1, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_resource_hand_total() {
        let hand = ResourceHand::with_amounts(1, 2, 3, 4, 5);
        assert_eq!(hand.total(), 15);
    }

    #[test]
    fn test_checked_total_overflow() {
        let hand = ResourceHand::with_amounts(u32::MAX, 5, 0, 0, 0);
        assert_eq!(hand.checked_total(), None);
        assert_eq!(hand.total(), u32::MAX);
        assert!(!hand.is_empty());
    }

    #[test]
    fn test_resource_hand_can_afford() {
        let hand = ResourceHand::uniform(2);
        assert!(hand.can_afford(&ResourceHand::uniform(1)));
        assert!(!hand.can_afford(&ResourceHand::single(Resource::Brick, 3)));
    }

    #[test]
    fn test_try_subtract_leaves_hand_untouched_on_failure() {
        let mut hand = ResourceHand::with_amounts(1, 0, 0, 0, 0);
        assert!(!hand.try_subtract(&costs::road()));
        assert_eq!(hand, ResourceHand::with_amounts(1, 0, 0, 0, 0));

        hand.add(Resource::Brick, 1);
        assert!(hand.try_subtract(&costs::road()));
        assert!(hand.is_empty());
    }

    #[test]
    fn test_building_costs() {
        assert_eq!(costs::road().total(), 2);
        assert_eq!(costs::settlement().total(), 4);
        assert_eq!(costs::city().total(), 5);
        assert_eq!(costs::city().ore, 3);
        assert_eq!(costs::development_card().total(), 3);
    }

    #[test]
    fn test_missing_keys_deserialize_as_zero() {
        let hand: ResourceHand = serde_json::from_str(r#"{"ore": 2}"#).unwrap();
        assert_eq!(hand, ResourceHand::single(Resource::Ore, 2));
    }

    #[test]
    fn test_overlaps() {
        let a = ResourceHand::single(Resource::Ore, 2);
        assert!(a.overlaps(&ResourceHand::with_amounts(0, 0, 1, 0, 1)));
        assert!(!a.overlaps(&ResourceHand::single(Resource::Sheep, 1)));
    }

    #[test]
    fn test_pick_weighted_only_returns_held_kinds() {
        let hand = ResourceHand::with_amounts(0, 0, 0, 3, 1);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let picked = hand.pick_weighted(&mut rng).unwrap();
            assert!(matches!(picked, Resource::Wheat | Resource::Ore));
        }
        assert_eq!(ResourceHand::new().pick_weighted(&mut rng), None);
    }
}
