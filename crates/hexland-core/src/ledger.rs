//! Bank and player hands.
//!
//! Every card is either in the bank or in exactly one hand. All movements go
//! through the methods here, each of which either completes or changes
//! nothing.

use crate::error::ActionError;
use crate::player::PlayerId;
use crate::resources::{Resource, ResourceHand};
use serde::{Deserialize, Serialize};

/// Cards of each kind in the whole game
pub const SUPPLY_PER_RESOURCE: u32 = 19;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLedger {
    bank: ResourceHand,
    hands: Vec<ResourceHand>,
}

impl ResourceLedger {
    /// Full bank, empty hands
    pub fn new(player_count: usize) -> Self {
        Self {
            bank: ResourceHand::uniform(SUPPLY_PER_RESOURCE),
            hands: vec![ResourceHand::new(); player_count],
        }
    }

    pub fn bank(&self) -> &ResourceHand {
        &self.bank
    }

    pub fn hand(&self, player: PlayerId) -> ResourceHand {
        self.hands.get(player.index()).copied().unwrap_or_default()
    }

    fn hand_mut(&mut self, player: PlayerId) -> Result<&mut ResourceHand, ActionError> {
        self.hands
            .get_mut(player.index())
            .ok_or(ActionError::InvalidTarget("unknown player"))
    }

    /// Move `cost` from the player's hand into the bank
    pub fn pay(&mut self, player: PlayerId, cost: &ResourceHand) -> Result<(), ActionError> {
        let hand = self.hand_mut(player)?;
        if !hand.try_subtract(cost) {
            return Err(ActionError::InsufficientResources(
                "hand does not cover the cost",
            ));
        }
        self.bank.add_hand(cost);
        Ok(())
    }

    /// Move `amount` from the bank into the player's hand
    pub fn grant(&mut self, player: PlayerId, amount: &ResourceHand) -> Result<(), ActionError> {
        if !self.bank.can_afford(amount) {
            return Err(ActionError::BankShortage("bank does not hold enough"));
        }
        self.hand_mut(player)?.add_hand(amount);
        self.bank.try_subtract(amount);
        Ok(())
    }

    /// Move cards between two hands
    pub fn transfer(
        &mut self,
        from: PlayerId,
        to: PlayerId,
        amount: &ResourceHand,
    ) -> Result<(), ActionError> {
        self.hand_mut(to)?;
        if !self.hand_mut(from)?.try_subtract(amount) {
            return Err(ActionError::InsufficientResources(
                "hand does not hold the cards to give",
            ));
        }
        self.hand_mut(to)?.add_hand(amount);
        Ok(())
    }

    /// Swap `give` (hand to bank) for `take` (bank to hand) in one step
    pub fn exchange_with_bank(
        &mut self,
        player: PlayerId,
        give: &ResourceHand,
        take: &ResourceHand,
    ) -> Result<(), ActionError> {
        if !self.hand(player).can_afford(give) {
            return Err(ActionError::InsufficientResources(
                "hand does not hold the offered cards",
            ));
        }
        if !self.bank.can_afford(take) {
            return Err(ActionError::BankShortage(
                "bank does not hold the requested cards",
            ));
        }
        self.pay(player, give)?;
        self.grant(player, take)
    }

    /// Swap cards between two hands in one step
    pub fn swap(
        &mut self,
        a: PlayerId,
        a_gives: &ResourceHand,
        b: PlayerId,
        b_gives: &ResourceHand,
    ) -> Result<(), ActionError> {
        if !self.hand(a).can_afford(a_gives) || !self.hand(b).can_afford(b_gives) {
            return Err(ActionError::InsufficientResources(
                "a trader no longer holds the cards",
            ));
        }
        self.transfer(a, b, a_gives)?;
        self.transfer(b, a, b_gives)
    }

    /// Sum of bank and hands for each kind, which must stay at the supply
    pub fn check_conservation(&self) -> Result<(), String> {
        for resource in Resource::ALL {
            let total: u32 =
                self.bank.get(resource) + self.hands.iter().map(|h| h.get(resource)).sum::<u32>();
            if total != SUPPLY_PER_RESOURCE {
                return Err(format!(
                    "{resource}: bank and hands hold {total}, expected {SUPPLY_PER_RESOURCE}"
                ));
            }
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn set_hand(&mut self, player: PlayerId, hand: ResourceHand) {
        let old = self.hands[player.index()];
        self.bank.add_hand(&old);
        self.bank.try_subtract(&hand);
        self.hands[player.index()] = hand;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::costs;

    #[test]
    fn test_pay_and_grant_conserve_supply() {
        let mut ledger = ResourceLedger::new(2);
        ledger
            .grant(PlayerId(0), &ResourceHand::uniform(2))
            .unwrap();
        ledger.pay(PlayerId(0), &costs::road()).unwrap();
        assert_eq!(ledger.hand(PlayerId(0)), ResourceHand::with_amounts(1, 1, 2, 2, 2));
        assert_eq!(ledger.bank().wood, 18);
        ledger.check_conservation().unwrap();
    }

    #[test]
    fn test_failed_pay_changes_nothing() {
        let mut ledger = ResourceLedger::new(2);
        let before = ledger.clone();
        assert!(matches!(
            ledger.pay(PlayerId(1), &costs::city()),
            Err(ActionError::InsufficientResources(_))
        ));
        assert_eq!(ledger, before);
    }

    #[test]
    fn test_grant_blocked_by_bank_stock() {
        let mut ledger = ResourceLedger::new(2);
        ledger
            .grant(PlayerId(0), &ResourceHand::single(Resource::Ore, 19))
            .unwrap();
        assert!(matches!(
            ledger.grant(PlayerId(1), &ResourceHand::single(Resource::Ore, 1)),
            Err(ActionError::BankShortage(_))
        ));
        ledger.check_conservation().unwrap();
    }

    #[test]
    fn test_swap_requires_both_sides() {
        let mut ledger = ResourceLedger::new(2);
        ledger
            .grant(PlayerId(0), &ResourceHand::single(Resource::Ore, 2))
            .unwrap();
        let before = ledger.clone();
        let err = ledger.swap(
            PlayerId(0),
            &ResourceHand::single(Resource::Ore, 2),
            PlayerId(1),
            &ResourceHand::single(Resource::Sheep, 1),
        );
        assert!(err.is_err());
        assert_eq!(ledger, before);
    }

    #[test]
    fn test_unknown_player_is_invalid_target() {
        let mut ledger = ResourceLedger::new(2);
        assert!(matches!(
            ledger.grant(PlayerId(5), &ResourceHand::uniform(1)),
            Err(ActionError::InvalidTarget(_))
        ));
    }
}
