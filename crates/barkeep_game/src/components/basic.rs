//! Small components: names, markers, the bank and toilets.

use barkeep_ecs::EntityId;
use serde::{Deserialize, Serialize};

/// Display name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HasName {
    /// The name.
    pub name: String,
}

impl HasName {
    /// Creates a name component.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Blocks walking through the entity's grid cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsSolid;

/// Spawned by the in-game store. Hidden from gameplay queries unless
/// explicitly included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsStoreSpawned;

/// Coin balance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsBank {
    coins: i32,
    cart: i32,
}

impl IsBank {
    /// Creates a bank holding `coins`.
    #[must_use]
    pub fn with_balance(coins: i32) -> Self {
        Self { coins, cart: 0 }
    }

    /// Current balance.
    #[must_use]
    pub fn balance(&self) -> i32 {
        self.coins
    }

    /// Value of the items currently in the store cart.
    #[must_use]
    pub fn cart(&self) -> i32 {
        self.cart
    }

    /// Adds coins.
    pub fn deposit(&mut self, amount: i32) {
        self.coins += amount;
    }

    /// Removes coins. The balance may go negative.
    pub fn withdraw(&mut self, amount: i32) {
        self.coins -= amount;
    }

    /// Replaces the cart total.
    pub fn update_cart(&mut self, amount: i32) {
        self.cart = amount;
    }
}

/// A toilet customers can use.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsToilet {
    /// Customer currently using it.
    pub user: Option<EntityId>,
    /// Times used since last cleaned.
    pub uses: u32,
}

impl IsToilet {
    /// Uses after which the toilet needs cleaning.
    pub const MAX_USES: u32 = 3;

    /// Returns `true` if free and clean enough.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.user.is_none() && self.uses < Self::MAX_USES
    }

    /// Empties and cleans the toilet.
    pub fn reset(&mut self) {
        self.user = None;
        self.uses = 0;
    }
}

component!(HasName, IsSolid, IsStoreSpawned, IsBank, IsToilet);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bank_balance() {
        let mut bank = IsBank::with_balance(10);
        bank.deposit(5);
        bank.withdraw(20);
        assert_eq!(bank.balance(), -5);
    }

    #[test]
    fn test_toilet_reset() {
        let mut toilet = IsToilet {
            user: Some(EntityId(3)),
            uses: IsToilet::MAX_USES,
        };
        assert!(!toilet.is_available());
        toilet.reset();
        assert!(toilet.is_available());
    }
}
