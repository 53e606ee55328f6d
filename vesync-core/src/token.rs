//! Principal token balances held by the origin chain.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::SyncError;
use crate::types::Address;

/// Minimal fungible-token book: balances per holder and a total supply.
#[derive(Debug, Default, Clone, Serialize)]
pub struct TokenBalances {
    balances: HashMap<Address, u128>,
    total_supply: u128,
}

impl TokenBalances {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, holder: &Address) -> u128 {
        self.balances.get(holder).copied().unwrap_or(0)
    }

    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    pub fn mint(&mut self, to: &Address, amount: u128) -> Result<(), SyncError> {
        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(SyncError::Overflow("mint"))?;
        let balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(SyncError::Overflow("mint"))?;
        self.total_supply = supply;
        self.balances.insert(*to, balance);
        Ok(())
    }

    pub fn transfer(&mut self, from: &Address, to: &Address, amount: u128) -> Result<(), SyncError> {
        let available = self.balance_of(from);
        if available < amount {
            return Err(SyncError::InsufficientBalance {
                required: amount,
                available,
            });
        }
        if from == to {
            return Ok(());
        }
        let credited = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(SyncError::Overflow("transfer"))?;
        self.balances.insert(*from, available - amount);
        self.balances.insert(*to, credited);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AddressExt;

    #[test]
    fn test_transfer_moves_balance() {
        let alice = Address::derive(b"alice");
        let bob = Address::derive(b"bob");
        let mut token = TokenBalances::new();
        token.mint(&alice, 100).unwrap();

        token.transfer(&alice, &bob, 40).unwrap();
        assert_eq!(token.balance_of(&alice), 60);
        assert_eq!(token.balance_of(&bob), 40);
        assert_eq!(token.total_supply(), 100);

        let err = token.transfer(&bob, &alice, 41).unwrap_err();
        assert!(matches!(err, SyncError::InsufficientBalance { required: 41, available: 40 }));
        assert_eq!(token.balance_of(&bob), 40);
    }
}
