//! Root-chain asset custody collaborator.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use plasma_primitives::{Address, U256};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CustodyError {
    #[error("Custody holds {locked} of {token:?}, cannot release {requested}")]
    InsufficientBalance {
        token: Address,
        locked: U256,
        requested: U256,
    },
    #[error("Custody unavailable: {0}")]
    Unavailable(String),
}

/// Vault holding deposited root-chain assets
#[cfg_attr(test, mockall::automock)]
pub trait AssetCustody: Send + Sync {
    /// Transfer `amount_or_id` of `token` to `owner`
    fn release(&self, token: &Address, owner: &Address, amount_or_id: U256)
        -> Result<(), CustodyError>;

    /// Pay an exit bond to `recipient`
    fn pay_bond(&self, recipient: &Address, amount: U256) -> Result<(), CustodyError>;
}

/// A release or bond payment performed by [`MemoryCustody`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payout {
    Release {
        token: Address,
        owner: Address,
        amount_or_id: U256,
    },
    Bond {
        recipient: Address,
        amount: U256,
    },
}

#[derive(Debug, Default)]
struct Vault {
    balances: HashMap<Address, U256>,
    nfts: HashSet<(Address, U256)>,
    payouts: Vec<Payout>,
}

/// In-memory custody tracking locked balances and token ids
#[derive(Debug, Default)]
pub struct MemoryCustody {
    vault: RwLock<Vault>,
}

impl MemoryCustody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock `amount` of a fungible root token
    pub fn lock(&self, token: Address, amount: U256) {
        let mut vault = self.vault.write().unwrap_or_else(|e| e.into_inner());
        let balance = vault.balances.entry(token).or_default();
        *balance = balance.saturating_add(amount);
    }

    /// Lock one non-fungible token id
    pub fn lock_nft(&self, token: Address, token_id: U256) {
        let mut vault = self.vault.write().unwrap_or_else(|e| e.into_inner());
        vault.nfts.insert((token, token_id));
    }

    pub fn balance(&self, token: &Address) -> U256 {
        let vault = self.vault.read().unwrap_or_else(|e| e.into_inner());
        vault.balances.get(token).copied().unwrap_or_default()
    }

    pub fn payouts(&self) -> Vec<Payout> {
        let vault = self.vault.read().unwrap_or_else(|e| e.into_inner());
        vault.payouts.clone()
    }
}

impl AssetCustody for MemoryCustody {
    fn release(
        &self,
        token: &Address,
        owner: &Address,
        amount_or_id: U256,
    ) -> Result<(), CustodyError> {
        let mut vault = self.vault.write().unwrap_or_else(|e| e.into_inner());
        if !vault.nfts.remove(&(*token, amount_or_id)) {
            let locked = vault.balances.get(token).copied().unwrap_or_default();
            if locked < amount_or_id {
                return Err(CustodyError::InsufficientBalance {
                    token: *token,
                    locked,
                    requested: amount_or_id,
                });
            }
            vault.balances.insert(*token, locked - amount_or_id);
        }
        vault.payouts.push(Payout::Release {
            token: *token,
            owner: *owner,
            amount_or_id,
        });
        Ok(())
    }

    fn pay_bond(&self, recipient: &Address, amount: U256) -> Result<(), CustodyError> {
        let mut vault = self.vault.write().unwrap_or_else(|e| e.into_inner());
        vault.payouts.push(Payout::Bond {
            recipient: *recipient,
            amount,
        });
        Ok(())
    }
}
