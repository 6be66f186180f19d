//! Root ⇄ child token mapping interface.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use thiserror::Error;

use crate::Address;

/// Read-only view of the token registry owned by the root chain
pub trait TokenMapping: Send + Sync {
    /// Root token a child token is bridged from
    fn root_of(&self, child_token: &Address) -> Option<Address>;
    /// Whether the root token is non-fungible
    fn is_nft(&self, root_token: &Address) -> bool;
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TokenMappingError {
    #[error("Token {0:?} is already mapped")]
    AlreadyMapped(Address),
}

/// In-memory token mapping
#[derive(Debug, Default)]
pub struct MemoryTokenMapping {
    child_to_root: RwLock<HashMap<Address, Address>>,
    root_to_child: RwLock<HashMap<Address, Address>>,
    nfts: RwLock<HashSet<Address>>,
}

impl MemoryTokenMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a root/child token pair; neither side may be mapped already
    pub fn map_token(
        &self,
        root_token: Address,
        child_token: Address,
        is_nft: bool,
    ) -> Result<(), TokenMappingError> {
        let mut child_to_root = self.child_to_root.write().unwrap_or_else(|e| e.into_inner());
        let mut root_to_child = self.root_to_child.write().unwrap_or_else(|e| e.into_inner());
        if root_to_child.contains_key(&root_token) {
            return Err(TokenMappingError::AlreadyMapped(root_token));
        }
        if child_to_root.contains_key(&child_token) {
            return Err(TokenMappingError::AlreadyMapped(child_token));
        }

        child_to_root.insert(child_token, root_token);
        root_to_child.insert(root_token, child_token);
        if is_nft {
            self.nfts
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .insert(root_token);
        }
        Ok(())
    }

    pub fn child_of(&self, root_token: &Address) -> Option<Address> {
        let root_to_child = self.root_to_child.read().unwrap_or_else(|e| e.into_inner());
        root_to_child.get(root_token).copied()
    }
}

impl TokenMapping for MemoryTokenMapping {
    fn root_of(&self, child_token: &Address) -> Option<Address> {
        let child_to_root = self.child_to_root.read().unwrap_or_else(|e| e.into_inner());
        child_to_root.get(child_token).copied()
    }

    fn is_nft(&self, root_token: &Address) -> bool {
        let nfts = self.nfts.read().unwrap_or_else(|e| e.into_inner());
        nfts.contains(root_token)
    }
}
