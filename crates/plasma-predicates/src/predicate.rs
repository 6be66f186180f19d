//! Predicate interface, selection and the shared claim types.

use std::fmt;

use plasma_primitives::abi::split_selector;
use plasma_primitives::{
    function_selector, Address, Age, CheckpointRegistry, ReferenceProof, TokenMapping, U256,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::burn::{BurnPredicate, WITHDRAW};
use crate::error::PredicateError;
use crate::facts::{FungibleEvent, NftEvent};
use crate::fungible::FungiblePredicate;
use crate::inclusion::{verify_reference, VerifiedReference};
use crate::marketplace::MarketplacePredicate;
use crate::non_fungible::NonFungiblePredicate;
use crate::transaction::SignedExitTx;

/// Read-only collaborators and settings available while decoding
#[derive(Clone, Copy)]
pub struct DecodeContext<'a> {
    pub checkpoints: &'a dyn CheckpointRegistry,
    pub tokens: &'a dyn TokenMapping,
    /// Marketplace contract on the child chain
    pub marketplace: Address,
    /// Child chain id enforced on exit transactions, if any
    pub chain_id: Option<u64>,
}

impl DecodeContext<'_> {
    /// Root token of `child_token` and whether it is non-fungible
    pub fn resolve(&self, child_token: &Address) -> Result<(Address, bool), PredicateError> {
        let root = self
            .tokens
            .root_of(child_token)
            .ok_or(PredicateError::UnmappedToken(*child_token))?;
        Ok((root, self.tokens.is_nft(&root)))
    }

    /// Closing balance of `participant` proven by a fungible reference log of `child_token`
    pub(crate) fn balance_of(
        &self,
        reference: &VerifiedReference,
        child_token: &Address,
        participant: &Address,
    ) -> Result<U256, PredicateError> {
        let (root, _) = self.check_token(reference, child_token)?;
        let event = FungibleEvent::decode(&reference.log)?;
        if event.root_token() != root {
            return Err(PredicateError::TokenMismatch {
                expected: root,
                found: event.root_token(),
            });
        }
        event
            .closing_balance(participant)
            .ok_or(PredicateError::ParticipantMismatch {
                expected: *participant,
                found: event.participant(),
            })
    }

    /// Token id proven to be owned by `owner` by a non-fungible reference log of `child_token`
    pub(crate) fn owned_token(
        &self,
        reference: &VerifiedReference,
        child_token: &Address,
        owner: &Address,
    ) -> Result<U256, PredicateError> {
        let (root, _) = self.check_token(reference, child_token)?;
        let event = NftEvent::decode(&reference.log)?;
        if event.root_token() != root {
            return Err(PredicateError::TokenMismatch {
                expected: root,
                found: event.root_token(),
            });
        }
        match event.owner_after() {
            Some(found) if found == *owner => Ok(event.token_id()),
            Some(found) => Err(PredicateError::ParticipantMismatch {
                expected: *owner,
                found,
            }),
            None => Err(PredicateError::ParticipantMismatch {
                expected: *owner,
                found: Address::zero(),
            }),
        }
    }

    fn check_token(
        &self,
        reference: &VerifiedReference,
        child_token: &Address,
    ) -> Result<(Address, bool), PredicateError> {
        if reference.log.address != *child_token {
            return Err(PredicateError::TokenMismatch {
                expected: *child_token,
                found: reference.log.address,
            });
        }
        self.resolve(child_token)
    }
}

/// One proven input backing an exit claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimInput {
    /// Age of the referenced log
    pub age: Age,
    /// Participant whose later spend deprecates this input
    pub signer: Address,
    pub child_token: Address,
    /// Amount this input adds to the claim (token id for non-fungible claims)
    pub contribution: U256,
    /// Creation time of the header block checkpointing the input
    pub checkpointed_at: u64,
}

impl ClaimInput {
    pub(crate) fn new(
        reference: &VerifiedReference,
        signer: Address,
        child_token: Address,
        contribution: U256,
    ) -> Self {
        Self {
            age: reference.age,
            signer,
            child_token,
            contribution,
            checkpointed_at: reference.header_block.created_at,
        }
    }
}

/// Output of the exit transaction a claim stands for.
///
/// Claims of different parties can share their oldest input; the output keeps the
/// sender's change and the recipient's transfer of one transaction apart. Both
/// parties of a non-fungible transfer claim the same output, the token itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitOutput {
    /// Fungible balance the transaction leaves with its sender
    Change,
    /// Amount or token the transaction moves
    Transferred,
}

impl ExitOutput {
    /// Position of the output inside the transaction
    pub fn index(self) -> u8 {
        match self {
            Self::Change => 0,
            Self::Transferred => 1,
        }
    }

    pub fn from_index(index: u8) -> Self {
        if index == 0 {
            Self::Change
        } else {
            Self::Transferred
        }
    }
}

/// Claim produced by a predicate, before registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitClaimDraft {
    pub owner: Address,
    pub root_token: Address,
    pub child_token: Address,
    /// Summed contributions, or the token id for non-fungible claims
    pub amount_or_token_id: U256,
    pub is_burn: bool,
    pub is_nft: bool,
    pub output: ExitOutput,
    pub inputs: Vec<ClaimInput>,
}

impl ExitClaimDraft {
    /// Claim whose amount is the sum of its inputs' contributions
    pub(crate) fn fungible(
        owner: Address,
        root_token: Address,
        child_token: Address,
        is_burn: bool,
        output: ExitOutput,
        inputs: Vec<ClaimInput>,
    ) -> Self {
        let amount = inputs
            .iter()
            .fold(U256::zero(), |sum, input| sum.saturating_add(input.contribution));
        Self {
            owner,
            root_token,
            child_token,
            amount_or_token_id: amount,
            is_burn,
            is_nft: false,
            output,
            inputs,
        }
    }

    /// Priority of the claim: the oldest input wins
    pub fn age(&self) -> Option<Age> {
        self.inputs.iter().map(|input| input.age).min()
    }

    /// Distinct input signers in input order
    pub fn signers(&self) -> Vec<Address> {
        let mut signers = Vec::with_capacity(self.inputs.len());
        for input in &self.inputs {
            if !signers.contains(&input.signer) {
                signers.push(input.signer);
            }
        }
        signers
    }
}

/// Spend performed by a checkpointed transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spend {
    pub signer: Address,
    pub child_token: Address,
    /// Token id moved, for non-fungible spends
    pub token_id: Option<U256>,
}

/// Asset class handled by a predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateKind {
    Fungible,
    NonFungible,
    Marketplace,
    Burn,
}

impl fmt::Display for PredicateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Fungible => "fungible",
            Self::NonFungible => "non-fungible",
            Self::Marketplace => "marketplace",
            Self::Burn => "burn",
        };
        f.write_str(name)
    }
}

impl PredicateKind {
    /// Pick the predicate for a transaction from its target contract and selector
    pub fn select(ctx: &DecodeContext<'_>, tx: &SignedExitTx) -> Result<Self, PredicateError> {
        let to = tx.to().ok_or(PredicateError::ContractCreation)?;
        if to == ctx.marketplace {
            return Ok(Self::Marketplace);
        }
        let (_, is_nft) = ctx.resolve(&to)?;
        let (selector, _) = split_selector(tx.data())?;
        if selector == function_selector(WITHDRAW) {
            return Ok(Self::Burn);
        }
        Ok(if is_nft {
            Self::NonFungible
        } else {
            Self::Fungible
        })
    }

    pub fn predicate(self) -> &'static dyn Predicate {
        match self {
            Self::Fungible => &FungiblePredicate,
            Self::NonFungible => &NonFungiblePredicate,
            Self::Marketplace => &MarketplacePredicate,
            Self::Burn => &BurnPredicate,
        }
    }
}

/// Decoding logic of one asset class
pub trait Predicate: Send + Sync {
    fn kind(&self) -> PredicateKind;

    /// Turn verified reference inputs and the exit transaction into exit claims for `claimant`
    fn decode_exit(
        &self,
        ctx: &DecodeContext<'_>,
        exit_tx: &SignedExitTx,
        claimant: Address,
        inputs: &[VerifiedReference],
    ) -> Result<Vec<ExitClaimDraft>, PredicateError>;

    /// Spends performed by a checkpointed transaction
    fn decode_spends(
        &self,
        ctx: &DecodeContext<'_>,
        tx: &SignedExitTx,
    ) -> Result<Vec<Spend>, PredicateError>;
}

/// Outcome of decoding an exit request
#[derive(Debug, Clone)]
pub struct DecodedExit {
    pub kind: PredicateKind,
    pub exit_tx: SignedExitTx,
    pub claims: Vec<ExitClaimDraft>,
}

/// Verify every reference input and decode the exit transaction into claims
pub fn decode_exit(
    ctx: &DecodeContext<'_>,
    claimant: Address,
    inputs: &[ReferenceProof],
    exit_tx: &[u8],
) -> Result<DecodedExit, PredicateError> {
    let verified = inputs
        .iter()
        .map(|proof| verify_reference(ctx.checkpoints, proof))
        .collect::<Result<Vec<_>, _>>()?;
    for (position, reference) in verified.iter().enumerate() {
        if verified[..position].iter().any(|other| other.age == reference.age) {
            return Err(PredicateError::DuplicateInput);
        }
    }

    let exit_tx = SignedExitTx::parse(exit_tx, ctx.chain_id)?;
    let kind = PredicateKind::select(ctx, &exit_tx)?;
    debug!(
        "Decoding {} exit of {:?} with {} input(s)",
        kind,
        claimant,
        verified.len()
    );
    let claims = kind.predicate().decode_exit(ctx, &exit_tx, claimant, &verified)?;
    Ok(DecodedExit {
        kind,
        exit_tx,
        claims,
    })
}

/// Decode the spends of a signed, checkpointed transaction
pub fn decode_spends(
    ctx: &DecodeContext<'_>,
    tx_bytes: &[u8],
) -> Result<(SignedExitTx, Vec<Spend>), PredicateError> {
    let tx = SignedExitTx::parse(tx_bytes, ctx.chain_id)?;
    let kind = PredicateKind::select(ctx, &tx)?;
    let spends = kind.predicate().decode_spends(ctx, &tx)?;
    Ok((tx, spends))
}

/// Require exactly `expected` inputs
pub(crate) fn expect_inputs(
    inputs: &[VerifiedReference],
    expected: usize,
    label: &'static str,
) -> Result<(), PredicateError> {
    if inputs.len() != expected {
        return Err(PredicateError::InputCount {
            expected: label,
            found: inputs.len(),
        });
    }
    Ok(())
}

/// Called contract, which must be a mapped child token
pub(crate) fn target(tx: &SignedExitTx) -> Result<Address, PredicateError> {
    tx.to().ok_or(PredicateError::ContractCreation)
}
