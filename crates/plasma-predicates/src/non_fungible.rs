//! Non-fungible (ERC721-like) transfers: one input, token id claims.

use plasma_primitives::abi::{encode_call, split_selector, AbiReader, AbiToken};
use plasma_primitives::{function_selector, Address, U256};

use crate::error::PredicateError;
use crate::inclusion::VerifiedReference;
use crate::predicate::{
    expect_inputs, target, ClaimInput, DecodeContext, ExitClaimDraft, ExitOutput, Predicate,
    PredicateKind, Spend,
};
use crate::transaction::SignedExitTx;

pub const TRANSFER_FROM: &str = "transferFrom(address,address,uint256)";

/// Decoded `transferFrom` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferFromCall {
    pub from: Address,
    pub to: Address,
    pub token_id: U256,
}

impl TransferFromCall {
    pub fn decode(calldata: &[u8]) -> Result<Self, PredicateError> {
        let (selector, args) = split_selector(calldata)?;
        if selector != function_selector(TRANSFER_FROM) {
            return Err(PredicateError::UnknownSelector(selector));
        }
        let args = AbiReader::new(args);
        Ok(Self {
            from: args.address(0)?,
            to: args.address(1)?,
            token_id: args.uint(2)?,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        encode_call(
            function_selector(TRANSFER_FROM),
            &[
                AbiToken::Address(self.from),
                AbiToken::Address(self.to),
                AbiToken::Uint(self.token_id),
            ],
        )
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NonFungiblePredicate;

impl Predicate for NonFungiblePredicate {
    fn kind(&self) -> PredicateKind {
        PredicateKind::NonFungible
    }

    fn decode_exit(
        &self,
        ctx: &DecodeContext<'_>,
        exit_tx: &SignedExitTx,
        claimant: Address,
        inputs: &[VerifiedReference],
    ) -> Result<Vec<ExitClaimDraft>, PredicateError> {
        let child_token = target(exit_tx)?;
        let (root_token, _) = ctx.resolve(&child_token)?;
        let call = TransferFromCall::decode(exit_tx.data())?;
        if exit_tx.signer != call.from {
            return Err(PredicateError::ParticipantMismatch {
                expected: call.from,
                found: exit_tx.signer,
            });
        }
        if claimant != call.from && claimant != call.to {
            return Err(PredicateError::UnauthorizedClaimant(claimant));
        }
        expect_inputs(inputs, 1, "1")?;

        let token_id = ctx.owned_token(&inputs[0], &child_token, &call.from)?;
        if token_id != call.token_id {
            return Err(PredicateError::TokenIdMismatch {
                expected: call.token_id,
                found: token_id,
            });
        }

        Ok(vec![ExitClaimDraft {
            owner: claimant,
            root_token,
            child_token,
            amount_or_token_id: token_id,
            is_burn: false,
            is_nft: true,
            output: ExitOutput::Transferred,
            inputs: vec![ClaimInput::new(&inputs[0], call.from, child_token, token_id)],
        }])
    }

    fn decode_spends(
        &self,
        _ctx: &DecodeContext<'_>,
        tx: &SignedExitTx,
    ) -> Result<Vec<Spend>, PredicateError> {
        let call = TransferFromCall::decode(tx.data())?;
        Ok(vec![Spend {
            signer: tx.signer,
            child_token: target(tx)?,
            token_id: Some(call.token_id),
        }])
    }
}
