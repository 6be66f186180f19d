//! Burn exits: `withdraw(amount_or_id)` destroys child-chain balance for a fast exit.

use plasma_primitives::abi::{encode_call, split_selector, AbiReader, AbiToken};
use plasma_primitives::{function_selector, Address, U256};

use crate::error::PredicateError;
use crate::inclusion::VerifiedReference;
use crate::predicate::{
    expect_inputs, target, ClaimInput, DecodeContext, ExitClaimDraft, ExitOutput, Predicate,
    PredicateKind, Spend,
};
use crate::transaction::SignedExitTx;

pub const WITHDRAW: &str = "withdraw(uint256)";

/// Calldata burning `amount_or_id` of the called child token
pub fn withdraw_calldata(amount_or_id: U256) -> Vec<u8> {
    encode_call(function_selector(WITHDRAW), &[AbiToken::Uint(amount_or_id)])
}

fn decode_withdraw(calldata: &[u8]) -> Result<U256, PredicateError> {
    let (selector, args) = split_selector(calldata)?;
    if selector != function_selector(WITHDRAW) {
        return Err(PredicateError::UnknownSelector(selector));
    }
    Ok(AbiReader::new(args).uint(0)?)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BurnPredicate;

impl Predicate for BurnPredicate {
    fn kind(&self) -> PredicateKind {
        PredicateKind::Burn
    }

    fn decode_exit(
        &self,
        ctx: &DecodeContext<'_>,
        exit_tx: &SignedExitTx,
        claimant: Address,
        inputs: &[VerifiedReference],
    ) -> Result<Vec<ExitClaimDraft>, PredicateError> {
        let child_token = target(exit_tx)?;
        let (root_token, is_nft) = ctx.resolve(&child_token)?;
        let burned = decode_withdraw(exit_tx.data())?;
        let signer = exit_tx.signer;
        if claimant != signer {
            return Err(PredicateError::UnauthorizedClaimant(claimant));
        }
        expect_inputs(inputs, 1, "1")?;

        if is_nft {
            let token_id = ctx.owned_token(&inputs[0], &child_token, &signer)?;
            if token_id != burned {
                return Err(PredicateError::TokenIdMismatch {
                    expected: burned,
                    found: token_id,
                });
            }
            return Ok(vec![ExitClaimDraft {
                owner: signer,
                root_token,
                child_token,
                amount_or_token_id: token_id,
                is_burn: true,
                is_nft: true,
                output: ExitOutput::Transferred,
                inputs: vec![ClaimInput::new(&inputs[0], signer, child_token, token_id)],
            }]);
        }

        let closing = ctx.balance_of(&inputs[0], &child_token, &signer)?;
        if closing < burned {
            return Err(PredicateError::InsufficientBalance {
                closing,
                amount: burned,
            });
        }
        Ok(vec![ExitClaimDraft::fungible(
            signer,
            root_token,
            child_token,
            true,
            ExitOutput::Transferred,
            vec![ClaimInput::new(&inputs[0], signer, child_token, burned)],
        )])
    }

    fn decode_spends(
        &self,
        ctx: &DecodeContext<'_>,
        tx: &SignedExitTx,
    ) -> Result<Vec<Spend>, PredicateError> {
        let child_token = target(tx)?;
        let (_, is_nft) = ctx.resolve(&child_token)?;
        let burned = decode_withdraw(tx.data())?;
        Ok(vec![Spend {
            signer: tx.signer,
            child_token,
            token_id: is_nft.then_some(burned),
        }])
    }
}
