//! Fungible (ERC20-like) transfers with MoreVP input folding.
//!
//! The exit transaction is `transfer(recipient, amount)` signed by the sender. The
//! sender exits their change with a single input proving their balance. The recipient
//! exits the transferred amount with the sender's balance as first input and may add
//! their own prior balance as a second input.

use plasma_primitives::abi::{encode_call, split_selector, AbiReader, AbiToken};
use plasma_primitives::{function_selector, Address, U256};

use crate::error::PredicateError;
use crate::inclusion::VerifiedReference;
use crate::predicate::{
    expect_inputs, target, ClaimInput, DecodeContext, ExitClaimDraft, ExitOutput, Predicate,
    PredicateKind, Spend,
};
use crate::transaction::SignedExitTx;

pub const TRANSFER: &str = "transfer(address,uint256)";

/// Decoded `transfer` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferCall {
    pub recipient: Address,
    pub amount: U256,
}

impl TransferCall {
    pub fn decode(calldata: &[u8]) -> Result<Self, PredicateError> {
        let (selector, args) = split_selector(calldata)?;
        if selector != function_selector(TRANSFER) {
            return Err(PredicateError::UnknownSelector(selector));
        }
        let args = AbiReader::new(args);
        Ok(Self {
            recipient: args.address(0)?,
            amount: args.uint(1)?,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        encode_call(
            function_selector(TRANSFER),
            &[AbiToken::Address(self.recipient), AbiToken::Uint(self.amount)],
        )
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FungiblePredicate;

impl Predicate for FungiblePredicate {
    fn kind(&self) -> PredicateKind {
        PredicateKind::Fungible
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
        let call = TransferCall::decode(exit_tx.data())?;
        let sender = exit_tx.signer;

        let claim_inputs = if claimant == sender {
            expect_inputs(inputs, 1, "1")?;
            let closing = ctx.balance_of(&inputs[0], &child_token, &sender)?;
            let change = closing
                .checked_sub(call.amount)
                .ok_or(PredicateError::InsufficientBalance {
                    closing,
                    amount: call.amount,
                })?;
            vec![ClaimInput::new(&inputs[0], sender, child_token, change)]
        } else if claimant == call.recipient {
            if inputs.is_empty() || inputs.len() > 2 {
                return Err(PredicateError::InputCount {
                    expected: "1 or 2",
                    found: inputs.len(),
                });
            }
            let closing = ctx.balance_of(&inputs[0], &child_token, &sender)?;
            if closing < call.amount {
                return Err(PredicateError::InsufficientBalance {
                    closing,
                    amount: call.amount,
                });
            }
            let mut claim_inputs = vec![ClaimInput::new(&inputs[0], sender, child_token, call.amount)];
            if let Some(own) = inputs.get(1) {
                let own_balance = ctx.balance_of(own, &child_token, &call.recipient)?;
                claim_inputs.push(ClaimInput::new(own, call.recipient, child_token, own_balance));
            }
            claim_inputs
        } else {
            return Err(PredicateError::UnauthorizedClaimant(claimant));
        };

        let output = if claimant == sender {
            ExitOutput::Change
        } else {
            ExitOutput::Transferred
        };
        Ok(vec![ExitClaimDraft::fungible(
            claimant,
            root_token,
            child_token,
            false,
            output,
            claim_inputs,
        )])
    }

    fn decode_spends(
        &self,
        _ctx: &DecodeContext<'_>,
        tx: &SignedExitTx,
    ) -> Result<Vec<Spend>, PredicateError> {
        TransferCall::decode(tx.data())?;
        Ok(vec![Spend {
            signer: tx.signer,
            child_token: target(tx)?,
            token_id: None,
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::decode_exit;
    use crate::testing::{ChainBuilder, TestAccount, TestTokens};

    struct Setup {
        chain: ChainBuilder,
        tokens: TestTokens,
        alice: TestAccount,
        bob: TestAccount,
    }

    /// Alice deposits 100 (block 0) and Bob deposits 5 (block 1)
    fn setup() -> Setup {
        let tokens = TestTokens::new();
        let alice = TestAccount::new(1);
        let bob = TestAccount::new(2);
        let mut chain = ChainBuilder::new();
        chain.push_block(vec![tokens.erc20_deposit(&alice, 100, 0)]);
        chain.push_block(vec![tokens.erc20_deposit(&bob, 5, 0)]);
        chain.checkpoint(&tokens.checkpoints, 1_000).unwrap();
        Setup {
            chain,
            tokens,
            alice,
            bob,
        }
    }

    #[test]
    fn test_sender_exits_change() {
        let s = setup();
        let exit_tx = s.alice.sign(s.tokens.erc20_transfer_tx(&s.bob, 30));
        let decoded = decode_exit(
            &s.tokens.context(),
            s.alice.address,
            &[s.chain.reference(0, 0, 0, false)],
            &exit_tx,
        )
        .unwrap();

        assert_eq!(decoded.kind, PredicateKind::Fungible);
        let claim = &decoded.claims[0];
        assert_eq!(claim.owner, s.alice.address);
        assert_eq!(claim.amount_or_token_id, U256::from(70));
        assert_eq!(claim.root_token, s.tokens.erc20_root);
        assert_eq!(claim.signers(), vec![s.alice.address]);
        assert_eq!(claim.output, ExitOutput::Change);
        assert!(!claim.is_burn && !claim.is_nft);
    }

    #[test]
    fn test_recipient_folds_two_inputs() {
        let s = setup();
        let exit_tx = s.alice.sign(s.tokens.erc20_transfer_tx(&s.bob, 30));
        let inputs = [
            s.chain.reference(0, 0, 0, false),
            s.chain.reference(1, 0, 0, false),
        ];
        let decoded =
            decode_exit(&s.tokens.context(), s.bob.address, &inputs, &exit_tx).unwrap();

        let claim = &decoded.claims[0];
        assert_eq!(claim.owner, s.bob.address);
        assert_eq!(claim.amount_or_token_id, U256::from(35));
        assert_eq!(claim.signers(), vec![s.alice.address, s.bob.address]);
        assert_eq!(claim.output, ExitOutput::Transferred);
        // Alice's deposit is older than Bob's
        assert_eq!(claim.age(), Some(claim.inputs[0].age));
        assert!(claim.inputs[0].age < claim.inputs[1].age);
    }

    #[test]
    fn test_rejections() {
        let s = setup();
        let ctx = s.tokens.context();
        let alice_input = [s.chain.reference(0, 0, 0, false)];

        let overdraw = s.alice.sign(s.tokens.erc20_transfer_tx(&s.bob, 101));
        assert!(matches!(
            decode_exit(&ctx, s.alice.address, &alice_input, &overdraw),
            Err(PredicateError::InsufficientBalance { .. })
        ));

        let exit_tx = s.alice.sign(s.tokens.erc20_transfer_tx(&s.bob, 30));
        let carol = TestAccount::new(3);
        assert!(matches!(
            decode_exit(&ctx, carol.address, &alice_input, &exit_tx),
            Err(PredicateError::UnauthorizedClaimant(_))
        ));

        // Bob's deposit does not prove Alice's balance
        assert!(matches!(
            decode_exit(&ctx, s.alice.address, &[s.chain.reference(1, 0, 0, false)], &exit_tx),
            Err(PredicateError::ParticipantMismatch { .. })
        ));

        assert!(matches!(
            decode_exit(&ctx, s.alice.address, &[], &exit_tx),
            Err(PredicateError::InputCount { found: 0, .. })
        ));

        let same_twice = [alice_input[0].clone(), alice_input[0].clone()];
        assert!(matches!(
            decode_exit(&ctx, s.bob.address, &same_twice, &exit_tx),
            Err(PredicateError::DuplicateInput)
        ));
    }

    #[test]
    fn test_spend() {
        let s = setup();
        let tx = s.alice.sign(s.tokens.erc20_transfer_tx(&s.bob, 1));
        let (parsed, spends) = crate::decode_spends(&s.tokens.context(), &tx).unwrap();
        assert_eq!(parsed.signer, s.alice.address);
        assert_eq!(
            spends,
            vec![Spend {
                signer: s.alice.address,
                child_token: s.tokens.erc20_child,
                token_id: None,
            }]
        );
    }

    #[test]
    fn test_transfer_call_roundtrip() {
        let call = TransferCall {
            recipient: Address::repeat_byte(9),
            amount: U256::from(12_345),
        };
        assert_eq!(TransferCall::decode(&call.encode()).unwrap(), call);
        assert!(matches!(
            TransferCall::decode(&[0xde, 0xad, 0xbe, 0xef]),
            Err(PredicateError::UnknownSelector([0xde, 0xad, 0xbe, 0xef]))
        ));
    }
}
