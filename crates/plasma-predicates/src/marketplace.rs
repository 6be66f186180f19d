//! Two-leg marketplace swaps.
//!
//! The taker submits `executeOrder(maker_leg, taker_leg, order_id, expiration, taker)`
//! to the marketplace contract. Each leg is `abi(token, signature, amount_or_id)` and
//! its signature covers the leg, the marketplace, the order id and the expiration.
//! Exiting a swap yields the asset received from the counter-party and, for fungible
//! tokens, the change left from the asset given.

use plasma_primitives::abi::{encode, encode_call, split_selector, AbiReader, AbiToken};
use plasma_primitives::hash::u256_word;
use plasma_primitives::{function_selector, keccak256, Address, H256, U256};
use secp256k1::SecretKey;

use crate::error::PredicateError;
use crate::inclusion::VerifiedReference;
use crate::predicate::{
    expect_inputs, ClaimInput, DecodeContext, ExitClaimDraft, ExitOutput, Predicate, PredicateKind,
    Spend,
};
use crate::signature::{recover_packed, sign_packed};
use crate::transaction::SignedExitTx;

pub const EXECUTE_ORDER: &str = "executeOrder(bytes,bytes,bytes32,uint256,address)";

/// One side of a swap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLeg {
    /// Child token given by the leg's signer
    pub token: Address,
    /// 65-byte `r ‖ s ‖ v` signature over [`leg_digest`]
    pub signature: Vec<u8>,
    pub amount_or_id: U256,
}

impl OrderLeg {
    fn decode(bytes: &[u8]) -> Result<Self, PredicateError> {
        let reader = AbiReader::new(bytes);
        Ok(Self {
            token: reader.address(0)?,
            signature: reader.bytes(1)?.to_vec(),
            amount_or_id: reader.uint(2)?,
        })
    }

    fn encode(&self) -> Vec<u8> {
        encode(&[
            AbiToken::Address(self.token),
            AbiToken::Bytes(self.signature.clone()),
            AbiToken::Uint(self.amount_or_id),
        ])
    }

    /// Leg of `token` signed by `secret_key`
    pub fn signed(
        token: Address,
        amount_or_id: U256,
        marketplace: Address,
        order_id: H256,
        expiration: U256,
        secret_key: &SecretKey,
    ) -> Self {
        let digest = leg_digest(&token, &marketplace, amount_or_id, &order_id, expiration);
        Self {
            token,
            signature: sign_packed(&digest, secret_key),
            amount_or_id,
        }
    }
}

/// `keccak256(token ‖ marketplace ‖ u256(amount_or_id) ‖ order_id ‖ u256(expiration))`
pub fn leg_digest(
    token: &Address,
    marketplace: &Address,
    amount_or_id: U256,
    order_id: &H256,
    expiration: U256,
) -> H256 {
    let mut preimage = Vec::with_capacity(20 + 20 + 32 * 3);
    preimage.extend_from_slice(token.as_bytes());
    preimage.extend_from_slice(marketplace.as_bytes());
    preimage.extend_from_slice(&u256_word(amount_or_id));
    preimage.extend_from_slice(order_id.as_bytes());
    preimage.extend_from_slice(&u256_word(expiration));
    keccak256(preimage)
}

/// Decoded `executeOrder` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub maker_leg: OrderLeg,
    pub taker_leg: OrderLeg,
    pub order_id: H256,
    /// Last child block number (exclusive) the order may reference
    pub expiration: U256,
    pub taker: Address,
}

impl Order {
    pub fn decode(calldata: &[u8]) -> Result<Self, PredicateError> {
        let (selector, args) = split_selector(calldata)?;
        if selector != function_selector(EXECUTE_ORDER) {
            return Err(PredicateError::UnknownSelector(selector));
        }
        let args = AbiReader::new(args);
        Ok(Self {
            maker_leg: OrderLeg::decode(args.bytes(0)?)?,
            taker_leg: OrderLeg::decode(args.bytes(1)?)?,
            order_id: args.bytes32(2)?,
            expiration: args.uint(3)?,
            taker: args.address(4)?,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        encode_call(
            function_selector(EXECUTE_ORDER),
            &[
                AbiToken::Bytes(self.maker_leg.encode()),
                AbiToken::Bytes(self.taker_leg.encode()),
                AbiToken::Bytes32(self.order_id),
                AbiToken::Uint(self.expiration),
                AbiToken::Address(self.taker),
            ],
        )
    }

    fn recover(&self, leg: &OrderLeg, marketplace: &Address) -> Result<Address, PredicateError> {
        let digest = leg_digest(
            &leg.token,
            marketplace,
            leg.amount_or_id,
            &self.order_id,
            self.expiration,
        );
        Ok(recover_packed(&digest, &leg.signature)?)
    }

    /// Recover `(maker, taker)`, requiring the taker leg, the taker argument and the
    /// transaction signer to agree
    fn parties(&self, marketplace: &Address, tx_signer: &Address) -> Result<(Address, Address), PredicateError> {
        let maker = self.recover(&self.maker_leg, marketplace)?;
        let taker = self.recover(&self.taker_leg, marketplace)?;
        if taker != self.taker {
            return Err(PredicateError::ParticipantMismatch {
                expected: self.taker,
                found: taker,
            });
        }
        if *tx_signer != self.taker {
            return Err(PredicateError::ParticipantMismatch {
                expected: self.taker,
                found: *tx_signer,
            });
        }
        Ok((maker, taker))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MarketplacePredicate;

/// Value held by `holder` before giving `leg`: the change left for fungible tokens
fn change_after(
    ctx: &DecodeContext<'_>,
    reference: &VerifiedReference,
    leg: &OrderLeg,
    holder: &Address,
) -> Result<U256, PredicateError> {
    let (_, is_nft) = ctx.resolve(&leg.token)?;
    if is_nft {
        let token_id = ctx.owned_token(reference, &leg.token, holder)?;
        if token_id != leg.amount_or_id {
            return Err(PredicateError::TokenIdMismatch {
                expected: leg.amount_or_id,
                found: token_id,
            });
        }
        return Ok(U256::zero());
    }
    let closing = ctx.balance_of(reference, &leg.token, holder)?;
    closing
        .checked_sub(leg.amount_or_id)
        .ok_or(PredicateError::InsufficientBalance {
            closing,
            amount: leg.amount_or_id,
        })
}

impl Predicate for MarketplacePredicate {
    fn kind(&self) -> PredicateKind {
        PredicateKind::Marketplace
    }

    fn decode_exit(
        &self,
        ctx: &DecodeContext<'_>,
        exit_tx: &SignedExitTx,
        claimant: Address,
        inputs: &[VerifiedReference],
    ) -> Result<Vec<ExitClaimDraft>, PredicateError> {
        let order = Order::decode(exit_tx.data())?;
        let (maker, taker) = order.parties(&ctx.marketplace, &exit_tx.signer)?;
        if claimant != maker && claimant != taker {
            return Err(PredicateError::UnauthorizedClaimant(claimant));
        }
        expect_inputs(inputs, 2, "2")?;
        for input in inputs {
            if order.expiration <= U256::from(input.block_number) {
                return Err(PredicateError::OrderExpired {
                    expiration: order.expiration,
                    block_number: input.block_number,
                });
            }
        }

        let maker_change = change_after(ctx, &inputs[0], &order.maker_leg, &maker)?;
        let taker_change = change_after(ctx, &inputs[1], &order.taker_leg, &taker)?;

        // (received leg, its input, its giver), (given leg, its input, change)
        let (received, received_input, giver, given, given_input, change) = if claimant == taker {
            (&order.maker_leg, &inputs[0], maker, &order.taker_leg, &inputs[1], taker_change)
        } else {
            (&order.taker_leg, &inputs[1], taker, &order.maker_leg, &inputs[0], maker_change)
        };

        let mut claims = Vec::with_capacity(2);
        let (received_root, received_nft) = ctx.resolve(&received.token)?;
        claims.push(ExitClaimDraft {
            owner: claimant,
            root_token: received_root,
            child_token: received.token,
            amount_or_token_id: received.amount_or_id,
            is_burn: false,
            is_nft: received_nft,
            output: ExitOutput::Transferred,
            inputs: vec![ClaimInput::new(
                received_input,
                giver,
                received.token,
                received.amount_or_id,
            )],
        });

        let (given_root, given_nft) = ctx.resolve(&given.token)?;
        if !given_nft && !change.is_zero() {
            claims.push(ExitClaimDraft::fungible(
                claimant,
                given_root,
                given.token,
                false,
                ExitOutput::Change,
                vec![ClaimInput::new(given_input, claimant, given.token, change)],
            ));
        }
        Ok(claims)
    }

    fn decode_spends(
        &self,
        ctx: &DecodeContext<'_>,
        tx: &SignedExitTx,
    ) -> Result<Vec<Spend>, PredicateError> {
        let order = Order::decode(tx.data())?;
        let (maker, taker) = order.parties(&ctx.marketplace, &tx.signer)?;
        [(maker, &order.maker_leg), (taker, &order.taker_leg)]
            .into_iter()
            .map(|(signer, leg)| {
                let (_, is_nft) = ctx.resolve(&leg.token)?;
                Ok(Spend {
                    signer,
                    child_token: leg.token,
                    token_id: is_nft.then_some(leg.amount_or_id),
                })
            })
            .collect()
    }
}
