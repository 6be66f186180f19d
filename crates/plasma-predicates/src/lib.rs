//! Predicate decoders for the plasma exit game
//!
//! A predicate turns proven child-chain facts (a log inside a checkpointed receipt)
//! and a signed exit transaction into canonical exit claims, and turns a checkpointed
//! transaction into the spends a challenger can use to deprecate an exit input.
//!
//! The entry points are [`decode_exit`] and [`decode_spends`]; both dispatch on the
//! exit transaction's target contract through [`PredicateKind`].

pub mod burn;
pub mod error;
pub mod facts;
pub mod fungible;
pub mod inclusion;
pub mod marketplace;
pub mod non_fungible;
pub mod predicate;
pub mod receipt;
pub mod signature;
pub mod transaction;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{InclusionError, PredicateError, SignatureError};
pub use inclusion::{verify_reference, VerifiedReference};
pub use predicate::{
    decode_exit, decode_spends, ClaimInput, DecodeContext, DecodedExit, ExitClaimDraft, ExitOutput,
    Predicate, PredicateKind, Spend,
};
pub use receipt::{ChildLog, Receipt};
pub use transaction::{ChildTransaction, SignedExitTx, SignedTransaction};
