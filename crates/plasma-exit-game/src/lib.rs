//! Exit registry and dispute resolver for the plasma bridge
//!
//! [`ExitGame`] verifies reference proofs against checkpointed header blocks, decodes
//! exit transactions through the predicates and keeps the resulting claims in an
//! [`ExitGameState`]: stored by [`ExitId`], queued per root token by age, challenged
//! with newer spends and finally settled against root-chain custody in priority order.

pub mod challenge;
pub mod claim;
pub mod config;
pub mod custody;
pub mod error;
pub mod events;
pub mod finalize;
pub mod game;
pub mod queue;
pub mod start;
pub mod state;

#[cfg(test)]
mod harness;

pub use challenge::{Challenge, ChallengeOutcome};
pub use claim::{ExitClaim, ExitId, ExitStatus};
pub use config::{ConfigError, ExitGameConfig};
pub use custody::{AssetCustody, CustodyError, MemoryCustody, Payout};
pub use error::ExitGameError;
pub use events::ExitEvent;
pub use game::ExitGame;
pub use queue::ExitQueue;
pub use start::StartExit;
pub use state::ExitGameState;
