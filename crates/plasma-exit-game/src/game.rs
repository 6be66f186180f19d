//! The exit game: configuration plus the injected root-chain collaborators.

use std::sync::Arc;

use plasma_predicates::DecodeContext;
use plasma_primitives::{CheckpointRegistry, TokenMapping};

use crate::claim::{ExitClaim, ExitId};
use crate::config::ExitGameConfig;
use crate::custody::AssetCustody;
use crate::error::ExitGameError;
use crate::state::ExitGameState;

/// Exit registry and dispute resolver.
///
/// Holds no exit state itself: every operation takes the [`ExitGameState`] it
/// transitions together with the host timestamp, and either applies completely or
/// returns an error without touching the state.
pub struct ExitGame {
    config: ExitGameConfig,
    checkpoints: Arc<dyn CheckpointRegistry>,
    tokens: Arc<dyn TokenMapping>,
    custody: Arc<dyn AssetCustody>,
}

impl ExitGame {
    pub fn new(
        config: ExitGameConfig,
        checkpoints: Arc<dyn CheckpointRegistry>,
        tokens: Arc<dyn TokenMapping>,
        custody: Arc<dyn AssetCustody>,
    ) -> Self {
        Self {
            config,
            checkpoints,
            tokens,
            custody,
        }
    }

    pub fn config(&self) -> &ExitGameConfig {
        &self.config
    }

    /// Decoding context for predicates
    pub fn context(&self) -> DecodeContext<'_> {
        DecodeContext {
            checkpoints: self.checkpoints.as_ref(),
            tokens: self.tokens.as_ref(),
            marketplace: self.config.marketplace,
            chain_id: self.config.child_chain_id,
        }
    }

    pub(crate) fn checkpoints(&self) -> &dyn CheckpointRegistry {
        self.checkpoints.as_ref()
    }

    pub(crate) fn custody(&self) -> &dyn AssetCustody {
        self.custody.as_ref()
    }
}

/// Pending claim `exit_id`, or why it cannot be acted upon
pub(crate) fn pending_exit<'a>(
    state: &'a ExitGameState,
    exit_id: &ExitId,
) -> Result<&'a ExitClaim, ExitGameError> {
    let claim = state
        .get_exit(exit_id)
        .ok_or(ExitGameError::UnknownExit(*exit_id))?;
    if !claim.is_pending() {
        return Err(ExitGameError::ExitNotPending {
            exit_id: *exit_id,
            status: claim.status,
        });
    }
    Ok(claim)
}
