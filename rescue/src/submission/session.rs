use super::state::{ProgressRegister, SubmissionState};
use alloy::primitives::B256;
use common::metrics::Metrics;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::{debug, error, info};

/// One rescue: its state register and the token that stops it.
pub struct RescueSession {
    register: ProgressRegister,
    cancel_token: CancellationToken,
    metrics: Arc<Metrics>,
}

impl RescueSession {
    pub fn new(cancel_token: CancellationToken, metrics: Arc<Metrics>) -> Self {
        Self {
            register: ProgressRegister::new(),
            cancel_token,
            metrics,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SubmissionState> {
        self.register.subscribe()
    }

    pub fn state(&self) -> SubmissionState {
        self.register.current()
    }

    pub fn advance(&self, next: SubmissionState) -> bool {
        let label = next.to_string();
        let applied = self.register.transition(next);
        if applied {
            self.metrics.set_rescue_state(self.state().metric_value());
            info!("Rescue state: {}", label);
        } else {
            debug!("Ignored transition to {} from {}", label, self.state());
        }
        applied
    }

    pub fn record_attempt(&self, attempts: u64, last_block: u64) -> bool {
        self.metrics.set_broadcast_attempts(attempts);
        self.advance(SubmissionState::Broadcasting {
            attempts,
            last_block,
        })
    }

    /// Terminal. Cancels the session only if this call made the transition.
    pub fn succeed(&self, tx_hash: B256) -> bool {
        let applied = self.advance(SubmissionState::Success { tx_hash });
        if applied {
            info!("✅ Rescue succeeded, transaction {}", tx_hash);
            self.cancel_token.cancel();
        }
        applied
    }

    /// Terminal. Cancels the session only if this call made the transition.
    pub fn fail(&self, reason: impl Into<String>, detail: impl Into<String>) -> bool {
        let reason = reason.into();
        let detail = detail.into();
        error!("❌ {}: {}", reason, detail);
        let applied = self.advance(SubmissionState::Failed { reason, detail });
        if applied {
            self.cancel_token.cancel();
        }
        applied
    }

    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancel_token.cancelled()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}
