//! Timer-driven retry loop: re-simulate, re-target, broadcast, resolve.

mod session;
mod state;

pub use session::RescueSession;
pub use state::{ProgressRegister, SubmissionState};

use crate::{
    bundle::SignedBundle,
    error::RescueError,
    l1::ChainHead,
    relay::{BundleRelay, BundleResolution, InclusionResolver},
    simulator::BundleSimulator,
};
use common::{metrics::Metrics, utils::watchdog::Watchdog};
use std::{ops::ControlFlow, sync::Arc, time::Duration};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

pub const NONCE_TOO_HIGH_REASON: &str = "Transfer failed: Nonce too high";
pub const PERMIT_EXPIRED_REASON: &str = "Permit expired";
pub const MAX_ATTEMPTS_REASON: &str = "Transfer failed: Broadcast attempts exhausted";

#[derive(Debug, Clone)]
pub struct SubmissionConfig {
    /// Look-ahead from the current head to the targeted block, at least 1.
    pub blocks_in_the_future: u64,
    pub interval: Duration,
    /// `None` retries until a terminal outcome.
    pub max_attempts: Option<u64>,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            blocks_in_the_future: 2,
            interval: Duration::from_secs(13),
            max_attempts: None,
        }
    }
}

pub struct SubmissionLoop<R: BundleRelay, H: ChainHead, V: InclusionResolver> {
    relay: Arc<R>,
    simulator: BundleSimulator<R>,
    head: Arc<H>,
    resolver: V,
    session: Arc<RescueSession>,
    bundle: SignedBundle,
    /// Unix deadline of the permit the briber leg redeems, if any.
    permit_deadline: Option<u64>,
    config: SubmissionConfig,
    watchdog: Watchdog,
    metrics: Arc<Metrics>,
}

impl<R: BundleRelay, H: ChainHead, V: InclusionResolver> SubmissionLoop<R, H, V> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        relay: Arc<R>,
        head: Arc<H>,
        resolver: V,
        session: Arc<RescueSession>,
        bundle: SignedBundle,
        permit_deadline: Option<u64>,
        config: SubmissionConfig,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            simulator: BundleSimulator::new(relay.clone(), metrics.clone()),
            watchdog: Watchdog::new(config.max_attempts, metrics.clone()),
            relay,
            head,
            resolver,
            session,
            bundle,
            permit_deadline,
            config,
            metrics,
        }
    }

    /// Runs cycles until the session reaches a terminal state or is cancelled.
    /// The first cycle starts immediately; a slow cycle delays the next tick.
    pub async fn run(mut self) {
        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let session = self.session.clone();

        loop {
            tokio::select! {
                biased;
                _ = session.cancelled() => break,
                _ = interval.tick() => {}
            }

            let flow = tokio::select! {
                biased;
                _ = session.cancelled() => ControlFlow::Break(()),
                flow = self.cycle() => flow,
            };
            if flow.is_break() {
                break;
            }
        }

        info!(
            "Submission loop stopped after {} attempts: {}",
            self.watchdog.counter(),
            session.state()
        );
    }

    async fn cycle(&mut self) -> ControlFlow<()> {
        if let Some(deadline) = self.permit_deadline {
            let now = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default();
            if now >= deadline {
                self.session.fail(
                    PERMIT_EXPIRED_REASON,
                    RescueError::PermitExpired { deadline }.to_string(),
                );
                return ControlFlow::Break(());
            }
        }

        let block = match self.head.block_number().await {
            Ok(block) => block,
            Err(e) => {
                warn!("Failed to read block number, skipping cycle: {}", e);
                return ControlFlow::Continue(());
            }
        };

        if self.watchdog.increment() {
            self.session.fail(
                MAX_ATTEMPTS_REASON,
                format!(
                    "Bundle not included after {} attempts",
                    self.watchdog.counter() - 1
                ),
            );
            return ControlFlow::Break(());
        }
        let attempt = self.watchdog.counter();
        self.session.record_attempt(attempt, block);

        match self.simulator.simulate(&self.bundle, block).await {
            Ok(_) => {}
            Err(RescueError::Simulation(detail)) => {
                warn!("Re-simulation at block {} failed: {}", block, detail);
                self.session
                    .fail(NONCE_TOO_HIGH_REASON, RescueError::NonceTooHigh.to_string());
                return ControlFlow::Break(());
            }
            Err(e) => {
                warn!("Re-simulation at block {} not possible: {}", block, e);
                return ControlFlow::Continue(());
            }
        }

        let target = block + self.config.blocks_in_the_future;
        match self
            .relay
            .send_bundle(&self.bundle.raw_transactions(), target)
            .await
        {
            Ok(bundle_hash) => {
                self.metrics.inc_bundles_submitted();
                info!(
                    "📦 Attempt {}: bundle submitted for block {} (bundle hash {:?})",
                    attempt, target, bundle_hash
                );
            }
            Err(e) => {
                self.metrics.inc_bundle_submission_failures();
                warn!("Attempt {}: bundle submission failed: {}", attempt, e);
                return ControlFlow::Continue(());
            }
        }

        match self.resolver.resolve(&self.bundle, target).await {
            Ok(BundleResolution::BundleIncluded) => {
                self.metrics.inc_bundles_included();
                match self.bundle.first_hash() {
                    Some(tx_hash) => {
                        self.session.succeed(tx_hash);
                    }
                    None => {
                        self.session.fail("Transfer failed", "Bundle has no transactions");
                    }
                }
                ControlFlow::Break(())
            }
            Ok(BundleResolution::BlockPassedWithoutInclusion) => {
                self.metrics.inc_blocks_missed();
                info!("Not included in block {}, retrying", target);
                ControlFlow::Continue(())
            }
            Ok(BundleResolution::AccountNonceTooHigh) => {
                self.session
                    .fail(NONCE_TOO_HIGH_REASON, RescueError::NonceTooHigh.to_string());
                ControlFlow::Break(())
            }
            Err(e) => {
                warn!("Could not resolve bundle for block {}: {}", target, e);
                ControlFlow::Continue(())
            }
        }
    }
}
