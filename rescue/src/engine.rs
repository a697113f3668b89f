use crate::{
    briber::BriberBuilder,
    bundle::{self, SignedBundle},
    error::RescueError,
    intent::BriberMode,
    l1::{ChainHead, FundingAccount},
    planner::AssetTransfer,
    relay::{BundleRelay, InclusionResolver},
    simulator::BundleSimulator,
    submission::{RescueSession, SubmissionConfig, SubmissionLoop, SubmissionState},
};
use common::metrics::Metrics;
use std::sync::Arc;
use tracing::info;

pub const INITIAL_SIMULATION_REASON: &str =
    "Simulation failed, perhaps a non standard ERC20 transfer?";
pub const FUNDING_REASON: &str = "Failed to fund the bribe";
pub const SIGNING_REASON: &str = "Failed to sign the bundle";

/// Drives one rescue: plan, fund, sign, simulate once, then hand over to the loop.
pub struct RescueEngine<A, F, R, H, V>
where
    A: AssetTransfer,
    F: FundingAccount,
    R: BundleRelay,
    H: ChainHead,
    V: InclusionResolver,
{
    planner: A,
    briber: BriberBuilder<F>,
    briber_mode: BriberMode,
    relay: Arc<R>,
    head: Arc<H>,
    resolver: V,
    session: Arc<RescueSession>,
    chain_id: u64,
    config: SubmissionConfig,
    metrics: Arc<Metrics>,
}

struct PreparedBundle {
    bundle: SignedBundle,
    permit_deadline: Option<u64>,
    description: String,
}

impl<A, F, R, H, V> RescueEngine<A, F, R, H, V>
where
    A: AssetTransfer,
    F: FundingAccount,
    R: BundleRelay,
    H: ChainHead,
    V: InclusionResolver,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        planner: A,
        briber: BriberBuilder<F>,
        briber_mode: BriberMode,
        relay: Arc<R>,
        head: Arc<H>,
        resolver: V,
        session: Arc<RescueSession>,
        chain_id: u64,
        config: SubmissionConfig,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            planner,
            briber,
            briber_mode,
            relay,
            head,
            resolver,
            session,
            chain_id,
            config,
            metrics,
        }
    }

    /// Returns the terminal state, or the last state reached if the session was cancelled.
    pub async fn run(self) -> SubmissionState {
        let prepared = match self.prepare().await {
            Ok(prepared) => prepared,
            Err((reason, err)) => {
                self.session.fail(reason, err.to_string());
                return self.session.state();
            }
        };

        let simulator = BundleSimulator::new(self.relay.clone(), self.metrics.clone());
        let initial = match self.head.block_number().await {
            Ok(head) => simulator.simulate(&prepared.bundle, head).await,
            Err(e) => Err(RescueError::Any(e)),
        };
        match initial {
            Ok(result) => info!(
                "Simulation successful, effective gas price {} gwei\n{}",
                result.effective_gas_price_gwei(),
                prepared.description
            ),
            Err(err) => {
                self.session.fail(INITIAL_SIMULATION_REASON, err.to_string());
                return self.session.state();
            }
        }

        SubmissionLoop::new(
            self.relay,
            self.head,
            self.resolver,
            self.session.clone(),
            prepared.bundle,
            prepared.permit_deadline,
            self.config,
            self.metrics,
        )
        .run()
        .await;

        self.session.state()
    }

    /// Nothing is signed and no funds move until planning succeeded.
    async fn prepare(&self) -> Result<PreparedBundle, (String, RescueError)> {
        let planning_failed = |err| {
            (
                format!("Failed to construct {} transfer tx", self.planner.label()),
                err,
            )
        };

        let asset_legs = self
            .planner
            .build_zero_gas_legs()
            .await
            .map_err(planning_failed)?;
        let checks = self
            .planner
            .build_postcondition()
            .await
            .map_err(planning_failed)?;
        let description = self
            .planner
            .build_description()
            .await
            .map_err(planning_failed)?;
        info!("🛟 {}", description);

        let funding_failed = |err| (FUNDING_REASON.to_string(), err);
        let signing_failed = |err| (SIGNING_REASON.to_string(), err);

        let (briber_leg, permit_deadline) = match self.briber_mode {
            BriberMode::PermitRelayed => {
                self.briber
                    .ensure_funding(&self.session)
                    .await
                    .map_err(funding_failed)?;
                let permit = self
                    .briber
                    .sign_permit(&self.session)
                    .await
                    .map_err(signing_failed)?;
                let leg = self
                    .briber
                    .build_permit_relayed(&permit, &checks)
                    .map_err(signing_failed)?;
                (leg, Some(permit.deadline))
            }
            BriberMode::Direct => {
                self.briber
                    .ensure_native_funding()
                    .await
                    .map_err(funding_failed)?;
                let leg = self
                    .briber
                    .build_direct(&checks)
                    .await
                    .map_err(signing_failed)?;
                (leg, None)
            }
        };

        let entries = bundle::assemble(asset_legs, briber_leg).map_err(signing_failed)?;
        let bundle = SignedBundle::sign(&entries, self.chain_id)
            .await
            .map_err(signing_failed)?;
        bundle.log_transactions();

        Ok(PreparedBundle {
            bundle,
            permit_deadline,
            description,
        })
    }
}
