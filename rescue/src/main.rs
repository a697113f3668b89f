use anyhow::Error;
use common::{
    config::Config,
    metrics::{Metrics, server::serve_metrics},
    shared::alloy_tools::construct_alloy_provider,
    signer::Signer,
};
use rescue::{
    block_watcher::BlockWatcher,
    briber::BriberBuilder,
    engine::RescueEngine,
    intent::{AssetKind, RescueIntent},
    l1::{ChainReader, L1FundingAccount, L1Reader},
    planner::{DomainTransfer, TokenTransfer},
    relay::{ChainResolver, RelayClient},
    submission::{RescueSession, SubmissionConfig, SubmissionState},
    utils::config::RescueConfig,
};
use std::{sync::Arc, time::Duration};
use tokio::{
    signal::unix::{SignalKind, signal},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

const BLOCK_WATCHER_POLL: Duration = Duration::from_secs(4);

#[tokio::main]
async fn main() -> Result<(), Error> {
    common::utils::logging::init_logging();

    info!("🚀 Starting asset rescue v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::<RescueConfig>::read_env_variables()?;
    let rescue_config = &config.specific_config;

    let intent = RescueIntent::new(
        rescue_config.asset.clone(),
        &rescue_config.compromised_private_key,
        &rescue_config.funding_private_key,
        &rescue_config.recipient,
        rescue_config.bribe_amount,
        rescue_config.briber_mode,
    )?;
    info!(
        "Rescuing {} from {} to {}, bribe paid by {}",
        intent.asset,
        intent.compromised.address(),
        intent.recipient,
        intent.funding.address()
    );

    let cancel_token = CancellationToken::new();
    let metrics = Arc::new(Metrics::new());

    // Set up panic hook to cancel token on panic
    let panic_cancel_token = cancel_token.clone();
    std::panic::set_hook(Box::new(move |panic_info| {
        error!("Panic occurred: {:?}", panic_info);
        panic_cancel_token.cancel();
        info!("Cancellation token triggered, initiating shutdown...");
    }));

    if config.enable_metrics {
        serve_metrics(metrics.clone(), config.metrics_port, cancel_token.clone());
    }

    let provider = construct_alloy_provider(&intent.funding, &config.l1_rpc_urls)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to L1: {}", e))?;
    let reader = Arc::new(L1Reader::new(provider.clone()).await?);
    let chain_id = reader.chain_id();
    info!("Connected to chain {}", chain_id);

    let funding = Arc::new(
        L1FundingAccount::new(
            provider,
            intent.funding.address(),
            rescue_config.contract_addresses.weth,
        )
        .await?,
    );
    let briber = BriberBuilder::new(
        funding,
        intent.funding.local().clone(),
        rescue_config.contract_addresses.mev_briber,
        chain_id,
        intent.briber_reward,
    );

    let relay = Arc::new(RelayClient::new(
        &rescue_config.relay_url,
        Signer::ephemeral().local().clone(),
    )?);
    info!("Relay {} with auth key {}", rescue_config.relay_url, relay.auth_address());

    let resolver = ChainResolver::new(reader.clone(), rescue_config.resolution_poll_interval);
    let session = Arc::new(RescueSession::new(
        cancel_token.child_token(),
        metrics.clone(),
    ));
    spawn_state_logger(&session);
    spawn_block_watcher(reader.clone(), cancel_token.clone());

    let submission = SubmissionConfig {
        blocks_in_the_future: rescue_config.blocks_in_the_future,
        interval: rescue_config.submission_interval,
        max_attempts: rescue_config.max_broadcast_attempts,
    };

    let rescue_task: JoinHandle<SubmissionState> = match &intent.asset {
        AssetKind::Token(token) => {
            let planner = TokenTransfer::new(
                reader.clone(),
                *token,
                intent.compromised.local().clone(),
                intent.recipient,
            );
            tokio::spawn(
                RescueEngine::new(
                    planner,
                    briber,
                    intent.briber_mode,
                    relay,
                    reader,
                    resolver,
                    session.clone(),
                    chain_id,
                    submission,
                    metrics.clone(),
                )
                .run(),
            )
        }
        AssetKind::DomainName(name) => {
            let planner = DomainTransfer::new(
                reader.clone(),
                rescue_config.contract_addresses.ens_registry,
                name.clone(),
                intent.compromised.local().clone(),
                intent.recipient,
            );
            tokio::spawn(
                RescueEngine::new(
                    planner,
                    briber,
                    intent.briber_mode,
                    relay,
                    reader,
                    resolver,
                    session.clone(),
                    chain_id,
                    submission,
                    metrics.clone(),
                )
                .run(),
            )
        }
    };

    let outcome = wait_for_the_termination(cancel_token.clone(), rescue_task, &session).await;
    cancel_token.cancel();

    match outcome? {
        SubmissionState::Success { tx_hash } => {
            info!("👋 Asset rescued in transaction {}", tx_hash);
            Ok(())
        }
        SubmissionState::Failed { reason, detail } => {
            Err(anyhow::anyhow!("Rescue failed: {}: {}", reason, detail))
        }
        other => {
            info!("👋 Rescue stopped in state: {}", other);
            Ok(())
        }
    }
}

fn spawn_state_logger(session: &RescueSession) {
    let mut states = session.subscribe();
    tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let state = states.borrow_and_update().clone();
            info!("📣 {}", state);
        }
    });
}

fn spawn_block_watcher(reader: Arc<L1Reader>, cancel_token: CancellationToken) {
    let (watcher, mut blocks) = BlockWatcher::new(reader, BLOCK_WATCHER_POLL, cancel_token);
    tokio::spawn(watcher.run());
    tokio::spawn(async move {
        while blocks.changed().await.is_ok() {
            if let Some(block) = *blocks.borrow_and_update() {
                info!("⛓️ Chain head at block {}", block);
            }
        }
    });
}

async fn wait_for_the_termination(
    cancel_token: CancellationToken,
    rescue_task: JoinHandle<SubmissionState>,
    session: &RescueSession,
) -> Result<SubmissionState, Error> {
    info!("Starting signal handler...");
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to set up SIGTERM handler: {}", e))?;
    let abort = rescue_task.abort_handle();

    tokio::select! {
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down...");
            cancel_token.cancel();
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
            cancel_token.cancel();
        }
        result = rescue_task => {
            return result.map_err(|e| anyhow::anyhow!("Rescue task failed: {}", e));
        }
    }

    // The loop stops at its next cancellation point; pending funding calls are dropped.
    tokio::time::sleep(Duration::from_secs(1)).await;
    abort.abort();
    Ok(session.state())
}
