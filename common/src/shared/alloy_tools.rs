use crate::signer::Signer;
use alloy::{
    network::{Ethereum, EthereumWallet},
    primitives::B256,
    providers::{DynProvider, Provider, ProviderBuilder, WsConnect, ext::DebugApi},
    pubsub::PubSubConnect,
    rpc::client::RpcClient,
    rpc::types::{TransactionRequest, trace::geth::GethDebugTracingOptions},
    transports::{
        BoxTransport, Transport,
        http::{Http, reqwest::Url},
        layers::FallbackLayer,
    },
};
use anyhow::Error;
use futures_util::future;
use std::num::NonZeroUsize;
use tower::ServiceBuilder;
use tracing::{debug, warn};

const TRACE_ERROR_MARKER: &str = "error: Some(";

/// Explains why a mined transaction reverted.
///
/// The call is replayed at its block to recover the revert reason, and errors
/// found in the debug trace are appended. Never fails: missing data only makes
/// the message shorter.
pub async fn check_for_revert_reason<P: Provider<Ethereum>>(
    provider: &P,
    tx_hash: B256,
    block_number: u64,
) -> String {
    let trace_text;
    let trace_errors = match provider
        .debug_trace_transaction(tx_hash, GethDebugTracingOptions::default())
        .await
    {
        Ok(trace) => {
            trace_text = format!("{trace:?}");
            errors_in_trace(&trace_text)
        }
        Err(e) => {
            debug!("No debug trace for {}: {}", tx_hash, e);
            Vec::new()
        }
    };

    let Ok(Some(tx)) = provider.get_transaction_by_hash(tx_hash).await else {
        return format!("Transaction {tx_hash} failed");
    };

    let replay = provider
        .call(TransactionRequest::from_transaction(tx))
        .block(block_number.into())
        .await;
    let reason = match replay {
        Err(e) => e.to_string(),
        Ok(output) => format!("Unknown revert reason: {output}"),
    };

    if trace_errors.is_empty() {
        format!("Transaction {tx_hash} failed: {reason}")
    } else {
        format!(
            "Transaction {tx_hash} failed: {reason}, errors from debug trace: {}",
            trace_errors.join(", ")
        )
    }
}

/// Every `error: Some(..)` fragment of a debug-formatted call trace, in order.
fn errors_in_trace(trace: &str) -> Vec<&str> {
    trace
        .match_indices(TRACE_ERROR_MARKER)
        .filter_map(|(start, _)| {
            trace[start..]
                .find(')')
                .map(|close| &trace[start..=start + close])
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RpcScheme {
    WebSocket,
    Http,
}

impl RpcScheme {
    fn of(urls: &[String]) -> Result<Self, Error> {
        let is_ws = |url: &String| url.starts_with("ws://") || url.starts_with("wss://");
        let is_http = |url: &String| url.starts_with("http://") || url.starts_with("https://");

        if urls.is_empty() {
            anyhow::bail!("No RPC URL given");
        }
        if urls.iter().all(is_ws) {
            Ok(RpcScheme::WebSocket)
        } else if urls.iter().all(is_http) {
            Ok(RpcScheme::Http)
        } else {
            anyhow::bail!(
                "Invalid RPC URL list: only websocket or only HTTP URLs are supported, not a mix ({} URLs given)",
                urls.len()
            )
        }
    }
}

/// Provider that fills and signs transactions with the given signer.
/// Several URLs are combined behind a fallback layer.
pub async fn construct_alloy_provider(
    signer: &Signer,
    execution_rpc_urls: &[String],
) -> Result<DynProvider, Error> {
    let scheme = RpcScheme::of(execution_rpc_urls)?;
    debug!(
        "Creating {:?} alloy provider for {} with {} URL(s)",
        scheme,
        signer.address(),
        execution_rpc_urls.len()
    );

    let transports = match scheme {
        RpcScheme::WebSocket => websocket_transports(execution_rpc_urls).await?,
        RpcScheme::Http => http_transports(execution_rpc_urls)?,
    };
    let active = NonZeroUsize::new(transports.len())
        .ok_or_else(|| anyhow::anyhow!("No usable RPC transport"))?;
    let client = RpcClient::builder().transport(
        ServiceBuilder::new()
            .layer(FallbackLayer::default().with_active_transport_count(active))
            .service(transports),
        false,
    );

    Ok(ProviderBuilder::new()
        .wallet(EthereumWallet::from(signer.local().clone()))
        .connect_client(client)
        .erased())
}

/// Unreachable endpoints are skipped as long as one connects.
async fn websocket_transports(urls: &[String]) -> Result<Vec<BoxTransport>, Error> {
    let connections = urls.iter().enumerate().map(|(idx, url)| async move {
        WsConnect::new(url)
            .into_service()
            .await
            .inspect(|_| debug!("Connected to websocket #{idx}"))
            .inspect_err(|e| warn!("Failed to connect to websocket #{idx}: {e}"))
    });

    let transports: Vec<BoxTransport> = future::join_all(connections)
        .await
        .into_iter()
        .filter_map(Result::ok)
        .map(Transport::boxed)
        .collect();

    if transports.is_empty() {
        anyhow::bail!("No websocket connection could be established");
    }
    Ok(transports)
}

fn http_transports(urls: &[String]) -> Result<Vec<BoxTransport>, Error> {
    urls.iter()
        .map(|url| {
            Url::parse(url)
                .map(|url| Http::<reqwest::Client>::new(url).boxed())
                .map_err(|e| anyhow::anyhow!("Invalid HTTP RPC URL: {e}"))
        })
        .collect()
}
