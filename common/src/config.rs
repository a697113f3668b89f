use anyhow::Error;
use std::fmt;
use tracing::{info, warn};

/// Configuration section specific to a binary built on top of the common stack.
pub trait ConfigTrait: Sized {
    fn read_env_variables() -> Result<Self, Error>;
}

pub fn address_parse_error(
    env_var: &str,
    err: impl fmt::Display,
    value: &str,
) -> anyhow::Error {
    anyhow::anyhow!("Failed to parse {env_var} address '{value}': {err}")
}

#[derive(Clone)]
pub struct Config<T> {
    pub l1_rpc_urls: Vec<String>,
    pub enable_metrics: bool,
    pub metrics_port: u16,
    pub specific_config: T,
}

impl<T: ConfigTrait + fmt::Display> Config<T> {
    pub fn read_env_variables() -> Result<Self, Error> {
        if let Err(e) = dotenvy::dotenv() {
            warn!("No .env file loaded: {}", e);
        }

        const L1_RPC_URLS: &str = "L1_RPC_URLS";
        let l1_rpc_urls: Vec<String> = std::env::var(L1_RPC_URLS)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", L1_RPC_URLS, e))?
            .split(',')
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .collect();
        if l1_rpc_urls.is_empty() {
            anyhow::bail!("{} must contain at least one URL", L1_RPC_URLS);
        }

        let enable_metrics = std::env::var("ENABLE_METRICS")
            .unwrap_or("true".to_string())
            .parse::<bool>()
            .map_err(|e| anyhow::anyhow!("ENABLE_METRICS must be a boolean: {}", e))?;

        let metrics_port = std::env::var("METRICS_PORT")
            .unwrap_or("9898".to_string())
            .parse::<u16>()
            .map_err(|e| anyhow::anyhow!("METRICS_PORT must be a port number: {}", e))?;

        let specific_config = T::read_env_variables()?;

        let config = Self {
            l1_rpc_urls,
            enable_metrics,
            metrics_port,
            specific_config,
        };
        info!("Startup config:\n{}", config);

        Ok(config)
    }
}

impl<T: fmt::Display> fmt::Display for Config<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "l1_rpc_urls: {}", self.l1_rpc_urls.len())?;
        writeln!(
            f,
            "metrics: {} (port {})",
            self.enable_metrics, self.metrics_port
        )?;
        write!(f, "{}", self.specific_config)
    }
}
