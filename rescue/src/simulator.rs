use crate::{bundle::SignedBundle, error::RescueError, relay::BundleRelay};
use alloy::primitives::{U256, utils::format_units};
use common::metrics::Metrics;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationResult {
    /// Coinbase payment per unit of gas, in wei.
    pub effective_gas_price: U256,
    pub coinbase_diff: U256,
    pub total_gas_used: u64,
    pub leg_gas_used: Vec<u64>,
}

impl SimulationResult {
    pub fn effective_gas_price_gwei(&self) -> String {
        format_units(self.effective_gas_price, "gwei").unwrap_or_else(|_| "?".to_string())
    }
}

/// Runs a signed bundle through the relay. Never cached, every call asks the relay again.
pub struct BundleSimulator<R: BundleRelay> {
    relay: Arc<R>,
    metrics: Arc<Metrics>,
}

impl<R: BundleRelay> BundleSimulator<R> {
    pub fn new(relay: Arc<R>, metrics: Arc<Metrics>) -> Self {
        Self { relay, metrics }
    }

    /// Simulates for the block after `head`.
    ///
    /// A relay that cannot be reached yields `RescueError::Any`; a bundle that reverts or
    /// pays nothing to the block producer yields `RescueError::Simulation`.
    pub async fn simulate(
        &self,
        bundle: &SignedBundle,
        head: u64,
    ) -> Result<SimulationResult, RescueError> {
        self.metrics.inc_simulations();
        let response = self
            .relay
            .simulate_bundle(&bundle.raw_transactions(), head + 1)
            .await?;

        let failures: Vec<String> = response
            .legs
            .iter()
            .enumerate()
            .filter_map(|(idx, leg)| {
                leg.revert
                    .as_ref()
                    .map(|revert| format!("TX #{idx}: {revert}"))
            })
            .collect();
        if !failures.is_empty() {
            return Err(self.failed(failures.join("\n")));
        }

        let coinbase_diff = response.coinbase_diff;
        if coinbase_diff.is_zero() {
            return Err(self.failed("Does not pay coinbase".to_string()));
        }

        let leg_gas_used: Vec<u64> = response.legs.iter().map(|leg| leg.gas_used).collect();
        let Some(total_gas_used) = leg_gas_used
            .iter()
            .try_fold(0u64, |total, gas| total.checked_add(*gas))
        else {
            return Err(self.failed(format!("Gas used overflows: {leg_gas_used:?}")));
        };
        if total_gas_used == 0 {
            return Err(self.failed("Bundle used no gas".to_string()));
        }

        let result = SimulationResult {
            effective_gas_price: coinbase_diff / U256::from(total_gas_used),
            coinbase_diff,
            total_gas_used,
            leg_gas_used,
        };
        info!(
            "Simulation ok: effective gas price {} gwei over {} gas",
            result.effective_gas_price_gwei(),
            total_gas_used
        );
        Ok(result)
    }

    fn failed(&self, detail: String) -> RescueError {
        self.metrics.inc_simulation_failures();
        warn!("Simulation failed: {}", detail);
        RescueError::Simulation(detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockRelay, signed_bundle, simulation_ok};

    fn simulator(relay: MockRelay) -> (BundleSimulator<MockRelay>, Arc<Metrics>) {
        let metrics = Arc::new(Metrics::new());
        (
            BundleSimulator::new(Arc::new(relay), metrics.clone()),
            metrics,
        )
    }

    #[tokio::test]
    async fn test_gas_price_is_coinbase_diff_over_total_gas() {
        let relay = MockRelay::default();
        relay.push_simulation(Ok(simulation_ok(50_000_000_000_000_000, &[50_000, 150_000])));
        let (simulator, metrics) = simulator(relay);
        let bundle = signed_bundle(&[0, 0]).await;

        let result = simulator.simulate(&bundle, 100).await.unwrap();
        assert_eq!(result.total_gas_used, 200_000);
        assert_eq!(result.effective_gas_price, U256::from(250_000_000_000u64));
        assert_eq!(result.effective_gas_price_gwei(), "250.000000000");
        assert_eq!(metrics.simulations(), 1);
    }

    #[tokio::test]
    async fn test_simulates_against_next_block() {
        let relay = Arc::new(MockRelay::default());
        relay.push_simulation(Ok(simulation_ok(1, &[1])));
        let simulator = BundleSimulator::new(relay.clone(), Arc::new(Metrics::new()));

        simulator
            .simulate(&signed_bundle(&[0]).await, 41)
            .await
            .unwrap();
        assert_eq!(relay.simulated_blocks(), vec![42]);
    }

    #[tokio::test]
    async fn test_reverting_leg_is_reported_by_index() {
        let relay = MockRelay::default();
        let mut simulation = simulation_ok(0, &[21_000, 30_000]);
        simulation.legs[1].revert = Some("execution reverted: bad match".to_string());
        relay.push_simulation(Ok(simulation));
        let (simulator, _) = simulator(relay);

        let err = simulator
            .simulate(&signed_bundle(&[0, 0]).await, 1)
            .await
            .unwrap_err();
        let RescueError::Simulation(detail) = err else {
            panic!("expected a simulation error");
        };
        assert_eq!(detail, "TX #1: execution reverted: bad match");
    }

    #[tokio::test]
    async fn test_bundle_must_pay_coinbase() {
        let relay = MockRelay::default();
        relay.push_simulation(Ok(simulation_ok(0, &[21_000, 30_000])));
        let (simulator, metrics) = simulator(relay);

        let err = simulator
            .simulate(&signed_bundle(&[0, 0]).await, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, RescueError::Simulation(ref d) if d.contains("coinbase")));
        assert_eq!(metrics.simulations(), 1);
    }

    #[tokio::test]
    async fn test_overflowing_gas_used_is_a_simulation_failure() {
        let relay = MockRelay::default();
        relay.push_simulation(Ok(simulation_ok(1_000, &[u64::MAX, 1])));
        let (simulator, metrics) = simulator(relay);

        let err = simulator
            .simulate(&signed_bundle(&[0, 0]).await, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, RescueError::Simulation(ref d) if d.contains("overflows")));
        assert_eq!(metrics.simulation_failures(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_relay_is_not_a_simulation_failure() {
        let relay = MockRelay::default();
        relay.push_simulation(Err(anyhow::anyhow!("connection refused")));
        let (simulator, _) = simulator(relay);

        let err = simulator
            .simulate(&signed_bundle(&[0]).await, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, RescueError::Any(_)));
    }
}
