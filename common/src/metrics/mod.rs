pub mod server;

use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use tracing::error;

pub struct Metrics {
    registry: Registry,
    simulations: IntCounter,
    simulation_failures: IntCounter,
    bundles_submitted: IntCounter,
    bundle_submission_failures: IntCounter,
    blocks_missed: IntCounter,
    bundles_included: IntCounter,
    broadcast_attempts: IntGauge,
    rescue_state: IntGauge,
    critical_errors: IntCounter,
}

fn register_counter(registry: &Registry, name: &str, help: &str) -> IntCounter {
    let counter = IntCounter::new(name, help).expect("Failed to create counter");
    registry
        .register(Box::new(counter.clone()))
        .expect("Failed to register counter");
    counter
}

fn register_gauge(registry: &Registry, name: &str, help: &str) -> IntGauge {
    let gauge = IntGauge::new(name, help).expect("Failed to create gauge");
    registry
        .register(Box::new(gauge.clone()))
        .expect("Failed to register gauge");
    gauge
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let simulations = register_counter(
            &registry,
            "bundle_simulations_total",
            "Number of bundle simulations requested from the relay",
        );
        let simulation_failures = register_counter(
            &registry,
            "bundle_simulation_failures_total",
            "Number of bundle simulations that reverted or did not pay the block producer",
        );
        let bundles_submitted = register_counter(
            &registry,
            "bundles_submitted_total",
            "Number of bundles accepted by the relay for a target block",
        );
        let bundle_submission_failures = register_counter(
            &registry,
            "bundle_submission_failures_total",
            "Number of bundle broadcasts rejected by the relay or failing in transport",
        );
        let blocks_missed = register_counter(
            &registry,
            "bundle_blocks_missed_total",
            "Number of target blocks that passed without the bundle",
        );
        let bundles_included = register_counter(
            &registry,
            "bundles_included_total",
            "Number of bundles included on chain",
        );
        let broadcast_attempts = register_gauge(
            &registry,
            "rescue_broadcast_attempts",
            "Broadcast attempts of the current rescue",
        );
        let rescue_state = register_gauge(
            &registry,
            "rescue_state",
            "Progress of the current rescue (0 not started .. 5 success, 6 failed)",
        );
        let critical_errors = register_counter(
            &registry,
            "critical_errors_total",
            "Number of critical errors",
        );

        Self {
            registry,
            simulations,
            simulation_failures,
            bundles_submitted,
            bundle_submission_failures,
            blocks_missed,
            bundles_included,
            broadcast_attempts,
            rescue_state,
            critical_errors,
        }
    }

    pub fn inc_simulations(&self) {
        self.simulations.inc();
    }

    pub fn inc_simulation_failures(&self) {
        self.simulation_failures.inc();
    }

    pub fn inc_bundles_submitted(&self) {
        self.bundles_submitted.inc();
    }

    pub fn inc_bundle_submission_failures(&self) {
        self.bundle_submission_failures.inc();
    }

    pub fn inc_blocks_missed(&self) {
        self.blocks_missed.inc();
    }

    pub fn inc_bundles_included(&self) {
        self.bundles_included.inc();
    }

    pub fn set_broadcast_attempts(&self, attempts: u64) {
        self.broadcast_attempts
            .set(i64::try_from(attempts).unwrap_or(i64::MAX));
    }

    pub fn set_rescue_state(&self, state: u8) {
        self.rescue_state.set(i64::from(state));
    }

    pub fn inc_critical_errors(&self) {
        self.critical_errors.inc();
    }

    pub fn critical_errors(&self) -> u64 {
        self.critical_errors.get()
    }

    pub fn simulations(&self) -> u64 {
        self.simulations.get()
    }

    pub fn simulation_failures(&self) -> u64 {
        self.simulation_failures.get()
    }

    pub fn bundles_submitted(&self) -> u64 {
        self.bundles_submitted.get()
    }

    pub fn blocks_missed(&self) -> u64 {
        self.blocks_missed.get()
    }

    pub fn gather(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            error!("Failed to encode metrics: {}", e);
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
