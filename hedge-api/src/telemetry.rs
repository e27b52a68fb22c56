use hedge_types::TriggerReason;
use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ConversionLabels {
    pub reason: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct OutcomeLabels {
    pub outcome: String,
}

/// Counters exposed at `GET /metrics`.
pub struct Telemetry {
    registry: Registry,
    setups: Family<OutcomeLabels, Counter>,
    conversions: Family<ConversionLabels, Counter>,
    evaluations: Family<OutcomeLabels, Counter>,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl Telemetry {
    pub fn new() -> Self {
        let mut registry = Registry::with_prefix("hedge");
        let setups = Family::<OutcomeLabels, Counter>::default();
        let conversions = Family::<ConversionLabels, Counter>::default();
        let evaluations = Family::<OutcomeLabels, Counter>::default();
        registry.register("setup_submissions", "Protection setups submitted", setups.clone());
        registry.register("conversions", "Conversions executed", conversions.clone());
        registry.register("trigger_evaluations", "Trigger evaluations served", evaluations.clone());
        Self { registry, setups, conversions, evaluations }
    }

    pub fn setup(&self, ok: bool) {
        let outcome = if ok { "accepted" } else { "rejected" };
        self.setups.get_or_create(&OutcomeLabels { outcome: outcome.to_string() }).inc();
    }

    pub fn conversion(&self, reason: TriggerReason) {
        self.conversions
            .get_or_create(&ConversionLabels { reason: reason.to_string() })
            .inc();
    }

    pub fn evaluation(&self, triggered: bool) {
        let outcome = if triggered { "triggered" } else { "quiet" };
        self.evaluations.get_or_create(&OutcomeLabels { outcome: outcome.to_string() }).inc();
    }

    /// OpenMetrics text exposition.
    pub fn render(&self) -> Result<String, std::fmt::Error> {
        let mut out = String::new();
        encode(&mut out, &self.registry)?;
        Ok(out)
    }
}
