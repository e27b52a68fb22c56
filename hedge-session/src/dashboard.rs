use crate::operation::{Operation, Tracked};
use crate::state::{Session, View};
use hedge_engine::{evaluate_snapshot, validate, validation_issues, ConfigDraft, HedgeError, TriggerDecision};
use hedge_gateway::{ContractGateway, SetupReceipt};
use hedge_oracles::MarketDataProvider;
use hedge_types::{
    Address, ConversionEvent, MarketSnapshot, ProtectionLimits, ProtectionMetrics, UserConfiguration, Window,
};
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Drives one user's session against a gateway and a market feed.
pub struct Dashboard {
    gateway: Arc<dyn ContractGateway>,
    market: Arc<dyn MarketDataProvider>,
    limits: ProtectionLimits,
    session: Arc<RwLock<Session>>,
    setup: Mutex<Option<Arc<Tracked<SetupReceipt>>>>,
}

impl Dashboard {
    pub fn new(
        gateway: Arc<dyn ContractGateway>,
        market: Arc<dyn MarketDataProvider>,
        limits: ProtectionLimits,
    ) -> Self {
        Self {
            gateway,
            market,
            limits,
            session: Arc::new(RwLock::new(Session::Disconnected)),
            setup: Mutex::new(None),
        }
    }

    pub fn limits(&self) -> &ProtectionLimits {
        &self.limits
    }

    pub async fn session(&self) -> Session {
        self.session.read().await.clone()
    }

    async fn transition<F>(&self, step: F) -> Result<Session, HedgeError>
    where
        F: FnOnce(&Session) -> Result<Session, HedgeError>,
    {
        let mut guard = self.session.write().await;
        let next = step(&guard)?;
        debug!(from = guard.name(), to = next.name(), "session transition");
        *guard = next.clone();
        Ok(next)
    }

    async fn active(&self) -> Result<(Address, UserConfiguration), HedgeError> {
        match &*self.session.read().await {
            Session::Active { address, config, .. } => Ok((address.clone(), config.clone())),
            other => Err(HedgeError::InvalidTransition {
                from: other.name(),
                action: "use the dashboard",
            }),
        }
    }

    /// Attach a wallet. Users with a stored configuration go straight to the
    /// dashboard, everyone else to the setup form. If the lookup fails the
    /// session stays connected and the call can be retried with
    /// [`Dashboard::resume`].
    pub async fn connect(&self, address: Address) -> Result<Session, HedgeError> {
        self.transition(|s| s.connect(address)).await?;
        self.resume().await
    }

    pub async fn resume(&self) -> Result<Session, HedgeError> {
        let address = match &*self.session.read().await {
            Session::Connected { address } => address.clone(),
            other => return Ok(other.clone()),
        };
        match self.gateway.query_config(&address).await? {
            Some(config) => {
                info!(user = %address.short(), currency = %config.currency, "existing protection found");
                self.transition(|s| s.activate(config)).await
            }
            None => self.transition(|s| s.begin_setup(&self.limits)).await,
        }
    }

    pub async fn edit_draft(&self, draft: ConfigDraft) -> Result<Session, HedgeError> {
        self.transition(|s| s.edit(draft)).await
    }

    /// Problems with the current draft, for display next to the form.
    pub async fn draft_issues(&self) -> Result<Vec<HedgeError>, HedgeError> {
        let draft = match &*self.session.read().await {
            Session::Configuring { draft, .. } => draft.clone(),
            other => {
                return Err(HedgeError::InvalidTransition { from: other.name(), action: "check the draft" })
            }
        };
        let supported = self.gateway.list_supported_currencies().await?;
        Ok(validation_issues(&draft, &supported, &self.limits))
    }

    /// Validate the draft and send it to the contract in the background.
    /// Only one submission may be pending at a time.
    pub async fn submit_setup(&self) -> Result<(), HedgeError> {
        let (address, draft) = match &*self.session.read().await {
            Session::Configuring { address, draft } => (address.clone(), draft.clone()),
            other => {
                return Err(HedgeError::InvalidTransition { from: other.name(), action: "submit setup" })
            }
        };

        if self.setup_in_flight() {
            return Err(HedgeError::SubmissionInFlight);
        }

        let supported = self.gateway.list_supported_currencies().await?;
        let config = validate(&draft, &supported, &self.limits)?;

        let mut slot = self
            .setup
            .lock()
            .map_err(|_| HedgeError::SubmissionError("setup slot poisoned".to_string()))?;
        if slot.as_ref().map(|op| op.is_pending()).unwrap_or(false) {
            return Err(HedgeError::SubmissionInFlight);
        }

        info!(
            user = %address.short(),
            currency = %config.currency,
            percentage = config.target_percentage,
            threshold = %config.threshold,
            "submitting protection setup"
        );

        let gateway = self.gateway.clone();
        let session = self.session.clone();
        let op = Tracked::spawn(async move {
            let receipt = gateway.submit_setup(&address, &config).await?;
            let mut guard = session.write().await;
            // the user may have disconnected or switched wallets meanwhile
            let still_ours = matches!(&*guard, Session::Configuring { address: a, .. } if *a == address);
            if still_ours {
                let next = guard.activate(config)?;
                *guard = next;
            } else {
                warn!(user = %address.short(), "setup confirmed after the session moved on");
            }
            Ok(receipt)
        });
        *slot = Some(Arc::new(op));
        Ok(())
    }

    fn setup_in_flight(&self) -> bool {
        self.setup
            .lock()
            .map(|slot| slot.as_ref().map(|op| op.is_pending()).unwrap_or(false))
            .unwrap_or(false)
    }

    fn current_setup(&self) -> Option<Arc<Tracked<SetupReceipt>>> {
        self.setup.lock().ok().and_then(|slot| slot.clone())
    }

    pub fn setup_status(&self) -> Operation<SetupReceipt> {
        self.current_setup().map(|op| op.status()).unwrap_or_default()
    }

    /// Wait for the pending submission, if any, and return how it ended.
    pub async fn wait_setup(&self) -> Operation<SetupReceipt> {
        match self.current_setup() {
            Some(op) => op.wait().await,
            None => Operation::Idle,
        }
    }

    pub fn cancel_setup(&self) -> bool {
        let cancelled = self.current_setup().map(|op| op.cancel()).unwrap_or(false);
        if cancelled {
            info!("setup submission cancelled");
        }
        cancelled
    }

    pub async fn show(&self, view: View) -> Result<Session, HedgeError> {
        self.transition(|s| s.show(view)).await
    }

    pub async fn back_to_setup(&self) -> Result<Session, HedgeError> {
        self.transition(|s| match s {
            Session::Active { .. } => s.begin_setup(&self.limits),
            other => Err(HedgeError::InvalidTransition { from: other.name(), action: "go back to setup" }),
        })
        .await
    }

    /// Drop the wallet from any state, abandoning a pending submission.
    pub async fn disconnect(&self) -> Session {
        self.cancel_setup();
        let mut guard = self.session.write().await;
        *guard = guard.disconnect();
        guard.clone()
    }

    pub async fn refresh_market(&self) -> Result<MarketSnapshot, HedgeError> {
        let (_, config) = self.active().await?;
        self.market.fetch(&config.currency).await
    }

    /// Weekly trigger check for the active configuration.
    pub async fn evaluate(&self) -> Result<TriggerDecision, HedgeError> {
        let (address, config) = self.active().await?;
        let snapshot = self.market.fetch(&config.currency).await?;
        let decision = evaluate_snapshot(&snapshot, Window::Week, &config)?;
        if decision.recommends_protection() {
            info!(user = %address.short(), change = %decision.change_percent, "protection recommended");
        }
        Ok(decision)
    }

    pub async fn metrics(&self, window: Window) -> Result<ProtectionMetrics, HedgeError> {
        let (address, _) = self.active().await?;
        self.gateway.query_metrics(&address, window).await
    }

    pub async fn history(&self) -> Result<Vec<ConversionEvent>, HedgeError> {
        let (address, _) = self.active().await?;
        self.gateway.conversion_history(&address).await
    }

    pub async fn deposit_salary(&self, amount: Decimal) -> Result<Option<ConversionEvent>, HedgeError> {
        let (address, _) = self.active().await?;
        self.gateway.process_salary(&address, amount).await
    }

    pub async fn convert_now(&self, amount: Decimal) -> Result<ConversionEvent, HedgeError> {
        let (address, _) = self.active().await?;
        self.gateway.convert_now(&address, amount).await
    }

    pub async fn rebalance(&self, local: Decimal, usd: Decimal) -> Result<Option<ConversionEvent>, HedgeError> {
        let (address, _) = self.active().await?;
        self.gateway.rebalance(&address, local, usd).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use hedge_gateway::{FixedClock, LedgerGateway};
    use hedge_oracles::StaticFeed;
    use hedge_storage::Ledger;
    use hedge_types::CurrencyCode;
    use rust_decimal_macros::dec;
    use std::collections::BTreeSet;
    use tokio::sync::Notify;

    const T0: u64 = 1_705_300_000;

    fn alice() -> Address {
        Address::new("GDNDD6KLDSDL3A5BGG2CIQ56E5GBVXMJCFAKBZ7J3INF4N4ETVDFUKJT")
    }

    fn ledger_gateway(market: Arc<StaticFeed>) -> LedgerGateway {
        let supported = ["MXN", "ARS"].iter().map(|c| CurrencyCode::new(c)).collect();
        LedgerGateway::new(
            Arc::new(Ledger::in_memory()),
            market,
            Arc::new(FixedClock::new(T0)),
            supported,
            ProtectionLimits::default(),
        )
    }

    /// Holds `submit_setup` until released.
    struct GatedGateway {
        inner: LedgerGateway,
        gate: Notify,
    }

    #[async_trait]
    impl ContractGateway for GatedGateway {
        async fn submit_setup(&self, user: &Address, config: &UserConfiguration) -> Result<SetupReceipt, HedgeError> {
            self.gate.notified().await;
            self.inner.submit_setup(user, config).await
        }

        async fn query_config(&self, user: &Address) -> Result<Option<UserConfiguration>, HedgeError> {
            self.inner.query_config(user).await
        }

        async fn query_metrics(&self, user: &Address, window: Window) -> Result<ProtectionMetrics, HedgeError> {
            self.inner.query_metrics(user, window).await
        }

        async fn list_supported_currencies(&self) -> Result<BTreeSet<CurrencyCode>, HedgeError> {
            self.inner.list_supported_currencies().await
        }

        async fn conversion_history(&self, user: &Address) -> Result<Vec<ConversionEvent>, HedgeError> {
            self.inner.conversion_history(user).await
        }

        async fn process_salary(&self, user: &Address, amount: Decimal) -> Result<Option<ConversionEvent>, HedgeError> {
            self.inner.process_salary(user, amount).await
        }

        async fn convert_now(&self, user: &Address, amount: Decimal) -> Result<ConversionEvent, HedgeError> {
            self.inner.convert_now(user, amount).await
        }

        async fn rebalance(
            &self,
            user: &Address,
            local_holdings: Decimal,
            usd_holdings: Decimal,
        ) -> Result<Option<ConversionEvent>, HedgeError> {
            self.inner.rebalance(user, local_holdings, usd_holdings).await
        }
    }

    fn dashboard() -> Dashboard {
        let market = Arc::new(StaticFeed::demo());
        Dashboard::new(
            Arc::new(ledger_gateway(market.clone())),
            market,
            ProtectionLimits::default(),
        )
    }

    fn gated() -> (Dashboard, Arc<GatedGateway>) {
        let market = Arc::new(StaticFeed::demo());
        let gw = Arc::new(GatedGateway { inner: ledger_gateway(market.clone()), gate: Notify::new() });
        (Dashboard::new(gw.clone(), market, ProtectionLimits::default()), gw)
    }

    fn mxn_draft() -> ConfigDraft {
        ConfigDraft {
            currency: Some(CurrencyCode::new("MXN")),
            percentage: Some(25),
            threshold: Some(dec!(2.0)),
        }
    }

    #[tokio::test]
    async fn new_user_lands_on_setup_form() {
        let dash = dashboard();
        let session = dash.connect(alice()).await.unwrap();
        assert_eq!(session.name(), "configuring");

        let issues = dash.draft_issues().await.unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field(), Some(hedge_engine::ConfigField::Currency));
    }

    #[tokio::test]
    async fn incomplete_draft_blocks_submission() {
        let dash = dashboard();
        dash.connect(alice()).await.unwrap();
        let err = dash.submit_setup().await.unwrap_err();
        assert_eq!(err.field(), Some(hedge_engine::ConfigField::Currency));
        assert_eq!(dash.setup_status(), Operation::Idle);
    }

    #[tokio::test]
    async fn setup_activates_dashboard() {
        let dash = dashboard();
        dash.connect(alice()).await.unwrap();
        dash.edit_draft(mxn_draft()).await.unwrap();
        dash.submit_setup().await.unwrap();

        let settled = dash.wait_setup().await;
        assert_eq!(settled.value().map(|r| r.threshold_bp), Some(200));
        let session = dash.session().await;
        assert!(matches!(session, Session::Active { view: View::Dashboard, .. }));

        let decision = dash.evaluate().await.unwrap();
        assert!(decision.triggered);
        assert_eq!(decision.change_percent.round_dp(2), dec!(2.77));

        let converted = dash.deposit_salary(dec!(10000)).await.unwrap();
        assert!(converted.is_some());
        assert_eq!(dash.history().await.unwrap().len(), 1);
        assert_eq!(dash.metrics(Window::Week).await.unwrap().conversion_count, 1);
    }

    #[tokio::test]
    async fn returning_user_skips_setup() {
        let market = Arc::new(StaticFeed::demo());
        let gw = Arc::new(ledger_gateway(market.clone()));
        let config = validate(
            &mxn_draft(),
            &gw.list_supported_currencies().await.unwrap(),
            &ProtectionLimits::default(),
        )
        .unwrap();
        gw.submit_setup(&alice(), &config).await.unwrap();

        let dash = Dashboard::new(gw, market, ProtectionLimits::default());
        let session = dash.connect(alice()).await.unwrap();
        assert_eq!(session.config(), Some(&config));
    }

    #[tokio::test]
    async fn second_submission_is_rejected_while_pending() {
        let (dash, gw) = gated();
        dash.connect(alice()).await.unwrap();
        dash.edit_draft(mxn_draft()).await.unwrap();

        dash.submit_setup().await.unwrap();
        assert!(dash.setup_status().is_pending());
        assert_eq!(dash.submit_setup().await.unwrap_err(), HedgeError::SubmissionInFlight);

        gw.gate.notify_one();
        assert!(matches!(dash.wait_setup().await, Operation::Resolved(_)));
        assert_eq!(dash.session().await.name(), "active");
    }

    #[tokio::test]
    async fn cancelled_submission_leaves_form_open() {
        let (dash, _gw) = gated();
        dash.connect(alice()).await.unwrap();
        dash.edit_draft(mxn_draft()).await.unwrap();
        dash.submit_setup().await.unwrap();

        assert!(dash.cancel_setup());
        assert_eq!(dash.wait_setup().await, Operation::Cancelled);
        assert_eq!(dash.session().await.name(), "configuring");

        // a fresh submission is allowed once the old one is cancelled
        dash.submit_setup().await.unwrap();
        assert!(dash.setup_status().is_pending());
    }

    #[tokio::test]
    async fn navigation_and_disconnect() {
        let dash = dashboard();
        assert!(dash.evaluate().await.is_err());

        dash.connect(alice()).await.unwrap();
        dash.edit_draft(mxn_draft()).await.unwrap();
        dash.submit_setup().await.unwrap();
        dash.wait_setup().await;

        dash.show(View::History).await.unwrap();
        let back = dash.back_to_setup().await.unwrap();
        match back {
            Session::Configuring { draft, .. } => assert_eq!(draft, mxn_draft()),
            other => panic!("unexpected {:?}", other),
        }

        assert_eq!(dash.disconnect().await, Session::Disconnected);
        assert!(matches!(
            dash.history().await,
            Err(HedgeError::InvalidTransition { from: "disconnected", .. })
        ));
    }
}
