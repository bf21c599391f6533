//! Billing configuration.

/// Key id sentinel that enables mock verification. Only honored when
/// [`BillingConfig::allow_mock_gateway`] is also set; production configs
/// fail closed on either condition.
pub const MOCK_GATEWAY_KEY_ID: &str = "gw_test_mock";

/// A purchasable subscription plan. Amounts are authoritative here — the
/// catalog, not the client, prices every order.
#[derive(Debug, Clone)]
pub struct PlanSpec {
    /// Catalog code, e.g. `Pro`.
    pub code: String,
    /// Price in minor currency units.
    pub amount: i64,
    /// Subscription period granted per payment.
    pub period_days: i64,
}

/// Configuration for the payment ledger.
#[derive(Debug, Clone)]
pub struct BillingConfig {
    /// Gateway key id — public, returned to clients for checkout.
    pub gateway_key_id: String,
    /// Gateway shared secret used for callback signature verification.
    /// Never logged, never returned.
    pub gateway_key_secret: String,
    /// ISO currency code for all orders (default: `INR`).
    pub currency: String,
    /// Subscription plan catalog.
    pub plans: Vec<PlanSpec>,
    /// Explicit opt-in for mock gateway verification. Must be `false` in
    /// production deployments.
    pub allow_mock_gateway: bool,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            gateway_key_id: String::new(),
            gateway_key_secret: String::new(),
            currency: "INR".into(),
            plans: vec![
                PlanSpec {
                    code: "Basic".into(),
                    amount: 49_900,
                    period_days: 30,
                },
                PlanSpec {
                    code: "Pro".into(),
                    amount: 149_900,
                    period_days: 30,
                },
                PlanSpec {
                    code: "Enterprise".into(),
                    amount: 299_900,
                    period_days: 30,
                },
            ],
            allow_mock_gateway: false,
        }
    }
}

impl BillingConfig {
    /// Look up a plan by catalog code.
    pub fn plan(&self, code: &str) -> Option<&PlanSpec> {
        self.plans.iter().find(|p| p.code == code)
    }

    /// Whether mock verification is active: requires both the explicit
    /// flag and the sentinel key id.
    pub fn mock_gateway_active(&self) -> bool {
        self.allow_mock_gateway && self.gateway_key_id == MOCK_GATEWAY_KEY_ID
    }
}
