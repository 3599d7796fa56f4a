pub mod stripe;

use async_trait::async_trait;

/// Snapshot of a gateway-side payment intent.
#[derive(Debug, Clone)]
pub struct GatewayIntent {
    pub intent_id: String,
    /// Present on creation; the browser needs it to confirm the card.
    pub client_secret: Option<String>,
    /// Provider status string ("requires_payment_method", "processing",
    /// "succeeded", ...). Kept verbatim; only a few values matter here.
    pub status: String,
    pub latest_charge: Option<String>,
}

/// Descriptive fields attached to an intent so the charge is traceable from
/// the provider dashboard.
#[derive(Debug, Clone)]
pub struct IntentMetadata {
    pub booking_id: String,
    pub customer_email: String,
    pub description: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_intent(
        &self,
        amount_cents: i64,
        currency: &str,
        metadata: &IntentMetadata,
    ) -> anyhow::Result<GatewayIntent>;

    async fn retrieve_intent(&self, intent_id: &str) -> anyhow::Result<GatewayIntent>;

    async fn cancel_intent(&self, intent_id: &str) -> anyhow::Result<()>;

    /// Returns the provider refund id. The refund lands in the store when the
    /// provider's charge.refunded webhook arrives.
    async fn create_refund(&self, intent_id: &str) -> anyhow::Result<String>;
}
