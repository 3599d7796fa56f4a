use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;

use super::{GatewayIntent, IntentMetadata, PaymentGateway};

const API_BASE: &str = "https://api.stripe.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct StripeGateway {
    secret_key: String,
    client: reqwest::Client,
}

impl StripeGateway {
    pub fn new(secret_key: String) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build gateway HTTP client")?;
        Ok(Self { secret_key, client })
    }
}

#[derive(Deserialize)]
struct IntentObject {
    id: String,
    client_secret: Option<String>,
    status: String,
    latest_charge: Option<String>,
}

#[derive(Deserialize)]
struct RefundObject {
    id: String,
}

impl From<IntentObject> for GatewayIntent {
    fn from(obj: IntentObject) -> Self {
        GatewayIntent {
            intent_id: obj.id,
            client_secret: obj.client_secret,
            status: obj.status,
            latest_charge: obj.latest_charge,
        }
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_intent(
        &self,
        amount_cents: i64,
        currency: &str,
        metadata: &IntentMetadata,
    ) -> anyhow::Result<GatewayIntent> {
        let amount = amount_cents.to_string();
        let form = [
            ("amount", amount.as_str()),
            ("currency", currency),
            ("automatic_payment_methods[enabled]", "true"),
            ("description", metadata.description.as_str()),
            ("metadata[booking_id]", metadata.booking_id.as_str()),
            ("metadata[customer_email]", metadata.customer_email.as_str()),
        ];

        let intent: IntentObject = self
            .client
            .post(format!("{API_BASE}/payment_intents"))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await
            .context("failed to reach payment gateway")?
            .error_for_status()
            .context("gateway rejected intent creation")?
            .json()
            .await
            .context("failed to parse gateway intent response")?;

        Ok(intent.into())
    }

    async fn retrieve_intent(&self, intent_id: &str) -> anyhow::Result<GatewayIntent> {
        let intent: IntentObject = self
            .client
            .get(format!("{API_BASE}/payment_intents/{intent_id}"))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .context("failed to reach payment gateway")?
            .error_for_status()
            .context("gateway rejected intent retrieval")?
            .json()
            .await
            .context("failed to parse gateway intent response")?;

        Ok(intent.into())
    }

    async fn cancel_intent(&self, intent_id: &str) -> anyhow::Result<()> {
        self.client
            .post(format!("{API_BASE}/payment_intents/{intent_id}/cancel"))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .context("failed to reach payment gateway")?
            .error_for_status()
            .context("gateway rejected intent cancellation")?;

        Ok(())
    }

    async fn create_refund(&self, intent_id: &str) -> anyhow::Result<String> {
        let refund: RefundObject = self
            .client
            .post(format!("{API_BASE}/refunds"))
            .bearer_auth(&self.secret_key)
            .form(&[("payment_intent", intent_id)])
            .send()
            .await
            .context("failed to reach payment gateway")?
            .error_for_status()
            .context("gateway rejected refund creation")?
            .json()
            .await
            .context("failed to parse gateway refund response")?;

        Ok(refund.id)
    }
}
