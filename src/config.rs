use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_token: String,
    /// Secret API key for the payment gateway.
    pub gateway_secret_key: String,
    /// Shared secret for verifying gateway webhook signatures.
    pub gateway_webhook_secret: String,
    /// Auth token of the voice-assistant provider; empty disables signature
    /// checks on /webhook/voice (dev mode).
    pub voice_auth_token: String,
    pub currency: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "housecall.db".to_string()),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            gateway_secret_key: env::var("GATEWAY_SECRET_KEY").unwrap_or_default(),
            gateway_webhook_secret: env::var("GATEWAY_WEBHOOK_SECRET").unwrap_or_default(),
            voice_auth_token: env::var("VOICE_AUTH_TOKEN").unwrap_or_default(),
            currency: env::var("CURRENCY").unwrap_or_else(|_| "usd".to_string()),
        }
    }
}
