//! Lightning wallet client. Donation invoices are created on behalf of the
//! project's recipient wallet and polled until paid or expired.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

pub mod graphql;

use graphql::{
    CreateInvoiceData, GraphqlRequest, GraphqlResponse, InvoiceStatusData,
    CREATE_INVOICE_MUTATION, INVOICE_STATUS_QUERY,
};

const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("GraphQL error: {0}")]
    Graphql(String),

    #[error("Response carried no data")]
    MissingData,

    #[error("Wallet returned no invoice")]
    EmptyInvoice,

    #[error("Unexpected invoice status '{0}'")]
    UnexpectedStatus(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoice {
    pub payment_request: String,
    pub payment_hash: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceStatus {
    Pending,
    Paid,
    Expired,
}

/// The wallet operations the donation flow depends on.
///
/// Carried in `AppState` as `Arc<dyn LightningWallet>`.
#[async_trait]
pub trait LightningWallet: Send + Sync {
    async fn create_invoice(&self, amount_sats: i64, memo: &str) -> Result<Invoice, WalletError>;

    async fn invoice_status(&self, payment_request: &str) -> Result<InvoiceStatus, WalletError>;
}

/// Blink GraphQL client paying into a single recipient wallet.
#[derive(Clone)]
pub struct BlinkWallet {
    client: Client,
    api_url: String,
    api_key: Option<String>,
    recipient_wallet_id: String,
}

impl BlinkWallet {
    pub fn new(
        api_url: String,
        api_key: Option<String>,
        recipient_wallet_id: String,
    ) -> Result<Self, WalletError> {
        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(20)).build()?,
            api_url,
            api_key,
            recipient_wallet_id,
        })
    }

    /// Posts a GraphQL document. Retries transport failures and 5xx with backoff.
    async fn execute<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<GraphqlResponse<T>, WalletError> {
        let body = GraphqlRequest { query, variables };
        let mut last_error: Option<WalletError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = Duration::from_millis(500 * (1 << (attempt - 1)));
                warn!(
                    "Wallet call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let mut request = self.client.post(&self.api_url).json(&body);
            if let Some(key) = &self.api_key {
                request = request.header("X-API-KEY", key);
            }

            let response = match request.send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(WalletError::Http(e));
                    continue;
                }
            };

            let status = response.status();
            if status.is_server_error() {
                let message = response.text().await.unwrap_or_default();
                last_error = Some(WalletError::Api {
                    status: status.as_u16(),
                    message,
                });
                continue;
            }
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(WalletError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            return Ok(response.json().await?);
        }

        Err(last_error.unwrap_or(WalletError::MissingData))
    }
}

#[async_trait]
impl LightningWallet for BlinkWallet {
    async fn create_invoice(&self, amount_sats: i64, memo: &str) -> Result<Invoice, WalletError> {
        let variables = json!({
            "input": {
                "recipientWalletId": self.recipient_wallet_id,
                "amount": amount_sats,
                "memo": memo,
            }
        });
        let response = self
            .execute::<CreateInvoiceData>(CREATE_INVOICE_MUTATION, variables)
            .await?;
        let invoice = graphql::parse_create_invoice(response)?;
        debug!("Created invoice {} for {amount_sats} sats", invoice.payment_hash);
        Ok(invoice)
    }

    async fn invoice_status(&self, payment_request: &str) -> Result<InvoiceStatus, WalletError> {
        let variables = json!({ "input": { "paymentRequest": payment_request } });
        let response = self
            .execute::<InvoiceStatusData>(INVOICE_STATUS_QUERY, variables)
            .await?;
        graphql::parse_invoice_status(response)
    }
}
