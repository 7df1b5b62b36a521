//! 库存扣减 (stock deduction service)

use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, instrument};

use super::{CollabResult, CollaboratorError, StockDeduction};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// `POST {base}/establishments/{id}/orders/{order_id}/deduct`
#[derive(Debug, Clone)]
pub struct HttpStockDeduction {
    base_url: String,
    client: reqwest::Client,
}

impl HttpStockDeduction {
    pub fn new(base_url: impl Into<String>) -> CollabResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn endpoint(&self, establishment_id: &str, order_id: &str) -> String {
        format!(
            "{}/establishments/{}/orders/{}/deduct",
            self.base_url, establishment_id, order_id
        )
    }
}

#[async_trait]
impl StockDeduction for HttpStockDeduction {
    #[instrument(skip(self))]
    async fn deduct(&self, establishment_id: &str, order_id: &str) -> CollabResult<()> {
        let resp = self
            .client
            .post(self.endpoint(establishment_id, order_id))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(CollaboratorError::Request(format!(
                "Stock deduction failed: {} - {}",
                status, text
            )));
        }

        info!("Stock deducted");
        Ok(())
    }
}

/// Used when no stock service is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledStockDeduction;

#[async_trait]
impl StockDeduction for DisabledStockDeduction {
    async fn deduct(&self, _establishment_id: &str, order_id: &str) -> CollabResult<()> {
        tracing::debug!(order_id = %order_id, "Stock service not configured, deduction skipped");
        Ok(())
    }
}
