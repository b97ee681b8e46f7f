//! HTTP client for the earnings-filing financial-data service (C4).

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{RetryConfig, ServiceConfig};
use crate::error::{FinancialDataError, Result};
use crate::financial::statement::{CompleteFinancialBundle, FinancialStatement};
use crate::net::{retry_with_backoff, Classified};
use crate::period::normalize_period;

#[derive(Debug, Serialize)]
struct StatementRequest<'a> {
    stock_code: &'a str,
    report_period: &'a str,
    report_type: &'a str,
}

#[derive(Debug, Serialize)]
struct HistoricalPeriodsRequest<'a> {
    stock_code: &'a str,
    before: &'a str,
    count: u32,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    success: bool,
    data: Option<Value>,
    #[serde(default)]
    message: Option<String>,
}

/// Talks to the financial-data HTTP service.
pub struct FinancialDataClient {
    client: reqwest::Client,
    base_url: String,
    retry: RetryConfig,
}

impl FinancialDataClient {
    /// Builds a client from configuration. Does not perform a health check
    /// eagerly; call [`Self::health_check`] if one is needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &ServiceConfig, retry: RetryConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(FinancialDataError::from)?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            retry,
        })
    }

    /// Confirms the service is reachable.
    ///
    /// # Errors
    ///
    /// Returns an error if the service does not respond successfully.
    pub async fn health_check(&self) -> Result<()> {
        self.client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .map_err(FinancialDataError::from)?
            .error_for_status()
            .map_err(FinancialDataError::from)?;
        Ok(())
    }

    /// Fetches the income statement for `stock_code`/`report_period`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::ErrorKind::NotFound`] if the upstream
    /// reports no data, or a transport/upstream error otherwise.
    pub async fn income_statement(
        &self,
        stock_code: &str,
        report_period: &str,
        report_type: &str,
    ) -> Result<Option<FinancialStatement>> {
        self.fetch_statement(
            "income-statement",
            stock_code,
            report_period,
            report_type,
        )
        .await
    }

    /// Fetches the balance sheet for `stock_code`/`report_period`.
    ///
    /// # Errors
    ///
    /// See [`Self::income_statement`].
    pub async fn balance_sheet(
        &self,
        stock_code: &str,
        report_period: &str,
        report_type: &str,
    ) -> Result<Option<FinancialStatement>> {
        self.fetch_statement("balance-sheet", stock_code, report_period, report_type)
            .await
    }

    /// Fetches the cash flow statement for `stock_code`/`report_period`.
    ///
    /// # Errors
    ///
    /// See [`Self::income_statement`].
    pub async fn cash_flow(
        &self,
        stock_code: &str,
        report_period: &str,
        report_type: &str,
    ) -> Result<Option<FinancialStatement>> {
        self.fetch_statement("cash-flow", stock_code, report_period, report_type)
            .await
    }

    async fn fetch_statement(
        &self,
        endpoint: &str,
        stock_code: &str,
        report_period: &str,
        report_type: &str,
    ) -> Result<Option<FinancialStatement>> {
        let period = normalize_period(report_period).map_err(|e| FinancialDataError::InvalidPeriod(e.to_string()))?;
        let body = StatementRequest {
            stock_code,
            report_period: &period,
            report_type,
        };
        let envelope = self.call(endpoint, &body).await?;
        Ok(parse_statement(envelope))
    }

    /// Fetches up to `count` historical report periods before `before`.
    ///
    /// # Errors
    ///
    /// Returns a transport/upstream error; an empty history is not an
    /// error, it is an empty vector.
    pub async fn historical_periods(&self, stock_code: &str, before: &str, count: u32) -> Result<Vec<String>> {
        let before = normalize_period(before).map_err(|e| FinancialDataError::InvalidPeriod(e.to_string()))?;
        let body = HistoricalPeriodsRequest {
            stock_code,
            before: &before,
            count,
        };
        let envelope = self.call("historical-periods", &body).await?;
        match envelope {
            Some(Value::Array(items)) => Ok(items
                .into_iter()
                .filter_map(|v| v.as_str().map(ToString::to_string))
                .collect()),
            _ => Ok(Vec::new()),
        }
    }

    /// Fetches the composite bundle: current-period three statements plus,
    /// when available, one prior period's three statements.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::ErrorKind::NotFound`] when the current
    /// period has no data at all.
    pub async fn complete_financial_data(
        &self,
        stock_code: &str,
        report_period: &str,
        report_type: &str,
    ) -> Result<CompleteFinancialBundle> {
        let period = normalize_period(report_period).map_err(|e| FinancialDataError::InvalidPeriod(e.to_string()))?;
        let body = StatementRequest {
            stock_code,
            report_period: &period,
            report_type,
        };
        let envelope = self.call("complete-data", &body).await?;
        let Some(data) = envelope else {
            return Err(FinancialDataError::NotFound {
                stock_code: stock_code.to_string(),
                report_period: period,
            }
            .into());
        };

        let bundle: CompleteFinancialBundle = serde_json::from_value(data)
            .map_err(|e| FinancialDataError::Decode(e.to_string()))?;
        Ok(bundle)
    }

    async fn call<B: Serialize + ?Sized>(&self, endpoint: &str, body: &B) -> Result<Option<Value>> {
        let url = format!("{}/api/{endpoint}", self.base_url);

        let outcome = retry_with_backoff(&self.retry, |_attempt| async {
            let response = match self.client.post(&url).json(body).send().await {
                Ok(r) => r,
                Err(e) => return Err(Classified::Retry(FinancialDataError::from(e))),
            };

            let status = response.status();
            if status.is_server_error() || status.as_u16() == 429 {
                let message = response.text().await.unwrap_or_default();
                return Err(Classified::Retry(FinancialDataError::Upstream {
                    status: status.as_u16(),
                    message,
                }));
            }
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(Classified::Fatal(FinancialDataError::Upstream {
                    status: status.as_u16(),
                    message,
                }));
            }

            match response.json::<Envelope>().await {
                Ok(envelope) => Ok(envelope),
                Err(e) => Err(Classified::Fatal(FinancialDataError::from(e))),
            }
        })
        .await;

        let envelope = outcome.map_err(|exhausted| {
            if exhausted.attempts > 1 {
                FinancialDataError::RetriesExhausted {
                    attempts: exhausted.attempts,
                    reason: exhausted.error.to_string(),
                }
            } else {
                exhausted.error
            }
        })?;

        if envelope.success {
            Ok(envelope.data)
        } else {
            Ok(None)
        }
    }
}

fn parse_statement(data: Option<Value>) -> Option<FinancialStatement> {
    let data = data?;
    let raw: HashMap<String, Value> = serde_json::from_value(data).ok()?;
    Some(FinancialStatement::from_wire(&raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_statement_missing_data_is_none() {
        assert!(parse_statement(None).is_none());
    }

    #[test]
    fn test_parse_statement_parses_known_fields() {
        let data = serde_json::json!({"revenue": "100.00"});
        let statement = parse_statement(Some(data)).unwrap();
        assert!(statement.get("revenue").is_some());
    }
}
