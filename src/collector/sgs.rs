use crate::config::CollectionConfig;
use crate::core::data::{DateWindow, Observation};
use crate::core::traits::SeriesSource;
use crate::utils::error::{AppError, AppResult};
use crate::utils::format::{parse_bcb_date, parse_bcb_value};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Raw record of the SGS JSON payload
#[derive(Debug, Deserialize)]
struct SgsRecord {
    data: String,
    valor: String,
}

/// HTTP client for the BCB SGS time-series API
pub struct SgsClient {
    client: Client,
    base_url: String,
    max_retries: u32,
    delay: Duration,
}

impl SgsClient {
    pub fn new(config: &CollectionConfig) -> AppResult<Self> {
        Ok(Self {
            client: Client::builder()
                .user_agent(concat!("bcbcast/", env!("CARGO_PKG_VERSION")))
                .timeout(config.timeout())
                .build()
                .map_err(|e| AppError::Network(format!("Failed to create HTTP client: {}", e)))?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_retries: config.max_retries,
            delay: config.delay(),
        })
    }

    pub fn series_url(&self, series_id: u32, window: Option<&DateWindow>) -> String {
        let mut url = format!("{}.{}/dados?formato=json", self.base_url, series_id);
        if let Some(window) = window {
            url.push_str(&format!(
                "&dataInicial={}&dataFinal={}",
                window.start_param(),
                window.end_param()
            ));
        }
        url
    }

    /// GET with linear backoff. An empty payload counts as a failed attempt,
    /// a payload that is not JSON aborts immediately.
    async fn get_with_retry(&self, url: &str) -> AppResult<String> {
        let mut last_error = AppError::Network(format!("No response from {}", url));

        for attempt in 0..=self.max_retries {
            debug!(attempt = attempt + 1, url, "requesting SGS series");

            match self.get_once(url).await {
                Ok(body) if !is_empty_payload(&body) => return Ok(body),
                Ok(_) => {
                    warn!(url, "empty response from SGS");
                    last_error = AppError::Network(format!("Empty response from {}", url));
                }
                Err(e) => {
                    warn!(attempt = attempt + 1, error = %e, "SGS request failed");
                    last_error = e;
                }
            }

            if attempt < self.max_retries {
                tokio::time::sleep(self.delay * (attempt + 1)).await;
            }
        }

        error!(attempts = self.max_retries + 1, url, "giving up on SGS request");
        Err(last_error)
    }

    async fn get_once(&self, url: &str) -> AppResult<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::Network(format!("Failed to reach SGS: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Network(format!(
                "SGS request failed: {} - {}",
                status,
                error_text.trim()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| AppError::Network(format!("Failed to read SGS response: {}", e)))
    }

}

fn is_empty_payload(body: &str) -> bool {
    let trimmed = body.trim();
    trimmed.is_empty() || trimmed == "[]"
}

/// Decode an SGS payload, dropping records whose date or value do not parse.
/// Returns the observations and how many records were dropped.
pub fn parse_payload(body: &str) -> AppResult<(Vec<Observation>, usize)> {
    let records: Vec<SgsRecord> = serde_json::from_str(body)
        .map_err(|e| AppError::Network(format!("Failed to decode SGS payload: {}", e)))?;

    let total = records.len();
    let observations: Vec<Observation> = records
        .into_iter()
        .filter_map(|r| Some(Observation::new(parse_bcb_date(&r.data)?, parse_bcb_value(&r.valor)?)))
        .collect();
    let dropped = total - observations.len();

    Ok((observations, dropped))
}

#[async_trait]
impl SeriesSource for SgsClient {
    async fn fetch(&self, series_id: u32, window: Option<DateWindow>) -> AppResult<Vec<Observation>> {
        let url = self.series_url(series_id, window.as_ref());
        let body = self.get_with_retry(&url).await?;
        let (observations, dropped) = parse_payload(&body)?;
        if dropped > 0 {
            warn!(series_id, dropped, "dropped SGS records with unparseable values");
        }
        Ok(observations)
    }

    /// Single attempt against one IPCA observation, no retries
    async fn ping(&self) -> AppResult<()> {
        let url = format!(
            "{}.433/dados?formato=json&dataInicial=01/01/2024&dataFinal=01/01/2024",
            self.base_url
        );
        self.get_once(&url).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn client() -> SgsClient {
        SgsClient::new(&CollectionConfig::default()).unwrap()
    }

    #[test]
    fn test_series_url_without_window() {
        assert_eq!(
            client().series_url(433, None),
            "https://api.bcb.gov.br/dados/serie/bcdata.sgs.433/dados?formato=json"
        );
    }

    #[test]
    fn test_series_url_with_window() {
        let window = DateWindow::new(
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
        );
        let url = client().series_url(11, Some(&window));
        assert!(url.ends_with(".11/dados?formato=json&dataInicial=01/01/2023&dataFinal=31/12/2023"));
    }

    #[test]
    fn test_parse_payload_drops_bad_records() {
        let body = r#"[
            {"data": "01/01/2024", "valor": "0.42"},
            {"data": "01/02/2024", "valor": ""},
            {"data": "2024-03-01", "valor": "0.16"},
            {"data": "01/04/2024", "valor": "0.38"}
        ]"#;
        let (obs, dropped) = parse_payload(body).unwrap();
        assert_eq!(dropped, 2);
        assert_eq!(obs.len(), 2);
        assert_eq!(obs[1].value, 0.38);
    }

    #[test]
    fn test_parse_payload_rejects_non_json() {
        assert!(parse_payload("<html>maintenance</html>").is_err());
    }

    #[test]
    fn test_empty_payload_detection() {
        assert!(is_empty_payload(" [] "));
        assert!(is_empty_payload(""));
        assert!(!is_empty_payload(r#"[{"data":"01/01/2024","valor":"1"}]"#));
    }
}
