use std::time::Duration;

use regex::Regex;
use reqwest::Client;
use tracing::{info, warn};
use url::Url;

pub const DEFAULT_BUSINESS_RATE: f64 = 0.70;

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

// Resolved once at startup; anything going wrong falls back to the
// configured default so the app always starts.
pub struct RateService {
    http: Client,
    default_rate: f64,
    rates_url: Option<Url>,
}

impl RateService {
    pub fn new(http: Client, default_rate: f64, rates_url: Option<Url>) -> Self {
        Self {
            http,
            default_rate,
            rates_url,
        }
    }

    pub async fn resolve(&self) -> f64 {
        let Some(url) = &self.rates_url else {
            return self.default_rate;
        };
        match self.fetch_page(url).await {
            Ok(page) => match parse_business_rate(&page) {
                Some(rate) => {
                    info!(rate, "using published IRS business mileage rate");
                    rate
                }
                None => {
                    warn!(
                        default_rate = self.default_rate,
                        "business rate not found on the rates page, using configured default"
                    );
                    self.default_rate
                }
            },
            Err(err) => {
                warn!(
                    error = %err,
                    default_rate = self.default_rate,
                    "could not fetch the rates page, using configured default"
                );
                self.default_rate
            }
        }
    }

    async fn fetch_page(&self, url: &Url) -> Result<String, reqwest::Error> {
        self.http
            .get(url.clone())
            .timeout(FETCH_TIMEOUT)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

// The published page wraps lines mid-sentence, so collapse whitespace
// before matching.
pub fn parse_business_rate(page: &str) -> Option<f64> {
    let collapse = Regex::new(r"\s+").ok()?;
    let flat = collapse.replace_all(page, " ");
    let pattern = Regex::new(r"(?i)Self-employed and business:\s*(\d+)\s*cents/mile").ok()?;
    let cents: f64 = pattern.captures(&flat)?.get(1)?.as_str().parse().ok()?;
    Some(cents / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rate_across_wrapped_lines() {
        let page = "<li>Self-employed\n    and business:\n    70 cents/mile</li>";
        assert_eq!(parse_business_rate(page), Some(0.70));
    }

    #[test]
    fn parse_is_case_insensitive() {
        let page = "SELF-EMPLOYED AND BUSINESS: 67 CENTS/MILE";
        assert_eq!(parse_business_rate(page), Some(0.67));
    }

    #[test]
    fn first_listed_rate_wins() {
        let page = "Self-employed and business: 70 cents/mile \
                    (2025) Self-employed and business: 67 cents/mile (2024)";
        assert_eq!(parse_business_rate(page), Some(0.70));
    }

    #[test]
    fn page_without_rate_parses_to_none() {
        assert_eq!(parse_business_rate("<html>maintenance window</html>"), None);
    }

    #[tokio::test]
    async fn no_rates_url_resolves_to_default() {
        let service = RateService::new(Client::new(), 0.655, None);
        assert_eq!(service.resolve().await, 0.655);
    }
}
