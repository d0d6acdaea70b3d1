use std::{env, net::SocketAddr, path::PathBuf};

use url::Url;

use crate::error::AppError;
use crate::services::rates::DEFAULT_BUSINESS_RATE;

pub const DEFAULT_RATES_URL: &str = "https://www.irs.gov/tax-professionals/standard-mileage-rates";
pub const DEFAULT_ORS_BASE_URL: &str = "https://api.openrouteservice.org";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub mileage_rate: f64,
    pub rates_url: Option<Url>,
    pub ors_api_key: Option<String>,
    pub ors_base_url: Url,
    pub cookie_secret: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let listen_addr: SocketAddr = env::var("APP_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse()
            .map_err(|err| AppError::Config(format!("invalid APP_LISTEN_ADDR: {err}")))?;

        let data_dir = env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));

        let mileage_rate: f64 = env::var("MILEAGE_RATE")
            .unwrap_or_else(|_| DEFAULT_BUSINESS_RATE.to_string())
            .parse()
            .map_err(|err| AppError::Config(format!("invalid MILEAGE_RATE: {err}")))?;
        if !mileage_rate.is_finite() || mileage_rate < 0.0 {
            return Err(AppError::Config(format!(
                "invalid MILEAGE_RATE: {mileage_rate} is not a usable rate"
            )));
        }

        // Set IRS_RATES_URL to an empty string to skip the startup fetch.
        let rates_url = env::var("IRS_RATES_URL").unwrap_or_else(|_| DEFAULT_RATES_URL.to_string());
        let rates_url = if rates_url.trim().is_empty() {
            None
        } else {
            Some(
                Url::parse(&rates_url)
                    .map_err(|err| AppError::Config(format!("invalid IRS_RATES_URL: {err}")))?,
            )
        };

        let ors_api_key = env::var("ORS_API_KEY")
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());

        let ors_base_url = env::var("ORS_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_ORS_BASE_URL.to_string());
        let ors_base_url = Url::parse(&ors_base_url)
            .map_err(|err| AppError::Config(format!("invalid ORS_BASE_URL: {err}")))?;

        let cookie_secret = env::var("COOKIE_SECRET")
            .unwrap_or_else(|_| "change-me-super-secret-triplog-cookie".to_string());

        Ok(Self {
            listen_addr,
            data_dir,
            mileage_rate,
            rates_url,
            ors_api_key,
            ors_base_url,
            cookie_secret,
        })
    }
}
