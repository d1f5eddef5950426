use crate::{
    Config,
    model::{BackgroundImage, ForecastDay, WeatherSnapshot},
    provider::{openweather::OpenWeatherProvider, unsplash::UnsplashProvider},
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::{convert::TryFrom, fmt::Debug, time::Duration};

pub mod openweather;
pub mod unsplash;

/// Fixed per-call timeout for every upstream request.
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    OpenWeather,
    Unsplash,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenWeather => "openweather",
            ProviderId::Unsplash => "unsplash",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::OpenWeather, ProviderId::Unsplash]
    }

    /// Environment variable that overrides the configured API key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            ProviderId::OpenWeather => "OPENWEATHER_API_KEY",
            ProviderId::Unsplash => "UNSPLASH_API_KEY",
        }
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "openweather" => Ok(ProviderId::OpenWeather),
            "unsplash" => Ok(ProviderId::Unsplash),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: openweather, unsplash."
            )),
        }
    }
}

/// Outcome of a failed weather lookup.
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("City not found")]
    CityNotFound,
    #[error("Invalid API key")]
    InvalidApiKey,
    #[error("Weather provider returned status {0}")]
    UpstreamError(StatusCode),
    #[error("Weather request timed out")]
    Timeout,
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<reqwest::Error> for WeatherError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            WeatherError::Timeout
        } else if err.is_decode() {
            WeatherError::InternalError(err.to_string())
        } else {
            WeatherError::NetworkError(err.to_string())
        }
    }
}

/// Outcome of a failed background image lookup.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("No images found")]
    NoImagesFound,
    #[error("Image provider returned status {0}")]
    UpstreamError(StatusCode),
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<reqwest::Error> for ImageError {
    fn from(err: reqwest::Error) -> Self {
        ImageError::InternalError(err.to_string())
    }
}

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn fetch_current(&self, city: &str) -> Result<WeatherSnapshot, WeatherError>;

    /// Up to five days, one per calendar date, in chronological order.
    async fn fetch_forecast(&self, city: &str) -> Result<Vec<ForecastDay>, WeatherError>;
}

#[async_trait]
pub trait ImageProvider: Send + Sync + Debug {
    async fn fetch_background(
        &self,
        city: &str,
        description: &str,
    ) -> Result<BackgroundImage, ImageError>;
}

/// HTTP client shared by the upstream providers.
pub fn http_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder().timeout(timeout).build()
}

/// Construct the weather provider from config.
///
/// A missing API key is not fatal here: upstream rejects the call and the
/// caller sees [`WeatherError::InvalidApiKey`].
pub fn weather_provider_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let id = ProviderId::OpenWeather;
    let api_key = config.provider_api_key(id).unwrap_or_default().to_owned();
    let mut provider = OpenWeatherProvider::new(api_key)?;
    if let Some(base_url) = config.provider_base_url(id) {
        provider = provider.with_base_url(base_url);
    }
    Ok(Box::new(provider))
}

/// Construct the image provider from config. See [`weather_provider_from_config`].
pub fn image_provider_from_config(config: &Config) -> anyhow::Result<Box<dyn ImageProvider>> {
    let id = ProviderId::Unsplash;
    let api_key = config.provider_api_key(id).unwrap_or_default().to_owned();
    let mut provider = UnsplashProvider::new(api_key)?;
    if let Some(base_url) = config.provider_base_url(id) {
        provider = provider.with_base_url(base_url);
    }
    Ok(Box::new(provider))
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn provider_id_as_str_roundtrip() {
        for id in ProviderId::all() {
            let s = id.as_str();
            let parsed = ProviderId::try_from(s).expect("roundtrip should succeed");
            assert_eq!(*id, parsed);
        }
    }

    #[test]
    fn unknown_provider_error() {
        let err = ProviderId::try_from("weatherapi").unwrap_err();
        assert!(err.to_string().contains("Unknown provider"));
    }

    #[test]
    fn providers_build_without_api_keys() {
        let cfg = Config::default();

        assert!(weather_provider_from_config(&cfg).is_ok());
        assert!(image_provider_from_config(&cfg).is_ok());
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let body = "é".repeat(150);
        let truncated = truncate_body(&body);

        assert!(truncated.ends_with("..."));
        assert!(truncated.len() <= 203);
    }

    #[test]
    fn weather_error_messages_are_client_safe() {
        assert_eq!(WeatherError::CityNotFound.to_string(), "City not found");
        assert_eq!(WeatherError::InvalidApiKey.to_string(), "Invalid API key");
    }
}
