use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use crate::{
    forecast::{FORECAST_DAYS, IntervalRecord, reduce_daily},
    model::{ForecastDay, WeatherSnapshot, capitalize, mps_to_kmh, round1},
    provider::{UPSTREAM_TIMEOUT, WeatherError, http_client, truncate_body},
};

use super::WeatherProvider;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> reqwest::Result<Self> {
        Ok(Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            http: http_client(UPSTREAM_TIMEOUT)?,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> reqwest::Result<Self> {
        self.http = http_client(timeout)?;
        Ok(self)
    }

    /// GET `<base>/<endpoint>` for `city` and return the body of a 200 response.
    async fn get(&self, endpoint: &str, city: &str) -> Result<String, WeatherError> {
        let url = format!("{}/{endpoint}", self.base_url);

        let res = self
            .http
            .get(&url)
            .query(&[
                ("q", city),
                ("units", "metric"),
                ("appid", self.api_key.as_str()),
            ])
            .send()
            .await
            .inspect_err(|e| tracing::warn!(endpoint, city, error = %e, "OpenWeather request failed"))?;

        match res.status() {
            StatusCode::OK => Ok(res.text().await?),
            StatusCode::NOT_FOUND => Err(WeatherError::CityNotFound),
            StatusCode::UNAUTHORIZED => {
                tracing::error!(endpoint, "OpenWeather rejected the API key");
                Err(WeatherError::InvalidApiKey)
            }
            other => {
                let body = res.text().await.unwrap_or_default();
                tracing::warn!(
                    endpoint,
                    city,
                    status = %other,
                    body = %truncate_body(&body),
                    "OpenWeather returned an unexpected status"
                );
                Err(WeatherError::UpstreamError(other))
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct OwMain {
    temp: Option<f64>,
    feels_like: Option<f64>,
    temp_min: Option<f64>,
    temp_max: Option<f64>,
    humidity: Option<i64>,
    pressure: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct OwWeather {
    description: Option<String>,
    icon: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OwWind {
    speed: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct OwSys {
    country: Option<String>,
    sunrise: Option<i64>,
    sunset: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct OwCurrentResponse {
    name: Option<String>,
    main: Option<OwMain>,
    weather: Option<Vec<OwWeather>>,
    wind: Option<OwWind>,
    sys: Option<OwSys>,
    visibility: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct OwForecastEntry {
    dt: Option<i64>,
    dt_txt: Option<String>,
    main: Option<OwMain>,
    weather: Option<Vec<OwWeather>>,
    wind: Option<OwWind>,
}

#[derive(Debug, Default, Deserialize)]
struct OwForecastResponse {
    list: Option<Vec<OwForecastEntry>>,
}

/// `description` and `icon` of the first weather condition, with defaults.
fn condition(weather: Option<&[OwWeather]>) -> (String, String) {
    let first = weather.and_then(|w| w.first());
    let description = first
        .and_then(|w| w.description.as_deref())
        .unwrap_or("Unknown");
    let icon = first.and_then(|w| w.icon.as_deref()).unwrap_or("01d");
    (capitalize(description), icon.to_string())
}

fn local_clock(ts: Option<i64>) -> String {
    ts.filter(|ts| *ts != 0)
        .and_then(|ts| DateTime::from_timestamp(ts, 0))
        .map(|dt| dt.with_timezone(&Local).format("%I:%M %p").to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

fn snapshot_from(parsed: OwCurrentResponse, now: NaiveDateTime) -> WeatherSnapshot {
    let main = parsed.main.unwrap_or_default();
    let sys = parsed.sys.unwrap_or_default();
    let wind = parsed.wind.unwrap_or_default();
    let (description, icon) = condition(parsed.weather.as_deref());

    WeatherSnapshot {
        city: parsed.name.unwrap_or_else(|| "Unknown".to_string()),
        country: sys.country.unwrap_or_else(|| "Unknown".to_string()),
        temperature: round1(main.temp.unwrap_or(0.0)),
        feels_like: round1(main.feels_like.unwrap_or(0.0)),
        humidity: main.humidity.unwrap_or(0),
        pressure: main.pressure.unwrap_or(0),
        wind_speed: mps_to_kmh(wind.speed.unwrap_or(0.0)),
        description,
        icon,
        date: now.format("%A, %B %d, %Y").to_string(),
        time: now.format("%I:%M:%S %p").to_string(),
        sunrise: local_clock(sys.sunrise),
        sunset: local_clock(sys.sunset),
        visibility: parsed.visibility.map(|v| v / 1000.0).unwrap_or(0.0),
    }
}

impl OwForecastEntry {
    fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.dt.and_then(|dt| DateTime::from_timestamp(dt, 0)).or_else(|| {
            self.dt_txt
                .as_deref()
                .and_then(|t| NaiveDateTime::parse_from_str(t, "%Y-%m-%d %H:%M:%S").ok())
                .map(|t| t.and_utc())
        })
    }

    fn to_day(&self) -> Option<ForecastDay> {
        let at = self.timestamp()?;
        let main = self.main.as_ref();
        let (description, icon) = condition(self.weather.as_deref());

        Some(ForecastDay {
            day: at.format("%A").to_string(),
            date: at.format("%B %d").to_string(),
            temp_max: round1(main.and_then(|m| m.temp_max).unwrap_or(0.0)),
            temp_min: round1(main.and_then(|m| m.temp_min).unwrap_or(0.0)),
            humidity: main.and_then(|m| m.humidity).unwrap_or(0),
            wind_speed: mps_to_kmh(self.wind.as_ref().and_then(|w| w.speed).unwrap_or(0.0)),
            description,
            icon,
        })
    }
}

impl IntervalRecord for OwForecastEntry {
    fn date(&self) -> Option<NaiveDate> {
        self.timestamp().map(|t| t.date_naive())
    }

    fn is_noon(&self) -> bool {
        self.dt_txt.as_deref().and_then(|t| t.split(' ').nth(1)) == Some("12:00:00")
    }
}

fn forecast_from(parsed: &OwForecastResponse) -> Vec<ForecastDay> {
    let entries = parsed.list.as_deref().unwrap_or_default();
    reduce_daily(entries, FORECAST_DAYS)
        .into_iter()
        .filter_map(OwForecastEntry::to_day)
        .collect()
}

fn decode<T: serde::de::DeserializeOwned>(body: &str, what: &str) -> Result<T, WeatherError> {
    serde_json::from_str(body).map_err(|e| {
        tracing::error!(error = %e, body = %truncate_body(body), "Failed to parse OpenWeather {what} JSON");
        WeatherError::InternalError(format!("Failed to parse OpenWeather {what} JSON"))
    })
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn fetch_current(&self, city: &str) -> Result<WeatherSnapshot, WeatherError> {
        let body = self.get("weather", city).await?;
        let parsed: OwCurrentResponse = decode(&body, "current")?;
        Ok(snapshot_from(parsed, Local::now().naive_local()))
    }

    async fn fetch_forecast(&self, city: &str) -> Result<Vec<ForecastDay>, WeatherError> {
        let body = self.get("forecast", city).await?;
        let parsed: OwForecastResponse = decode(&body, "forecast")?;
        Ok(forecast_from(&parsed))
    }
}
