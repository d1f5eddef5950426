use serde::{Deserialize, Serialize};

/// Normalized current conditions for one city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub city: String,
    pub country: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: i64,
    pub pressure: i64,
    /// km/h
    pub wind_speed: f64,
    pub description: String,
    pub icon: String,
    pub date: String,
    pub time: String,
    pub sunrise: String,
    pub sunset: String,
    /// km
    pub visibility: f64,
}

/// One representative reading per calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub day: String,
    pub date: String,
    pub temp_max: f64,
    pub temp_min: f64,
    pub humidity: i64,
    pub wind_speed: f64,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackgroundImage {
    pub image_url: String,
    pub photographer: String,
}

/// Rounds to one decimal place.
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Metres per second to kilometres per hour, rounded to one decimal.
pub(crate) fn mps_to_kmh(speed: f64) -> f64 {
    round1(speed * 3.6)
}

/// Uppercases the first character and lowercases the rest.
pub(crate) fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
