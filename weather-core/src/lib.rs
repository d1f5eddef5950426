//! Core library for the weather web front end.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Upstream weather and image providers, behind traits
//! - Reduction of 3-hour forecasts to daily summaries
//! - The session-scoped search history
//! - Shared domain models
//!
//! It is used by `weather-web`, but can also be reused by other binaries or services.

pub mod auth;
pub mod config;
pub mod forecast;
pub mod history;
pub mod model;
pub mod provider;

pub use auth::{CredentialVerifier, Locked, StaticCredential};
pub use config::{Config, LoginConfig, ProviderConfig, ServerConfig};
pub use history::{HistoryEntry, SearchHistory};
pub use model::{BackgroundImage, ForecastDay, WeatherSnapshot};
pub use provider::{ImageError, ImageProvider, ProviderId, WeatherError, WeatherProvider};
