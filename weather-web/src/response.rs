use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use weather_core::{ImageError, WeatherError};

/// Uniform `{success, data?, message?}` envelope for every API route.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize = ()> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn data(data: T) -> Self {
        Self { success: true, data: Some(data), message: None }
    }
}

impl ApiResponse {
    pub fn ok() -> Self {
        Self { success: true, data: None, message: None }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self { success: true, data: None, message: Some(message.into()) }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self { success: false, data: None, message: Some(message.into()) }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Everything an API route can fail with.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Weather(#[from] WeatherError),
    #[error(transparent)]
    Image(#[from] ImageError),
}

impl ApiError {
    /// Message shown to the browser. Never carries upstream detail.
    pub fn client_message(&self) -> &'static str {
        match self {
            ApiError::Unauthorized => "Unauthorized",
            ApiError::InvalidCredentials => "Invalid credentials",
            ApiError::InvalidInput(_) => "Invalid data",
            ApiError::Weather(err) => match err {
                WeatherError::CityNotFound => "City not found",
                WeatherError::InvalidApiKey => "Invalid API key",
                WeatherError::UpstreamError(_) => "Unable to fetch weather data",
                WeatherError::Timeout => "Request timed out",
                WeatherError::NetworkError(_) => "Network error",
                WeatherError::InternalError(_) => "Server error",
            },
            ApiError::Image(err) => match err {
                ImageError::NoImagesFound => "No images found",
                ImageError::UpstreamError(_) => "Error fetching image",
                ImageError::InternalError(_) => "Error loading background",
            },
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            // failures are reported in the body
            _ => StatusCode::OK,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Weather(WeatherError::CityNotFound)
            | ApiError::Image(ImageError::NoImagesFound)
            | ApiError::Unauthorized
            | ApiError::InvalidCredentials => tracing::debug!(error = %self, "request rejected"),
            _ => tracing::warn!(error = %self, "request failed"),
        }

        (self.status(), ApiResponse::failure(self.client_message())).into_response()
    }
}
