//! OpenWeather client against a mocked upstream.

mod common;

use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use weather_core::{
    WeatherError, WeatherProvider, provider::openweather::OpenWeatherProvider,
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

fn provider(server: &MockServer) -> OpenWeatherProvider {
    OpenWeatherProvider::new("TEST_KEY".to_string())
        .expect("client builds")
        .with_base_url(server.uri())
}

fn current_json() -> serde_json::Value {
    serde_json::json!({
        "name": "London",
        "sys": { "country": "GB", "sunrise": 1_700_000_000, "sunset": 1_700_030_000 },
        "main": { "temp": 11.347, "feels_like": 9.96, "humidity": 81, "pressure": 1009 },
        "wind": { "speed": 6.2 },
        "weather": [{ "description": "overcast clouds", "icon": "04d" }],
        "visibility": 8000
    })
}

fn slot(day: u32, hour: u32) -> serde_json::Value {
    let at: NaiveDateTime = NaiveDate::from_ymd_opt(2024, 5, day)
        .and_then(|d| d.and_hms_opt(hour, 0, 0))
        .expect("valid slot");
    serde_json::json!({
        "dt": at.and_utc().timestamp(),
        "dt_txt": at.format("%Y-%m-%d %H:%M:%S").to_string(),
        "main": { "temp_max": 10.0 + f64::from(hour) / 10.0, "temp_min": 5.0, "humidity": 60 },
        "wind": { "speed": 1.0 },
        "weather": [{ "description": format!("day {day} hour {hour}"), "icon": "01d" }]
    })
}

/// Days 1, 3 and 5 have a noon slot; days 2 and 4 don't.
fn forecast_json() -> serde_json::Value {
    let mut list = Vec::new();
    for day in 1..=5u32 {
        let hours: &[u32] = if day % 2 == 1 {
            &[0, 3, 6, 9, 12, 15, 18, 21]
        } else {
            &[0, 3, 6, 9, 15, 18, 21]
        };
        list.extend(hours.iter().map(|h| slot(day, *h)));
    }
    serde_json::json!({ "cod": "200", "list": list })
}

#[tokio::test]
async fn current_weather_is_normalized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("q", "London"))
        .and(query_param("units", "metric"))
        .and(query_param("appid", "TEST_KEY"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_json()))
        .expect(1)
        .mount(&server)
        .await;

    let snap = provider(&server).fetch_current("London").await.unwrap();

    assert_eq!(snap.city, "London");
    assert_eq!(snap.country, "GB");
    assert_eq!(snap.temperature, 11.3);
    assert_eq!(snap.feels_like, 10.0);
    assert_eq!(snap.wind_speed, 22.3);
    assert_eq!(snap.humidity, 81);
    assert_eq!(snap.pressure, 1009);
    assert_eq!(snap.description, "Overcast clouds");
    assert_eq!(snap.visibility, 8.0);
    assert_ne!(snap.sunrise, "Unknown");
}

#[tokio::test]
async fn forecast_fills_days_without_noon_reading() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .and(query_param("q", "Berlin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_json()))
        .mount(&server)
        .await;

    let days = provider(&server).fetch_forecast("Berlin").await.unwrap();

    let descriptions: Vec<&str> = days.iter().map(|d| d.description.as_str()).collect();
    assert_eq!(
        descriptions,
        vec!["Day 1 hour 12", "Day 2 hour 0", "Day 3 hour 12", "Day 4 hour 0", "Day 5 hour 12"]
    );
    assert_eq!(days[0].date, "May 01");
    assert_eq!(days[0].day, "Wednesday");
    assert_eq!(days[0].temp_max, 11.2);
    assert_eq!(days[4].date, "May 05");
}

#[tokio::test]
async fn unknown_city_maps_to_city_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(serde_json::json!({ "cod": "404", "message": "city not found" })),
        )
        .mount(&server)
        .await;

    let err = provider(&server).fetch_current("Atlantis").await.unwrap_err();

    assert!(matches!(err, WeatherError::CityNotFound));
}

#[tokio::test]
async fn rejected_key_maps_to_invalid_api_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = provider(&server).fetch_forecast("Paris").await.unwrap_err();

    assert!(matches!(err, WeatherError::InvalidApiKey));
}

#[tokio::test]
async fn other_status_maps_to_upstream_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = provider(&server).fetch_current("Paris").await.unwrap_err();

    match err {
        WeatherError::UpstreamError(status) => assert_eq!(status.as_u16(), 503),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn slow_upstream_maps_to_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(current_json())
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let provider = provider(&server)
        .with_timeout(Duration::from_millis(200))
        .unwrap();
    let err = provider.fetch_current("London").await.unwrap_err();

    assert!(matches!(err, WeatherError::Timeout));
}

#[tokio::test]
async fn garbage_body_maps_to_internal_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = provider(&server).fetch_current("London").await.unwrap_err();

    assert!(matches!(err, WeatherError::InternalError(_)));
}

#[tokio::test]
async fn unreachable_upstream_maps_to_network_error() {
    // Nothing listens on the discard port.
    let provider = OpenWeatherProvider::new("TEST_KEY".to_string())
        .unwrap()
        .with_base_url("http://127.0.0.1:9");

    let err = provider.fetch_current("London").await.unwrap_err();

    assert!(matches!(err, WeatherError::NetworkError(_)));
}

#[tokio::test]
async fn error_status_wins_over_unreadable_body() {
    let not_found = OpenWeatherProvider::new("TEST_KEY".to_string())
        .expect("client builds")
        .with_base_url(common::truncated_body_server("404 Not Found").await);
    let err = not_found.fetch_current("Atlantis").await.unwrap_err();
    assert!(matches!(err, WeatherError::CityNotFound), "got {err:?}");

    let rejected = OpenWeatherProvider::new("BAD_KEY".to_string())
        .expect("client builds")
        .with_base_url(common::truncated_body_server("401 Unauthorized").await);
    let err = rejected.fetch_forecast("London").await.unwrap_err();
    assert!(matches!(err, WeatherError::InvalidApiKey), "got {err:?}");
}
