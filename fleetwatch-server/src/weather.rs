//! StormGlass water temperature relay.
//!
//! The frontend never sees the API key: it calls `GET /api/ocean?lat=..&lng=..`
//! and this module forwards the request upstream with the key attached,
//! relaying the upstream status and body unchanged.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::Config;

/// Days of history requested, counted back from now
const WINDOW_DAYS: i64 = 6;

/// Upstream parameter list
const WEATHER_PARAMS: &str = "waterTemperature";

#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("Invalid lat/lng")]
    InvalidCoordinates,

    #[error("Missing STORMGLASS_API_KEY")]
    MissingApiKey,

    #[error("{0}")]
    Upstream(#[from] reqwest::Error),
}

impl WeatherError {
    fn status(&self) -> StatusCode {
        match self {
            WeatherError::InvalidCoordinates => StatusCode::BAD_REQUEST,
            WeatherError::MissingApiKey | WeatherError::Upstream(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for WeatherError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.to_string() });
        (self.status(), Json(body)).into_response()
    }
}

/// Raw query parameters; parsed by hand so bad numbers map to our own 400
#[derive(Deserialize, Debug, Default)]
pub struct OceanQuery {
    pub lat: Option<String>,
    pub lng: Option<String>,
}

/// Upstream answer, passed through as-is
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: String,
}

impl IntoResponse for UpstreamResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::BAD_GATEWAY);
        if status.is_success() {
            (
                status,
                [(axum::http::header::CONTENT_TYPE, "application/json")],
                self.body,
            )
                .into_response()
        } else {
            (status, self.body).into_response()
        }
    }
}

#[derive(Clone, Debug)]
pub struct WeatherProxy {
    client: reqwest::Client,
    api_key: Option<String>,
    upstream_url: String,
}

impl WeatherProxy {
    pub fn new(config: &Config) -> Self {
        WeatherProxy {
            client: reqwest::Client::new(),
            api_key: config.stormglass_api_key.clone(),
            upstream_url: config.stormglass_url.clone(),
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn fetch(&self, query: &OceanQuery) -> Result<UpstreamResponse, WeatherError> {
        let (lat, lng) = parse_coordinates(query.lat.as_deref(), query.lng.as_deref())
            .ok_or(WeatherError::InvalidCoordinates)?;
        let api_key = self.api_key.as_deref().ok_or(WeatherError::MissingApiKey)?;

        let (start, end) = window(Utc::now());
        log::debug!("Ocean lookup at {},{} from {} to {}", lat, lng, start, end);

        let response = self
            .client
            .get(&self.upstream_url)
            .query(&[
                ("lat", lat.to_string()),
                ("lng", lng.to_string()),
                ("params", WEATHER_PARAMS.to_string()),
                ("start", start),
                ("end", end),
            ])
            .header(reqwest::header::AUTHORIZATION, api_key)
            .send()
            .await
            .map_err(|e| {
                log::error!("StormGlass request failed: {}", e);
                WeatherError::Upstream(e)
            })?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        if status >= 400 {
            log::warn!("StormGlass returned {}", status);
        }

        Ok(UpstreamResponse { status, body })
    }
}

/// Both values must be present and parse as finite numbers
pub fn parse_coordinates(lat: Option<&str>, lng: Option<&str>) -> Option<(f64, f64)> {
    let parse = |s: Option<&str>| {
        s.map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|v| v.is_finite())
    };
    Some((parse(lat)?, parse(lng)?))
}

/// Request window: six days back until now
pub fn window(now: DateTime<Utc>) -> (String, String) {
    let start = now - Duration::days(WINDOW_DAYS);
    (
        start.to_rfc3339_opts(SecondsFormat::Millis, true),
        now.to_rfc3339_opts(SecondsFormat::Millis, true),
    )
}
