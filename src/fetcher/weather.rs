use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::app::{Result, TributaryError};
use crate::domain::{Payload, WeatherData};
use crate::fetcher::{cancellable, ensure_ok, http_client, Source, DEFAULT_TIMEOUT};

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

/// Current conditions from an OpenWeatherMap-compatible endpoint.
pub struct WeatherSource {
    name: String,
    api_key: String,
    city: String,
    units: String,
    base_url: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct OwmResponse {
    main: OwmMain,
    #[serde(default)]
    weather: Vec<OwmCondition>,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
    humidity: i64,
}

#[derive(Debug, Deserialize)]
struct OwmCondition {
    description: String,
    icon: String,
}

impl WeatherSource {
    pub fn new(
        name: impl Into<String>,
        api_key: impl Into<String>,
        city: impl Into<String>,
        units: impl Into<String>,
        base_url: Option<String>,
    ) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            api_key: api_key.into(),
            city: city.into(),
            units: units.into(),
            base_url: base_url
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            client: http_client(DEFAULT_TIMEOUT)?,
        })
    }

    fn request_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)?;
        url.query_pairs_mut()
            .append_pair("q", &self.city)
            .append_pair("appid", &self.api_key)
            .append_pair("units", &self.units);
        Ok(url)
    }

    async fn fetch_current(&self) -> Result<Payload> {
        let response = self.client.get(self.request_url()?).send().await?;

        // A rejected key is treated like a missing one.
        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::debug!(source = %self.name, "weather api key rejected");
            return Ok(Payload::Weather(WeatherData::setup_required()));
        }
        ensure_ok(&response)?;

        let body = response.bytes().await?;
        let owm: OwmResponse =
            serde_json::from_slice(&body).map_err(|e| TributaryError::Decode(e.to_string()))?;

        let condition = owm
            .weather
            .into_iter()
            .next()
            .ok_or_else(|| TributaryError::Decode("no weather data in response".into()))?;

        Ok(Payload::Weather(WeatherData {
            temp: owm.main.temp,
            humidity: owm.main.humidity,
            description: condition.description,
            icon: condition.icon,
            city: owm.name,
            setup_required: false,
        }))
    }
}

#[async_trait]
impl Source for WeatherSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, cancel: &CancellationToken) -> Result<Payload> {
        if self.api_key.is_empty() {
            return Ok(Payload::Weather(WeatherData::setup_required()));
        }

        cancellable(cancel, self.fetch_current()).await
    }
}
