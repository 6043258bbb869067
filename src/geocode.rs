//! City → country resolution.
//!
//! The parser enriches each match with the country its city lies in. That
//! lookup is a best-effort capability injected through the [`Geocoder`]
//! trait: every implementation returns `None` rather than failing, so a
//! flaky or rate-limited service can never fail a parse.
//!
//! Implementations:
//! - **[`DisabledGeocoder`]**: always `None`.
//! - **[`StaticGeocoder`]**: a fixed place table from config, with an
//!   optional fallback geocoder for places not in the table.
//! - **[`NominatimGeocoder`]**: OpenStreetMap Nominatim search API, with
//!   request throttling and exponential backoff.
//! - Any `Fn(&str) -> Option<String>` closure.
//!
//! Use [`create_geocoder`] to build the configured one.
//!
//! # Blocking
//!
//! Lookups are synchronous. The Nominatim client is `reqwest::blocking`,
//! so it must only be *used and dropped* off the async runtime (the
//! ingest pipeline runs parsing inside `spawn_blocking`).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};

use anyhow::{bail, Result};

use crate::config::GeocodingConfig;

/// Resolves a place name to the name of the country containing it.
pub trait Geocoder: Send + Sync {
    /// Returns the English country name, or `None` when unknown.
    fn country(&self, place: &str) -> Option<String>;
}

impl<F> Geocoder for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn country(&self, place: &str) -> Option<String> {
        self(place)
    }
}

// ============ Disabled ============

/// Geocoder used when `geocoding.provider = "disabled"`.
pub struct DisabledGeocoder;

impl Geocoder for DisabledGeocoder {
    fn country(&self, _place: &str) -> Option<String> {
        None
    }
}

// ============ Static table ============

/// Looks places up in a fixed table, then defers to `fallback`.
pub struct StaticGeocoder {
    places: HashMap<String, String>,
    fallback: Option<Box<dyn Geocoder>>,
}

impl StaticGeocoder {
    pub fn new(places: HashMap<String, String>) -> Self {
        Self {
            places,
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: Box<dyn Geocoder>) -> Self {
        self.fallback = Some(fallback);
        self
    }
}

impl Geocoder for StaticGeocoder {
    fn country(&self, place: &str) -> Option<String> {
        if let Some(country) = self.places.get(place.trim()) {
            return Some(country.clone());
        }
        self.fallback.as_ref().and_then(|g| g.country(place))
    }
}

// ============ Nominatim ============

/// Geocoder backed by the Nominatim `/search` endpoint.
///
/// Requests are serialized and spaced at least `min_interval` apart, in
/// line with the public instance's one-request-per-second policy.
///
/// Retry strategy:
/// - HTTP 429 or 5xx → retry with exponential backoff
/// - other HTTP errors → give up (`None`)
/// - network errors → retry
/// - Backoff: 1s, 2s, 4s, ... (capped at 2^5)
pub struct NominatimGeocoder {
    url: String,
    user_agent: String,
    timeout: Duration,
    max_retries: u32,
    min_interval: Duration,
    client: OnceLock<Option<reqwest::blocking::Client>>,
    last_request: Mutex<Option<Instant>>,
}

impl NominatimGeocoder {
    pub fn new(config: &GeocodingConfig) -> Self {
        Self {
            url: config.url.trim_end_matches('/').to_string(),
            user_agent: config.user_agent.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            max_retries: config.max_retries,
            min_interval: Duration::from_millis(config.min_interval_ms),
            client: OnceLock::new(),
            last_request: Mutex::new(None),
        }
    }

    // Built lazily so construction is safe on an async thread.
    fn client(&self) -> Option<&reqwest::blocking::Client> {
        self.client
            .get_or_init(|| {
                reqwest::blocking::Client::builder()
                    .timeout(self.timeout)
                    .user_agent(self.user_agent.clone())
                    .build()
                    .map_err(|e| eprintln!("Warning: could not create geocoding client: {}", e))
                    .ok()
            })
            .as_ref()
    }

    fn throttle(&self) {
        let mut last = match self.last_request.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                std::thread::sleep(self.min_interval - elapsed);
            }
        }
        *last = Some(Instant::now());
    }

    fn lookup(&self, place: &str) -> Result<Option<String>> {
        let Some(client) = self.client() else {
            bail!("geocoding client unavailable");
        };

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                std::thread::sleep(delay);
            }

            self.throttle();
            let resp = client
                .get(format!("{}/search", self.url))
                .query(&[
                    ("q", place),
                    ("format", "jsonv2"),
                    ("addressdetails", "1"),
                    ("accept-language", "en"),
                    ("limit", "1"),
                ])
                .send();

            match resp {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let json: serde_json::Value = response.json()?;
                        return Ok(parse_nominatim_response(&json));
                    }
                    if status.as_u16() == 429 || status.is_server_error() {
                        last_err = Some(anyhow::anyhow!("Nominatim error {}", status));
                        continue;
                    }
                    bail!("Nominatim error {}", status);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("geocoding failed after retries")))
    }
}

impl Geocoder for NominatimGeocoder {
    fn country(&self, place: &str) -> Option<String> {
        match self.lookup(place) {
            Ok(country) => country,
            Err(e) => {
                eprintln!("Warning: geocoding '{}' failed: {}", place, e);
                None
            }
        }
    }
}

/// Extract `[0].address.country` from a Nominatim search response.
fn parse_nominatim_response(json: &serde_json::Value) -> Option<String> {
    json.as_array()?
        .first()?
        .get("address")?
        .get("country")?
        .as_str()
        .map(str::to_string)
}

/// Build the geocoder described by `[geocoding]`.
///
/// A non-empty `places` table is always consulted first; the provider is
/// the fallback for places it does not list.
pub fn create_geocoder(config: &GeocodingConfig) -> Result<Arc<dyn Geocoder>> {
    let provider: Option<Box<dyn Geocoder>> = match config.provider.as_str() {
        "disabled" | "static" => None,
        "nominatim" => Some(Box::new(NominatimGeocoder::new(config))),
        other => bail!(
            "Unknown geocoding provider: '{}'. Must be disabled, static, or nominatim.",
            other
        ),
    };

    if config.places.is_empty() {
        return Ok(match provider {
            Some(p) => Arc::from(p),
            None => Arc::new(DisabledGeocoder),
        });
    }

    let table = StaticGeocoder::new(config.places.clone());
    Ok(match provider {
        Some(p) => Arc::new(table.with_fallback(p)),
        None => Arc::new(table),
    })
}
