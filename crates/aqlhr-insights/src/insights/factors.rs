use super::domain::{ExternalFactors, Season};
use chrono::{Datelike, NaiveDate};
use std::sync::Arc;
use tracing::warn;

/// Reading used until a real forecast feed is wired in.
pub const MOCK_TEMPERATURE_C: f64 = 42.0;

/// Meteorological season for a 1-based month.
pub fn season_for_month(month: u32) -> Season {
    match month {
        3..=5 => Season::Spring,
        6..=8 => Season::Summer,
        9..=11 => Season::Autumn,
        _ => Season::Winter,
    }
}

/// Rough stand-in for the lunar fasting month: March and April.
pub fn is_cultural_period(month: u32) -> bool {
    matches!(month, 3 | 4)
}

#[derive(Debug, thiserror::Error)]
#[error("weather probe failed: {0}")]
pub struct ProbeError(pub String);

pub trait WeatherProbe: Send + Sync {
    fn temperature_c(&self, on: NaiveDate) -> Result<f64, ProbeError>;
}

/// Always reports the same temperature.
#[derive(Debug, Clone, Copy)]
pub struct FixedWeather(pub f64);

impl Default for FixedWeather {
    fn default() -> Self {
        Self(MOCK_TEMPERATURE_C)
    }
}

impl WeatherProbe for FixedWeather {
    fn temperature_c(&self, _on: NaiveDate) -> Result<f64, ProbeError> {
        Ok(self.0)
    }
}

#[derive(Clone)]
pub struct ExternalFactorProbes {
    weather: Arc<dyn WeatherProbe>,
}

impl Default for ExternalFactorProbes {
    fn default() -> Self {
        Self::new(Arc::new(FixedWeather::default()))
    }
}

impl ExternalFactorProbes {
    pub fn new(weather: Arc<dyn WeatherProbe>) -> Self {
        Self { weather }
    }

    pub fn collect(&self, today: NaiveDate) -> ExternalFactors {
        let temperature_c = match self.weather.temperature_c(today) {
            Ok(reading) => Some(reading),
            Err(err) => {
                warn!(error = %err, "continuing without a temperature reading");
                None
            }
        };
        ExternalFactors {
            season: season_for_month(today.month()),
            cultural_period: is_cultural_period(today.month()),
            temperature_c,
        }
    }
}
