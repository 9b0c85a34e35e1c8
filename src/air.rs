use serde::Serialize;

use crate::model::AirSample;

/// Six-level air quality band, ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AirQualityBand {
    Good,
    Moderate,
    Poor,
    Unhealthy,
    Severe,
    Hazardous,
}

impl AirQualityBand {
    /// Upper bounds (inclusive) of every band but the last.
    const THRESHOLDS: [(f64, AirQualityBand); 5] = [
        (50.0, AirQualityBand::Good),
        (100.0, AirQualityBand::Moderate),
        (200.0, AirQualityBand::Poor),
        (300.0, AirQualityBand::Unhealthy),
        (400.0, AirQualityBand::Severe),
    ];

    pub fn classify(value: f64) -> Self {
        Self::THRESHOLDS
            .iter()
            .find(|(limit, _)| value <= *limit)
            .map_or(AirQualityBand::Hazardous, |&(_, band)| band)
    }

    pub fn color(self) -> &'static str {
        match self {
            AirQualityBand::Good => "green",
            AirQualityBand::Moderate => "yellow",
            AirQualityBand::Poor => "orange",
            AirQualityBand::Unhealthy => "red",
            AirQualityBand::Severe => "darkred",
            AirQualityBand::Hazardous => "black",
        }
    }
}

impl AirSample {
    pub fn band(&self) -> AirQualityBand {
        AirQualityBand::classify(self.severity())
    }
}
