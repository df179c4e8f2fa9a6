use serde::{Deserialize, Serialize};
use tracing::info;

use common::{Error, Result};

use crate::indicators::{PriceSource, SupertrendParams};
use crate::triple::TripleSupertrend;

/// Indicator parameter file (TOML).
///
/// Example `config/supertrend.toml`:
/// ```toml
/// source = "hl2"
///
/// [[unit]]
/// period = 10
/// multiplier = 1.0
///
/// [[unit]]
/// period = 11
/// multiplier = 2.0
///
/// [[unit]]
/// period = 12
/// multiplier = 3.0
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SupertrendFileConfig {
    /// Price feeding the band midline for all three units.
    #[serde(default)]
    pub source: PriceSource,
    /// Exactly three units, fastest first.
    #[serde(rename = "unit")]
    pub units: Vec<UnitConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct UnitConfig {
    pub period: usize,
    pub multiplier: f64,
}

impl Default for SupertrendFileConfig {
    fn default() -> Self {
        Self {
            source: PriceSource::default(),
            units: SupertrendParams::DEFAULT_TRIPLE
                .iter()
                .map(|p| UnitConfig {
                    period: p.period(),
                    multiplier: p.multiplier(),
                })
                .collect(),
        }
    }
}

impl SupertrendFileConfig {
    /// Load from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let cfg = Self::parse(&content)
            .map_err(|e| Error::Config(format!("Failed to parse '{path}': {e}")))?;
        info!(path = %path, source = ?cfg.source, "Loaded Supertrend parameters");
        Ok(cfg)
    }

    /// Load from `path` when given, otherwise fall back to the reference parameters.
    pub fn load_or_default(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Validate every unit and build the combiner.
    pub fn build(&self) -> Result<TripleSupertrend> {
        let params: Vec<SupertrendParams> = self
            .units
            .iter()
            .map(|u| SupertrendParams::new(u.period, u.multiplier).map(|p| p.with_source(self.source)))
            .collect::<Result<_>>()?;

        let params: [SupertrendParams; 3] = params.try_into().map_err(|v: Vec<_>| {
            Error::InvalidParameter(format!("expected exactly 3 Supertrend units, got {}", v.len()))
        })?;

        Ok(TripleSupertrend::new(params))
    }
}
