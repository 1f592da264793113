use std::{env, path::Path};

use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clustering::ClusteringSettings;

pub const DEFAULT_PROXIMITY_MAX_DISTANCE: f64 = 20.0;

/// Run-wide knobs shared by the library, the driver and the binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Fixed seed for reproducible runs; entropy from the OS when absent.
    pub seed: Option<u64>,
    pub clustering: ClusteringSettings,
    /// Starting distance for every observer on a proximity curve.
    pub proximity_max_distance: f64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {source}")]
    Invalid {
        name: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to read config file: {0}")]
    File(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            seed: None,
            clustering: ClusteringSettings::default(),
            proximity_max_distance: DEFAULT_PROXIMITY_MAX_DISTANCE,
        }
    }
}

impl SelectionConfig {
    /// Read the configuration from `MONITOR_SELECT_*` variables.
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] when a variable does not parse or is out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = ClusteringSettings::default();
        let seed = parse_optional_u64("MONITOR_SELECT_SEED")?;

        // Clustering backends
        let clustering = ClusteringSettings {
            affinity_neighbors: parse_usize(
                "MONITOR_SELECT_AFFINITY_NEIGHBORS",
                defaults.affinity_neighbors,
            )?,
            eigengap_top_k: parse_usize("MONITOR_SELECT_EIGENGAP_TOP_K", defaults.eigengap_top_k)?,
            report_eigengap: parse_bool(
                "MONITOR_SELECT_REPORT_EIGENGAP",
                defaults.report_eigengap,
            )?,
            kmeans_max_iterations: parse_usize(
                "MONITOR_SELECT_KMEANS_MAX_ITERATIONS",
                defaults.kmeans_max_iterations,
            )?,
            kmeans_restarts: parse_usize(
                "MONITOR_SELECT_KMEANS_RESTARTS",
                defaults.kmeans_restarts,
            )?,
        };

        let proximity_max_distance = parse_f64(
            "MONITOR_SELECT_PROXIMITY_MAX_DISTANCE",
            DEFAULT_PROXIMITY_MAX_DISTANCE,
        )?;

        let config = Self {
            seed,
            clustering,
            proximity_max_distance,
        };
        config.validate()?;
        Ok(config)
    }

    /// Read the configuration from a TOML file; missing keys keep their defaults.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when the file cannot be read, parsed or validated.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// # Errors
    /// Returns [`ConfigError`] when the document does not parse or validate.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// Returns [`ConfigError::Invalid`] for a value outside its range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.clustering.affinity_neighbors == 0 {
            return Err(ConfigError::Invalid {
                name: "affinity_neighbors",
                source: anyhow::anyhow!("must be at least 1"),
            });
        }
        if self.clustering.kmeans_max_iterations == 0 || self.clustering.kmeans_restarts == 0 {
            return Err(ConfigError::Invalid {
                name: "kmeans",
                source: anyhow::anyhow!("iterations and restarts must be at least 1"),
            });
        }
        if !(self.proximity_max_distance.is_finite() && self.proximity_max_distance > 0.0) {
            return Err(ConfigError::Invalid {
                name: "proximity_max_distance",
                source: anyhow::anyhow!(
                    "must be a positive number, got {}",
                    self.proximity_max_distance
                ),
            });
        }
        Ok(())
    }

    /// Random source for a run: seeded when a seed is configured.
    #[must_use]
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}

fn parse_optional_u64(name: &'static str) -> Result<Option<u64>, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|error| ConfigError::Invalid {
                name,
                source: anyhow::Error::new(error),
            }),
        Err(_) => Ok(None),
    }
}

fn parse_usize(name: &'static str, default: usize) -> Result<usize, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.trim().parse::<usize>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_f64(name: &'static str, default: f64) -> Result<f64, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.trim().parse::<f64>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_bool(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            source: anyhow::anyhow!("invalid boolean value: {raw}"),
        }),
    }
}
