//! Run configuration
//!
//! Defaults can be overridden with the environment variables:
//!  - `SIPM_CONNECTIONS`: path to the channel connections table
//!  - `SIPM_PLOTS`: directory where the plots are saved

use std::{
    env,
    path::{Path, PathBuf},
};

/// Default channel connections table
pub const CONNECTIONS: &str = "connections.csv";
/// Default plots directory
pub const SAVE_PATH: &str = "plots/SiPM_gain/";

#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) connections: PathBuf,
    pub(crate) output_dir: PathBuf,
    pub(crate) overview_size: (u32, u32),
    pub(crate) modules_size: (u32, u32),
    pub(crate) gain_tick: f64,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            connections: PathBuf::from(CONNECTIONS),
            output_dir: PathBuf::from(SAVE_PATH),
            overview_size: (800, 600),
            modules_size: (1600, 600),
            gain_tick: 500f64,
        }
    }
}
impl Config {
    /// Default configuration updated from the `SIPM_CONNECTIONS` and `SIPM_PLOTS` environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(path) = env::var("SIPM_CONNECTIONS") {
            config = config.connections(path);
        }
        if let Ok(path) = env::var("SIPM_PLOTS") {
            config = config.output_dir(path);
        }
        config
    }
    pub fn connections<P: AsRef<Path>>(self, path: P) -> Self {
        Self {
            connections: path.as_ref().to_path_buf(),
            ..self
        }
    }
    pub fn output_dir<P: AsRef<Path>>(self, path: P) -> Self {
        Self {
            output_dir: path.as_ref().to_path_buf(),
            ..self
        }
    }
    /// Size in pixels of the all channels figure
    pub fn overview_size(self, size: (u32, u32)) -> Self {
        Self {
            overview_size: size,
            ..self
        }
    }
    /// Size in pixels of the figure with the channels grouped by modules
    pub fn modules_size(self, size: (u32, u32)) -> Self {
        Self {
            modules_size: size,
            ..self
        }
    }
    /// Gain axis tick step of the all channels figure
    ///
    /// Non-positive or non-finite steps are ignored.
    pub fn gain_tick(self, gain_tick: f64) -> Self {
        if gain_tick.is_finite() && gain_tick > 0f64 {
            Self { gain_tick, ..self }
        } else {
            log::warn!("invalid gain tick step {}, keeping {}", gain_tick, self.gain_tick);
            self
        }
    }
    pub fn connections_path(&self) -> &Path {
        &self.connections
    }
    pub fn save_path(&self) -> &Path {
        &self.output_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder() {
        let config = Config::default()
            .connections("data/connections.csv")
            .output_dir("/tmp/plots")
            .gain_tick(250.);
        assert_eq!(
            config.connections_path(),
            Path::new("data/connections.csv")
        );
        assert_eq!(config.save_path(), Path::new("/tmp/plots"));
        assert_eq!(config.gain_tick, 250.);
        assert_eq!(config.overview_size, (800, 600));
    }

    #[test]
    fn non_positive_gain_tick() {
        for tick in [0., -100., f64::NAN, f64::INFINITY] {
            assert_eq!(Config::default().gain_tick(tick).gain_tick, 500.);
        }
        assert_eq!(Config::default().gain_tick(1e-3).gain_tick, 1e-3);
    }
}
