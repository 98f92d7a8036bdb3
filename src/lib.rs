//! SiPM GAIN CALIBRATION PLOTS
//!
//! Reads the results of the LED calibration (`Channel,Peaks,Gain,Error_g,Offset,Error_o`),
//! joins them with the channel connections table (`ACL,LCM`) and plots the gain versus
//! the channel number.

pub mod config;
mod error;
pub mod loader;
pub mod naming;
pub mod records;
pub mod report;

pub use config::Config;
pub use error::Error;
pub use loader::{GainLoader, GainTable, LoadError};
pub use naming::{derive_output_stem, NamingError};
pub use records::{Category, ConnectionRecord, GainRecord, GroupKey, ModuleLabel};
pub use report::{ChartArtifact, GainReport, ModuleChart, OverviewChart, ReportError};

pub type Result<T> = std::result::Result<T, Error>;
