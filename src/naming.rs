//! Output file names
//!
//! Calibration results are named `<PREFIX>_<deviceId>_<YYYYMMDD>_<HHMMSS>.csv`,
//! e.g. `ACL_0cd913fb_20220207_054800.csv`, and the plots are saved as
//! `<PREFIX>_<YYYYMMDD>_<HHMMSS>_<suffix>`.

use crate::records::GroupKey;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum NamingError {
    #[error("invalid calibration file name {0:?}, expected <PREFIX>_<deviceId>_<YYYYMMDD>_<HHMMSS>.csv")]
    InvalidFileName(String),
}
type Result<T> = std::result::Result<T, NamingError>;

fn segments(file_name: &str) -> Result<Vec<&str>> {
    let segments: Vec<&str> = file_name.split('_').collect();
    if segments.len() < 4 {
        return Err(NamingError::InvalidFileName(file_name.to_string()));
    }
    Ok(segments)
}

fn file_name<P: AsRef<Path>>(input: P) -> Result<String> {
    let input = input.as_ref();
    input
        .file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.to_string())
        .ok_or_else(|| NamingError::InvalidFileName(input.display().to_string()))
}

/// Returns the plots file name stem, dropping the device identifier
pub fn derive_output_stem<P: AsRef<Path>>(input: P) -> Result<String> {
    let name = file_name(input)?;
    let segments = segments(&name)?;
    let time = segments[segments.len() - 1]
        .split('.')
        .next()
        .unwrap_or_default();
    Ok(format!("{}_{}_{}", segments[0], segments[2], time))
}

/// Returns the module grouping matching the file name prefix, if any
pub fn group_key<P: AsRef<Path>>(input: P) -> Option<GroupKey> {
    let name = file_name(input).ok()?;
    name.split('_').next()?.parse().ok()
}
