use serde::Deserialize;
use std::fmt;
use strum_macros::{Display, EnumIter, EnumString};

/// Channel classification from the sign of the fitted gain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Display)]
pub enum Category {
    /// `gain > 0`: the gain fit succeeded
    #[strum(to_string = "Valid channels")]
    Valid,
    /// `gain < 0`: only the pedestal peak was found
    #[strum(to_string = "Only pedestal")]
    PedestalOnly,
    /// `gain == 0`: no signal
    #[strum(to_string = "Inactive channels")]
    Inactive,
}
impl Category {
    pub fn of(gain: f64) -> Self {
        if gain > 0f64 {
            Category::Valid
        } else if gain < 0f64 {
            Category::PedestalOnly
        } else {
            Category::Inactive
        }
    }
}

/// Hardware module label
///
/// Integer labels sort numerically and come before any other label,
/// other labels sort lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(from = "String")]
pub enum ModuleLabel {
    Number(i64),
    Name(String),
}
impl From<&str> for ModuleLabel {
    fn from(value: &str) -> Self {
        let value = value.trim();
        value
            .parse::<i64>()
            .map(ModuleLabel::Number)
            .unwrap_or_else(|_| ModuleLabel::Name(value.to_string()))
    }
}
impl From<String> for ModuleLabel {
    fn from(value: String) -> Self {
        value.as_str().into()
    }
}
impl fmt::Display for ModuleLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleLabel::Number(n) => write!(f, "{}", n),
            ModuleLabel::Name(name) => write!(f, "{}", name),
        }
    }
}

/// Module label used to group the channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(ascii_case_insensitive)]
pub enum GroupKey {
    #[strum(to_string = "ACL")]
    Acl,
    #[strum(to_string = "LCM")]
    Lcm,
}

/// Channel to hardware modules mapping
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionRecord {
    pub channel: u32,
    pub acl: ModuleLabel,
    pub lcm: ModuleLabel,
}

/// Calibration results of a single channel
#[derive(Debug, Clone, PartialEq)]
pub struct GainRecord {
    pub channel: u32,
    /// # of fitted photo-electron peaks
    pub peaks: u32,
    /// gain [ADC / p.e.]
    pub gain: f64,
    pub gain_error: f64,
    pub offset: f64,
    pub offset_error: f64,
    pub acl: ModuleLabel,
    pub lcm: ModuleLabel,
}
impl GainRecord {
    pub fn category(&self) -> Category {
        Category::of(self.gain)
    }
    /// Returns the module label selected by `key`
    pub fn module(&self, key: GroupKey) -> &ModuleLabel {
        match key {
            GroupKey::Acl => &self.acl,
            GroupKey::Lcm => &self.lcm,
        }
    }
}
