use crate::{loader::LoadError, naming::NamingError, report::ReportError};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Error in the `loader` module")]
    Load(#[from] LoadError),
    #[error("Error in the `naming` module")]
    Naming(#[from] NamingError),
    #[error("Error in the `report` module")]
    Report(#[from] ReportError),
}
