//! Error types
use std::result;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Error connecting to the device: {0}")]
    Connection(#[source] ureq::Error),
    #[error("The device rejected the credentials")]
    Authentication,
    #[error("Could not parse the response received from the device: {0}")]
    Parse(String),
    #[error("Outlet state has not been loaded yet")]
    NotLoaded,
    #[error("No outlet with index {0}")]
    OutOfRange(usize),
}

impl From<ureq::Error> for Error {
    fn from(error: ureq::Error) -> Self {
        match error {
            ureq::Error::StatusCode(401) | ureq::Error::StatusCode(403) => Error::Authentication,
            other => Error::Connection(other),
        }
    }
}

impl From<quick_xml::DeError> for Error {
    fn from(error: quick_xml::DeError) -> Self {
        Error::Parse(error.to_string())
    }
}

impl From<quick_xml::Error> for Error {
    fn from(error: quick_xml::Error) -> Self {
        Error::Parse(error.to_string())
    }
}

pub type Result<T> = result::Result<T, Error>;
