#[macro_use]
extern crate serde_derive;

pub mod capabilities;
pub mod config;
pub mod datatypes;
pub mod devices;
pub mod error;
mod protocol;

pub use crate::{config::Config, devices::WattBox};
