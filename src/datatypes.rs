use std::fmt;

use log::warn;
use quick_xml::{events::Event, Reader};
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// One switchable power port
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outlet {
    /// 1-based, in the order the device lists its outlets
    pub index: usize,
    pub name: String,
    pub on: bool,
}

impl fmt::Display for Outlet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "WattBox outlet {} [{}] ({})",
            self.name,
            self.index,
            if self.on { "on" } else { "off" }
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub hostname: Option<String>,
    pub hardware_version: Option<String>,
    pub serial_number: Option<String>,
    pub has_ups: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    pub info: DeviceInfo,
    pub outlets: Vec<Outlet>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutletCommand {
    Off,
    On,
    Reset,
}

impl OutletCommand {
    pub fn code(self) -> u8 {
        match self {
            OutletCommand::Off => 0,
            OutletCommand::On => 1,
            OutletCommand::Reset => 3,
        }
    }
}

impl From<bool> for OutletCommand {
    fn from(on: bool) -> Self {
        if on {
            OutletCommand::On
        } else {
            OutletCommand::Off
        }
    }
}

// wattbox_info.xml
#[derive(Debug, Deserialize)]
struct InfoDocument {
    host_name: Option<String>,
    hardware_version: Option<String>,
    serial_number: Option<String>,
    #[serde(rename = "hasUPS")]
    has_ups: Option<String>,
    outlet_name: String,
    outlet_status: String,
}

// control.cgi
#[derive(Debug, Deserialize)]
struct ControlDocument {
    outlet_status: String,
}

fn split_list(list: &str) -> Vec<&str> {
    let list = list.trim();
    if list.is_empty() {
        return Vec::new();
    }
    list.split(',').map(str::trim).collect()
}

fn parse_states(list: &str) -> Result<Vec<bool>> {
    split_list(list)
        .into_iter()
        .map(|state| match state {
            "1" => Ok(true),
            "0" => Ok(false),
            other => Err(Error::Parse(format!("unexpected outlet status `{}`", other))),
        })
        .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

// The deserializer stops at the end of the root element, so the whole
// document is walked first: exactly one root, nothing but whitespace around it.
fn check_document(xml: &str) -> Result<()> {
    let mut reader = Reader::from_str(xml);
    let mut depth = 0_usize;
    let mut roots = 0_usize;
    loop {
        match reader.read_event()? {
            Event::Start(_) => {
                if depth == 0 {
                    roots += 1;
                }
                depth += 1;
            }
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Empty(_) if depth == 0 => roots += 1,
            Event::Text(text) if depth == 0 => {
                if !text.iter().all(u8::is_ascii_whitespace) {
                    return Err(Error::Parse(String::from("text outside the root element")));
                }
            }
            Event::CData(_) if depth == 0 => {
                return Err(Error::Parse(String::from("CDATA outside the root element")));
            }
            Event::Eof => break,
            _ => {}
        }
        if roots > 1 {
            return Err(Error::Parse(String::from("more than one root element")));
        }
    }
    if depth != 0 || roots == 0 {
        return Err(Error::Parse(String::from("incomplete document")));
    }
    Ok(())
}

fn from_document<T: DeserializeOwned>(xml: &str) -> Result<T> {
    check_document(xml)?;
    Ok(quick_xml::de::from_str(xml)?)
}

/// Parse the device's `wattbox_info.xml` status document
pub fn parse_status(xml: &str) -> Result<Status> {
    let document: InfoDocument = from_document(xml).map_err(|err| {
        warn!("Could not parse WattBox status document: {}", err);
        err
    })?;

    let names = split_list(&document.outlet_name);
    let states = parse_states(&document.outlet_status)?;
    if names.len() != states.len() {
        return Err(Error::Parse(format!(
            "{} outlet names but {} outlet states",
            names.len(),
            states.len()
        )));
    }

    let outlets = names
        .into_iter()
        .zip(states)
        .enumerate()
        .map(|(offset, (name, on))| Outlet {
            index: offset + 1,
            name: name.to_string(),
            on,
        })
        .collect();

    Ok(Status {
        info: DeviceInfo {
            hostname: non_empty(document.host_name),
            hardware_version: non_empty(document.hardware_version),
            serial_number: non_empty(document.serial_number),
            has_ups: document.has_ups.as_deref().map(str::trim) == Some("1"),
        },
        outlets,
    })
}

/// Parse the outlet states returned by `control.cgi`
pub fn parse_outlet_states(xml: &str) -> Result<Vec<bool>> {
    let document: ControlDocument = from_document(xml)?;
    parse_states(&document.outlet_status)
}
