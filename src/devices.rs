use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info};

use crate::{
    capabilities::Switch,
    config::Config,
    datatypes::{self, DeviceInfo, Outlet, OutletCommand, Status},
    error::{Error, Result},
    protocol::{HttpProtocol, Protocol},
};

const INFO_PATH: &str = "/wattbox_info.xml";
const CONTROL_PATH: &str = "/control.cgi";

/// A WattBox power strip
///
/// Nothing is fetched until [`WattBox::load`] is called, and the cached
/// outlets only change on the next `load` or [`WattBox::refresh`].
pub struct WattBox {
    config: Config,
    protocol: Box<dyn Protocol>,
    status: Option<Status>,
}

impl WattBox {
    pub fn new(host: &str, username: &str, password: &str) -> WattBox {
        Self::with_config(Config::new(host, username, password))
    }

    pub fn with_config(config: Config) -> WattBox {
        let protocol = Box::new(HttpProtocol::new(&config));
        Self {
            config,
            protocol,
            status: None,
        }
    }

    pub fn host(&self) -> &str {
        &self.config.host
    }

    /// Fetch and parse the outlet database, replacing the cached one
    pub fn load(&mut self) -> Result<&[Outlet]> {
        let xml = self.protocol.get(INFO_PATH)?;
        debug!("Loaded xml status = {}", xml);
        let status = datatypes::parse_status(&xml)?;
        debug!(
            "Found wattbox {} with {} outlets",
            self.config.host,
            status.outlets.len()
        );
        Ok(self.status.insert(status).outlets.as_slice())
    }

    pub fn outlets(&self) -> Result<&[Outlet]> {
        Ok(self.loaded()?.outlets.as_slice())
    }

    pub fn outlet(&self, index: usize) -> Result<&Outlet> {
        self.outlets()?
            .iter()
            .find(|outlet| outlet.index == index)
            .ok_or(Error::OutOfRange(index))
    }

    pub fn info(&self) -> Result<&DeviceInfo> {
        Ok(&self.loaded()?.info)
    }

    /// Power an outlet on or off. The cached state is left as is.
    pub fn set_outlet_state(&self, index: usize, on: bool) -> Result<()> {
        self.send_command(index, OutletCommand::from(on))
    }

    /// Power cycle an outlet
    pub fn reset_outlet(&self, index: usize) -> Result<()> {
        self.send_command(index, OutletCommand::Reset)
    }

    /// Poll the on/off states of the already loaded outlets
    pub fn refresh(&mut self) -> Result<&[Outlet]> {
        let count = self.outlets()?.len();
        let xml = self.protocol.get(CONTROL_PATH)?;
        let states = datatypes::parse_outlet_states(&xml)?;
        if states.len() != count {
            return Err(Error::Parse(format!(
                "{} outlet states for {} outlets",
                states.len(),
                count
            )));
        }

        let status = self.status.as_mut().ok_or(Error::NotLoaded)?;
        for (outlet, on) in status.outlets.iter_mut().zip(states) {
            if outlet.on != on {
                info!("Updated wattbox {}: {}", self.config.host, outlet.name);
            }
            outlet.on = on;
        }
        Ok(status.outlets.as_slice())
    }

    fn loaded(&self) -> Result<&Status> {
        self.status.as_ref().ok_or(Error::NotLoaded)
    }

    fn send_command(&self, index: usize, command: OutletCommand) -> Result<()> {
        let outlet = self.outlet(index)?;
        let path = format!(
            "{}?outlet={}&command={}&time={}999",
            CONTROL_PATH,
            index,
            command.code(),
            unix_time()
        );
        if self.config.dry_run {
            info!(
                "Not sending {:?} for {} to {} (dry run): {}",
                command, outlet, self.config.host, path
            );
            return Ok(());
        }
        debug!("Sending {:?} for {} to {}", command, outlet, self.config.host);
        let response = self.protocol.get(&path)?;
        debug!("Wattbox responded '{}'", response);
        Ok(())
    }
}

impl Switch for WattBox {
    fn set_outlet_state(&self, index: usize, on: bool) -> Result<()> {
        WattBox::set_outlet_state(self, index, on)
    }

    fn outlets(&self) -> Result<&[Outlet]> {
        WattBox::outlets(self)
    }
}

fn unix_time() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::datatypes::tests::{CONTROL_XML, MIXED_OUTLETS_XML, THREE_OUTLETS_XML};
    use crate::protocol::ProtocolMock;

    pub fn mock_wattbox(protocol: &ProtocolMock, dry_run: bool) -> WattBox {
        WattBox {
            config: Config::new("10.0.0.5", "admin", "admin").dry_run(dry_run),
            protocol: Box::new(protocol.clone()),
            status: None,
        }
    }

    pub fn loaded_wattbox(protocol: &ProtocolMock) -> WattBox {
        protocol.push_response(Ok(String::from(THREE_OUTLETS_XML)));
        let mut wattbox = mock_wattbox(protocol, false);
        wattbox.load().unwrap();
        wattbox
    }

    #[test]
    fn test_outlets_before_load() {
        let protocol = ProtocolMock::new();
        let wattbox = mock_wattbox(&protocol, false);

        assert!(matches!(wattbox.outlets(), Err(Error::NotLoaded)));
        assert!(matches!(wattbox.info(), Err(Error::NotLoaded)));
        assert!(protocol.requests().is_empty());
    }

    #[test]
    fn test_load_three_outlets() {
        let protocol = ProtocolMock::new();
        let wattbox = loaded_wattbox(&protocol);

        let outlets = wattbox.outlets().unwrap();
        assert_eq!(outlets.len(), 3);
        assert_eq!(
            outlets.iter().map(|o| o.name.as_str()).collect::<Vec<_>>(),
            vec!["TV", "Router", "Modem"]
        );
        assert_eq!(outlets.iter().map(|o| o.index).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(outlets.iter().all(|o| o.on));
        assert_eq!(protocol.requests(), vec!["/wattbox_info.xml"]);
    }

    #[test]
    fn test_reload_replaces_outlets() {
        let protocol = ProtocolMock::new();
        let mut wattbox = loaded_wattbox(&protocol);
        protocol.push_response(Ok(String::from(MIXED_OUTLETS_XML)));

        let outlets = wattbox.load().unwrap();

        assert_eq!(outlets.len(), 4);
        assert_eq!(outlets[0].name, "Amp");
        assert_eq!(wattbox.info().unwrap().hostname.as_deref(), Some("Closet"));
    }

    #[test]
    fn test_failed_load_keeps_previous_state() {
        let protocol = ProtocolMock::new();
        let mut wattbox = loaded_wattbox(&protocol);
        protocol.push_response(Ok(String::from("<request><outlet_name>TV</request>")));
        protocol.push_response(Err(Error::Authentication));

        assert!(matches!(wattbox.load(), Err(Error::Parse(_))));
        assert!(matches!(wattbox.load(), Err(Error::Authentication)));
        assert_eq!(wattbox.outlets().unwrap().len(), 3);
    }

    #[test]
    fn test_failed_first_load_stays_unloaded() {
        let protocol = ProtocolMock::new();
        let mut wattbox = mock_wattbox(&protocol, false);
        protocol.push_response(Ok(String::from("garbage")));

        assert!(wattbox.load().is_err());
        assert!(matches!(wattbox.outlets(), Err(Error::NotLoaded)));
    }

    #[test]
    fn test_set_outlet_state_off() {
        let protocol = ProtocolMock::new();
        let wattbox = loaded_wattbox(&protocol);

        wattbox.set_outlet_state(1, false).unwrap();

        let requests = protocol.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[1].starts_with("/control.cgi?outlet=1&command=0&time="));
        assert!(requests[1].ends_with("999"));
        assert!(wattbox.outlet(1).unwrap().on);
    }

    #[test]
    fn test_set_outlet_state_on() {
        let protocol = ProtocolMock::new();
        let wattbox = loaded_wattbox(&protocol);

        wattbox.set_outlet_state(3, true).unwrap();

        assert!(protocol.requests()[1].starts_with("/control.cgi?outlet=3&command=1&"));
    }

    #[test]
    fn test_set_outlet_state_out_of_range() {
        let protocol = ProtocolMock::new();
        let wattbox = loaded_wattbox(&protocol);

        assert!(matches!(wattbox.set_outlet_state(0, true), Err(Error::OutOfRange(0))));
        assert!(matches!(wattbox.set_outlet_state(4, true), Err(Error::OutOfRange(4))));
        assert_eq!(protocol.requests().len(), 1);
    }

    #[test]
    fn test_set_outlet_state_before_load() {
        let protocol = ProtocolMock::new();
        let wattbox = mock_wattbox(&protocol, false);

        assert!(matches!(wattbox.set_outlet_state(1, true), Err(Error::NotLoaded)));
        assert!(protocol.requests().is_empty());
    }

    #[test]
    fn test_set_outlet_state_propagates_errors() {
        let protocol = ProtocolMock::new();
        let wattbox = loaded_wattbox(&protocol);
        protocol.push_response(Err(Error::Authentication));

        assert!(matches!(wattbox.set_outlet_state(2, false), Err(Error::Authentication)));
    }

    #[test]
    fn test_reset_outlet() {
        let protocol = ProtocolMock::new();
        let wattbox = loaded_wattbox(&protocol);

        wattbox.reset_outlet(2).unwrap();

        assert!(protocol.requests()[1].starts_with("/control.cgi?outlet=2&command=3&"));
    }

    #[test]
    fn test_dry_run_sends_nothing() {
        let protocol = ProtocolMock::new();
        protocol.push_response(Ok(String::from(THREE_OUTLETS_XML)));
        let mut wattbox = mock_wattbox(&protocol, true);
        wattbox.load().unwrap();

        wattbox.set_outlet_state(1, false).unwrap();
        wattbox.reset_outlet(2).unwrap();

        assert_eq!(protocol.requests(), vec!["/wattbox_info.xml"]);
        assert!(matches!(wattbox.reset_outlet(9), Err(Error::OutOfRange(9))));
    }

    #[test]
    fn test_refresh_updates_states() {
        let protocol = ProtocolMock::new();
        let mut wattbox = loaded_wattbox(&protocol);
        protocol.push_response(Ok(String::from(CONTROL_XML)));

        let outlets = wattbox.refresh().unwrap();

        assert_eq!(outlets.iter().map(|o| o.on).collect::<Vec<_>>(), vec![false, true, true]);
        assert_eq!(outlets[0].name, "TV");
        assert_eq!(protocol.requests()[1], "/control.cgi");
    }

    #[test]
    fn test_refresh_count_mismatch() {
        let protocol = ProtocolMock::new();
        let mut wattbox = loaded_wattbox(&protocol);
        protocol.push_response(Ok(String::from(
            "<request><outlet_status>0,0</outlet_status></request>",
        )));

        assert!(matches!(wattbox.refresh(), Err(Error::Parse(_))));
        assert!(wattbox.outlets().unwrap().iter().all(|o| o.on));
    }

    #[test]
    fn test_refresh_before_load() {
        let protocol = ProtocolMock::new();
        let mut wattbox = mock_wattbox(&protocol, false);

        assert!(matches!(wattbox.refresh(), Err(Error::NotLoaded)));
        assert!(protocol.requests().is_empty());
    }
}
