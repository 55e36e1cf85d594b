use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::debug;
use ureq::{tls::TlsConfig, Agent};

use crate::{
    config::{Config, Scheme},
    error::{Error, Result},
};

#[cfg(test)]
use std::{cell::RefCell, collections::VecDeque, rc::Rc};

// The firmware only speaks HTTP Basic
pub fn basic_auth(username: &str, password: &str) -> String {
    let token = STANDARD.encode(format!("{}:{}", username, password));
    format!("Basic {}", token)
}

pub trait Protocol {
    /// Send an authenticated GET for `path` and return the response body
    fn get(&self, path: &str) -> Result<String>;
}

pub struct HttpProtocol {
    agent: Agent,
    base_url: String,
    authorization: String,
}

impl HttpProtocol {
    pub fn new(config: &Config) -> HttpProtocol {
        let mut builder = Agent::config_builder().timeout_global(Some(config.timeout));
        if config.scheme == Scheme::Https {
            // WattBoxes ship with self-signed certificates
            builder = builder.tls_config(TlsConfig::builder().disable_verification(true).build());
        }
        HttpProtocol {
            agent: builder.build().into(),
            base_url: config.base_url(),
            authorization: basic_auth(&config.username, &config.password),
        }
    }
}

impl Protocol for HttpProtocol {
    fn get(&self, path: &str) -> Result<String> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);
        let mut response = self
            .agent
            .get(&url)
            .header("Authorization", &self.authorization)
            .call()?;
        let body = response.body_mut().read_to_vec()?;
        String::from_utf8(body).map_err(|err| Error::Parse(err.to_string()))
    }
}

#[cfg(test)]
#[derive(Clone, Default)]
pub struct ProtocolMock {
    requests: Rc<RefCell<Vec<String>>>,
    responses: Rc<RefCell<VecDeque<Result<String>>>>,
}

#[cfg(test)]
impl ProtocolMock {
    pub fn new() -> ProtocolMock {
        ProtocolMock::default()
    }

    pub fn push_response(&self, resp: Result<String>) {
        self.responses.borrow_mut().push_back(resp);
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

#[cfg(test)]
impl Protocol for ProtocolMock {
    fn get(&self, path: &str) -> Result<String> {
        self.requests.borrow_mut().push(path.to_string());
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Ok(String::new()))
    }
}
