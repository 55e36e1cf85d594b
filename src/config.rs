//! Connection settings for a WattBox
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub username: String,
    pub password: String,
    /// Applies to every request; expiry surfaces as a connection error.
    pub timeout: Duration,
    pub scheme: Scheme,
    /// Log outlet commands instead of sending them.
    pub dry_run: bool,
}

impl Config {
    pub fn new(host: &str, username: &str, password: &str) -> Config {
        Config {
            host: host.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            timeout: DEFAULT_TIMEOUT,
            scheme: Scheme::Http,
            dry_run: false,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn base_url(&self) -> String {
        format!("{}://{}", self.scheme.as_str(), self.host)
    }
}
