//! Server configuration types
//!
//! Defines the configuration structures for the SOCKS5 server.

use crate::socks::auth::AuthMethod;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Default listen address
fn default_listen_addr() -> String {
    "127.0.0.1:1080".to_string()
}

/// Default authentication preference list
fn default_auth_methods() -> Vec<AuthMethod> {
    vec![AuthMethod::NoAuth]
}

/// Default outbound connect timeout in seconds
fn default_connect_timeout() -> u64 {
    10
}

/// Root configuration structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
}

/// Server configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    /// Address the server listens on (e.g. "0.0.0.0:1080")
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// SOCKS5 protocol options
    #[serde(default)]
    pub socks: SocksConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            socks: SocksConfig::default(),
        }
    }
}

/// SOCKS5 protocol configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SocksConfig {
    /// Authentication methods in server preference order
    #[serde(default = "default_auth_methods")]
    pub auth_methods: Vec<AuthMethod>,

    /// Username/password database for the `password` method
    #[serde(default)]
    pub users: HashMap<String, String>,

    /// Allow the BIND command (reserved; replies general-failure when on)
    #[serde(default)]
    pub enable_bind: bool,

    /// Allow the UDP ASSOCIATE command
    #[serde(default)]
    pub enable_udp: bool,

    /// Tear down a relay after this many seconds without traffic
    #[serde(default)]
    pub idle_timeout_secs: Option<u64>,

    /// Timeout for outbound TCP dials in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for SocksConfig {
    fn default() -> Self {
        Self {
            auth_methods: default_auth_methods(),
            users: HashMap::new(),
            enable_bind: false,
            enable_udp: false,
            idle_timeout_secs: None,
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl SocksConfig {
    /// Look up a user's password
    pub fn lookup_user(&self, username: &str) -> Option<&str> {
        self.users.get(username).map(String::as_str)
    }

    /// Idle timeout as a [`Duration`], if configured
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_secs.map(Duration::from_secs)
    }

    /// Outbound connect timeout as a [`Duration`]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.auth_methods.is_empty() {
            return Err("auth_methods must list at least one method".to_string());
        }
        if self.auth_methods.contains(&AuthMethod::UserPass) && self.users.is_empty() {
            return Err("password authentication enabled but no users configured".to_string());
        }
        Ok(())
    }
}
