//! Configuration types for the DDNS system
//!
//! A configuration file is a JSON object with a `settings` array; each entry
//! describes one record at one vendor:
//!
//! ```json
//! {
//!   "settings": [
//!     { "provider": "namecheap", "domain": "example.com", "host": "@",
//!       "password": "0123456789abcdef0123456789abcdef" },
//!     { "provider": "dondominio", "domain": "example.org", "ip_version": "ipv6",
//!       "username": "user", "password": "secret", "name": "example" }
//!   ]
//! }
//! ```
//!
//! Only the fields shared by every vendor are decoded here. The whole entry
//! is kept as raw JSON and handed to the vendor constructor, which decodes
//! its own credential fields from it.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::path::Path;

/// IP version a record is updated for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpVersion {
    /// A record
    #[default]
    Ipv4,
    /// AAAA record
    Ipv6,
}

impl IpVersion {
    /// Configuration name of this version
    pub fn as_str(self) -> &'static str {
        match self {
            IpVersion::Ipv4 => "ipv4",
            IpVersion::Ipv6 => "ipv6",
        }
    }

    /// Whether `ip` belongs to this version
    ///
    /// IPv4-mapped IPv6 addresses count as IPv4.
    pub fn matches(self, ip: IpAddr) -> bool {
        match self {
            IpVersion::Ipv4 => ip.to_canonical().is_ipv4(),
            IpVersion::Ipv6 => ip.to_canonical().is_ipv6(),
        }
    }
}

impl fmt::Display for IpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One configured record at one vendor
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    /// Vendor name used to look up the factory (e.g. "namecheap")
    pub provider: String,

    /// Registered domain (e.g. "example.com")
    pub domain: String,

    /// Host label within the domain; vendor-specific default when empty
    pub host: String,

    /// IP version to update
    pub ip_version: IpVersion,

    /// The complete settings entry, including vendor-specific fields
    pub raw: serde_json::Value,
}

#[derive(Deserialize)]
struct CommonSettings {
    provider: String,
    domain: String,
    #[serde(default)]
    host: String,
    #[serde(default)]
    ip_version: IpVersion,
}

impl ProviderConfig {
    /// Decode the shared fields of a settings entry, keeping the entry itself
    pub fn from_value(raw: serde_json::Value) -> Result<Self> {
        let common = CommonSettings::deserialize(&raw)?;
        Ok(Self {
            provider: common.provider,
            domain: common.domain,
            host: common.host,
            ip_version: common.ip_version,
            raw,
        })
    }

    /// Validate the vendor-independent fields
    pub fn validate(&self) -> Result<()> {
        if self.provider.is_empty() {
            return Err(Error::config("provider cannot be empty"));
        }
        if self.domain.is_empty() {
            return Err(Error::config(format!(
                "domain cannot be empty for provider {}",
                self.provider
            )));
        }
        Ok(())
    }
}

/// Main DDNS configuration
#[derive(Debug, Clone, PartialEq)]
pub struct DdnsConfig {
    /// Configured records, in file order
    pub settings: Vec<ProviderConfig>,
}

#[derive(Deserialize)]
struct RawConfig {
    #[serde(default)]
    settings: Vec<serde_json::Value>,
}

impl DdnsConfig {
    /// Parse and validate a configuration from JSON text
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: RawConfig = serde_json::from_str(json)?;
        let settings = raw
            .settings
            .into_iter()
            .map(ProviderConfig::from_value)
            .collect::<Result<Vec<_>>>()?;

        let config = Self { settings };
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("reading {}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.settings.is_empty() {
            return Err(Error::config("no settings configured"));
        }
        for settings in &self.settings {
            settings.validate()?;
        }
        Ok(())
    }
}
