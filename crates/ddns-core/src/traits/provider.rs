// # Provider Trait
//
// Defines the interface every DNS vendor adapter implements.
//
// ## Implementations
//
// - Namecheap: `ddns-provider-namecheap` crate (XML over query string)
// - DonDominio: `ddns-provider-dondominio` crate (JSON envelope over form POST)
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::{Provider, ReqwestClient};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* Provider implementation */;
//     let client = ReqwestClient::new()?;
//
//     let confirmed = provider
//         .update(&client, std::net::IpAddr::from([203, 0, 113, 7]))
//         .await?;
//
//     Ok(())
// }
// ```

use crate::config::{IpVersion, ProviderConfig};
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::traits::Matcher;
use async_trait::async_trait;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Read-only display projection of a provider
///
/// Produced for presentation only; `update` never consults it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlRow {
    /// Fully qualified record name, as a link
    pub domain: String,
    /// Host label
    pub host: String,
    /// Vendor name, as a link to the vendor
    pub provider: String,
    /// IP version
    pub ip_version: String,
}

/// Trait for DNS vendor adapters
///
/// A provider is built once from configuration, validated, and then never
/// mutated, so one value may serve any number of concurrent updates.
///
/// # Trust Level: Untrusted
///
/// ## Allowed Capabilities
/// - ✅ Issue one HTTP(S) request to the vendor endpoint per update
/// - ✅ Parse vendor-specific responses
/// - ✅ Return the confirmed address or a typed error
///
/// ## Forbidden Capabilities
/// - ❌ Retry or back off (owned by the scheduler)
/// - ❌ Spawn tasks or threads
/// - ❌ Keep state between updates
/// - ❌ Own an HTTP client (it is injected per call)
#[async_trait]
pub trait Provider: fmt::Display + fmt::Debug + Send + Sync {
    /// Vendor name (for logging and registry lookup)
    fn name(&self) -> &'static str;

    /// Registered domain
    fn domain(&self) -> &str;

    /// Host label, after vendor defaulting
    fn host(&self) -> &str;

    /// IP version this record is updated for
    fn ip_version(&self) -> IpVersion;

    /// Whether traffic for the record is proxied by the vendor
    fn proxied(&self) -> bool {
        false
    }

    /// Fully qualified record name, for display
    fn build_domain_name(&self) -> String {
        crate::utils::build_domain_name(self.host(), self.domain())
    }

    /// Display projection of this provider
    fn html(&self) -> HtmlRow;

    /// Push `ip` to the vendor and return the address it confirms
    ///
    /// Issues exactly one request through `client`. Dropping the returned
    /// future abandons the request. Never retries.
    ///
    /// # Returns
    ///
    /// - `Ok(IpAddr)`: The address the vendor stored
    /// - `Err(Error)`: Transport, status, decode, vendor or IP validation failure
    async fn update(&self, client: &dyn HttpClient, ip: IpAddr) -> Result<IpAddr>;
}

/// Helper trait for constructing providers from configuration
pub trait ProviderFactory: Send + Sync {
    /// Create a validated provider from one settings entry
    ///
    /// # Parameters
    ///
    /// - `config`: The settings entry, including vendor-specific fields
    /// - `matcher`: Credential shape checks for vendors that need them
    fn create(
        &self,
        config: &ProviderConfig,
        matcher: &Arc<dyn Matcher>,
    ) -> Result<Box<dyn Provider>>;
}

/// Run an update that resolves to [`Error::Canceled`] once `cancel` fires
///
/// The in-flight request is dropped at cancellation; nothing keeps running
/// in the background.
pub async fn update_cancellable(
    provider: &dyn Provider,
    client: &dyn HttpClient,
    ip: IpAddr,
    cancel: &CancellationToken,
) -> Result<IpAddr> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => {
            tracing::debug!(provider = provider.name(), "update canceled");
            Err(Error::Canceled)
        }
        result = provider.update(client, ip) => result,
    }
}
