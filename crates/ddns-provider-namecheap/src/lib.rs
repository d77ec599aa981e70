// # Namecheap DNS Provider
//
// This crate provides the Namecheap dynamic DNS provider for the DDNS system.
//
// ## Protocol
//
// - One `GET` to `https://dynamicdns.park-your-domain.com/update` with
//   `host`, `domain`, `password` and (unless the vendor should infer the
//   caller's address) `ip` as query parameters
// - The answer is an `<interface-response>` XML document; a non-empty
//   `errors/Err1` element signals failure, `IP` carries the stored address
// - IPv6 records cannot be updated through this endpoint
//
// ## Security Requirements
//
// - The password NEVER appears in logs or `Debug` output
// - The password shape is validated by the injected matcher before any
//   request is sent
//
// ## API Reference
//
// - https://www.namecheap.com/support/knowledgebase/article.aspx/29/11/how-to-dynamically-update-the-hosts-ip-with-an-http-request/

use async_trait::async_trait;
use ddns_core::config::ProviderConfig;
use ddns_core::http::{HttpClient, HttpRequest};
use ddns_core::traits::{HtmlRow, Matcher, Provider, ProviderFactory};
use ddns_core::{Error, IpVersion, Result, utils};
use http::{HeaderValue, StatusCode, header};
use serde::Deserialize;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

/// Vendor name used for registry lookup and logging
pub const PROVIDER_NAME: &str = "namecheap";

/// Namecheap dynamic DNS update endpoint
const UPDATE_URL: &str = "https://dynamicdns.park-your-domain.com/update";

/// Vendor-specific settings decoded from the configuration entry
#[derive(Deserialize)]
struct ExtraSettings {
    #[serde(default)]
    password: String,
    #[serde(default, rename = "provider_ip")]
    use_provider_ip: bool,
}

/// Namecheap DNS provider
///
/// # Trust Level: Untrusted
///
/// Isolated, stateless and single-shot. Retries and scheduling belong to
/// the caller.
#[derive(Clone)]
pub struct NamecheapProvider {
    domain: String,
    host: String,
    ip_version: IpVersion,
    /// Dynamic DNS password
    /// ⚠️ NEVER log this value
    password: String,
    /// Let Namecheap use the address the request arrives from
    use_provider_ip: bool,
}

// Custom Debug implementation that hides the password
impl fmt::Debug for NamecheapProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamecheapProvider")
            .field("domain", &self.domain)
            .field("host", &self.host)
            .field("ip_version", &self.ip_version)
            .field("password", &"<REDACTED>")
            .field("use_provider_ip", &self.use_provider_ip)
            .finish()
    }
}

impl fmt::Display for NamecheapProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&utils::describe(
            &self.domain,
            &self.host,
            PROVIDER_NAME,
            self.ip_version,
        ))
    }
}

impl NamecheapProvider {
    /// Create a validated Namecheap provider
    ///
    /// # Parameters
    ///
    /// - `data`: The settings entry; `password` and `provider_ip` are read from it
    /// - `domain`, `host`, `ip_version`: Record identity
    /// - `matcher`: Validates the password shape
    ///
    /// # Errors
    ///
    /// Checked in this order, first failure wins:
    /// 1. [`Error::Ipv6NotSupported`] for IPv6 records
    /// 2. [`Error::Settings`] when the settings entry does not decode
    /// 3. [`Error::MalformedPassword`] when the matcher rejects the password
    pub fn new(
        data: &serde_json::Value,
        domain: impl Into<String>,
        host: impl Into<String>,
        ip_version: IpVersion,
        matcher: &dyn Matcher,
    ) -> Result<Self> {
        if ip_version == IpVersion::Ipv6 {
            return Err(Error::Ipv6NotSupported);
        }

        let extra = ExtraSettings::deserialize(data)?;

        let provider = Self {
            domain: domain.into(),
            host: host.into(),
            ip_version,
            password: extra.password,
            use_provider_ip: extra.use_provider_ip,
        };
        provider.validate(matcher)?;
        Ok(provider)
    }

    fn validate(&self, matcher: &dyn Matcher) -> Result<()> {
        if !matcher.namecheap_password(&self.password) {
            return Err(Error::MalformedPassword);
        }
        Ok(())
    }

    /// Whether the vendor is left to infer the address from the connection
    pub fn uses_provider_ip(&self) -> bool {
        self.use_provider_ip
    }

    fn build_request(&self, ip: IpAddr) -> Result<HttpRequest> {
        let mut url = url::Url::parse(UPDATE_URL).map_err(|e| Error::request(e.to_string()))?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("host", &self.host)
                .append_pair("domain", &self.domain)
                .append_pair("password", &self.password);
            if !self.use_provider_ip {
                query.append_pair("ip", &ip.to_string());
            }
        }

        Ok(HttpRequest::get(url)
            .with_header(header::USER_AGENT, utils::user_agent())
            .with_header(header::ACCEPT, HeaderValue::from_static("application/xml")))
    }
}

/// The parts of `<interface-response>` the update outcome depends on
#[derive(Debug, Default, Deserialize)]
struct InterfaceResponse {
    #[serde(rename = "IP", default)]
    ip: Option<String>,
    #[serde(default)]
    errors: Option<Errors>,
}

#[derive(Debug, Default, Deserialize)]
struct Errors {
    #[serde(rename = "Err1", default)]
    err1: Option<String>,
}

impl InterfaceResponse {
    fn error(&self) -> &str {
        self.errors
            .as_ref()
            .and_then(|errors| errors.err1.as_deref())
            .map(str::trim)
            .unwrap_or_default()
    }

    fn ip(&self) -> &str {
        self.ip.as_deref().map(str::trim).unwrap_or_default()
    }
}

/// Drop the XML declaration so a mislabelled charset cannot break decoding
///
/// Bodies are decoded as UTF-8 whatever encoding they declare.
fn strip_declaration(text: &str) -> &str {
    let text = text.trim_start_matches('\u{feff}').trim_start();
    if text.starts_with("<?xml")
        && let Some(end) = text.find("?>")
    {
        return text[end + 2..].trim_start();
    }
    text
}

fn decode_response(body: &[u8]) -> Result<InterfaceResponse> {
    let text = String::from_utf8_lossy(body);
    quick_xml::de::from_str(strip_declaration(&text)).map_err(Error::unmarshal)
}

#[async_trait]
impl Provider for NamecheapProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn domain(&self) -> &str {
        &self.domain
    }

    fn host(&self) -> &str {
        &self.host
    }

    fn ip_version(&self) -> IpVersion {
        self.ip_version
    }

    fn html(&self) -> HtmlRow {
        let name = self.build_domain_name();
        HtmlRow {
            domain: format!("<a href=\"http://{}\">{}</a>", name, name),
            host: self.host.clone(),
            provider: "<a href=\"https://namecheap.com\">Namecheap</a>".to_string(),
            ip_version: self.ip_version.to_string(),
        }
    }

    /// Update the record through the dynamic DNS endpoint
    ///
    /// - An empty `IP` element means the vendor applied the address without
    ///   echoing it; the requested address is returned
    /// - With `provider_ip` set no address is sent, but an echoed address
    ///   other than `ip` is still a mismatch
    async fn update(&self, client: &dyn HttpClient, ip: IpAddr) -> Result<IpAddr> {
        let request = self.build_request(ip)?;

        tracing::debug!(
            record = %self.build_domain_name(),
            ip = %ip,
            provider_ip = self.use_provider_ip,
            "Sending Namecheap update"
        );

        let response = client.request(request).await?;

        if response.status != StatusCode::OK {
            return Err(Error::BadHttpStatus {
                status: response.status.as_u16(),
                body: utils::body_to_single_line(&response.body),
            });
        }

        let parsed = decode_response(&response.body)?;

        let vendor_error = parsed.error();
        if !vendor_error.is_empty() {
            return Err(Error::unsuccessful(vendor_error, None));
        }

        let ip_text = parsed.ip();
        if ip_text.is_empty() {
            tracing::debug!(record = %self.build_domain_name(), "Namecheap did not echo an address");
            return Ok(ip);
        }

        let received: IpAddr = ip_text
            .parse()
            .map_err(|_| Error::IpReceivedMalformed(ip_text.to_string()))?;

        if !utils::same_ip(ip, received) {
            return Err(Error::IpReceivedMismatch {
                requested: ip,
                received,
            });
        }

        tracing::info!(record = %self.build_domain_name(), ip = %received, "Namecheap record updated");
        Ok(received)
    }
}

/// Factory for creating Namecheap providers
pub struct NamecheapFactory;

impl ProviderFactory for NamecheapFactory {
    fn create(
        &self,
        config: &ProviderConfig,
        matcher: &Arc<dyn Matcher>,
    ) -> Result<Box<dyn Provider>> {
        let provider = NamecheapProvider::new(
            &config.raw,
            config.domain.clone(),
            config.host.clone(),
            config.ip_version,
            matcher.as_ref(),
        )?;
        Ok(Box::new(provider))
    }
}

/// Register the Namecheap provider with a registry
///
/// # Example
///
/// ```rust
/// use ddns_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::new();
/// ddns_provider_namecheap::register(&registry);
/// assert!(registry.has_provider("namecheap"));
/// ```
pub fn register(registry: &ddns_core::ProviderRegistry) {
    registry.register_provider(PROVIDER_NAME, Box::new(NamecheapFactory));
}
