// # DonDominio DNS Provider
//
// This crate provides the DonDominio provider for the DDNS system.
//
// ## Protocol
//
// - One form-encoded `POST` to `https://simple-api.dondominio.net` carrying
//   `apiuser`, `apipasswd`, `domain`, `name` and exactly one of `ipv4` or
//   `ipv6`, chosen from the requested address
// - The answer is a JSON envelope: `success`, `errorCode`, `errorCodeMsg`
//   and `responseData.gluerecords`, whose first entry confirms the address
// - Only the zone apex (`@`) can be updated
//
// ## Security Requirements
//
// - API credentials NEVER appear in logs or `Debug` output

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
pub const PROVIDER_NAME: &str = "dondominio";

/// DonDominio simple API endpoint
const API_URL: &str = "https://simple-api.dondominio.net";

/// Host every DonDominio record must use
const ROOT_HOST: &str = "@";

#[derive(Deserialize)]
struct ExtraSettings {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    name: String,
}

/// DonDominio DNS provider
///
/// # Trust Level: Untrusted
///
/// Isolated, stateless and single-shot. Retries and scheduling belong to
/// the caller.
#[derive(Clone)]
pub struct DonDominioProvider {
    domain: String,
    host: String,
    ip_version: IpVersion,
    /// API username
    username: String,
    /// API password
    /// ⚠️ NEVER log this value
    password: String,
    /// Record name at DonDominio
    name: String,
}

// Custom Debug implementation that hides the API credentials
impl fmt::Debug for DonDominioProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DonDominioProvider")
            .field("domain", &self.domain)
            .field("host", &self.host)
            .field("ip_version", &self.ip_version)
            .field("username", &"<REDACTED>")
            .field("password", &"<REDACTED>")
            .field("name", &self.name)
            .finish()
    }
}

impl fmt::Display for DonDominioProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&utils::describe(
            &self.domain,
            &self.host,
            PROVIDER_NAME,
            self.ip_version,
        ))
    }
}

impl DonDominioProvider {
    /// Create a validated DonDominio provider
    ///
    /// An empty `host` defaults to `"@"`.
    ///
    /// # Errors
    ///
    /// [`Error::Settings`] when the settings entry does not decode, then the
    /// first of, in order: [`Error::EmptyUsername`], [`Error::EmptyPassword`],
    /// [`Error::EmptyName`], [`Error::HostOnlyAt`].
    pub fn new(
        data: &serde_json::Value,
        domain: impl Into<String>,
        host: impl Into<String>,
        ip_version: IpVersion,
    ) -> Result<Self> {
        let extra = ExtraSettings::deserialize(data)?;

        let mut host = host.into();
        if host.is_empty() {
            host = ROOT_HOST.to_string();
        }

        let provider = Self {
            domain: domain.into(),
            host,
            ip_version,
            username: extra.username,
            password: extra.password,
            name: extra.name,
        };
        provider.validate()?;
        Ok(provider)
    }

    fn validate(&self) -> Result<()> {
        if self.username.is_empty() {
            return Err(Error::EmptyUsername);
        }
        if self.password.is_empty() {
            return Err(Error::EmptyPassword);
        }
        if self.name.is_empty() {
            return Err(Error::EmptyName);
        }
        if self.host != ROOT_HOST {
            return Err(Error::HostOnlyAt);
        }
        Ok(())
    }

    fn build_request(&self, ip: IpAddr) -> Result<HttpRequest> {
        let url = url::Url::parse(API_URL).map_err(|e| Error::request(e.to_string()))?;

        let address_field = match ip {
            IpAddr::V4(_) => "ipv4",
            IpAddr::V6(_) => "ipv6",
        };
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("apiuser", &self.username)
            .append_pair("apipasswd", &self.password)
            .append_pair("domain", &self.domain)
            .append_pair("name", &self.name)
            .append_pair(address_field, &ip.to_string())
            .finish();

        Ok(HttpRequest::post(url)
            .with_header(header::USER_AGENT, utils::user_agent())
            .with_header(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/x-www-form-urlencoded"),
            )
            .with_header(header::ACCEPT, HeaderValue::from_static("application/json"))
            .with_body(body.into_bytes()))
    }
}

/// DonDominio response envelope
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,
    #[serde(rename = "errorCode", default)]
    error_code: Option<i64>,
    #[serde(rename = "errorCodeMsg", default)]
    error_code_msg: Option<String>,
    #[serde(rename = "responseData", default)]
    response_data: Option<ResponseData>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseData {
    #[serde(rename = "gluerecords", default)]
    glue_records: Vec<GlueRecord>,
}

#[derive(Debug, Default, Deserialize)]
struct GlueRecord {
    #[serde(default)]
    ipv4: Option<String>,
    #[serde(default)]
    ipv6: Option<String>,
}

impl Envelope {
    /// Address field of the first glue record for the requested family
    fn confirmed_ip(&self, ipv4: bool) -> Result<&str> {
        let record = self
            .response_data
            .as_ref()
            .and_then(|data| data.glue_records.first())
            .ok_or(Error::NoGlueRecord)?;

        let field = if ipv4 { &record.ipv4 } else { &record.ipv6 };
        Ok(field.as_deref().unwrap_or_default())
    }
}

#[async_trait]
impl Provider for DonDominioProvider {
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
            provider: "<a href=\"https://www.dondominio.com/\">DonDominio</a>".to_string(),
            ip_version: self.ip_version.to_string(),
        }
    }

    async fn update(&self, client: &dyn HttpClient, ip: IpAddr) -> Result<IpAddr> {
        // An IPv4-mapped IPv6 address is sent and checked as IPv4
        let ip = ip.to_canonical();
        let request = self.build_request(ip)?;

        tracing::debug!(
            record = %self.build_domain_name(),
            name = %self.name,
            ip = %ip,
            "Sending DonDominio update"
        );

        let response = client.request(request).await?;

        if response.status != StatusCode::OK {
            return Err(Error::BadHttpStatus {
                status: response.status.as_u16(),
                body: utils::body_to_single_line(&response.body),
            });
        }

        let envelope: Envelope =
            serde_json::from_slice(&response.body).map_err(Error::unmarshal)?;

        if !envelope.success {
            return Err(Error::unsuccessful(
                envelope.error_code_msg.unwrap_or_default(),
                envelope.error_code,
            ));
        }

        let ip_text = envelope.confirmed_ip(ip.is_ipv4())?;
        let received: IpAddr = ip_text
            .trim()
            .parse()
            .map_err(|_| Error::IpReceivedMalformed(ip_text.to_string()))?;

        if !utils::same_ip(ip, received) {
            return Err(Error::IpReceivedMismatch {
                requested: ip,
                received,
            });
        }

        tracing::info!(record = %self.build_domain_name(), ip = %received, "DonDominio record updated");
        Ok(received)
    }
}

/// Factory for creating DonDominio providers
pub struct DonDominioFactory;

impl ProviderFactory for DonDominioFactory {
    fn create(
        &self,
        config: &ProviderConfig,
        _matcher: &Arc<dyn Matcher>,
    ) -> Result<Box<dyn Provider>> {
        let provider = DonDominioProvider::new(
            &config.raw,
            config.domain.clone(),
            config.host.clone(),
            config.ip_version,
        )?;
        Ok(Box::new(provider))
    }
}

/// Register the DonDominio provider with a registry
///
/// # Example
///
/// ```rust
/// use ddns_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::new();
/// ddns_provider_dondominio::register(&registry);
/// assert!(registry.has_provider("dondominio"));
/// ```
pub fn register(registry: &ddns_core::ProviderRegistry) {
    registry.register_provider(PROVIDER_NAME, Box::new(DonDominioFactory));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings() -> serde_json::Value {
        json!({ "username": "user", "password": "secret-pass", "name": "example" })
    }

    #[test]
    fn empty_host_defaults_to_root() {
        let provider = DonDominioProvider::new(&settings(), "example.com", "", IpVersion::Ipv4)
            .unwrap();
        assert_eq!(provider.host(), "@");
        assert_eq!(provider.build_domain_name(), "example.com");
    }

    #[test]
    fn ipv6_records_are_supported() {
        let provider = DonDominioProvider::new(&settings(), "example.com", "@", IpVersion::Ipv6)
            .unwrap();
        assert_eq!(provider.ip_version(), IpVersion::Ipv6);
    }

    #[test]
    fn undecodable_settings_fail_first() {
        let data = json!({ "username": ["not", "a", "string"] });
        let err = DonDominioProvider::new(&data, "example.com", "www", IpVersion::Ipv4)
            .unwrap_err();
        assert!(matches!(err, Error::Settings(_)));
    }

    #[test]
    fn validation_order_is_fixed() {
        // Everything wrong: username is reported first
        let err = DonDominioProvider::new(&json!({}), "example.com", "www", IpVersion::Ipv4)
            .unwrap_err();
        assert!(matches!(err, Error::EmptyUsername));

        let err = DonDominioProvider::new(
            &json!({ "username": "user" }),
            "example.com",
            "www",
            IpVersion::Ipv4,
        )
        .unwrap_err();
        assert!(matches!(err, Error::EmptyPassword));

        let err = DonDominioProvider::new(
            &json!({ "username": "user", "password": "secret-pass" }),
            "example.com",
            "www",
            IpVersion::Ipv4,
        )
        .unwrap_err();
        assert!(matches!(err, Error::EmptyName));

        let err = DonDominioProvider::new(&settings(), "example.com", "www", IpVersion::Ipv4)
            .unwrap_err();
        assert!(matches!(err, Error::HostOnlyAt));
    }

    #[test]
    fn accessors_are_stable() {
        let provider = DonDominioProvider::new(&settings(), "example.com", "@", IpVersion::Ipv4)
            .unwrap();

        assert_eq!(provider.name(), "dondominio");
        assert_eq!(provider.domain(), "example.com");
        assert!(!provider.proxied());
        assert_eq!(provider.build_domain_name(), provider.build_domain_name());
        assert_eq!(
            provider.to_string(),
            "[domain: example.com | host: @ | provider: dondominio | ip: ipv4]"
        );
        assert_eq!(
            provider.html().provider,
            "<a href=\"https://www.dondominio.com/\">DonDominio</a>"
        );
    }

    #[test]
    fn credentials_not_exposed_in_debug() {
        let provider = DonDominioProvider::new(&settings(), "example.com", "@", IpVersion::Ipv4)
            .unwrap();

        let debug_str = format!("{:?}", provider);
        assert!(!debug_str.contains("secret-pass"));
        assert!(!debug_str.contains("\"user\""));
        assert!(debug_str.contains("DonDominioProvider"));
    }

    #[test]
    fn factory_applies_host_default() {
        let config = ProviderConfig::from_value(json!({
            "provider": "dondominio",
            "domain": "example.com",
            "username": "user",
            "password": "secret-pass",
            "name": "example",
        }))
        .unwrap();
        let matcher: Arc<dyn Matcher> = Arc::new(ddns_core::RegexMatcher::new());

        let provider = DonDominioFactory.create(&config, &matcher).unwrap();
        assert_eq!(provider.host(), "@");
    }
}
