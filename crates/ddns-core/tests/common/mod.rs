//! Test doubles for provider contract tests
//!
//! `ScriptedClient` stands in for the network; `StubProvider` is the
//! smallest provider that honours the contract (one request per update,
//! confirmed address taken from the response body).

#![allow(dead_code)]

use async_trait::async_trait;
use ddns_core::utils;
use ddns_core::{
    Error, HtmlRow, HttpClient, HttpError, HttpRequest, HttpResponse, IpVersion, Matcher,
    Provider, ProviderConfig, ProviderFactory, Result,
};
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// What the scripted client does with every request
#[derive(Clone)]
pub enum Script {
    /// Answer 200 with the given body
    Ok(String),
    /// Answer with a status and body
    Status(u16, String),
    /// Fail with a transport timeout
    Timeout,
    /// Never answer
    Stall,
}

pub struct ScriptedClient {
    script: Script,
    requests: AtomicUsize,
    in_flight: Arc<AtomicUsize>,
}

/// Decrements the in-flight counter when a request future is dropped
struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedClient {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            requests: AtomicUsize::new(0),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of requests issued so far
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Number of requests started and not yet finished or dropped
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpClient for ScriptedClient {
    async fn request(&self, _req: HttpRequest) -> std::result::Result<HttpResponse, HttpError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let _guard = InFlight(Arc::clone(&self.in_flight));

        // Yield once so concurrent callers interleave.
        tokio::task::yield_now().await;

        match &self.script {
            Script::Ok(body) => Ok(HttpResponse::with_status(
                http::StatusCode::OK,
                body.clone().into_bytes(),
            )),
            Script::Status(code, body) => Ok(HttpResponse::with_status(
                http::StatusCode::from_u16(*code).unwrap(),
                body.clone().into_bytes(),
            )),
            Script::Timeout => Err(HttpError::Timeout),
            Script::Stall => std::future::pending().await,
        }
    }
}

/// Provider whose vendor answers with the stored address as plain text
#[derive(Debug)]
pub struct StubProvider {
    domain: String,
    host: String,
}

impl StubProvider {
    pub fn new(domain: &str, host: &str) -> Self {
        Self {
            domain: domain.to_string(),
            host: host.to_string(),
        }
    }
}

impl fmt::Display for StubProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&utils::describe(&self.domain, &self.host, "stub", IpVersion::Ipv4))
    }
}

#[async_trait]
impl Provider for StubProvider {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn domain(&self) -> &str {
        &self.domain
    }

    fn host(&self) -> &str {
        &self.host
    }

    fn ip_version(&self) -> IpVersion {
        IpVersion::Ipv4
    }

    fn html(&self) -> HtmlRow {
        HtmlRow {
            domain: self.build_domain_name(),
            host: self.host.clone(),
            provider: "stub".to_string(),
            ip_version: IpVersion::Ipv4.to_string(),
        }
    }

    async fn update(&self, client: &dyn HttpClient, ip: IpAddr) -> Result<IpAddr> {
        let mut url = url::Url::parse("https://stub.invalid/update").unwrap();
        url.query_pairs_mut()
            .append_pair("host", &self.host)
            .append_pair("ip", &ip.to_string());

        let response = client.request(HttpRequest::get(url)).await?;
        if response.status != http::StatusCode::OK {
            return Err(Error::BadHttpStatus {
                status: response.status.as_u16(),
                body: utils::body_to_single_line(&response.body),
            });
        }

        let text = response.body_text();
        let received: IpAddr = text
            .trim()
            .parse()
            .map_err(|_| Error::IpReceivedMalformed(text.trim().to_string()))?;
        if !utils::same_ip(ip, received) {
            return Err(Error::IpReceivedMismatch { requested: ip, received });
        }
        Ok(received)
    }
}

pub struct StubFactory;

impl ProviderFactory for StubFactory {
    fn create(
        &self,
        config: &ProviderConfig,
        _matcher: &Arc<dyn Matcher>,
    ) -> Result<Box<dyn Provider>> {
        if config.host == "@" {
            return Err(Error::HostOnlyAt);
        }
        Ok(Box::new(StubProvider::new(&config.domain, &config.host)))
    }
}
