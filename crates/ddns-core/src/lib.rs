// # ddns-core
//
// Core library for the DDNS vendor update system.
//
// ## Architecture Overview
//
// - **Provider**: Trait every vendor adapter implements (one HTTP call per update)
// - **ProviderRegistry**: Plugin-based registry mapping vendor names to factories
// - **Matcher**: Injected credential shape checks, run once at construction
// - **HttpClient**: Client seam injected into every update
// - **Error**: Closed failure taxonomy with a stable [`ErrorKind`]
//
// ## Design Principles
//
// 1. **Immutability**: Providers never change after construction, so they
//    are shared freely between concurrent updates
// 2. **Single-shot**: A provider sends exactly one request per update and
//    never retries; scheduling and retry belong to the caller
// 3. **Plugin-Based**: Vendors are registered dynamically, no hard-coded if-else
// 4. **Typed outcomes**: Every vendor response resolves to a confirmed IP or
//    exactly one error variant

pub mod config;
pub mod error;
pub mod http;
pub mod registry;
pub mod traits;
pub mod utils;

// Re-export core types for convenience
pub use config::{DdnsConfig, IpVersion, ProviderConfig};
pub use error::{Error, ErrorKind, Result};
pub use http::{HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestClient};
pub use registry::ProviderRegistry;
pub use traits::{HtmlRow, Matcher, Provider, ProviderFactory, RegexMatcher, update_cancellable};
