//! Core traits for the DDNS system
//!
//! - [`Provider`]: Push an address to one vendor's update API
//! - [`ProviderFactory`]: Build a provider from configuration
//! - [`Matcher`]: Validate credential shapes before any network use

pub mod matcher;
pub mod provider;

pub use matcher::{Matcher, RegexMatcher};
pub use provider::{HtmlRow, Provider, ProviderFactory, update_cancellable};
