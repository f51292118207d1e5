//! Protocol messages, signing context, and configuration types shared by the
//! clients of a permissioned ledger network.
//!
//! This crate builds correctly-shaped and correctly-signed protocol envelopes
//! (proposals, deliver requests), lazily decodes the messages a network sends
//! back, and loads the declarative network topology document. The certificate
//! authority client lives in the `fabric-ca-client` crate and depends on the
//! identity and crypto types defined here.
#![warn(unused_results)]
#![warn(future_incompatible)]
#![warn(unused)]
#![forbid(rustdoc::broken_intra_doc_links)]

pub mod constants;
pub mod crypto;
pub mod deserializer;
pub mod error;
pub mod identity;
pub mod infrastructure;
pub mod network_config;
pub mod protos;
pub mod transaction;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use error::FabricSdkError;

/// String properties attached to nodes, certificate authorities and crypto
/// suites.
pub type Properties = std::collections::BTreeMap<String, String>;
