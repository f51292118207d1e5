//! Serde shape of the network configuration document.
//!
//! Everything is optional here; required fields are enforced while the
//! document is turned into a [`super::NetworkConfig`] so that errors can name
//! the offending entry.

use std::{collections::BTreeMap, path::PathBuf};

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NetworkConfigDocument {
    pub name: Option<Value>,
    pub version: Option<Value>,
    pub description: Option<String>,
    pub client: Option<ClientSection>,
    #[serde(default)]
    pub channels: BTreeMap<String, Option<ChannelEntry>>,
    #[serde(default)]
    pub organizations: BTreeMap<String, Option<OrganizationEntry>>,
    #[serde(default)]
    pub orderers: BTreeMap<String, Option<NodeEntry>>,
    #[serde(default)]
    pub peers: BTreeMap<String, Option<NodeEntry>>,
    #[serde(default)]
    pub certificate_authorities: BTreeMap<String, Option<CaEntry>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ClientSection {
    pub organization: Option<String>,
}

/// Inline PEM or a path to a PEM file.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct PemSource {
    pub pem: Option<String>,
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NodeEntry {
    pub url: Option<String>,
    pub event_url: Option<String>,
    #[serde(default)]
    pub grpc_options: BTreeMap<String, Value>,
    #[serde(rename = "tlsCACerts")]
    pub tls_ca_certs: Option<PemSource>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OrganizationEntry {
    pub mspid: Option<String>,
    #[serde(default)]
    pub peers: Vec<String>,
    #[serde(default)]
    pub certificate_authorities: Vec<String>,
    pub admin_private_key: Option<PemSource>,
    pub signed_cert: Option<PemSource>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CaEntry {
    pub url: Option<String>,
    pub ca_name: Option<String>,
    #[serde(default)]
    pub http_options: BTreeMap<String, Value>,
    #[serde(rename = "tlsCACerts")]
    pub tls_ca_certs: Option<PemSource>,
    pub registrar: Option<OneOrMany<RegistrarEntry>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RegistrarEntry {
    pub enroll_id: Option<String>,
    pub enroll_secret: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChannelEntry {
    #[serde(default)]
    pub orderers: Vec<String>,
    #[serde(default)]
    pub peers: BTreeMap<String, Option<PeerRolesEntry>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PeerRolesEntry {
    pub endorsing_peer: Option<bool>,
    pub chaincode_query: Option<bool>,
    pub ledger_query: Option<bool>,
    pub event_source: Option<bool>,
    pub discover: Option<bool>,
}

/// Render a scalar document value the way it should appear in a property map.
pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
