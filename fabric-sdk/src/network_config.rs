//! Network topology loaded from a declarative JSON or YAML document.
//!
//! The document is validated completely while loading: every peer, orderer
//! and certificate authority a channel or organization refers to must be
//! defined, otherwise loading fails with
//! [`FabricSdkError::NetworkConfiguration`]. After a successful load every
//! lookup is infallible apart from unknown names.

mod document;

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, info};

use crate::{
    constants::properties::*,
    crypto::PrivateKey,
    error::Result,
    identity::{Enrollment, UserInfo},
    infrastructure::pem_utils,
    FabricSdkError, Properties,
};
use document::{
    scalar_to_string, CaEntry, ChannelEntry, NetworkConfigDocument, NodeEntry, OrganizationEntry,
    PemSource, PeerRolesEntry,
};

/// A peer, orderer or event hub endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub name: String,
    pub url: String,
    pub properties: Properties,
}

/// What a peer is used for on a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerRoles {
    pub endorsing_peer: bool,
    pub chaincode_query: bool,
    pub ledger_query: bool,
    pub event_source: bool,
    pub discover: bool,
}

impl Default for PeerRoles {
    fn default() -> Self {
        Self {
            endorsing_peer: true,
            chaincode_query: true,
            ledger_query: true,
            event_source: true,
            discover: true,
        }
    }
}

impl From<&PeerRolesEntry> for PeerRoles {
    fn from(entry: &PeerRolesEntry) -> Self {
        Self {
            endorsing_peer: entry.endorsing_peer.unwrap_or(true),
            chaincode_query: entry.chaincode_query.unwrap_or(true),
            ledger_query: entry.ledger_query.unwrap_or(true),
            event_source: entry.event_source.unwrap_or(true),
            discover: entry.discover.unwrap_or(true),
        }
    }
}

/// A certificate authority an organization enrolls with.
#[derive(Debug, Clone, PartialEq)]
pub struct CaInfo {
    pub name: String,
    pub msp_id: String,
    pub url: String,
    /// Name of the CA inside a multi-CA server, sent as `ca=<name>`.
    pub ca_name: Option<String>,
    pub http_options: Properties,
    /// TLS and host name verification properties (`pemFile`, `pemBytes`,
    /// `allowAllHostNames`).
    pub properties: Properties,
    pub registrars: Vec<UserInfo>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrgInfo {
    pub name: String,
    pub msp_id: String,
    pub peer_names: Vec<String>,
    pub certificate_authorities: Vec<CaInfo>,
    pub peer_admin: Option<UserInfo>,
}

/// A channel with its member nodes resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelConfig {
    pub name: String,
    pub orderers: Vec<Node>,
    pub peers: Vec<(Node, PeerRoles)>,
    pub event_hubs: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
struct ChannelDefinition {
    orderer_names: Vec<String>,
    peers: Vec<(String, PeerRoles)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NetworkConfig {
    name: String,
    version: String,
    description: Option<String>,
    client_organization: String,
    peers: BTreeMap<String, Node>,
    orderers: BTreeMap<String, Node>,
    event_hubs: BTreeMap<String, Node>,
    organizations: BTreeMap<String, OrgInfo>,
    channels: BTreeMap<String, ChannelDefinition>,
}

impl NetworkConfig {
    /// Load a `.json`, `.yaml` or `.yml` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&contents),
            _ => Self::from_json_str(&contents),
        }
    }

    pub fn from_json_str(contents: &str) -> Result<Self> {
        let document: NetworkConfigDocument = serde_json::from_str(contents)?;
        Self::from_document(document)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let document: NetworkConfigDocument = serde_yaml::from_str(contents)?;
        Self::from_document(document)
    }

    pub fn from_json_value(value: serde_json::Value) -> Result<Self> {
        let document: NetworkConfigDocument = serde_json::from_value(value)?;
        Self::from_document(document)
    }

    fn from_document(document: NetworkConfigDocument) -> Result<Self> {
        let name = document
            .name
            .as_ref()
            .and_then(scalar_to_string)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| FabricSdkError::network_config("Network config must have a name"))?;
        let version = document
            .version
            .as_ref()
            .and_then(scalar_to_string)
            .filter(|version| !version.is_empty())
            .ok_or_else(|| FabricSdkError::network_config("Network config must have a version"))?;

        info!("Loading network config {} version {}", name, version);

        let (peers, event_hubs) = create_peers(&document.peers)?;
        let orderers = create_orderers(&document.orderers)?;
        let organizations = create_organizations(
            &document.organizations,
            &document.certificate_authorities,
            &peers,
        )?;

        let client_organization = document
            .client
            .as_ref()
            .and_then(|client| client.organization.clone())
            .filter(|org| !org.is_empty())
            .ok_or_else(|| {
                FabricSdkError::network_config("A client organization must be specified")
            })?;
        if !organizations.contains_key(&client_organization) {
            return Err(FabricSdkError::network_config(format!(
                "Client organization {client_organization} is not defined"
            )));
        }

        let channels = create_channels(&document.channels, &peers, &orderers)?;

        Ok(Self {
            name,
            version,
            description: document.description,
            client_organization,
            peers,
            orderers,
            event_hubs,
            organizations,
            channels,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn client_organization(&self) -> &OrgInfo {
        // Checked while loading.
        &self.organizations[&self.client_organization]
    }

    pub fn organization(&self, name: &str) -> Option<&OrgInfo> {
        self.organizations.get(name)
    }

    pub fn organizations(&self) -> impl Iterator<Item = &OrgInfo> {
        self.organizations.values()
    }

    /// Peer admin of organization `org_name`, if one is configured.
    pub fn peer_admin(&self, org_name: &str) -> Result<Option<&UserInfo>> {
        let org = self.organizations.get(org_name).ok_or_else(|| {
            FabricSdkError::network_config(format!("Organization {org_name} is not defined"))
        })?;
        Ok(org.peer_admin.as_ref())
    }

    /// Peer admin of the client organization, if one is configured.
    pub fn client_peer_admin(&self) -> Option<&UserInfo> {
        self.client_organization().peer_admin.as_ref()
    }

    pub fn peer_names(&self) -> Vec<&str> {
        self.peers.keys().map(String::as_str).collect()
    }

    pub fn orderer_names(&self) -> Vec<&str> {
        self.orderers.keys().map(String::as_str).collect()
    }

    pub fn eventhub_names(&self) -> Vec<&str> {
        self.event_hubs.keys().map(String::as_str).collect()
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.keys().map(String::as_str).collect()
    }

    pub fn peer_properties(&self, name: &str) -> Result<&Properties> {
        node_properties("Peer", name, &self.peers)
    }

    pub fn orderer_properties(&self, name: &str) -> Result<&Properties> {
        node_properties("Orderer", name, &self.orderers)
    }

    pub fn eventhub_properties(&self, name: &str) -> Result<&Properties> {
        node_properties("EventHub", name, &self.event_hubs)
    }

    pub fn set_peer_properties(&mut self, name: &str, properties: Properties) -> Result<()> {
        set_node_properties("Peer", name, &mut self.peers, properties)
    }

    pub fn set_orderer_properties(&mut self, name: &str, properties: Properties) -> Result<()> {
        set_node_properties("Orderer", name, &mut self.orderers, properties)
    }

    pub fn set_eventhub_properties(&mut self, name: &str, properties: Properties) -> Result<()> {
        set_node_properties("EventHub", name, &mut self.event_hubs, properties)
    }

    /// Resolve a channel to its orderers, peers (with roles) and the event
    /// hubs of its event-source peers.
    pub fn channel(&self, name: &str) -> Result<ChannelConfig> {
        let definition = self.channels.get(name).ok_or_else(|| {
            FabricSdkError::network_config(format!(
                "Channel {name} not found in configuration file. Found channel names: {}",
                self.channel_names().join(", ")
            ))
        })?;

        let orderers = definition
            .orderer_names
            .iter()
            .filter_map(|orderer| self.orderers.get(orderer).cloned())
            .collect();

        let mut peers = Vec::new();
        let mut event_hubs = Vec::new();
        for (peer_name, roles) in &definition.peers {
            if let Some(peer) = self.peers.get(peer_name) {
                peers.push((peer.clone(), *roles));
            }
            if roles.event_source {
                if let Some(event_hub) = self.event_hubs.get(peer_name) {
                    event_hubs.push(event_hub.clone());
                }
            }
        }

        Ok(ChannelConfig {
            name: name.to_string(),
            orderers,
            peers,
            event_hubs,
        })
    }
}

fn node_properties<'a>(
    kind: &str,
    name: &str,
    nodes: &'a BTreeMap<String, Node>,
) -> Result<&'a Properties> {
    if name.is_empty() {
        return Err(FabricSdkError::InvalidArgument(
            "Parameter name is null or empty.".to_string(),
        ));
    }
    nodes
        .get(name)
        .map(|node| &node.properties)
        .ok_or_else(|| FabricSdkError::InvalidArgument(format!("{kind} {name} not found.")))
}

fn set_node_properties(
    kind: &str,
    name: &str,
    nodes: &mut BTreeMap<String, Node>,
    properties: Properties,
) -> Result<()> {
    if name.is_empty() {
        return Err(FabricSdkError::InvalidArgument(
            "Parameter name is null or empty.".to_string(),
        ));
    }
    let node = nodes
        .get_mut(name)
        .ok_or_else(|| FabricSdkError::InvalidArgument(format!("{kind} {name} not found.")))?;
    node.properties = properties;
    Ok(())
}

fn create_peers(
    entries: &BTreeMap<String, Option<NodeEntry>>,
) -> Result<(BTreeMap<String, Node>, BTreeMap<String, Node>)> {
    let mut peers = BTreeMap::new();
    let mut event_hubs = BTreeMap::new();

    for (name, entry) in entries {
        let invalid = || {
            FabricSdkError::network_config(format!(
                "Error loading config. Invalid peer entry: {name}"
            ))
        };
        let entry = entry.as_ref().ok_or_else(invalid)?;
        let node = create_node(name, entry, entry.url.as_deref())?.ok_or_else(invalid)?;
        let _ = peers.insert(name.clone(), node);

        if let Some(event_hub) = create_node(name, entry, entry.event_url.as_deref())? {
            let _ = event_hubs.insert(name.clone(), event_hub);
        }
    }

    Ok((peers, event_hubs))
}

fn create_orderers(
    entries: &BTreeMap<String, Option<NodeEntry>>,
) -> Result<BTreeMap<String, Node>> {
    let mut orderers = BTreeMap::new();

    for (name, entry) in entries {
        let invalid = || {
            FabricSdkError::network_config(format!(
                "Error loading config. Invalid orderer entry: {name}"
            ))
        };
        let entry = entry.as_ref().ok_or_else(invalid)?;
        let node = create_node(name, entry, entry.url.as_deref())?.ok_or_else(invalid)?;
        let _ = orderers.insert(name.clone(), node);
    }

    Ok(orderers)
}

/// Node at `url`, or `None` when the url is missing or empty.
fn create_node(name: &str, entry: &NodeEntry, url: Option<&str>) -> Result<Option<Node>> {
    let url = match url {
        Some(url) if !url.is_empty() => url,
        _ => return Ok(None),
    };

    let mut properties = grpc_properties(&entry.grpc_options)?;
    if let Some(tls) = &entry.tls_ca_certs {
        tls_properties(&format!("Node {name}"), tls, &mut properties)?;
    }

    Ok(Some(Node {
        name: name.to_string(),
        url: url.to_string(),
        properties,
    }))
}

/// Transport options with legacy key names mapped onto the canonical ones.
pub fn grpc_properties(options: &BTreeMap<String, serde_json::Value>) -> Result<Properties> {
    let mut properties: Properties = options
        .iter()
        .filter_map(|(key, value)| scalar_to_string(value).map(|value| (key.clone(), value)))
        .collect();

    for (legacy, canonical) in [
        (NETTY_KEEPALIVE_TIME, GRPC_KEEPALIVE_TIME_MS),
        (NETTY_KEEPALIVE_TIMEOUT, GRPC_KEEPALIVE_TIMEOUT_MS),
        (NETTY_MAX_INBOUND_MESSAGE_SIZE, GRPC_MAX_RECEIVE_MESSAGE_LENGTH),
    ] {
        if let Some(value) = properties.remove(legacy) {
            let _ = properties.insert(canonical.to_string(), value);
        }
    }

    if let Some(seconds) = properties.remove(GRPC_HTTP2_KEEPALIVE_TIME) {
        let seconds: u64 = seconds.trim().parse().map_err(|_| {
            FabricSdkError::network_config(format!(
                "{GRPC_HTTP2_KEEPALIVE_TIME} must be a whole number of seconds, got {seconds}"
            ))
        })?;
        let millis = seconds.checked_mul(1000).ok_or_else(|| {
            FabricSdkError::network_config(format!(
                "{GRPC_HTTP2_KEEPALIVE_TIME} of {seconds} seconds is out of range"
            ))
        })?;
        let _ = properties.insert(GRPC_KEEPALIVE_TIME_MS.to_string(), millis.to_string());
    }

    Ok(properties)
}

fn tls_properties(context: &str, tls: &PemSource, properties: &mut Properties) -> Result<()> {
    if tls.pem.is_some() && tls.path.is_some() {
        return Err(FabricSdkError::network_config(format!(
            "{context} should not specify both tlsCACerts path and pem"
        )));
    }
    if let Some(path) = tls.path.as_ref().filter(|path| !path.as_os_str().is_empty()) {
        // The file is only read when a connection is made.
        let _ = properties.insert(PEM_FILE.to_string(), path.display().to_string());
    }
    if let Some(pem) = tls.pem.as_ref().filter(|pem| !pem.is_empty()) {
        let _ = properties.insert(PEM_BYTES.to_string(), pem.clone());
    }
    Ok(())
}

fn create_organizations(
    entries: &BTreeMap<String, Option<OrganizationEntry>>,
    certificate_authorities: &BTreeMap<String, Option<CaEntry>>,
    peers: &BTreeMap<String, Node>,
) -> Result<BTreeMap<String, OrgInfo>> {
    let mut organizations = BTreeMap::new();

    for (name, entry) in entries {
        let entry = entry.as_ref().ok_or_else(|| {
            FabricSdkError::network_config(format!(
                "Error loading config. Invalid Organization entry: {name}"
            ))
        })?;
        let org = create_organization(name, entry, certificate_authorities, peers)?;
        let _ = organizations.insert(name.clone(), org);
    }

    Ok(organizations)
}

fn create_organization(
    name: &str,
    entry: &OrganizationEntry,
    certificate_authorities: &BTreeMap<String, Option<CaEntry>>,
    peers: &BTreeMap<String, Node>,
) -> Result<OrgInfo> {
    let prefix = format!("Organization {name}");
    let msp_id = entry
        .mspid
        .clone()
        .filter(|msp_id| !msp_id.is_empty())
        .ok_or_else(|| FabricSdkError::network_config(format!("{prefix}: mspid is required")))?;

    let mut peer_names = Vec::new();
    for peer in entry.peers.iter().filter(|peer| !peer.is_empty()) {
        if !peers.contains_key(peer) {
            return Err(FabricSdkError::network_config(format!(
                "{prefix}: Peer {peer} is not defined"
            )));
        }
        peer_names.push(peer.clone());
    }

    let mut cas = Vec::new();
    for ca_name in entry.certificate_authorities.iter().filter(|ca| !ca.is_empty()) {
        let ca_entry = certificate_authorities
            .get(ca_name)
            .and_then(Option::as_ref)
            .ok_or_else(|| {
                FabricSdkError::network_config(format!(
                    "{prefix}: Certificate Authority {ca_name} is not defined"
                ))
            })?;
        cas.push(create_ca(ca_name, ca_entry, &msp_id)?);
    }

    let admin_key = extract_pem(entry.admin_private_key.as_ref(), "adminPrivateKey", &prefix)?;
    let signed_cert = extract_pem(entry.signed_cert.as_ref(), "signedCert", &prefix)?;

    let peer_admin = match (admin_key, signed_cert) {
        (Some(key), Some(certificate)) => {
            let key = pem_utils::validate_private_key_pem(key.as_bytes()).map_err(|_| {
                FabricSdkError::network_config(format!("{prefix}: Invalid private key"))
            })?;
            let certificate =
                pem_utils::validate_certificate_pem(certificate.as_bytes()).map_err(|_| {
                    FabricSdkError::network_config(format!("{prefix}: Invalid signed certificate"))
                })?;
            let enrollment = Enrollment::new(PrivateKey::from_pem(key), certificate);
            let admin_name = format!("PeerAdmin_{msp_id}_{name}");
            debug!("Created peer admin {}", admin_name);
            Some(UserInfo::new(admin_name, msp_id.clone()).with_enrollment(enrollment))
        }
        _ => None,
    };

    Ok(OrgInfo {
        name: name.to_string(),
        msp_id,
        peer_names,
        certificate_authorities: cas,
        peer_admin,
    })
}

fn create_ca(name: &str, entry: &CaEntry, msp_id: &str) -> Result<CaInfo> {
    let url = entry
        .url
        .clone()
        .filter(|url| !url.is_empty())
        .ok_or_else(|| {
            FabricSdkError::network_config(format!("Error loading config. Invalid CA entry: {name}"))
        })?;

    let http_options: Properties = entry
        .http_options
        .iter()
        .filter_map(|(key, value)| scalar_to_string(value).map(|value| (key.clone(), value)))
        .collect();

    let mut properties = Properties::new();
    if http_options
        .get("verify")
        .map(|verify| verify.eq_ignore_ascii_case("false"))
        .unwrap_or(false)
    {
        let _ = properties.insert(ALLOW_ALL_HOST_NAMES.to_string(), "true".to_string());
    }
    if let Some(tls) = &entry.tls_ca_certs {
        tls_properties(&format!("Certificate Authority {name}"), tls, &mut properties)?;
    }

    let mut registrars = Vec::new();
    for registrar in entry.registrar.clone().map(|r| r.into_vec()).unwrap_or_default() {
        let enroll_id = registrar
            .enroll_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                FabricSdkError::network_config(format!(
                    "Certificate Authority {name}: registrar enrollId is required"
                ))
            })?;
        let mut user = UserInfo::new(enroll_id, msp_id);
        if let Some(secret) = registrar.enroll_secret {
            user = user.with_enroll_secret(secret);
        }
        registrars.push(user);
    }

    Ok(CaInfo {
        name: name.to_string(),
        msp_id: msp_id.to_string(),
        url,
        ca_name: entry.ca_name.clone().filter(|ca_name| !ca_name.is_empty()),
        http_options,
        properties,
        registrars,
    })
}

/// PEM text from either an inline `pem` or a `path` to a file.
fn extract_pem(source: Option<&PemSource>, field: &str, prefix: &str) -> Result<Option<String>> {
    let source = match source {
        Some(source) => source,
        None => return Ok(None),
    };

    if source.path.is_some() && source.pem.is_some() {
        return Err(FabricSdkError::network_config(format!(
            "{prefix} should not specify both {field} path and pem"
        )));
    }

    if let Some(path) = &source.path {
        let full_path = absolute(path);
        if !full_path.is_file() {
            return Err(FabricSdkError::network_config(format!(
                "{prefix}: {field} file {} does not exist",
                full_path.display()
            )));
        }
        let contents = fs::read_to_string(&full_path).map_err(|e| {
            FabricSdkError::network_config(format!(
                "Failed to read file: {}: {e}",
                full_path.display()
            ))
        })?;
        return Ok(Some(contents));
    }

    Ok(source.pem.clone().filter(|pem| !pem.is_empty()))
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|dir| dir.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

fn create_channels(
    entries: &BTreeMap<String, Option<ChannelEntry>>,
    peers: &BTreeMap<String, Node>,
    orderers: &BTreeMap<String, Node>,
) -> Result<BTreeMap<String, ChannelDefinition>> {
    let mut channels = BTreeMap::new();

    for (channel_name, entry) in entries {
        let entry = entry.clone().unwrap_or_default();

        for orderer in &entry.orderers {
            if !orderers.contains_key(orderer) {
                return Err(FabricSdkError::network_config(format!(
                    "Error constructing channel {channel_name}. Orderer {orderer} not defined in configuration"
                )));
            }
        }

        let mut channel_peers = Vec::new();
        for (peer_name, roles) in &entry.peers {
            if !peers.contains_key(peer_name) {
                return Err(FabricSdkError::network_config(format!(
                    "Error constructing channel {channel_name}. Peer {peer_name} not defined in configuration"
                )));
            }
            let roles = roles.as_ref().map(PeerRoles::from).unwrap_or_default();
            channel_peers.push((peer_name.clone(), roles));
        }

        if channel_peers.is_empty() {
            return Err(FabricSdkError::network_config(format!(
                "Error constructing channel {channel_name}. At least one peer must be specified"
            )));
        }

        let _ = channels.insert(
            channel_name.clone(),
            ChannelDefinition {
                orderer_names: entry.orderers.clone(),
                peers: channel_peers,
            },
        );
    }

    Ok(channels)
}
