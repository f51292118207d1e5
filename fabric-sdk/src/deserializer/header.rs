use bytes::Bytes;
use prost::Message;
use prost_types::Timestamp;

use crate::{
    deserializer::LazyProto,
    error::Result,
    protos::{
        common::{ChannelHeader, Header, HeaderType, SignatureHeader},
        msp::SerializedIdentity,
    },
    FabricSdkError,
};

/// View over a [`Header`], which embeds both of its parts as bytes.
#[derive(Debug, Clone)]
pub struct HeaderDeserializer {
    header: Header,
}

impl HeaderDeserializer {
    pub fn new(header: Header) -> Self {
        Self { header }
    }

    pub fn channel_header(&self) -> ChannelHeaderDeserializer {
        ChannelHeaderDeserializer::new(self.header.channel_header.clone())
    }

    pub fn signature_header(&self) -> SignatureHeaderDeserializer {
        SignatureHeaderDeserializer::new(self.header.signature_header.clone())
    }
}

#[derive(Debug)]
pub struct ChannelHeaderDeserializer {
    inner: LazyProto<ChannelHeader>,
}

impl ChannelHeaderDeserializer {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            inner: LazyProto::new(bytes),
        }
    }

    pub fn channel_id(&self) -> Result<String> {
        Ok(self.inner.get()?.channel_id.clone())
    }

    pub fn epoch(&self) -> Result<u64> {
        Ok(self.inner.get()?.epoch)
    }

    pub fn timestamp(&self) -> Result<Option<Timestamp>> {
        Ok(self.inner.get()?.timestamp.clone())
    }

    pub fn tx_id(&self) -> Result<String> {
        Ok(self.inner.get()?.tx_id.clone())
    }

    /// Header type. Values unknown to this crate are an error.
    pub fn header_type(&self) -> Result<HeaderType> {
        let raw = self.inner.get()?.r#type;
        HeaderType::from_i32(raw).ok_or_else(|| {
            FabricSdkError::InvalidArgument(format!("Unknown channel header type {raw}"))
        })
    }

    pub fn version(&self) -> Result<i32> {
        Ok(self.inner.get()?.version)
    }

    pub fn extension(&self) -> Result<Vec<u8>> {
        Ok(self.inner.get()?.extension.clone())
    }

    pub fn tls_cert_hash(&self) -> Result<Vec<u8>> {
        Ok(self.inner.get()?.tls_cert_hash.clone())
    }

    pub fn lazy(&self) -> &LazyProto<ChannelHeader> {
        &self.inner
    }
}

#[derive(Debug)]
pub struct SignatureHeaderDeserializer {
    inner: LazyProto<SignatureHeader>,
}

impl SignatureHeaderDeserializer {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            inner: LazyProto::new(bytes),
        }
    }

    /// The signer's identity.
    pub fn creator(&self) -> Result<SerializedIdentity> {
        let header = self.inner.get()?;
        Ok(SerializedIdentity::decode(header.creator.as_slice())?)
    }

    pub fn nonce(&self) -> Result<Vec<u8>> {
        Ok(self.inner.get()?.nonce.clone())
    }
}
