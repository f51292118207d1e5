use bytes::Bytes;

use crate::{
    deserializer::{HeaderDeserializer, LazyProto},
    error::Result,
    protos::common::{Envelope, Payload},
    FabricSdkError,
};

#[derive(Debug)]
pub struct EnvelopeDeserializer {
    inner: LazyProto<Envelope>,
}

impl EnvelopeDeserializer {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            inner: LazyProto::new(bytes),
        }
    }

    pub fn signature(&self) -> Result<Vec<u8>> {
        Ok(self.inner.get()?.signature.clone())
    }

    pub fn payload(&self) -> Result<PayloadDeserializer> {
        Ok(PayloadDeserializer::new(self.inner.get()?.payload.clone()))
    }

    pub fn lazy(&self) -> &LazyProto<Envelope> {
        &self.inner
    }
}

#[derive(Debug)]
pub struct PayloadDeserializer {
    inner: LazyProto<Payload>,
}

impl PayloadDeserializer {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            inner: LazyProto::new(bytes),
        }
    }

    pub fn header(&self) -> Result<HeaderDeserializer> {
        let header = self
            .inner
            .get()?
            .header
            .clone()
            .ok_or(FabricSdkError::MissingField("payload.header"))?;
        Ok(HeaderDeserializer::new(header))
    }

    pub fn data(&self) -> Result<Vec<u8>> {
        Ok(self.inner.get()?.data.clone())
    }
}
