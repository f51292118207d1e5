use bytes::Bytes;

use crate::{
    deserializer::{LazyProto, SignatureHeaderDeserializer},
    error::Result,
    protos::peer::{Transaction, TransactionAction},
};

#[derive(Debug)]
pub struct TransactionDeserializer {
    inner: LazyProto<Transaction>,
}

impl TransactionDeserializer {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            inner: LazyProto::new(bytes),
        }
    }

    pub fn action_count(&self) -> Result<usize> {
        Ok(self.inner.get()?.actions.len())
    }

    pub fn actions(&self) -> Result<Vec<TransactionActionDeserializer>> {
        Ok(self
            .inner
            .get()?
            .actions
            .iter()
            .cloned()
            .map(TransactionActionDeserializer::from_action)
            .collect())
    }
}

#[derive(Debug, Clone)]
pub struct TransactionActionDeserializer {
    action: TransactionAction,
}

impl TransactionActionDeserializer {
    pub fn from_action(action: TransactionAction) -> Self {
        Self { action }
    }

    pub fn signature_header(&self) -> SignatureHeaderDeserializer {
        SignatureHeaderDeserializer::new(self.action.header.clone())
    }

    pub fn payload(&self) -> &[u8] {
        &self.action.payload
    }
}
