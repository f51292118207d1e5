use bytes::Bytes;

use crate::{deserializer::LazyProto, error::Result, protos::peer::ChaincodeEvent};

/// An event emitted by a chaincode during a transaction.
#[derive(Debug)]
pub struct ChaincodeEventDeserializer {
    inner: LazyProto<ChaincodeEvent>,
}

impl ChaincodeEventDeserializer {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            inner: LazyProto::new(bytes),
        }
    }

    pub fn event_name(&self) -> Result<String> {
        Ok(self.inner.get()?.event_name.clone())
    }

    pub fn chaincode_id(&self) -> Result<String> {
        Ok(self.inner.get()?.chaincode_id.clone())
    }

    pub fn tx_id(&self) -> Result<String> {
        Ok(self.inner.get()?.tx_id.clone())
    }

    pub fn payload(&self) -> Result<Vec<u8>> {
        Ok(self.inner.get()?.payload.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn event_fields_are_exposed() -> Result<()> {
        let event = ChaincodeEvent {
            chaincode_id: "mycc".to_string(),
            tx_id: "tx-1".to_string(),
            event_name: "transfer".to_string(),
            payload: b"{}".to_vec(),
        };
        let view = ChaincodeEventDeserializer::new(event.encode_to_vec());

        assert_eq!(view.event_name()?, "transfer");
        assert_eq!(view.chaincode_id()?, "mycc");
        assert_eq!(view.tx_id()?, "tx-1");
        assert_eq!(view.payload()?, b"{}".to_vec());
        Ok(())
    }
}
