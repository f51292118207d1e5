use bytes::Bytes;

use crate::{
    deserializer::{EnvelopeDeserializer, LazyProto},
    error::Result,
    protos::common::{Block, BlockHeader},
    FabricSdkError,
};

/// View over a block. Blocks can be large, so the cache can be dropped with
/// `lazy().invalidate()` while the view is kept around.
#[derive(Debug)]
pub struct BlockDeserializer {
    inner: LazyProto<Block>,
}

impl BlockDeserializer {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            inner: LazyProto::new(bytes),
        }
    }

    pub fn number(&self) -> Result<u64> {
        self.block_header_field(|header| header.number)
    }

    pub fn previous_hash(&self) -> Result<Vec<u8>> {
        self.block_header_field(|header| header.previous_hash.clone())
    }

    pub fn data_hash(&self) -> Result<Vec<u8>> {
        self.block_header_field(|header| header.data_hash.clone())
    }

    pub fn data_count(&self) -> Result<usize> {
        Ok(self
            .inner
            .get()?
            .data
            .as_ref()
            .map(|data| data.data.len())
            .unwrap_or_default())
    }

    /// The envelope at `index` in the block data.
    pub fn envelope(&self, index: usize) -> Result<EnvelopeDeserializer> {
        let block = self.inner.get()?;
        let bytes = block
            .data
            .as_ref()
            .and_then(|data| data.data.get(index))
            .ok_or(FabricSdkError::MissingField("block.data"))?;
        Ok(EnvelopeDeserializer::new(bytes.clone()))
    }

    pub fn metadata(&self) -> Result<Vec<Vec<u8>>> {
        Ok(self
            .inner
            .get()?
            .metadata
            .as_ref()
            .map(|metadata| metadata.metadata.clone())
            .unwrap_or_default())
    }

    pub fn lazy(&self) -> &LazyProto<Block> {
        &self.inner
    }

    fn block_header_field<T>(
        &self,
        field: impl FnOnce(&BlockHeader) -> T,
    ) -> Result<T> {
        let block = self.inner.get()?;
        let header = block
            .header
            .as_ref()
            .ok_or(FabricSdkError::MissingField("block.header"))?;
        Ok(field(header))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protos::common::{BlockData, Envelope};
    use prost::Message;

    fn block() -> Block {
        let envelope = Envelope {
            payload: vec![],
            signature: vec![4, 4],
        };
        Block {
            header: Some(BlockHeader {
                number: 12,
                previous_hash: vec![1],
                data_hash: vec![2],
            }),
            data: Some(BlockData {
                data: vec![envelope.encode_to_vec()],
            }),
            metadata: None,
        }
    }

    #[test]
    fn block_fields_are_exposed() -> Result<()> {
        let view = BlockDeserializer::new(block().encode_to_vec());
        assert_eq!(view.number()?, 12);
        assert_eq!(view.previous_hash()?, vec![1]);
        assert_eq!(view.data_hash()?, vec![2]);
        assert_eq!(view.data_count()?, 1);
        assert_eq!(view.envelope(0)?.signature()?, vec![4, 4]);
        assert!(view.envelope(1).is_err());
        assert!(view.metadata()?.is_empty());
        Ok(())
    }

    #[test]
    fn dropping_the_cache_keeps_answers() -> Result<()> {
        let view = BlockDeserializer::new(block().encode_to_vec());
        let before = view.number()?;
        view.lazy().invalidate();
        assert_eq!(view.number()?, before);
        Ok(())
    }
}
