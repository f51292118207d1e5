use std::{
    fmt::Debug,
    sync::{Arc, Mutex, PoisonError},
};

use bytes::Bytes;
use prost::Message;

use crate::error::Result;

/// Encoded bytes plus a cached decode of them.
///
/// The bytes are held for the lifetime of the wrapper. The decoded value is
/// produced on first access and may be dropped with [`LazyProto::invalidate`]
/// (for example when the caller is under memory pressure); the next access
/// decodes again. Decoding is a pure function of the bytes, so dropping the
/// cache never changes what callers observe.
pub struct LazyProto<T> {
    bytes: Bytes,
    cached: Mutex<Option<Arc<T>>>,
}

impl<T: Message + Default> LazyProto<T> {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            cached: Mutex::new(None),
        }
    }

    /// The encoded message.
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// The decoded message, decoding it if it is not cached.
    pub fn get(&self) -> Result<Arc<T>> {
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(value) = cached.as_ref() {
            return Ok(value.clone());
        }

        let value = Arc::new(T::decode(self.bytes.clone())?);
        *cached = Some(value.clone());
        Ok(value)
    }

    /// Drop the cached decode. Outstanding `Arc`s stay valid.
    pub fn invalidate(&self) {
        *self.cached.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn is_cached(&self) -> bool {
        self.cached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl<T> Debug for LazyProto<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyProto")
            .field("type", &std::any::type_name::<T>())
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{protos::common::ChannelHeader, FabricSdkError};

    fn encoded_header() -> Vec<u8> {
        ChannelHeader {
            channel_id: "mychannel".to_string(),
            tx_id: "abc".to_string(),
            epoch: 3,
            ..Default::default()
        }
        .encode_to_vec()
    }

    #[test]
    fn decodes_once_and_caches() -> Result<()> {
        let lazy = LazyProto::<ChannelHeader>::new(encoded_header());
        assert!(!lazy.is_cached());

        let first = lazy.get()?;
        assert!(lazy.is_cached());
        let second = lazy.get()?;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.channel_id, "mychannel");
        Ok(())
    }

    #[test]
    fn invalidation_redecodes_same_value() -> Result<()> {
        let lazy = LazyProto::<ChannelHeader>::new(encoded_header());
        let before = lazy.get()?;

        lazy.invalidate();
        assert!(!lazy.is_cached());
        let after = lazy.get()?;

        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(*before, *after);
        Ok(())
    }

    #[test]
    fn malformed_bytes_fail_every_time() {
        let lazy = LazyProto::<ChannelHeader>::new(vec![0xff, 0xff, 0xff]);
        assert!(matches!(lazy.get(), Err(FabricSdkError::Deserialization(_))));
        assert!(matches!(lazy.get(), Err(FabricSdkError::Deserialization(_))));
        assert!(!lazy.is_cached());
    }
}
