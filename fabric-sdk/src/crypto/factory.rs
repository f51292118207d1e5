use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use tracing::debug;

use crate::{
    constants::crypto_properties::{
        DEFAULT_HASH_ALGORITHM, DEFAULT_SECURITY_LEVEL, HASH_ALGORITHM, SECURITY_LEVEL,
    },
    crypto::{CryptoError, CryptoSuite, OpenSslCryptoSuite},
    Properties,
};

/// Hands out crypto suites keyed by their configuration properties.
///
/// Suites are cached by property-set equality: the first request for a given
/// set constructs the suite, later requests share it. Entries are never
/// removed. Construct one factory and pass it to whatever needs suites.
#[derive(Debug, Default)]
pub struct CryptoSuiteFactory {
    cache: Mutex<HashMap<Properties, Arc<dyn CryptoSuite>>>,
}

impl CryptoSuiteFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Suite for the default properties (level 256, SHA2).
    pub fn default_suite(&self) -> Result<Arc<dyn CryptoSuite>, CryptoError> {
        self.get_crypto_suite(&Properties::new())
    }

    pub fn get_crypto_suite(
        &self,
        properties: &Properties,
    ) -> Result<Arc<dyn CryptoSuite>, CryptoError> {
        let properties = with_defaults(properties);

        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(suite) = cache.get(&properties) {
            return Ok(suite.clone());
        }

        let suite: Arc<dyn CryptoSuite> = Arc::new(OpenSslCryptoSuite::from_properties(&properties)?);
        debug!("Created crypto suite for properties {:?}", properties);
        let _ = cache.insert(properties, suite.clone());

        Ok(suite)
    }

    /// Number of distinct suites constructed so far.
    pub fn len(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn with_defaults(properties: &Properties) -> Properties {
    let mut properties = properties.clone();
    let _ = properties
        .entry(SECURITY_LEVEL.to_string())
        .or_insert_with(|| DEFAULT_SECURITY_LEVEL.to_string());
    let _ = properties
        .entry(HASH_ALGORITHM.to_string())
        .or_insert_with(|| DEFAULT_HASH_ALGORITHM.to_string());
    properties
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_properties_share_a_suite() -> Result<(), CryptoError> {
        let factory = CryptoSuiteFactory::new();
        let first = factory.default_suite()?;

        let mut explicit = Properties::new();
        let _ = explicit.insert(SECURITY_LEVEL.to_string(), "256".to_string());
        let second = factory.get_crypto_suite(&explicit)?;

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(factory.len(), 1);
        Ok(())
    }

    #[test]
    fn distinct_properties_get_distinct_suites() -> Result<(), CryptoError> {
        let factory = CryptoSuiteFactory::new();
        let mut p384 = Properties::new();
        let _ = p384.insert(SECURITY_LEVEL.to_string(), "384".to_string());

        let default = factory.default_suite()?;
        let strong = factory.get_crypto_suite(&p384)?;

        assert!(!Arc::ptr_eq(&default, &strong));
        assert_eq!(factory.len(), 2);
        Ok(())
    }

    #[test]
    fn invalid_properties_are_not_cached() {
        let factory = CryptoSuiteFactory::new();
        let mut bad = Properties::new();
        let _ = bad.insert(HASH_ALGORITHM.to_string(), "MD5".to_string());

        assert!(factory.get_crypto_suite(&bad).is_err());
        assert!(factory.is_empty());
    }

    #[test]
    fn concurrent_first_use_creates_one_suite() {
        let factory = Arc::new(CryptoSuiteFactory::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let factory = factory.clone();
                std::thread::spawn(move || factory.default_suite().unwrap())
            })
            .collect();

        let suites: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for suite in &suites[1..] {
            assert!(Arc::ptr_eq(&suites[0], suite));
        }
        assert_eq!(factory.len(), 1);
    }
}
