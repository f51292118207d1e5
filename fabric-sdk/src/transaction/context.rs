use std::{fmt::Debug, sync::Arc};

use prost::Message;
use prost_types::Timestamp;
use rand::RngCore;

use crate::{
    constants::NONCE_LENGTH,
    crypto::CryptoSuite,
    error::Result,
    identity::{Enrollment, User},
    protos::{
        common::SignatureHeader,
        msp::SerializedIdentity,
        peer::{Proposal, SignedProposal},
    },
    transaction::builders,
    FabricSdkError,
};

/// Per-operation signing state: who signs, for which channel, and the nonce,
/// transaction id and timestamp that tie the resulting messages together.
///
/// A context belongs to exactly one operation. Sharing one between two
/// proposals would reuse the nonce and transaction id.
pub struct TransactionContext {
    user: Arc<dyn User>,
    enrollment: Enrollment,
    crypto: Arc<dyn CryptoSuite>,
    channel_id: String,
    identity: SerializedIdentity,
    nonce: Vec<u8>,
    tx_id: String,
    epoch: u64,
    timestamp: Timestamp,
}

impl TransactionContext {
    /// Create a context with a fresh random nonce and the current time.
    pub fn new(
        channel_id: impl Into<String>,
        user: Arc<dyn User>,
        crypto: Arc<dyn CryptoSuite>,
    ) -> Result<Self> {
        let mut nonce = vec![0; NONCE_LENGTH];
        rand::thread_rng().fill_bytes(&mut nonce);
        Self::with_nonce(channel_id, user, crypto, nonce, builders::current_timestamp())
    }

    /// Create a context with a caller-chosen nonce and timestamp.
    pub fn with_nonce(
        channel_id: impl Into<String>,
        user: Arc<dyn User>,
        crypto: Arc<dyn CryptoSuite>,
        nonce: Vec<u8>,
        timestamp: Timestamp,
    ) -> Result<Self> {
        let enrollment = user.enrollment().cloned().ok_or_else(|| {
            FabricSdkError::InvalidArgument(format!("User {} is not enrolled", user.name()))
        })?;
        let identity = builders::serialized_identity(user.as_ref())?;

        let mut tx_id_input = nonce.clone();
        tx_id_input.extend_from_slice(&identity.encode_to_vec());
        let tx_id = hex::encode(crypto.hash(&tx_id_input)?);

        Ok(Self {
            user,
            enrollment,
            crypto,
            channel_id: channel_id.into(),
            identity,
            nonce,
            tx_id,
            epoch: 0,
            timestamp,
        })
    }

    pub fn user(&self) -> &dyn User {
        self.user.as_ref()
    }

    pub fn crypto(&self) -> &Arc<dyn CryptoSuite> {
        &self.crypto
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn identity(&self) -> &SerializedIdentity {
        &self.identity
    }

    pub fn nonce(&self) -> &[u8] {
        &self.nonce
    }

    pub fn tx_id(&self) -> &str {
        &self.tx_id
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn timestamp(&self) -> &Timestamp {
        &self.timestamp
    }

    /// Encoded [`SignatureHeader`] carrying this context's creator and nonce.
    pub fn signature_header_bytes(&self) -> Vec<u8> {
        SignatureHeader {
            creator: self.identity.encode_to_vec(),
            nonce: self.nonce.clone(),
        }
        .encode_to_vec()
    }

    /// Sign `bytes` with the context's enrollment key.
    pub fn sign(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        Ok(self.crypto.sign(self.enrollment.key(), bytes)?)
    }

    /// Encode `proposal` once and sign exactly those bytes.
    pub fn sign_proposal(&self, proposal: &Proposal) -> Result<SignedProposal> {
        let proposal_bytes = proposal.encode_to_vec();
        let signature = self.sign(&proposal_bytes)?;
        Ok(SignedProposal {
            proposal_bytes,
            signature,
        })
    }
}

impl Debug for TransactionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionContext")
            .field("user", &self.user.name())
            .field("msp_id", &self.identity.mspid)
            .field("channel_id", &self.channel_id)
            .field("tx_id", &self.tx_id)
            .field("epoch", &self.epoch)
            .field("timestamp", &self.timestamp)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{crypto::OpenSslCryptoSuite, identity::UserInfo, test_utils};

    fn suite() -> Arc<dyn CryptoSuite> {
        Arc::new(OpenSslCryptoSuite::default())
    }

    #[test]
    fn tx_id_is_hash_of_nonce_and_creator() -> Result<()> {
        let user = Arc::new(test_utils::enrolled_user("alice", "Org1MSP"));
        let context = TransactionContext::new("mychannel", user, suite())?;

        let mut input = context.nonce().to_vec();
        input.extend_from_slice(&context.identity().encode_to_vec());
        let expected = hex::encode(context.crypto().hash(&input)?);

        assert_eq!(context.tx_id(), expected);
        assert_eq!(context.nonce().len(), NONCE_LENGTH);
        assert_eq!(context.channel_id(), "mychannel");
        assert_eq!(context.identity().mspid, "Org1MSP");
        Ok(())
    }

    #[test]
    fn fresh_contexts_do_not_collide() -> Result<()> {
        let user: Arc<dyn User> = Arc::new(test_utils::enrolled_user("alice", "Org1MSP"));
        let first = TransactionContext::new("mychannel", user.clone(), suite())?;
        let second = TransactionContext::new("mychannel", user, suite())?;

        assert_ne!(first.nonce(), second.nonce());
        assert_ne!(first.tx_id(), second.tx_id());
        Ok(())
    }

    #[test]
    fn unenrolled_user_is_rejected() {
        let user = Arc::new(UserInfo::new("bob", "Org1MSP"));
        let error = TransactionContext::new("mychannel", user, suite()).unwrap_err();
        assert!(matches!(error, FabricSdkError::InvalidArgument(_)));
    }

    #[test]
    fn signed_proposal_covers_proposal_bytes() -> Result<()> {
        let user = Arc::new(test_utils::enrolled_user("alice", "Org1MSP"));
        let certificate = user.enrollment().unwrap().certificate().to_string();
        let context = TransactionContext::new("mychannel", user, suite())?;

        let proposal = Proposal {
            header: vec![1, 2, 3],
            payload: vec![4, 5, 6],
            extension: vec![],
        };
        let signed = context.sign_proposal(&proposal)?;

        assert_eq!(signed.proposal_bytes, proposal.encode_to_vec());
        assert!(context
            .crypto()
            .verify(&certificate, &signed.signature, &signed.proposal_bytes)?);
        Ok(())
    }
}
