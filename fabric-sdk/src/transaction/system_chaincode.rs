//! Proposals addressed to the configuration system chaincode.
//!
//! These proposals are not scoped to an application channel: the channel id
//! in their header is empty, and the invocation name is always the first
//! argument.

use prost::Message;
use tracing::error;

use crate::{
    constants::{cscc, CSCC},
    error::Result,
    protos::{
        common::Block,
        peer::{chaincode_spec, ChaincodeId, Proposal},
    },
    transaction::{ProposalBuilder, TransactionContext},
    FabricSdkError,
};

/// Base builder for configuration system chaincode proposals.
pub fn cscc_proposal_builder(context: &TransactionContext) -> ProposalBuilder<'_> {
    ProposalBuilder::new()
        .channel_id("")
        .context(context)
        .chaincode_id(ChaincodeId {
            name: CSCC.to_string(),
            ..Default::default()
        })
        .chaincode_type(chaincode_spec::Type::Golang)
}

/// Ask a peer to join the channel whose genesis block is given.
pub fn join_peer_proposal(
    context: &TransactionContext,
    genesis_block: Option<&Block>,
) -> Result<Proposal> {
    let genesis_block = genesis_block.ok_or_else(|| {
        let message = "No genesis block for Join proposal.";
        error!("{}", message);
        FabricSdkError::Proposal(message.to_string())
    })?;

    cscc_proposal_builder(context)
        .add_arg(cscc::JOIN_CHAIN)
        .add_arg(genesis_block.encode_to_vec())
        .build()
}

/// Ask a peer which channels it has joined.
pub fn query_peer_channels_proposal(context: &TransactionContext) -> Result<Proposal> {
    cscc_proposal_builder(context)
        .add_arg(cscc::GET_CHANNELS)
        .build()
}

/// Ask a peer for the latest configuration block of `channel_name`.
pub fn get_config_block_proposal(
    context: &TransactionContext,
    channel_name: &str,
) -> Result<Proposal> {
    if channel_name.is_empty() {
        return Err(FabricSdkError::InvalidArgument(
            "channel name must not be empty".to_string(),
        ));
    }

    cscc_proposal_builder(context)
        .add_arg(cscc::GET_CONFIG_BLOCK)
        .add_arg(channel_name)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        crypto::OpenSslCryptoSuite,
        protos::{
            common::{BlockHeader, ChannelHeader, Header},
            peer::{ChaincodeInvocationSpec, ChaincodeProposalPayload, ChaincodeSpec},
        },
        test_utils,
    };
    use std::sync::Arc;

    fn context() -> TransactionContext {
        let user = Arc::new(test_utils::enrolled_user("admin", "Org1MSP"));
        TransactionContext::new("mychannel", user, Arc::new(OpenSslCryptoSuite::default()))
            .unwrap()
    }

    fn spec(proposal: &Proposal) -> ChaincodeSpec {
        let payload = ChaincodeProposalPayload::decode(proposal.payload.as_slice()).unwrap();
        ChaincodeInvocationSpec::decode(payload.input.as_slice())
            .unwrap()
            .chaincode_spec
            .unwrap()
    }

    fn channel_id(proposal: &Proposal) -> String {
        let header = Header::decode(proposal.header.as_slice()).unwrap();
        ChannelHeader::decode(header.channel_header.as_slice())
            .unwrap()
            .channel_id
    }

    #[test]
    fn join_without_genesis_block_fails() {
        let context = context();
        let error = join_peer_proposal(&context, None).unwrap_err();
        assert!(matches!(error, FabricSdkError::Proposal(message)
            if message == "No genesis block for Join proposal."));
    }

    #[test]
    fn join_carries_serialized_block() -> Result<()> {
        let context = context();
        let block = Block {
            header: Some(BlockHeader {
                number: 0,
                previous_hash: vec![],
                data_hash: vec![1, 2, 3],
            }),
            data: None,
            metadata: None,
        };

        let proposal = join_peer_proposal(&context, Some(&block))?;
        let spec = spec(&proposal);
        assert_eq!(spec.chaincode_id.unwrap().name, CSCC);
        assert_eq!(
            spec.input.unwrap().args,
            vec![b"JoinChain".to_vec(), block.encode_to_vec()]
        );
        assert_eq!(channel_id(&proposal), "");
        Ok(())
    }

    #[test]
    fn query_channels_has_single_arg() -> Result<()> {
        let context = context();
        let proposal = query_peer_channels_proposal(&context)?;
        assert_eq!(spec(&proposal).input.unwrap().args, vec![b"GetChannels".to_vec()]);
        assert_eq!(channel_id(&proposal), "");
        Ok(())
    }

    #[test]
    fn config_block_names_channel() -> Result<()> {
        let context = context();
        let proposal = get_config_block_proposal(&context, "mychannel")?;
        assert_eq!(
            spec(&proposal).input.unwrap().args,
            vec![b"GetConfigBlock".to_vec(), b"mychannel".to_vec()]
        );
        assert!(get_config_block_proposal(&context, "").is_err());
        Ok(())
    }
}
