use std::collections::BTreeMap;

use prost::Message;
use tracing::{debug, error};

use crate::{
    error::Result,
    protos::{
        common::HeaderType,
        peer::{
            chaincode_spec, ChaincodeHeaderExtension, ChaincodeId, ChaincodeInput,
            ChaincodeInvocationSpec, ChaincodeProposalPayload, ChaincodeSpec, Proposal,
            SignedProposal,
        },
    },
    transaction::{builders, TransactionContext, TransactionRequest},
    FabricSdkError,
};

/// Accumulates the parts of an endorsement proposal.
///
/// Every setter consumes the builder and returns the updated value. Explicit
/// arguments added with [`ProposalBuilder::add_arg`] take precedence over the
/// arguments of a bound [`TransactionRequest`].
#[derive(Debug, Clone)]
pub struct ProposalBuilder<'a> {
    context: Option<&'a TransactionContext>,
    chaincode_id: Option<ChaincodeId>,
    chaincode_type: chaincode_spec::Type,
    channel_id: Option<String>,
    args: Option<Vec<Vec<u8>>>,
    request_args: Option<Vec<Vec<u8>>>,
    transient_map: BTreeMap<String, Vec<u8>>,
    no_channel_id: bool,
}

impl<'a> Default for ProposalBuilder<'a> {
    fn default() -> Self {
        Self {
            context: None,
            chaincode_id: None,
            chaincode_type: chaincode_spec::Type::Golang,
            channel_id: None,
            args: None,
            request_args: None,
            transient_map: BTreeMap::new(),
            no_channel_id: false,
        }
    }
}

impl<'a> ProposalBuilder<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the signing context. The channel defaults to the context's
    /// channel unless one was set already.
    pub fn context(mut self, context: &'a TransactionContext) -> Self {
        if self.channel_id.is_none() {
            self.channel_id = Some(context.channel_id().to_string());
        }
        self.context = Some(context);
        self
    }

    /// Take chaincode id, language, arguments and transient data from
    /// `request`. Values are copied out of the request.
    pub fn request(mut self, request: &TransactionRequest) -> Self {
        self.chaincode_id = request.chaincode_id.clone();
        self.chaincode_type = request.chaincode_language.chaincode_type();
        self.request_args = Some(request.wire_args());
        self.transient_map = request.transient_map.clone();
        self.no_channel_id = request.no_channel_id;
        self
    }

    pub fn chaincode_id(mut self, chaincode_id: ChaincodeId) -> Self {
        self.chaincode_id = Some(chaincode_id);
        self
    }

    pub fn chaincode_type(mut self, chaincode_type: chaincode_spec::Type) -> Self {
        self.chaincode_type = chaincode_type;
        self
    }

    pub fn channel_id(mut self, channel_id: impl Into<String>) -> Self {
        self.channel_id = Some(channel_id.into());
        self
    }

    pub fn transient_map(mut self, transient_map: BTreeMap<String, Vec<u8>>) -> Self {
        self.transient_map = transient_map;
        self
    }

    /// Append one argument. Strings are added as their UTF-8 bytes.
    pub fn add_arg(mut self, arg: impl AsRef<[u8]>) -> Self {
        self.args
            .get_or_insert_with(Vec::new)
            .push(arg.as_ref().to_vec());
        self
    }

    /// Replace the explicit argument list.
    pub fn args(mut self, args: Vec<Vec<u8>>) -> Self {
        self.args = Some(args);
        self
    }

    pub fn clear_args(mut self) -> Self {
        self.args = None;
        self
    }

    pub fn build(&self) -> Result<Proposal> {
        let context = self.context.ok_or_else(|| {
            let message = "Proposal has no transaction context";
            error!("{}", message);
            FabricSdkError::Proposal(message.to_string())
        })?;

        let channel_id = if self.no_channel_id {
            String::new()
        } else {
            self.channel_id.clone().unwrap_or_default()
        };

        let extension = ChaincodeHeaderExtension {
            chaincode_id: self.chaincode_id.clone(),
        };
        let channel_header = builders::create_channel_header(
            HeaderType::EndorserTransaction,
            context.tx_id(),
            &channel_id,
            context.epoch(),
            Some(context.timestamp().clone()),
            Some(&extension),
            None,
        );

        let invocation_spec = ChaincodeInvocationSpec {
            chaincode_spec: Some(ChaincodeSpec {
                r#type: self.chaincode_type as i32,
                chaincode_id: self.chaincode_id.clone(),
                input: Some(ChaincodeInput {
                    args: self.resolved_args(),
                    ..Default::default()
                }),
                timeout: 0,
            }),
        };

        let payload = ChaincodeProposalPayload {
            input: invocation_spec.encode_to_vec(),
            transient_map: self.transient_map.clone(),
        };
        let header = builders::create_header(&channel_header, context.signature_header_bytes());

        debug!(
            "Built proposal for chaincode {:?} on channel '{}'",
            self.chaincode_id.as_ref().map(|id| id.name.as_str()),
            channel_id
        );

        Ok(Proposal {
            header: header.encode_to_vec(),
            payload: payload.encode_to_vec(),
            extension: Vec::new(),
        })
    }

    /// Build the proposal and sign its encoded bytes with the bound context.
    pub fn build_signed(&self) -> Result<SignedProposal> {
        let proposal = self.build()?;
        // `build` only succeeds with a context bound.
        let context = self
            .context
            .ok_or_else(|| FabricSdkError::Proposal("Proposal has no transaction context".into()))?;
        context.sign_proposal(&proposal)
    }

    fn resolved_args(&self) -> Vec<Vec<u8>> {
        match (&self.args, &self.request_args) {
            (Some(args), _) if !args.is_empty() => args.clone(),
            (_, Some(request_args)) => request_args.clone(),
            _ => Vec::new(),
        }
    }
}
