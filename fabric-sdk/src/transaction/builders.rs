//! Stateless constructors for the nested protocol structures.
//!
//! Inner structures are always encoded before they are embedded in their
//! parent, and anything that is signed is signed over the exact bytes that
//! end up in the result.

use std::time::SystemTime;

use prost::Message;
use prost_types::Timestamp;
use tracing::debug;

use crate::{
    constants::CHANNEL_HEADER_VERSION,
    error::Result,
    identity::User,
    infrastructure::logging::{hex_or_null, log_string},
    protos::{
        common::{ChannelHeader, Envelope, Header, HeaderType, Payload, SignatureHeader},
        msp::SerializedIdentity,
        orderer::{seek_info::SeekBehavior, SeekInfo, SeekPosition},
        peer::{
            chaincode_deployment_spec::ExecutionEnvironment, chaincode_spec, ChaincodeDeploymentSpec,
            ChaincodeHeaderExtension, ChaincodeId, ChaincodeInput, ChaincodeSpec,
        },
    },
    transaction::TransactionContext,
    FabricSdkError,
};

/// The current wall-clock time as a protocol timestamp.
pub fn current_timestamp() -> Timestamp {
    Timestamp::from(SystemTime::now())
}

/// Build a channel header.
///
/// The version is fixed. `extension` is embedded in its encoded form and
/// `tls_cert_hash` verbatim; both are left empty when absent.
pub fn create_channel_header(
    header_type: HeaderType,
    tx_id: &str,
    channel_id: &str,
    epoch: u64,
    timestamp: Option<Timestamp>,
    extension: Option<&ChaincodeHeaderExtension>,
    tls_cert_hash: Option<&[u8]>,
) -> ChannelHeader {
    let channel_header = ChannelHeader {
        r#type: header_type as i32,
        version: CHANNEL_HEADER_VERSION,
        timestamp,
        channel_id: channel_id.to_string(),
        tx_id: tx_id.to_string(),
        epoch,
        extension: extension
            .map(|extension| extension.encode_to_vec())
            .unwrap_or_default(),
        tls_cert_hash: tls_cert_hash.map(<[u8]>::to_vec).unwrap_or_default(),
    };

    debug!(
        "ChannelHeader: type: {:?}, version: {}, tx_id: {}, channel_id: {}, epoch: {}, tls_cert_hash: {}",
        header_type,
        channel_header.version,
        log_string(tx_id),
        log_string(channel_id),
        epoch,
        hex_or_null(&channel_header.tls_cert_hash),
    );

    channel_header
}

/// Build a deployment spec for a container-executed chaincode.
///
/// `args` defaults to no arguments; `path` is left out of the chaincode id
/// when absent.
pub fn create_deployment_spec(
    chaincode_type: chaincode_spec::Type,
    name: &str,
    path: Option<&str>,
    version: &str,
    args: Option<&[String]>,
    code_package: Option<&[u8]>,
) -> ChaincodeDeploymentSpec {
    let mut chaincode_id = ChaincodeId::new(name, version);
    if let Some(path) = path {
        chaincode_id = chaincode_id.with_path(path);
    }

    let args: Vec<Vec<u8>> = args
        .unwrap_or_default()
        .iter()
        .map(|arg| arg.as_bytes().to_vec())
        .collect();

    debug!(
        "Creating deployment spec: name: {}, path: {}, version: {}, args: {}",
        name,
        path.unwrap_or(""),
        version,
        args.len()
    );

    let chaincode_spec = ChaincodeSpec {
        r#type: chaincode_type as i32,
        chaincode_id: Some(chaincode_id),
        input: Some(ChaincodeInput {
            args,
            ..Default::default()
        }),
        timeout: 0,
    };

    ChaincodeDeploymentSpec {
        chaincode_spec: Some(chaincode_spec),
        code_package: code_package.map(<[u8]>::to_vec).unwrap_or_default(),
        exec_env: ExecutionEnvironment::Docker as i32,
    }
}

/// Identity descriptor for `user`: its MSP id and PEM certificate bytes.
pub fn serialized_identity(user: &dyn User) -> Result<SerializedIdentity> {
    let enrollment = user.enrollment().ok_or_else(|| {
        FabricSdkError::InvalidArgument(format!("User {} is not enrolled", user.name()))
    })?;

    Ok(SerializedIdentity {
        mspid: user.msp_id().to_string(),
        id_bytes: enrollment.certificate().as_bytes().to_vec(),
    })
}

/// Encoded signature header for `user` and `nonce`. Nothing is signed here.
pub fn signature_header_bytes(user: &dyn User, nonce: &[u8]) -> Result<Vec<u8>> {
    let identity = serialized_identity(user)?;
    Ok(SignatureHeader {
        creator: identity.encode_to_vec(),
        nonce: nonce.to_vec(),
    }
    .encode_to_vec())
}

/// Wrap already encoded headers into a [`Header`].
pub fn create_header(channel_header: &ChannelHeader, signature_header: Vec<u8>) -> Header {
    Header {
        channel_header: channel_header.encode_to_vec(),
        signature_header,
    }
}

/// Build a signed deliver request for blocks between `start` and `stop`.
pub fn create_seek_info_envelope(
    context: &TransactionContext,
    start: SeekPosition,
    stop: SeekPosition,
    behavior: SeekBehavior,
    tls_cert_hash: Option<&[u8]>,
) -> Result<Envelope> {
    let channel_header = create_channel_header(
        HeaderType::DeliverSeekInfo,
        context.tx_id(),
        context.channel_id(),
        context.epoch(),
        Some(context.timestamp().clone()),
        None,
        tls_cert_hash,
    );

    let seek_info = SeekInfo {
        start: Some(start),
        stop: Some(stop),
        behavior: behavior as i32,
    };

    let payload = Payload {
        header: Some(create_header(
            &channel_header,
            context.signature_header_bytes(),
        )),
        data: seek_info.encode_to_vec(),
    };

    let payload = payload.encode_to_vec();
    let signature = context.sign(&payload)?;

    Ok(Envelope { payload, signature })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        crypto::OpenSslCryptoSuite,
        identity::UserInfo,
        protos::orderer::seek_position,
        test_utils,
    };
    use std::sync::Arc;

    fn context(channel: &str) -> TransactionContext {
        let user = Arc::new(test_utils::enrolled_user("alice", "Org1MSP"));
        TransactionContext::new(channel, user, Arc::new(OpenSslCryptoSuite::default())).unwrap()
    }

    #[test]
    fn channel_header_round_trips() -> Result<()> {
        let timestamp = Timestamp {
            seconds: 1_600_000_000,
            nanos: 42,
        };
        let extension = ChaincodeHeaderExtension {
            chaincode_id: Some(ChaincodeId::new("mycc", "1.0")),
        };
        let header = create_channel_header(
            HeaderType::EndorserTransaction,
            "tx-1",
            "mychannel",
            7,
            Some(timestamp.clone()),
            Some(&extension),
            Some(&[9, 9, 9]),
        );

        let decoded = ChannelHeader::decode(header.encode_to_vec().as_slice())?;
        assert_eq!(decoded.r#type, HeaderType::EndorserTransaction as i32);
        assert_eq!(decoded.version, CHANNEL_HEADER_VERSION);
        assert_eq!(decoded.tx_id, "tx-1");
        assert_eq!(decoded.channel_id, "mychannel");
        assert_eq!(decoded.epoch, 7);
        assert_eq!(decoded.timestamp, Some(timestamp));
        assert_eq!(decoded.tls_cert_hash, vec![9, 9, 9]);
        assert_eq!(
            ChaincodeHeaderExtension::decode(decoded.extension.as_slice())?,
            extension
        );
        Ok(())
    }

    #[test]
    fn channel_header_without_optionals_is_empty() {
        let header = create_channel_header(HeaderType::Message, "tx", "ch", 0, None, None, None);
        assert!(header.extension.is_empty());
        assert!(header.tls_cert_hash.is_empty());
        assert!(header.timestamp.is_none());
    }

    #[test]
    fn deployment_spec_defaults() {
        let spec = create_deployment_spec(
            chaincode_spec::Type::Golang,
            "mycc",
            None,
            "1.0",
            None,
            None,
        );

        assert_eq!(spec.exec_env, ExecutionEnvironment::Docker as i32);
        assert!(spec.code_package.is_empty());
        let chaincode_spec = spec.chaincode_spec.unwrap();
        let id = chaincode_spec.chaincode_id.unwrap();
        assert_eq!(id.name, "mycc");
        assert_eq!(id.version, "1.0");
        assert!(id.path.is_empty());
        assert!(chaincode_spec.input.unwrap().args.is_empty());
    }

    #[test]
    fn deployment_spec_embeds_package_and_args() {
        let args = vec!["init".to_string(), "a".to_string()];
        let spec = create_deployment_spec(
            chaincode_spec::Type::Java,
            "mycc",
            Some("github.com/example/cc"),
            "2.0",
            Some(&args),
            Some(&[1, 2, 3]),
        );

        assert_eq!(spec.code_package, vec![1, 2, 3]);
        let chaincode_spec = spec.chaincode_spec.unwrap();
        assert_eq!(chaincode_spec.r#type, chaincode_spec::Type::Java as i32);
        assert_eq!(
            chaincode_spec.chaincode_id.unwrap().path,
            "github.com/example/cc"
        );
        assert_eq!(
            chaincode_spec.input.unwrap().args,
            vec![b"init".to_vec(), b"a".to_vec()]
        );
    }

    #[test]
    fn signature_header_carries_identity_and_nonce() -> Result<()> {
        let user = test_utils::enrolled_user("alice", "Org1MSP");
        let bytes = signature_header_bytes(&user, &[1, 2, 3])?;

        let header = SignatureHeader::decode(bytes.as_slice())?;
        assert_eq!(header.nonce, vec![1, 2, 3]);
        let creator = SerializedIdentity::decode(header.creator.as_slice())?;
        assert_eq!(creator.mspid, "Org1MSP");
        assert_eq!(
            creator.id_bytes,
            user.enrollment().unwrap().certificate().as_bytes()
        );
        Ok(())
    }

    #[test]
    fn signature_header_requires_enrollment() {
        let user = UserInfo::new("bob", "Org1MSP");
        assert!(matches!(
            signature_header_bytes(&user, &[0]),
            Err(FabricSdkError::InvalidArgument(_))
        ));
    }

    #[test]
    fn seek_info_envelope_signs_embedded_payload() -> Result<()> {
        let context = context("mychannel");
        let certificate = context.user().enrollment().unwrap().certificate().to_string();

        let envelope = create_seek_info_envelope(
            &context,
            SeekPosition::specified(5),
            SeekPosition::newest(),
            SeekBehavior::FailIfNotReady,
            Some(&[7; 32]),
        )?;

        assert!(context
            .crypto()
            .verify(&certificate, &envelope.signature, &envelope.payload)?);

        let payload = Payload::decode(envelope.payload.as_slice())?;
        let header = payload.header.unwrap();
        let channel_header = ChannelHeader::decode(header.channel_header.as_slice())?;
        assert_eq!(channel_header.r#type, HeaderType::DeliverSeekInfo as i32);
        assert_eq!(channel_header.tx_id, context.tx_id());
        assert_eq!(channel_header.channel_id, "mychannel");
        assert_eq!(channel_header.tls_cert_hash, vec![7; 32]);
        assert!(channel_header.extension.is_empty());
        assert_eq!(header.signature_header, context.signature_header_bytes());

        let seek_info = SeekInfo::decode(payload.data.as_slice())?;
        assert_eq!(seek_info.behavior(), SeekBehavior::FailIfNotReady);
        assert_eq!(
            seek_info.start.unwrap().r#type,
            Some(seek_position::Type::Specified(
                crate::protos::orderer::SeekSpecified { number: 5 }
            ))
        );
        Ok(())
    }

    #[test]
    fn seek_info_payload_encoding_is_stable() -> Result<()> {
        let context = context("mychannel");
        let first = create_seek_info_envelope(
            &context,
            SeekPosition::oldest(),
            SeekPosition::newest(),
            SeekBehavior::BlockUntilReady,
            None,
        )?;
        let second = create_seek_info_envelope(
            &context,
            SeekPosition::oldest(),
            SeekPosition::newest(),
            SeekBehavior::BlockUntilReady,
            None,
        )?;

        assert_eq!(first.payload, second.payload);
        Ok(())
    }
}
