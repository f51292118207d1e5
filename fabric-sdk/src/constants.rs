//! Constants that are shared between other crates in this workspace.
//! Crate-specific constants should go in their respective crates.

/// Protocol version stamped on every channel header.
pub const CHANNEL_HEADER_VERSION: i32 = 1;

/// Length in bytes of the random nonce bound to every transaction context.
pub const NONCE_LENGTH: usize = 24;

/// Longest string rendered by [`crate::infrastructure::logging::log_string`].
pub const MAX_LOG_STRING_LENGTH: usize = 64;

/// Configuration system chaincode.
pub const CSCC: &str = "cscc";

pub mod cscc {
    pub const JOIN_CHAIN: &str = "JoinChain";
    pub const GET_CHANNELS: &str = "GetChannels";
    pub const GET_CONFIG_BLOCK: &str = "GetConfigBlock";
}

/// Keys understood by [`crate::crypto::CryptoSuiteFactory`].
pub mod crypto_properties {
    pub const SECURITY_LEVEL: &str = "org.hyperledger.fabric.sdk.security_level";
    pub const HASH_ALGORITHM: &str = "org.hyperledger.fabric.sdk.hash_algorithm";

    pub const DEFAULT_SECURITY_LEVEL: &str = "256";
    pub const DEFAULT_HASH_ALGORITHM: &str = "SHA2";
}

/// Property names attached to nodes and certificate authorities loaded from a
/// network configuration.
pub mod properties {
    pub const PEM_FILE: &str = "pemFile";
    pub const PEM_BYTES: &str = "pemBytes";
    pub const ALLOW_ALL_HOST_NAMES: &str = "allowAllHostNames";

    pub const GRPC_KEEPALIVE_TIME_MS: &str = "grpc.keepalive_time_ms";
    pub const GRPC_KEEPALIVE_TIMEOUT_MS: &str = "grpc.keepalive_timeout_ms";
    pub const GRPC_MAX_RECEIVE_MESSAGE_LENGTH: &str = "grpc.max_receive_message_length";
    pub const GRPC_HTTP2_KEEPALIVE_TIME: &str = "grpc.http2.keepalive_time";

    pub const NETTY_KEEPALIVE_TIME: &str = "grpc.NettyChannelBuilderOption.keepAliveTime";
    pub const NETTY_KEEPALIVE_TIMEOUT: &str = "grpc.NettyChannelBuilderOption.keepAliveTimeout";
    pub const NETTY_MAX_INBOUND_MESSAGE_SIZE: &str =
        "grpc.NettyChannelBuilderOption.maxInboundMessageSize";
}
