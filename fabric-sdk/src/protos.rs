//! Wire messages of the ledger network protocol.
//!
//! The messages are declared by hand with `prost` derives, mirroring the field
//! numbers of the network's `.proto` files. Only the messages this crate
//! builds or reads are declared. Map fields use `BTreeMap` so that encoding a
//! message twice yields the same bytes.

#[allow(clippy::all)]
pub mod common;
#[allow(clippy::all)]
pub mod msp;
#[allow(clippy::all)]
pub mod orderer;
#[allow(clippy::all)]
pub mod peer;

pub use prost::Message;
pub use prost_types::Timestamp;
