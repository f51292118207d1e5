//! Read-side views over encoded protocol messages.
//!
//! Each view owns the raw bytes of one message and decodes them on first
//! access through [`LazyProto`]. Nested messages are exposed as further views
//! over the embedded bytes, so only the parts a caller touches get decoded.

mod block;
mod chaincode_event;
mod envelope;
mod header;
mod lazy;
mod transaction;

pub use block::BlockDeserializer;
pub use chaincode_event::ChaincodeEventDeserializer;
pub use envelope::{EnvelopeDeserializer, PayloadDeserializer};
pub use header::{ChannelHeaderDeserializer, HeaderDeserializer, SignatureHeaderDeserializer};
pub use lazy::LazyProto;
pub use transaction::{TransactionActionDeserializer, TransactionDeserializer};
