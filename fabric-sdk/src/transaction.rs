//! Construction of signed protocol messages.
//!
//! A [`TransactionContext`] binds a signing identity to a nonce, transaction
//! id and timestamp. The free functions in [`builders`] assemble the nested
//! header and envelope structures, and [`ProposalBuilder`] orchestrates them
//! into endorsement proposals. The system chaincode proposals (channel join,
//! channel queries) are thin variants over the same builder.

pub mod builders;
mod context;
mod proposal_builder;
mod request;
pub mod system_chaincode;

pub use context::TransactionContext;
pub use proposal_builder::ProposalBuilder;
pub use request::{ChaincodeLanguage, TransactionRequest};
