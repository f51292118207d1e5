//! This crate is an implementation of a client to a Fabric certificate
//! authority server.
#![warn(unused_results)]
#![warn(future_incompatible)]
#![warn(unused)]
#![forbid(rustdoc::broken_intra_doc_links)]

pub mod api;
pub mod client;
pub mod config;
pub mod error;
mod response;
pub mod transport;

pub use client::FabricCaClient;
pub use config::Config;
pub use error::{FabricCaClientError, RequestError, Result};
pub use response::ResponseMessage;
