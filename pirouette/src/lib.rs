//! Single-server private information retrieval over the BFV homomorphic
//! encryption scheme.
//!
//! A server holds a database arranged as a d-dimensional hypercube of
//! plaintext polynomials. A client retrieves items by index while leaking
//! nothing about which indices it asked for: it packs the per-dimension
//! selection vectors into one (or a few) ciphertexts, the server
//! obliviously expands the packed ciphertext back into per-slot indicator
//! ciphertexts and folds them against the database with a recursive dot
//! product, and the client decrypts and decodes the reply.
//!
//! # Example
//!
//! ```rust
//! use pirouette::{PirClient, PirContext, PirDatabase, PirParametersBuilder, PirServer};
//!
//! fn main() -> anyhow::Result<()> {
//!     let params = PirParametersBuilder::new()
//!         .set_num_items(100)
//!         .set_dimensions(2)
//!         .build()?;
//!
//!     let db_values: Vec<u64> = (0..100).map(|n| 1000 + n).collect();
//!     let context = PirContext::new(&params)?;
//!     let database = PirDatabase::from_integers(&context, &db_values)?;
//!     let server = PirServer::new(database);
//!
//!     let client = PirClient::new(&params)?;
//!     let request = client.create_request(&[42])?;
//!     let response = server.process_request(&request)?;
//!     let results = client.process_response_integers(&response)?;
//!
//!     assert_eq!(results, vec![1042]);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

mod client;
mod context;
mod database;
mod encoder;
mod error;
mod operators;
mod params;
mod payload;
mod reencoder;
mod server;
mod utils;

pub use client::PirClient;
pub use context::PirContext;
pub use database::PirDatabase;
pub use encoder::{BigUintEncoder, StringEncoder};
pub use error::{Error, Result};
pub use operators::QueryExpander;
pub use params::{
	default_encryption_params, generate_encryption_params, PirParameters, PirParametersBuilder,
};
pub use payload::{Request, Response};
pub use reencoder::CiphertextReencoder;
pub use server::PirServer;
pub use utils::{ceil_log2, generate_galois_elts};
