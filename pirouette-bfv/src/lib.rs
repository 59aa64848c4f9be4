//! A native Rust implementation of the BFV homomorphic encryption scheme,
//! providing the primitives consumed by the `pirouette` private information
//! retrieval crate: key generation, encryption, decryption, homomorphic
//! addition and multiplication, relinearization, Galois automorphisms, and
//! NTT form conversions, with raw coefficient access to ciphertext
//! polynomials for protocols that reshape ciphertexts directly.
//!
//! # Example
//!
//! ```rust
//! use pirouette_bfv::{
//!     BFVEncryptionParametersBuilder, BFVEvaluator, CoefficientModulusFactory, Context,
//!     Decryptor, DegreeType, Encryptor, KeyGenerator, PlainModulusFactory, Plaintext,
//!     SecurityLevel,
//! };
//!
//! fn main() -> anyhow::Result<()> {
//!     let params = BFVEncryptionParametersBuilder::new()
//!         .set_poly_modulus_degree(DegreeType::D4096)
//!         .set_coefficient_modulus(CoefficientModulusFactory::bfv_default(DegreeType::D4096)?)
//!         .set_plain_modulus(PlainModulusFactory::batching(DegreeType::D4096, 20)?)
//!         .build()?;
//!
//!     let ctx = Context::new(&params, SecurityLevel::TC128)?;
//!     let gen = KeyGenerator::new(&ctx)?;
//!
//!     let encryptor = Encryptor::with_public_key(&ctx, &gen.create_public_key())?;
//!     let decryptor = Decryptor::new(&ctx, &gen.secret_key())?;
//!     let evaluator = BFVEvaluator::new(&ctx)?;
//!
//!     let pt = Plaintext::from_hex_string("2x^1 + 3")?;
//!     let ct = encryptor.encrypt(&pt)?;
//!     let doubled = evaluator.add(&ct, &ct)?;
//!
//!     assert_eq!(
//!         decryptor.decrypt(&doubled)?,
//!         Plaintext::from_hex_string("4x^1 + 6")?
//!     );
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

mod ciphertext;
mod context;
mod decryptor;
mod encryptor;
mod error;
mod evaluator;
mod key_generator;
mod modulus;
mod ntt;
mod parameters;
mod plaintext;
mod poly;
mod rns;
mod serialization;

pub use ciphertext::Ciphertext;
pub use context::Context;
pub use decryptor::Decryptor;
pub use encryptor::Encryptor;
pub use error::{Error, Result};
pub use evaluator::BFVEvaluator;
pub use key_generator::{GaloisKey, KeyGenerator, PublicKey, RelinearizationKey, SecretKey};
pub use modulus::{CoefficientModulusFactory, Modulus, PlainModulusFactory, MODULUS_VALUE_MAX};
pub use parameters::{
	BFVEncryptionParametersBuilder, DegreeType, EncryptionParameters, SchemeType, SecurityLevel,
};
pub use plaintext::Plaintext;
pub use serialization::{FromBytes, ToBytes};
