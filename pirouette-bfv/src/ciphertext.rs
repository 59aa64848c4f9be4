use std::fmt::Debug;

use serde::ser::Error as _;
use serde::{Serialize, Serializer};

use crate::context::Context;
use crate::error::{Error, Result};
use crate::serialization::ToBytes;

/// Class to store a ciphertext element. The data for a ciphertext consists
/// of two or more polynomials, stored in CRT form with respect to the
/// ciphertext primes. If the polynomial degree is N and the number of
/// ciphertext primes is K, each polynomial slab holds exactly `K * N`
/// words: `data(p)[i * N + c]` is coefficient `c` of polynomial `p` modulo
/// the i-th prime.
///
/// Fresh encryptions have size 2; a ciphertext-ciphertext multiplication
/// produces size 3 until relinearization restores size 2. The NTT form of
/// the polynomials is tracked and observable.
#[derive(Clone, Default)]
pub struct Ciphertext {
	pub(crate) polys: Vec<Vec<u64>>,
	pub(crate) ntt_form: bool,
}

impl Ciphertext {
	/// Creates a zero ciphertext of the given size under a context. Use
	/// [`data_mut`](Self::data_mut) to populate the polynomials.
	pub fn new(context: &Context, size: usize) -> Result<Self> {
		if size < 2 {
			return Err(Error::InvalidCiphertextSize);
		}
		let slab_len = context.inner().data_slab_len();
		Ok(Self {
			polys: vec![vec![0u64; slab_len]; size],
			ntt_form: false,
		})
	}

	/// Returns the number of polynomials in this ciphertext.
	pub fn size(&self) -> usize {
		self.polys.len()
	}

	/// Returns the raw CRT slab of polynomial `p`.
	///
	/// # Panics
	/// Panics if `p` is not less than `size()`.
	pub fn data(&self, p: usize) -> &[u64] {
		&self.polys[p]
	}

	/// Returns the raw CRT slab of polynomial `p` mutably.
	///
	/// # Panics
	/// Panics if `p` is not less than `size()`.
	pub fn data_mut(&mut self, p: usize) -> &mut [u64] {
		&mut self.polys[p]
	}

	/// Returns whether the polynomials are in NTT form.
	pub fn is_ntt_form(&self) -> bool {
		self.ntt_form
	}
}

impl Debug for Ciphertext {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Ciphertext")
			.field("size", &self.size())
			.field("ntt_form", &self.ntt_form)
			.finish()
	}
}

impl Serialize for Ciphertext {
	fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let bytes = self
			.as_bytes()
			.map_err(|e| S::Error::custom(format!("Failed to serialize ciphertext: {}", e)))?;
		serializer.serialize_bytes(&bytes)
	}
}

#[cfg(test)]
mod tests {
	use crate::*;

	fn context() -> Context {
		let params = BFVEncryptionParametersBuilder::new()
			.set_poly_modulus_degree(DegreeType::D4096)
			.set_coefficient_modulus(
				CoefficientModulusFactory::bfv_default(DegreeType::D4096).unwrap(),
			)
			.set_plain_modulus(PlainModulusFactory::batching(DegreeType::D4096, 20).unwrap())
			.build()
			.unwrap();
		Context::new(&params, SecurityLevel::TC128).unwrap()
	}

	#[test]
	fn fresh_ciphertext_shape() {
		let ctx = context();
		let ct = Ciphertext::new(&ctx, 2).unwrap();
		assert_eq!(ct.size(), 2);
		assert_eq!(ct.data(0).len(), 2 * 4096);
		assert!(!ct.is_ntt_form());
		assert!(Ciphertext::new(&ctx, 1).is_err());
	}
}
