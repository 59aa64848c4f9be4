use pirouette_bfv::{Ciphertext, Plaintext};

use crate::context::PirContext;
use crate::error::{Error, Result};

/// Decomposes ciphertexts into plaintext "digits" and recomposes them.
///
/// Each polynomial coefficient of the ciphertext is split into
/// `ceil(log2(q_i) / bpc)` digits of `bpc` bits, where bpc is the capacity
/// of the plain modulus. The resulting plaintexts can be multiplied by
/// another ciphertext with plain multiplications only, which is how the
/// multi-dimensional dot product avoids noise-costly ciphertext-ciphertext
/// products: one ciphertext fans out into `expansion_ratio() * size` digit
/// plaintexts per level, and the client reverses the decomposition after
/// decrypting.
pub struct CiphertextReencoder {
	context: PirContext,
}

impl CiphertextReencoder {
	/// Creates a reencoder over the given context.
	pub fn new(context: &PirContext) -> Self {
		Self {
			context: context.clone(),
		}
	}

	fn plain_bits(&self) -> u32 {
		self.context.he().plain_modulus().bit_count() - 1
	}

	/// Number of digit plaintexts one ciphertext polynomial decomposes
	/// into, summed over the ciphertext primes.
	pub fn expansion_ratio(&self) -> usize {
		let bpc = self.plain_bits();
		self.context
			.he()
			.ciphertext_moduli()
			.iter()
			.map(|m| m.bit_count().div_ceil(bpc) as usize)
			.sum()
	}

	/// Decomposes a ciphertext into `expansion_ratio() * ct.size()` digit
	/// plaintexts, ordered by polynomial, then prime, then digit
	/// (least-significant digit first).
	pub fn encode(&self, ct: &Ciphertext) -> Result<Vec<Plaintext>> {
		if ct.is_ntt_form() {
			return Err(Error::invalid_argument(
				"cannot reencode a ciphertext in NTT form",
			));
		}
		let n = self.context.poly_modulus_degree();
		let bpc = self.plain_bits();
		let mask = (1u64 << bpc) - 1;
		let moduli = self.context.he().ciphertext_moduli();

		let mut result = Vec::with_capacity(self.expansion_ratio() * ct.size());
		for p in 0..ct.size() {
			let slab = ct.data(p);
			for (i, m) in moduli.iter().enumerate() {
				let digits = m.bit_count().div_ceil(bpc);
				let mut shift = 0u32;
				for _ in 0..digits {
					let mut data = vec![0u64; n];
					for (c, out) in data.iter_mut().enumerate() {
						*out = (slab[i * n + c] >> shift) & mask;
					}
					result.push(Plaintext::from_coefficients(data));
					shift += bpc;
				}
			}
		}
		Ok(result)
	}

	/// Recomposes a ciphertext of `poly_count` polynomials from digit
	/// plaintexts produced by [`encode`](Self::encode) (or decrypted from
	/// encryptions of them). Requires exactly
	/// `expansion_ratio() * poly_count` plaintexts.
	pub fn decode(&self, pts: &[Plaintext], poly_count: usize) -> Result<Ciphertext> {
		if pts.len() != self.expansion_ratio() * poly_count {
			return Err(Error::invalid_argument(format!(
				"expected {} digit plaintexts for {} polynomials, got {}",
				self.expansion_ratio() * poly_count,
				poly_count,
				pts.len()
			)));
		}
		let n = self.context.poly_modulus_degree();
		let bpc = self.plain_bits();
		let moduli = self.context.he().ciphertext_moduli();

		let mut ct = Ciphertext::new(self.context.he(), poly_count)?;
		let mut pt_iter = pts.iter();
		for p in 0..poly_count {
			let slab = ct.data_mut(p);
			for (i, m) in moduli.iter().enumerate() {
				let digits = m.bit_count().div_ceil(bpc);
				let mut shift = 0u32;
				for _ in 0..digits {
					let pt = pt_iter.next().expect("length checked above");
					for c in 0..pt.coeff_count().min(n) {
						let term = m.reduce_u128((pt.get_coefficient(c) as u128) << shift);
						slab[i * n + c] = m.add(slab[i * n + c], term);
					}
					shift += bpc;
				}
			}
		}
		Ok(ct)
	}
}
