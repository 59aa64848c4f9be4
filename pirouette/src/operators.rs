use pirouette_bfv::{Ciphertext, GaloisKey};

use crate::context::PirContext;
use crate::error::{Error, Result};
use crate::utils::ceil_log2;

/// The server-side ciphertext operators: the ring automorphism
/// x -> x^k, multiplication by powers of x, and the oblivious expansion of
/// a packed query ciphertext into a per-slot selection vector.
pub struct QueryExpander {
	context: PirContext,
}

impl QueryExpander {
	/// Creates the operators over the given context.
	pub fn new(context: &PirContext) -> Self {
		Self {
			context: context.clone(),
		}
	}

	/// Applies the substitution x -> x^k to every polynomial of `ct`.
	/// `k` must be odd and coprime to 2N, and the Galois key set must
	/// contain the k-th element.
	pub fn substitute_power_x_inplace(
		&self,
		ct: &mut Ciphertext,
		k: u32,
		galois_key: &GaloisKey,
	) -> Result<()> {
		self.context
			.evaluator()
			.apply_galois_inplace(ct, k, galois_key)?;
		Ok(())
	}

	/// Multiplies every polynomial of `ct` by x^k in Z_q[x]/(x^N + 1).
	/// For k > 0 this cyclically shifts coefficients upward, negating on
	/// wrap-around (x^N = -1); negative k shifts the other way. No key
	/// material is needed.
	pub fn multiply_power_of_x(&self, ct: &Ciphertext, k: i64) -> Result<Ciphertext> {
		if ct.is_ntt_form() {
			return Err(Error::invalid_argument(
				"multiply_power_of_x requires coefficient form",
			));
		}
		let n = self.context.poly_modulus_degree();
		let two_n = 2 * n as i64;
		let shift = (k % two_n + two_n) % two_n;
		let moduli = self.context.he().ciphertext_moduli();

		let mut out = ct.clone();
		for p in 0..ct.size() {
			let src = ct.data(p);
			let dst = out.data_mut(p);
			for (i, m) in moduli.iter().enumerate() {
				let base = i * n;
				for c in 0..n {
					let raw = (c as i64 + shift) % two_n;
					let (target, negate) = if raw < n as i64 {
						(raw as usize, false)
					} else {
						((raw - n as i64) as usize, true)
					};
					dst[base + target] = if negate {
						m.neg(src[base + c])
					} else {
						src[base + c]
					};
				}
			}
		}
		Ok(out)
	}

	/// Obliviously expands a packed ciphertext into `n` ciphertexts, where
	/// the i-th output encrypts the constant polynomial
	/// `next_power_of_two(n) * coeff_i` of the packed plaintext. The
	/// caller's plaintext compensates by storing `m^{-1} mod t` in its hot
	/// slots.
	///
	/// Each round j splits every intermediate on coefficient bit j using
	/// the substitution with element `N/2^j + 1`: input i produces the
	/// "even" half at output i and the "odd" half, shifted down by
	/// `x^{-2^j}`, at output i + 2^j, so the final vector is indexed by
	/// coefficient position.
	pub fn oblivious_expansion(
		&self,
		packed: &Ciphertext,
		n: usize,
		galois_key: &GaloisKey,
	) -> Result<Vec<Ciphertext>> {
		if n == 0 || n > self.context.poly_modulus_degree() {
			return Err(Error::invalid_argument(format!(
				"cannot expand to {} slots with polynomial degree {}",
				n,
				self.context.poly_modulus_degree()
			)));
		}
		let degree = self.context.poly_modulus_degree() as u64;
		let evaluator = self.context.evaluator();
		let rounds = ceil_log2(n as u64);

		let mut ciphers = vec![packed.clone()];
		for j in 0..rounds {
			let elt = ((degree >> j) + 1) as u32;
			if !galois_key.has_key(elt) {
				return Err(Error::invalid_argument(format!(
					"missing Galois key for element {}",
					elt
				)));
			}
			let mut sums = Vec::with_capacity(ciphers.len());
			let mut shifted = Vec::with_capacity(ciphers.len());
			for ct in &ciphers {
				let mut substituted = ct.clone();
				self.substitute_power_x_inplace(&mut substituted, elt, galois_key)?;
				sums.push(evaluator.add(ct, &substituted)?);
				let diff = evaluator.sub(ct, &substituted)?;
				shifted.push(self.multiply_power_of_x(&diff, -(1i64 << j))?);
			}
			ciphers = sums;
			ciphers.append(&mut shifted);
		}
		ciphers.truncate(n);
		Ok(ciphers)
	}
}
