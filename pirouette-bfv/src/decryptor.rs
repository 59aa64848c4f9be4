use num_bigint::{BigInt, BigUint};
use num_traits::{Signed, ToPrimitive, Zero};

use crate::ciphertext::Ciphertext;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::key_generator::SecretKey;
use crate::plaintext::Plaintext;
use crate::poly;

/// Decrypts [`Ciphertext`] objects into [`Plaintext`] objects, and computes
/// the invariant noise budget of a ciphertext.
///
/// Decryption accepts any ciphertext size: for a ciphertext
/// `(c_0, ..., c_k)` it evaluates `sum c_j s^j`, scales by `t/Q` with
/// rounding, and reduces modulo the plain modulus.
pub struct Decryptor {
	context: Context,
	/// Powers of the secret key never leave this struct.
	s_ntt: Vec<u64>,
}

impl Decryptor {
	/// Creates a Decryptor instance initialized with the specified context
	/// and secret key.
	pub fn new(context: &Context, secret_key: &SecretKey) -> Result<Self> {
		let inner = context.inner();
		if secret_key.coeffs.len() != inner.n {
			return Err(Error::InvalidArgument);
		}
		let mut s_ntt = poly::lift_signed(&secret_key.coeffs, inner.data_moduli(), inner.n);
		poly::ntt_forward(&mut s_ntt, inner.data_ntt(), inner.n);
		Ok(Self {
			context: context.clone(),
			s_ntt,
		})
	}

	/// Evaluates `sum c_j s^j` in coefficient form.
	fn dot_with_key_powers(&self, ciphertext: &Ciphertext) -> Result<Vec<u64>> {
		if ciphertext.is_ntt_form() {
			return Err(Error::NttFormMismatch);
		}
		if ciphertext.size() < 2 {
			return Err(Error::InvalidCiphertextSize);
		}
		let inner = self.context.inner();
		let n = inner.n;
		let moduli = inner.data_moduli();
		let tables = inner.data_ntt();
		let slab_len = inner.data_slab_len();
		if ciphertext.data(0).len() != slab_len {
			return Err(Error::InvalidArgument);
		}

		// Horner evaluation in the NTT domain:
		// acc = (...(c_k * s + c_{k-1}) * s + ...) * s + c_0.
		let mut acc = ciphertext.data(ciphertext.size() - 1).to_vec();
		poly::ntt_forward(&mut acc, tables, n);
		for p in (0..ciphertext.size() - 1).rev() {
			poly::mul_assign(&mut acc, &self.s_ntt, moduli, n);
			let mut c = ciphertext.data(p).to_vec();
			poly::ntt_forward(&mut c, tables, n);
			poly::add_assign(&mut acc, &c, moduli, n);
		}
		poly::ntt_inverse(&mut acc, tables, n);
		Ok(acc)
	}

	/// Decrypts a ciphertext.
	pub fn decrypt(&self, ciphertext: &Ciphertext) -> Result<Plaintext> {
		let inner = self.context.inner();
		let n = inner.n;
		let acc = self.dot_with_key_powers(ciphertext)?;

		let t = BigUint::from(inner.plain.value());
		let q = inner.rns_data.modulus();
		let q_half = q >> 1;
		let mut coeffs = vec![0u64; n];
		let mut residues = vec![0u64; inner.data_len];
		for c in 0..n {
			for i in 0..inner.data_len {
				residues[i] = acc[i * n + c];
			}
			let x = inner.rns_data.compose(&residues);
			// m = round(t * x / Q) mod t.
			let m: BigUint = ((&t * x + &q_half) / q) % &t;
			coeffs[c] = m.to_u64().unwrap_or(0);
		}
		let mut pt = Plaintext::from_coefficients(coeffs);
		pt.trim();
		Ok(pt)
	}

	/// Computes the invariant noise budget (in bits) of a ciphertext. The
	/// budget measures the amount of room there is for the noise to grow
	/// while ensuring correct decryptions; when it reaches zero the
	/// ciphertext becomes too noisy to decrypt correctly.
	pub fn invariant_noise_budget(&self, ciphertext: &Ciphertext) -> Result<u32> {
		let inner = self.context.inner();
		let n = inner.n;
		let acc = self.dot_with_key_powers(ciphertext)?;

		let t = BigInt::from(inner.plain.value());
		let q = BigInt::from(inner.rns_data.modulus().clone());
		let q_half = &q >> 1;
		let mut max_noise = BigInt::zero();
		let mut residues = vec![0u64; inner.data_len];
		for c in 0..n {
			for i in 0..inner.data_len {
				residues[i] = acc[i * n + c];
			}
			let x = BigInt::from(inner.rns_data.compose(&residues));
			// Distance of t*x from the nearest multiple of Q.
			let scaled = &t * x;
			let rounded: BigInt = (&scaled + &q_half) / &q;
			let noise: BigInt = (scaled - rounded * &q).abs();
			if noise > max_noise {
				max_noise = noise;
			}
		}
		let q_bits = inner.rns_data.modulus().bits() as i64;
		let noise_bits = max_noise.magnitude().bits() as i64;
		Ok((q_bits - noise_bits - 1).max(0) as u32)
	}
}
