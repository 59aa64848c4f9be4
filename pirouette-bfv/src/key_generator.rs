use std::collections::BTreeMap;
use std::fmt::Debug;

use rand::thread_rng;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::context::Context;
use crate::error::{Error, Result};
use crate::poly;

/// Secret key for the BFV scheme: a uniform ternary polynomial.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey {
	pub(crate) coeffs: Vec<i8>,
}

impl Zeroize for SecretKey {
	fn zeroize(&mut self) {
		self.coeffs.zeroize();
	}
}

impl Drop for SecretKey {
	fn drop(&mut self) {
		self.zeroize();
	}
}

impl ZeroizeOnDrop for SecretKey {}

impl Debug for SecretKey {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SecretKey").field("s", &"<ELIDED>").finish()
	}
}

/// Public key for the BFV scheme: an encryption of zero `(b, a)` with
/// `b = -(a*s + e)`, kept in NTT form over the ciphertext primes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
	pub(crate) c0: Vec<u64>,
	pub(crate) c1: Vec<u64>,
}

/// A key-switching key from some source polynomial to the secret key: one
/// pair of key-level polynomials per ciphertext prime, in NTT form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySwitchingKey {
	pub(crate) k0: Vec<Vec<u64>>,
	pub(crate) k1: Vec<Vec<u64>>,
}

/// Relinearization key material, reducing a size-3 ciphertext back to
/// size 2 after a ciphertext-ciphertext multiplication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelinearizationKey {
	pub(crate) ksk: KeySwitchingKey,
}

/// A set of Galois keys, enabling the automorphisms x -> x^elt under
/// encryption for each generated element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GaloisKey {
	pub(crate) keys: BTreeMap<u32, KeySwitchingKey>,
}

impl GaloisKey {
	/// Returns whether a key for the given Galois element is present.
	pub fn has_key(&self, galois_elt: u32) -> bool {
		self.keys.contains_key(&galois_elt)
	}

	/// Returns the Galois elements covered by this key set.
	pub fn elements(&self) -> impl Iterator<Item = u32> + '_ {
		self.keys.keys().copied()
	}
}

/// Generates matching secret and public keys, plus the evaluation key
/// material (relinearization and Galois keys) derived from the secret key.
pub struct KeyGenerator {
	context: Context,
	secret: SecretKey,
}

impl KeyGenerator {
	/// Creates a key generator with a freshly sampled secret key.
	pub fn new(context: &Context) -> Result<Self> {
		let n = context.poly_modulus_degree();
		let secret = SecretKey {
			coeffs: poly::sample_ternary(n, &mut thread_rng()),
		};
		Ok(Self {
			context: context.clone(),
			secret,
		})
	}

	/// Returns a copy of the secret key.
	pub fn secret_key(&self) -> SecretKey {
		self.secret.clone()
	}

	/// Creates a public key.
	pub fn create_public_key(&self) -> PublicKey {
		let inner = self.context.inner();
		let n = inner.n;
		let moduli = inner.data_moduli();
		let tables = inner.data_ntt();
		let mut rng = thread_rng();

		let mut s = poly::lift_signed(&self.secret.coeffs, moduli, n);
		poly::ntt_forward(&mut s, tables, n);

		let a = poly::sample_uniform(moduli, n, &mut rng);
		let mut e = poly::lift_signed(&poly::sample_error(n, &mut rng), moduli, n);
		poly::ntt_forward(&mut e, tables, n);

		// b = -(a*s + e)
		let mut b = a.clone();
		poly::mul_assign(&mut b, &s, moduli, n);
		poly::add_assign(&mut b, &e, moduli, n);
		poly::negate_assign(&mut b, moduli, n);

		PublicKey {
			c0: b,
			c1: a,
		}
	}

	/// Creates a relinearization key. Requires a parameter chain with a
	/// key-level special prime.
	pub fn create_relinearization_key(&self) -> Result<RelinearizationKey> {
		let inner = self.context.inner();
		let n = inner.n;
		let mut s = poly::lift_signed(&self.secret.coeffs, &inner.moduli, n);
		poly::ntt_forward(&mut s, &inner.ntt, n);
		// Target polynomial s^2, computed pointwise at key level.
		let mut s2 = s.clone();
		poly::mul_assign(&mut s2, &s, &inner.moduli, n);
		Ok(RelinearizationKey {
			ksk: self.create_key_switching_key(&s, &s2)?,
		})
	}

	/// Creates Galois keys for the given elements. Each element must be odd
	/// and less than 2N. Requires a parameter chain with a key-level
	/// special prime.
	pub fn create_galois_keys(&self, galois_elts: &[u32]) -> Result<GaloisKey> {
		let inner = self.context.inner();
		let n = inner.n;
		let mut s = poly::lift_signed(&self.secret.coeffs, &inner.moduli, n);
		poly::ntt_forward(&mut s, &inner.ntt, n);

		let mut keys = BTreeMap::new();
		for &elt in galois_elts {
			if elt % 2 == 0 || elt as u64 >= 2 * n as u64 {
				return Err(Error::InvalidGaloisElement);
			}
			let rotated = poly::apply_automorphism_signed(&self.secret.coeffs, elt as u64, n);
			let mut w = poly::lift_signed(&rotated, &inner.moduli, n);
			poly::ntt_forward(&mut w, &inner.ntt, n);
			keys.insert(elt, self.create_key_switching_key(&s, &w)?);
		}
		Ok(GaloisKey {
			keys,
		})
	}

	/// Builds a key-switching key encrypting `P * g_i * w` under `s` for
	/// each data prime, where g_i is the i-th CRT basis element. Both `s`
	/// and `w` are key-level slabs in NTT form.
	fn create_key_switching_key(&self, s: &[u64], w: &[u64]) -> Result<KeySwitchingKey> {
		let inner = self.context.inner();
		let ks = inner.ks.as_ref().ok_or(Error::KeySwitchUnavailable)?;
		let n = inner.n;
		let moduli = &inner.moduli;
		let mut rng = thread_rng();

		let mut k0 = Vec::with_capacity(inner.data_len);
		let mut k1 = Vec::with_capacity(inner.data_len);
		for i in 0..inner.data_len {
			let a = poly::sample_uniform(moduli, n, &mut rng);
			let mut e = poly::lift_signed(&poly::sample_error(n, &mut rng), moduli, n);
			poly::ntt_forward(&mut e, &inner.ntt, n);

			// b = -(a*s + e) + (P * g_i) * w
			let mut b = a.clone();
			poly::mul_assign(&mut b, s, moduli, n);
			poly::add_assign(&mut b, &e, moduli, n);
			poly::negate_assign(&mut b, moduli, n);
			let mut scaled_w = w.to_vec();
			poly::scalar_mul_assign(&mut scaled_w, &ks.p_garner[i], moduli, n);
			poly::add_assign(&mut b, &scaled_w, moduli, n);

			k0.push(b);
			k1.push(a);
		}
		Ok(KeySwitchingKey {
			k0,
			k1,
		})
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
	fn secret_key_is_ternary() {
		let ctx = context();
		let gen = KeyGenerator::new(&ctx).unwrap();
		let sk = gen.secret_key();
		assert_eq!(sk.coeffs.len(), 4096);
		assert!(sk.coeffs.iter().all(|&c| (-1..=1).contains(&c)));
	}

	#[test]
	fn galois_keys_cover_requested_elements() {
		let ctx = context();
		let gen = KeyGenerator::new(&ctx).unwrap();
		let keys = gen.create_galois_keys(&[3, 4097, 2049]).unwrap();
		assert!(keys.has_key(3));
		assert!(keys.has_key(4097));
		assert!(keys.has_key(2049));
		assert!(!keys.has_key(5));
	}

	#[test]
	fn even_galois_element_is_rejected() {
		let ctx = context();
		let gen = KeyGenerator::new(&ctx).unwrap();
		assert_eq!(
			gen.create_galois_keys(&[4]).unwrap_err(),
			Error::InvalidGaloisElement
		);
	}
}
