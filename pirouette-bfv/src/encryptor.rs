use rand::thread_rng;

use crate::ciphertext::Ciphertext;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::key_generator::PublicKey;
use crate::plaintext::Plaintext;
use crate::poly;

/// Encrypts [`Plaintext`] objects into [`Ciphertext`] objects using a
/// public key.
///
/// Freshly encrypted ciphertexts are produced in the usual coefficient
/// representation (not NTT form) and always have size 2.
pub struct Encryptor {
	context: Context,
	public_key: PublicKey,
}

impl Encryptor {
	/// Creates an Encryptor instance initialized with the specified context
	/// and public key.
	pub fn with_public_key(context: &Context, public_key: &PublicKey) -> Result<Self> {
		let slab_len = context.inner().data_slab_len();
		if public_key.c0.len() != slab_len || public_key.c1.len() != slab_len {
			return Err(Error::InvalidArgument);
		}
		Ok(Self {
			context: context.clone(),
			public_key: public_key.clone(),
		})
	}

	/// Encrypts a plaintext. The plaintext must be in coefficient form with
	/// every coefficient reduced modulo the plain modulus and at most N
	/// coefficients.
	pub fn encrypt(&self, plaintext: &Plaintext) -> Result<Ciphertext> {
		let inner = self.context.inner();
		if plaintext.is_ntt_form() || plaintext.coeff_count() > inner.n {
			return Err(Error::InvalidPlaintext);
		}
		let t = inner.plain.value();
		if plaintext.data.iter().any(|&c| c >= t) {
			return Err(Error::InvalidPlaintext);
		}

		let n = inner.n;
		let moduli = inner.data_moduli();
		let tables = inner.data_ntt();
		let mut rng = thread_rng();

		// u: uniform ternary; e0, e1: centered binomial errors.
		let mut u = poly::lift_signed(&poly::sample_ternary(n, &mut rng), moduli, n);
		poly::ntt_forward(&mut u, tables, n);

		// c0 = pk0 * u, c1 = pk1 * u (NTT domain), then back to
		// coefficients to add the error terms and the scaled message.
		let mut c0 = self.public_key.c0.clone();
		poly::mul_assign(&mut c0, &u, moduli, n);
		poly::ntt_inverse(&mut c0, tables, n);
		let mut c1 = self.public_key.c1.clone();
		poly::mul_assign(&mut c1, &u, moduli, n);
		poly::ntt_inverse(&mut c1, tables, n);

		let e0 = poly::lift_signed(&poly::sample_error(n, &mut rng), moduli, n);
		poly::add_assign(&mut c0, &e0, moduli, n);
		let e1 = poly::lift_signed(&poly::sample_error(n, &mut rng), moduli, n);
		poly::add_assign(&mut c1, &e1, moduli, n);

		// c0 += Delta * m, coefficient by coefficient.
		for (i, m) in moduli.iter().enumerate() {
			let delta = inner.delta[i];
			let base = i * n;
			for (j, &coeff) in plaintext.data.iter().enumerate() {
				let scaled = m.mul(delta, m.reduce(coeff));
				c0[base + j] = m.add(c0[base + j], scaled);
			}
		}

		Ok(Ciphertext {
			polys: vec![c0, c1],
			ntt_form: false,
		})
	}

	/// Encrypts the zero plaintext.
	pub fn encrypt_zero(&self) -> Result<Ciphertext> {
		self.encrypt(&Plaintext::new())
	}
}

#[cfg(test)]
mod tests {
	use crate::*;

	#[test]
	fn rejects_unreduced_plaintext() {
		let params = BFVEncryptionParametersBuilder::new()
			.set_poly_modulus_degree(DegreeType::D4096)
			.set_coefficient_modulus(
				CoefficientModulusFactory::bfv_default(DegreeType::D4096).unwrap(),
			)
			.set_plain_modulus(PlainModulusFactory::batching(DegreeType::D4096, 20).unwrap())
			.build()
			.unwrap();
		let ctx = Context::new(&params, SecurityLevel::TC128).unwrap();
		let gen = KeyGenerator::new(&ctx).unwrap();
		let encryptor = Encryptor::with_public_key(&ctx, &gen.create_public_key()).unwrap();

		let pt = Plaintext::from_coefficients(vec![ctx.plain_modulus().value()]);
		assert_eq!(encryptor.encrypt(&pt).unwrap_err(), Error::InvalidPlaintext);
	}
}
