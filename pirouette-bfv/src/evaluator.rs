use num_bigint::BigInt;
use num_traits::Zero;

use crate::ciphertext::Ciphertext;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::key_generator::{GaloisKey, KeySwitchingKey, RelinearizationKey};
use crate::plaintext::Plaintext;
use crate::poly;

/// Provides the homomorphic operations of the BFV scheme: addition,
/// plaintext and ciphertext multiplication, relinearization, Galois
/// automorphisms, and NTT form conversions.
///
/// Operands must agree in NTT form; the evaluator never converts between
/// forms implicitly. Ciphertext-ciphertext multiplication, relinearization
/// and Galois automorphisms require coefficient form.
#[derive(Clone)]
pub struct BFVEvaluator {
	context: Context,
}

impl BFVEvaluator {
	/// Creates a BFVEvaluator instance initialized with the specified
	/// context.
	pub fn new(context: &Context) -> Result<Self> {
		Ok(Self {
			context: context.clone(),
		})
	}

	fn check_ciphertext(&self, a: &Ciphertext) -> Result<()> {
		let slab_len = self.context.inner().data_slab_len();
		if a.size() < 2 || a.polys.iter().any(|p| p.len() != slab_len) {
			return Err(Error::InvalidCiphertextSize);
		}
		Ok(())
	}

	/// Negates a ciphertext into a new ciphertext.
	pub fn negate(&self, a: &Ciphertext) -> Result<Ciphertext> {
		let mut out = a.clone();
		self.negate_inplace(&mut out)?;
		Ok(out)
	}

	/// Negates a ciphertext in place.
	pub fn negate_inplace(&self, a: &mut Ciphertext) -> Result<()> {
		self.check_ciphertext(a)?;
		let inner = self.context.inner();
		for p in &mut a.polys {
			poly::negate_assign(p, inner.data_moduli(), inner.n);
		}
		Ok(())
	}

	/// Adds `b` into `a`. The operands must be in the same NTT form; if
	/// their sizes differ the shorter one is treated as zero-padded.
	pub fn add_inplace(&self, a: &mut Ciphertext, b: &Ciphertext) -> Result<()> {
		self.check_ciphertext(a)?;
		self.check_ciphertext(b)?;
		if a.is_ntt_form() != b.is_ntt_form() {
			return Err(Error::NttFormMismatch);
		}
		let inner = self.context.inner();
		while a.size() < b.size() {
			a.polys.push(vec![0u64; inner.data_slab_len()]);
		}
		for (p, bp) in a.polys.iter_mut().zip(&b.polys) {
			poly::add_assign(p, bp, inner.data_moduli(), inner.n);
		}
		Ok(())
	}

	/// Adds `a` and `b`.
	pub fn add(&self, a: &Ciphertext, b: &Ciphertext) -> Result<Ciphertext> {
		let mut out = a.clone();
		self.add_inplace(&mut out, b)?;
		Ok(out)
	}

	/// Performs an addition reduction of multiple ciphertexts.
	pub fn add_many(&self, a: &[Ciphertext]) -> Result<Ciphertext> {
		let (first, rest) = a.split_first().ok_or(Error::InvalidArgument)?;
		let mut out = first.clone();
		for ct in rest {
			self.add_inplace(&mut out, ct)?;
		}
		Ok(out)
	}

	/// Subtracts `b` from `a` in place.
	pub fn sub_inplace(&self, a: &mut Ciphertext, b: &Ciphertext) -> Result<()> {
		self.check_ciphertext(a)?;
		self.check_ciphertext(b)?;
		if a.is_ntt_form() != b.is_ntt_form() {
			return Err(Error::NttFormMismatch);
		}
		let inner = self.context.inner();
		while a.size() < b.size() {
			a.polys.push(vec![0u64; inner.data_slab_len()]);
		}
		for (p, bp) in a.polys.iter_mut().zip(&b.polys) {
			poly::sub_assign(p, bp, inner.data_moduli(), inner.n);
		}
		Ok(())
	}

	/// Subtracts `b` from `a`.
	pub fn sub(&self, a: &Ciphertext, b: &Ciphertext) -> Result<Ciphertext> {
		let mut out = a.clone();
		self.sub_inplace(&mut out, b)?;
		Ok(out)
	}

	/// Multiplies a ciphertext by a plaintext in place. Ciphertext and
	/// plaintext must be in the same NTT form.
	pub fn multiply_plain_inplace(&self, a: &mut Ciphertext, b: &Plaintext) -> Result<()> {
		self.check_ciphertext(a)?;
		if a.is_ntt_form() != b.is_ntt_form() {
			return Err(Error::NttFormMismatch);
		}
		let inner = self.context.inner();
		let n = inner.n;
		let moduli = inner.data_moduli();
		let tables = inner.data_ntt();
		if b.is_ntt_form() {
			if b.data.len() != inner.data_slab_len() {
				return Err(Error::InvalidPlaintext);
			}
			for p in &mut a.polys {
				poly::mul_assign(p, &b.data, moduli, n);
			}
		} else {
			let mut pt_ntt = self.lift_plain(b)?;
			poly::ntt_forward(&mut pt_ntt, tables, n);
			for p in &mut a.polys {
				poly::ntt_forward(p, tables, n);
				poly::mul_assign(p, &pt_ntt, moduli, n);
				poly::ntt_inverse(p, tables, n);
			}
		}
		Ok(())
	}

	/// Multiplies a ciphertext by a plaintext.
	pub fn multiply_plain(&self, a: &Ciphertext, b: &Plaintext) -> Result<Ciphertext> {
		let mut out = a.clone();
		self.multiply_plain_inplace(&mut out, b)?;
		Ok(out)
	}

	/// Multiplies two size-2 ciphertexts in coefficient form, producing a
	/// size-3 ciphertext. Use [`relinearize_inplace`](Self::relinearize_inplace)
	/// to reduce the result back to size 2.
	pub fn multiply(&self, a: &Ciphertext, b: &Ciphertext) -> Result<Ciphertext> {
		self.check_ciphertext(a)?;
		self.check_ciphertext(b)?;
		if a.is_ntt_form() || b.is_ntt_form() {
			return Err(Error::NttFormMismatch);
		}
		if a.size() != 2 || b.size() != 2 {
			return Err(Error::InvalidCiphertextSize);
		}
		let inner = self.context.inner();
		let n = inner.n;
		let aux_moduli = &inner.aux_moduli;
		let aux_tables = &inner.aux_ntt;

		// Lift the four input polynomials into the wide auxiliary NTT
		// basis, where the integer tensor product is exact.
		let a0 = self.lift_to_aux(a.data(0));
		let a1 = self.lift_to_aux(a.data(1));
		let b0 = self.lift_to_aux(b.data(0));
		let b1 = self.lift_to_aux(b.data(1));

		// (a0 + a1 s)(b0 + b1 s) = a0 b0 + (a0 b1 + a1 b0) s + a1 b1 s^2.
		let mut t0 = a0.clone();
		poly::mul_assign(&mut t0, &b0, aux_moduli, n);
		let mut t1 = a0;
		poly::mul_assign(&mut t1, &b1, aux_moduli, n);
		poly::mul_acc(&mut t1, &a1, &b0, aux_moduli, n);
		let mut t2 = a1;
		poly::mul_assign(&mut t2, &b1, aux_moduli, n);

		let mut polys = Vec::with_capacity(3);
		for mut t in [t0, t1, t2] {
			poly::ntt_inverse(&mut t, aux_tables, n);
			polys.push(self.scale_from_aux(&t));
		}
		Ok(Ciphertext {
			polys,
			ntt_form: false,
		})
	}

	/// Relinearizes a size-3 ciphertext in place, reducing it to 2
	/// polynomials. This reduces future noise growth under multiplication.
	pub fn relinearize_inplace(
		&self,
		a: &mut Ciphertext,
		relin_key: &RelinearizationKey,
	) -> Result<()> {
		self.check_ciphertext(a)?;
		if a.is_ntt_form() {
			return Err(Error::NttFormMismatch);
		}
		if a.size() != 3 {
			return Err(Error::InvalidCiphertextSize);
		}
		let inner = self.context.inner();
		let c2 = a.polys.pop().expect("size checked above");
		let (k0, k1) = self.switch_key(&c2, &relin_key.ksk)?;
		poly::add_assign(&mut a.polys[0], &k0, inner.data_moduli(), inner.n);
		poly::add_assign(&mut a.polys[1], &k1, inner.data_moduli(), inner.n);
		Ok(())
	}

	/// Relinearizes a size-3 ciphertext.
	pub fn relinearize(
		&self,
		a: &Ciphertext,
		relin_key: &RelinearizationKey,
	) -> Result<Ciphertext> {
		let mut out = a.clone();
		self.relinearize_inplace(&mut out, relin_key)?;
		Ok(out)
	}

	/// Applies the Galois automorphism x -> x^elt to a size-2 ciphertext in
	/// coefficient form. The Galois key set must contain the element.
	pub fn apply_galois_inplace(
		&self,
		a: &mut Ciphertext,
		galois_elt: u32,
		galois_key: &GaloisKey,
	) -> Result<()> {
		self.check_ciphertext(a)?;
		if a.is_ntt_form() {
			return Err(Error::NttFormMismatch);
		}
		if a.size() != 2 {
			return Err(Error::InvalidCiphertextSize);
		}
		let inner = self.context.inner();
		let n = inner.n;
		if galois_elt % 2 == 0 || galois_elt as u64 >= 2 * n as u64 {
			return Err(Error::InvalidGaloisElement);
		}
		let ksk = galois_key
			.keys
			.get(&galois_elt)
			.ok_or(Error::GaloisKeyMissing)?;

		let moduli = inner.data_moduli();
		let c0 = poly::apply_automorphism(a.data(0), galois_elt as u64, moduli, n);
		let c1 = poly::apply_automorphism(a.data(1), galois_elt as u64, moduli, n);
		// The permuted c1 is an encryption component under s(x^elt);
		// key-switching moves it back under s.
		let (mut k0, k1) = self.switch_key(&c1, ksk)?;
		poly::add_assign(&mut k0, &c0, moduli, n);
		a.polys[0] = k0;
		a.polys[1] = k1;
		Ok(())
	}

	/// Applies the Galois automorphism x -> x^elt to a ciphertext.
	pub fn apply_galois(
		&self,
		a: &Ciphertext,
		galois_elt: u32,
		galois_key: &GaloisKey,
	) -> Result<Ciphertext> {
		let mut out = a.clone();
		self.apply_galois_inplace(&mut out, galois_elt, galois_key)?;
		Ok(out)
	}

	/// Transforms a plaintext into NTT form with respect to the ciphertext
	/// primes, for pointwise multiplication into NTT-form ciphertexts.
	pub fn transform_plain_to_ntt_inplace(&self, plain: &mut Plaintext) -> Result<()> {
		if plain.is_ntt_form() {
			return Err(Error::NttFormMismatch);
		}
		let inner = self.context.inner();
		let mut slab = self.lift_plain(plain)?;
		poly::ntt_forward(&mut slab, inner.data_ntt(), inner.n);
		plain.data = slab;
		plain.ntt_form = true;
		Ok(())
	}

	/// Transforms a ciphertext into NTT form.
	pub fn transform_to_ntt_inplace(&self, a: &mut Ciphertext) -> Result<()> {
		self.check_ciphertext(a)?;
		if a.is_ntt_form() {
			return Err(Error::NttFormMismatch);
		}
		let inner = self.context.inner();
		for p in &mut a.polys {
			poly::ntt_forward(p, inner.data_ntt(), inner.n);
		}
		a.ntt_form = true;
		Ok(())
	}

	/// Transforms a ciphertext back to coefficient form.
	pub fn transform_from_ntt_inplace(&self, a: &mut Ciphertext) -> Result<()> {
		self.check_ciphertext(a)?;
		if !a.is_ntt_form() {
			return Err(Error::NttFormMismatch);
		}
		let inner = self.context.inner();
		for p in &mut a.polys {
			poly::ntt_inverse(p, inner.data_ntt(), inner.n);
		}
		a.ntt_form = false;
		Ok(())
	}

	/// Spreads plaintext coefficients over the ciphertext primes.
	fn lift_plain(&self, plain: &Plaintext) -> Result<Vec<u64>> {
		let inner = self.context.inner();
		if plain.coeff_count() > inner.n {
			return Err(Error::InvalidPlaintext);
		}
		let n = inner.n;
		let mut slab = vec![0u64; inner.data_slab_len()];
		for (i, m) in inner.data_moduli().iter().enumerate() {
			let base = i * n;
			for (j, &c) in plain.data.iter().enumerate() {
				slab[base + j] = m.reduce(c);
			}
		}
		Ok(slab)
	}

	/// Lifts a data-level slab into the auxiliary basis (centered), in NTT
	/// form.
	fn lift_to_aux(&self, slab: &[u64]) -> Vec<u64> {
		let inner = self.context.inner();
		let n = inner.n;
		let aux_len = inner.aux_moduli.len();
		let mut out = vec![0u64; aux_len * n];
		let mut residues = vec![0u64; inner.data_len];
		for c in 0..n {
			for i in 0..inner.data_len {
				residues[i] = slab[i * n + c];
			}
			let x = inner.rns_data.compose_centered(&residues);
			let lifted = inner.rns_aux.decompose_signed(&x);
			for (j, &r) in lifted.iter().enumerate() {
				out[j * n + c] = r;
			}
		}
		poly::ntt_forward(&mut out, &inner.aux_ntt, n);
		out
	}

	/// Reconstructs an auxiliary-basis slab to integers, scales by t/Q with
	/// rounding, and reduces into the data basis.
	fn scale_from_aux(&self, slab: &[u64]) -> Vec<u64> {
		let inner = self.context.inner();
		let n = inner.n;
		let aux_len = inner.aux_moduli.len();
		let t = BigInt::from(inner.plain.value());
		let q = BigInt::from(inner.rns_data.modulus().clone());
		let q_half = &q >> 1;
		let mut out = vec![0u64; inner.data_slab_len()];
		let mut residues = vec![0u64; aux_len];
		for c in 0..n {
			for j in 0..aux_len {
				residues[j] = slab[j * n + c];
			}
			let x = inner.rns_aux.compose_centered(&residues);
			let num = &t * x;
			let y: BigInt = if num >= BigInt::zero() {
				(num + &q_half) / &q
			} else {
				let neg: BigInt = -num;
				let div: BigInt = (neg + &q_half) / &q;
				-div
			};
			let reduced = inner.rns_data.decompose_signed(&y);
			for (i, &r) in reduced.iter().enumerate() {
				out[i * n + c] = r;
			}
		}
		out
	}

	/// Key-switches a single data-level polynomial in coefficient form,
	/// returning the two output polynomials in coefficient form.
	///
	/// The input is decomposed into its CRT digits; each digit multiplies
	/// the matching key element at key level, and the accumulated result is
	/// rescaled by the special prime with rounding.
	fn switch_key(&self, c: &[u64], ksk: &KeySwitchingKey) -> Result<(Vec<u64>, Vec<u64>)> {
		let inner = self.context.inner();
		let ks = inner.ks.as_ref().ok_or(Error::KeySwitchUnavailable)?;
		if ksk.k0.len() != inner.data_len {
			return Err(Error::InvalidArgument);
		}
		let n = inner.n;
		let key_len = inner.moduli.len();

		let mut acc0 = vec![0u64; key_len * n];
		let mut acc1 = vec![0u64; key_len * n];
		for i in 0..inner.data_len {
			let digit = &c[i * n..(i + 1) * n];
			let mut d = vec![0u64; key_len * n];
			for (j, m) in inner.moduli.iter().enumerate() {
				let base = j * n;
				for (k, &v) in digit.iter().enumerate() {
					d[base + k] = m.reduce(v);
				}
			}
			poly::ntt_forward(&mut d, &inner.ntt, n);
			poly::mul_acc(&mut acc0, &d, &ksk.k0[i], &inner.moduli, n);
			poly::mul_acc(&mut acc1, &d, &ksk.k1[i], &inner.moduli, n);
		}
		poly::ntt_inverse(&mut acc0, &inner.ntt, n);
		poly::ntt_inverse(&mut acc1, &inner.ntt, n);

		// Divide by the special prime with rounding:
		// out = (acc - [acc]_P) * P^{-1} mod q_i, with [acc]_P centered.
		let special_base = (key_len - 1) * n;
		let divide = |acc: &[u64]| -> Vec<u64> {
			let mut out = vec![0u64; inner.data_slab_len()];
			for i in 0..inner.data_len {
				let m = &inner.moduli[i];
				let base = i * n;
				for k in 0..n {
					let r = acc[special_base + k];
					let r_mod = if r > ks.p_half {
						// r - P, reduced into q_i.
						m.neg(m.reduce(ks.p_value - r))
					} else {
						m.reduce(r)
					};
					let diff = m.sub(acc[base + k], r_mod);
					out[base + k] = m.mul(diff, ks.p_inv[i]);
				}
			}
			out
		};
		Ok((divide(&acc0), divide(&acc1)))
	}
}
