use crate::error::{Error, Result};
use crate::modulus::Modulus;

/// Precomputed tables for the negacyclic number-theoretic transform over a
/// single prime modulus q with q ≡ 1 (mod 2N).
///
/// The forward transform takes coefficients in standard order to evaluations
/// in bit-reversed order; the inverse undoes it. Pointwise products between
/// two forward transforms therefore realize multiplication modulo x^N + 1.
#[derive(Debug, Clone)]
pub(crate) struct NttTables {
	n: usize,
	modulus: Modulus,
	// psi^bitrev(i) for the forward butterflies.
	root_powers: Vec<u64>,
	// psi^{-bitrev(i)} for the inverse butterflies.
	inv_root_powers: Vec<u64>,
	inv_n: u64,
}

fn bit_reverse(value: usize, bits: u32) -> usize {
	(value as u64).reverse_bits() as usize >> (64 - bits)
}

impl NttTables {
	/// Builds the tables for degree `n` (a power of two) and modulus `q`.
	pub fn new(n: usize, modulus: Modulus) -> Result<Self> {
		if !n.is_power_of_two() || n < 2 {
			return Err(Error::UnsupportedDegree);
		}
		let q = modulus.value();
		if (q - 1) % (2 * n as u64) != 0 {
			return Err(Error::InvalidArgument);
		}
		let log_n = n.trailing_zeros();
		let psi = find_primitive_2nth_root(n as u64, modulus)?;
		let psi_inv = modulus
			.try_invert(psi)
			.ok_or(Error::InvalidArgument)?;

		let mut root_powers = vec![0u64; n];
		let mut inv_root_powers = vec![0u64; n];
		let mut power = 1u64;
		let mut inv_power = 1u64;
		let mut powers = vec![0u64; n];
		let mut inv_powers = vec![0u64; n];
		for i in 0..n {
			powers[i] = power;
			inv_powers[i] = inv_power;
			power = modulus.mul(power, psi);
			inv_power = modulus.mul(inv_power, psi_inv);
		}
		for i in 0..n {
			root_powers[i] = powers[bit_reverse(i, log_n)];
			inv_root_powers[i] = inv_powers[bit_reverse(i, log_n)];
		}

		let inv_n = modulus
			.try_invert(n as u64)
			.ok_or(Error::InvalidArgument)?;

		Ok(Self {
			n,
			modulus,
			root_powers,
			inv_root_powers,
			inv_n,
		})
	}

	/// In-place forward negacyclic NTT (Cooley-Tukey, decimation in time).
	pub fn forward(&self, a: &mut [u64]) {
		debug_assert_eq!(a.len(), self.n);
		let q = &self.modulus;
		let mut t = self.n;
		let mut m = 1;
		while m < self.n {
			t /= 2;
			for i in 0..m {
				let j1 = 2 * i * t;
				let s = self.root_powers[m + i];
				for j in j1..j1 + t {
					let u = a[j];
					let v = q.mul(a[j + t], s);
					a[j] = q.add(u, v);
					a[j + t] = q.sub(u, v);
				}
			}
			m *= 2;
		}
	}

	/// In-place inverse negacyclic NTT (Gentleman-Sande, decimation in
	/// frequency), including the final scaling by 1/N.
	pub fn inverse(&self, a: &mut [u64]) {
		debug_assert_eq!(a.len(), self.n);
		let q = &self.modulus;
		let mut t = 1;
		let mut m = self.n;
		while m > 1 {
			let h = m / 2;
			let mut j1 = 0;
			for i in 0..h {
				let s = self.inv_root_powers[h + i];
				for j in j1..j1 + t {
					let u = a[j];
					let v = a[j + t];
					a[j] = q.add(u, v);
					a[j + t] = q.mul(q.sub(u, v), s);
				}
				j1 += 2 * t;
			}
			t *= 2;
			m = h;
		}
		for x in a.iter_mut() {
			*x = q.mul(*x, self.inv_n);
		}
	}
}

/// Finds psi with psi^N = -1 (mod q), i.e. a primitive 2N-th root of unity.
fn find_primitive_2nth_root(n: u64, modulus: Modulus) -> Result<u64> {
	let q = modulus.value();
	let exp = (q - 1) / (2 * n);
	for candidate in 2..q {
		let psi = modulus.pow(candidate, exp);
		if modulus.pow(psi, n) == q - 1 {
			return Ok(psi);
		}
	}
	Err(Error::InvalidArgument)
}
