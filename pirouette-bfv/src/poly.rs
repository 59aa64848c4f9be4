//! Internal helpers for RNS polynomials.
//!
//! A polynomial is stored as a flat slab of `moduli.len() * n` words:
//! segment i holds the coefficients modulo `moduli[i]`, lowest degree
//! first. Slabs carry no form flag themselves; callers track whether a
//! slab holds coefficients or NTT evaluations.

use rand::Rng;

use crate::modulus::Modulus;
use crate::ntt::NttTables;

pub(crate) fn add_assign(a: &mut [u64], b: &[u64], moduli: &[Modulus], n: usize) {
	for (i, m) in moduli.iter().enumerate() {
		let base = i * n;
		for j in base..base + n {
			a[j] = m.add(a[j], b[j]);
		}
	}
}

pub(crate) fn sub_assign(a: &mut [u64], b: &[u64], moduli: &[Modulus], n: usize) {
	for (i, m) in moduli.iter().enumerate() {
		let base = i * n;
		for j in base..base + n {
			a[j] = m.sub(a[j], b[j]);
		}
	}
}

pub(crate) fn negate_assign(a: &mut [u64], moduli: &[Modulus], n: usize) {
	for (i, m) in moduli.iter().enumerate() {
		let base = i * n;
		for j in base..base + n {
			a[j] = m.neg(a[j]);
		}
	}
}

/// Pointwise a *= b, segment by segment.
pub(crate) fn mul_assign(a: &mut [u64], b: &[u64], moduli: &[Modulus], n: usize) {
	for (i, m) in moduli.iter().enumerate() {
		let base = i * n;
		for j in base..base + n {
			a[j] = m.mul(a[j], b[j]);
		}
	}
}

/// Pointwise acc += a * b, segment by segment.
pub(crate) fn mul_acc(acc: &mut [u64], a: &[u64], b: &[u64], moduli: &[Modulus], n: usize) {
	for (i, m) in moduli.iter().enumerate() {
		let base = i * n;
		for j in base..base + n {
			acc[j] = m.add(acc[j], m.mul(a[j], b[j]));
		}
	}
}

/// Multiplies segment i by the scalar `scalars[i]`.
pub(crate) fn scalar_mul_assign(a: &mut [u64], scalars: &[u64], moduli: &[Modulus], n: usize) {
	for (i, m) in moduli.iter().enumerate() {
		let base = i * n;
		for j in base..base + n {
			a[j] = m.mul(a[j], scalars[i]);
		}
	}
}

pub(crate) fn ntt_forward(a: &mut [u64], tables: &[NttTables], n: usize) {
	for (i, t) in tables.iter().enumerate() {
		t.forward(&mut a[i * n..(i + 1) * n]);
	}
}

pub(crate) fn ntt_inverse(a: &mut [u64], tables: &[NttTables], n: usize) {
	for (i, t) in tables.iter().enumerate() {
		t.inverse(&mut a[i * n..(i + 1) * n]);
	}
}

/// Lifts small signed coefficients into every RNS segment.
pub(crate) fn lift_signed(coeffs: &[i8], moduli: &[Modulus], n: usize) -> Vec<u64> {
	debug_assert_eq!(coeffs.len(), n);
	let mut slab = vec![0u64; moduli.len() * n];
	for (i, m) in moduli.iter().enumerate() {
		let base = i * n;
		for (j, &c) in coeffs.iter().enumerate() {
			slab[base + j] = if c < 0 {
				m.value() - (-c as u64)
			} else {
				c as u64
			};
		}
	}
	slab
}

/// Applies the ring automorphism x -> x^elt to a slab in coefficient form.
/// `elt` must be odd; x^(i*elt) wraps to -x^((i*elt) mod n) when the raw
/// exponent lands in [n, 2n).
pub(crate) fn apply_automorphism(
	src: &[u64],
	elt: u64,
	moduli: &[Modulus],
	n: usize,
) -> Vec<u64> {
	let two_n = 2 * n as u64;
	let mut dst = vec![0u64; src.len()];
	for (i, m) in moduli.iter().enumerate() {
		let base = i * n;
		for j in 0..n {
			let raw = (j as u64 * elt) % two_n;
			if raw < n as u64 {
				dst[base + raw as usize] = src[base + j];
			} else {
				dst[base + (raw - n as u64) as usize] = m.neg(src[base + j]);
			}
		}
	}
	dst
}

/// Same automorphism over a small signed coefficient vector.
pub(crate) fn apply_automorphism_signed(src: &[i8], elt: u64, n: usize) -> Vec<i8> {
	let two_n = 2 * n as u64;
	let mut dst = vec![0i8; n];
	for (j, &c) in src.iter().enumerate() {
		let raw = (j as u64 * elt) % two_n;
		if raw < n as u64 {
			dst[raw as usize] = c;
		} else {
			dst[(raw - n as u64) as usize] = -c;
		}
	}
	dst
}

/// Uniform slab, sampled directly in the target domain.
pub(crate) fn sample_uniform<R: Rng>(moduli: &[Modulus], n: usize, rng: &mut R) -> Vec<u64> {
	let mut slab = vec![0u64; moduli.len() * n];
	for (i, m) in moduli.iter().enumerate() {
		let base = i * n;
		for j in base..base + n {
			slab[j] = rng.gen_range(0..m.value());
		}
	}
	slab
}

/// Uniform ternary secret in {-1, 0, 1}.
pub(crate) fn sample_ternary<R: Rng>(n: usize, rng: &mut R) -> Vec<i8> {
	(0..n).map(|_| rng.gen_range(-1i8..=1)).collect()
}

/// Centered binomial error with variance 10 (sigma about 3.2, matching the
/// standard BFV error distribution width).
pub(crate) fn sample_error<R: Rng>(n: usize, rng: &mut R) -> Vec<i8> {
	(0..n)
		.map(|_| {
			let bits: u64 = rng.gen();
			let ones = (bits & 0xFFFFF).count_ones() as i8;
			ones - 10
		})
		.collect()
}
