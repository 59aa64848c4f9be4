//! Small helpers shared by the query construction and expansion paths.

use pirouette_bfv::Modulus;

use crate::error::{Error, Result};

/// Generates the Galois elements needed for oblivious expansion over a ring
/// of degree `n`: `n/2^j + 1` for every round `j` the expansion might run.
pub fn generate_galois_elts(n: u64) -> Vec<u32> {
	(0..ceil_log2(n)).map(|j| ((n >> j) + 1) as u32).collect()
}

/// Log base 2 of `v`, rounded up. `v` must be nonzero.
pub fn ceil_log2(v: u64) -> u32 {
	v.next_power_of_two().trailing_zeros()
}

/// Inverse of `v` modulo the plain modulus. The packed query stores
/// `m^{-1} mod t` in its hot slots, so a non-invertible expansion factor is
/// an internal error rather than a user mistake.
pub(crate) fn invert_mod(v: u64, modulus: &Modulus) -> Result<u64> {
	modulus
		.try_invert(modulus.reduce(v))
		.ok_or_else(|| Error::internal(format!("cannot invert {} modulo {}", v, modulus.value())))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn ceil_log2_examples() {
		assert_eq!(ceil_log2(1), 0);
		assert_eq!(ceil_log2(2), 1);
		assert_eq!(ceil_log2(3), 2);
		assert_eq!(ceil_log2(8), 3);
		assert_eq!(ceil_log2(15), 4);
		assert_eq!(ceil_log2(16), 4);
		assert_eq!(ceil_log2(17), 5);
		assert_eq!(ceil_log2((1 << 16) - 1), 16);
		assert_eq!(ceil_log2(1 << 16), 16);
		assert_eq!(ceil_log2(1 << 31), 31);
	}

	#[test]
	fn galois_elements_for_degree_4096() {
		let elts = generate_galois_elts(4096);
		assert_eq!(elts.len(), 12);
		assert_eq!(elts[0], 4097);
		assert_eq!(elts[1], 2049);
		assert_eq!(elts[11], 3);
	}

	#[test]
	fn invert_mod_reports_failures() {
		let t = Modulus::new(1032193).unwrap();
		let inv = invert_mod(4096, &t).unwrap();
		assert_eq!(t.mul(inv, 4096), 1);
		let even = Modulus::new(4096).unwrap();
		assert!(invert_mod(2, &even).is_err());
	}
}
