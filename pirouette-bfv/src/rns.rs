use num_bigint::{BigInt, BigUint};
use num_traits::{ToPrimitive, Zero};

use crate::error::{Error, Result};
use crate::modulus::Modulus;

/// A residue number system over a list of pairwise-distinct prime moduli,
/// with the precomputations needed to move between RNS form and plain
/// integers via the Chinese remainder theorem.
#[derive(Debug, Clone)]
pub(crate) struct RnsBase {
	moduli: Vec<Modulus>,
	/// Q = q_0 * q_1 * ... * q_{k-1}.
	modulus: BigUint,
	half: BigUint,
	/// Q / q_i.
	punctured: Vec<BigUint>,
	/// (Q / q_i)^{-1} mod q_i.
	inv_punctured: Vec<u64>,
}

impl RnsBase {
	pub fn new(moduli: &[Modulus]) -> Result<Self> {
		if moduli.is_empty() {
			return Err(Error::CoefficientModulusNotSet);
		}
		let mut modulus = BigUint::from(1u64);
		for m in moduli {
			modulus *= m.value();
		}
		let mut punctured = Vec::with_capacity(moduli.len());
		let mut inv_punctured = Vec::with_capacity(moduli.len());
		for m in moduli {
			let p = &modulus / m.value();
			let p_mod = (&p % m.value()).to_u64().unwrap_or(0);
			let inv = m.try_invert(p_mod).ok_or(Error::InvalidArgument)?;
			punctured.push(p);
			inv_punctured.push(inv);
		}
		let half = &modulus >> 1;
		Ok(Self {
			moduli: moduli.to_vec(),
			modulus,
			half,
			punctured,
			inv_punctured,
		})
	}

	pub fn moduli(&self) -> &[Modulus] {
		&self.moduli
	}

	pub fn modulus(&self) -> &BigUint {
		&self.modulus
	}

	/// CRT-composes one residue per modulus into the value in [0, Q).
	pub fn compose(&self, residues: &[u64]) -> BigUint {
		debug_assert_eq!(residues.len(), self.moduli.len());
		let mut acc = BigUint::zero();
		for i in 0..self.moduli.len() {
			let term = self.moduli[i].mul(residues[i], self.inv_punctured[i]);
			acc += &self.punctured[i] * term;
		}
		acc % &self.modulus
	}

	/// CRT-composes into the centered representative in [-Q/2, Q/2).
	pub fn compose_centered(&self, residues: &[u64]) -> BigInt {
		let v = self.compose(residues);
		if v > self.half {
			BigInt::from(v) - BigInt::from(self.modulus.clone())
		} else {
			BigInt::from(v)
		}
	}

	/// Reduces a non-negative integer to one residue per modulus.
	pub fn decompose(&self, value: &BigUint) -> Vec<u64> {
		self.moduli
			.iter()
			.map(|m| (value % m.value()).to_u64().unwrap_or(0))
			.collect()
	}

	/// Reduces a signed integer to one residue per modulus.
	pub fn decompose_signed(&self, value: &BigInt) -> Vec<u64> {
		self.moduli
			.iter()
			.map(|m| {
				let q = BigInt::from(m.value());
				let mut r = value % &q;
				if r.sign() == num_bigint::Sign::Minus {
					r += &q;
				}
				r.to_u64().unwrap_or(0)
			})
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn base() -> RnsBase {
		let moduli = vec![
			Modulus::new(7681).unwrap(),
			Modulus::new(12289).unwrap(),
			Modulus::new(40961).unwrap(),
		];
		RnsBase::new(&moduli).unwrap()
	}

	#[test]
	fn compose_decompose_roundtrip() {
		let rns = base();
		let value = BigUint::from(123456789u64);
		let residues = rns.decompose(&value);
		assert_eq!(rns.compose(&residues), value);
	}

	#[test]
	fn centered_composition_is_signed() {
		let rns = base();
		let minus_five = rns.decompose_signed(&BigInt::from(-5));
		assert_eq!(rns.compose_centered(&minus_five), BigInt::from(-5));
		let five = rns.decompose(&BigUint::from(5u64));
		assert_eq!(rns.compose_centered(&five), BigInt::from(5));
	}
}
