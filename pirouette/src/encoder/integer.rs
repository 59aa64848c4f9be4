use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use pirouette_bfv::Plaintext;

use crate::context::PirContext;
use crate::error::{Error, Result};

/// Packs a non-negative integer into as few plaintext coefficients as
/// possible, using the plain modulus t as the radix: coefficient i holds
/// digit i of the base-t expansion.
pub struct BigUintEncoder {
	context: PirContext,
}

impl BigUintEncoder {
	/// Creates an encoder over the given context.
	pub fn new(context: &PirContext) -> Self {
		Self {
			context: context.clone(),
		}
	}

	/// Encodes a big unsigned integer. Fails if the value needs more than
	/// N base-t digits.
	pub fn encode(&self, value: &BigUint) -> Result<Plaintext> {
		let t = self.context.he().plain_modulus().value();
		let n = self.context.poly_modulus_degree();
		let t_big = BigUint::from(t);
		let mut digits = Vec::new();
		let mut rest = value.clone();
		while !rest.is_zero() {
			let digit = (&rest % &t_big).to_u64().expect("digit below t");
			digits.push(digit);
			rest /= &t_big;
			if digits.len() > n {
				return Err(Error::invalid_argument(
					"value too large to encode in one plaintext",
				));
			}
		}
		Ok(Plaintext::from_coefficients(digits))
	}

	/// Encodes a machine integer.
	pub fn encode_u64(&self, value: u64) -> Result<Plaintext> {
		self.encode(&BigUint::from(value))
	}

	/// Decodes a plaintext back to the packed integer.
	pub fn decode(&self, plaintext: &Plaintext) -> BigUint {
		let t = BigUint::from(self.context.he().plain_modulus().value());
		let mut result = BigUint::zero();
		for i in (0..plaintext.significant_coeff_count()).rev() {
			result = result * &t + plaintext.get_coefficient(i);
		}
		result
	}

	/// Decodes a plaintext expected to hold a machine integer.
	pub fn decode_u64(&self, plaintext: &Plaintext) -> Result<u64> {
		self.decode(plaintext)
			.to_u64()
			.ok_or_else(|| Error::internal("decoded value exceeds 64 bits"))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::params::PirParametersBuilder;

	fn encoder() -> BigUintEncoder {
		let params = PirParametersBuilder::new().set_num_items(10).build().unwrap();
		let context = PirContext::new(&params).unwrap();
		BigUintEncoder::new(&context)
	}

	#[test]
	fn small_values_use_one_coefficient() {
		let enc = encoder();
		let pt = enc.encode_u64(42).unwrap();
		assert_eq!(pt.significant_coeff_count(), 1);
		assert_eq!(enc.decode_u64(&pt).unwrap(), 42);
	}

	#[test]
	fn zero_encodes_to_empty_polynomial() {
		let enc = encoder();
		let pt = enc.encode_u64(0).unwrap();
		assert_eq!(pt.significant_coeff_count(), 0);
		assert_eq!(enc.decode_u64(&pt).unwrap(), 0);
	}

	#[test]
	fn values_above_the_radix_spread_over_digits() {
		let enc = encoder();
		// t = 1032193 for the default parameters.
		let pt = enc.encode_u64(1032193 * 7 + 5).unwrap();
		assert_eq!(pt.significant_coeff_count(), 2);
		assert_eq!(pt.get_coefficient(0), 5);
		assert_eq!(pt.get_coefficient(1), 7);
		assert_eq!(enc.decode_u64(&pt).unwrap(), 1032193 * 7 + 5);
	}

	#[test]
	fn big_integers_roundtrip() {
		let enc = encoder();
		let value = BigUint::parse_bytes(b"123456789012345678901234567890123456789", 10).unwrap();
		let pt = enc.encode(&value).unwrap();
		assert_eq!(enc.decode(&pt), value);
		assert!(enc.decode_u64(&pt).is_err());
	}

	#[test]
	fn u64_extremes_roundtrip() {
		let enc = encoder();
		let pt = enc.encode_u64(u64::MAX).unwrap();
		assert_eq!(enc.decode_u64(&pt).unwrap(), u64::MAX);
	}
}
