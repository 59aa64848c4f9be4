use core::hash::Hash;
use std::fmt::{Debug, Display};

use serde::ser::Error as _;
use serde::{Serialize, Serializer};

use crate::error::{Error, Result};
use crate::serialization::ToBytes;

/// Class to store a plaintext polynomial. The data for the plaintext is a
/// polynomial with coefficients modulo the plaintext modulus, stored lowest
/// degree first with one 64-bit word per coefficient.
///
/// # NTT form
/// In its usual coefficient form a plaintext holds at most N words. After
/// [`transform_plain_to_ntt_inplace`](crate::BFVEvaluator::transform_plain_to_ntt_inplace)
/// the plaintext instead holds one NTT evaluation vector per ciphertext
/// prime (the backing array grows to `moduli * N` words) so it can be
/// multiplied pointwise into NTT-form ciphertexts. The form is observable
/// through [`Plaintext::is_ntt_form`].
#[derive(Clone, Default)]
pub struct Plaintext {
	pub(crate) data: Vec<u64>,
	pub(crate) ntt_form: bool,
}

impl Plaintext {
	/// Constructs an empty plaintext allocating no memory.
	pub fn new() -> Self {
		Self {
			data: Vec::new(),
			ntt_form: false,
		}
	}

	/// Constructs a zero plaintext with `count` coefficient slots.
	pub fn with_coeff_count(count: usize) -> Self {
		Self {
			data: vec![0u64; count],
			ntt_form: false,
		}
	}

	/// Constructs a plaintext from raw coefficients, lowest degree first.
	pub fn from_coefficients(coefficients: Vec<u64>) -> Self {
		Self {
			data: coefficients,
			ntt_form: false,
		}
	}

	/// Constructs a plaintext from a hexadecimal polynomial string of the
	/// form produced by `Display`, e.g. `"7FFx^3 + 1x^1 + 3"`:
	///
	/// 1. Terms are in order of strictly decreasing exponent
	/// 2. Coefficients are non-negative hexadecimal values
	/// 3. Exponents are positive and decimal
	/// 4. Zero terms may be omitted; `"0"` denotes the zero polynomial
	pub fn from_hex_string(hex_str: &str) -> Result<Self> {
		let mut coeffs: Vec<(usize, u64)> = Vec::new();
		let mut max_exp = 0usize;
		for term in hex_str.split('+') {
			let term = term.trim();
			if term.is_empty() {
				return Err(Error::InvalidArgument);
			}
			let (value_str, exp) = match term.split_once("x^") {
				Some((v, e)) => {
					let exp: usize = e.parse().map_err(|_| Error::InvalidArgument)?;
					(v, exp)
				}
				None => (term, 0usize),
			};
			let value =
				u64::from_str_radix(value_str.trim(), 16).map_err(|_| Error::InvalidArgument)?;
			max_exp = max_exp.max(exp);
			coeffs.push((exp, value));
		}
		let mut data = vec![0u64; max_exp + 1];
		for (exp, value) in coeffs {
			data[exp] = value;
		}
		let mut pt = Self {
			data,
			ntt_form: false,
		};
		pt.trim();
		Ok(pt)
	}

	/// Gets the coefficient at the given location. Coefficients are ordered
	/// from lowest to highest degree, with the first value being the
	/// constant coefficient.
	///
	/// # Panics
	/// Panics if index is not less than `coeff_count()`.
	pub fn get_coefficient(&self, index: usize) -> u64 {
		if index >= self.data.len() {
			panic!("Index {} out of bounds {}", index, self.data.len());
		}
		self.data[index]
	}

	/// Sets the coefficient at the given location.
	///
	/// # Panics
	/// Panics if index is not less than `coeff_count()`.
	pub fn set_coefficient(&mut self, index: usize, value: u64) {
		if index >= self.data.len() {
			panic!("Index {} out of bounds {}", index, self.data.len());
		}
		self.data[index] = value;
	}

	/// Sets the number of coefficients this plaintext can hold.
	pub fn resize(&mut self, count: usize) {
		self.data.resize(count, 0);
	}

	/// Sets every coefficient to zero.
	pub fn set_zero(&mut self) {
		self.data.fill(0);
	}

	/// Returns the number of coefficients currently allocated.
	pub fn coeff_count(&self) -> usize {
		self.data.len()
	}

	/// Returns the number of coefficients up to and including the last
	/// nonzero one.
	pub fn significant_coeff_count(&self) -> usize {
		self.data
			.iter()
			.rposition(|&c| c != 0)
			.map(|p| p + 1)
			.unwrap_or(0)
	}

	/// Returns `true` if the plaintext holds no coefficients.
	pub fn is_empty(&self) -> bool {
		self.data.is_empty()
	}

	/// Returns whether the plaintext is in NTT form.
	pub fn is_ntt_form(&self) -> bool {
		self.ntt_form
	}

	/// Drops trailing zero coefficients.
	pub(crate) fn trim(&mut self) {
		let significant = self.significant_coeff_count();
		self.data.truncate(significant);
	}
}

impl Debug for Plaintext {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Plaintext")
			.field("coeff_count", &self.coeff_count())
			.field("ntt_form", &self.ntt_form)
			.finish()
	}
}

impl Display for Plaintext {
	/// Formats the polynomial in the hexadecimal form accepted by
	/// [`Plaintext::from_hex_string`].
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		if self.ntt_form {
			return write!(f, "<NTT form>");
		}
		let significant = self.significant_coeff_count();
		if significant == 0 {
			return write!(f, "0");
		}
		let mut first = true;
		for i in (0..significant).rev() {
			let c = self.data[i];
			if c == 0 {
				continue;
			}
			if !first {
				write!(f, " + ")?;
			}
			first = false;
			if i == 0 {
				write!(f, "{:X}", c)?;
			} else {
				write!(f, "{:X}x^{}", c, i)?;
			}
		}
		Ok(())
	}
}

impl AsRef<Plaintext> for Plaintext {
	fn as_ref(&self) -> &Self {
		self
	}
}

impl PartialEq for Plaintext {
	/// Two plaintexts are equal when they agree on every significant
	/// coefficient; trailing zeros are ignored.
	fn eq(&self, other: &Self) -> bool {
		if self.ntt_form != other.ntt_form {
			return false;
		}
		let len = self.significant_coeff_count();
		if len != other.significant_coeff_count() {
			return false;
		}
		self.data[..len] == other.data[..len]
	}
}

impl Eq for Plaintext {}

impl Hash for Plaintext {
	fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
		for &c in &self.data[..self.significant_coeff_count()] {
			state.write_u64(c);
		}
	}
}

impl Serialize for Plaintext {
	fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let bytes = self
			.as_bytes()
			.map_err(|e| S::Error::custom(format!("Failed to serialize plaintext: {}", e)))?;
		serializer.serialize_bytes(&bytes)
	}
}
