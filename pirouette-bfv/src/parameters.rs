use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::modulus::Modulus;

/// The homomorphic encryption scheme implemented by this crate.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchemeType {
	/// Brakerski/Fan-Vercauteren scheme.
	Bfv = 0x1,
}

impl SchemeType {
	/// Converts a u8 to a SchemeType.
	pub fn from_u8(val: u8) -> Result<Self> {
		match val {
			0x1 => Ok(SchemeType::Bfv),
			_ => Err(Error::InvalidArgument),
		}
	}
}

/// The available degree sizes for the polynomial modulus.
#[allow(missing_docs)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DegreeType {
	D1024,
	D2048,
	D4096,
	D8192,
	D16384,
	D32768,
}

impl From<DegreeType> for u64 {
	fn from(value: DegreeType) -> Self {
		match value {
			DegreeType::D1024 => 1024,
			DegreeType::D2048 => 2048,
			DegreeType::D4096 => 4096,
			DegreeType::D8192 => 8192,
			DegreeType::D16384 => 16384,
			DegreeType::D32768 => 32768,
		}
	}
}

impl TryFrom<u64> for DegreeType {
	type Error = Error;

	fn try_from(value: u64) -> Result<Self> {
		match value {
			1024 => Ok(DegreeType::D1024),
			2048 => Ok(DegreeType::D2048),
			4096 => Ok(DegreeType::D4096),
			8192 => Ok(DegreeType::D8192),
			16384 => Ok(DegreeType::D16384),
			32768 => Ok(DegreeType::D32768),
			_ => Err(Error::UnsupportedDegree),
		}
	}
}

/// The enforced security level, following the HomomorphicEncryption.org
/// standard tables for the total coefficient modulus width.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SecurityLevel {
	/// 128-bit classical security.
	#[default]
	TC128,
}

impl SecurityLevel {
	/// Maximum total coefficient modulus bits for the given degree.
	pub fn max_coeff_modulus_bits(&self, degree: DegreeType) -> u32 {
		match degree {
			DegreeType::D1024 => 27,
			DegreeType::D2048 => 54,
			DegreeType::D4096 => 109,
			DegreeType::D8192 => 218,
			DegreeType::D16384 => 438,
			DegreeType::D32768 => 881,
		}
	}
}

/// An immutable collection of parameters that defines an encryption scheme.
/// Use the builder to create one. Validation beyond basic shape checks
/// happens when a [`Context`](crate::Context) is constructed from these.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncryptionParameters {
	scheme: SchemeType,
	poly_modulus_degree: u64,
	plain_modulus: Modulus,
	coeff_modulus: Vec<Modulus>,
}

impl EncryptionParameters {
	/// Returns the scheme these parameters target.
	pub fn get_scheme(&self) -> SchemeType {
		self.scheme
	}

	/// Returns the polynomial degree N.
	pub fn get_poly_modulus_degree(&self) -> u64 {
		self.poly_modulus_degree
	}

	/// Returns the plaintext modulus t.
	pub fn get_plain_modulus(&self) -> Modulus {
		self.plain_modulus
	}

	/// Returns the coefficient modulus q as its prime factors.
	pub fn get_coefficient_modulus(&self) -> &[Modulus] {
		&self.coeff_modulus
	}
}

/// The coefficient modulus is a list of distinct [`Modulus`] instances.
#[derive(Debug, PartialEq)]
enum CoefficientModulusType {
	NotSet,
	Modulus(Vec<Modulus>),
}

/// The plain modulus is either a constant or a [`Modulus`] instance.
#[derive(Debug, PartialEq)]
enum PlainModulusType {
	NotSet,
	Constant(u64),
	Modulus(Modulus),
}

/// Represents a builder that sets up and creates encryption scheme
/// parameters. The parameters (most importantly PolyModulus, CoeffModulus,
/// PlainModulus) significantly affect the performance, capabilities, and
/// security of the encryption scheme.
pub struct BFVEncryptionParametersBuilder {
	poly_modulus_degree: Option<DegreeType>,
	coefficient_modulus: CoefficientModulusType,
	plain_modulus: PlainModulusType,
}

impl BFVEncryptionParametersBuilder {
	/// Creates a new builder.
	pub fn new() -> Self {
		Self {
			poly_modulus_degree: None,
			coefficient_modulus: CoefficientModulusType::NotSet,
			plain_modulus: PlainModulusType::NotSet,
		}
	}

	/// Set the degree of the polynomial used in the BFV scheme. Generally,
	/// larger values provide more security and noise margin at the expense
	/// of performance.
	pub fn set_poly_modulus_degree(mut self, degree: DegreeType) -> Self {
		self.poly_modulus_degree = Some(degree);
		self
	}

	/// Sets the coefficient modulus parameter as a list of distinct prime
	/// number moduli. Each prime must be congruent to 1 modulo
	/// 2*poly_modulus_degree; the chain directly affects the noise budget
	/// of freshly encrypted ciphertexts and the supported multiplicative
	/// depth.
	pub fn set_coefficient_modulus(mut self, modulus: Vec<Modulus>) -> Self {
		self.coefficient_modulus = CoefficientModulusType::Modulus(modulus);
		self
	}

	/// Set the plaintext modulus to a fixed size. Prefer
	/// `PlainModulusFactory::batching` so the plain modulus supports NTT.
	pub fn set_plain_modulus_u64(mut self, modulus: u64) -> Self {
		self.plain_modulus = PlainModulusType::Constant(modulus);
		self
	}

	/// Set the plaintext modulus.
	pub fn set_plain_modulus(mut self, modulus: Modulus) -> Self {
		self.plain_modulus = PlainModulusType::Modulus(modulus);
		self
	}

	/// Validate the parameter choices and return the encryption parameters.
	pub fn build(self) -> Result<EncryptionParameters> {
		let degree = self.poly_modulus_degree.ok_or(Error::DegreeNotSet)?;
		let coeff_modulus = match self.coefficient_modulus {
			CoefficientModulusType::NotSet => return Err(Error::CoefficientModulusNotSet),
			CoefficientModulusType::Modulus(m) => m,
		};
		let plain_modulus = match self.plain_modulus {
			PlainModulusType::NotSet => return Err(Error::PlainModulusNotSet),
			PlainModulusType::Constant(p) => Modulus::new(p)?,
			PlainModulusType::Modulus(m) => m,
		};
		if coeff_modulus.is_empty() {
			return Err(Error::CoefficientModulusNotSet);
		}
		Ok(EncryptionParameters {
			scheme: SchemeType::Bfv,
			poly_modulus_degree: degree.into(),
			plain_modulus,
			coeff_modulus,
		})
	}
}

impl Default for BFVEncryptionParametersBuilder {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use crate::*;

	#[test]
	fn can_build_params() {
		let params = BFVEncryptionParametersBuilder::new()
			.set_poly_modulus_degree(DegreeType::D1024)
			.set_coefficient_modulus(
				CoefficientModulusFactory::bfv_default(DegreeType::D1024).unwrap(),
			)
			.set_plain_modulus_u64(1234)
			.build()
			.unwrap();

		assert_eq!(params.get_poly_modulus_degree(), 1024);
		assert_eq!(params.get_scheme(), SchemeType::Bfv);
		assert_eq!(params.get_plain_modulus().value(), 1234);
		assert_eq!(params.get_coefficient_modulus().len(), 1);
	}

	#[test]
	fn missing_pieces_are_rejected() {
		assert_eq!(
			BFVEncryptionParametersBuilder::new().build().unwrap_err(),
			Error::DegreeNotSet
		);
		assert_eq!(
			BFVEncryptionParametersBuilder::new()
				.set_poly_modulus_degree(DegreeType::D1024)
				.build()
				.unwrap_err(),
			Error::CoefficientModulusNotSet
		);
		assert_eq!(
			BFVEncryptionParametersBuilder::new()
				.set_poly_modulus_degree(DegreeType::D1024)
				.set_coefficient_modulus(
					CoefficientModulusFactory::bfv_default(DegreeType::D1024).unwrap(),
				)
				.build()
				.unwrap_err(),
			Error::PlainModulusNotSet
		);
	}

	#[test]
	fn params_serde_roundtrip() {
		let params = BFVEncryptionParametersBuilder::new()
			.set_poly_modulus_degree(DegreeType::D4096)
			.set_coefficient_modulus(
				CoefficientModulusFactory::bfv_default(DegreeType::D4096).unwrap(),
			)
			.set_plain_modulus(PlainModulusFactory::batching(DegreeType::D4096, 20).unwrap())
			.build()
			.unwrap();
		let bytes = params.as_bytes().unwrap();
		let restored = EncryptionParameters::from_bytes(&(), &bytes).unwrap();
		assert_eq!(params, restored);
	}
}
