use std::hash::{Hash, Hasher};

use pirouette_bfv::{
	BFVEncryptionParametersBuilder, CoefficientModulusFactory, DegreeType, EncryptionParameters,
	PlainModulusFactory,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Generates BFV encryption parameters suitable for PIR: the default
/// coefficient modulus for the degree and a batching-compatible plain
/// modulus of the requested width.
pub fn generate_encryption_params(
	degree: DegreeType,
	plain_mod_bits: u32,
) -> Result<EncryptionParameters> {
	let params = BFVEncryptionParametersBuilder::new()
		.set_poly_modulus_degree(degree)
		.set_coefficient_modulus(CoefficientModulusFactory::bfv_default(degree)?)
		.set_plain_modulus(PlainModulusFactory::batching(degree, plain_mod_bits)?)
		.build()?;
	Ok(params)
}

/// The default encryption parameters: N = 4096 with a 20-bit plain modulus.
pub fn default_encryption_params() -> Result<EncryptionParameters> {
	generate_encryption_params(DegreeType::D4096, 20)
}

/// Immutable description of one PIR deployment: the database geometry, the
/// item encoding, the dot-product variant, and the underlying encryption
/// parameters. Client and server must be built from identical values; the
/// request envelope carries a fingerprint so the server can verify this.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PirParameters {
	num_items: u64,
	bytes_per_item: u32,
	dimensions: Vec<u32>,
	bits_per_coeff: u32,
	use_ciphertext_multiplication: bool,
	encryption_parameters: EncryptionParameters,
}

impl PirParameters {
	/// Number of items held by the database.
	pub fn num_items(&self) -> u64 {
		self.num_items
	}

	/// Size of one item in bytes; 0 means integer mode.
	pub fn bytes_per_item(&self) -> u32 {
		self.bytes_per_item
	}

	/// Sides of the plaintext hypercube.
	pub fn dimensions(&self) -> &[u32] {
		&self.dimensions
	}

	/// The configured bits-per-coefficient override; 0 means derived from
	/// the plain modulus.
	pub fn bits_per_coeff(&self) -> u32 {
		self.bits_per_coeff
	}

	/// Whether the database dot product uses ciphertext-ciphertext
	/// multiplication (variant A) instead of ciphertext decomposition
	/// (variant B).
	pub fn use_ciphertext_multiplication(&self) -> bool {
		self.use_ciphertext_multiplication
	}

	/// The underlying encryption parameters.
	pub fn encryption_parameters(&self) -> &EncryptionParameters {
		&self.encryption_parameters
	}

	/// Bits stored per plaintext coefficient by the string encoder: the
	/// configured override, or the full capacity of the plain modulus.
	pub fn effective_bits_per_coeff(&self) -> u32 {
		if self.bits_per_coeff > 0 {
			self.bits_per_coeff
		} else {
			self.encryption_parameters.get_plain_modulus().bit_count() - 1
		}
	}

	/// Capacity of one plaintext in bytes.
	pub fn max_bytes_per_plaintext(&self) -> usize {
		let n = self.encryption_parameters.get_poly_modulus_degree() as usize;
		n * self.effective_bits_per_coeff() as usize / 8
	}

	/// Number of items packed into one plaintext polynomial.
	pub fn items_per_plaintext(&self) -> u64 {
		if self.bytes_per_item == 0 {
			1
		} else {
			(self.max_bytes_per_plaintext() / self.bytes_per_item as usize) as u64
		}
	}

	/// Number of plaintext polynomials in the database hypercube.
	pub fn num_pt(&self) -> u64 {
		self.num_items.div_ceil(self.items_per_plaintext())
	}

	/// Total number of selection-vector slots, summed over dimensions.
	pub fn dim_sum(&self) -> usize {
		self.dimensions.iter().map(|&d| d as usize).sum()
	}

	/// Byte offset of the item within the plaintext that holds it.
	pub fn item_offset(&self, index: u64) -> usize {
		((index % self.items_per_plaintext()) * self.bytes_per_item as u64) as usize
	}

	/// A stable digest of every parameter, carried in requests so a server
	/// can reject queries generated under different parameters.
	pub fn fingerprint(&self) -> u64 {
		let mut hasher = std::collections::hash_map::DefaultHasher::new();
		self.hash(&mut hasher);
		hasher.finish()
	}

	/// Helper function to calculate the dimensions for representing a
	/// database of `db_size` elements as a hypercube with `num_dimensions`
	/// near-balanced sides.
	pub fn calculate_dimensions(mut db_size: u64, num_dimensions: u32) -> Vec<u32> {
		let mut results = Vec::with_capacity(num_dimensions as usize);
		for i in (1..=num_dimensions).rev() {
			let side = (db_size as f64).powf(1.0 / i as f64).ceil() as u64;
			results.push(side as u32);
			db_size = db_size.div_ceil(side);
		}
		results
	}
}

/// Builder for [`PirParameters`].
pub struct PirParametersBuilder {
	num_items: Option<u64>,
	bytes_per_item: u32,
	dimensions: u32,
	bits_per_coeff: u32,
	use_ciphertext_multiplication: bool,
	encryption_parameters: Option<EncryptionParameters>,
}

impl PirParametersBuilder {
	/// Creates a new builder. Only the item count is mandatory; everything
	/// else has the defaults of a one-dimensional integer-mode database
	/// over the default encryption parameters.
	pub fn new() -> Self {
		Self {
			num_items: None,
			bytes_per_item: 0,
			dimensions: 1,
			bits_per_coeff: 0,
			use_ciphertext_multiplication: false,
			encryption_parameters: None,
		}
	}

	/// Sets the number of database items.
	pub fn set_num_items(mut self, num_items: u64) -> Self {
		self.num_items = Some(num_items);
		self
	}

	/// Sets the item size in bytes. 0 selects integer mode, where each
	/// item is a single integer in its own plaintext.
	pub fn set_bytes_per_item(mut self, bytes_per_item: u32) -> Self {
		self.bytes_per_item = bytes_per_item;
		self
	}

	/// Sets the number of hypercube dimensions.
	pub fn set_dimensions(mut self, dimensions: u32) -> Self {
		self.dimensions = dimensions;
		self
	}

	/// Limits how many bits of each plaintext coefficient the string
	/// encoder uses. Lower values leave headroom so encoded items survive
	/// multiplication by the selection vector without wraparound.
	pub fn set_bits_per_coeff(mut self, bits_per_coeff: u32) -> Self {
		self.bits_per_coeff = bits_per_coeff;
		self
	}

	/// Selects the dot-product variant: `true` multiplies intermediate
	/// ciphertexts together (requires relinearization keys), `false`
	/// decomposes them into plaintext digits between levels.
	pub fn set_use_ciphertext_multiplication(mut self, enabled: bool) -> Self {
		self.use_ciphertext_multiplication = enabled;
		self
	}

	/// Sets the encryption parameters.
	pub fn set_encryption_parameters(mut self, params: EncryptionParameters) -> Self {
		self.encryption_parameters = Some(params);
		self
	}

	/// Validates the configuration and returns the parameters.
	pub fn build(self) -> Result<PirParameters> {
		let num_items = self
			.num_items
			.filter(|&n| n > 0)
			.ok_or_else(|| Error::invalid_argument("number of items must be positive"))?;
		if self.dimensions == 0 {
			return Err(Error::invalid_argument("dimension count must be positive"));
		}
		let encryption_parameters = match self.encryption_parameters {
			Some(p) => p,
			None => default_encryption_params()?,
		};

		let plain_capacity = encryption_parameters.get_plain_modulus().bit_count() - 1;
		if self.bits_per_coeff > plain_capacity {
			return Err(Error::invalid_argument(format!(
				"bits per coefficient {} exceeds plain modulus capacity {}",
				self.bits_per_coeff, plain_capacity
			)));
		}

		let mut params = PirParameters {
			num_items,
			bytes_per_item: self.bytes_per_item,
			dimensions: Vec::new(),
			bits_per_coeff: self.bits_per_coeff,
			use_ciphertext_multiplication: self.use_ciphertext_multiplication,
			encryption_parameters,
		};
		if self.bytes_per_item > 0 && params.items_per_plaintext() == 0 {
			return Err(Error::invalid_argument(format!(
				"items of {} bytes do not fit a single plaintext (capacity {})",
				self.bytes_per_item,
				params.max_bytes_per_plaintext()
			)));
		}
		params.dimensions = PirParameters::calculate_dimensions(params.num_pt(), self.dimensions);
		Ok(params)
	}
}

impl Default for PirParametersBuilder {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn dimensions_examples() {
		let cases: &[(u64, u32, &[u32])] = &[
			(100, 1, &[100]),
			(100, 2, &[10, 10]),
			(82, 2, &[10, 9]),
			(82, 3, &[5, 5, 4]),
			(975, 2, &[32, 31]),
			(1000, 3, &[10, 10, 10]),
			(1001, 3, &[11, 10, 10]),
			(1000001, 3, &[101, 100, 100]),
			(20000000, 2, &[4473, 4472]),
		];
		for &(db_size, d, expected) in cases {
			assert_eq!(
				PirParameters::calculate_dimensions(db_size, d),
				expected,
				"db_size = {}, d = {}",
				db_size,
				d
			);
		}
	}

	#[test]
	fn dimension_product_covers_database() {
		for db_size in [1u64, 2, 17, 100, 1001, 54321] {
			for d in 1..=4 {
				let dims = PirParameters::calculate_dimensions(db_size, d);
				let product: u64 = dims.iter().map(|&x| x as u64).product();
				assert!(product >= db_size, "dims {:?} for {}", dims, db_size);
			}
		}
	}

	#[test]
	fn default_item_packing() {
		// 20-bit plain modulus -> 19 usable bits per coefficient,
		// 4096 * 19 / 8 = 9728 bytes per plaintext.
		let params = PirParametersBuilder::new()
			.set_num_items(1026)
			.set_bytes_per_item(256)
			.build()
			.unwrap();
		assert_eq!(params.num_items(), 1026);
		assert_eq!(params.bytes_per_item(), 256);
		assert_eq!(params.max_bytes_per_plaintext(), 9728);
		assert_eq!(params.items_per_plaintext(), 38);
		assert_eq!(params.num_pt(), 27);
		assert_eq!(params.dimensions(), &[27]);
	}

	#[test]
	fn multi_dimensional_packing() {
		let params = PirParametersBuilder::new()
			.set_num_items(19011)
			.set_bytes_per_item(500)
			.set_dimensions(3)
			.build()
			.unwrap();
		assert_eq!(params.items_per_plaintext(), 19);
		assert_eq!(params.num_pt(), 1001);
		assert_eq!(params.dimensions(), &[11, 10, 10]);
	}

	#[test]
	fn bits_per_coeff_override() {
		let params = PirParametersBuilder::new()
			.set_num_items(77412)
			.set_bytes_per_item(777)
			.set_dimensions(2)
			.set_encryption_parameters(
				generate_encryption_params(DegreeType::D8192, 20).unwrap(),
			)
			.set_use_ciphertext_multiplication(true)
			.set_bits_per_coeff(12)
			.build()
			.unwrap();
		assert_eq!(params.effective_bits_per_coeff(), 12);
		assert_eq!(params.max_bytes_per_plaintext(), 12288);
		assert_eq!(params.items_per_plaintext(), 15);
		assert_eq!(params.num_pt(), 5161);
		assert_eq!(params.dimensions(), &[72, 72]);
		assert!(params.use_ciphertext_multiplication());
	}

	#[test]
	fn oversized_items_are_rejected() {
		let err = PirParametersBuilder::new()
			.set_num_items(10)
			.set_bytes_per_item(9729)
			.build()
			.unwrap_err();
		assert!(matches!(err, Error::InvalidArgument(_)));
	}

	#[test]
	fn item_offsets_walk_the_plaintext() {
		let params = PirParametersBuilder::new()
			.set_num_items(1200)
			.set_bytes_per_item(64)
			.set_bits_per_coeff(10)
			.build()
			.unwrap();
		// 4096 * 10 / 8 = 5120 bytes -> 80 items per plaintext.
		assert_eq!(params.items_per_plaintext(), 80);
		assert_eq!(params.item_offset(0), 0);
		assert_eq!(params.item_offset(79), 79 * 64);
		assert_eq!(params.item_offset(80), 0);
		assert_eq!(params.item_offset(81), 64);
	}

	#[test]
	fn fingerprint_tracks_parameters() {
		let a = PirParametersBuilder::new().set_num_items(100).build().unwrap();
		let b = PirParametersBuilder::new().set_num_items(100).build().unwrap();
		let c = PirParametersBuilder::new().set_num_items(101).build().unwrap();
		assert_eq!(a.fingerprint(), b.fingerprint());
		assert_ne!(a.fingerprint(), c.fingerprint());
	}

	#[test]
	fn parameters_serde_roundtrip() {
		let params = PirParametersBuilder::new()
			.set_num_items(1200)
			.set_bytes_per_item(64)
			.set_dimensions(2)
			.build()
			.unwrap();
		let json = serde_json::to_string(&params).unwrap();
		let restored: PirParameters = serde_json::from_str(&json).unwrap();
		assert_eq!(params, restored);
	}
}
