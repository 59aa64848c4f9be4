use pirouette_bfv::{BFVEvaluator, Ciphertext, Decryptor, Plaintext, RelinearizationKey};
use tracing::debug;

use crate::context::PirContext;
use crate::encoder::{BigUintEncoder, StringEncoder};
use crate::error::{Error, Result};
use crate::reencoder::CiphertextReencoder;

/// The server-held database: the hypercube of encoded plaintexts and the
/// recursive dot product against an encrypted selection vector.
///
/// The plaintexts are populated once at construction and read-only
/// afterwards. When the parameters select the ciphertext-decomposition
/// variant, every entry is pre-transformed into NTT form so the inner dot
/// products are pointwise; with ciphertext multiplication the entries stay
/// in coefficient form.
pub struct PirDatabase {
	context: PirContext,
	db: Vec<Plaintext>,
}

impl PirDatabase {
	/// Builds an integer-mode database: one integer per plaintext, packed
	/// in base t. The parameters must have `bytes_per_item == 0` and the
	/// value count must match `num_items`.
	pub fn from_integers(context: &PirContext, values: &[u64]) -> Result<Self> {
		let params = context.params();
		if params.bytes_per_item() != 0 {
			return Err(Error::invalid_argument(
				"parameters expect byte items, not integers",
			));
		}
		if values.len() as u64 != params.num_items() {
			return Err(Error::invalid_argument(format!(
				"database size {} does not match params value {}",
				values.len(),
				params.num_items()
			)));
		}
		let encoder = BigUintEncoder::new(context);
		let mut db = Vec::with_capacity(values.len());
		for &value in values {
			db.push(encoder.encode_u64(value)?);
		}
		Self::finish(context, db)
	}

	/// Builds a string-mode database, packing `items_per_plaintext` items
	/// into each plaintext. Every item must be exactly `bytes_per_item`
	/// bytes and the item count must match `num_items`.
	pub fn from_items<T: AsRef<[u8]>>(context: &PirContext, items: &[T]) -> Result<Self> {
		let params = context.params();
		if params.bytes_per_item() == 0 {
			return Err(Error::invalid_argument(
				"parameters expect integers, not byte items",
			));
		}
		if items.len() as u64 != params.num_items() {
			return Err(Error::invalid_argument(format!(
				"database size {} does not match params value {}",
				items.len(),
				params.num_items()
			)));
		}
		for item in items {
			if item.as_ref().len() != params.bytes_per_item() as usize {
				return Err(Error::invalid_argument(format!(
					"item size {} does not match params value {}",
					item.as_ref().len(),
					params.bytes_per_item()
				)));
			}
		}
		let encoder = StringEncoder::new(context);
		let items_per_pt = params.items_per_plaintext() as usize;
		let mut db = Vec::with_capacity(params.num_pt() as usize);
		for chunk in items.chunks(items_per_pt) {
			db.push(encoder.encode_items(chunk)?);
		}
		Self::finish(context, db)
	}

	fn finish(context: &PirContext, mut db: Vec<Plaintext>) -> Result<Self> {
		if !context.params().use_ciphertext_multiplication() {
			let evaluator = context.evaluator();
			for pt in &mut db {
				evaluator.transform_plain_to_ntt_inplace(pt)?;
			}
		}
		Ok(Self {
			context: context.clone(),
			db,
		})
	}

	/// The shared context this database was built under.
	pub fn context(&self) -> &PirContext {
		&self.context
	}

	/// Number of plaintexts in the hypercube.
	pub fn size(&self) -> usize {
		self.db.len()
	}

	/// Multiplies the database hypercube with a selection vector of
	/// `dim_sum` ciphertexts, partitioned by dimension. Returns one
	/// ciphertext for the ciphertext-multiplication variant, or the full
	/// digit fan-out for the decomposition variant.
	///
	/// `relin_key` is applied after every ciphertext-ciphertext
	/// multiplication when present. When `decryptor` is present the
	/// remaining noise budget is logged after each step.
	pub fn multiply(
		&self,
		selection_vector: &[Ciphertext],
		relin_key: Option<&RelinearizationKey>,
		decryptor: Option<&Decryptor>,
	) -> Result<Vec<Ciphertext>> {
		let params = self.context.params();
		if selection_vector.len() != params.dim_sum() {
			return Err(Error::invalid_argument(format!(
				"selection vector size {} does not match dimensions sum {}",
				selection_vector.len(),
				params.dim_sum()
			)));
		}

		let strategy = if params.use_ciphertext_multiplication() {
			DotProduct::CiphertextMul
		} else {
			DotProduct::PlaintextDigit(CiphertextReencoder::new(&self.context))
		};

		// The decomposition variant multiplies digit plaintexts in the
		// NTT domain, so the selection vector moves there once up front.
		let mut selection = selection_vector.to_vec();
		if !params.use_ciphertext_multiplication() {
			for ct in &mut selection {
				self.context.evaluator().transform_to_ntt_inplace(ct)?;
			}
		}

		let mut multiplier = DatabaseMultiplier {
			db: &self.db,
			evaluator: self.context.evaluator(),
			strategy,
			relin_key,
			decryptor,
			selection: &selection,
			cursor: 0,
		};
		let dimensions = params.dimensions().to_vec();
		multiplier.multiply(&dimensions, 0, 0)
	}

	/// Helper function to calculate indices within the multi-dimensional
	/// representation of the database for a given index in the flat
	/// representation.
	pub fn calculate_indices(dims: &[u32], index: u64) -> Vec<u32> {
		let mut results = vec![0u32; dims.len()];
		let mut remaining = index;
		for (i, &dim) in dims.iter().enumerate().rev() {
			results[i] = (remaining % dim as u64) as u32;
			remaining /= dim as u64;
		}
		results
	}
}

/// Which flavor of inner product the recursion uses above the leaf level.
enum DotProduct {
	/// Multiply intermediate ciphertexts by the selection vector directly.
	CiphertextMul,
	/// Decompose intermediates into plaintext digits first, trading an
	/// E-fold fan-out for plain multiplications only.
	PlaintextDigit(CiphertextReencoder),
}

/// Encapsulates the state of one recursive multiplication: the dimensions
/// still to fold, the selection vector, and the cursor walking the
/// database in row-major hypercube order. The cursor lives here (not on
/// the database) because lower recursion levels advance it for their
/// callers.
struct DatabaseMultiplier<'a> {
	db: &'a [Plaintext],
	evaluator: &'a BFVEvaluator,
	strategy: DotProduct,
	relin_key: Option<&'a RelinearizationKey>,
	decryptor: Option<&'a Decryptor>,
	selection: &'a [Ciphertext],
	cursor: usize,
}

impl DatabaseMultiplier<'_> {
	fn log_noise(&self, depth: usize, stage: &str, ct: &Ciphertext) {
		if let Some(decryptor) = self.decryptor {
			if let Ok(budget) = decryptor.invariant_noise_budget(ct) {
				debug!(depth, stage, noise_budget = budget, "dot product step");
			}
		}
	}

	/// One level of the dot product. The leaf dimension multiplies
	/// selection ciphertexts against database plaintexts; upper levels
	/// recurse, then fold the inner results with their own slice of the
	/// selection vector.
	fn multiply(
		&mut self,
		dims: &[u32],
		sv_offset: usize,
		depth: usize,
	) -> Result<Vec<Ciphertext>> {
		let this_dim = dims[0] as usize;
		let rest = &dims[1..];

		let mut result: Vec<Ciphertext> = Vec::new();
		for i in 0..this_dim {
			// The last hypercube row may be ragged; unused selection
			// slots are guaranteed zero by the query packing.
			if self.cursor >= self.db.len() {
				break;
			}
			let temp = if rest.is_empty() {
				let ct = self
					.evaluator
					.multiply_plain(&self.selection[sv_offset + i], &self.db[self.cursor])?;
				self.cursor += 1;
				self.log_noise(depth, "leaf", &ct);
				vec![ct]
			} else {
				let inner = self.multiply(rest, sv_offset + this_dim, depth + 1)?;
				match &self.strategy {
					DotProduct::CiphertextMul => {
						let inner = inner
							.first()
							.ok_or_else(|| Error::internal("empty inner result"))?;
						let mut ct = self
							.evaluator
							.multiply(inner, &self.selection[sv_offset + i])?;
						if let Some(relin_key) = self.relin_key {
							self.evaluator.relinearize_inplace(&mut ct, relin_key)?;
						}
						self.log_noise(depth, "multiply", &ct);
						vec![ct]
					}
					DotProduct::PlaintextDigit(reencoder) => {
						let mut out =
							Vec::with_capacity(inner.len() * 2 * reencoder.expansion_ratio());
						for ct in &inner {
							for mut digit in reencoder.encode(ct)? {
								self.evaluator.transform_plain_to_ntt_inplace(&mut digit)?;
								out.push(self.evaluator.multiply_plain(
									&self.selection[sv_offset + i],
									&digit,
								)?);
							}
						}
						out
					}
				}
			};

			if result.is_empty() {
				result = temp;
			} else {
				if result.len() != temp.len() {
					return Err(Error::internal("inner result size mismatch"));
				}
				for (acc, ct) in result.iter_mut().zip(&temp) {
					self.evaluator.add_inplace(acc, ct)?;
				}
			}
		}

		for ct in &mut result {
			if ct.is_ntt_form() {
				self.evaluator.transform_from_ntt_inplace(ct)?;
			}
		}
		if let Some(first) = result.first() {
			self.log_noise(depth, "level done", first);
		}
		Ok(result)
	}
}

#[cfg(test)]
mod tests {
	use pirouette_bfv::{Encryptor, KeyGenerator};

	use super::*;
	use crate::params::{generate_encryption_params, PirParameters, PirParametersBuilder};

	#[test]
	fn indices_examples() {
		let cases: &[(u64, u32, u64, &[u32])] = &[
			(100, 1, 42, &[42]),
			(100, 1, 7, &[7]),
			(84, 2, 7, &[0, 7]),
			(87, 2, 27, &[3, 0]),
			(87, 2, 42, &[4, 6]),
			(87, 2, 86, &[9, 5]),
			(82, 3, 3, &[0, 0, 3]),
			(82, 3, 20, &[1, 0, 0]),
			(82, 3, 75, &[3, 3, 3]),
			(82, 3, 42, &[2, 0, 2]),
		];
		for &(num_items, d, index, expected) in cases {
			let dims = PirParameters::calculate_dimensions(num_items, d);
			assert_eq!(
				PirDatabase::calculate_indices(&dims, index),
				expected,
				"num_items = {}, d = {}, index = {}",
				num_items,
				d,
				index
			);
		}
	}

	#[test]
	fn indices_recompose_to_flat_index() {
		for (num_items, d) in [(100u64, 2u32), (82, 3), (1001, 3), (222, 4)] {
			let dims = PirParameters::calculate_dimensions(num_items, d);
			for index in [0, 1, num_items / 2, num_items - 1] {
				let indices = PirDatabase::calculate_indices(&dims, index);
				let mut recomposed = 0u64;
				for (i, &coord) in indices.iter().enumerate() {
					let stride: u64 = dims[i + 1..].iter().map(|&x| x as u64).product();
					recomposed += coord as u64 * stride;
				}
				assert_eq!(recomposed, index, "dims = {:?}", dims);
			}
		}
	}

	struct Fixture {
		context: PirContext,
		db: PirDatabase,
		values: Vec<u64>,
		encryptor: Encryptor,
		decryptor: Decryptor,
		relin_key: Option<RelinearizationKey>,
	}

	fn fixture(params: PirParameters, with_relin: bool) -> Fixture {
		let context = PirContext::new(&params).unwrap();
		let values: Vec<u64> = (0..params.num_items()).map(|n| 4 * (n + 1) + 2600).collect();
		let db = PirDatabase::from_integers(&context, &values).unwrap();
		let gen = KeyGenerator::new(context.he()).unwrap();
		let encryptor = Encryptor::with_public_key(context.he(), &gen.create_public_key()).unwrap();
		let decryptor = Decryptor::new(context.he(), &gen.secret_key()).unwrap();
		let relin_key = with_relin.then(|| gen.create_relinearization_key().unwrap());
		Fixture {
			context,
			db,
			values,
			encryptor,
			decryptor,
			relin_key,
		}
	}

	/// Encrypts the plain selection vector targeting `index`.
	fn indicator_vector(f: &Fixture, index: u64) -> Vec<Ciphertext> {
		let params = f.context.params();
		let dims = params.dimensions().to_vec();
		let indices = PirDatabase::calculate_indices(&dims, index);
		let mut cts = Vec::new();
		for (d, &dim) in dims.iter().enumerate() {
			for i in 0..dim {
				if i == indices[d] {
					let mut pt = Plaintext::with_coeff_count(1);
					pt.set_coefficient(0, 1);
					cts.push(f.encryptor.encrypt(&pt).unwrap());
				} else {
					cts.push(f.encryptor.encrypt_zero().unwrap());
				}
			}
		}
		cts
	}

	/// Runs the digit decode chain on a multiply result, mirroring what
	/// the client does with a reply: variant A results hold a single
	/// ciphertext, variant B results regroup in chunks of 2E per level.
	fn decode_result(f: &Fixture, result: &[Ciphertext]) -> Plaintext {
		let reencoder = CiphertextReencoder::new(&f.context);
		let chunk = 2 * reencoder.expansion_ratio();
		let mut pts: Vec<Plaintext> = result
			.iter()
			.map(|ct| f.decryptor.decrypt(ct).unwrap())
			.collect();
		while pts.len() > 1 {
			assert_eq!(pts.len() % chunk, 0);
			pts = pts
				.chunks(chunk)
				.map(|digits| {
					let ct = reencoder.decode(digits, 2).unwrap();
					f.decryptor.decrypt(&ct).unwrap()
				})
				.collect();
		}
		pts.pop().unwrap()
	}

	fn run_multiply(f: &Fixture, index: u64) -> u64 {
		let sv = indicator_vector(f, index);
		let result = f
			.db
			.multiply(&sv, f.relin_key.as_ref(), Some(&f.decryptor))
			.unwrap();
		let pt = decode_result(f, &result);
		BigUintEncoder::new(&f.context).decode_u64(&pt).unwrap()
	}

	#[test]
	fn one_dimensional_multiply() {
		let params = PirParametersBuilder::new()
			.set_num_items(10)
			.set_use_ciphertext_multiplication(true)
			.build()
			.unwrap();
		let f = fixture(params, false);
		for index in [0, 7, 9] {
			assert_eq!(run_multiply(&f, index), f.values[index as usize]);
		}
	}

	#[test]
	fn two_dimensional_multiply() {
		for use_ct_mult in [true, false] {
			for num_items in [16u64, 82] {
				let plain_mod_bits = if use_ct_mult { 16 } else { 24 };
				let params = PirParametersBuilder::new()
					.set_num_items(num_items)
					.set_dimensions(2)
					.set_use_ciphertext_multiplication(use_ct_mult)
					.set_encryption_parameters(
						generate_encryption_params(
							pirouette_bfv::DegreeType::D4096,
							plain_mod_bits,
						)
						.unwrap(),
					)
					.build()
					.unwrap();
				let f = fixture(params, use_ct_mult);
				for index in [0, num_items / 2, num_items - 1] {
					assert_eq!(
						run_multiply(&f, index),
						f.values[index as usize],
						"use_ct_mult = {}, index = {}",
						use_ct_mult,
						index
					);
				}
			}
		}
	}

	#[test]
	fn three_dimensional_multiply() {
		let params = PirParametersBuilder::new()
			.set_num_items(82)
			.set_dimensions(3)
			.set_use_ciphertext_multiplication(true)
			.set_encryption_parameters(
				generate_encryption_params(pirouette_bfv::DegreeType::D8192, 16).unwrap(),
			)
			.build()
			.unwrap();
		let f = fixture(params, true);
		assert_eq!(f.context.params().dimensions(), &[5, 5, 4]);
		assert_eq!(run_multiply(&f, 42), f.values[42]);
	}

	#[test]
	fn selection_vector_size_is_checked() {
		let params = PirParametersBuilder::new()
			.set_num_items(100)
			.set_dimensions(2)
			.set_use_ciphertext_multiplication(true)
			.build()
			.unwrap();
		let f = fixture(params, false);
		let mut sv = indicator_vector(&f, 42);
		sv.pop();
		assert!(matches!(
			f.db.multiply(&sv, None, None).unwrap_err(),
			Error::InvalidArgument(_)
		));
		let mut sv = indicator_vector(&f, 42);
		sv.push(f.encryptor.encrypt_zero().unwrap());
		assert!(matches!(
			f.db.multiply(&sv, None, None).unwrap_err(),
			Error::InvalidArgument(_)
		));
	}

	#[test]
	fn database_size_must_match_params() {
		let params = PirParametersBuilder::new().set_num_items(10).build().unwrap();
		let context = PirContext::new(&params).unwrap();
		let values = vec![1u64; 9];
		assert!(PirDatabase::from_integers(&context, &values).is_err());
	}
}
