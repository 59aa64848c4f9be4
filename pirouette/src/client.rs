use num_bigint::BigUint;
use pirouette_bfv::{Ciphertext, Decryptor, Encryptor, KeyGenerator, Plaintext};
use tracing::debug;

use crate::context::PirContext;
use crate::database::PirDatabase;
use crate::encoder::{BigUintEncoder, StringEncoder};
use crate::error::{Error, Result};
use crate::payload::{Request, Response};
use crate::reencoder::CiphertextReencoder;
use crate::utils::{generate_galois_elts, invert_mod};

/// The querying side of the protocol: builds packed selection-vector
/// ciphertexts together with the key material the server needs, and
/// decodes replies.
pub struct PirClient {
	context: PirContext,
	keygen: KeyGenerator,
	encryptor: Encryptor,
	decryptor: Decryptor,
}

impl PirClient {
	/// Creates a client with a fresh key pair.
	pub fn new(params: &crate::params::PirParameters) -> Result<Self> {
		let context = PirContext::new(params)?;
		let keygen = KeyGenerator::new(context.he())?;
		let encryptor = Encryptor::with_public_key(context.he(), &keygen.create_public_key())?;
		let decryptor = Decryptor::new(context.he(), &keygen.secret_key())?;
		Ok(Self {
			context,
			keygen,
			encryptor,
			decryptor,
		})
	}

	/// The shared context.
	pub fn context(&self) -> &PirContext {
		&self.context
	}

	/// Builds a request for the given flat item indices: one packed query
	/// per index, plus the Galois keys for oblivious expansion and, for
	/// the ciphertext-multiplication variant, relinearization keys.
	pub fn create_request(&self, indices: &[usize]) -> Result<Request> {
		let mut queries = Vec::with_capacity(indices.len());
		for &index in indices {
			queries.push(self.create_query(index)?);
		}
		let galois_key = self
			.keygen
			.create_galois_keys(&generate_galois_elts(
				self.context.poly_modulus_degree() as u64
			))
			.map_err(|e| Error::internal(e.to_string()))?;
		let relin_key = if self.context.params().use_ciphertext_multiplication() {
			Some(
				self.keygen
					.create_relinearization_key()
					.map_err(|e| Error::internal(e.to_string()))?,
			)
		} else {
			None
		};
		debug!(queries = queries.len(), "created request");
		Ok(Request::new(
			queries,
			galois_key,
			relin_key,
			self.context.params(),
		))
	}

	/// Packs the selection vector for one desired index into
	/// `ceil(dim_sum / N)` ciphertexts. Every hot slot of packed
	/// ciphertext b holds `m_b^{-1} mod t`, where
	/// `m_b = next_power_of_two(slots_b)` is the scaling the server's
	/// expansion of that ciphertext will introduce.
	fn create_query(&self, index: usize) -> Result<Vec<Ciphertext>> {
		let params = self.context.params();
		if index as u64 >= params.num_items() {
			return Err(Error::invalid_argument(format!(
				"invalid index {}",
				index
			)));
		}
		let n = self.context.poly_modulus_degree();
		let plain_modulus = self.context.he().plain_modulus();
		let dims = params.dimensions();
		let dim_sum = params.dim_sum();

		// Hypercube coordinates of the plaintext holding the item.
		let pt_index = index as u64 / params.items_per_plaintext();
		let coords = PirDatabase::calculate_indices(dims, pt_index);

		// Hot slots in the concatenated selection vector, one per
		// dimension, offset by the running dimension sums.
		let mut hot_slots = Vec::with_capacity(dims.len());
		let mut offset = 0usize;
		for (coord, &dim) in coords.iter().zip(dims) {
			hot_slots.push(offset + *coord as usize);
			offset += dim as usize;
		}

		let num_cts = dim_sum.div_ceil(n);
		let mut query = Vec::with_capacity(num_cts);
		for b in 0..num_cts {
			let slots = n.min(dim_sum - b * n);
			let inverse = invert_mod((slots as u64).next_power_of_two(), &plain_modulus)?;
			let mut pt = Plaintext::with_coeff_count(n);
			for &slot in &hot_slots {
				if slot >= b * n && slot < b * n + slots {
					pt.set_coefficient(slot - b * n, inverse);
				}
			}
			query.push(self.encryptor.encrypt(&pt)?);
		}
		Ok(query)
	}

	/// Decrypts one reply down to the plaintext that holds the requested
	/// item. For the decomposition variant this runs the decode chain:
	/// decrypt all digits, recompose level by level, decrypting between
	/// levels.
	fn decode_reply(&self, reply: &[Ciphertext]) -> Result<Plaintext> {
		if reply.is_empty() {
			return Err(Error::invalid_argument("empty reply"));
		}
		let mut pts = reply
			.iter()
			.map(|ct| self.decryptor.decrypt(ct).map_err(Error::from))
			.collect::<Result<Vec<Plaintext>>>()?;

		let reencoder = CiphertextReencoder::new(&self.context);
		let chunk = 2 * reencoder.expansion_ratio();
		while pts.len() > 1 {
			if pts.len() % chunk != 0 {
				return Err(Error::invalid_argument(format!(
					"reply length {} is not a multiple of the digit fan-out {}",
					pts.len(),
					chunk
				)));
			}
			let mut next = Vec::with_capacity(pts.len() / chunk);
			for digits in pts.chunks(chunk) {
				let ct = reencoder.decode(digits, 2)?;
				next.push(self.decryptor.decrypt(&ct)?);
			}
			pts = next;
		}
		pts.pop()
			.ok_or_else(|| Error::internal("decode chain produced no plaintext"))
	}

	/// Decodes a response to a byte-mode request, slicing the requested
	/// item out of each decoded plaintext.
	pub fn process_response(
		&self,
		indices: &[usize],
		response: &Response,
	) -> Result<Vec<Vec<u8>>> {
		let params = self.context.params();
		if params.bytes_per_item() == 0 {
			return Err(Error::invalid_argument(
				"parameters are in integer mode; use process_response_integers",
			));
		}
		if response.replies().len() != indices.len() {
			return Err(Error::invalid_argument(format!(
				"expected {} replies, got {}",
				indices.len(),
				response.replies().len()
			)));
		}
		let encoder = StringEncoder::new(&self.context);
		let mut results = Vec::with_capacity(indices.len());
		for (&index, reply) in indices.iter().zip(response.replies()) {
			let pt = self.decode_reply(reply)?;
			let offset = params.item_offset(index as u64);
			results.push(encoder.decode_range(&pt, params.bytes_per_item() as usize, offset)?);
		}
		Ok(results)
	}

	/// Decodes a response to an integer-mode request.
	pub fn process_response_integers(&self, response: &Response) -> Result<Vec<u64>> {
		let encoder = BigUintEncoder::new(&self.context);
		response
			.replies()
			.iter()
			.map(|reply| {
				let pt = self.decode_reply(reply)?;
				encoder.decode_u64(&pt)
			})
			.collect()
	}

	/// Decodes a response to an integer-mode request without the 64-bit
	/// restriction.
	pub fn process_response_biguints(&self, response: &Response) -> Result<Vec<BigUint>> {
		let encoder = BigUintEncoder::new(&self.context);
		response
			.replies()
			.iter()
			.map(|reply| Ok(encoder.decode(&self.decode_reply(reply)?)))
			.collect()
	}

	#[cfg(test)]
	pub(crate) fn decryptor(&self) -> &Decryptor {
		&self.decryptor
	}

	#[cfg(test)]
	pub(crate) fn encryptor(&self) -> &Encryptor {
		&self.encryptor
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::params::PirParametersBuilder;

	fn client(num_items: u64, dimensions: u32) -> PirClient {
		let params = PirParametersBuilder::new()
			.set_num_items(num_items)
			.set_dimensions(dimensions)
			.build()
			.unwrap();
		PirClient::new(&params).unwrap()
	}

	fn decrypt_query(client: &PirClient, query: &[Ciphertext]) -> Vec<Plaintext> {
		query
			.iter()
			.map(|ct| client.decryptor().decrypt(ct).unwrap())
			.collect()
	}

	fn assert_hot_slot(pt: &Plaintext, slot: usize, m: u64, t: u64) {
		assert_eq!(
			(pt.get_coefficient(slot) * m) % t,
			1,
			"slot {} should hold {}^-1",
			slot,
			m
		);
	}

	fn assert_zero_except(pt: &Plaintext, hot: &[usize]) {
		for i in 0..pt.coeff_count() {
			if !hot.contains(&i) {
				assert_eq!(pt.get_coefficient(i), 0, "slot {}", i);
			}
		}
	}

	#[test]
	fn one_dimensional_query_packs_one_hot_slot() {
		let c = client(100, 1);
		let t = c.context().he().plain_modulus().value();
		let request = c.create_request(&[5]).unwrap();
		assert_eq!(request.queries().len(), 1);
		let query = &request.queries()[0];
		assert_eq!(query.len(), 1);

		let pt = &decrypt_query(&c, query)[0];
		// 100 slots expand with m = 128.
		assert_hot_slot(pt, 5, 128, t);
		assert_zero_except(pt, &[5]);
	}

	#[test]
	fn two_dimensional_query_packs_both_coordinates() {
		let c = client(84, 2);
		let t = c.context().he().plain_modulus().value();
		assert_eq!(c.context().params().dimensions(), &[10, 9]);
		let request = c.create_request(&[42]).unwrap();
		assert!(request.relin_key().is_none());

		let pt = &decrypt_query(&c, &request.queries()[0])[0];
		// 42 -> row 4, column 6; 19 total slots expand with m = 32.
		assert_hot_slot(pt, 4, 32, t);
		assert_hot_slot(pt, 10 + 6, 32, t);
		assert_zero_except(pt, &[4, 16]);
	}

	#[test]
	fn three_dimensional_query_packs_all_coordinates() {
		let c = client(82, 3);
		let t = c.context().he().plain_modulus().value();
		assert_eq!(c.context().params().dimensions(), &[5, 5, 4]);
		let request = c.create_request(&[42]).unwrap();

		let pt = &decrypt_query(&c, &request.queries()[0])[0];
		// 42 -> (2, 0, 2); 14 total slots expand with m = 16.
		assert_hot_slot(pt, 2, 16, t);
		assert_hot_slot(pt, 5, 16, t);
		assert_hot_slot(pt, 10 + 2, 16, t);
		assert_zero_except(pt, &[2, 5, 12]);
	}

	#[test]
	fn queries_spanning_multiple_ciphertexts() {
		// 20M items over two dimensions: 8945 slots, three ciphertexts.
		let c = client(20_000_000, 2);
		let t = c.context().he().plain_modulus().value();
		assert_eq!(c.context().params().dimensions(), &[4473, 4472]);

		let request = c.create_request(&[12_345_679]).unwrap();
		let query = &request.queries()[0];
		assert_eq!(query.len(), 3);
		let pts = decrypt_query(&c, query);

		// 12345679 -> row 2760, column 2959. The column slot
		// 4473 + 2959 = 7432 lands in the second ciphertext.
		assert_hot_slot(&pts[0], 2760, 4096, t);
		assert_zero_except(&pts[0], &[2760]);
		assert_hot_slot(&pts[1], 2959 + 4473 - 4096, 4096, t);
		assert_zero_except(&pts[1], &[2959 + 4473 - 4096]);
		assert_zero_except(&pts[2], &[]);
	}

	#[test]
	fn trailing_partial_ciphertext_uses_its_own_scale() {
		let c = client(20_000_000, 2);
		let t = c.context().he().plain_modulus().value();

		let request = c.create_request(&[12_346_679]).unwrap();
		let pts = decrypt_query(&c, &request.queries()[0]);

		// 12346679 -> row 2760, column 3959. The column slot lands in the
		// third ciphertext, which covers 8945 - 8192 = 753 slots and
		// expands with m = 1024.
		assert_hot_slot(&pts[0], 2760, 4096, t);
		assert_zero_except(&pts[0], &[2760]);
		assert_zero_except(&pts[1], &[]);
		assert_hot_slot(&pts[2], 3959 + 4473 - 2 * 4096, 1024, t);
		assert_zero_except(&pts[2], &[3959 + 4473 - 2 * 4096]);
	}

	#[test]
	fn one_dimensional_query_spanning_multiple_ciphertexts() {
		let c = client(10_000, 1);
		let t = c.context().he().plain_modulus().value();
		for (index, ct_index, m) in [
			(0usize, 0usize, 4096u64),
			(4095, 0, 4096),
			(4096, 1, 4096),
			(8191, 1, 4096),
			(8192, 2, 2048),
			(9999, 2, 2048),
		] {
			let request = c.create_request(&[index]).unwrap();
			let pts = decrypt_query(&c, &request.queries()[0]);
			assert_eq!(pts.len(), 3);
			for (b, pt) in pts.iter().enumerate() {
				if b == ct_index {
					let slot = index - b * 4096;
					assert_hot_slot(pt, slot, m, t);
					assert_zero_except(pt, &[slot]);
				} else {
					assert_zero_except(pt, &[]);
				}
			}
		}
	}

	#[test]
	fn batched_requests_create_one_query_each() {
		let c = client(10_000, 1);
		let request = c.create_request(&[0, 5005, 8191]).unwrap();
		assert_eq!(request.queries().len(), 3);
	}

	#[test]
	fn invalid_index_is_rejected() {
		let c = client(100, 1);
		let err = c.create_request(&[101]).unwrap_err();
		assert!(matches!(err, Error::InvalidArgument(_)));
		assert!(c.create_request(&[99]).is_ok());
	}

	#[test]
	fn relin_keys_follow_the_variant() {
		let params = PirParametersBuilder::new()
			.set_num_items(100)
			.set_dimensions(2)
			.set_use_ciphertext_multiplication(true)
			.build()
			.unwrap();
		let c = PirClient::new(&params).unwrap();
		let request = c.create_request(&[1]).unwrap();
		assert!(request.relin_key().is_some());
		assert_eq!(request.params_fingerprint(), params.fingerprint());
	}

	#[test]
	fn fake_response_roundtrip() {
		// A response assembled by hand decodes without a server, both in
		// integer and byte mode.
		let params = PirParametersBuilder::new().set_num_items(10).build().unwrap();
		let c = PirClient::new(&params).unwrap();
		let encoder = BigUintEncoder::new(c.context());
		let values = [987_654_321u64, 1234, 2345];
		let replies: Vec<Vec<Ciphertext>> = values
			.iter()
			.map(|&v| vec![c.encryptor().encrypt(&encoder.encode_u64(v).unwrap()).unwrap()])
			.collect();
		let response = Response::new(replies);
		let decoded = c.process_response_integers(&response).unwrap();
		assert_eq!(decoded, values);
	}

	#[test]
	fn query_index_targets_the_containing_plaintext() {
		// 1200 64-byte items pack 152 per plaintext under default bits
		// per coefficient... with 19 bits: 9728 / 64 = 152; item 777 lives
		// in plaintext 5.
		let params = PirParametersBuilder::new()
			.set_num_items(1200)
			.set_bytes_per_item(64)
			.build()
			.unwrap();
		let c = PirClient::new(&params).unwrap();
		assert_eq!(c.context().params().dimensions(), &[8]);
		let request = c.create_request(&[777]).unwrap();
		let pt = &decrypt_query(&c, &request.queries()[0])[0];
		let t = c.context().he().plain_modulus().value();
		assert_hot_slot(pt, 5, 8, t);
		assert_zero_except(pt, &[5]);
	}

	#[test]
	fn response_mode_must_match_parameters() {
		let params = PirParametersBuilder::new().set_num_items(10).build().unwrap();
		let c = PirClient::new(&params).unwrap();
		let response = Response::new(vec![]);
		assert!(matches!(
			c.process_response(&[], &response).unwrap_err(),
			Error::InvalidArgument(_)
		));
	}
}
