use pirouette_bfv::Plaintext;

use crate::context::PirContext;
use crate::error::{Error, Result};

/// Packs byte strings into plaintext coefficients, `bits_per_coeff` bits at
/// a time, streaming most-significant bit first. A coefficient is filled
/// completely before the next one is started; the final partial
/// coefficient is left-shifted to occupy its full width.
///
/// The bit width is configurable (through the PIR parameters) so that a
/// coefficient still fits under the plain modulus after multiplication by
/// an indicator ciphertext.
pub struct StringEncoder {
	poly_modulus_degree: usize,
	bits_per_coeff: u32,
}

impl StringEncoder {
	/// Creates an encoder using the context's polynomial degree and
	/// effective bits-per-coefficient.
	pub fn new(context: &PirContext) -> Self {
		Self {
			poly_modulus_degree: context.poly_modulus_degree(),
			bits_per_coeff: context.params().effective_bits_per_coeff(),
		}
	}

	/// Returns the number of bits packed into one coefficient.
	pub fn bits_per_coeff(&self) -> u32 {
		self.bits_per_coeff
	}

	/// Capacity of one plaintext in whole bytes.
	pub fn max_bytes_per_plaintext(&self) -> usize {
		self.poly_modulus_degree * self.bits_per_coeff as usize / 8
	}

	/// Number of items of `item_size` bytes that fit in one plaintext, or
	/// 0 when a single item does not fit.
	pub fn num_items_per_plaintext(&self, item_size: usize) -> usize {
		if item_size == 0 || item_size > self.max_bytes_per_plaintext() {
			0
		} else {
			self.max_bytes_per_plaintext() / item_size
		}
	}

	/// Encodes a byte string into a fresh plaintext.
	pub fn encode(&self, value: &[u8]) -> Result<Plaintext> {
		if value.len() > self.max_bytes_per_plaintext() {
			return Err(Error::invalid_argument(format!(
				"cannot encode {} bytes into a plaintext of capacity {}",
				value.len(),
				self.max_bytes_per_plaintext()
			)));
		}
		let bpc = self.bits_per_coeff;
		let num_coeff = (value.len() * 8).div_ceil(bpc as usize);
		let mut data = vec![0u64; num_coeff];
		let mut index = 0;
		let mut coeff_bits = bpc;
		for &byte in value {
			let mut c = byte as u16;
			let mut remain = 8u32;
			while remain > 0 {
				let n = coeff_bits.min(remain);
				data[index] = (data[index] << n) | (c >> (8 - n)) as u64;
				c = (c << n) & 0xFF;
				coeff_bits -= n;
				remain -= n;
				if coeff_bits == 0 {
					index += 1;
					coeff_bits = bpc;
				}
			}
		}
		// Left-align the bits of a trailing partial coefficient.
		if coeff_bits < bpc {
			data[index] <<= coeff_bits;
		}
		Ok(Plaintext::from_coefficients(data))
	}

	/// Encodes a sequence of items back to back into one plaintext. Fails
	/// when the concatenation exceeds the plaintext capacity.
	pub fn encode_items<I, T>(&self, items: I) -> Result<Plaintext>
	where
		I: IntoIterator<Item = T>,
		T: AsRef<[u8]>,
	{
		let mut buffer = Vec::new();
		for item in items {
			buffer.extend_from_slice(item.as_ref());
			if buffer.len() > self.max_bytes_per_plaintext() {
				return Err(Error::invalid_argument(format!(
					"items exceed the plaintext capacity of {} bytes",
					self.max_bytes_per_plaintext()
				)));
			}
		}
		self.encode(&buffer)
	}

	/// Decodes every whole byte covered by the significant coefficients.
	pub fn decode(&self, plaintext: &Plaintext) -> Vec<u8> {
		let num_bytes =
			plaintext.significant_coeff_count() * self.bits_per_coeff as usize / 8;
		self.extract(plaintext, num_bytes)
	}

	/// Extracts `length` bytes starting `offset` bytes into the packed
	/// stream. Fails when the range does not fit the plaintext capacity.
	pub fn decode_range(
		&self,
		plaintext: &Plaintext,
		length: usize,
		offset: usize,
	) -> Result<Vec<u8>> {
		if offset + length > self.max_bytes_per_plaintext() {
			return Err(Error::invalid_argument(format!(
				"range {}..{} exceeds the plaintext capacity of {} bytes",
				offset,
				offset + length,
				self.max_bytes_per_plaintext()
			)));
		}
		let mut bytes = self.extract(plaintext, offset + length);
		Ok(bytes.split_off(offset))
	}

	fn extract(&self, plaintext: &Plaintext, total_bytes: usize) -> Vec<u8> {
		let bpc = self.bits_per_coeff;
		let mask = (1u128 << bpc) - 1;
		let mut out = Vec::with_capacity(total_bytes);
		let mut acc: u128 = 0;
		let mut acc_bits = 0u32;
		let mut index = 0;
		while out.len() < total_bytes {
			if acc_bits < 8 {
				let coeff = if index < plaintext.coeff_count() {
					plaintext.get_coefficient(index) as u128 & mask
				} else {
					0
				};
				index += 1;
				acc = (acc << bpc) | coeff;
				acc_bits += bpc;
			} else {
				out.push((acc >> (acc_bits - 8)) as u8);
				acc_bits -= 8;
				acc &= (1u128 << acc_bits) - 1;
			}
		}
		out
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::params::PirParametersBuilder;

	fn encoder() -> StringEncoder {
		let params = PirParametersBuilder::new().set_num_items(10).build().unwrap();
		StringEncoder::new(&PirContext::new(&params).unwrap())
	}

	fn pseudo_random_bytes(len: usize, seed: u64) -> Vec<u8> {
		// xorshift; enough for reproducible test payloads.
		let mut state = seed.max(1);
		(0..len)
			.map(|_| {
				state ^= state << 13;
				state ^= state >> 7;
				state ^= state << 17;
				state as u8
			})
			.collect()
	}

	#[test]
	fn capacities_for_default_parameters() {
		// N = 4096 and a 20-bit plain modulus give 19 usable bits.
		let enc = encoder();
		assert_eq!(enc.bits_per_coeff(), 19);
		assert_eq!(enc.max_bytes_per_plaintext(), 9728);
		assert_eq!(enc.num_items_per_plaintext(1), 9728);
		assert_eq!(enc.num_items_per_plaintext(9728), 1);
		assert_eq!(enc.num_items_per_plaintext(9729), 0);
		assert_eq!(enc.num_items_per_plaintext(99999), 0);
		assert_eq!(enc.num_items_per_plaintext(64), 152);
		assert_eq!(enc.num_items_per_plaintext(288), 33);
	}

	#[test]
	fn capacity_follows_bits_per_coeff() {
		let params = PirParametersBuilder::new()
			.set_num_items(10)
			.set_encryption_parameters(
				crate::params::generate_encryption_params(
					pirouette_bfv::DegreeType::D4096,
					16,
				)
				.unwrap(),
			)
			.build()
			.unwrap();
		let enc = StringEncoder::new(&PirContext::new(&params).unwrap());
		assert_eq!(enc.max_bytes_per_plaintext(), 7680);
	}

	#[test]
	fn encode_decode_roundtrip() {
		let enc = encoder();
		let value = b"This is a string test for random VALUES@!#";
		let pt = enc.encode(value).unwrap();
		assert_eq!(pt.coeff_count(), (value.len() * 8).div_ceil(19));
		let result = enc.decode(&pt);
		assert!(result.len() >= value.len());
		assert_eq!(&result[..value.len()], value);
		assert!(result[value.len()..].iter().all(|&b| b == 0));
	}

	#[test]
	fn full_capacity_roundtrip() {
		let enc = encoder();
		let value = pseudo_random_bytes(9728, 42);
		let pt = enc.encode(&value).unwrap();
		let result = enc.decode(&pt);
		assert_eq!(&result[..value.len()], &value[..]);
	}

	#[test]
	fn packed_items_decode_by_offset() {
		let enc = encoder();
		let items: Vec<Vec<u8>> = (0..152).map(|i| pseudo_random_bytes(64, i + 1)).collect();
		let pt = enc.encode_items(&items).unwrap();
		let mut offset = 0;
		for item in &items {
			let decoded = enc.decode_range(&pt, item.len(), offset).unwrap();
			assert_eq!(&decoded, item);
			offset += item.len();
		}
	}

	#[test]
	fn oversized_values_are_rejected() {
		let enc = encoder();
		assert!(enc.encode(&pseudo_random_bytes(9729, 7)).is_err());
		let items: Vec<Vec<u8>> = (0..141).map(|i| pseudo_random_bytes(69, i + 1)).collect();
		assert!(enc.encode_items(&items).is_err());
	}

	#[test]
	fn out_of_range_decode_is_rejected() {
		let enc = encoder();
		let pt = enc.encode(&pseudo_random_bytes(9728, 3)).unwrap();
		assert!(enc.decode_range(&pt, 100, 9629).is_err());
		assert!(enc.decode_range(&pt, 100, 9628).is_ok());
	}
}
