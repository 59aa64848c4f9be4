use crate::ciphertext::Ciphertext;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::key_generator::{GaloisKey, KeySwitchingKey, RelinearizationKey};
use crate::modulus::Modulus;
use crate::parameters::{EncryptionParameters, SchemeType};
use crate::plaintext::Plaintext;

/// A trait for converting objects into byte arrays.
pub trait ToBytes {
	/// Returns the object as a byte array.
	fn as_bytes(&self) -> Result<Vec<u8>>;
}

/// A trait for converting data from a byte slice under a given state
/// (usually a [`Context`], which is needed to validate the shape of the
/// loaded object).
pub trait FromBytes {
	/// State used to deserialize an object from bytes.
	type State;

	/// Deserialize an object from the given bytes using the given state.
	fn from_bytes(state: &Self::State, bytes: &[u8]) -> Result<Self>
	where
		Self: Sized;
}

fn malformed() -> Error {
	Error::SerializationError(Box::new("malformed input".to_string()))
}

struct ByteReader<'a> {
	data: &'a [u8],
	pos: usize,
}

impl<'a> ByteReader<'a> {
	fn new(data: &'a [u8]) -> Self {
		Self {
			data,
			pos: 0,
		}
	}

	fn read_u8(&mut self) -> Result<u8> {
		let b = *self.data.get(self.pos).ok_or_else(malformed)?;
		self.pos += 1;
		Ok(b)
	}

	fn read_u32(&mut self) -> Result<u32> {
		let end = self.pos.checked_add(4).ok_or_else(malformed)?;
		let bytes = self.data.get(self.pos..end).ok_or_else(malformed)?;
		self.pos = end;
		Ok(u32::from_le_bytes(bytes.try_into().expect("4 bytes")))
	}

	fn read_u64(&mut self) -> Result<u64> {
		let end = self.pos.checked_add(8).ok_or_else(malformed)?;
		let bytes = self.data.get(self.pos..end).ok_or_else(malformed)?;
		self.pos = end;
		Ok(u64::from_le_bytes(bytes.try_into().expect("8 bytes")))
	}

	fn read_words(&mut self, count: usize) -> Result<Vec<u64>> {
		if count > (self.data.len() - self.pos) / 8 {
			return Err(malformed());
		}
		let mut words = Vec::with_capacity(count);
		for _ in 0..count {
			words.push(self.read_u64()?);
		}
		Ok(words)
	}

	fn finish(&self) -> Result<()> {
		if self.pos == self.data.len() {
			Ok(())
		} else {
			Err(malformed())
		}
	}
}

fn write_words(out: &mut Vec<u8>, words: &[u64]) {
	out.extend_from_slice(&(words.len() as u64).to_le_bytes());
	for w in words {
		out.extend_from_slice(&w.to_le_bytes());
	}
}

fn read_slab(reader: &mut ByteReader<'_>, expected_len: usize) -> Result<Vec<u64>> {
	let len = reader.read_u64()? as usize;
	if len != expected_len {
		return Err(malformed());
	}
	reader.read_words(len)
}

impl ToBytes for Plaintext {
	fn as_bytes(&self) -> Result<Vec<u8>> {
		let mut out = Vec::with_capacity(9 + 8 * self.data.len());
		out.push(self.ntt_form as u8);
		write_words(&mut out, &self.data);
		Ok(out)
	}
}

impl FromBytes for Plaintext {
	type State = Context;

	fn from_bytes(context: &Context, bytes: &[u8]) -> Result<Self> {
		let inner = context.inner();
		let mut reader = ByteReader::new(bytes);
		let ntt_form = reader.read_u8()? != 0;
		let len = reader.read_u64()? as usize;
		if ntt_form && len != inner.data_slab_len() {
			return Err(malformed());
		}
		if !ntt_form && len > inner.n {
			return Err(malformed());
		}
		let data = reader.read_words(len)?;
		if !ntt_form && data.iter().any(|&c| c >= inner.plain.value()) {
			return Err(malformed());
		}
		reader.finish()?;
		Ok(Plaintext {
			data,
			ntt_form,
		})
	}
}

impl ToBytes for Ciphertext {
	fn as_bytes(&self) -> Result<Vec<u8>> {
		let mut out = Vec::new();
		out.push(self.ntt_form as u8);
		out.extend_from_slice(&(self.polys.len() as u64).to_le_bytes());
		for p in &self.polys {
			write_words(&mut out, p);
		}
		Ok(out)
	}
}

impl FromBytes for Ciphertext {
	type State = Context;

	fn from_bytes(context: &Context, bytes: &[u8]) -> Result<Self> {
		let inner = context.inner();
		let mut reader = ByteReader::new(bytes);
		let ntt_form = reader.read_u8()? != 0;
		let size = reader.read_u64()? as usize;
		if !(2..=3).contains(&size) {
			return Err(malformed());
		}
		let mut polys = Vec::with_capacity(size);
		for _ in 0..size {
			let slab = read_slab(&mut reader, inner.data_slab_len())?;
			for (i, m) in inner.data_moduli().iter().enumerate() {
				if slab[i * inner.n..(i + 1) * inner.n]
					.iter()
					.any(|&c| c >= m.value())
				{
					return Err(malformed());
				}
			}
			polys.push(slab);
		}
		reader.finish()?;
		Ok(Ciphertext {
			polys,
			ntt_form,
		})
	}
}

fn write_ksk(out: &mut Vec<u8>, ksk: &KeySwitchingKey) {
	out.extend_from_slice(&(ksk.k0.len() as u64).to_le_bytes());
	for (k0, k1) in ksk.k0.iter().zip(&ksk.k1) {
		write_words(out, k0);
		write_words(out, k1);
	}
}

fn read_ksk(reader: &mut ByteReader<'_>, context: &Context) -> Result<KeySwitchingKey> {
	let inner = context.inner();
	let pairs = reader.read_u64()? as usize;
	if pairs != inner.data_len {
		return Err(malformed());
	}
	let slab_len = inner.moduli.len() * inner.n;
	let mut k0 = Vec::with_capacity(pairs);
	let mut k1 = Vec::with_capacity(pairs);
	for _ in 0..pairs {
		k0.push(read_slab(reader, slab_len)?);
		k1.push(read_slab(reader, slab_len)?);
	}
	Ok(KeySwitchingKey {
		k0,
		k1,
	})
}

impl ToBytes for RelinearizationKey {
	fn as_bytes(&self) -> Result<Vec<u8>> {
		let mut out = Vec::new();
		write_ksk(&mut out, &self.ksk);
		Ok(out)
	}
}

impl FromBytes for RelinearizationKey {
	type State = Context;

	fn from_bytes(context: &Context, bytes: &[u8]) -> Result<Self> {
		let mut reader = ByteReader::new(bytes);
		let ksk = read_ksk(&mut reader, context)?;
		reader.finish()?;
		Ok(RelinearizationKey {
			ksk,
		})
	}
}

impl ToBytes for GaloisKey {
	fn as_bytes(&self) -> Result<Vec<u8>> {
		let mut out = Vec::new();
		out.extend_from_slice(&(self.keys.len() as u64).to_le_bytes());
		for (elt, ksk) in &self.keys {
			out.extend_from_slice(&elt.to_le_bytes());
			write_ksk(&mut out, ksk);
		}
		Ok(out)
	}
}

impl FromBytes for GaloisKey {
	type State = Context;

	fn from_bytes(context: &Context, bytes: &[u8]) -> Result<Self> {
		let mut reader = ByteReader::new(bytes);
		let count = reader.read_u64()? as usize;
		let mut keys = std::collections::BTreeMap::new();
		for _ in 0..count {
			let elt = reader.read_u32()?;
			if elt % 2 == 0 || elt as u64 >= 2 * context.poly_modulus_degree() as u64 {
				return Err(malformed());
			}
			keys.insert(elt, read_ksk(&mut reader, context)?);
		}
		reader.finish()?;
		Ok(GaloisKey {
			keys,
		})
	}
}

impl ToBytes for EncryptionParameters {
	fn as_bytes(&self) -> Result<Vec<u8>> {
		let mut out = Vec::new();
		out.push(self.get_scheme() as u8);
		out.extend_from_slice(&self.get_poly_modulus_degree().to_le_bytes());
		out.extend_from_slice(&self.get_plain_modulus().value().to_le_bytes());
		let moduli: Vec<u64> = self
			.get_coefficient_modulus()
			.iter()
			.map(|m| m.value())
			.collect();
		write_words(&mut out, &moduli);
		Ok(out)
	}
}

impl FromBytes for EncryptionParameters {
	type State = ();

	fn from_bytes(_state: &(), bytes: &[u8]) -> Result<Self> {
		let mut reader = ByteReader::new(bytes);
		let scheme = SchemeType::from_u8(reader.read_u8()?)?;
		let degree = reader.read_u64()?;
		let plain = reader.read_u64()?;
		let count = reader.read_u64()? as usize;
		if count == 0 || count > 64 {
			return Err(malformed());
		}
		let moduli = reader
			.read_words(count)?
			.into_iter()
			.map(Modulus::new)
			.collect::<Result<Vec<_>>>()?;
		reader.finish()?;
		debug_assert_eq!(scheme, SchemeType::Bfv);
		crate::parameters::BFVEncryptionParametersBuilder::new()
			.set_poly_modulus_degree(degree.try_into()?)
			.set_coefficient_modulus(moduli)
			.set_plain_modulus(Modulus::new(plain)?)
			.build()
	}
}

#[cfg(test)]
mod tests {
	use crate::*;

	fn context() -> Context {
		let params = BFVEncryptionParametersBuilder::new()
			.set_poly_modulus_degree(DegreeType::D4096)
			.set_coefficient_modulus(
				CoefficientModulusFactory::bfv_default(DegreeType::D4096).unwrap(),
			)
			.set_plain_modulus(PlainModulusFactory::batching(DegreeType::D4096, 20).unwrap())
			.build()
			.unwrap();
		Context::new(&params, SecurityLevel::TC128).unwrap()
	}

	#[test]
	fn plaintext_bytes_roundtrip() {
		let ctx = context();
		let pt = Plaintext::from_hex_string("7FFx^3 + 1x^1 + 3").unwrap();
		let bytes = pt.as_bytes().unwrap();
		let restored = Plaintext::from_bytes(&ctx, &bytes).unwrap();
		assert_eq!(pt, restored);
	}

	#[test]
	fn ciphertext_bytes_roundtrip() {
		let ctx = context();
		let gen = KeyGenerator::new(&ctx).unwrap();
		let encryptor = Encryptor::with_public_key(&ctx, &gen.create_public_key()).unwrap();
		let decryptor = Decryptor::new(&ctx, &gen.secret_key()).unwrap();

		let pt = Plaintext::from_hex_string("Ax^2 + 2").unwrap();
		let ct = encryptor.encrypt(&pt).unwrap();
		let bytes = ct.as_bytes().unwrap();
		let restored = Ciphertext::from_bytes(&ctx, &bytes).unwrap();
		assert_eq!(decryptor.decrypt(&restored).unwrap(), pt);
	}

	#[test]
	fn galois_key_bytes_roundtrip() {
		let ctx = context();
		let gen = KeyGenerator::new(&ctx).unwrap();
		let keys = gen.create_galois_keys(&[3, 5]).unwrap();
		let bytes = keys.as_bytes().unwrap();
		let restored = GaloisKey::from_bytes(&ctx, &bytes).unwrap();
		assert_eq!(keys, restored);
	}

	#[test]
	fn truncated_input_is_rejected() {
		let ctx = context();
		let pt = Plaintext::from_hex_string("1x^1").unwrap();
		let bytes = pt.as_bytes().unwrap();
		assert!(Plaintext::from_bytes(&ctx, &bytes[..bytes.len() - 1]).is_err());
	}
}
