use std::sync::Arc;

use num_bigint::BigUint;
use num_traits::ToPrimitive;

use crate::error::{Error, Result};
use crate::modulus::{generate_primes, Modulus};
use crate::ntt::NttTables;
use crate::parameters::{DegreeType, EncryptionParameters, SecurityLevel};
use crate::rns::RnsBase;

/// Performs sanity checks (validation) and pre-computations for a given set
/// of encryption parameters. While [`EncryptionParameters`] is a lightweight
/// record, `Context` is a heavyweight object: it validates the parameters
/// for correctness, builds the NTT tables for every prime in the chain, and
/// stores the RNS constants used by encryption, decryption, key-switching
/// and ciphertext multiplication.
///
/// When the coefficient modulus contains at least two primes, the last one
/// is reserved as the key-level "special" prime: ciphertext data lives
/// modulo the remaining primes only, and key-switching accumulates modulo
/// the full chain before rescaling by the special prime. With a single
/// prime, encryption and additive/plain-multiplicative operations work but
/// key generation for relinearization or Galois rotation fails.
///
/// The context is cheaply clonable and can be shared across threads.
#[derive(Clone)]
pub struct Context {
	inner: Arc<ContextInner>,
}

pub(crate) struct ContextInner {
	pub parms: EncryptionParameters,
	pub security_level: SecurityLevel,
	pub n: usize,
	/// All primes in the chain, key level last.
	pub moduli: Vec<Modulus>,
	/// Number of primes ciphertext data is represented in.
	pub data_len: usize,
	pub ntt: Vec<NttTables>,
	pub plain: Modulus,
	pub rns_data: RnsBase,
	/// floor(Q_data / t) reduced modulo each data prime.
	pub delta: Vec<u64>,
	pub ks: Option<KeySwitchSupport>,
	/// Auxiliary NTT basis wide enough to hold the exact integer tensor
	/// product of two ciphertext polynomials.
	pub aux_moduli: Vec<Modulus>,
	pub aux_ntt: Vec<NttTables>,
	pub rns_aux: RnsBase,
}

/// Constants for key-switching with a special prime P.
pub(crate) struct KeySwitchSupport {
	/// (P * g_i) mod q_j, where g_i is the i-th CRT basis element of the
	/// data modulus, for every prime q_j in the full chain.
	pub p_garner: Vec<Vec<u64>>,
	/// P^{-1} mod q_i for each data prime.
	pub p_inv: Vec<u64>,
	pub p_half: u64,
	pub p_value: u64,
}

impl Context {
	/// Creates a context and performs pre-computations on the given
	/// encryption parameters.
	///
	/// * `params` - The encryption parameters.
	/// * `security_level` - The security standard the total coefficient
	///   modulus width is checked against.
	pub fn new(params: &EncryptionParameters, security_level: SecurityLevel) -> Result<Self> {
		let degree = DegreeType::try_from(params.get_poly_modulus_degree())?;
		let n = params.get_poly_modulus_degree() as usize;
		let moduli = params.get_coefficient_modulus().to_vec();
		let plain = params.get_plain_modulus();

		let total_bits: u32 = moduli.iter().map(|m| m.bit_count()).sum();
		if total_bits > security_level.max_coeff_modulus_bits(degree) {
			return Err(Error::InsecureParameters);
		}
		for (i, m) in moduli.iter().enumerate() {
			if (m.value() - 1) % (2 * n as u64) != 0 {
				return Err(Error::InvalidArgument);
			}
			if m.value() <= plain.value() {
				return Err(Error::InvalidArgument);
			}
			for other in &moduli[i + 1..] {
				if m.value() == other.value() {
					return Err(Error::InvalidArgument);
				}
			}
		}

		let ntt = moduli
			.iter()
			.map(|m| NttTables::new(n, *m))
			.collect::<Result<Vec<_>>>()?;

		let data_len = if moduli.len() >= 2 {
			moduli.len() - 1
		} else {
			1
		};
		let rns_data = RnsBase::new(&moduli[..data_len])?;

		let delta_big = rns_data.modulus() / plain.value();
		let delta = rns_data.decompose(&delta_big);

		let ks = if moduli.len() >= 2 {
			Some(Self::build_key_switch_support(&moduli, data_len, &rns_data)?)
		} else {
			None
		};

		// The tensor product of two centered data-level polynomials has
		// coefficients bounded by N * (Q/2)^2; the auxiliary basis must
		// exceed twice that bound for exact CRT reconstruction.
		let data_bits: u32 = moduli[..data_len].iter().map(|m| m.bit_count()).sum();
		let need_bits = 2 * data_bits + n.trailing_zeros() + 2;
		let aux_count = ((need_bits + 60) / 61).max(2) as usize;
		let aux_moduli = generate_primes(61, 2 * n as u64, aux_count)?;
		let aux_ntt = aux_moduli
			.iter()
			.map(|m| NttTables::new(n, *m))
			.collect::<Result<Vec<_>>>()?;
		let rns_aux = RnsBase::new(&aux_moduli)?;

		Ok(Self {
			inner: Arc::new(ContextInner {
				parms: params.clone(),
				security_level,
				n,
				moduli,
				data_len,
				ntt,
				plain,
				rns_data,
				delta,
				ks,
				aux_moduli,
				aux_ntt,
				rns_aux,
			}),
		})
	}

	fn build_key_switch_support(
		moduli: &[Modulus],
		data_len: usize,
		rns_data: &RnsBase,
	) -> Result<KeySwitchSupport> {
		let special = moduli[moduli.len() - 1];
		let p = special.value();
		let mut p_garner = Vec::with_capacity(data_len);
		let mut p_inv = Vec::with_capacity(data_len);
		for i in 0..data_len {
			// g_i = (Q/q_i) * ((Q/q_i)^{-1} mod q_i), the CRT basis element.
			let punctured = rns_data.modulus() / rns_data.moduli()[i].value();
			let punctured_mod = (&punctured % rns_data.moduli()[i].value())
				.to_u64()
				.unwrap_or(0);
			let inv = rns_data.moduli()[i]
				.try_invert(punctured_mod)
				.ok_or(Error::InvalidArgument)?;
			let garner = punctured * inv;
			let scaled = garner * p;
			p_garner.push(
				moduli
					.iter()
					.map(|m| (&scaled % m.value()).to_u64().unwrap_or(0))
					.collect(),
			);
			p_inv.push(
				rns_data.moduli()[i]
					.try_invert(p % rns_data.moduli()[i].value())
					.ok_or(Error::InvalidArgument)?,
			);
		}
		Ok(KeySwitchSupport {
			p_garner,
			p_inv,
			p_half: p / 2,
			p_value: p,
		})
	}

	/// Returns the encryption parameters this context was built from.
	pub fn parameters(&self) -> &EncryptionParameters {
		&self.inner.parms
	}

	/// Returns the enforced security level.
	pub fn security_level(&self) -> SecurityLevel {
		self.inner.security_level
	}

	/// Returns the polynomial degree N.
	pub fn poly_modulus_degree(&self) -> usize {
		self.inner.n
	}

	/// Returns the plaintext modulus t.
	pub fn plain_modulus(&self) -> Modulus {
		self.inner.plain
	}

	/// Returns the primes ciphertext data is represented in. When the
	/// parameter chain reserves a key-level special prime, it is excluded.
	pub fn ciphertext_moduli(&self) -> &[Modulus] {
		&self.inner.moduli[..self.inner.data_len]
	}

	/// The product of the ciphertext moduli.
	pub fn ciphertext_modulus(&self) -> &BigUint {
		self.inner.rns_data.modulus()
	}

	/// Whether key-switching (relinearization, Galois rotation) is
	/// available under these parameters.
	pub fn supports_key_switching(&self) -> bool {
		self.inner.ks.is_some()
	}

	pub(crate) fn inner(&self) -> &ContextInner {
		&self.inner
	}
}

impl ContextInner {
	pub fn data_moduli(&self) -> &[Modulus] {
		&self.moduli[..self.data_len]
	}

	pub fn data_ntt(&self) -> &[NttTables] {
		&self.ntt[..self.data_len]
	}

	pub fn data_slab_len(&self) -> usize {
		self.data_len * self.n
	}
}

impl std::fmt::Debug for Context {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Context")
			.field("parms", &self.inner.parms)
			.field("data_len", &self.inner.data_len)
			.finish()
	}
}
