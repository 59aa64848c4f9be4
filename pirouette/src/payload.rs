use pirouette_bfv::{Ciphertext, GaloisKey, RelinearizationKey};

use crate::params::PirParameters;

/// The in-memory shape of a query payload: one packed query (a short list
/// of ciphertexts) per requested index, the Galois keys the server needs
/// for oblivious expansion, relinearization keys when the
/// ciphertext-multiplication variant is active, and a fingerprint of the
/// PIR parameters so the server can reject mismatched clients.
#[derive(Debug, Clone)]
pub struct Request {
	queries: Vec<Vec<Ciphertext>>,
	galois_key: GaloisKey,
	relin_key: Option<RelinearizationKey>,
	params_fingerprint: u64,
}

impl Request {
	/// Assembles a request envelope.
	pub fn new(
		queries: Vec<Vec<Ciphertext>>,
		galois_key: GaloisKey,
		relin_key: Option<RelinearizationKey>,
		params: &PirParameters,
	) -> Self {
		Self {
			queries,
			galois_key,
			relin_key,
			params_fingerprint: params.fingerprint(),
		}
	}

	/// The packed queries, one per requested index.
	pub fn queries(&self) -> &[Vec<Ciphertext>] {
		&self.queries
	}

	/// Galois keys for oblivious expansion.
	pub fn galois_key(&self) -> &GaloisKey {
		&self.galois_key
	}

	/// Relinearization keys, present for the ciphertext-multiplication
	/// variant.
	pub fn relin_key(&self) -> Option<&RelinearizationKey> {
		self.relin_key.as_ref()
	}

	/// Fingerprint of the parameters the client was built with.
	pub fn params_fingerprint(&self) -> u64 {
		self.params_fingerprint
	}
}

/// The in-memory shape of a reply payload: one list of ciphertexts per
/// query. The list has length 1 for the ciphertext-multiplication variant
/// and carries the digit fan-out of the decomposition variant otherwise.
#[derive(Debug, Clone, Default)]
pub struct Response {
	replies: Vec<Vec<Ciphertext>>,
}

impl Response {
	/// Assembles a response envelope.
	pub fn new(replies: Vec<Vec<Ciphertext>>) -> Self {
		Self {
			replies,
		}
	}

	/// The replies, one per query.
	pub fn replies(&self) -> &[Vec<Ciphertext>] {
		&self.replies
	}
}
