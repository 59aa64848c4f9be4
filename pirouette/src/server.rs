use tracing::debug;

use pirouette_bfv::Ciphertext;

use crate::context::PirContext;
use crate::database::PirDatabase;
use crate::error::{Error, Result};
use crate::operators::QueryExpander;
use crate::payload::{Request, Response};

/// The serving side of the protocol: expands each packed query into a full
/// selection vector, multiplies it against the database, and assembles the
/// response.
pub struct PirServer {
	context: PirContext,
	db: PirDatabase,
	expander: QueryExpander,
}

impl PirServer {
	/// Creates a server around a populated database.
	pub fn new(db: PirDatabase) -> Self {
		let context = db.context().clone();
		Self {
			expander: QueryExpander::new(&context),
			context,
			db,
		}
	}

	/// The shared context.
	pub fn context(&self) -> &PirContext {
		&self.context
	}

	/// Handles a client request. Bad client input (mismatched parameters,
	/// wrong query shape) comes back as `InvalidArgument`; a failing
	/// primitive is `Internal`. The response is atomic: one bad query
	/// fails the whole batch.
	pub fn process_request(&self, request: &Request) -> Result<Response> {
		let params = self.context.params();
		if request.params_fingerprint() != params.fingerprint() {
			return Err(Error::invalid_argument(
				"request was created under different PIR parameters",
			));
		}
		let n = self.context.poly_modulus_degree();
		let dim_sum = params.dim_sum();
		let expected_cts = dim_sum.div_ceil(n);

		let mut replies = Vec::with_capacity(request.queries().len());
		for (query_index, query) in request.queries().iter().enumerate() {
			if query.len() != expected_cts {
				return Err(Error::invalid_argument(format!(
					"query {} has {} ciphertexts, expected {}",
					query_index,
					query.len(),
					expected_cts
				)));
			}
			let mut selection_vector: Vec<Ciphertext> = Vec::with_capacity(dim_sum);
			for (b, packed) in query.iter().enumerate() {
				let slots = n.min(dim_sum - b * n);
				let expanded =
					self.expander
						.oblivious_expansion(packed, slots, request.galois_key())?;
				selection_vector.extend(expanded);
			}
			debug!(
				query = query_index,
				slots = selection_vector.len(),
				"expanded selection vector"
			);
			let reply = self
				.db
				.multiply(&selection_vector, request.relin_key(), None)?;
			replies.push(reply);
		}
		Ok(Response::new(replies))
	}
}
