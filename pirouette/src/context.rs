use std::sync::Arc;

use pirouette_bfv::{BFVEvaluator, Context, SecurityLevel};

use crate::error::Result;
use crate::params::PirParameters;

/// Shared state for one PIR deployment: the validated encryption context
/// and an evaluator, bundled with the PIR parameters. Client, server and
/// database all hang off one of these; it is cheap to clone.
#[derive(Clone)]
pub struct PirContext {
	inner: Arc<Inner>,
}

struct Inner {
	params: PirParameters,
	context: Context,
	evaluator: BFVEvaluator,
}

impl PirContext {
	/// Validates the encryption parameters and builds the shared context.
	pub fn new(params: &PirParameters) -> Result<Self> {
		let context = Context::new(params.encryption_parameters(), SecurityLevel::TC128)?;
		let evaluator = BFVEvaluator::new(&context)?;
		Ok(Self {
			inner: Arc::new(Inner {
				params: params.clone(),
				context,
				evaluator,
			}),
		})
	}

	/// The PIR parameters.
	pub fn params(&self) -> &PirParameters {
		&self.inner.params
	}

	/// The underlying encryption context.
	pub fn he(&self) -> &Context {
		&self.inner.context
	}

	/// The shared evaluator.
	pub fn evaluator(&self) -> &BFVEvaluator {
		&self.inner.evaluator
	}

	/// The polynomial degree N.
	pub fn poly_modulus_degree(&self) -> usize {
		self.inner.context.poly_modulus_degree()
	}
}

impl std::fmt::Debug for PirContext {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PirContext")
			.field("params", self.params())
			.finish()
	}
}
