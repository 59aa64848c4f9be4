/// A type representing all errors that can occur in the PIR protocol.
///
/// `InvalidArgument` covers everything caused by bad input: out-of-range
/// indices, mismatched selection vector lengths, payloads that do not fit
/// the current parameters, values too large to encode. `Internal` covers
/// unexpected failures in the underlying encryption primitives. Servers
/// map the former to a client-facing status and never panic on bad input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
	/// The caller supplied an invalid argument.
	#[error("invalid argument: {0}")]
	InvalidArgument(String),

	/// An internal invariant was violated or a primitive failed.
	#[error("internal error: {0}")]
	Internal(String),
}

impl Error {
	pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
		Error::InvalidArgument(msg.into())
	}

	pub(crate) fn internal(msg: impl Into<String>) -> Self {
		Error::Internal(msg.into())
	}
}

impl From<pirouette_bfv::Error> for Error {
	fn from(err: pirouette_bfv::Error) -> Self {
		match err {
			pirouette_bfv::Error::GaloisKeyMissing
			| pirouette_bfv::Error::InvalidGaloisElement
			| pirouette_bfv::Error::InvalidCiphertextSize
			| pirouette_bfv::Error::NttFormMismatch => Error::InvalidArgument(err.to_string()),
			_ => Error::Internal(err.to_string()),
		}
	}
}

/// The result type for PIR operations.
pub type Result<T> = std::result::Result<T, Error>;
