use static_assertions::const_assert;

/// A type representing all errors that can occur in the BFV backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
	/// An argument is invalid.
	#[error("The argument is not valid")]
	InvalidArgument,

	/// User failed to set a polynomial degree.
	#[error("Polynomial degree not set")]
	DegreeNotSet,

	/// The polynomial degree is unsupported.
	#[error("Unsupported polynomial degree")]
	UnsupportedDegree,

	/// User failed to set a coefficient modulus.
	#[error("Coefficient modulus not set")]
	CoefficientModulusNotSet,

	/// User failed to set a plaintext modulus.
	#[error("Plain modulus not set")]
	PlainModulusNotSet,

	/// A modulus value is outside the supported range.
	#[error("Modulus out of range")]
	ModulusOutOfRange,

	/// Not enough primes of the requested shape exist.
	#[error("Failed to find enough qualifying primes")]
	PrimeGenerationFailed,

	/// The parameter set does not meet the requested security level.
	#[error("Parameters exceed the security level budget")]
	InsecureParameters,

	/// An operand is in the wrong NTT form for the requested operation.
	#[error("Operand is in the wrong NTT form")]
	NttFormMismatch,

	/// A ciphertext has an unexpected size.
	#[error("Ciphertext has invalid size")]
	InvalidCiphertextSize,

	/// A plaintext coefficient is not reduced modulo the plain modulus.
	#[error("Plaintext is not valid for the encryption parameters")]
	InvalidPlaintext,

	/// Key-switching requires at least two coefficient moduli.
	#[error("Key-switching is unavailable for a single coefficient modulus")]
	KeySwitchUnavailable,

	/// The Galois key set does not contain the requested element.
	#[error("Galois key for the requested element is missing")]
	GaloisKeyMissing,

	/// A Galois element is not valid for the ring.
	#[error("Galois element must be odd and less than 2N")]
	InvalidGaloisElement,

	/// Serialized data is malformed or does not match the context.
	#[error("Serialization failed: {0}")]
	SerializationError(Box<String>),
}

const_assert!(std::mem::size_of::<Error>() <= 16);

/// The result type for BFV operations.
pub type Result<T> = std::result::Result<T, Error>;
