//! Error types for the sparse merkle trie implementation

use thiserror::Error;

/// Error type for trie operations
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum TreeError<DbError> {
    /// The key is not present in the trie
    #[error("key not found in trie")]
    KeyNotFound,
    /// A digest referenced by the trie is missing from the store
    #[error("node not found in store")]
    NodeNotFound,
    /// A stored node record could not be decoded
    #[error("corrupt node record: {0}")]
    CorruptNode(&'static str),
    /// A proof failed its sanity checks or could not be decoded
    #[error("bad proof: {0}")]
    BadProof(#[from] ProofError),
    /// Database error
    #[error("database error: {0}")]
    Db(DbError),
    /// The requested version is unknown or was evicted from the history
    #[error("version {0} not found")]
    VersionNotFound(u64),
    /// The initial version can only be set once, before the first commit
    #[error("initial version already set")]
    VersionAlreadySet,
    /// Mutation attempted on an immutable trie
    #[error("trie is immutable")]
    ImmutableTrie,
    /// A persisted spec does not match the hasher it is loaded with
    #[error("spec mismatch: {0}")]
    SpecMismatch(&'static str),
}

/// Error type for proof validation and decoding.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ProofError {
    #[error("proof has {got} side nodes, trie depth is {max}")]
    TooManySideNodes { got: usize, max: usize },
    #[error("side node {index} is {got} bytes, expected {expected}")]
    InvalidSideNodeSize {
        index: usize,
        got: usize,
        expected: usize,
    },
    #[error("invalid non-membership leaf data")]
    InvalidLeafData,
    #[error("sibling data does not hash to the first side node")]
    SiblingMismatch,
    #[error("non-membership leaf occupies the queried path")]
    ForgedNonMembership,
    #[error("compact proof bitmask does not match its side nodes")]
    InvalidBitmask,
    #[error("invalid closest proof: {0}")]
    InvalidClosestProof(&'static str),
    #[error("malformed proof encoding: {0}")]
    Encoding(&'static str),
}

/// Error type of the in-memory store
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum MemoryDbError {
    #[error("empty key")]
    EmptyKey,
}
