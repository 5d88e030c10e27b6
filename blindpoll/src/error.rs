use crate::*;
use sled::transaction::TransactionError;
use std::fmt;
use thiserror::Error;

/// Error types
#[derive(Debug, Error)]
pub enum Error {
    #[error("blindpoll: validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("blindpoll: no such poll: {0}")]
    PollNotFound(PollId),

    #[error("blindpoll: no key for poll {0} in database")]
    KeyNotFound(PollId),

    #[error("blindpoll: failed to decode stored key: {0}")]
    KeyDecode(rsa::pkcs1::Error),

    #[error("blindpoll: failed to encode key: {0}")]
    KeyEncode(rsa::pkcs1::Error),

    #[error("blindpoll: invalid private key: {0}")]
    InvalidKey(rsa::errors::Error),

    #[error("blindpoll: key generation failed: {0}")]
    KeyGeneration(rsa::errors::Error),

    #[error("blindpoll: token shouldn't be empty")]
    EmptyToken,

    #[error("blindpoll: no such token")]
    NoSuchToken,

    #[error("blindpoll: token was used before")]
    TokenAlreadyUsed,

    #[error("blindpoll: envelope shouldn't be null")]
    EmptyEnvelope,

    #[error("blindpoll: ballot shouldn't be empty")]
    EmptyBallot,

    #[error("blindpoll: signature invalid")]
    InvalidSignature,

    #[error("blindpoll: a vote was already cast with this ballot")]
    BallotAlreadyCast,

    #[error("blindpoll: database error: {0}")]
    Storage(#[from] sled::Error),

    #[error("blindpoll: CBOR error: {0}")]
    Encoding(#[from] serde_cbor::Error),

    #[error("blindpoll: corrupted record: {0}")]
    Corrupted(&'static str),

    #[error("{context}: {source}")]
    Context {
        context: &'static str,
        #[source]
        source: Box<Error>,
    },
}

/// Coarse classification of errors, stable across added context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    AlreadyUsed,
    SignatureInvalid,
    Storage,
}

impl Error {
    /// Wrap the error with the operation it surfaced from
    pub fn context(self, context: &'static str) -> Self {
        Error::Context {
            context,
            source: Box::new(self),
        }
    }

    /// The innermost error, with all context stripped
    pub fn root(&self) -> &Error {
        match self {
            Error::Context { source, .. } => source.root(),
            e => e,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self.root() {
            Error::Validation(_)
            | Error::EmptyToken
            | Error::EmptyEnvelope
            | Error::EmptyBallot
            | Error::InvalidKey(_) => ErrorKind::Validation,
            Error::PollNotFound(_) | Error::KeyNotFound(_) | Error::NoSuchToken => {
                ErrorKind::NotFound
            }
            Error::TokenAlreadyUsed | Error::BallotAlreadyCast => ErrorKind::AlreadyUsed,
            Error::InvalidSignature => ErrorKind::SignatureInvalid,
            Error::KeyDecode(_)
            | Error::KeyEncode(_)
            | Error::KeyGeneration(_)
            | Error::Storage(_)
            | Error::Encoding(_)
            | Error::Corrupted(_)
            | Error::Context { .. } => ErrorKind::Storage,
        }
    }
}

impl From<TransactionError<Error>> for Error {
    fn from(err: TransactionError<Error>) -> Self {
        match err {
            TransactionError::Abort(e) => e,
            TransactionError::Storage(e) => Error::Storage(e),
        }
    }
}

/// Attach operation context to a `Result`
pub trait ResultExt<T> {
    fn context(self, context: &'static str) -> Result<T, Error>;
}

impl<T, E: Into<Error>> ResultExt<T> for Result<T, E> {
    fn context(self, context: &'static str) -> Result<T, Error> {
        self.map_err(|e| e.into().context(context))
    }
}

/// Which piece of free text failed the printable check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    Question,
    Option,
    Answer,
}

impl fmt::Display for TextField {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TextField::Question => write!(f, "question"),
            TextField::Option => write!(f, "answer option"),
            TextField::Answer => write!(f, "answer"),
        }
    }
}

/// Schema and answer validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("blindpoll validation: {0} contains invalid characters")]
    InvalidCharacters(TextField),

    #[error("blindpoll validation: wrong question type {0}")]
    InvalidQuestionType(i32),

    #[error("blindpoll validation: no option selected in closed question {0}")]
    NotSelected(usize),

    #[error("blindpoll validation: more than one option selected in closed question {0}")]
    MultipleSelected(usize),

    #[error("blindpoll validation: answer refers to unknown question {0}")]
    UnknownQuestion(usize),

    #[error("blindpoll validation: question {0} answered more than once")]
    DuplicateAnswer(usize),

    #[error("blindpoll validation: question {0} has no option {1}")]
    UnknownOption(usize, usize),

    #[error("blindpoll validation: option {1} selected twice in question {0}")]
    DuplicateOption(usize, usize),

    #[error("blindpoll validation: free text given for question {0}, which is not open")]
    UnexpectedText(usize),
}
