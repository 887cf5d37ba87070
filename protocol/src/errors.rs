//! # Pipeline Errors
//!
//! Every stage of the transaction pipeline either calls its continuation or
//! returns an [`Error`]. The error carries an [`ErrorKind`] with a stable
//! numeric wire code, a top-level message, the stack of context strings
//! added while it travelled outward, and the call site that created it.
//!
//! Module-level errors (`CoinError`, `StoreError`, ...) are `thiserror`
//! enums of their own and convert into [`Error`] through `From`, so `?`
//! works across module boundaries without losing the kind.
//!
//! ## Redaction
//!
//! The boundary renders an error in one of two ways:
//!
//! - [`Error::detailed`] — everything, including the creating call site.
//!   Only used when the application runs with the debug flag.
//! - [`Error::redacted`] — context chain, kind and message, without the
//!   call site. Internal errors lose their message as well, since it may
//!   carry panic payloads or storage details.

use std::any::Any;
use std::fmt;
use std::panic::Location;

/// Convenience alias used throughout the pipeline.
pub type Result<T> = std::result::Result<T, Error>;

// ---------------------------------------------------------------------------
// ErrorKind
// ---------------------------------------------------------------------------

/// Classification of a failure. Each kind maps to a stable wire code that
/// clients can match on; the codes must never be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unexpected fault: storage failure, panic, broken invariant.
    Internal,
    /// A required condition is not present.
    Unauthorized,
    /// A referenced entity does not exist.
    NotFound,
    /// The message or transaction is malformed or unroutable.
    InvalidMsg,
    /// Bad caller input outside of a message (parsing, arguments).
    InvalidInput,
    /// Not enough funds, or a fee below the configured minimum.
    InsufficientAmount,
    /// Unknown ticker or mismatched currencies.
    InvalidCurrency,
    /// A coin outside the representable range or with mismatched signs.
    InvalidCoin,
    /// Arithmetic overflow.
    Overflow,
    /// The entity already exists.
    Duplicate,
    /// The replay counter of a signer does not match.
    InvalidSequence,
    /// The multisig contract id does not resolve.
    ContractNotFound,
    /// Not enough participants signed for the multisig contract.
    UnauthorizedMultisig,
}

impl ErrorKind {
    /// Every kind, in code order.
    pub const ALL: [ErrorKind; 13] = [
        ErrorKind::Internal,
        ErrorKind::Unauthorized,
        ErrorKind::NotFound,
        ErrorKind::InvalidMsg,
        ErrorKind::InvalidInput,
        ErrorKind::InsufficientAmount,
        ErrorKind::InvalidCurrency,
        ErrorKind::InvalidCoin,
        ErrorKind::Overflow,
        ErrorKind::Duplicate,
        ErrorKind::InvalidSequence,
        ErrorKind::ContractNotFound,
        ErrorKind::UnauthorizedMultisig,
    ];

    /// Stable wire code. Zero is reserved for success.
    pub const fn code(self) -> u32 {
        match self {
            ErrorKind::Internal => 1,
            ErrorKind::Unauthorized => 2,
            ErrorKind::NotFound => 3,
            ErrorKind::InvalidMsg => 4,
            ErrorKind::InvalidInput => 5,
            ErrorKind::InsufficientAmount => 6,
            ErrorKind::InvalidCurrency => 7,
            ErrorKind::InvalidCoin => 8,
            ErrorKind::Overflow => 9,
            ErrorKind::Duplicate => 10,
            ErrorKind::InvalidSequence => 11,
            ErrorKind::ContractNotFound => 12,
            ErrorKind::UnauthorizedMultisig => 13,
        }
    }

    /// Reverse lookup of [`code`](Self::code).
    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.code() == code)
    }

    /// Short human-readable name of the kind.
    pub const fn description(self) -> &'static str {
        match self {
            ErrorKind::Internal => "internal error",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::NotFound => "not found",
            ErrorKind::InvalidMsg => "invalid message",
            ErrorKind::InvalidInput => "invalid input",
            ErrorKind::InsufficientAmount => "insufficient amount",
            ErrorKind::InvalidCurrency => "invalid currency",
            ErrorKind::InvalidCoin => "invalid coin",
            ErrorKind::Overflow => "overflow",
            ErrorKind::Duplicate => "duplicate",
            ErrorKind::InvalidSequence => "invalid sequence",
            ErrorKind::ContractNotFound => "contract not found",
            ErrorKind::UnauthorizedMultisig => "unauthorized multisig",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// A typed pipeline failure.
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    message: String,
    /// Context added by [`Error::wrap`], innermost first.
    context: Vec<String>,
    location: &'static Location<'static>,
}

impl Error {
    /// Creates an error of the given kind, capturing the caller's location.
    #[track_caller]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: Vec::new(),
            location: Location::caller(),
        }
    }

    #[track_caller]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    #[track_caller]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    #[track_caller]
    pub fn invalid_msg(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidMsg, message)
    }

    #[track_caller]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Converts a caught panic payload into an internal error.
    ///
    /// `panic!` payloads are either `&'static str` or `String`; anything
    /// else is reported without its content.
    #[track_caller]
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let detail = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        Self::internal(format!("panic: {}", detail))
    }

    /// Adds a layer of context. Context is rendered outermost first.
    pub fn wrap(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Stable wire code of this error's kind.
    pub fn code(&self) -> u32 {
        self.kind.code()
    }

    /// The top-level message, without kind or context.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }

    /// Where the error was created.
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }

    /// Full rendering including the creating call site.
    pub fn detailed(&self) -> String {
        format!(
            "{} (at {}:{})",
            self.render(true),
            self.location.file(),
            self.location.line()
        )
    }

    /// Rendering safe to hand to untrusted clients.
    pub fn redacted(&self) -> String {
        self.render(self.kind != ErrorKind::Internal)
    }

    fn render(&self, with_message: bool) -> String {
        let mut out = String::new();
        for ctx in self.context.iter().rev() {
            out.push_str(ctx);
            out.push_str(": ");
        }
        out.push_str(self.kind.description());
        if with_message && !self.message.is_empty() {
            out.push_str(": ");
            out.push_str(&self.message);
        }
        out
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(true))
    }
}

impl std::error::Error for Error {}

impl PartialEq for Error {
    /// Two errors are equal when they have the same kind, message and
    /// context. Call sites are ignored.
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.message == other.message && self.context == other.context
    }
}

impl From<bincode::Error> for Error {
    #[track_caller]
    fn from(err: bincode::Error) -> Self {
        Error::internal(format!("serialization: {}", err))
    }
}

// ---------------------------------------------------------------------------
// ResultExt
// ---------------------------------------------------------------------------

/// Adds context to any result whose error converts into [`Error`].
pub trait ResultExt<T> {
    fn wrap(self, context: impl Into<String>) -> Result<T>;

    fn wrap_with<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<Error>,
{
    fn wrap(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().wrap(context))
    }

    fn wrap_with<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| e.into().wrap(f()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
