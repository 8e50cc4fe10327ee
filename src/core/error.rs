// Error taxonomy for the unpack engine: kinds, contextual key paths, sources.
use std::error::Error as StdError;
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// Bytes are not the keyed object / array expected at this nesting level.
    MalformedInput,
    /// A polymorphic slot's fragment lacks a valid string `type` field.
    MalformedEnvelope,
    /// Discriminant string has no registered factory.
    UnknownType,
    /// Resolved concrete type does not provide the capability the
    /// destination slot requires. A registration error, not a data error.
    CapabilityMismatch,
    /// A map's string key cannot be parsed into the destination key type.
    KeyDecode,
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    key: Option<String>,
    discriminant: Option<String>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            key: None,
            discriminant: None,
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Key path of the failing fragment, accumulated outward during
    /// unwinding (e.g. `shapes[0].r`).
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn discriminant(&self) -> Option<&str> {
        self.discriminant.as_deref()
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_discriminant(mut self, discriminant: impl Into<String>) -> Self {
        self.discriminant = Some(discriminant.into());
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Prepend one path segment to the key context. Callers pass plain keys
    /// (`"shapes"`) or bracketed indices (`"[0]"`); segments join with a dot
    /// except in front of an index.
    pub fn with_key_segment(mut self, segment: &str) -> Self {
        self.key = Some(match self.key.take() {
            None => segment.to_string(),
            Some(rest) if rest.starts_with('[') => format!("{segment}{rest}"),
            Some(rest) => format!("{segment}.{rest}"),
        });
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        if let Some(key) = &self.key {
            write!(f, " (key: {key})")?;
        }
        if let Some(discriminant) = &self.discriminant {
            write!(f, " (type: {discriminant})")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}
