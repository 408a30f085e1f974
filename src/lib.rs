//! # thrift-dyn
//!
//! Build, read, and write Thrift messages at runtime, without a schema compiled ahead of time.
//!
//! - A [`Message`] is an ordered list of [`Field`]s, each carrying an id, a declared [`TType`],
//!   a requiredness flag and an optional [`Value`].
//! - Values cover every scalar wire kind, nested messages, and arbitrarily nested
//!   [`List`], [`Set`], ordered [`Map`] and [`UnorderedMap`] containers.
//! - Reading discovers the message shape from the wire; fields of a kind the value model does
//!   not cover are skipped without failing the whole message.
//! - The output is byte-identical to what a statically generated encoder produces under the
//!   same protocol. `#[derive(ThriftStruct)]` provides that static side for plain Rust structs.
//!
//! ## Protocols
//!
//! The byte layout comes from the `thrift` crate; [`ProtocolKind`] selects its implementation.
//!
//! - [`ProtocolKind::Binary`]: Thrift Binary protocol, big-endian and fixed-width.
//! - [`ProtocolKind::Compact`]: Thrift Compact protocol with zigzag varints and field id deltas.
//!
//! ## Feature Flags
//!
//! - `indexmap` enables `Wire` for `IndexMap`/`IndexSet` and `Map::from_index_map`/`Map::to_index_map`.
//! - `serde_json` enables `Value::to_json` and `Message::to_json` for diagnostics.
//!
//! ## Example
//!
//! ```rust
//! use thrift_dyn::{Decoder, Encoder, Field, Message, ProtocolKind, TType};
//!
//! let mut message = Message::new("Model");
//! message
//!     .add_field(Field::required(1, TType::String, "abc").with_value("hello"))
//!     .add_field(Field::required(4, TType::I64, "sd").with_value(0xcafe_i64));
//!
//! let encoder = Encoder::new(ProtocolKind::Compact);
//! let bytes = encoder.encode(&message).unwrap();
//!
//! let decoder = Decoder::new(ProtocolKind::Compact);
//! let mut decoded = Message::default();
//! decoder.decode(&bytes, &mut decoded).unwrap();
//! assert_eq!(decoded.value(4).and_then(|v| v.as_i64()), Some(0xcafe));
//! ```

pub mod codec;
pub mod container;
pub mod core;
mod features;
pub mod field;
pub mod message;
pub mod protocol;

use bytes::Bytes;

pub use crate::codec::{Decoder, Encoder};
pub use crate::container::{List, Map, Set, UnorderedMap};
pub use crate::core::{MapKey, TType, Value, Wire};
pub use crate::field::{Field, FieldRead};
pub use crate::message::Message;
pub use crate::protocol::{Config, ProtocolKind, TInputProtocol, TOutputProtocol, WireType};
pub use thrift;
pub use thrift_dyn_derive::ThriftStruct;

/// Errors that can occur while building, writing, or reading messages.
#[derive(Debug, thiserror::Error)]
pub enum ThriftError {
    /// A value's concrete kind does not match the declared wire type.
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: TType,
        actual: &'static str,
    },
    /// The wire type is outside the set of kinds the value model covers.
    #[error("Unsupported type: {0:?}")]
    UnsupportedType(WireType),
    /// The value does not expose the struct read/write contract, or cannot serve as a map key.
    #[error("Unsupported value kind: {0}")]
    UnsupportedValue(&'static str),
    /// A container's declared size disagrees with the number of elements it holds.
    #[error("Container size mismatch: declared {declared}, actual {actual}")]
    SizeMismatch { declared: usize, actual: usize },
    /// A required struct or container field has no value, so there is nothing meaningful to write.
    #[error("Required field {id} '{name}' has no value")]
    MissingRequired { id: i16, name: String },
    /// The caller-provided buffer cannot hold the encoded message.
    #[error("Destination buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall { needed: usize, available: usize },
    #[error("Unknown protocol: {0}")]
    UnknownProtocol(String),
    /// Malformed or out-of-bounds wire data, or a transport failure inside the protocol.
    #[error(transparent)]
    Protocol(#[from] thrift::Error),
    /// Writing the encoded bytes to a caller's stream failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// An error annotated with the operation, struct, and field it happened in.
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<ThriftError>,
    },
}

impl ThriftError {
    /// Returns the innermost error, skipping any context annotations.
    pub fn root(&self) -> &ThriftError {
        let mut err = self;
        while let ThriftError::Context { source, .. } = err {
            err = source;
        }
        err
    }
}

/// The result type used throughout this crate.
pub type Result<T> = std::result::Result<T, ThriftError>;

/// Attaches a lazily built description to an error.
pub(crate) trait ResultExt<T> {
    fn context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<ThriftError>> ResultExt<T> for std::result::Result<T, E> {
    fn context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|source| ThriftError::Context {
            context: f(),
            source: Box::new(source.into()),
        })
    }
}

/// The struct read/write contract.
///
/// `Encoder` and `Decoder` accept any type implementing this trait: [`Message`], a lone
/// [`Field`], or a struct deriving [`ThriftStruct`].
pub trait TStruct {
    /// Writes the value as a Thrift struct body.
    fn write(&self, p: &mut dyn TOutputProtocol) -> Result<()>;

    /// Replaces the value with the struct read from the protocol.
    fn read(&mut self, p: &mut dyn TInputProtocol) -> Result<()>;
}

/// Convenience function to encode a value with a one-off encoder.
///
/// # Example
/// ```rust
/// use thrift_dyn::{encode, Field, Message, ProtocolKind, TType};
///
/// let message = Message::new("Ping").with_field(Field::required(1, TType::I32, "n").with_value(7));
/// let bytes = encode(ProtocolKind::Binary, &message).unwrap();
/// assert_eq!(&bytes[..], &[0x08, 0x00, 0x01, 0x00, 0x00, 0x00, 0x07, 0x00]);
/// ```
pub fn encode<T: TStruct + ?Sized>(kind: ProtocolKind, value: &T) -> Result<Bytes> {
    Encoder::new(kind).encode(value)
}

/// Convenience function to decode a value with a one-off decoder.
///
/// # Example
/// ```rust
/// use thrift_dyn::{decode, Message, ProtocolKind};
///
/// let message: Message = decode(ProtocolKind::Binary, &[0x08, 0x00, 0x01, 0x00, 0x00, 0x00, 0x07, 0x00]).unwrap();
/// assert_eq!(message.value(1).and_then(|v| v.as_i32()), Some(7));
/// ```
pub fn decode<T: TStruct + Default>(kind: ProtocolKind, src: &[u8]) -> Result<T> {
    let mut value = T::default();
    Decoder::new(kind).decode(src, &mut value)?;
    Ok(value)
}
