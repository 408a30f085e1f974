//! Protocol plumbing over the `thrift` crate.
//!
//! The value model only talks to `thrift`'s [`TOutputProtocol`] and [`TInputProtocol`] traits.
//! [`ProtocolKind`] picks the Binary or Compact implementation, and [`BoundedInputProtocol`]
//! applies the read limits from [`Config`] on top of either.

use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;

use thrift::protocol::TMessageIdentifier;
use thrift::{ProtocolError, ProtocolErrorKind};

pub use thrift::protocol::{
    TBinaryInputProtocol, TBinaryOutputProtocol, TCompactInputProtocol, TCompactOutputProtocol,
    TFieldIdentifier, TInputProtocol, TListIdentifier, TMapIdentifier, TOutputProtocol,
    TSetIdentifier, TStructIdentifier, TType as WireType,
};

use crate::ThriftError;

const DEFAULT_MAX_SIZE: usize = 100 * 1024 * 1024;
const DEFAULT_MAX_DEPTH: usize = 64;

/// Read limits applied while decoding untrusted input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Largest string or binary payload accepted, in bytes.
    pub max_string_size: usize,
    /// Largest element count accepted for a list, set or map.
    pub max_container_size: usize,
    /// Deepest nesting of structs and containers accepted.
    pub max_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_string_size: DEFAULT_MAX_SIZE,
            max_container_size: DEFAULT_MAX_SIZE,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Config {
    pub fn with_max_string_size(mut self, size: usize) -> Self {
        self.max_string_size = size;
        self
    }

    pub fn with_max_container_size(mut self, size: usize) -> Self {
        self.max_container_size = size;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}

pub(crate) fn protocol_error(kind: ProtocolErrorKind, message: impl Into<String>) -> thrift::Error {
    thrift::Error::Protocol(ProtocolError::new(kind, message.into()))
}

/// Converts an in-memory length to the signed 32-bit size carried on the wire.
pub fn wire_size(size: usize) -> thrift::Result<i32> {
    i32::try_from(size).map_err(|_| {
        protocol_error(
            ProtocolErrorKind::SizeLimit,
            format!("size {size} does not fit in a wire size"),
        )
    })
}

/// Converts a size read from the wire, rejecting negative values.
pub fn collection_size(size: i32) -> thrift::Result<usize> {
    usize::try_from(size)
        .map_err(|_| protocol_error(ProtocolErrorKind::NegativeSize, format!("negative size {size}")))
}

/// Returns the id of a non-stop field header.
pub(crate) fn field_id(ident: &TFieldIdentifier) -> thrift::Result<i16> {
    ident.id.ok_or_else(|| {
        protocol_error(
            ProtocolErrorKind::InvalidData,
            format!("field header of type {:?} has no id", ident.field_type),
        )
    })
}

/// An input protocol that enforces a [`Config`] on the protocol it wraps.
///
/// Struct and container headers count towards the depth limit; container headers and string
/// payloads are checked against the size limits. Skipping reads string payloads as raw bytes,
/// so unknown binary fields are skipped even when they are not valid UTF-8.
pub struct BoundedInputProtocol<'a> {
    inner: Box<dyn TInputProtocol + 'a>,
    config: Config,
    depth: usize,
}

impl<'a> BoundedInputProtocol<'a> {
    pub fn new<P: TInputProtocol + 'a>(inner: P, config: Config) -> Self {
        Self {
            inner: Box::new(inner),
            config,
            depth: 0,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Current struct and container nesting depth.
    pub fn depth(&self) -> usize {
        self.depth
    }

    fn enter(&mut self) -> thrift::Result<()> {
        if self.depth >= self.config.max_depth {
            return Err(protocol_error(
                ProtocolErrorKind::DepthLimit,
                format!("nesting depth exceeds {}", self.config.max_depth),
            ));
        }
        self.depth += 1;
        Ok(())
    }

    fn exit(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn check_container(&self, size: i32) -> thrift::Result<()> {
        let size = collection_size(size)?;
        if size > self.config.max_container_size {
            return Err(protocol_error(
                ProtocolErrorKind::SizeLimit,
                format!(
                    "container size {size} exceeds limit {}",
                    self.config.max_container_size
                ),
            ));
        }
        Ok(())
    }

    fn check_string(&self, len: usize) -> thrift::Result<()> {
        if len > self.config.max_string_size {
            return Err(protocol_error(
                ProtocolErrorKind::SizeLimit,
                format!(
                    "string size {len} exceeds limit {}",
                    self.config.max_string_size
                ),
            ));
        }
        Ok(())
    }
}

impl TInputProtocol for BoundedInputProtocol<'_> {
    fn read_message_begin(&mut self) -> thrift::Result<TMessageIdentifier> {
        self.inner.read_message_begin()
    }

    fn read_message_end(&mut self) -> thrift::Result<()> {
        self.inner.read_message_end()
    }

    fn read_struct_begin(&mut self) -> thrift::Result<Option<TStructIdentifier>> {
        self.enter()?;
        self.inner.read_struct_begin()
    }

    fn read_struct_end(&mut self) -> thrift::Result<()> {
        self.inner.read_struct_end()?;
        self.exit();
        Ok(())
    }

    fn read_field_begin(&mut self) -> thrift::Result<TFieldIdentifier> {
        self.inner.read_field_begin()
    }

    fn read_field_end(&mut self) -> thrift::Result<()> {
        self.inner.read_field_end()
    }

    fn read_bool(&mut self) -> thrift::Result<bool> {
        self.inner.read_bool()
    }

    fn read_bytes(&mut self) -> thrift::Result<Vec<u8>> {
        let bytes = self.inner.read_bytes()?;
        self.check_string(bytes.len())?;
        Ok(bytes)
    }

    fn read_i8(&mut self) -> thrift::Result<i8> {
        self.inner.read_i8()
    }

    fn read_i16(&mut self) -> thrift::Result<i16> {
        self.inner.read_i16()
    }

    fn read_i32(&mut self) -> thrift::Result<i32> {
        self.inner.read_i32()
    }

    fn read_i64(&mut self) -> thrift::Result<i64> {
        self.inner.read_i64()
    }

    fn read_double(&mut self) -> thrift::Result<f64> {
        self.inner.read_double()
    }

    fn read_string(&mut self) -> thrift::Result<String> {
        let s = self.inner.read_string()?;
        self.check_string(s.len())?;
        Ok(s)
    }

    fn read_list_begin(&mut self) -> thrift::Result<TListIdentifier> {
        let ident = self.inner.read_list_begin()?;
        self.check_container(ident.size)?;
        self.enter()?;
        Ok(ident)
    }

    fn read_list_end(&mut self) -> thrift::Result<()> {
        self.inner.read_list_end()?;
        self.exit();
        Ok(())
    }

    fn read_set_begin(&mut self) -> thrift::Result<TSetIdentifier> {
        let ident = self.inner.read_set_begin()?;
        self.check_container(ident.size)?;
        self.enter()?;
        Ok(ident)
    }

    fn read_set_end(&mut self) -> thrift::Result<()> {
        self.inner.read_set_end()?;
        self.exit();
        Ok(())
    }

    fn read_map_begin(&mut self) -> thrift::Result<TMapIdentifier> {
        let ident = self.inner.read_map_begin()?;
        self.check_container(ident.size)?;
        self.enter()?;
        Ok(ident)
    }

    fn read_map_end(&mut self) -> thrift::Result<()> {
        self.inner.read_map_end()?;
        self.exit();
        Ok(())
    }

    fn read_byte(&mut self) -> thrift::Result<u8> {
        self.inner.read_byte()
    }

    fn skip_till_depth(&mut self, field_type: WireType, depth: i8) -> thrift::Result<()> {
        if depth <= 0 {
            return Err(protocol_error(
                ProtocolErrorKind::DepthLimit,
                format!("cannot skip past {field_type:?}"),
            ));
        }
        match field_type {
            WireType::Bool => self.read_bool().map(drop),
            WireType::I08 => self.read_i8().map(drop),
            WireType::I16 => self.read_i16().map(drop),
            WireType::I32 => self.read_i32().map(drop),
            WireType::I64 => self.read_i64().map(drop),
            WireType::Double => self.read_double().map(drop),
            WireType::String | WireType::Utf7 | WireType::Utf8 | WireType::Utf16 => {
                self.read_bytes().map(drop)
            }
            WireType::Struct => {
                self.read_struct_begin()?;
                loop {
                    let ident = self.read_field_begin()?;
                    if ident.field_type == WireType::Stop {
                        break;
                    }
                    self.skip_till_depth(ident.field_type, depth - 1)?;
                    self.read_field_end()?;
                }
                self.read_struct_end()
            }
            WireType::List => {
                let ident = self.read_list_begin()?;
                for _ in 0..ident.size {
                    self.skip_till_depth(ident.element_type, depth - 1)?;
                }
                self.read_list_end()
            }
            WireType::Set => {
                let ident = self.read_set_begin()?;
                for _ in 0..ident.size {
                    self.skip_till_depth(ident.element_type, depth - 1)?;
                }
                self.read_set_end()
            }
            WireType::Map => {
                let ident = self.read_map_begin()?;
                if ident.size > 0 {
                    let (key_type, value_type) = match (ident.key_type, ident.value_type) {
                        (Some(k), Some(v)) => (k, v),
                        _ => {
                            return Err(protocol_error(
                                ProtocolErrorKind::InvalidData,
                                "non-empty map header without key or value type",
                            ))
                        }
                    };
                    for _ in 0..ident.size {
                        self.skip_till_depth(key_type, depth - 1)?;
                        self.skip_till_depth(value_type, depth - 1)?;
                    }
                }
                self.read_map_end()
            }
            other => Err(protocol_error(
                ProtocolErrorKind::InvalidData,
                format!("cannot skip field type {other:?}"),
            )),
        }
    }
}

/// Wire protocol selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProtocolKind {
    Binary,
    #[default]
    Compact,
}

impl ProtocolKind {
    /// Builds an output protocol writing to `transport`.
    pub fn output_protocol<'a, W: Write + 'a>(self, transport: W) -> Box<dyn TOutputProtocol + 'a> {
        match self {
            ProtocolKind::Binary => Box::new(TBinaryOutputProtocol::new(transport, true)),
            ProtocolKind::Compact => Box::new(TCompactOutputProtocol::new(transport)),
        }
    }

    /// Builds a bounded input protocol reading from `transport`.
    pub fn input_protocol<'a, R: Read + 'a>(
        self,
        transport: R,
        config: Config,
    ) -> BoundedInputProtocol<'a> {
        match self {
            ProtocolKind::Binary => {
                BoundedInputProtocol::new(TBinaryInputProtocol::new(transport, false), config)
            }
            ProtocolKind::Compact => {
                BoundedInputProtocol::new(TCompactInputProtocol::new(transport), config)
            }
        }
    }
}

impl fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolKind::Binary => f.write_str("binary"),
            ProtocolKind::Compact => f.write_str("compact"),
        }
    }
}

impl FromStr for ProtocolKind {
    type Err = ThriftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "binary" | "tbinary" => Ok(ProtocolKind::Binary),
            "compact" | "tcompact" => Ok(ProtocolKind::Compact),
            _ => Err(ThriftError::UnknownProtocol(s.to_string())),
        }
    }
}
