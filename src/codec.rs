//! Thread-safe front ends binding a [`TStruct`] to a protocol and a reusable buffer.

use std::io::{Read, Write};

use bytes::{BufMut, Bytes, BytesMut};
use parking_lot::Mutex;
use tracing::{instrument, trace};

use crate::protocol::{Config, ProtocolKind};
use crate::{Result, TStruct, ThriftError, Value};

/// Serializes values into the selected protocol.
///
/// One instance holds a single output buffer, and each call writes through a fresh protocol.
/// Concurrent callers are serialized by a lock, so each call observes only its own output.
#[derive(Debug)]
pub struct Encoder {
    kind: ProtocolKind,
    buffer: Mutex<BytesMut>,
}

impl Encoder {
    pub fn new(kind: ProtocolKind) -> Self {
        Encoder {
            kind,
            buffer: Mutex::new(BytesMut::new()),
        }
    }

    pub fn kind(&self) -> ProtocolKind {
        self.kind
    }

    fn with_encoded<T, R, F>(&self, value: &T, f: F) -> Result<R>
    where
        T: TStruct + ?Sized,
        F: FnOnce(&[u8]) -> Result<R>,
    {
        let mut buffer = self.buffer.lock();
        buffer.clear();
        {
            let mut p = self.kind.output_protocol((&mut *buffer).writer());
            value.write(&mut *p)?;
            p.flush()?;
        }
        trace!(len = buffer.len(), "encoded");
        f(&buffer)
    }

    /// Encodes `value` and returns a copy of the bytes.
    #[instrument(level = "trace", skip_all, fields(protocol = %self.kind))]
    pub fn encode<T: TStruct + ?Sized>(&self, value: &T) -> Result<Bytes> {
        self.with_encoded(value, |encoded| Ok(Bytes::copy_from_slice(encoded)))
    }

    /// Encodes `value` into `dst`, returning the number of bytes written.
    ///
    /// Fails with `BufferTooSmall` and leaves `dst` untouched if the output does not fit.
    #[instrument(level = "trace", skip_all, fields(protocol = %self.kind))]
    pub fn encode_into<T: TStruct + ?Sized>(&self, dst: &mut [u8], value: &T) -> Result<usize> {
        self.with_encoded(value, |encoded| {
            if encoded.len() > dst.len() {
                return Err(ThriftError::BufferTooSmall {
                    needed: encoded.len(),
                    available: dst.len(),
                });
            }
            dst[..encoded.len()].copy_from_slice(encoded);
            Ok(encoded.len())
        })
    }

    /// Encodes `value` and writes it to `writer`, returning the number of bytes written.
    #[instrument(level = "trace", skip_all, fields(protocol = %self.kind))]
    pub fn write_to<T: TStruct + ?Sized, W: Write>(&self, writer: &mut W, value: &T) -> Result<u64> {
        self.with_encoded(value, |encoded| {
            writer.write_all(encoded)?;
            writer.flush()?;
            Ok(encoded.len() as u64)
        })
    }

    /// Encodes a [`Value`], which must be a struct.
    pub fn encode_value(&self, value: &Value) -> Result<Bytes> {
        match value {
            Value::Struct(message) => self.encode(message),
            other => Err(ThriftError::UnsupportedValue(other.kind_name())),
        }
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Encoder::new(ProtocolKind::default())
    }
}

/// Deserializes values from the selected protocol.
///
/// Calls on one instance are serialized by a lock.
#[derive(Debug)]
pub struct Decoder {
    kind: ProtocolKind,
    config: Config,
    lock: Mutex<()>,
}

impl Decoder {
    pub fn new(kind: ProtocolKind) -> Self {
        Self::with_config(kind, Config::default())
    }

    pub fn with_config(kind: ProtocolKind, config: Config) -> Self {
        Decoder {
            kind,
            config,
            lock: Mutex::new(()),
        }
    }

    pub fn kind(&self) -> ProtocolKind {
        self.kind
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Decodes `src` into `dst`, replacing its previous contents.
    #[instrument(level = "trace", skip_all, fields(protocol = %self.kind, len = src.len()))]
    pub fn decode<T: TStruct + ?Sized>(&self, src: &[u8], dst: &mut T) -> Result<()> {
        self.read_from(src, dst)
    }

    /// Decodes one struct from `reader` into `dst`.
    ///
    /// The Compact protocol reads byte by byte; wrap unbuffered sources in a `BufReader`.
    #[instrument(level = "trace", skip_all, fields(protocol = %self.kind))]
    pub fn read_from<T: TStruct + ?Sized, R: Read>(&self, reader: R, dst: &mut T) -> Result<()> {
        let _guard = self.lock.lock();
        let mut protocol = self.kind.input_protocol(reader, self.config);
        dst.read(&mut protocol)
    }

    /// Decodes into a [`Value`], which must be a struct.
    pub fn decode_value(&self, src: &[u8], dst: &mut Value) -> Result<()> {
        match dst {
            Value::Struct(message) => self.decode(src, message),
            other => Err(ThriftError::UnsupportedValue(other.kind_name())),
        }
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Decoder::new(ProtocolKind::default())
    }
}
