use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::hash::{BuildHasher, Hash, Hasher};

use bytes::Bytes;

use crate::container::{List, Map, Set, UnorderedMap};
use crate::protocol::{
    collection_size, wire_size, TInputProtocol, TListIdentifier, TMapIdentifier, TOutputProtocol,
    TSetIdentifier, WireType,
};
use crate::*;

/// The type tags of the value model.
///
/// The discriminants are the type ids the Binary protocol writes on the wire. Each tag maps to
/// one [`WireType`] of the `thrift` crate; wire types without a tag here are not modeled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum TType {
    Stop = 0,
    Void = 1,
    Bool = 2,
    Byte = 3,
    Double = 4,
    I16 = 6,
    I32 = 8,
    I64 = 10,
    String = 11,
    Struct = 12,
    Map = 13,
    Set = 14,
    List = 15,
}

impl TType {
    /// Returns true for the kinds a container element, key, or value may have.
    pub fn is_element(self) -> bool {
        matches!(
            self,
            TType::Bool
                | TType::Byte
                | TType::I16
                | TType::I32
                | TType::I64
                | TType::Double
                | TType::String
                | TType::Struct
                | TType::Map
                | TType::Set
                | TType::List
        )
    }

    /// Returns true for the kinds usable as an [`UnorderedMap`] key.
    pub fn is_scalar(self) -> bool {
        matches!(
            self,
            TType::Bool
                | TType::Byte
                | TType::I16
                | TType::I32
                | TType::I64
                | TType::Double
                | TType::String
        )
    }
}

impl From<TType> for WireType {
    fn from(ttype: TType) -> Self {
        match ttype {
            TType::Stop => WireType::Stop,
            TType::Void => WireType::Void,
            TType::Bool => WireType::Bool,
            TType::Byte => WireType::I08,
            TType::Double => WireType::Double,
            TType::I16 => WireType::I16,
            TType::I32 => WireType::I32,
            TType::I64 => WireType::I64,
            TType::String => WireType::String,
            TType::Struct => WireType::Struct,
            TType::Map => WireType::Map,
            TType::Set => WireType::Set,
            TType::List => WireType::List,
        }
    }
}

impl TryFrom<WireType> for TType {
    type Error = ThriftError;

    fn try_from(wire: WireType) -> Result<Self> {
        Ok(match wire {
            WireType::Stop => TType::Stop,
            WireType::Void => TType::Void,
            WireType::Bool => TType::Bool,
            WireType::I08 => TType::Byte,
            WireType::Double => TType::Double,
            WireType::I16 => TType::I16,
            WireType::I32 => TType::I32,
            WireType::I64 => TType::I64,
            WireType::String => TType::String,
            WireType::Struct => TType::Struct,
            WireType::Map => TType::Map,
            WireType::Set => TType::Set,
            WireType::List => TType::List,
            other => return Err(ThriftError::UnsupportedType(other)),
        })
    }
}

impl fmt::Display for TType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TType::Stop => "STOP",
            TType::Void => "VOID",
            TType::Bool => "BOOL",
            TType::Byte => "BYTE",
            TType::Double => "DOUBLE",
            TType::I16 => "I16",
            TType::I32 => "I32",
            TType::I64 => "I64",
            TType::String => "STRING",
            TType::Struct => "STRUCT",
            TType::Map => "MAP",
            TType::Set => "SET",
            TType::List => "LIST",
        };
        f.write_str(name)
    }
}

/// A runtime value held by a [`Field`] or a container slot.
///
/// `String` and `Binary` share the `STRING` wire type. Reading produces `String` when the
/// bytes are valid UTF-8 and `Binary` otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Byte(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Double(f64),
    String(String),
    Binary(Bytes),
    Struct(Message),
    List(List),
    Set(Set),
    Map(Map),
    UnorderedMap(UnorderedMap),
}

impl Value {
    /// The wire type this value is written as.
    pub fn ttype(&self) -> TType {
        match self {
            Value::Bool(_) => TType::Bool,
            Value::Byte(_) => TType::Byte,
            Value::I16(_) => TType::I16,
            Value::I32(_) => TType::I32,
            Value::I64(_) => TType::I64,
            Value::Double(_) => TType::Double,
            Value::String(_) | Value::Binary(_) => TType::String,
            Value::Struct(_) => TType::Struct,
            Value::List(_) => TType::List,
            Value::Set(_) => TType::Set,
            Value::Map(_) | Value::UnorderedMap(_) => TType::Map,
        }
    }

    /// Human readable name of the concrete variant, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Byte(_) => "byte",
            Value::I16(_) => "i16",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Binary(_) => "binary",
            Value::Struct(_) => "struct",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Map(_) => "map",
            Value::UnorderedMap(_) => "unordered map",
        }
    }

    /// Returns true if this value can be written as `ttype`.
    pub fn matches(&self, ttype: TType) -> bool {
        self.ttype() == ttype
    }

    /// The zero value written for a required scalar field that has no value.
    ///
    /// Structs and containers have no zero value.
    pub fn zero(ttype: TType) -> Option<Value> {
        Some(match ttype {
            TType::Bool => Value::Bool(false),
            TType::Byte => Value::Byte(0),
            TType::I16 => Value::I16(0),
            TType::I32 => Value::I32(0),
            TType::I64 => Value::I64(0),
            TType::Double => Value::Double(0.0),
            TType::String => Value::String(String::new()),
            _ => return None,
        })
    }

    pub(crate) fn from_wire_bytes(bytes: Vec<u8>) -> Value {
        match String::from_utf8(bytes) {
            Ok(s) => Value::String(s),
            Err(e) => Value::Binary(Bytes::from(e.into_bytes())),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_byte(&self) -> Option<i8> {
        match self {
            Value::Byte(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i16(&self) -> Option<i16> {
        match self {
            Value::I16(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::I32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    /// Raw bytes of a `String` or `Binary` value.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::String(v) => Some(v.as_bytes()),
            Value::Binary(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&Message> {
        match self {
            Value::Struct(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&List> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&Set> {
        match self {
            Value::Set(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_unordered_map(&self) -> Option<&UnorderedMap> {
        match self {
            Value::UnorderedMap(v) => Some(v),
            _ => None,
        }
    }
}

macro_rules! impl_value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_value_from!(
    bool => Bool,
    i8 => Byte,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    f64 => Double,
    String => String,
    Bytes => Binary,
    Message => Struct,
    List => List,
    Set => Set,
    Map => Map,
    UnorderedMap => UnorderedMap,
);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Binary(Bytes::from(v))
    }
}

impl From<MapKey> for Value {
    fn from(key: MapKey) -> Self {
        match key {
            MapKey::Bool(v) => Value::Bool(v),
            MapKey::Byte(v) => Value::Byte(v),
            MapKey::I16(v) => Value::I16(v),
            MapKey::I32(v) => Value::I32(v),
            MapKey::I64(v) => Value::I64(v),
            MapKey::Double(v) => Value::Double(v),
            MapKey::String(v) => Value::String(v),
            MapKey::Binary(v) => Value::Binary(v),
        }
    }
}

/// A scalar map key with total ordering and hashing.
///
/// Doubles compare by IEEE-754 total order and hash by bit pattern, so `NaN` keys are usable.
/// The ordering is the canonical one used when an ordered [`Map`] is built from unordered
/// input: numbers ascending, strings lexicographically, `false` before `true`.
#[derive(Debug, Clone)]
pub enum MapKey {
    Bool(bool),
    Byte(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Double(f64),
    String(String),
    Binary(Bytes),
}

impl MapKey {
    pub fn ttype(&self) -> TType {
        match self {
            MapKey::Bool(_) => TType::Bool,
            MapKey::Byte(_) => TType::Byte,
            MapKey::I16(_) => TType::I16,
            MapKey::I32(_) => TType::I32,
            MapKey::I64(_) => TType::I64,
            MapKey::Double(_) => TType::Double,
            MapKey::String(_) | MapKey::Binary(_) => TType::String,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            MapKey::Bool(_) => 0,
            MapKey::Byte(_) => 1,
            MapKey::I16(_) => 2,
            MapKey::I32(_) => 3,
            MapKey::I64(_) => 4,
            MapKey::Double(_) => 5,
            MapKey::String(_) => 6,
            MapKey::Binary(_) => 7,
        }
    }

    pub(crate) fn write(&self, p: &mut dyn TOutputProtocol, expected: TType) -> Result<()> {
        match (expected, self) {
            (TType::Bool, MapKey::Bool(v)) => p.write_bool(*v)?,
            (TType::Byte, MapKey::Byte(v)) => p.write_i8(*v)?,
            (TType::I16, MapKey::I16(v)) => p.write_i16(*v)?,
            (TType::I32, MapKey::I32(v)) => p.write_i32(*v)?,
            (TType::I64, MapKey::I64(v)) => p.write_i64(*v)?,
            (TType::Double, MapKey::Double(v)) => p.write_double(*v)?,
            (TType::String, MapKey::String(v)) => p.write_string(v)?,
            (TType::String, MapKey::Binary(v)) => p.write_bytes(v)?,
            (expected, key) => {
                return Err(ThriftError::TypeMismatch {
                    expected,
                    actual: Value::from(key.clone()).kind_name(),
                })
            }
        }
        Ok(())
    }
}

impl PartialEq for MapKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MapKey {}

impl PartialOrd for MapKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MapKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (MapKey::Bool(a), MapKey::Bool(b)) => a.cmp(b),
            (MapKey::Byte(a), MapKey::Byte(b)) => a.cmp(b),
            (MapKey::I16(a), MapKey::I16(b)) => a.cmp(b),
            (MapKey::I32(a), MapKey::I32(b)) => a.cmp(b),
            (MapKey::I64(a), MapKey::I64(b)) => a.cmp(b),
            (MapKey::Double(a), MapKey::Double(b)) => a.total_cmp(b),
            (MapKey::String(a), MapKey::String(b)) => a.cmp(b),
            (MapKey::Binary(a), MapKey::Binary(b)) => a.cmp(b),
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }
}

impl Hash for MapKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            MapKey::Bool(v) => v.hash(state),
            MapKey::Byte(v) => v.hash(state),
            MapKey::I16(v) => v.hash(state),
            MapKey::I32(v) => v.hash(state),
            MapKey::I64(v) => v.hash(state),
            MapKey::Double(v) => v.to_bits().hash(state),
            MapKey::String(v) => v.hash(state),
            MapKey::Binary(v) => v.hash(state),
        }
    }
}

impl TryFrom<Value> for MapKey {
    type Error = ThriftError;

    fn try_from(value: Value) -> Result<Self> {
        Ok(match value {
            Value::Bool(v) => MapKey::Bool(v),
            Value::Byte(v) => MapKey::Byte(v),
            Value::I16(v) => MapKey::I16(v),
            Value::I32(v) => MapKey::I32(v),
            Value::I64(v) => MapKey::I64(v),
            Value::Double(v) => MapKey::Double(v),
            Value::String(v) => MapKey::String(v),
            Value::Binary(v) => MapKey::Binary(v),
            other => return Err(ThriftError::UnsupportedValue(other.kind_name())),
        })
    }
}

macro_rules! impl_key_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for MapKey {
                fn from(v: $ty) -> Self {
                    MapKey::$variant(v)
                }
            }
        )*
    };
}

impl_key_from!(
    bool => Bool,
    i8 => Byte,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    f64 => Double,
    String => String,
    Bytes => Binary,
);

impl From<&str> for MapKey {
    fn from(v: &str) -> Self {
        MapKey::String(v.to_owned())
    }
}

// --- Dispatch ---

/// Writes `value` as the declared wire type `expected`.
///
/// The declared type is authoritative: a value of any other kind is a type mismatch, and a
/// declared `Stop` or `Void` is always an error on write.
pub fn write_value(p: &mut dyn TOutputProtocol, expected: TType, value: &Value) -> Result<()> {
    match (expected, value) {
        (TType::Bool, Value::Bool(v)) => p.write_bool(*v)?,
        (TType::Byte, Value::Byte(v)) => p.write_i8(*v)?,
        (TType::I16, Value::I16(v)) => p.write_i16(*v)?,
        (TType::I32, Value::I32(v)) => p.write_i32(*v)?,
        (TType::I64, Value::I64(v)) => p.write_i64(*v)?,
        (TType::Double, Value::Double(v)) => p.write_double(*v)?,
        (TType::String, Value::String(v)) => p.write_string(v)?,
        (TType::String, Value::Binary(v)) => p.write_bytes(v)?,
        (TType::Struct, Value::Struct(v)) => v.write(p)?,
        (TType::List, Value::List(v)) => v.write(p)?,
        (TType::Set, Value::Set(v)) => v.write(p)?,
        (TType::Map, Value::Map(v)) => v.write(p)?,
        (TType::Map, Value::UnorderedMap(v)) => v.write(p)?,
        (TType::Stop | TType::Void, _) => return Err(ThriftError::UnsupportedType(expected.into())),
        (expected, other) => {
            return Err(ThriftError::TypeMismatch {
                expected,
                actual: other.kind_name(),
            })
        }
    }
    Ok(())
}

/// Reads one value of wire type `ttype`.
///
/// Returns `Ok(None)` without consuming anything for `Stop` and `Void`, which carry no value.
pub fn read_value(p: &mut dyn TInputProtocol, ttype: TType) -> Result<Option<Value>> {
    Ok(Some(match ttype {
        TType::Bool => Value::Bool(p.read_bool()?),
        TType::Byte => Value::Byte(p.read_i8()?),
        TType::I16 => Value::I16(p.read_i16()?),
        TType::I32 => Value::I32(p.read_i32()?),
        TType::I64 => Value::I64(p.read_i64()?),
        TType::Double => Value::Double(p.read_double()?),
        TType::String => Value::from_wire_bytes(p.read_bytes()?),
        TType::Struct => {
            let mut message = Message::default();
            message.read(p)?;
            Value::Struct(message)
        }
        TType::List => {
            let mut list = List::empty();
            list.read(p)?;
            Value::List(list)
        }
        TType::Set => {
            let mut set = Set::empty();
            set.read(p)?;
            Value::Set(set)
        }
        TType::Map => {
            let mut map = Map::empty();
            map.read(p)?;
            Value::Map(map)
        }
        TType::Stop | TType::Void => return Ok(None),
    }))
}

/// Reads a container element, for which every kind must carry a value.
pub(crate) fn read_element(p: &mut dyn TInputProtocol, ttype: TType) -> Result<Value> {
    read_value(p, ttype)?.ok_or(ThriftError::UnsupportedType(ttype.into()))
}

// --- Static types ---

/// Compile-time mapping from a Rust type to a Thrift wire type.
///
/// This is the statically typed counterpart of [`Value`], used by `#[derive(ThriftStruct)]`.
pub trait Wire: Sized {
    /// The wire type this Rust type encodes as.
    const TTYPE: TType;

    fn write_wire(&self, p: &mut dyn TOutputProtocol) -> Result<()>;

    fn read_wire(p: &mut dyn TInputProtocol) -> Result<Self>;
}

macro_rules! impl_wire_scalar {
    ($ty:ty, $ttype:ident, $write:ident, $read:ident) => {
        impl Wire for $ty {
            const TTYPE: TType = TType::$ttype;

            fn write_wire(&self, p: &mut dyn TOutputProtocol) -> Result<()> {
                Ok(p.$write(*self)?)
            }

            fn read_wire(p: &mut dyn TInputProtocol) -> Result<Self> {
                Ok(p.$read()?)
            }
        }
    };
}

impl_wire_scalar!(bool, Bool, write_bool, read_bool);
impl_wire_scalar!(i8, Byte, write_i8, read_i8);
impl_wire_scalar!(i16, I16, write_i16, read_i16);
impl_wire_scalar!(i32, I32, write_i32, read_i32);
impl_wire_scalar!(i64, I64, write_i64, read_i64);
impl_wire_scalar!(f64, Double, write_double, read_double);

impl Wire for String {
    const TTYPE: TType = TType::String;

    fn write_wire(&self, p: &mut dyn TOutputProtocol) -> Result<()> {
        Ok(p.write_string(self)?)
    }

    fn read_wire(p: &mut dyn TInputProtocol) -> Result<Self> {
        Ok(p.read_string()?)
    }
}

impl Wire for Bytes {
    const TTYPE: TType = TType::String;

    fn write_wire(&self, p: &mut dyn TOutputProtocol) -> Result<()> {
        Ok(p.write_bytes(self)?)
    }

    fn read_wire(p: &mut dyn TInputProtocol) -> Result<Self> {
        Ok(Bytes::from(p.read_bytes()?))
    }
}

impl Wire for Message {
    const TTYPE: TType = TType::Struct;

    fn write_wire(&self, p: &mut dyn TOutputProtocol) -> Result<()> {
        self.write(p)
    }

    fn read_wire(p: &mut dyn TInputProtocol) -> Result<Self> {
        let mut message = Message::default();
        message.read(p)?;
        Ok(message)
    }
}

/// Rejects a non-empty collection whose wire element type differs from the static one.
pub(crate) fn check_wire_type(expected: TType, actual: Option<WireType>, size: usize) -> Result<()> {
    if size > 0 && actual != Some(WireType::from(expected)) {
        return Err(ThriftError::TypeMismatch {
            expected,
            actual: actual.map_or("none", wire_type_name),
        });
    }
    Ok(())
}

fn wire_type_name(wire: WireType) -> &'static str {
    match TType::try_from(wire) {
        Ok(TType::Stop) => "stop",
        Ok(TType::Void) => "void",
        Ok(TType::Bool) => "bool",
        Ok(TType::Byte) => "byte",
        Ok(TType::Double) => "double",
        Ok(TType::I16) => "i16",
        Ok(TType::I32) => "i32",
        Ok(TType::I64) => "i64",
        Ok(TType::String) => "string",
        Ok(TType::Struct) => "struct",
        Ok(TType::Map) => "map",
        Ok(TType::Set) => "set",
        Ok(TType::List) => "list",
        Err(_) => "unsupported",
    }
}

/// Bounds up-front allocation for sizes announced by the wire.
pub(crate) const PREALLOC_LIMIT: usize = 1024;

// --- Vec<T> ---
/// Encodes a `Vec<T>` as a Thrift list.
impl<T: Wire> Wire for Vec<T> {
    const TTYPE: TType = TType::List;

    fn write_wire(&self, p: &mut dyn TOutputProtocol) -> Result<()> {
        p.write_list_begin(&TListIdentifier::new(WireType::from(T::TTYPE), wire_size(self.len())?))?;
        for item in self {
            item.write_wire(p)?;
        }
        Ok(p.write_list_end()?)
    }

    fn read_wire(p: &mut dyn TInputProtocol) -> Result<Self> {
        let ident = p.read_list_begin()?;
        let size = collection_size(ident.size)?;
        check_wire_type(T::TTYPE, Some(ident.element_type), size)?;
        let mut items = Vec::with_capacity(size.min(PREALLOC_LIMIT));
        for _ in 0..size {
            items.push(T::read_wire(p)?);
        }
        p.read_list_end()?;
        Ok(items)
    }
}

// --- HashSet, BTreeSet ---
impl<T: Wire + Eq + Hash, S: BuildHasher + Default> Wire for HashSet<T, S> {
    const TTYPE: TType = TType::Set;

    fn write_wire(&self, p: &mut dyn TOutputProtocol) -> Result<()> {
        p.write_set_begin(&TSetIdentifier::new(WireType::from(T::TTYPE), wire_size(self.len())?))?;
        for item in self {
            item.write_wire(p)?;
        }
        Ok(p.write_set_end()?)
    }

    fn read_wire(p: &mut dyn TInputProtocol) -> Result<Self> {
        let ident = p.read_set_begin()?;
        let size = collection_size(ident.size)?;
        check_wire_type(T::TTYPE, Some(ident.element_type), size)?;
        let mut items = HashSet::with_capacity_and_hasher(size.min(PREALLOC_LIMIT), S::default());
        for _ in 0..size {
            items.insert(T::read_wire(p)?);
        }
        p.read_set_end()?;
        Ok(items)
    }
}

impl<T: Wire + Ord> Wire for BTreeSet<T> {
    const TTYPE: TType = TType::Set;

    fn write_wire(&self, p: &mut dyn TOutputProtocol) -> Result<()> {
        p.write_set_begin(&TSetIdentifier::new(WireType::from(T::TTYPE), wire_size(self.len())?))?;
        for item in self {
            item.write_wire(p)?;
        }
        Ok(p.write_set_end()?)
    }

    fn read_wire(p: &mut dyn TInputProtocol) -> Result<Self> {
        let ident = p.read_set_begin()?;
        let size = collection_size(ident.size)?;
        check_wire_type(T::TTYPE, Some(ident.element_type), size)?;
        let mut items = BTreeSet::new();
        for _ in 0..size {
            items.insert(T::read_wire(p)?);
        }
        p.read_set_end()?;
        Ok(items)
    }
}

pub(crate) fn map_identifier(key_type: TType, value_type: TType, len: usize) -> Result<TMapIdentifier> {
    Ok(TMapIdentifier::new(
        WireType::from(key_type),
        WireType::from(value_type),
        wire_size(len)?,
    ))
}

// --- HashMap, BTreeMap ---
impl<K: Wire + Eq + Hash, V: Wire, S: BuildHasher + Default> Wire for HashMap<K, V, S> {
    const TTYPE: TType = TType::Map;

    fn write_wire(&self, p: &mut dyn TOutputProtocol) -> Result<()> {
        p.write_map_begin(&map_identifier(K::TTYPE, V::TTYPE, self.len())?)?;
        for (k, v) in self {
            k.write_wire(p)?;
            v.write_wire(p)?;
        }
        Ok(p.write_map_end()?)
    }

    fn read_wire(p: &mut dyn TInputProtocol) -> Result<Self> {
        let ident = p.read_map_begin()?;
        let size = collection_size(ident.size)?;
        check_wire_type(K::TTYPE, ident.key_type, size)?;
        check_wire_type(V::TTYPE, ident.value_type, size)?;
        let mut map = HashMap::with_capacity_and_hasher(size.min(PREALLOC_LIMIT), S::default());
        for _ in 0..size {
            let k = K::read_wire(p)?;
            let v = V::read_wire(p)?;
            map.insert(k, v);
        }
        p.read_map_end()?;
        Ok(map)
    }
}

impl<K: Wire + Ord, V: Wire> Wire for BTreeMap<K, V> {
    const TTYPE: TType = TType::Map;

    fn write_wire(&self, p: &mut dyn TOutputProtocol) -> Result<()> {
        p.write_map_begin(&map_identifier(K::TTYPE, V::TTYPE, self.len())?)?;
        for (k, v) in self {
            k.write_wire(p)?;
            v.write_wire(p)?;
        }
        Ok(p.write_map_end()?)
    }

    fn read_wire(p: &mut dyn TInputProtocol) -> Result<Self> {
        let ident = p.read_map_begin()?;
        let size = collection_size(ident.size)?;
        check_wire_type(K::TTYPE, ident.key_type, size)?;
        check_wire_type(V::TTYPE, ident.value_type, size)?;
        let mut map = BTreeMap::new();
        for _ in 0..size {
            let k = K::read_wire(p)?;
            let v = V::read_wire(p)?;
            map.insert(k, v);
        }
        p.read_map_end()?;
        Ok(map)
    }
}
