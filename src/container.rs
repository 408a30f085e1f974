//! Homogeneous containers: [`List`], [`Set`], insertion-ordered [`Map`], and hash-backed
//! [`UnorderedMap`].
//!
//! Every container records the wire type of its elements (or keys and values) and writes itself
//! by recursing through the same type-directed dispatch used for field values.

use std::collections::{BTreeMap, HashMap};

use crate::core::{map_identifier, read_element, write_value, PREALLOC_LIMIT};
use crate::protocol::{
    collection_size, wire_size, TInputProtocol, TListIdentifier, TOutputProtocol, TSetIdentifier,
    WireType,
};
use crate::{MapKey, Result, TType, ThriftError, Value};

fn check_element_type(ttype: TType) -> Result<()> {
    if ttype.is_element() {
        Ok(())
    } else {
        Err(ThriftError::UnsupportedType(ttype.into()))
    }
}

fn check_key_type(ttype: TType) -> Result<()> {
    if ttype.is_scalar() {
        Ok(())
    } else {
        Err(ThriftError::UnsupportedType(ttype.into()))
    }
}

/// Resolves a type announced by a container header.
///
/// An empty container accepts any header type and records `Stop` when the announced type is not
/// usable; the first element added afterwards sets the type.
fn header_type(wire: Option<WireType>, size: usize, check: fn(TType) -> Result<()>) -> Result<TType> {
    if size == 0 {
        return Ok(wire
            .and_then(|wire| TType::try_from(wire).ok())
            .filter(|ttype| check(*ttype).is_ok())
            .unwrap_or(TType::Stop));
    }
    let ttype = TType::try_from(wire.unwrap_or(WireType::Stop))?;
    check(ttype)?;
    Ok(ttype)
}

/// The type an empty container takes on when its first element arrives.
fn adopt(current: TType, empty: bool, value_type: TType) -> TType {
    if empty && current == TType::Stop {
        value_type
    } else {
        current
    }
}

/// `Stop` on an empty container means the type was never known, so it matches any type.
fn same_type(a: TType, b: TType, empty: bool) -> bool {
    a == b || (empty && (a == TType::Stop || b == TType::Stop))
}

fn check_kind(expected: TType, value: &Value) -> Result<()> {
    if value.matches(expected) {
        Ok(())
    } else {
        Err(ThriftError::TypeMismatch {
            expected,
            actual: value.kind_name(),
        })
    }
}

fn check_size(declared: Option<usize>, actual: usize) -> Result<()> {
    match declared {
        Some(declared) if declared != actual => Err(ThriftError::SizeMismatch { declared, actual }),
        _ => Ok(()),
    }
}

macro_rules! impl_sequence {
    ($(#[$doc:meta])* $name:ident, $ident:ident, $write_begin:ident, $write_end:ident, $read_begin:ident, $read_end:ident) => {
        $(#[$doc])*
        ///
        /// Equality compares element types and items; the declared size is not part of it.
        #[derive(Debug, Clone)]
        pub struct $name {
            element_type: TType,
            declared_size: Option<usize>,
            items: Vec<Value>,
        }

        impl $name {
            /// Creates an empty container of `element_type` elements.
            ///
            /// Fails with `UnsupportedType` for wire types that are not valid element kinds.
            pub fn new(element_type: TType) -> Result<Self> {
                check_element_type(element_type)?;
                Ok($name {
                    element_type,
                    declared_size: None,
                    items: Vec::new(),
                })
            }

            /// Placeholder filled in by `read`.
            pub(crate) fn empty() -> Self {
                $name {
                    element_type: TType::Stop,
                    declared_size: None,
                    items: Vec::new(),
                }
            }

            /// Creates a container holding `items`, all of which must be of `element_type`.
            pub fn with_items<I, V>(element_type: TType, items: I) -> Result<Self>
            where
                I: IntoIterator<Item = V>,
                V: Into<Value>,
            {
                let mut container = Self::new(element_type)?;
                for item in items {
                    container.push(item)?;
                }
                Ok(container)
            }

            /// Appends an element. Clears any declared size.
            ///
            /// An empty container read from the wire without a usable element type takes the
            /// type of the first element.
            pub fn push(&mut self, value: impl Into<Value>) -> Result<()> {
                let value = value.into();
                let element_type = adopt(self.element_type, self.items.is_empty(), value.ttype());
                check_kind(element_type, &value)?;
                self.element_type = element_type;
                self.items.push(value);
                self.declared_size = None;
                Ok(())
            }

            pub fn element_type(&self) -> TType {
                self.element_type
            }

            pub fn items(&self) -> &[Value] {
                &self.items
            }

            pub fn iter(&self) -> std::slice::Iter<'_, Value> {
                self.items.iter()
            }

            pub fn into_items(self) -> Vec<Value> {
                self.items
            }

            pub fn len(&self) -> usize {
                self.items.len()
            }

            pub fn is_empty(&self) -> bool {
                self.items.is_empty()
            }

            /// The size announced by the wire on the last read, or set by the caller.
            pub fn declared_size(&self) -> Option<usize> {
                self.declared_size
            }

            /// Pins the size the container claims to hold. Writing fails with
            /// `SizeMismatch` if it disagrees with the actual element count.
            pub fn set_declared_size(&mut self, size: Option<usize>) {
                self.declared_size = size;
            }

            pub fn write(&self, p: &mut dyn TOutputProtocol) -> Result<()> {
                check_size(self.declared_size, self.items.len())?;
                p.$write_begin(&$ident::new(
                    WireType::from(self.element_type),
                    wire_size(self.items.len())?,
                ))?;
                for item in &self.items {
                    write_value(p, self.element_type, item)?;
                }
                Ok(p.$write_end()?)
            }

            /// Replaces the contents with the container read from the protocol.
            pub fn read(&mut self, p: &mut dyn TInputProtocol) -> Result<()> {
                let ident = p.$read_begin()?;
                let size = collection_size(ident.size)?;
                self.element_type = header_type(Some(ident.element_type), size, check_element_type)?;
                self.declared_size = Some(size);
                self.items.clear();
                self.items.reserve(size.min(PREALLOC_LIMIT));
                for _ in 0..size {
                    self.items.push(read_element(p, self.element_type)?);
                }
                Ok(p.$read_end()?)
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                same_type(self.element_type, other.element_type, self.items.is_empty())
                    && self.items == other.items
            }
        }

        impl<'a> IntoIterator for &'a $name {
            type Item = &'a Value;
            type IntoIter = std::slice::Iter<'a, Value>;

            fn into_iter(self) -> Self::IntoIter {
                self.items.iter()
            }
        }
    };
}

impl_sequence!(
    /// A Thrift list: an ordered sequence of elements of one wire type.
    List,
    TListIdentifier,
    write_list_begin,
    write_list_end,
    read_list_begin,
    read_list_end
);

impl_sequence!(
    /// A Thrift set, kept in insertion order.
    ///
    /// Elements are not deduplicated; the wire format carries a set as a plain sequence.
    Set,
    TSetIdentifier,
    write_set_begin,
    write_set_end,
    read_set_begin,
    read_set_end
);

/// A Thrift map that preserves insertion order, and wire order after a read.
///
/// Keys may be of any element kind, including structs and containers. Equality compares key
/// and value types and the pairs in order; the declared size is not part of it.
#[derive(Debug, Clone)]
pub struct Map {
    key_type: TType,
    value_type: TType,
    declared_size: Option<usize>,
    pairs: Vec<(Value, Value)>,
}

impl Map {
    pub fn new(key_type: TType, value_type: TType) -> Result<Self> {
        check_element_type(key_type)?;
        check_element_type(value_type)?;
        Ok(Map {
            key_type,
            value_type,
            declared_size: None,
            pairs: Vec::new(),
        })
    }

    pub(crate) fn empty() -> Self {
        Map {
            key_type: TType::Stop,
            value_type: TType::Stop,
            declared_size: None,
            pairs: Vec::new(),
        }
    }

    /// Builds a map from pairs, keeping their order.
    pub fn from_pairs<I, K, V>(key_type: TType, value_type: TType, pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Value>,
        V: Into<Value>,
    {
        let mut map = Map::new(key_type, value_type)?;
        for (k, v) in pairs {
            map.insert(k, v)?;
        }
        Ok(map)
    }

    /// Builds a map from an unordered source, emitting pairs in canonical key order.
    ///
    /// Duplicate keys keep the last value.
    pub fn from_associative<I, K, V>(key_type: TType, value_type: TType, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<MapKey>,
        V: Into<Value>,
    {
        let sorted: BTreeMap<MapKey, Value> = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Map::from_pairs(key_type, value_type, sorted.into_iter().map(|(k, v)| (Value::from(k), v)))
    }

    /// Appends a pair. Keys are not deduplicated. Clears any declared size.
    ///
    /// An empty map read from the wire without usable key or value types takes them from the
    /// first pair.
    pub fn insert(&mut self, key: impl Into<Value>, value: impl Into<Value>) -> Result<()> {
        let key = key.into();
        let value = value.into();
        let empty = self.pairs.is_empty();
        let key_type = adopt(self.key_type, empty, key.ttype());
        let value_type = adopt(self.value_type, empty, value.ttype());
        check_kind(key_type, &key)?;
        check_kind(value_type, &value)?;
        self.key_type = key_type;
        self.value_type = value_type;
        self.pairs.push((key, value));
        self.declared_size = None;
        Ok(())
    }

    /// Collects the pairs into a hash map. Fails for non-scalar keys.
    pub fn to_associative(&self) -> Result<HashMap<MapKey, Value>> {
        self.pairs
            .iter()
            .map(|(k, v)| Ok((MapKey::try_from(k.clone())?, v.clone())))
            .collect()
    }

    /// Returns the value of the first pair whose key equals `key`.
    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn key_type(&self) -> TType {
        self.key_type
    }

    pub fn value_type(&self) -> TType {
        self.value_type
    }

    pub fn pairs(&self) -> &[(Value, Value)] {
        &self.pairs
    }

    pub fn iter(&self) -> std::slice::Iter<'_, (Value, Value)> {
        self.pairs.iter()
    }

    pub fn into_pairs(self) -> Vec<(Value, Value)> {
        self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn declared_size(&self) -> Option<usize> {
        self.declared_size
    }

    pub fn set_declared_size(&mut self, size: Option<usize>) {
        self.declared_size = size;
    }

    pub fn write(&self, p: &mut dyn TOutputProtocol) -> Result<()> {
        check_size(self.declared_size, self.pairs.len())?;
        p.write_map_begin(&map_identifier(self.key_type, self.value_type, self.pairs.len())?)?;
        for (k, v) in &self.pairs {
            write_value(p, self.key_type, k)?;
            write_value(p, self.value_type, v)?;
        }
        Ok(p.write_map_end()?)
    }

    pub fn read(&mut self, p: &mut dyn TInputProtocol) -> Result<()> {
        let ident = p.read_map_begin()?;
        let size = collection_size(ident.size)?;
        self.key_type = header_type(ident.key_type, size, check_element_type)?;
        self.value_type = header_type(ident.value_type, size, check_element_type)?;
        self.declared_size = Some(size);
        self.pairs.clear();
        self.pairs.reserve(size.min(PREALLOC_LIMIT));
        for _ in 0..size {
            let k = read_element(p, self.key_type)?;
            let v = read_element(p, self.value_type)?;
            self.pairs.push((k, v));
        }
        Ok(p.read_map_end()?)
    }
}

impl PartialEq for Map {
    fn eq(&self, other: &Self) -> bool {
        let empty = self.pairs.is_empty();
        same_type(self.key_type, other.key_type, empty)
            && same_type(self.value_type, other.value_type, empty)
            && self.pairs == other.pairs
    }
}

impl<'a> IntoIterator for &'a Map {
    type Item = &'a (Value, Value);
    type IntoIter = std::slice::Iter<'a, (Value, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairs.iter()
    }
}

/// A Thrift map backed by a `HashMap`. Write order is unspecified.
///
/// Keys are restricted to scalar kinds.
#[derive(Debug, Clone)]
pub struct UnorderedMap {
    key_type: TType,
    value_type: TType,
    declared_size: Option<usize>,
    entries: HashMap<MapKey, Value>,
}

impl UnorderedMap {
    pub fn new(key_type: TType, value_type: TType) -> Result<Self> {
        check_key_type(key_type)?;
        check_element_type(value_type)?;
        Ok(UnorderedMap {
            key_type,
            value_type,
            declared_size: None,
            entries: HashMap::new(),
        })
    }

    pub fn from_map(key_type: TType, value_type: TType, entries: HashMap<MapKey, Value>) -> Result<Self> {
        let mut map = UnorderedMap::new(key_type, value_type)?;
        map.entries.reserve(entries.len());
        for (k, v) in entries {
            map.insert(k, v)?;
        }
        Ok(map)
    }

    /// Inserts a pair, returning the value previously stored under `key`.
    pub fn insert(&mut self, key: impl Into<MapKey>, value: impl Into<Value>) -> Result<Option<Value>> {
        let key = key.into();
        let value = value.into();
        let empty = self.entries.is_empty();
        let key_type = adopt(self.key_type, empty, key.ttype());
        let value_type = adopt(self.value_type, empty, value.ttype());
        if key.ttype() != key_type {
            return Err(ThriftError::TypeMismatch {
                expected: key_type,
                actual: Value::from(key).kind_name(),
            });
        }
        check_kind(value_type, &value)?;
        self.key_type = key_type;
        self.value_type = value_type;
        self.declared_size = None;
        Ok(self.entries.insert(key, value))
    }

    pub fn get(&self, key: &MapKey) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn as_map(&self) -> &HashMap<MapKey, Value> {
        &self.entries
    }

    pub fn into_map(self) -> HashMap<MapKey, Value> {
        self.entries
    }

    pub fn key_type(&self) -> TType {
        self.key_type
    }

    pub fn value_type(&self) -> TType {
        self.value_type
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn declared_size(&self) -> Option<usize> {
        self.declared_size
    }

    pub fn set_declared_size(&mut self, size: Option<usize>) {
        self.declared_size = size;
    }

    /// Returns an ordered [`Map`] with the same entries in canonical key order.
    pub fn to_ordered(&self) -> Map {
        let mut sorted: Vec<(&MapKey, &Value)> = self.entries.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));
        Map {
            key_type: self.key_type,
            value_type: self.value_type,
            declared_size: None,
            pairs: sorted
                .into_iter()
                .map(|(k, v)| (Value::from(k.clone()), v.clone()))
                .collect(),
        }
    }

    pub fn write(&self, p: &mut dyn TOutputProtocol) -> Result<()> {
        check_size(self.declared_size, self.entries.len())?;
        p.write_map_begin(&map_identifier(self.key_type, self.value_type, self.entries.len())?)?;
        for (k, v) in &self.entries {
            k.write(p, self.key_type)?;
            write_value(p, self.value_type, v)?;
        }
        Ok(p.write_map_end()?)
    }

    /// Replaces the contents with the map read from the protocol.
    ///
    /// Repeated keys on the wire leave fewer entries than announced, which is a `SizeMismatch`.
    pub fn read(&mut self, p: &mut dyn TInputProtocol) -> Result<()> {
        let ident = p.read_map_begin()?;
        let size = collection_size(ident.size)?;
        self.key_type = header_type(ident.key_type, size, check_key_type)?;
        self.value_type = header_type(ident.value_type, size, check_element_type)?;
        self.declared_size = Some(size);
        self.entries.clear();
        self.entries.reserve(size.min(PREALLOC_LIMIT));
        for _ in 0..size {
            let k = MapKey::try_from(read_element(p, self.key_type)?)?;
            let v = read_element(p, self.value_type)?;
            self.entries.insert(k, v);
        }
        check_size(self.declared_size, self.entries.len())?;
        Ok(p.read_map_end()?)
    }
}

impl PartialEq for UnorderedMap {
    fn eq(&self, other: &Self) -> bool {
        let empty = self.entries.is_empty();
        same_type(self.key_type, other.key_type, empty)
            && same_type(self.value_type, other.value_type, empty)
            && self.entries == other.entries
    }
}
