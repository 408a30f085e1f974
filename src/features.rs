#[cfg(feature = "indexmap")]
use indexmap::{IndexMap, IndexSet};

#[allow(unused_imports)]
use crate::core::*;
#[allow(unused_imports)]
use crate::protocol::{collection_size, wire_size, TInputProtocol, TOutputProtocol, TSetIdentifier};
#[allow(unused_imports)]
use crate::*;

// --- IndexSet ---
#[cfg(feature = "indexmap")]
impl<T: Wire + Eq + std::hash::Hash> Wire for IndexSet<T> {
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
        let mut items = IndexSet::with_capacity(size.min(PREALLOC_LIMIT));
        for _ in 0..size {
            items.insert(T::read_wire(p)?);
        }
        p.read_set_end()?;
        Ok(items)
    }
}

// --- IndexMap ---
#[cfg(feature = "indexmap")]
impl<K: Wire + Eq + std::hash::Hash, V: Wire> Wire for IndexMap<K, V> {
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
        let mut map = IndexMap::with_capacity(size.min(PREALLOC_LIMIT));
        for _ in 0..size {
            let k = K::read_wire(p)?;
            let v = V::read_wire(p)?;
            map.insert(k, v);
        }
        p.read_map_end()?;
        Ok(map)
    }
}

#[cfg(feature = "indexmap")]
impl Map {
    /// Builds an ordered map from an `IndexMap`, keeping its iteration order.
    pub fn from_index_map<K, V>(key_type: TType, value_type: TType, entries: IndexMap<K, V>) -> Result<Self>
    where
        K: Into<Value>,
        V: Into<Value>,
    {
        Map::from_pairs(key_type, value_type, entries)
    }

    /// Collects the pairs into an `IndexMap`, keeping their order. Fails for non-scalar keys.
    pub fn to_index_map(&self) -> Result<IndexMap<MapKey, Value>> {
        self.iter()
            .map(|(k, v)| Ok((MapKey::try_from(k.clone())?, v.clone())))
            .collect()
    }
}

// --- serde_json ---
#[cfg(feature = "serde_json")]
impl Value {
    /// Renders the value as JSON for diagnostics.
    ///
    /// Maps become objects with stringified keys. Binary becomes an array of byte values and
    /// non-finite doubles become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Value::Bool(v) => Json::Bool(*v),
            Value::Byte(v) => Json::from(*v),
            Value::I16(v) => Json::from(*v),
            Value::I32(v) => Json::from(*v),
            Value::I64(v) => Json::from(*v),
            Value::Double(v) => serde_json::Number::from_f64(*v).map_or(Json::Null, Json::Number),
            Value::String(v) => Json::String(v.clone()),
            Value::Binary(v) => Json::Array(v.iter().map(|b| Json::from(*b)).collect()),
            Value::Struct(m) => m.to_json(),
            Value::List(l) => Json::Array(l.iter().map(Value::to_json).collect()),
            Value::Set(s) => Json::Array(s.iter().map(Value::to_json).collect()),
            Value::Map(m) => Json::Object(m.iter().map(|(k, v)| (json_key(k), v.to_json())).collect()),
            Value::UnorderedMap(m) => Json::Object(
                m.as_map()
                    .iter()
                    .map(|(k, v)| (json_key(&Value::from(k.clone())), v.to_json()))
                    .collect(),
            ),
        }
    }
}

#[cfg(feature = "serde_json")]
fn json_key(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => other.to_json().to_string(),
    }
}

#[cfg(feature = "serde_json")]
impl Message {
    /// Renders the message as a JSON object keyed by field id. Fields without a value are left out.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.fields()
                .iter()
                .filter_map(|f| f.value().map(|v| (f.id().to_string(), v.to_json())))
                .collect(),
        )
    }
}
