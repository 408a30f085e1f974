use std::collections::HashMap;

use thrift_dyn::protocol::{Config, TMapIdentifier};
use thrift_dyn::{
    Decoder, Encoder, Field, List, Map, MapKey, Message, ProtocolKind, Set, TOutputProtocol, TType,
    ThriftError, UnorderedMap, Value, WireType,
};

fn binary_bytes(f: impl FnOnce(&mut dyn TOutputProtocol)) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut p = ProtocolKind::Binary.output_protocol(&mut buf);
        f(&mut *p);
    }
    buf
}

fn single_field(ttype: TType, value: impl Into<Value>) -> Message {
    Message::new("Holder").with_field(Field::required(1, ttype, "v").with_value(value))
}

#[test]
fn test_list_rejects_wrong_element_kind() {
    let mut list = List::new(TType::I32).unwrap();
    list.push(1).unwrap();
    let err = list.push("two").unwrap_err();
    assert!(matches!(
        err,
        ThriftError::TypeMismatch {
            expected: TType::I32,
            actual: "string"
        }
    ));
    assert_eq!(list.len(), 1);
}

#[test]
fn test_unmodeled_element_types_are_rejected() {
    assert!(matches!(
        List::new(TType::Void),
        Err(ThriftError::UnsupportedType(WireType::Void))
    ));
    assert!(matches!(
        Set::new(TType::Stop),
        Err(ThriftError::UnsupportedType(WireType::Stop))
    ));
    assert!(matches!(
        Map::new(TType::Stop, TType::I32),
        Err(ThriftError::UnsupportedType(WireType::Stop))
    ));
    // Unordered map keys must be scalar
    assert!(matches!(
        UnorderedMap::new(TType::List, TType::I32),
        Err(ThriftError::UnsupportedType(WireType::List))
    ));
}

#[test]
fn test_declared_size_mismatch_on_write() {
    let mut list = List::with_items(TType::I64, [1i64, 2, 3]).unwrap();
    list.set_declared_size(Some(5));
    let message = single_field(TType::List, list);

    let err = Encoder::new(ProtocolKind::Binary).encode(&message).unwrap_err();
    assert!(matches!(
        err.root(),
        ThriftError::SizeMismatch {
            declared: 5,
            actual: 3
        }
    ));
}

#[test]
fn test_declared_size_follows_wire() {
    let list = List::with_items(TType::String, ["a", "b"]).unwrap();
    assert_eq!(list.declared_size(), None);

    let bytes = Encoder::new(ProtocolKind::Compact)
        .encode(&single_field(TType::List, list))
        .unwrap();
    let mut decoded = Message::default();
    Decoder::new(ProtocolKind::Compact).decode(&bytes, &mut decoded).unwrap();

    let read = decoded.value(1).and_then(Value::as_list).unwrap();
    assert_eq!(read.declared_size(), Some(2));
    assert_eq!(read.element_type(), TType::String);
    assert_eq!(read.items(), &[Value::from("a"), Value::from("b")]);
}

#[test]
fn test_unordered_map_duplicate_keys_on_read() {
    let bytes = binary_bytes(|p| {
        p.write_map_begin(&TMapIdentifier::new(WireType::I32, WireType::I32, 2))
            .unwrap();
        for (k, v) in [(1, 10), (1, 20)] {
            p.write_i32(k).unwrap();
            p.write_i32(v).unwrap();
        }
        p.write_map_end().unwrap();
    });

    let mut unordered = UnorderedMap::new(TType::I32, TType::I32).unwrap();
    let err = unordered
        .read(&mut ProtocolKind::Binary.input_protocol(&bytes[..], Config::default()))
        .unwrap_err();
    assert!(matches!(
        err,
        ThriftError::SizeMismatch {
            declared: 2,
            actual: 1
        }
    ));

    // The ordered map keeps both pairs in wire order
    let mut ordered = Map::new(TType::I32, TType::I32).unwrap();
    ordered
        .read(&mut ProtocolKind::Binary.input_protocol(&bytes[..], Config::default()))
        .unwrap();
    assert_eq!(
        ordered.pairs(),
        &[
            (Value::I32(1), Value::I32(10)),
            (Value::I32(1), Value::I32(20))
        ]
    );
    assert_eq!(ordered.get(&Value::I32(1)), Some(&Value::I32(10)));
}

#[test]
fn test_from_associative_sorts_keys() {
    let source: HashMap<i64, &str> = [(30, "c"), (-5, "a"), (10, "b")].into_iter().collect();
    let map = Map::from_associative(TType::I64, TType::String, source).unwrap();
    let keys: Vec<i64> = map.iter().filter_map(|(k, _)| k.as_i64()).collect();
    assert_eq!(keys, vec![-5, 10, 30]);

    let source: HashMap<String, i32> = [("pear".to_string(), 1), ("apple".to_string(), 2)]
        .into_iter()
        .collect();
    let map = Map::from_associative(TType::String, TType::I32, source).unwrap();
    assert_eq!(map.pairs()[0].0, Value::from("apple"));

    let source: HashMap<bool, i32> = [(true, 1), (false, 0)].into_iter().collect();
    let map = Map::from_associative(TType::Bool, TType::I32, source).unwrap();
    assert_eq!(map.pairs()[0].0, Value::Bool(false));
}

#[test]
fn test_canonical_maps_encode_deterministically() {
    let mut a = UnorderedMap::new(TType::String, TType::I64).unwrap();
    let mut b = UnorderedMap::new(TType::String, TType::I64).unwrap();
    for i in 0..32i64 {
        a.insert(format!("key{i}"), i).unwrap();
    }
    for i in (0..32i64).rev() {
        b.insert(format!("key{i}"), i).unwrap();
    }
    let encoder = Encoder::new(ProtocolKind::Binary);
    let a_bytes = encoder.encode(&single_field(TType::Map, a.to_ordered())).unwrap();
    let b_bytes = encoder.encode(&single_field(TType::Map, b.to_ordered())).unwrap();
    assert_eq!(a_bytes, b_bytes);
}

#[test]
fn test_unordered_map_round_trip() {
    let mut unordered = UnorderedMap::new(TType::I16, TType::Double).unwrap();
    for i in 0..10i16 {
        assert_eq!(unordered.insert(i, f64::from(i) / 2.0).unwrap(), None);
    }
    assert_eq!(
        unordered.insert(3i16, 9.0).unwrap(),
        Some(Value::Double(1.5))
    );
    assert!(unordered.insert("x", 1.0).is_err());

    for kind in [ProtocolKind::Binary, ProtocolKind::Compact] {
        let bytes = Encoder::new(kind)
            .encode(&single_field(TType::Map, unordered.clone()))
            .unwrap();
        let mut decoded = Message::default();
        Decoder::new(kind).decode(&bytes, &mut decoded).unwrap();

        // Reading yields an ordered map in wire order
        let map = decoded.value(1).and_then(Value::as_map).unwrap();
        assert_eq!(&map.to_associative().unwrap(), unordered.as_map());
        assert_eq!(map.get(&Value::I16(3)), Some(&Value::Double(9.0)));
    }
}

#[test]
fn test_unordered_map_read_directly() {
    let ordered = Map::from_pairs(TType::String, TType::Bool, [("on", true), ("off", false)]).unwrap();
    let bytes = binary_bytes(|p| ordered.write(p).unwrap());

    let mut unordered = UnorderedMap::new(TType::String, TType::Bool).unwrap();
    unordered
        .read(&mut ProtocolKind::Binary.input_protocol(&bytes[..], Config::default()))
        .unwrap();
    assert_eq!(unordered.len(), 2);
    assert_eq!(unordered.declared_size(), Some(2));
    assert_eq!(unordered.get(&MapKey::from("on")), Some(&Value::Bool(true)));
}

#[test]
fn test_empty_containers() {
    let message = Message::new("Empty")
        .with_field(Field::required(1, TType::List, "l").with_value(List::new(TType::I32).unwrap()))
        .with_field(Field::required(2, TType::Map, "m").with_value(Map::new(TType::String, TType::I32).unwrap()));

    let bytes = Encoder::new(ProtocolKind::Compact).encode(&message).unwrap();
    assert_eq!(&bytes[..], &[0x19, 0x05, 0x1b, 0x00, 0x00]);

    let bytes = Encoder::new(ProtocolKind::Binary).encode(&message).unwrap();
    assert_eq!(
        &bytes[..],
        &[
            0x0f, 0x00, 0x01, 0x08, 0x00, 0x00, 0x00, 0x00, 0x0d, 0x00, 0x02, 0x0b, 0x08, 0x00,
            0x00, 0x00, 0x00, 0x00
        ]
    );

    // An empty compact map carries no key/value types
    let mut decoded = Message::default();
    Decoder::new(ProtocolKind::Compact)
        .decode(&[0x19, 0x05, 0x1b, 0x00, 0x00], &mut decoded)
        .unwrap();
    let map = decoded.value(2).and_then(Value::as_map).unwrap();
    assert!(map.is_empty());
    assert_eq!(map.key_type(), TType::Stop);
    assert_eq!(decoded, message);
}

#[test]
fn test_empty_decoded_map_takes_first_pair_types() {
    let mut decoded = Message::default();
    Decoder::new(ProtocolKind::Compact)
        .decode(&[0x1b, 0x00, 0x00], &mut decoded)
        .unwrap();
    let mut map = decoded.value(1).and_then(Value::as_map).cloned().unwrap();
    assert_eq!((map.key_type(), map.value_type()), (TType::Stop, TType::Stop));

    map.insert("a", 1).unwrap();
    assert_eq!((map.key_type(), map.value_type()), (TType::String, TType::I32));
    // Once typed, the map holds to its types
    assert!(matches!(
        map.insert(2, 2),
        Err(ThriftError::TypeMismatch {
            expected: TType::String,
            ..
        })
    ));

    let bytes = Encoder::new(ProtocolKind::Binary)
        .encode(&single_field(TType::Map, map.clone()))
        .unwrap();
    let mut reread = Message::default();
    Decoder::new(ProtocolKind::Binary).decode(&bytes, &mut reread).unwrap();
    assert_eq!(reread.value(1), Some(&Value::Map(map)));
}

#[test]
fn test_empty_decoded_list_takes_first_element_type() {
    // field 1: empty list announced with an element type outside the model
    let bytes = [0x0fu8, 0x00, 0x01, 0x10, 0x00, 0x00, 0x00, 0x00, 0x00];
    let mut decoded = Message::default();
    Decoder::new(ProtocolKind::Binary).decode(&bytes, &mut decoded).unwrap();
    let mut list = decoded.value(1).and_then(Value::as_list).cloned().unwrap();
    assert_eq!(list.element_type(), TType::Stop);

    list.push(true).unwrap();
    assert_eq!(list.element_type(), TType::Bool);
    assert!(list.push(1i64).is_err());
}

#[test]
fn test_round_trip_equality_ignores_declared_size() {
    let list = List::with_items(TType::I32, [1, 2, 3]).unwrap();
    let map = Map::new(TType::String, TType::I32).unwrap();
    let message = Message::new("Holder")
        .with_field(Field::required(1, TType::List, "l").with_value(list.clone()))
        .with_field(Field::required(2, TType::Map, "m").with_value(map.clone()));

    for kind in [ProtocolKind::Binary, ProtocolKind::Compact] {
        let bytes = Encoder::new(kind).encode(&message).unwrap();
        let mut decoded = Message::default();
        Decoder::new(kind).decode(&bytes, &mut decoded).unwrap();

        assert_eq!(decoded.value(1), Some(&Value::List(list.clone())));
        assert_eq!(decoded.value(2), Some(&Value::Map(map.clone())));
        assert_eq!(decoded, message);
    }

    // Different items or element types still compare unequal
    let other = List::with_items(TType::I32, [1, 2]).unwrap();
    assert_ne!(list, other);
    assert_ne!(
        List::new(TType::I32).unwrap(),
        List::new(TType::I64).unwrap()
    );
}

#[test]
fn test_bool_set_compact_layout() {
    let set = Set::with_items(TType::Bool, [true, false]).unwrap();
    let bytes = Encoder::new(ProtocolKind::Compact)
        .encode(&single_field(TType::Set, set.clone()))
        .unwrap();
    assert_eq!(&bytes[..], &[0x1a, 0x21, 0x01, 0x02, 0x00]);

    let mut decoded = Message::default();
    Decoder::new(ProtocolKind::Compact).decode(&bytes, &mut decoded).unwrap();
    assert_eq!(decoded.value(1), Some(&Value::Set(set)));
}

#[test]
fn test_long_list_header() {
    let list = List::with_items(TType::Byte, (0..15).map(|i| i as i8)).unwrap();
    let bytes = Encoder::new(ProtocolKind::Compact)
        .encode(&single_field(TType::List, list))
        .unwrap();
    assert_eq!(&bytes[..3], &[0x19, 0xf3, 0x0f]);
    assert_eq!(bytes.len(), 3 + 15 + 1);
}

#[test]
fn test_deeply_nested_containers() {
    // map<string, list<set<i32>>>
    let mut inner = Set::new(TType::I32).unwrap();
    inner.push(7).unwrap();
    let middle = List::with_items(TType::Set, [inner]).unwrap();
    let map = Map::from_pairs(TType::String, TType::List, [("k", middle)]).unwrap();
    let message = single_field(TType::Map, map);

    for kind in [ProtocolKind::Binary, ProtocolKind::Compact] {
        let bytes = Encoder::new(kind).encode(&message).unwrap();
        let mut decoded = Message::default();
        Decoder::new(kind).decode(&bytes, &mut decoded).unwrap();

        let map = decoded.value(1).and_then(Value::as_map).unwrap();
        let middle = map.get(&Value::from("k")).and_then(Value::as_list).unwrap();
        let inner = middle.items()[0].as_set().unwrap();
        assert_eq!(inner.items(), &[Value::I32(7)]);
    }
}
