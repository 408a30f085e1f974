#[cfg(feature = "indexmap")]
use indexmap::{IndexMap, IndexSet};
#[cfg(feature = "serde_json")]
use serde_json::json;
#[allow(unused_imports)]
use thrift_dyn::{Encoder, Field, List, Map, Message, ProtocolKind, TType, ThriftStruct, Value};

#[cfg(feature = "indexmap")]
#[derive(ThriftStruct, Default, Debug, PartialEq)]
struct Indexed {
    #[thrift(id = 1)]
    names: IndexSet<String>,
    #[thrift(id = 2)]
    scores: IndexMap<String, i32>,
}

#[cfg(feature = "indexmap")]
#[test]
fn test_indexmap_keeps_order() {
    let value = Indexed {
        names: ["zeta", "alpha"].into_iter().map(String::from).collect(),
        scores: [("z".to_string(), 1), ("a".to_string(), 2)].into_iter().collect(),
    };
    for kind in [ProtocolKind::Binary, ProtocolKind::Compact] {
        let bytes = Encoder::new(kind).encode(&value).unwrap();
        let decoded: Indexed = thrift_dyn::decode(kind, &bytes).unwrap();
        assert_eq!(decoded, value);
        assert_eq!(decoded.names.get_index(0).map(String::as_str), Some("zeta"));

        // Same bytes as the dynamic ordered map built from the IndexMap
        let dynamic = Message::new("Indexed")
            .with_field(
                Field::required(1, TType::Set, "names")
                    .with_value(thrift_dyn::Set::with_items(TType::String, ["zeta", "alpha"]).unwrap()),
            )
            .with_field(
                Field::required(2, TType::Map, "scores")
                    .with_value(Map::from_index_map(TType::String, TType::I32, value.scores.clone()).unwrap()),
            );
        assert_eq!(Encoder::new(kind).encode(&dynamic).unwrap(), bytes);
    }
}

#[cfg(feature = "indexmap")]
#[test]
fn test_map_to_index_map() {
    let map = Map::from_pairs(TType::I64, TType::String, [(3i64, "c"), (1, "a")]).unwrap();
    let index_map = map.to_index_map().unwrap();
    let keys: Vec<_> = index_map.keys().cloned().collect();
    assert_eq!(keys, vec![thrift_dyn::MapKey::I64(3), thrift_dyn::MapKey::I64(1)]);
}

#[cfg(feature = "serde_json")]
#[test]
fn test_message_to_json() {
    let inner = Message::new("Inner").with_field(Field::required(1, TType::Double, "d").with_value(f64::NAN));
    let message = Message::new("Outer")
        .with_field(Field::required(1, TType::String, "s").with_value("hi"))
        .with_field(Field::required(2, TType::List, "l").with_value(List::with_items(TType::I16, [1i16, 2]).unwrap()))
        .with_field(
            Field::required(3, TType::Map, "m")
                .with_value(Map::from_pairs(TType::I32, TType::Bool, [(7, true)]).unwrap()),
        )
        .with_field(Field::required(4, TType::Struct, "inner").with_value(inner))
        .with_field(Field::required(5, TType::String, "b").with_value(vec![0xffu8, 1]))
        .with_field(Field::optional(6, TType::I64, "absent"));

    assert_eq!(
        message.to_json(),
        json!({
            "1": "hi",
            "2": [1, 2],
            "3": {"7": true},
            "4": {"1": null},
            "5": [255, 1],
        })
    );
    assert_eq!(Value::I64(-4).to_json(), json!(-4));
}
