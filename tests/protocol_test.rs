use thrift::protocol::{TCompactInputProtocol, TFieldIdentifier, TListIdentifier, TMapIdentifier};
use thrift::ProtocolErrorKind;
use thrift_dyn::protocol::{BoundedInputProtocol, Config};
use thrift_dyn::{
    Message, ProtocolKind, TInputProtocol, TOutputProtocol, TType, ThriftError, WireType,
};

fn encode_with(kind: ProtocolKind, f: impl FnOnce(&mut dyn TOutputProtocol)) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut p = kind.output_protocol(&mut buf);
        f(&mut *p);
    }
    buf
}

fn protocol_error_kind(err: &ThriftError) -> Option<&ProtocolErrorKind> {
    match err.root() {
        ThriftError::Protocol(thrift::Error::Protocol(e)) => Some(&e.kind),
        _ => None,
    }
}

#[test]
fn test_protocol_kind_from_str() {
    assert_eq!("binary".parse::<ProtocolKind>().unwrap(), ProtocolKind::Binary);
    assert_eq!("TBinary".parse::<ProtocolKind>().unwrap(), ProtocolKind::Binary);
    assert_eq!("compact".parse::<ProtocolKind>().unwrap(), ProtocolKind::Compact);
    assert_eq!("tcompact".parse::<ProtocolKind>().unwrap(), ProtocolKind::Compact);
    assert!(matches!(
        "json".parse::<ProtocolKind>(),
        Err(ThriftError::UnknownProtocol(s)) if s == "json"
    ));
    assert_eq!(ProtocolKind::default(), ProtocolKind::Compact);
    assert_eq!(ProtocolKind::Binary.to_string(), "binary");
}

#[test]
fn test_ttype_wire_mapping() {
    assert_eq!(WireType::from(TType::Byte), WireType::I08);
    assert_eq!(WireType::from(TType::String), WireType::String);
    assert_eq!(TType::try_from(WireType::I08).unwrap(), TType::Byte);
    assert_eq!(TType::try_from(WireType::Map).unwrap(), TType::Map);
    assert!(matches!(
        TType::try_from(WireType::Utf16),
        Err(ThriftError::UnsupportedType(WireType::Utf16))
    ));
    assert_eq!(TType::Map as u8, 13);
}

fn write_sample(p: &mut dyn TOutputProtocol) {
    p.write_map_begin(&TMapIdentifier::new(WireType::String, WireType::List, 2))
        .unwrap();
    for (key, items) in [("a", vec![1, -1]), ("b", vec![])] {
        p.write_string(key).unwrap();
        p.write_list_begin(&TListIdentifier::new(WireType::I32, items.len() as i32))
            .unwrap();
        for i in items {
            p.write_i32(i).unwrap();
        }
        p.write_list_end().unwrap();
    }
    p.write_map_end().unwrap();
    p.write_bytes(&[0xc3, 0x28]).unwrap();
    p.write_i32(42).unwrap();
}

#[test]
fn test_skip_nested_and_non_utf8() {
    for kind in [ProtocolKind::Binary, ProtocolKind::Compact] {
        let bytes = encode_with(kind, write_sample);
        let mut input = kind.input_protocol(&bytes[..], Config::default());
        input.skip(WireType::Map).unwrap();
        input.skip(WireType::String).unwrap();
        assert_eq!(input.read_i32().unwrap(), 42, "{kind}");
        assert_eq!(input.depth(), 0);
    }
}

#[test]
fn test_skip_utf8_field_type() {
    let bytes = [0u8, 0, 0, 2, b'h', b'i', 0, 0, 0, 42];
    let mut input = ProtocolKind::Binary.input_protocol(&bytes[..], Config::default());
    input.skip(WireType::Utf8).unwrap();
    assert_eq!(input.read_i32().unwrap(), 42);
}

#[test]
fn test_skip_rejects_stop() {
    let mut input = ProtocolKind::Binary.input_protocol(&[0u8; 0][..], Config::default());
    assert!(input.skip(WireType::Stop).is_err());
}

#[test]
fn test_negative_size() {
    // field 1: list<i32> with size -1
    let bytes = [0x0fu8, 0x00, 0x01, 0x08, 0xff, 0xff, 0xff, 0xff];
    let err = thrift_dyn::decode::<Message>(ProtocolKind::Binary, &bytes).unwrap_err();
    assert!(matches!(
        protocol_error_kind(&err),
        Some(ProtocolErrorKind::NegativeSize)
    ));
}

#[test]
fn test_invalid_type_id() {
    let bytes = [0x05u8, 0x00, 0x01];
    let err = thrift_dyn::decode::<Message>(ProtocolKind::Binary, &bytes).unwrap_err();
    assert!(matches!(
        err.root(),
        ThriftError::Protocol(thrift::Error::Protocol(_))
    ));
}

#[test]
fn test_container_size_limit() {
    let bytes = encode_with(ProtocolKind::Compact, |p| {
        p.write_list_begin(&TListIdentifier::new(WireType::I08, 100))
            .unwrap();
    });

    let mut input = BoundedInputProtocol::new(
        TCompactInputProtocol::new(&bytes[..]),
        Config::default().with_max_container_size(10),
    );
    let err = ThriftError::from(input.read_list_begin().unwrap_err());
    assert!(matches!(
        protocol_error_kind(&err),
        Some(ProtocolErrorKind::SizeLimit)
    ));
}

#[test]
fn test_compact_empty_map_has_no_types() {
    let mut input = ProtocolKind::Compact.input_protocol(&[0x00u8][..], Config::default());
    let ident = input.read_map_begin().unwrap();
    assert_eq!(ident.size, 0);
    assert_eq!(ident.key_type, None);
    assert_eq!(ident.value_type, None);
}

#[test]
fn test_binary_field_header_layout() {
    let bytes = encode_with(ProtocolKind::Binary, |p| {
        p.write_field_begin(&TFieldIdentifier::new("f", WireType::I16, -2i16))
            .unwrap();
        p.write_i16(-1).unwrap();
        p.write_field_end().unwrap();
        p.write_field_stop().unwrap();
    });
    assert_eq!(&bytes[..], &[0x06, 0xff, 0xfe, 0xff, 0xff, 0x00]);

    let mut input = ProtocolKind::Binary.input_protocol(&bytes[..], Config::default());
    let ident = input.read_field_begin().unwrap();
    assert_eq!(
        (ident.field_type, ident.id, ident.name),
        (WireType::I16, Some(-2), None)
    );
    assert_eq!(input.read_i16().unwrap(), -1);
    assert_eq!(input.read_field_begin().unwrap().field_type, WireType::Stop);
}
