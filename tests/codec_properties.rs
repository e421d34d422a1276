//! Codec round-trip and range properties

mod common;

use num_bigint::BigUint;
use proptest::prelude::*;

use zkir_contract_runtime::codec::{
    CompactBoolean, CompactBytes, CompactField, CompactMaybe, CompactType, CompactUnsignedInteger,
    CompactVector, OpaqueString, ValueReader,
};
use zkir_contract_runtime::types::{AlignedValue, Alignment, Value};

use common::{field_element, proptest_config};

proptest! {
    #![proptest_config(proptest_config())]

    #[test]
    fn test_uint64_roundtrip(x in any::<u64>()) {
        let codec = CompactUnsignedInteger::for_bytes(8);
        let native = BigUint::from(x);
        prop_assert_eq!(codec.decode(&codec.encode(&native).unwrap()).unwrap(), native);
    }

    #[test]
    fn test_field_roundtrip(x in field_element()) {
        let codec = CompactField::default();
        prop_assert_eq!(codec.decode(&codec.encode(&x).unwrap()).unwrap(), x);
    }

    #[test]
    fn test_short_bytes_are_zero_padded(bytes in proptest::collection::vec(any::<u8>(), 0..=32)) {
        let padded = CompactBytes::<32>::pad(&bytes).unwrap();
        let decoded = CompactBytes::<32>.decode(&CompactBytes::<32>.encode(&padded).unwrap()).unwrap();
        prop_assert_eq!(&decoded[..bytes.len()], &bytes[..]);
        prop_assert!(decoded[bytes.len()..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_string_roundtrip(s in ".{0,64}") {
        prop_assert_eq!(OpaqueString.decode(&OpaqueString.encode(&s).unwrap()).unwrap(), s);
    }

    #[test]
    fn test_vector_of_maybe_roundtrip(items in proptest::collection::vec(proptest::option::of(any::<u8>()), 3)) {
        let codec = CompactVector::new(3, CompactMaybe::new(CompactUnsignedInteger::for_bytes(1)));
        let native: Vec<Option<BigUint>> = items.iter().map(|x| x.map(BigUint::from)).collect();
        prop_assert_eq!(codec.decode(&codec.encode(&native).unwrap()).unwrap(), native);
    }

    #[test]
    fn test_chained_decode_shares_cursor(a in any::<u16>(), flag in any::<bool>()) {
        let uint = CompactUnsignedInteger::for_bytes(2);
        let joined = AlignedValue::concat([
            &uint.encode(&BigUint::from(a)).unwrap(),
            &CompactBoolean.encode(&flag).unwrap(),
        ]);
        let mut reader = ValueReader::new(&joined.value);
        prop_assert_eq!(uint.from_value(&mut reader).unwrap(), BigUint::from(a));
        prop_assert_eq!(CompactBoolean.from_value(&mut reader).unwrap(), flag);
        prop_assert!(reader.ensure_consumed().is_ok());
    }
}

#[test]
fn test_bytes32_pads_30_byte_input() {
    let padded = CompactBytes::<32>::pad(&[7u8; 30]).unwrap();
    let decoded = CompactBytes::<32>.decode(&CompactBytes::<32>.encode(&padded).unwrap()).unwrap();
    assert_eq!(&decoded[..30], &[7u8; 30]);
    assert_eq!(&decoded[30..], &[0, 0]);
    assert!(CompactBytes::<32>::pad(&[1u8; 33]).is_err());
}

#[test]
fn test_uint_rejects_values_above_max() {
    let codec = CompactUnsignedInteger::new(BigUint::from(255u32), 1).unwrap();
    let oversized = AlignedValue::new(Value::single(vec![0x00, 0x01]), Alignment::bytes(1));
    assert!(codec.decode(&oversized).is_err());

    let bounded = CompactUnsignedInteger::new(BigUint::from(100u32), 1).unwrap();
    let above = AlignedValue::new(Value::single(vec![200]), Alignment::bytes(1));
    assert!(bounded.decode(&above).is_err());
    assert!(bounded.encode(&BigUint::from(101u32)).is_err());
}

#[test]
fn test_vector_length_mismatch() {
    let codec = CompactVector::new(5, CompactBoolean);
    assert!(codec.encode(&vec![true; 4]).is_err());
    assert!(codec.encode(&vec![true; 5]).is_ok());
}

#[test]
fn test_boolean_encoding() {
    assert_eq!(CompactBoolean.encode(&true).unwrap().value, Value::single(vec![1]));
    assert_eq!(CompactBoolean.encode(&false).unwrap().value, Value::single(Vec::new()));
    let bad = AlignedValue::new(Value::single(vec![2]), Alignment::bytes(1));
    assert!(CompactBoolean.decode(&bad).is_err());
}
