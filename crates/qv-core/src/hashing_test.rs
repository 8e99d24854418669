use super::*;

fn hash_of<T: StructuralHash>(kind: &str, value: &T) -> NodeId {
    let mut h = StructuralHasher::new(kind);
    h.write(value);
    h.finish()
}

#[test]
fn test_same_input_same_id() {
    let a = hash_of("literal", &ScalarValue::Integer(42));
    let b = hash_of("literal", &ScalarValue::Integer(42));
    assert_eq!(a, b);
}

#[test]
fn test_kind_tag_distinguishes() {
    let a = hash_of("literal", &ScalarValue::Integer(1));
    let b = hash_of("field", &ScalarValue::Integer(1));
    assert_ne!(a, b);
}

#[test]
fn test_floats_hash_by_bits() {
    let pos = hash_of("literal", &ScalarValue::Float(0.0));
    let neg = hash_of("literal", &ScalarValue::Float(-0.0));
    assert_ne!(pos, neg);
    let nan1 = hash_of("literal", &ScalarValue::Float(f64::NAN));
    let nan2 = hash_of("literal", &ScalarValue::Float(f64::NAN));
    assert_eq!(nan1, nan2);
}

#[test]
fn test_integer_and_float_differ() {
    assert_ne!(
        hash_of("literal", &ScalarValue::Integer(1)),
        hash_of("literal", &ScalarValue::Float(1.0))
    );
}

#[test]
fn test_length_prefix_prevents_concatenation_collision() {
    let mut a = StructuralHasher::new("k");
    a.write_str("ab").write_str("c");
    let mut b = StructuralHasher::new("k");
    b.write_str("a").write_str("bc");
    assert_ne!(a.finish(), b.finish());
}

#[test]
fn test_child_ids_affect_parent() {
    let c1 = hash_of("literal", &ScalarValue::Integer(1));
    let c2 = hash_of("literal", &ScalarValue::Integer(2));
    let mut p1 = StructuralHasher::new("call");
    p1.write_id(&c1).write_id(&c2);
    let mut p2 = StructuralHasher::new("call");
    p2.write_id(&c2).write_id(&c1);
    assert_ne!(p1.finish(), p2.finish());
}

#[test]
fn test_schema_hash_tracks_nullability() {
    let a = Schema::try_new(vec![Field::nullable("x", DataType::int64())]).unwrap();
    let b = Schema::try_new(vec![Field::not_null("x", DataType::int64())]).unwrap();
    assert_ne!(hash_of("source", &a), hash_of("source", &b));
}

#[test]
fn test_display_is_hex() {
    let id = hash_of("literal", &ScalarValue::Null);
    let s = id.to_string();
    assert_eq!(s.len(), 32);
    assert!(s.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(id.short(), s[..8]);
}
