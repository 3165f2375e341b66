use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

use crate::record::{PropertyValue, Scalar};

/// Key under which a structure's type tag is kept in its simplified form.
pub const TYPE_TAG_KEY: &str = "$type";

/// Convert a structured property into a plain JSON value for the report's
/// custom data.
///
/// Scalars keep their kind, sequences become arrays and dictionaries and
/// structures become objects. Anything JSON cannot hold (non-finite floats,
/// opaque values) is carried as its textual form.
///
/// Object keys are the `Display` text of dictionary keys, so keys with the
/// same text (`1` and `"1"`, or plain duplicates) collapse into one entry
/// and the last one in iteration order wins. Duplicate structure field
/// names behave the same way.
pub fn simplify(value: &PropertyValue) -> Value {
    match value {
        PropertyValue::Scalar(scalar) => simplify_scalar(scalar),
        PropertyValue::Sequence(items) => Value::Array(items.iter().map(simplify).collect()),
        PropertyValue::Dictionary(entries) => {
            let map: Map<String, Value> = entries
                .iter()
                .map(|(key, item)| (key.to_string(), simplify(item)))
                .collect();
            Value::Object(map)
        }
        PropertyValue::Structure { type_tag, fields } => {
            let mut map: Map<String, Value> = fields
                .iter()
                .map(|(name, item)| (name.clone(), simplify(item)))
                .collect();
            if let Some(tag) = type_tag {
                map.entry(TYPE_TAG_KEY).or_insert_with(|| Value::String(tag.clone()));
            }
            Value::Object(map)
        }
    }
}

fn simplify_scalar(scalar: &Scalar) -> Value {
    match scalar {
        Scalar::Null => Value::Null,
        Scalar::Bool(v) => Value::Bool(*v),
        Scalar::I64(v) => Value::from(*v),
        Scalar::U64(v) => Value::from(*v),
        Scalar::F64(v) => Number::from_f64(*v)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(v.to_string())),
        Scalar::String(v) | Scalar::Other(v) => Value::String(v.clone()),
    }
}

/// Plain string form of a property, `None` when it is null.
pub trait PropertyText {
    fn property_text(&self) -> Option<String>;
}

impl PropertyText for PropertyValue {
    fn property_text(&self) -> Option<String> {
        match self {
            PropertyValue::Scalar(Scalar::Null) => None,
            PropertyValue::Scalar(scalar) => Some(scalar.to_string()),
            composite => Some(simplify(composite).to_string()),
        }
    }
}

impl PropertyText for Value {
    fn property_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Look up `name` in `properties` and return its string form.
///
/// A blank `name`, a missing entry and a null value all yield `None`, which
/// callers treat as "feature off".
pub fn lookup_optional_string_property<V: PropertyText>(
    properties: &BTreeMap<String, V>,
    name: &str,
) -> Option<String> {
    if name.trim().is_empty() {
        return None;
    }
    properties.get(name)?.property_text()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn simplifies_nested_values() {
        let value = PropertyValue::Structure {
            type_tag: Some("Order".to_string()),
            fields: vec![
                ("Id".to_string(), 42.into()),
                ("Lines".to_string(), vec![1i64, 2].into()),
                (
                    "Meta".to_string(),
                    PropertyValue::Dictionary(vec![(Scalar::I64(7), "seven".into())]),
                ),
            ],
        };

        assert_eq!(
            simplify(&value),
            json!({"$type": "Order", "Id": 42, "Lines": [1, 2], "Meta": {"7": "seven"}})
        );
    }

    #[test]
    fn type_tag_does_not_replace_field() {
        let value = PropertyValue::Structure {
            type_tag: Some("Tagged".to_string()),
            fields: vec![(TYPE_TAG_KEY.to_string(), "field".into())],
        };
        assert_eq!(simplify(&value), json!({"$type": "field"}));
    }

    #[test]
    fn colliding_dictionary_keys_keep_last_entry() {
        let value = PropertyValue::Dictionary(vec![
            (Scalar::I64(1), "number".into()),
            (Scalar::String("1".to_string()), "text".into()),
            (Scalar::String("a".to_string()), 1.into()),
            (Scalar::String("a".to_string()), 2.into()),
        ]);
        assert_eq!(simplify(&value), json!({"1": "text", "a": 2}));
    }

    #[test]
    fn unrepresentable_scalars_fall_back_to_text() {
        assert_eq!(simplify(&f64::NAN.into()), json!("NaN"));
        assert_eq!(simplify(&f64::INFINITY.into()), json!("inf"));
        assert_eq!(
            simplify(&PropertyValue::Scalar(Scalar::Other("Point(1, 2)".to_string()))),
            json!("Point(1, 2)")
        );
    }

    #[test]
    fn lookup_treats_blank_missing_and_null_as_absent() {
        let mut props: BTreeMap<String, PropertyValue> = BTreeMap::new();
        props.insert("UserName".to_string(), "alice".into());
        props.insert("Nothing".to_string(), PropertyValue::null());
        props.insert("Count".to_string(), 3.into());

        assert_eq!(lookup_optional_string_property(&props, "UserName"), Some("alice".to_string()));
        assert_eq!(lookup_optional_string_property(&props, "Count"), Some("3".to_string()));
        assert_eq!(lookup_optional_string_property(&props, "Nothing"), None);
        assert_eq!(lookup_optional_string_property(&props, "Missing"), None);
        assert_eq!(lookup_optional_string_property(&props, "  "), None);
    }

    #[test]
    fn lookup_over_custom_data() {
        let mut data: BTreeMap<String, Value> = BTreeMap::new();
        data.insert("GroupKey".to_string(), json!("checkout-error"));
        data.insert("Null".to_string(), Value::Null);
        data.insert("Number".to_string(), json!(12));

        assert_eq!(lookup_optional_string_property(&data, "GroupKey"), Some("checkout-error".to_string()));
        assert_eq!(lookup_optional_string_property(&data, "Number"), Some("12".to_string()));
        assert_eq!(lookup_optional_string_property(&data, "Null"), None);
    }

    fn arb_scalar() -> impl Strategy<Value = Scalar> {
        prop_oneof![
            Just(Scalar::Null),
            any::<bool>().prop_map(Scalar::Bool),
            any::<i64>().prop_map(Scalar::I64),
            any::<u64>().prop_map(Scalar::U64),
            (-1.0e9f64..1.0e9f64).prop_map(Scalar::F64),
            "[a-zA-Z0-9 ]{0,12}".prop_map(Scalar::String),
        ]
    }

    fn arb_value() -> impl Strategy<Value = PropertyValue> {
        let leaf = arb_scalar().prop_map(PropertyValue::Scalar);
        leaf.prop_recursive(4, 32, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(PropertyValue::Sequence),
                prop::collection::btree_map("[a-z]{1,6}", inner.clone(), 0..4).prop_map(|m| {
                    PropertyValue::Dictionary(m.into_iter().map(|(k, v)| (Scalar::String(k), v)).collect())
                }),
                prop::collection::btree_map("[a-z]{1,6}", inner, 0..4).prop_map(|m| {
                    PropertyValue::Structure { type_tag: None, fields: m.into_iter().collect() }
                }),
            ]
        })
    }

    fn same_shape(original: &PropertyValue, plain: &Value) -> bool {
        match (original, plain) {
            (PropertyValue::Scalar(Scalar::Null), Value::Null) => true,
            (PropertyValue::Scalar(Scalar::Bool(a)), Value::Bool(b)) => a == b,
            (PropertyValue::Scalar(Scalar::I64(a)), Value::Number(n)) => n.as_i64() == Some(*a),
            (PropertyValue::Scalar(Scalar::U64(a)), Value::Number(n)) => n.as_u64() == Some(*a),
            (PropertyValue::Scalar(Scalar::F64(a)), Value::Number(n)) => n.as_f64() == Some(*a),
            (PropertyValue::Scalar(Scalar::String(a)), Value::String(b)) => a == b,
            (PropertyValue::Sequence(items), Value::Array(plain_items)) => {
                items.len() == plain_items.len()
                    && items.iter().zip(plain_items).all(|(a, b)| same_shape(a, b))
            }
            (PropertyValue::Dictionary(entries), Value::Object(map)) => {
                entries.len() == map.len()
                    && entries
                        .iter()
                        .all(|(k, v)| map.get(&k.to_string()).map_or(false, |p| same_shape(v, p)))
            }
            (PropertyValue::Structure { fields, .. }, Value::Object(map)) => {
                fields.len() == map.len()
                    && fields
                        .iter()
                        .all(|(k, v)| map.get(k).map_or(false, |p| same_shape(v, p)))
            }
            _ => false,
        }
    }

    proptest! {
        #[test]
        fn simplify_preserves_scalars_and_nesting(props in prop::collection::btree_map("[A-Za-z]{1,8}", arb_value(), 0..6)) {
            for (name, value) in &props {
                let plain = simplify(value);
                prop_assert!(same_shape(value, &plain), "property {} lost shape: {:?} -> {}", name, value, plain);
            }
        }
    }
}
