//! Request fingerprints.

use serde_json::Value;

/// Builds the cache key for an operation and its argument object.
///
/// The key is `"{operation}:{json}"`. Top-level object keys are sorted
/// lexicographically before serializing, so two bodies that differ only in
/// key insertion order share a fingerprint. Nested values are written as
/// received. Non-object arguments are serialized unchanged.
pub fn make_key(operation: &str, args: &Value) -> String {
    let body = match args {
        Value::Object(map) => {
            let mut fields: Vec<(&String, &Value)> = map.iter().collect();
            fields.sort_unstable_by(|a, b| a.0.cmp(b.0));

            let mut out = String::from("{");
            for (i, (name, value)) in fields.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                // Display for Value is compact JSON and cannot fail.
                out.push_str(&Value::String(name.clone()).to_string());
                out.push(':');
                out.push_str(&value.to_string());
            }
            out.push('}');
            out
        }
        other => other.to_string(),
    };

    format!("{}:{}", operation, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::{json, Map};

    #[test]
    fn test_key_shape() {
        assert_eq!(make_key("x", &json!({"b": 2, "a": 1})), r#"x:{"a":1,"b":2}"#);
    }

    #[test]
    fn test_insertion_order_does_not_matter() {
        let mut first = Map::new();
        first.insert("a".into(), json!(1));
        first.insert("b".into(), json!(2));

        let mut second = Map::new();
        second.insert("b".into(), json!(2));
        second.insert("a".into(), json!(1));

        assert_eq!(
            make_key("x", &Value::Object(first)),
            make_key("x", &Value::Object(second))
        );
    }

    #[test]
    fn test_operation_separates_keys() {
        let args = json!({"currentInventory": []});
        assert_ne!(
            make_key("inventory_prediction", &args),
            make_key("waste_analysis", &args)
        );
    }

    #[test]
    fn test_values_separate_keys() {
        assert_ne!(
            make_key("x", &json!({"a": 1})),
            make_key("x", &json!({"a": 2}))
        );
    }

    #[test]
    fn test_nested_arrays_keep_order() {
        assert_ne!(
            make_key("x", &json!({"items": [1, 2]})),
            make_key("x", &json!({"items": [2, 1]}))
        );
    }

    #[test]
    fn test_non_object_arguments() {
        assert_eq!(make_key("x", &json!([1, 2])), "x:[1,2]");
        assert_eq!(make_key("x", &Value::Null), "x:null");
        assert_eq!(make_key("x", &json!("s")), r#"x:"s""#);
    }

    #[test]
    fn test_does_not_mutate_input() {
        let args = json!({"z": 1, "a": {"y": 2, "b": 3}});
        let before = args.clone();
        let _ = make_key("x", &args);
        assert_eq!(args, before);
    }

    #[test]
    fn test_keys_needing_escapes() {
        let key = make_key("x", &json!({"quo\"te": 1}));
        assert_eq!(key, r#"x:{"quo\"te":1}"#);
    }

    proptest! {
        #[test]
        fn prop_order_independent(entries in proptest::collection::btree_map("[a-z]{1,6}", any::<i64>(), 0..8)) {
            let forward: Map<String, Value> = entries.iter().map(|(k, v)| (k.clone(), json!(v))).collect();
            let reversed: Map<String, Value> = entries.iter().rev().map(|(k, v)| (k.clone(), json!(v))).collect();

            let a = make_key("op", &Value::Object(forward));
            let b = make_key("op", &Value::Object(reversed));
            prop_assert_eq!(&a, &b);
            prop_assert_eq!(a, make_key("op", &serde_json::to_value(&entries).unwrap()));
        }
    }
}
