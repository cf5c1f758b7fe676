//! Mergeable value contract (C2): partial-update capability for cache
//! values, consulted by the cache's update path in place of general
//! key-value-coding/reflective merging (see `DESIGN.md`, Open Questions).

/// What an incoming value says should happen to one field of the stored
/// value during a merge update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOp<F> {
    /// The incoming value omitted this key: remove it from the stored
    /// value (or, if the stored value is not a mapping, clear the field).
    Remove,
    /// The incoming value set this key to an explicit null sentinel: store
    /// null rather than removing the key.
    SetNull,
    /// The incoming value set this key to an ordinary value: overwrite.
    Set(F),
}

/// Capability for partial updates. A value that implements `Mergeable`
/// can (a) enumerate which of its fields a merge would touch, (b) report
/// what it specifies for one of those fields, and (c) accept a field's
/// merge instruction from another value of the same type.
///
/// `set(k, v1); set(k, v2)` with `replaces_objects_on_update = false`
/// merges by calling, for each key in `v2.mergeable_keys()`,
/// `v1.apply_merge(key, v2.merge_field(key))`.
pub trait Mergeable {
    type Field;

    /// Keys this value would touch if used as the incoming side of a
    /// merge. Order is insignificant but should be stable for a given
    /// value so merges are deterministic.
    fn mergeable_keys(&self) -> Vec<String>;

    /// What this value specifies for `key`, for use as the incoming side
    /// of a merge. Returns `MergeOp::Remove` if `key` is not one of
    /// [`Mergeable::mergeable_keys`].
    fn merge_field(&self, key: &str) -> MergeOp<Self::Field>;

    /// Apply a merge instruction from the incoming side to `self`, the
    /// value already stored in the cache.
    fn apply_merge(&mut self, key: &str, op: MergeOp<Self::Field>);
}

#[cfg(feature = "serde")]
mod json_impl {
    use super::{MergeOp, Mergeable};
    use serde_json::Value;

    /// The cache's one concrete `Mergeable` instance: a JSON object used as
    /// an opaque payload. Non-object values (including `Value::Null`) have
    /// no mergeable keys and merge as a full overwrite, matching
    /// `replaces_objects_on_update = true` semantics for that shape.
    impl Mergeable for Value {
        type Field = Value;

        fn mergeable_keys(&self) -> Vec<String> {
            match self {
                Value::Object(map) => map.keys().cloned().collect(),
                _ => Vec::new(),
            }
        }

        fn merge_field(&self, key: &str) -> MergeOp<Value> {
            match self {
                Value::Object(map) => match map.get(key) {
                    None => MergeOp::Remove,
                    Some(Value::Null) => MergeOp::SetNull,
                    Some(other) => MergeOp::Set(other.clone()),
                },
                _ => MergeOp::Remove,
            }
        }

        fn apply_merge(&mut self, key: &str, op: MergeOp<Value>) {
            let Value::Object(map) = self else {
                return;
            };
            match op {
                MergeOp::Remove => {
                    map.remove(key);
                }
                MergeOp::SetNull => {
                    map.insert(key.to_string(), Value::Null);
                }
                MergeOp::Set(v) => {
                    map.insert(key.to_string(), v);
                }
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use serde_json::json;

        #[test]
        fn merge_add_remove_and_overwrite() {
            let mut stored = json!({"a": 1, "b": 2});
            let incoming = json!({"b": serde_json::Value::Null, "c": 3});

            for key in Mergeable::mergeable_keys(&incoming) {
                let op = Mergeable::merge_field(&incoming, &key);
                Mergeable::apply_merge(&mut stored, &key, op);
            }

            assert_eq!(stored, json!({"a": 1, "b": serde_json::Value::Null, "c": 3}));
        }

        #[test]
        fn absent_key_removes() {
            let mut stored = json!({"a": 1, "b": 2});
            let incoming = json!({"c": 3});
            // Emulate "b:absent" removal as scenario 3 of spec.md describes:
            // the update advertises only the keys it wants to touch.
            Mergeable::apply_merge(&mut stored, "b", MergeOp::Remove);
            for key in Mergeable::mergeable_keys(&incoming) {
                let op = Mergeable::merge_field(&incoming, &key);
                Mergeable::apply_merge(&mut stored, &key, op);
            }
            assert_eq!(stored, json!({"a": 1, "c": 3}));
        }
    }
}
