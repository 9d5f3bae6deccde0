use serde_json::Value;

use super::Patch;
use crate::error::PatchError;

/// Merge `partial` into `base` in place.
///
/// Objects merge key by key, recursively. Everything else (arrays, scalars
/// and explicit nulls) replaces the existing value wholesale.
pub fn deep_merge(base: &mut Value, partial: &Value) {
    match (base, partial) {
        (Value::Object(base_map), Value::Object(partial_map)) => {
            for (key, value) in partial_map {
                match base_map.get_mut(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base, partial) => *base = partial.clone(),
    }
}

impl Patch {
    /// A new patch with `partial` deep-merged over `self`, then sanitized.
    ///
    /// Fields the partial does not mention keep their current values.
    pub fn merged(&self, partial: &Value) -> Result<Patch, PatchError> {
        if !partial.is_object() {
            return Err(PatchError::NotAnObject);
        }

        let mut value = serde_json::to_value(self)?;
        deep_merge(&mut value, partial);
        let patch: Patch = serde_json::from_value(value)?;
        Ok(patch.sanitized())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::{ModSource, ModTarget, OscMode};
    use serde_json::json;

    #[test]
    fn nested_objects_merge_and_siblings_survive() {
        let mut base = json!({"a": {"b": 1, "c": 2}, "d": [1, 2]});
        deep_merge(&mut base, &json!({"a": {"c": 3}, "d": [9]}));
        assert_eq!(base, json!({"a": {"b": 1, "c": 3}, "d": [9]}));
    }

    #[test]
    fn partial_update_keeps_unmentioned_fields() {
        let mut patch = Patch::default();
        patch.osc1.detune = 12.0;
        patch.filter.cutoff = 900.0;

        let next = patch
            .merged(&json!({"osc1": {"mode": "macro"}, "filter": {"q": 4.0}}))
            .unwrap();

        assert_eq!(next.osc1.mode, OscMode::Macro);
        assert_eq!(next.osc1.detune, 12.0);
        assert_eq!(next.filter.cutoff, 900.0);
        assert_eq!(next.filter.q, 4.0);
        // Original untouched.
        assert_eq!(patch.osc1.mode, OscMode::Analog);
    }

    #[test]
    fn merged_values_are_clamped() {
        let next = Patch::default()
            .merged(&json!({"mix": 7.5, "arp": {"swing": -1.0}}))
            .unwrap();
        assert_eq!(next.mix, 1.0);
        assert_eq!(next.arp.swing, 0.0);
    }

    #[test]
    fn matrix_replaces_as_a_whole() {
        let next = Patch::default()
            .merged(&json!({"modulation": [
                {"id": "r1", "source": "expr-x", "target": "mix", "amount": 0.4}
            ]}))
            .unwrap();
        assert_eq!(next.modulation.len(), 1);
        assert_eq!(next.modulation[0].source, ModSource::ExprX);
        assert_eq!(next.modulation[0].target, ModTarget::Mix);
    }

    #[test]
    fn non_object_and_badly_typed_updates_are_rejected() {
        let patch = Patch::default();
        assert!(matches!(patch.merged(&json!(3)), Err(PatchError::NotAnObject)));
        assert!(matches!(
            patch.merged(&json!({"mix": "loud"})),
            Err(PatchError::Invalid(_))
        ));
    }
}
