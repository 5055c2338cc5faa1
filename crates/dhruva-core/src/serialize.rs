use crate::error::CoreError;
use crate::hash::Fingerprint;
use serde::Serialize;

/// Produce a canonical byte representation: `section\0sorted_json`.
///
/// JSON keys are sorted so the output does not depend on field
/// declaration or map insertion order.
pub fn canonical_serialize(section: &str, value: &impl Serialize) -> Result<Vec<u8>, CoreError> {
    let json_value = serde_json::to_value(value)?;
    let sorted_json = serde_json::to_string(&sort_value(json_value))?;
    let mut buf = Vec::with_capacity(section.len() + 1 + sorted_json.len());
    buf.extend_from_slice(section.as_bytes());
    buf.push(0);
    buf.extend_from_slice(sorted_json.as_bytes());
    Ok(buf)
}

/// Fingerprint several named sections as one digest.
pub fn fingerprint_sections(sections: &[(&str, serde_json::Value)]) -> Result<Fingerprint, CoreError> {
    let mut bytes = Vec::new();
    for (name, value) in sections {
        bytes.extend(canonical_serialize(name, value)?);
        bytes.push(b'\n');
    }
    Ok(Fingerprint::hash(&bytes))
}

fn sort_value(v: serde_json::Value) -> serde_json::Value {
    match v {
        serde_json::Value::Object(map) => {
            let sorted: serde_json::Map<String, serde_json::Value> = map
                .into_iter()
                .map(|(k, v)| (k, sort_value(v)))
                .collect::<std::collections::BTreeMap<_, _>>()
                .into_iter()
                .collect();
            serde_json::Value::Object(sorted)
        }
        serde_json::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(sort_value).collect())
        }
        other => other,
    }
}
