use crate::cid::Cid;
use crate::manifest::Manifest;
use crate::SchemaError;
use serde::Serialize;

/// Deterministically serialize a manifest (or its wire envelope).
///
/// The value is rebuilt as a `serde_json::Value` first so that every object's
/// keys come out in lexicographic byte order regardless of field declaration
/// order, then emitted compactly. Logically equal manifests always encode to
/// identical bytes, which is what makes `manifest_cid` stable.
pub fn canonical_encode<T: Serialize>(value: &T) -> Result<Vec<u8>, SchemaError> {
    let value = serde_json::to_value(value)?;
    Ok(serde_json::to_vec(&value)?)
}

/// The integrity fingerprint of a manifest: the CID of its canonical
/// encoding, independent of any container framing. This is the hash a
/// published record carries.
pub fn manifest_cid(manifest: &Manifest) -> Result<Cid, SchemaError> {
    Ok(Cid::compute(&canonical_encode(manifest)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{parse_manifest_str, CONTAINER_VERSION};

    const SAMPLE: &str = r#"{
        "name": "First Tile",
        "description": "A basic tile.",
        "resources": {
            "/": { "content-type": "text/html" },
            "/img/x.jpg": { "content-type": "image/jpeg" }
        }
    }"#;

    #[test]
    fn encoding_is_stable_across_calls() {
        let m = parse_manifest_str(SAMPLE).unwrap();
        let a = canonical_encode(&m).unwrap();
        let b = canonical_encode(&m).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn equal_manifests_hash_identically() {
        let a = parse_manifest_str(SAMPLE).unwrap();
        let b = parse_manifest_str(SAMPLE).unwrap();
        assert_eq!(manifest_cid(&a).unwrap(), manifest_cid(&b).unwrap());
    }

    #[test]
    fn key_order_in_input_does_not_matter() {
        let reordered = r#"{
            "resources": {
                "/img/x.jpg": { "content-type": "image/jpeg" },
                "/": { "content-type": "text/html" }
            },
            "description": "A basic tile.",
            "name": "First Tile"
        }"#;
        let a = parse_manifest_str(SAMPLE).unwrap();
        let b = parse_manifest_str(reordered).unwrap();
        assert_eq!(
            canonical_encode(&a).unwrap(),
            canonical_encode(&b).unwrap()
        );
    }

    #[test]
    fn different_manifests_hash_differently() {
        let a = parse_manifest_str(SAMPLE).unwrap();
        let mut b = a.clone();
        b.name = "Second Tile".to_owned();
        assert_ne!(manifest_cid(&a).unwrap(), manifest_cid(&b).unwrap());
    }

    #[test]
    fn fingerprint_ignores_framing() {
        let m = parse_manifest_str(SAMPLE).unwrap();
        let bare = manifest_cid(&m).unwrap();
        let wire = canonical_encode(&m.clone().into_wire()).unwrap();
        assert_ne!(bare, Cid::compute(&wire));
        // Framing fields are present in the wire encoding only.
        let text = String::from_utf8(wire).unwrap();
        assert!(text.contains(&format!("\"version\":{CONTAINER_VERSION}")));
        assert!(text.contains("\"roots\":[]"));
    }
}
