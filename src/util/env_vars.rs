//! Decoding of the serialized env-var column.

use std::collections::BTreeMap;

use crate::errors::CorvusError;

/// Convert the JSON-encoded environment-variable string stored in the
/// database into the `KEY=VALUE` list the build container expects.
///
/// Returns an empty list (not an error) when the column is null or empty,
/// meaning no environment variables were configured.
pub fn decode_env_vars(encoded: Option<&str>) -> Result<Vec<String>, CorvusError> {
    let encoded = match encoded {
        Some(s) if !s.is_empty() => s,
        _ => return Ok(Vec::new()),
    };

    let map: BTreeMap<String, String> = serde_json::from_str(encoded)
        .map_err(|e| CorvusError::InvalidRequest(format!("invalid env var JSON: {e}")))?;

    Ok(map
        .into_iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_and_empty_decode_to_nothing() {
        assert!(decode_env_vars(None).unwrap().is_empty());
        assert!(decode_env_vars(Some("")).unwrap().is_empty());
        assert!(decode_env_vars(Some("{}")).unwrap().is_empty());
    }

    #[test]
    fn map_decodes_to_key_value_pairs() {
        let pairs =
            decode_env_vars(Some(r#"{"NODE_ENV":"production","API_BASE":"/v1"}"#)).unwrap();
        assert_eq!(pairs, vec!["API_BASE=/v1", "NODE_ENV=production"]);
    }

    #[test]
    fn garbage_is_an_invalid_request() {
        let err = decode_env_vars(Some("not json")).unwrap_err();
        assert!(matches!(err, CorvusError::InvalidRequest(_)));
    }
}
