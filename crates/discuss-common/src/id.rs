use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Normalize an identifier to the string form used in cache keys and topics.
///
/// Returns `None` for blank input.
pub fn normalize_id(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Read an identifier from a JSON value. The server emits ids as numbers,
/// the REST layer as strings; both normalize to the same string.
pub fn id_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => normalize_id(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// `deserialize_with` helper for mandatory ids.
pub fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    id_from_value(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("expected a string or numeric id, got {value}")))
}

/// `deserialize_with` helper for optional ids. Null, blank and
/// non-scalar values all read as `None`.
pub fn deserialize_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(id_from_value))
}

/// `deserialize_with` helper for id lists such as reaction user ids.
/// Entries that are not ids are skipped.
pub fn deserialize_id_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Option::<Vec<Value>>::deserialize(deserializer)?;
    Ok(values
        .unwrap_or_default()
        .iter()
        .filter_map(id_from_value)
        .collect())
}

/// Correlates log lines of one sync session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Holder {
        #[serde(deserialize_with = "deserialize_id")]
        id: String,
        #[serde(default, deserialize_with = "deserialize_opt_id")]
        parent: Option<String>,
    }

    #[test]
    fn normalize_trims_and_rejects_blank() {
        assert_eq!(normalize_id(" 42 "), Some("42".to_string()));
        assert_eq!(normalize_id("   "), None);
        assert_eq!(normalize_id(""), None);
    }

    #[test]
    fn numeric_and_string_ids_normalize_identically() {
        assert_eq!(id_from_value(&json!(42)), Some("42".into()));
        assert_eq!(id_from_value(&json!("42")), Some("42".into()));
        assert_eq!(id_from_value(&json!(null)), None);
        assert_eq!(id_from_value(&json!({"id": 1})), None);
    }

    #[test]
    fn deserialize_helpers_accept_both_forms() {
        let h: Holder = serde_json::from_value(json!({"id": 7, "parent": "3"})).unwrap();
        assert_eq!(h.id, "7");
        assert_eq!(h.parent.as_deref(), Some("3"));

        let h: Holder = serde_json::from_value(json!({"id": "x"})).unwrap();
        assert_eq!(h.parent, None);

        let h: Holder = serde_json::from_value(json!({"id": "x", "parent": null})).unwrap();
        assert_eq!(h.parent, None);
    }

    #[test]
    fn id_lists_mix_numbers_and_strings() {
        #[derive(Deserialize)]
        struct Users {
            #[serde(default, deserialize_with = "deserialize_id_list")]
            ids: Vec<String>,
        }
        let u: Users = serde_json::from_value(json!({"ids": [9, "10", null, " "]})).unwrap();
        assert_eq!(u.ids, vec!["9", "10"]);
        let u: Users = serde_json::from_value(json!({"ids": null})).unwrap();
        assert!(u.ids.is_empty());
    }

    #[test]
    fn missing_mandatory_id_is_an_error() {
        let result = serde_json::from_value::<Holder>(json!({"id": true}));
        assert!(result.is_err());
    }

    #[test]
    fn session_ids_are_unique_uuids() {
        let a = SessionId::new();
        let b = SessionId::new();
        assert_ne!(a, b);
        assert!(uuid::Uuid::parse_str(a.as_str()).is_ok());
        assert_eq!(a.to_string(), a.as_str());
    }
}
