//! String maps whose keys must keep their case.
//!
//! The `config` crate lowercases table keys while reading a file, so a
//! `[gateway.tags]` table loses `CostCenter` → `costcenter`.  Fields using
//! this module also accept a list of `{ key, value }` entries, whose keys
//! are values rather than table keys and survive loading untouched:
//!
//! ```toml
//! [[gateway.tags]]
//! key = "CostCenter"
//! value = "Eng"
//! ```
//!
//! A plain map is still accepted (admin JSON does not go through `config`).
//! Serialization always emits a map.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

#[derive(Deserialize)]
struct Entry {
    key: String,
    value: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Repr {
    List(Vec<Entry>),
    Map(BTreeMap<String, String>),
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Repr::deserialize(deserializer)? {
        Repr::List(entries) => entries.into_iter().map(|e| (e.key, e.value)).collect(),
        Repr::Map(map) => map,
    })
}

pub fn serialize<S>(map: &BTreeMap<String, String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    map.serialize(serializer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, Serialize)]
    struct Tagged {
        #[serde(with = "super")]
        tags: BTreeMap<String, String>,
    }

    #[test]
    fn entry_list_keeps_key_case() {
        let t: Tagged = serde_json::from_str(
            r#"{"tags":[{"key":"CostCenter","value":"Eng"},{"key":"team","value":"data"}]}"#,
        )
        .unwrap();
        assert_eq!(t.tags.get("CostCenter").map(String::as_str), Some("Eng"));
        assert_eq!(t.tags.get("team").map(String::as_str), Some("data"));
    }

    #[test]
    fn plain_map_is_accepted_and_emitted() {
        let t: Tagged = serde_json::from_str(r#"{"tags":{"CostCenter":"Eng"}}"#).unwrap();
        assert_eq!(
            serde_json::to_value(&t).unwrap(),
            serde_json::json!({"tags": {"CostCenter": "Eng"}})
        );
    }
}
