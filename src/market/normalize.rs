use serde_json::{Map, Value};

use crate::models::RawItem;

/// Window prefixes as the feed spells them, and their canonical form.
const WINDOW_PREFIXES: [(&str, &str); 4] = [
    ("1d_", "one_d_"),
    ("2d_", "two_d_"),
    ("7d_", "seven_d_"),
    ("1m_", "one_m_"),
];

/// camelCase names the feed uses for a handful of descriptive fields.
const RENAMED_KEYS: [(&str, &str); 5] = [
    ("firstAdded", "first_added"),
    ("lastUpdate", "last_update"),
    ("statName", "stat_name"),
    ("upgradeName", "upgrade_name"),
    ("weaponType", "weapon_type"),
];

/// Map one feed key to its canonical name. Unknown keys pass through.
pub fn canonical_key(key: &str) -> String {
    if let Some((_, renamed)) = RENAMED_KEYS.iter().find(|(from, _)| *from == key) {
        return (*renamed).to_string();
    }
    for (prefix, canonical) in WINDOW_PREFIXES {
        if let Some(rest) = key.strip_prefix(prefix) {
            return format!("{canonical}{rest}");
        }
    }
    key.to_string()
}

/// Inverse of `canonical_key`, used to build the feed's `fields=` list.
pub fn feed_key(canonical: &str) -> String {
    if let Some((from, _)) = RENAMED_KEYS.iter().find(|(_, to)| *to == canonical) {
        return (*from).to_string();
    }
    for (prefix, canonical_prefix) in WINDOW_PREFIXES {
        if let Some(rest) = canonical.strip_prefix(canonical_prefix) {
            return format!("{prefix}{rest}");
        }
    }
    canonical.to_string()
}

/// Rename every key of one feed record to its canonical name.
pub fn normalize_item(raw: Map<String, Value>) -> RawItem {
    raw.into_iter()
        .map(|(key, value)| (canonical_key(&key), value))
        .collect()
}
