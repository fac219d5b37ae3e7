use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;

/// Which events get published
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventFilterConfig {
    /// Publish events that are in neither list
    pub publish_all: bool,
    /// Accepts a list or a comma-separated string
    #[serde(deserialize_with = "string_list")]
    pub include: Vec<String>,
    #[serde(deserialize_with = "string_list")]
    pub exclude: Vec<String>,
}

impl Default for EventFilterConfig {
    fn default() -> Self {
        Self {
            publish_all: true,
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }
}

/// Split `"A, B,,C"` into `["A", "B", "C"]`
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringList {
    Joined(String),
    Items(Vec<String>),
}

fn string_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match StringList::deserialize(deserializer)? {
        StringList::Joined(raw) => split_list(&raw),
        StringList::Items(items) => items
            .iter()
            .flat_map(|item| split_list(item))
            .collect(),
    })
}

/// Why an event was or was not selected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    Excluded,
    Included,
    NotIncluded,
    /// Neither list applied; the `publish_all` setting decided
    Default(bool),
}

impl FilterDecision {
    pub fn allows(&self) -> bool {
        matches!(self, FilterDecision::Included | FilterDecision::Default(true))
    }
}

/// Compiled [`EventFilterConfig`]. Names compare case-insensitively.
#[derive(Debug, Clone)]
pub struct EventFilter {
    publish_all: bool,
    include: HashSet<String>,
    exclude: HashSet<String>,
}

impl EventFilter {
    pub fn new(config: &EventFilterConfig) -> Self {
        let normalize = |names: &[String]| -> HashSet<String> {
            names.iter().map(|n| n.trim().to_ascii_uppercase()).collect()
        };
        Self {
            publish_all: config.publish_all,
            include: normalize(&config.include),
            exclude: normalize(&config.exclude),
        }
    }

    /// Exclusion wins, then a non-empty include list decides, then `publish_all`
    pub fn decide(&self, event_name: &str) -> FilterDecision {
        let name = event_name.to_ascii_uppercase();
        if self.exclude.contains(&name) {
            FilterDecision::Excluded
        } else if !self.include.is_empty() {
            if self.include.contains(&name) {
                FilterDecision::Included
            } else {
                FilterDecision::NotIncluded
            }
        } else {
            FilterDecision::Default(self.publish_all)
        }
    }

    pub fn allows(&self, event_name: &str) -> bool {
        self.decide(event_name).allows()
    }
}

impl Default for EventFilter {
    fn default() -> Self {
        Self::new(&EventFilterConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(publish_all: bool, include: &[&str], exclude: &[&str]) -> EventFilter {
        EventFilter::new(&EventFilterConfig {
            publish_all,
            include: include.iter().map(|s| s.to_string()).collect(),
            exclude: exclude.iter().map(|s| s.to_string()).collect(),
        })
    }

    #[test]
    fn test_exclude_wins_over_include() {
        let f = filter(true, &["HEARTBEAT"], &["heartbeat"]);
        assert_eq!(f.decide("HEARTBEAT"), FilterDecision::Excluded);
    }

    #[test]
    fn test_include_list_is_final() {
        let f = filter(true, &["channel_create"], &[]);
        assert!(f.allows("CHANNEL_CREATE"));
        assert_eq!(f.decide("CHANNEL_HANGUP"), FilterDecision::NotIncluded);
    }

    #[test]
    fn test_publish_all_default() {
        assert!(filter(true, &[], &[]).allows("ANY"));
        assert!(!filter(false, &[], &[]).allows("ANY"));
        assert!(!filter(false, &[], &["X"]).allows("X"));
    }

    #[test]
    fn test_lists_from_string_or_array() {
        let from_string: EventFilterConfig =
            serde_json::from_str(r#"{"include": "CHANNEL_CREATE, CHANNEL_ANSWER,,"}"#).unwrap();
        assert_eq!(from_string.include, vec!["CHANNEL_CREATE", "CHANNEL_ANSWER"]);
        assert!(from_string.publish_all);

        let from_array: EventFilterConfig =
            serde_json::from_str(r#"{"publish_all": false, "exclude": ["HEARTBEAT", " RE_SCHEDULE "]}"#).unwrap();
        assert_eq!(from_array.exclude, vec!["HEARTBEAT", "RE_SCHEDULE"]);
        assert!(!from_array.publish_all);
    }
}
