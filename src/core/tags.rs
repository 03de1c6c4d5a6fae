/// Session-scoped classification tags stashed by chosen options.

use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionTags {
    tags: FxHashMap<String, String>,
}

impl SessionTags {
    pub fn get(&self, category: &str) -> Option<&str> {
        self.tags.get(category).map(String::as_str)
    }

    pub fn set(&mut self, category: &str, value: &str) {
        self.tags.insert(category.to_string(), value.to_string());
    }

    /// Later values overwrite earlier ones per category.
    pub fn stash(&mut self, tags: &BTreeMap<String, String>) {
        for (category, value) in tags {
            self.tags.insert(category.clone(), value.clone());
        }
    }

    pub fn clear(&mut self) {
        self.tags.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Sorted copy, for display and serialization.
    pub fn to_sorted(&self) -> BTreeMap<String, String> {
        self.tags.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stash_overwrites_and_clear_resets() {
        let mut tags = SessionTags::default();
        tags.set("event", "conflict");
        tags.stash(&BTreeMap::from([
            ("event".to_string(), "bad_news".to_string()),
            ("support".to_string(), "grounding".to_string()),
        ]));
        assert_eq!(tags.get("event"), Some("bad_news"));
        assert_eq!(tags.get("support"), Some("grounding"));
        assert_eq!(tags.to_sorted().len(), 2);

        tags.clear();
        assert!(tags.is_empty());
        assert_eq!(tags.get("event"), None);
    }
}
