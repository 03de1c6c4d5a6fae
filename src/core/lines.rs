/// Text resolution: keyed line variants with weighted, no-repeat selection
/// and exact replay for back navigation.

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::config::ContentMode;

/// Prefix of the development-mode marker for unknown keys.
pub const MISSING_KEY_PREFIX: &str = "MISSING_TEXTKEY:";
/// What players see for an unknown key in production.
pub const FALLBACK_TEXT: &str = "...";

#[derive(Debug, Error)]
pub enum LinesError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("JSON deserialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One candidate text for a key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineVariant {
    pub text: String,
    #[serde(default = "default_weight")]
    pub weight: i32,
}

fn default_weight() -> i32 {
    1
}

impl LineVariant {
    /// Selection weight, never below 1.
    pub fn effective_weight(&self) -> u32 {
        self.weight.max(1) as u32
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineRules {
    /// How many recent selections to exclude from the next draw. 0 disables.
    #[serde(default, alias = "noRepeatWindow")]
    pub no_repeat_window: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineEntry {
    pub key: String,
    #[serde(default)]
    pub variants: Vec<LineVariant>,
    #[serde(default)]
    pub rules: Option<LineRules>,
}

impl LineEntry {
    pub fn no_repeat_window(&self) -> usize {
        self.rules.as_ref().map_or(0, |r| r.no_repeat_window)
    }
}

/// Shape of the JSON lines file: `{"entries": [...]}`.
#[derive(Debug, Deserialize)]
struct JsonLines {
    #[serde(default)]
    entries: Vec<LineEntry>,
}

/// Read-only keyed collection of line entries.
#[derive(Debug, Clone, Default)]
pub struct LineStore {
    entries: FxHashMap<String, LineEntry>,
}

impl LineStore {
    pub fn from_entries(entries: Vec<LineEntry>) -> Self {
        let mut map = FxHashMap::default();
        for entry in entries {
            if entry.key.is_empty() {
                continue;
            }
            map.insert(entry.key.clone(), entry);
        }
        Self { entries: map }
    }

    /// Parse a RON list of entries.
    pub fn parse_ron(input: &str) -> Result<LineStore, LinesError> {
        let entries: Vec<LineEntry> = ron::from_str(input)?;
        Ok(Self::from_entries(entries))
    }

    /// Parse the JSON `{"entries": [...]}` format.
    pub fn parse_json(input: &str) -> Result<LineStore, LinesError> {
        let wrapper: JsonLines = serde_json::from_str(input)?;
        Ok(Self::from_entries(wrapper.entries))
    }

    /// Load from a `.json` or `.ron` file, chosen by extension.
    pub fn load(path: &Path) -> Result<LineStore, LinesError> {
        let contents = std::fs::read_to_string(path)?;
        if path.extension().and_then(|s| s.to_str()) == Some("json") {
            Self::parse_json(&contents)
        } else {
            Self::parse_ron(&contents)
        }
    }

    /// An entry usable for selection: present and with at least one variant.
    pub fn get(&self, key: &str) -> Option<&LineEntry> {
        self.entries.get(key).filter(|e| !e.variants.is_empty())
    }

    pub fn entries(&self) -> impl Iterator<Item = &LineEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Where the service gets its store from on first use.
#[derive(Debug, Clone)]
pub enum LineSource {
    Store(LineStore),
    Ron(String),
    Json(String),
    File(PathBuf),
}

impl LineSource {
    /// Load the store, degrading to an empty one on any failure.
    fn load(self) -> LineStore {
        let result = match self {
            LineSource::Store(store) => return store,
            LineSource::Ron(input) => LineStore::parse_ron(&input),
            LineSource::Json(input) => LineStore::parse_json(&input),
            LineSource::File(path) => LineStore::load(&path),
        };
        match result {
            Ok(store) => {
                tracing::debug!(entries = store.len(), "lines store loaded");
                store
            }
            Err(e) => {
                tracing::error!("failed to load lines store, using empty store: {}", e);
                LineStore::default()
            }
        }
    }
}

/// A resolved line and the variant that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLine {
    pub text: String,
    /// `None` when the key was missing and fallback text was served.
    pub variant: Option<usize>,
}

/// Serves lines by key. Loads its store lazily and remembers recently
/// served variants per key for the no-repeat window.
pub struct LinesService {
    source: Option<LineSource>,
    store: Option<LineStore>,
    recent: FxHashMap<String, VecDeque<usize>>,
    mode: ContentMode,
    rng: StdRng,
}

impl LinesService {
    /// Service over a source, drawing from an entropy-seeded RNG.
    pub fn new(source: LineSource, mode: ContentMode) -> Self {
        Self::with_rng(source, mode, StdRng::from_entropy())
    }

    pub fn with_seed(source: LineSource, mode: ContentMode, seed: u64) -> Self {
        Self::with_rng(source, mode, StdRng::seed_from_u64(seed))
    }

    fn with_rng(source: LineSource, mode: ContentMode, rng: StdRng) -> Self {
        Self {
            source: Some(source),
            store: None,
            recent: FxHashMap::default(),
            mode,
            rng,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.store.is_some()
    }

    pub fn mode(&self) -> ContentMode {
        self.mode
    }

    fn store(&mut self) -> &LineStore {
        let source = &mut self.source;
        self.store
            .get_or_insert_with(|| source.take().map(LineSource::load).unwrap_or_default())
    }

    /// Fallback text for an unknown key.
    pub fn missing(&self, key: &str) -> String {
        if self.mode == ContentMode::Development {
            tracing::warn!(key, "missing text key");
        }
        missing_text(self.mode, key)
    }

    /// Select a variant for `key` and return it with its index.
    pub fn resolve(&mut self, key: &str) -> ResolvedLine {
        let Some(entry) = self.store().get(key).cloned() else {
            return ResolvedLine {
                text: self.missing(key),
                variant: None,
            };
        };
        let index = self.select_variant(&entry);
        ResolvedLine {
            text: entry.variants[index].text.clone(),
            variant: Some(index),
        }
    }

    /// Return the text of a specific variant without any draw. Out-of-range
    /// or absent indices serve variant 0.
    pub fn resolve_exact(&mut self, key: &str, variant: Option<usize>) -> String {
        match self.lookup(key, variant) {
            Some(text) => text,
            None => self.missing(key),
        }
    }

    /// Like [`resolve_exact`](Self::resolve_exact), but `None` for an
    /// unknown key instead of fallback text.
    pub fn lookup(&mut self, key: &str, variant: Option<usize>) -> Option<String> {
        self.store().get(key).map(|entry| {
            let index = variant.filter(|&i| i < entry.variants.len()).unwrap_or(0);
            entry.variants[index].text.clone()
        })
    }

    pub fn contains(&mut self, key: &str) -> bool {
        self.store().get(key).is_some()
    }

    fn select_variant(&mut self, entry: &LineEntry) -> usize {
        if entry.variants.len() == 1 {
            return 0;
        }

        let window = entry.no_repeat_window();
        let candidates = candidate_indices(entry, self.recent.get(&entry.key));
        // summed as u64: a handful of i32::MAX weights cannot overflow
        let weights: Vec<u64> = candidates
            .iter()
            .map(|&i| u64::from(entry.variants[i].effective_weight()))
            .collect();
        let chosen = match WeightedIndex::new(&weights) {
            Ok(dist) => candidates[dist.sample(&mut self.rng)],
            Err(e) => {
                tracing::error!(key = %entry.key, "unusable variant weights: {}", e);
                candidates[0]
            }
        };

        if window > 0 {
            let recent = self.recent.entry(entry.key.clone()).or_default();
            recent.push_back(chosen);
            while recent.len() > window {
                recent.pop_front();
            }
        }
        chosen
    }
}

/// Every variant index not in the recent window, or all of them if that
/// would leave nothing.
fn candidate_indices(entry: &LineEntry, recent: Option<&VecDeque<usize>>) -> Vec<usize> {
    let all = 0..entry.variants.len();
    let candidates: Vec<usize> = match recent {
        Some(recent) if entry.no_repeat_window() > 0 => {
            all.clone().filter(|i| !recent.contains(i)).collect()
        }
        _ => all.clone().collect(),
    };
    if candidates.is_empty() {
        all.collect()
    } else {
        candidates
    }
}

pub(crate) fn missing_text(mode: ContentMode, key: &str) -> String {
    match mode {
        ContentMode::Development => format!("{} {}", MISSING_KEY_PREFIX, key),
        ContentMode::Production => FALLBACK_TEXT.to_string(),
    }
}
