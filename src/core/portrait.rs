/// Portrait resolution: maps a mood/intensity/modifier request to a sprite
/// through a fixed fallback chain.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::schema::portrait::{Modifier, Mood, PortraitKey, PortraitRequest, SpriteRef};

#[derive(Debug, Error)]
pub enum PortraitError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// One row of the portrait store file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortraitEntry {
    pub mood: Mood,
    #[serde(default)]
    pub intensity: u8,
    #[serde(default)]
    pub modifier: Modifier,
    #[serde(default)]
    pub sprite: Option<String>,
}

/// Sprites keyed by exact portrait key.
#[derive(Debug, Clone, Default)]
pub struct PortraitStore {
    sprites: FxHashMap<PortraitKey, SpriteRef>,
}

impl PortraitStore {
    /// Build the lookup. Entries without a sprite are skipped and the first
    /// entry wins for a repeated key.
    pub fn from_entries(entries: Vec<PortraitEntry>) -> Self {
        let mut sprites = FxHashMap::default();
        for entry in entries {
            let Some(sprite) = entry.sprite.filter(|s| !s.is_empty()) else {
                continue;
            };
            let key = PortraitKey::new(entry.mood, entry.intensity, entry.modifier);
            sprites.entry(key).or_insert(SpriteRef(sprite));
        }
        Self { sprites }
    }

    pub fn parse_ron(input: &str) -> Result<PortraitStore, PortraitError> {
        let entries: Vec<PortraitEntry> = ron::from_str(input)?;
        Ok(Self::from_entries(entries))
    }

    pub fn load_from_ron(path: &Path) -> Result<PortraitStore, PortraitError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn get(&self, key: &PortraitKey) -> Option<&SpriteRef> {
        self.sprites.get(key)
    }

    pub fn contains(&self, key: &PortraitKey) -> bool {
        self.sprites.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }
}

/// Where the resolver gets its store from on first use.
#[derive(Debug, Clone)]
pub enum PortraitSource {
    Store(PortraitStore),
    Ron(String),
    File(PathBuf),
}

impl PortraitSource {
    fn load(self) -> PortraitStore {
        let result = match self {
            PortraitSource::Store(store) => return store,
            PortraitSource::Ron(input) => PortraitStore::parse_ron(&input),
            PortraitSource::File(path) => PortraitStore::load_from_ron(&path),
        };
        result.unwrap_or_else(|e| {
            tracing::error!("failed to load portrait store, using empty store: {}", e);
            PortraitStore::default()
        })
    }
}

/// Resolves portrait requests against a lazily loaded store.
pub struct PortraitResolver {
    source: Option<PortraitSource>,
    store: Option<PortraitStore>,
}

impl PortraitResolver {
    pub fn new(source: PortraitSource) -> Self {
        Self {
            source: Some(source),
            store: None,
        }
    }

    /// A resolver that never finds a sprite.
    pub fn empty() -> Self {
        Self::new(PortraitSource::Store(PortraitStore::default()))
    }

    fn store(&mut self) -> &PortraitStore {
        let source = &mut self.source;
        self.store
            .get_or_insert_with(|| source.take().map(PortraitSource::load).unwrap_or_default())
    }

    /// Resolve with fallback, returning the sprite (if any) and the key that
    /// should be recorded for replay. When nothing matches, the requested
    /// key comes back with no sprite.
    pub fn resolve(&mut self, request: &PortraitRequest) -> (Option<SpriteRef>, PortraitKey) {
        let store = self.store();
        match fallback_chain(request).into_iter().find(|k| store.contains(k)) {
            Some(key) => (store.get(&key).cloned(), key),
            None => {
                tracing::debug!(key = %request.key(), "no portrait for request");
                (None, request.key())
            }
        }
    }

    /// Exact lookup with no fallback, for restoring a recorded key.
    pub fn resolve_by_key(&mut self, key: &PortraitKey) -> Option<SpriteRef> {
        self.store().get(key).cloned()
    }
}

/// Keys to try, in order: exact, default modifier, descending intensity
/// with default modifier, mood at 0, neutral at 0.
fn fallback_chain(request: &PortraitRequest) -> Vec<PortraitKey> {
    let mood = request.mood;
    let intensity = request.clamped_intensity();
    let mut chain = Vec::with_capacity(intensity as usize + 4);
    chain.push(PortraitKey::new(mood, intensity, request.modifier));
    chain.push(PortraitKey::new(mood, intensity, Modifier::Default));
    for lower in (0..intensity).rev() {
        chain.push(PortraitKey::new(mood, lower, Modifier::Default));
    }
    chain.push(PortraitKey::new(mood, 0, Modifier::Default));
    chain.push(PortraitKey::new(Mood::Neutral, 0, Modifier::Default));
    chain
}
