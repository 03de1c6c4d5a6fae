use serde::{Deserialize, Serialize};

/// Highest portrait intensity level. Requests are clamped to `0..=MAX_INTENSITY`.
pub const MAX_INTENSITY: u8 = 4;

/// The emotional register of the companion's portrait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Mood {
    Neutral,
    #[default]
    Friendly,
    Concerned,
    Firm,
    Sad,
    Shocked,
    Devastated,
    Warm,
    Amused,
    Embarrassed,
    Excited,
    Surprised,
}

impl Mood {
    /// Lowercase name, used by the preview shell and the wasm bindings.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Friendly => "friendly",
            Self::Concerned => "concerned",
            Self::Firm => "firm",
            Self::Sad => "sad",
            Self::Shocked => "shocked",
            Self::Devastated => "devastated",
            Self::Warm => "warm",
            Self::Amused => "amused",
            Self::Embarrassed => "embarrassed",
            Self::Excited => "excited",
            Self::Surprised => "surprised",
        }
    }
}

/// A pose or expression detail layered on top of a mood.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Modifier {
    #[default]
    Default,
    SideLookLeft,
    SideLookRight,
    LookingDown,
    DirectEyeContact,
    OpenHands,
    HugOffer,
    SweatDrop,
    NoFace,
    MouthOpen,
    WideEyes,
}

/// A symbolic visual-state request attached to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortraitRequest {
    #[serde(default)]
    pub mood: Mood,
    #[serde(default)]
    pub intensity: u8,
    #[serde(default)]
    pub modifier: Modifier,
}

impl Default for PortraitRequest {
    /// The friendly, calm baseline used when a node does not ask for anything.
    fn default() -> Self {
        Self::new(Mood::Friendly, 0, Modifier::Default)
    }
}

impl PortraitRequest {
    pub fn new(mood: Mood, intensity: u8, modifier: Modifier) -> Self {
        Self {
            mood,
            intensity: intensity.min(MAX_INTENSITY),
            modifier,
        }
    }

    /// Intensity clamped into the supported range. Deserialized requests
    /// bypass `new`, so callers go through this.
    pub fn clamped_intensity(&self) -> u8 {
        self.intensity.min(MAX_INTENSITY)
    }

    /// The key this request asks for before any fallback.
    pub fn key(&self) -> PortraitKey {
        PortraitKey::new(self.mood, self.clamped_intensity(), self.modifier)
    }
}

/// Exact address of one entry in the portrait store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortraitKey {
    pub mood: Mood,
    pub intensity: u8,
    pub modifier: Modifier,
}

impl PortraitKey {
    pub fn new(mood: Mood, intensity: u8, modifier: Modifier) -> Self {
        Self {
            mood,
            intensity,
            modifier,
        }
    }
}

impl std::fmt::Display for PortraitKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}_{:?}", self.mood.name(), self.intensity, self.modifier)
    }
}

/// Newtype wrapper for a visual asset reference (a sprite path or atlas id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpriteRef(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_clamps_intensity() {
        let req = PortraitRequest::new(Mood::Sad, 9, Modifier::HugOffer);
        assert_eq!(req.intensity, MAX_INTENSITY);
        assert_eq!(req.key(), PortraitKey::new(Mood::Sad, 4, Modifier::HugOffer));
    }

    #[test]
    fn deserialized_request_clamps_on_key() {
        let req: PortraitRequest = ron::from_str("(mood: Shocked, intensity: 7)").unwrap();
        assert_eq!(req.intensity, 7);
        assert_eq!(req.key().intensity, 4);
        assert_eq!(req.modifier, Modifier::Default);
    }

    #[test]
    fn default_request_is_friendly_baseline() {
        let req = PortraitRequest::default();
        assert_eq!(req.mood, Mood::Friendly);
        assert_eq!(req.intensity, 0);
        assert_eq!(req.modifier, Modifier::Default);
    }

    #[test]
    fn key_display() {
        let key = PortraitKey::new(Mood::Warm, 2, Modifier::OpenHands);
        assert_eq!(key.to_string(), "warm_2_OpenHands");
    }
}
