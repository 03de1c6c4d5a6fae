//! Check-in dialogue engine: a branching conversation runtime for a
//! companion character.
//!
//! Content is authored as RON modules of nodes and options. The engine
//! resolves keyed lines with weighted, no-repeat variant selection, picks
//! portraits through a fallback chain, and keeps a snapshot history so back
//! navigation shows exactly what was on screen before.

pub mod core;
pub mod schema;

pub use crate::core::config::{ContentMode, EngineConfig};
pub use crate::core::engine::{
    ChoiceOutcome, DialogueEngine, DialogueEngineBuilder, Display, DisplayOption, EngineError,
    FlowError, OptionKind, SessionEvent, SessionPhase,
};
pub use crate::core::lines::{LineSource, LineStore, LinesService, ResolvedLine};
pub use crate::core::portrait::{PortraitResolver, PortraitSource, PortraitStore};
pub use crate::schema::module::{DialogueModule, Flow, FlowDef, ModuleLibrary};
pub use crate::schema::node::{AdvanceMode, Choice, Node, SpecialAction, Speaker};
pub use crate::schema::portrait::{Modifier, Mood, PortraitKey, PortraitRequest, SpriteRef};
