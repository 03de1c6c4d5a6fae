//! WASM bindings for checkin-dialogue: drives the check-in flow from a web page.

use std::collections::BTreeMap;
use std::time::Duration;
use wasm_bindgen::prelude::*;

use checkin_dialogue::core::config::EngineConfig;
use checkin_dialogue::core::engine::{
    ChoiceOutcome, DialogueEngine, Display, OptionKind, SessionPhase,
};
use checkin_dialogue::schema::module::{ContentError, DialogueModule, Flow, FlowDef, ModuleLibrary};
use checkin_dialogue::schema::node::Speaker;

// ---------------------------------------------------------------------------
// Embedded content, compiled into the WASM binary
// ---------------------------------------------------------------------------
mod data {
    pub const FLOW: &str = include_str!("../../content/checkin/flow.ron");
    pub const CONFIG: &str = include_str!("../../content/checkin/config.ron");
    pub const LINES: &str = include_str!("../../content/checkin/lines.ron");
    pub const PORTRAITS: &str = include_str!("../../content/checkin/portraits.ron");

    pub const MODULES: &[&str] = &[
        include_str!("../../content/checkin/checkin.ron"),
        include_str!("../../content/checkin/winddown.ron"),
    ];
}

// ---------------------------------------------------------------------------
// JSON helper types for communication across the WASM boundary
// ---------------------------------------------------------------------------
#[derive(serde::Serialize)]
struct OptionInfo {
    label: String,
    kind: &'static str,
}

#[derive(serde::Serialize)]
struct DisplayInfo {
    module_id: String,
    node_id: String,
    speaker: &'static str,
    text: String,
    portrait: Option<String>,
    portrait_key: String,
    options: Vec<OptionInfo>,
    showing_reaction: bool,
    phase: &'static str,
    can_go_back: bool,
    end_pending_ms: Option<u64>,
}

#[derive(serde::Serialize)]
struct OutcomeInfo {
    outcome: &'static str,
    node_id: Option<String>,
    module_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------
fn speaker_label(speaker: Speaker) -> &'static str {
    match speaker {
        Speaker::Esai => "esai",
        Speaker::System => "system",
    }
}

fn phase_label(phase: SessionPhase) -> &'static str {
    match phase {
        SessionPhase::NotStarted => "not_started",
        SessionPhase::Active => "active",
        SessionPhase::Ended => "ended",
    }
}

fn option_kind_label(kind: OptionKind) -> &'static str {
    match kind {
        OptionKind::Choice(_) => "choice",
        OptionKind::Continue => "continue",
        OptionKind::ConfirmReaction => "confirm",
    }
}

fn outcome_info(outcome: ChoiceOutcome) -> OutcomeInfo {
    match outcome {
        ChoiceOutcome::Moved { node_id } => OutcomeInfo {
            outcome: "moved",
            node_id: Some(node_id),
            module_id: None,
        },
        ChoiceOutcome::ModuleAdvanced { module_id, node_id } => OutcomeInfo {
            outcome: "module_advanced",
            node_id: Some(node_id),
            module_id: Some(module_id),
        },
        ChoiceOutcome::ReactionShown => OutcomeInfo {
            outcome: "reaction",
            node_id: None,
            module_id: None,
        },
        ChoiceOutcome::SessionEnded => OutcomeInfo {
            outcome: "ended",
            node_id: None,
            module_id: None,
        },
        ChoiceOutcome::NoOp => OutcomeInfo {
            outcome: "none",
            node_id: None,
            module_id: None,
        },
    }
}

fn display_info(display: &Display, engine: &DialogueEngine) -> DisplayInfo {
    DisplayInfo {
        module_id: display.module_id.clone(),
        node_id: display.node_id.clone(),
        speaker: speaker_label(display.speaker),
        text: display.text.clone(),
        portrait: display.portrait.as_ref().map(|s| s.0.clone()),
        portrait_key: display.portrait_key.to_string(),
        options: display
            .options
            .iter()
            .map(|o| OptionInfo {
                label: o.label.clone(),
                kind: option_kind_label(o.kind),
            })
            .collect(),
        showing_reaction: display.showing_reaction,
        phase: phase_label(engine.phase()),
        can_go_back: engine.can_go_back(),
        end_pending_ms: engine.pending_end_in().map(|d| d.as_millis() as u64),
    }
}

fn load_flow() -> Result<Flow, ContentError> {
    let mut library = ModuleLibrary::new();
    for source in data::MODULES {
        library.register(DialogueModule::parse_ron(source)?);
    }
    FlowDef::parse_ron(data::FLOW)?.resolve(&library)
}

// ---------------------------------------------------------------------------
// CheckInSession, the main exported struct
// ---------------------------------------------------------------------------
#[wasm_bindgen]
pub struct CheckInSession {
    engine: DialogueEngine,
    flow: Flow,
}

#[wasm_bindgen]
impl CheckInSession {
    /// Create a session over the bundled content and start it.
    #[wasm_bindgen(constructor)]
    pub fn new(seed: u64) -> Result<CheckInSession, JsError> {
        let flow = load_flow().map_err(|e| JsError::new(&e.to_string()))?;
        let config =
            EngineConfig::parse_ron(data::CONFIG).map_err(|e| JsError::new(&e.to_string()))?;

        let mut engine = DialogueEngine::builder()
            .config(config)
            .seed(seed)
            .lines_ron(data::LINES)
            .portraits_ron(data::PORTRAITS)
            .build()
            .map_err(|e| JsError::new(&e.to_string()))?;
        engine
            .start(flow.clone())
            .map_err(|e| JsError::new(&e.to_string()))?;

        Ok(CheckInSession { engine, flow })
    }

    /// Current display as JSON.
    pub fn display(&self) -> Result<String, JsError> {
        let display = self
            .engine
            .current_display()
            .ok_or_else(|| JsError::new("no session"))?;
        serde_json::to_string(&display_info(display, &self.engine))
            .map_err(|e| JsError::new(&e.to_string()))
    }

    /// Pick an option by its position in the display; returns the outcome as JSON.
    pub fn choose(&mut self, index: usize) -> Result<String, JsError> {
        let outcome = self
            .engine
            .choose(index)
            .map_err(|e| JsError::new(&e.to_string()))?;
        serde_json::to_string(&outcome_info(outcome)).map_err(|e| JsError::new(&e.to_string()))
    }

    pub fn back(&mut self) -> bool {
        self.engine.back()
    }

    pub fn say_again(&self) -> String {
        self.engine.say_again().unwrap_or_default().to_string()
    }

    pub fn end_session(&mut self) {
        self.engine.end_session();
    }

    pub fn cancel_end_session(&mut self) -> bool {
        self.engine.cancel_end_session()
    }

    /// Advance the end timer by `elapsed_ms`. True when the end overlay fires.
    pub fn tick(&mut self, elapsed_ms: u32) -> bool {
        self.engine
            .tick(Duration::from_millis(elapsed_ms as u64))
            .is_some()
    }

    /// Session tags as a JSON object.
    pub fn tags(&self) -> String {
        let tags: BTreeMap<String, String> = self.engine.tags().to_sorted();
        serde_json::to_string(&tags).unwrap_or_else(|_| "{}".to_string())
    }

    /// Start the flow over.
    pub fn restart(&mut self) -> Result<(), JsError> {
        self.engine
            .start(self.flow.clone())
            .map_err(|e| JsError::new(&e.to_string()))
    }
}
