/// The flow engine: walks a module's node graph, applies option effects,
/// and keeps the snapshot history that back navigation replays.
///
/// Built via `DialogueEngine::builder()`.

use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::core::config::{ConfigError, ContentMode, EngineConfig};
use crate::core::lines::{LineSource, LineStore, LinesService};
use crate::core::navigation::{History, NavState, ReactionBeat, TextRecord};
use crate::core::portrait::{PortraitResolver, PortraitSource, PortraitStore};
use crate::core::sequencer::ModuleSequencer;
use crate::core::tags::SessionTags;
use crate::core::timer::EndTimer;
use crate::schema::module::{ContentError, DialogueModule, Flow};
use crate::schema::node::{Choice, ChoiceEffect, Node, PromptSource, Speaker};
use crate::schema::portrait::{PortraitKey, SpriteRef};

/// Lines key for the label of the continue and confirm controls.
pub const CONTINUE_LABEL_KEY: &str = "labels.continue";
const CONTINUE_LABEL: &str = "Continue";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlowError {
    #[error("no session has been started")]
    NotStarted,
    #[error("the session has ended")]
    SessionEnded,
    #[error("no active module")]
    NoActiveModule,
    #[error("node '{node_id}' not found in module '{module_id}'")]
    NodeNotFound { module_id: String, node_id: String },
    #[error("option {index} out of range ({len} available)")]
    OptionOutOfRange { index: usize, len: usize },
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("content error: {0}")]
    Content(#[from] ContentError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    NotStarted,
    Active,
    /// The end action fired. `cancel_end_session` resumes.
    Ended,
}

/// Raised by [`DialogueEngine::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    EndRequested,
}

/// What a call to [`DialogueEngine::choose`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChoiceOutcome {
    Moved { node_id: String },
    ReactionShown,
    ModuleAdvanced { module_id: String, node_id: String },
    SessionEnded,
    NoOp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    /// Index into the node's option list.
    Choice(usize),
    Continue,
    ConfirmReaction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayOption {
    pub label: String,
    pub kind: OptionKind,
}

/// Everything the presentation layer needs to draw the current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Display {
    pub module_id: String,
    pub node_id: String,
    pub speaker: Speaker,
    pub text: String,
    pub portrait: Option<SpriteRef>,
    pub portrait_key: PortraitKey,
    pub options: Vec<DisplayOption>,
    pub showing_reaction: bool,
    pub phase: SessionPhase,
}

/// The top-level dialogue engine.
pub struct DialogueEngine {
    lines: LinesService,
    portraits: PortraitResolver,
    end_delay: Duration,
    sequencer: Option<ModuleSequencer>,
    state: Option<NavState>,
    display: Option<Display>,
    history: History,
    tags: SessionTags,
    timer: EndTimer,
    phase: SessionPhase,
}

impl DialogueEngine {
    pub fn builder() -> DialogueEngineBuilder {
        DialogueEngineBuilder {
            config: EngineConfig::default(),
            config_path: None,
            seed: None,
            content_mode: None,
            end_delay: None,
            lines: None,
            portraits: None,
        }
    }

    /// Build an engine over a content directory and load its flow.
    pub fn load_content_dir(dir: &str) -> Result<(DialogueEngine, Flow), EngineError> {
        let engine = Self::builder().content_dir(dir).build()?;
        let flow = Flow::load_dir(Path::new(dir))?;
        Ok((engine, flow))
    }

    /// Start a new session at the first module's entry node. Any previous
    /// session is discarded.
    pub fn start(&mut self, flow: impl Into<Flow>) -> Result<(), FlowError> {
        let sequencer = ModuleSequencer::new(flow.into());
        let module = sequencer.current_module().ok_or(FlowError::NoActiveModule)?;
        let entry = module
            .entry_node()
            .cloned()
            .ok_or_else(|| FlowError::NodeNotFound {
                module_id: module.module_id.clone(),
                node_id: module.entry_node_id.clone(),
            })?;
        tracing::debug!(flow = %sequencer.flow_id(), node = %entry.node_id, "session started");

        self.sequencer = Some(sequencer);
        self.history.clear();
        self.tags.clear();
        self.timer.cancel();
        self.phase = SessionPhase::Active;
        self.enter(entry, None);
        Ok(())
    }

    /// Apply the option at `index` of the current display's option list.
    /// On error nothing changes.
    pub fn choose(&mut self, index: usize) -> Result<ChoiceOutcome, FlowError> {
        let state = self.active_state()?.clone();

        if let Some(beat) = &state.reaction {
            if let Some(destination) = beat.destination.clone() {
                if index != 0 {
                    return Err(FlowError::OptionOutOfRange { index, len: 1 });
                }
                let context = beat.context.clone();
                return self.goto(state, &destination, context);
            }
        }

        let node = self.node(&state.node_id)?;
        if node.is_tap_to_continue() {
            if index != 0 {
                return Err(FlowError::OptionOutOfRange { index, len: 1 });
            }
            let Some(target) = node.tap_continue_target() else {
                tracing::warn!(node = %node.node_id, "tap-to-continue node has no target");
                return Ok(ChoiceOutcome::NoOp);
            };
            let context = state.context.clone();
            let target = target.to_string();
            let outcome = self.goto(state, &target, context)?;
            self.clear_tags_on_entry(&target);
            return Ok(outcome);
        }

        let choice = node.options.get(index).ok_or(FlowError::OptionOutOfRange {
            index,
            len: node.options.len(),
        })?;
        let outcome = match choice.effect() {
            ChoiceEffect::End => {
                self.end_session();
                ChoiceOutcome::SessionEnded
            }
            ChoiceEffect::AdvanceModule => self.advance_module(state, choice.entry_context())?,
            ChoiceEffect::TwoBeat {
                reaction_key,
                destination,
            } => {
                self.node(destination)?;
                self.show_reaction(&node, state, reaction_key, Some(destination), choice.entry_context())
            }
            ChoiceEffect::Goto { destination } => {
                self.goto(state, destination, choice.entry_context().map(str::to_string))?
            }
            ChoiceEffect::ReactionOnly { reaction_key } => {
                self.show_reaction(&node, state, reaction_key, None, None)
            }
            ChoiceEffect::Inert => ChoiceOutcome::NoOp,
        };
        if outcome != ChoiceOutcome::NoOp {
            if let ChoiceEffect::Goto { destination } | ChoiceEffect::TwoBeat { destination, .. } =
                choice.effect()
            {
                self.clear_tags_on_entry(destination);
            }
            self.tags.stash(&choice.tags);
        }
        Ok(outcome)
    }

    /// Restore the most recent snapshot. Returns false when there is
    /// nothing to go back to.
    pub fn back(&mut self) -> bool {
        if self.phase != SessionPhase::Active {
            return false;
        }
        let Some(snapshot) = self.history.pop() else {
            return false;
        };
        self.timer.cancel();
        if let Some(sequencer) = self.sequencer.as_mut() {
            sequencer.restore(snapshot.module_index);
        }
        self.restore(snapshot);
        true
    }

    pub fn can_go_back(&self) -> bool {
        self.phase == SessionPhase::Active && !self.history.is_empty()
    }

    pub fn end_session(&mut self) {
        if self.phase != SessionPhase::Active {
            return;
        }
        self.timer.cancel();
        self.set_phase(SessionPhase::Ended);
        tracing::debug!(node = ?self.state.as_ref().map(|s| &s.node_id), "session ended");
    }

    /// Dismiss the end overlay and resume exactly where the session was.
    pub fn cancel_end_session(&mut self) -> bool {
        if self.phase != SessionPhase::Ended || self.state.is_none() {
            return false;
        }
        self.set_phase(SessionPhase::Active);
        true
    }

    /// Advance the delayed end action by the time elapsed since the last tick.
    pub fn tick(&mut self, elapsed: Duration) -> Option<SessionEvent> {
        if self.phase != SessionPhase::Active || !self.timer.advance(elapsed) {
            return None;
        }
        self.end_session();
        Some(SessionEvent::EndRequested)
    }

    /// Time left before a scheduled end overlay fires.
    pub fn pending_end_in(&self) -> Option<Duration> {
        self.timer.remaining()
    }

    pub fn current_display(&self) -> Option<&Display> {
        self.display.as_ref()
    }

    /// The line currently on screen, with no new draw.
    pub fn say_again(&self) -> Option<&str> {
        self.display.as_ref().map(|d| d.text.as_str())
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn state(&self) -> Option<&NavState> {
        self.state.as_ref()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn current_module(&self) -> Option<&DialogueModule> {
        self.sequencer.as_ref().and_then(ModuleSequencer::current_module)
    }

    pub fn tag(&self, category: &str) -> Option<&str> {
        self.tags.get(category)
    }

    pub fn tags(&self) -> &SessionTags {
        &self.tags
    }

    pub fn content_mode(&self) -> ContentMode {
        self.lines.mode()
    }

    fn active_state(&self) -> Result<&NavState, FlowError> {
        match self.phase {
            SessionPhase::NotStarted => Err(FlowError::NotStarted),
            SessionPhase::Ended => Err(FlowError::SessionEnded),
            SessionPhase::Active => self.state.as_ref().ok_or(FlowError::NotStarted),
        }
    }

    fn node(&self, node_id: &str) -> Result<Node, FlowError> {
        let module = self.current_module().ok_or(FlowError::NoActiveModule)?;
        module
            .node(node_id)
            .cloned()
            .ok_or_else(|| FlowError::NodeNotFound {
                module_id: module.module_id.clone(),
                node_id: node_id.to_string(),
            })
    }

    fn goto(
        &mut self,
        previous: NavState,
        destination: &str,
        context: Option<String>,
    ) -> Result<ChoiceOutcome, FlowError> {
        let node = self.node(destination)?;
        self.timer.cancel();
        self.history.push(previous);
        self.enter(node, context);
        Ok(ChoiceOutcome::Moved {
            node_id: destination.to_string(),
        })
    }

    /// A player choice aimed at the module's entry node starts the
    /// classification over. Runs once per selection, before the option's
    /// own tags are stashed.
    fn clear_tags_on_entry(&mut self, destination: &str) {
        let is_entry = self
            .sequencer
            .as_ref()
            .is_some_and(|s| s.entry_node_id() == destination);
        if is_entry {
            self.tags.clear();
            tracing::debug!(node = destination, "returned to entry node, tags cleared");
        }
    }

    fn show_reaction(
        &mut self,
        node: &Node,
        previous: NavState,
        reaction_key: &str,
        destination: Option<&str>,
        context: Option<&str>,
    ) -> ChoiceOutcome {
        let line = self.lines.resolve(reaction_key);
        let mut state = previous.clone();
        state.reaction = Some(ReactionBeat {
            key: reaction_key.to_string(),
            variant: line.variant,
            destination: destination.map(str::to_string),
            context: context.map(str::to_string),
        });

        self.timer.cancel();
        self.history.push(previous);
        let portrait = self.portraits.resolve_by_key(&state.portrait_key);
        tracing::debug!(node = %node.node_id, reaction = reaction_key, variant = ?line.variant, "showing reaction");
        self.show(node, state, line.text, portrait);
        ChoiceOutcome::ReactionShown
    }

    fn advance_module(
        &mut self,
        previous: NavState,
        context: Option<&str>,
    ) -> Result<ChoiceOutcome, FlowError> {
        let sequencer = self.sequencer.as_mut().ok_or(FlowError::NoActiveModule)?;
        let previous_index = sequencer.index();
        let Some(entry) = sequencer.advance() else {
            tracing::debug!("no module left to advance to");
            return Ok(ChoiceOutcome::NoOp);
        };
        let module_id = sequencer
            .current_module()
            .map(|m| m.module_id.clone())
            .unwrap_or_default();
        let Some(node) = sequencer.current_module().and_then(|m| m.node(&entry)).cloned() else {
            sequencer.restore(previous_index);
            return Err(FlowError::NodeNotFound {
                module_id,
                node_id: entry,
            });
        };

        self.timer.cancel();
        self.history.push(previous);
        self.enter(node, context.map(str::to_string));
        Ok(ChoiceOutcome::ModuleAdvanced {
            module_id,
            node_id: entry,
        })
    }

    /// Arrive at a node: draw its text, resolve its portrait, and arm the
    /// legacy end timer if it asks for one.
    fn enter(&mut self, node: Node, context: Option<String>) {
        let module_index = self.sequencer.as_ref().map_or(0, ModuleSequencer::index);
        let (text, record) = match node.prompt_source(context.as_deref()) {
            PromptSource::Key(key) => {
                let line = self.lines.resolve(key);
                let record = TextRecord::Keyed {
                    key: key.to_string(),
                    variant: line.variant,
                };
                (line.text, record)
            }
            PromptSource::Literal(line) => (line.to_string(), TextRecord::Literal(line.to_string())),
            PromptSource::Empty => (self.lines.missing(&node.node_id), TextRecord::Empty),
        };
        let (portrait, portrait_key) = self.portraits.resolve(&node.portrait_request);

        if node.triggers_end_overlay && node.is_terminal() {
            self.timer.schedule(self.end_delay);
            tracing::debug!(node = %node.node_id, delay_ms = self.end_delay.as_millis() as u64, "end overlay scheduled");
        }

        tracing::debug!(
            node = %node.node_id,
            context = ?context,
            variant = ?record.variant(),
            "entered node"
        );
        let state = NavState {
            module_index,
            node_id: node.node_id.clone(),
            context,
            text: record,
            portrait_key,
            reaction: None,
        };
        self.show(&node, state, text, portrait);
    }

    /// Reproduce a snapshot verbatim. Nothing is drawn.
    fn restore(&mut self, state: NavState) {
        let text = match &state.reaction {
            Some(beat) => self.lines.resolve_exact(&beat.key, beat.variant),
            None => match &state.text {
                TextRecord::Keyed { key, variant } => self.lines.resolve_exact(key, *variant),
                TextRecord::Literal(line) => line.clone(),
                TextRecord::Empty => self.lines.missing(&state.node_id),
            },
        };
        let portrait = self.portraits.resolve_by_key(&state.portrait_key);
        let node = self.node(&state.node_id).unwrap_or_else(|e| {
            tracing::warn!("restoring snapshot without its node: {}", e);
            Node {
                node_id: state.node_id.clone(),
                ..Default::default()
            }
        });
        tracing::debug!(node = %state.node_id, variant = ?state.variant(), "restored snapshot");
        self.show(&node, state, text, portrait);
    }

    fn show(&mut self, node: &Node, state: NavState, text: String, portrait: Option<SpriteRef>) {
        let options = self.options_for(node, &state);
        let module_id = self
            .current_module()
            .map(|m| m.module_id.clone())
            .unwrap_or_default();
        self.display = Some(Display {
            module_id,
            node_id: state.node_id.clone(),
            speaker: node.speaker,
            text,
            portrait,
            portrait_key: state.portrait_key,
            options,
            showing_reaction: state.showing_reaction(),
            phase: self.phase,
        });
        self.state = Some(state);
    }

    fn options_for(&mut self, node: &Node, state: &NavState) -> Vec<DisplayOption> {
        if state.pending_destination().is_some() {
            return vec![DisplayOption {
                label: self.continue_label(),
                kind: OptionKind::ConfirmReaction,
            }];
        }
        if node.is_tap_to_continue() {
            return vec![DisplayOption {
                label: self.continue_label(),
                kind: OptionKind::Continue,
            }];
        }
        node.options
            .iter()
            .enumerate()
            .map(|(i, choice)| DisplayOption {
                label: self.label_for(choice),
                kind: OptionKind::Choice(i),
            })
            .collect()
    }

    /// Keyed labels always use variant 0 so they never change on Back.
    fn label_for(&mut self, choice: &Choice) -> String {
        let literal = choice.label_text.as_deref().filter(|t| !t.is_empty());
        match choice.label_key.as_deref().filter(|k| !k.is_empty()) {
            Some(key) => match (self.lines.lookup(key, Some(0)), literal) {
                (Some(text), _) => text,
                (None, Some(text)) => text.to_string(),
                (None, None) => self.lines.missing(key),
            },
            None => literal.unwrap_or_default().to_string(),
        }
    }

    fn continue_label(&mut self) -> String {
        self.lines
            .lookup(CONTINUE_LABEL_KEY, Some(0))
            .unwrap_or_else(|| CONTINUE_LABEL.to_string())
    }

    fn set_phase(&mut self, phase: SessionPhase) {
        self.phase = phase;
        if let Some(display) = self.display.as_mut() {
            display.phase = phase;
        }
    }
}

/// Builder for constructing a `DialogueEngine`.
pub struct DialogueEngineBuilder {
    config: EngineConfig,
    config_path: Option<String>,
    seed: Option<u64>,
    content_mode: Option<ContentMode>,
    end_delay: Option<Duration>,
    lines: Option<LineSource>,
    portraits: Option<PortraitSource>,
}

impl DialogueEngineBuilder {
    /// Base configuration. Explicit `seed`, `content_mode` and `end_delay`
    /// calls override it.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Load the base configuration from a RON file at build time.
    pub fn config_path(mut self, path: &str) -> Self {
        self.config_path = Some(path.to_string());
        self
    }

    /// Use `lines.ron` (or `lines.json`), `portraits.ron` and, when
    /// present, `config.ron` from a content directory.
    pub fn content_dir(mut self, dir: &str) -> Self {
        let dir = Path::new(dir);
        let ron_lines = dir.join("lines.ron");
        let lines = if ron_lines.exists() {
            ron_lines
        } else {
            dir.join("lines.json")
        };
        self.lines = Some(LineSource::File(lines));
        self.portraits = Some(PortraitSource::File(dir.join("portraits.ron")));
        let config = dir.join("config.ron");
        if config.exists() {
            self.config_path = Some(config.to_string_lossy().into_owned());
        }
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn content_mode(mut self, mode: ContentMode) -> Self {
        self.content_mode = Some(mode);
        self
    }

    pub fn end_delay(mut self, delay: Duration) -> Self {
        self.end_delay = Some(delay);
        self
    }

    /// Lines file, loaded on first use. `.json` files use the JSON format.
    pub fn lines_path(mut self, path: &str) -> Self {
        self.lines = Some(LineSource::File(path.into()));
        self
    }

    pub fn lines_ron(mut self, input: &str) -> Self {
        self.lines = Some(LineSource::Ron(input.to_string()));
        self
    }

    pub fn lines_json(mut self, input: &str) -> Self {
        self.lines = Some(LineSource::Json(input.to_string()));
        self
    }

    /// Provide lines directly (for testing without files).
    pub fn with_lines(mut self, store: LineStore) -> Self {
        self.lines = Some(LineSource::Store(store));
        self
    }

    pub fn portraits_path(mut self, path: &str) -> Self {
        self.portraits = Some(PortraitSource::File(path.into()));
        self
    }

    pub fn portraits_ron(mut self, input: &str) -> Self {
        self.portraits = Some(PortraitSource::Ron(input.to_string()));
        self
    }

    /// Provide portraits directly (for testing without files).
    pub fn with_portraits(mut self, store: PortraitStore) -> Self {
        self.portraits = Some(PortraitSource::Store(store));
        self
    }

    pub fn build(self) -> Result<DialogueEngine, EngineError> {
        let mut config = match &self.config_path {
            Some(path) => EngineConfig::load_from_ron(Path::new(path))?,
            None => self.config,
        };
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(mode) = self.content_mode {
            config.content_mode = mode;
        }
        let end_delay = self.end_delay.unwrap_or_else(|| config.end_delay());

        let source = self
            .lines
            .unwrap_or_else(|| LineSource::Store(LineStore::default()));
        let lines = match config.seed {
            Some(seed) => LinesService::with_seed(source, config.content_mode, seed),
            None => LinesService::new(source, config.content_mode),
        };
        let portraits = self
            .portraits
            .map_or_else(PortraitResolver::empty, PortraitResolver::new);

        Ok(DialogueEngine {
            lines,
            portraits,
            end_delay,
            sequencer: None,
            state: None,
            display: None,
            history: History::default(),
            tags: SessionTags::default(),
            timer: EndTimer::default(),
            phase: SessionPhase::NotStarted,
        })
    }
}
