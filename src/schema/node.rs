use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::portrait::PortraitRequest;

/// Who is speaking the node's line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Speaker {
    #[default]
    Esai,
    System,
}

/// How a node hands control back to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AdvanceMode {
    /// Render the node's option list.
    #[default]
    WaitForChoice,
    /// Render a single continue control leading to `tap_continue_node_id`.
    TapToContinue,
}

/// An effect that replaces ordinary graph navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SpecialAction {
    #[default]
    None,
    /// Leave this module and enter the next module's entry node.
    AdvanceModule,
    /// Fire the end-of-session action immediately.
    End,
}

/// One `context → text key` pair of a node's context-indexed lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextLine {
    pub context: String,
    pub text_key: String,
}

/// A player-selectable option attached to a node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    /// Lines-store key for the label. Takes priority over `label_text`.
    #[serde(default)]
    pub label_key: Option<String>,
    #[serde(default)]
    pub label_text: Option<String>,
    /// Destination node id within the current module.
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub special: SpecialAction,
    /// Context tag forwarded to the destination.
    #[serde(default)]
    pub entry_context: Option<String>,
    /// Short acknowledgment line shown before moving on.
    #[serde(default)]
    pub response_text_key: Option<String>,
    /// Classification tags stashed into the session when chosen.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// What choosing an option does, in evaluation priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceEffect<'a> {
    End,
    AdvanceModule,
    /// Show the reaction, then wait for a confirmation before moving.
    TwoBeat { reaction_key: &'a str, destination: &'a str },
    Goto { destination: &'a str },
    /// Legacy dead-end: show the reaction and keep the current options.
    ReactionOnly { reaction_key: &'a str },
    Inert,
}

impl Choice {
    pub fn destination(&self) -> Option<&str> {
        self.next.as_deref().filter(|s| !s.is_empty())
    }

    pub fn reaction_key(&self) -> Option<&str> {
        self.response_text_key.as_deref().filter(|s| !s.is_empty())
    }

    pub fn entry_context(&self) -> Option<&str> {
        self.entry_context.as_deref().filter(|s| !s.is_empty())
    }

    pub fn effect(&self) -> ChoiceEffect<'_> {
        match self.special {
            SpecialAction::End => return ChoiceEffect::End,
            SpecialAction::AdvanceModule => return ChoiceEffect::AdvanceModule,
            SpecialAction::None => {}
        }
        match (self.reaction_key(), self.destination()) {
            (Some(reaction_key), Some(destination)) => ChoiceEffect::TwoBeat {
                reaction_key,
                destination,
            },
            (None, Some(destination)) => ChoiceEffect::Goto { destination },
            (Some(reaction_key), None) => ChoiceEffect::ReactionOnly { reaction_key },
            (None, None) => ChoiceEffect::Inert,
        }
    }
}

/// Where a node's prompt text comes from once the arrival context is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptSource<'a> {
    Key(&'a str),
    Literal(&'a str),
    Empty,
}

/// One addressable step in a dialogue module.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub node_id: String,
    #[serde(default)]
    pub speaker: Speaker,
    #[serde(default)]
    pub text_key: Option<String>,
    /// Direct display line, used when no key applies.
    #[serde(default)]
    pub esai_line: Option<String>,
    #[serde(default)]
    pub text_key_by_context: Vec<ContextLine>,
    #[serde(default)]
    pub portrait_request: PortraitRequest,
    #[serde(default)]
    pub advance_mode: AdvanceMode,
    #[serde(default)]
    pub tap_continue_node_id: Option<String>,
    #[serde(default)]
    pub options: Vec<Choice>,
    /// Deprecated: schedule the end overlay after a delay on arrival.
    /// New content should use an option with `special: End`.
    #[serde(default)]
    pub triggers_end_overlay: bool,
}

impl Node {
    /// Pick the text source for an arrival context. A matching
    /// context-indexed key wins over the plain key, which wins over the
    /// direct line.
    pub fn prompt_source(&self, context: Option<&str>) -> PromptSource<'_> {
        if let Some(ctx) = context {
            if let Some(entry) = self
                .text_key_by_context
                .iter()
                .find(|e| e.context == ctx && !e.text_key.is_empty())
            {
                return PromptSource::Key(&entry.text_key);
            }
        }
        if let Some(key) = self.text_key.as_deref().filter(|k| !k.is_empty()) {
            return PromptSource::Key(key);
        }
        if let Some(line) = self.esai_line.as_deref().filter(|l| !l.is_empty()) {
            return PromptSource::Literal(line);
        }
        PromptSource::Empty
    }

    pub fn tap_continue_target(&self) -> Option<&str> {
        self.tap_continue_node_id.as_deref().filter(|s| !s.is_empty())
    }

    pub fn is_tap_to_continue(&self) -> bool {
        self.advance_mode == AdvanceMode::TapToContinue
    }

    /// No options and no continue control.
    pub fn is_terminal(&self) -> bool {
        self.options.is_empty() && !self.is_tap_to_continue()
    }
}
