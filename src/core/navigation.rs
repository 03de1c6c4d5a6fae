/// Navigation state and the snapshot history behind back navigation.

use crate::schema::portrait::PortraitKey;

/// How the prompt text on screen was produced, so it can be replayed
/// without a new draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextRecord {
    Keyed { key: String, variant: Option<usize> },
    Literal(String),
    /// The node had no text source; a fallback marker was shown.
    Empty,
}

impl TextRecord {
    pub fn variant(&self) -> Option<usize> {
        match self {
            TextRecord::Keyed { variant, .. } => *variant,
            _ => None,
        }
    }
}

/// A reaction line shown over the current node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionBeat {
    pub key: String,
    pub variant: Option<usize>,
    /// Where the confirmation leads. `None` for a legacy dead-end reaction,
    /// which keeps the node's options on screen.
    pub destination: Option<String>,
    /// Context forwarded to `destination` on confirmation.
    pub context: Option<String>,
}

/// Everything needed to reproduce one user-visible state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavState {
    pub module_index: usize,
    pub node_id: String,
    pub context: Option<String>,
    pub text: TextRecord,
    pub portrait_key: PortraitKey,
    pub reaction: Option<ReactionBeat>,
}

impl NavState {
    pub fn showing_reaction(&self) -> bool {
        self.reaction.is_some()
    }

    /// Pending two-beat destination, if the reaction is waiting for a tap.
    pub fn pending_destination(&self) -> Option<&str> {
        self.reaction.as_ref().and_then(|r| r.destination.as_deref())
    }

    /// The variant index of whatever line is on screen.
    pub fn variant(&self) -> Option<usize> {
        match &self.reaction {
            Some(reaction) => reaction.variant,
            None => self.text.variant(),
        }
    }
}

/// Stack of snapshots, most recent last.
#[derive(Debug, Clone, Default)]
pub struct History {
    stack: Vec<NavState>,
}

impl History {
    pub fn push(&mut self, state: NavState) {
        self.stack.push(state);
    }

    pub fn pop(&mut self) -> Option<NavState> {
        self.stack.pop()
    }

    pub fn peek(&self) -> Option<&NavState> {
        self.stack.last()
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::portrait::{Modifier, Mood};

    fn state(node: &str, variant: Option<usize>) -> NavState {
        NavState {
            module_index: 0,
            node_id: node.to_string(),
            context: None,
            text: TextRecord::Keyed {
                key: format!("{}.prompt", node),
                variant,
            },
            portrait_key: PortraitKey::new(Mood::Friendly, 0, Modifier::Default),
            reaction: None,
        }
    }

    #[test]
    fn history_is_lifo() {
        let mut history = History::default();
        history.push(state("root", Some(0)));
        history.push(state("okay", Some(2)));
        assert_eq!(history.len(), 2);
        assert_eq!(history.peek().map(|s| s.node_id.as_str()), Some("okay"));
        assert_eq!(history.pop().unwrap().node_id, "okay");
        assert_eq!(history.pop().unwrap().node_id, "root");
        assert!(history.pop().is_none());
    }

    #[test]
    fn reaction_variant_takes_precedence() {
        let mut s = state("something", Some(1));
        assert_eq!(s.variant(), Some(1));
        assert!(!s.showing_reaction());

        s.reaction = Some(ReactionBeat {
            key: "something.conflict".to_string(),
            variant: Some(3),
            destination: Some("something_clarify".to_string()),
            context: Some("conflict".to_string()),
        });
        assert_eq!(s.variant(), Some(3));
        assert_eq!(s.pending_destination(), Some("something_clarify"));
    }
}
