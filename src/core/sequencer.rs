/// Module sequencer: walks a flow's modules in order.

use crate::schema::module::{DialogueModule, Flow};

/// Entry node assumed when no module is active.
const DEFAULT_ENTRY_NODE: &str = "root";

#[derive(Debug, Clone, Default)]
pub struct ModuleSequencer {
    flow: Flow,
    index: usize,
}

impl ModuleSequencer {
    /// Start at the flow's first module, with its lookup built.
    pub fn new(mut flow: Flow) -> Self {
        if let Some(first) = flow.modules.first_mut() {
            first.build_lookup();
        }
        Self { flow, index: 0 }
    }

    pub fn flow_id(&self) -> &str {
        &self.flow.flow_id
    }

    pub fn current_module(&self) -> Option<&DialogueModule> {
        self.flow.modules.get(self.index)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 >= self.flow.modules.len()
    }

    pub fn entry_node_id(&self) -> &str {
        self.current_module()
            .map_or(DEFAULT_ENTRY_NODE, |m| m.entry_node_id.as_str())
    }

    /// Move to the next module and return its entry node id. At the end of
    /// the flow this returns `None` and changes nothing.
    pub fn advance(&mut self) -> Option<String> {
        if self.is_last() {
            return None;
        }
        self.index += 1;
        let module = self.flow.modules.get_mut(self.index)?;
        module.build_lookup();
        tracing::debug!(module = %module.module_id, index = self.index, "advanced module");
        Some(module.entry_node_id.clone())
    }

    /// Jump back to a module recorded earlier in the session.
    pub(crate) fn restore(&mut self, index: usize) {
        if index < self.flow.modules.len() && index != self.index {
            self.index = index;
            if let Some(module) = self.flow.modules.get_mut(index) {
                module.build_lookup();
            }
        }
    }
}
