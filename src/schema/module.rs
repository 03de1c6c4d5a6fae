use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use super::node::Node;

/// Files in a content directory that are not dialogue modules.
const NON_MODULE_FILES: &[&str] = &["flow.ron", "config.ron", "lines.ron", "portraits.ron"];

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("flow references unknown module: {0}")]
    UnknownModule(String),
    #[error("flow '{0}' has no modules")]
    EmptyFlow(String),
}

/// A self-contained node graph with one entry point.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DialogueModule {
    pub module_id: String,
    #[serde(default = "default_entry_node")]
    pub entry_node_id: String,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(skip)]
    lookup: FxHashMap<String, usize>,
}

fn default_entry_node() -> String {
    "root".to_string()
}

impl DialogueModule {
    pub fn new(module_id: &str, entry_node_id: &str, nodes: Vec<Node>) -> Self {
        let mut module = Self {
            module_id: module_id.to_string(),
            entry_node_id: entry_node_id.to_string(),
            nodes,
            lookup: FxHashMap::default(),
        };
        module.build_lookup();
        module
    }

    /// Parse a module from a RON string and build its lookup.
    pub fn parse_ron(input: &str) -> Result<DialogueModule, ContentError> {
        let mut module: DialogueModule = ron::from_str(input)?;
        module.build_lookup();
        Ok(module)
    }

    pub fn load_from_ron(path: &Path) -> Result<DialogueModule, ContentError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Rebuild the node-id index. Nodes with an empty id are skipped and a
    /// later node with a duplicate id replaces the earlier one.
    pub fn build_lookup(&mut self) {
        self.lookup.clear();
        for (index, node) in self.nodes.iter().enumerate() {
            if node.node_id.is_empty() {
                continue;
            }
            if self.lookup.insert(node.node_id.clone(), index).is_some() {
                tracing::warn!(
                    module = %self.module_id,
                    node = %node.node_id,
                    "duplicate node id, later definition wins"
                );
            }
        }
    }

    pub fn node(&self, node_id: &str) -> Option<&Node> {
        self.lookup.get(node_id).and_then(|&i| self.nodes.get(i))
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.lookup.contains_key(node_id)
    }

    pub fn entry_node(&self) -> Option<&Node> {
        self.node(&self.entry_node_id)
    }
}

/// On-disk flow description: module references by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowDef {
    pub flow_id: String,
    pub modules: Vec<String>,
}

impl FlowDef {
    pub fn parse_ron(input: &str) -> Result<FlowDef, ContentError> {
        Ok(ron::from_str(input)?)
    }

    pub fn load_from_ron(path: &Path) -> Result<FlowDef, ContentError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Resolve module references against a library.
    pub fn resolve(&self, library: &ModuleLibrary) -> Result<Flow, ContentError> {
        if self.modules.is_empty() {
            return Err(ContentError::EmptyFlow(self.flow_id.clone()));
        }
        let mut modules = Vec::with_capacity(self.modules.len());
        for id in &self.modules {
            let module = library
                .get(id)
                .ok_or_else(|| ContentError::UnknownModule(id.clone()))?;
            modules.push(module.clone());
        }
        Ok(Flow {
            flow_id: self.flow_id.clone(),
            modules,
        })
    }
}

/// An ordered sequence of modules traversed as one session.
#[derive(Debug, Clone, Default)]
pub struct Flow {
    pub flow_id: String,
    pub modules: Vec<DialogueModule>,
}

impl Flow {
    pub fn new(flow_id: &str, modules: Vec<DialogueModule>) -> Self {
        Self {
            flow_id: flow_id.to_string(),
            modules,
        }
    }

    /// Load `flow.ron` from a content directory and resolve it against the
    /// modules in the same directory.
    pub fn load_dir(dir: &Path) -> Result<Flow, ContentError> {
        let library = ModuleLibrary::load_dir(dir)?;
        let def = FlowDef::load_from_ron(&dir.join("flow.ron"))?;
        def.resolve(&library)
    }

    /// A flow made of one module.
    pub fn single(module: DialogueModule) -> Self {
        Self {
            flow_id: module.module_id.clone(),
            modules: vec![module],
        }
    }
}

impl From<DialogueModule> for Flow {
    fn from(module: DialogueModule) -> Self {
        Flow::single(module)
    }
}

/// All loaded modules, keyed by module id.
#[derive(Debug, Clone, Default)]
pub struct ModuleLibrary {
    modules: FxHashMap<String, DialogueModule>,
}

impl ModuleLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, module: DialogueModule) {
        self.modules.insert(module.module_id.clone(), module);
    }

    pub fn get(&self, module_id: &str) -> Option<&DialogueModule> {
        self.modules.get(module_id)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Load every module `.ron` file in a directory.
    pub fn load_dir(dir: &Path) -> Result<ModuleLibrary, ContentError> {
        let mut library = ModuleLibrary::new();
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) != Some("ron") {
                continue;
            }
            let file_name = path.file_name().and_then(|s| s.to_str()).unwrap_or("");
            if NON_MODULE_FILES.contains(&file_name) {
                continue;
            }
            paths.push(path);
        }
        // read_dir order is platform dependent
        paths.sort();
        for path in paths {
            let module = DialogueModule::load_from_ron(&path)?;
            tracing::debug!(module = %module.module_id, path = %path.display(), "loaded module");
            library.register(module);
        }
        Ok(library)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODULE_RON: &str = r#"#![enable(implicit_some)]
    (
        module_id: "checkin",
        entry_node_id: "root",
        nodes: [
            (node_id: "root", esai_line: "first"),
            (node_id: "okay", esai_line: "okay"),
            (node_id: "root", esai_line: "second"),
            (node_id: "", esai_line: "nameless"),
        ],
    )"#;

    #[test]
    fn duplicate_ids_last_write_wins() {
        let module = DialogueModule::parse_ron(MODULE_RON).unwrap();
        assert_eq!(
            module.node("root").and_then(|n| n.esai_line.as_deref()),
            Some("second")
        );
        assert!(module.contains("okay"));
        assert!(!module.contains(""));
    }

    #[test]
    fn entry_defaults_to_root() {
        let module = DialogueModule::parse_ron(r#"(module_id: "m", nodes: [(node_id: "root")])"#).unwrap();
        assert_eq!(module.entry_node_id, "root");
        assert!(module.entry_node().is_some());
    }

    #[test]
    fn lookup_rebuilt_after_edit() {
        let mut module = DialogueModule::new("m", "root", Vec::new());
        assert!(module.node("root").is_none());
        module.nodes.push(Node {
            node_id: "root".to_string(),
            ..Default::default()
        });
        assert!(module.node("root").is_none());
        module.build_lookup();
        assert!(module.node("root").is_some());
    }

    #[test]
    fn flow_resolution() {
        let mut library = ModuleLibrary::new();
        library.register(DialogueModule::new("a", "root", Vec::new()));
        library.register(DialogueModule::new("b", "start", Vec::new()));

        let def = FlowDef::parse_ron(r#"(flow_id: "main", modules: ["a", "b"])"#).unwrap();
        let flow = def.resolve(&library).unwrap();
        assert_eq!(flow.modules.len(), 2);
        assert_eq!(flow.modules[1].entry_node_id, "start");

        let bad = FlowDef {
            flow_id: "bad".to_string(),
            modules: vec!["a".to_string(), "missing".to_string()],
        };
        assert!(matches!(bad.resolve(&library), Err(ContentError::UnknownModule(id)) if id == "missing"));

        let empty = FlowDef {
            flow_id: "empty".to_string(),
            modules: Vec::new(),
        };
        assert!(matches!(empty.resolve(&library), Err(ContentError::EmptyFlow(_))));
    }
}
