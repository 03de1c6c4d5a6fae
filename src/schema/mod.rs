//! Content data model: nodes, options, modules, flows, and portrait requests.

pub mod module;
pub mod node;
pub mod portrait;
