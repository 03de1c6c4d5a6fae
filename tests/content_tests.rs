/// Content integration tests: the bundled check-in content and fixtures load
/// and hang together.

use checkin_dialogue::core::config::{ContentMode, EngineConfig};
use checkin_dialogue::core::lines::{LineSource, LineStore, LinesService};
use checkin_dialogue::core::portrait::{PortraitResolver, PortraitSource, PortraitStore};
use checkin_dialogue::schema::module::{ContentError, DialogueModule, Flow, FlowDef, ModuleLibrary};
use checkin_dialogue::schema::node::{AdvanceMode, PromptSource};
use checkin_dialogue::schema::portrait::{Modifier, Mood, PortraitKey, PortraitRequest, SpriteRef};
use std::path::Path;

const CONTENT_DIR: &str = "content/checkin";

fn bundled_flow() -> Flow {
    Flow::load_dir(Path::new(CONTENT_DIR)).unwrap()
}

fn bundled_lines() -> LineStore {
    LineStore::load(&Path::new(CONTENT_DIR).join("lines.ron")).unwrap()
}

#[test]
fn bundled_flow_loads_in_order() {
    let flow = bundled_flow();
    assert_eq!(flow.flow_id, "daily_checkin");
    let ids: Vec<&str> = flow.modules.iter().map(|m| m.module_id.as_str()).collect();
    assert_eq!(ids, vec!["checkin", "winddown"]);
    assert_eq!(flow.modules[0].entry_node_id, "root");
    assert_eq!(flow.modules[1].entry_node_id, "winddown_root");
}

#[test]
fn every_destination_exists() {
    for module in bundled_flow().modules {
        assert!(
            module.entry_node().is_some(),
            "module '{}' has no entry node",
            module.module_id
        );
        for node in &module.nodes {
            for choice in &node.options {
                if let Some(next) = choice.destination() {
                    assert!(
                        module.contains(next),
                        "{}/{} points at missing node '{}'",
                        module.module_id,
                        node.node_id,
                        next
                    );
                }
            }
            if node.advance_mode == AdvanceMode::TapToContinue {
                let target = node.tap_continue_target();
                assert!(
                    target.is_some_and(|t| module.contains(t)),
                    "{}/{} has a broken continue target",
                    module.module_id,
                    node.node_id
                );
            }
        }
    }
}

#[test]
fn every_text_key_has_lines() {
    let lines = bundled_lines();
    let mut missing = Vec::new();
    for module in bundled_flow().modules {
        for node in &module.nodes {
            let mut keys: Vec<&str> = node.text_key.iter().map(String::as_str).collect();
            keys.extend(node.text_key_by_context.iter().map(|e| e.text_key.as_str()));
            for choice in &node.options {
                keys.extend(choice.label_key.as_deref());
                keys.extend(choice.reaction_key());
            }
            for key in keys {
                if lines.get(key).is_none() {
                    missing.push(format!("{}/{}: {}", module.module_id, node.node_id, key));
                }
            }
        }
    }
    assert!(missing.is_empty(), "missing lines: {:?}", missing);
}

#[test]
fn context_only_nodes_are_always_entered_with_context() {
    // A node with no plain text source must only be reachable with a context it knows.
    for module in bundled_flow().modules {
        for node in &module.nodes {
            for choice in &node.options {
                let Some(target) = choice.destination().and_then(|d| module.node(d)) else {
                    continue;
                };
                if target.prompt_source(None) == PromptSource::Empty {
                    assert!(
                        target.prompt_source(choice.entry_context()) != PromptSource::Empty,
                        "{} reaches {} without a usable context",
                        node.node_id,
                        target.node_id
                    );
                }
            }
        }
    }
}

#[test]
fn every_portrait_request_resolves() {
    let mut portraits =
        PortraitResolver::new(PortraitSource::File(Path::new(CONTENT_DIR).join("portraits.ron")));
    for module in bundled_flow().modules {
        for node in &module.nodes {
            let (sprite, _) = portraits.resolve(&node.portrait_request);
            assert!(sprite.is_some(), "no portrait for {}", node.node_id);
        }
    }
}

#[test]
fn bundled_config_loads() {
    let config = EngineConfig::load_from_ron(&Path::new(CONTENT_DIR).join("config.ron")).unwrap();
    assert_eq!(config.end_delay_ms, 1500);
    assert_eq!(config.seed, None);
}

#[test]
fn fixture_config_overrides_defaults() {
    let config = EngineConfig::load_from_ron(Path::new("tests/fixtures/config.ron")).unwrap();
    assert_eq!(config.content_mode, ContentMode::Production);
    assert_eq!(config.end_delay_ms, 250);
    assert_eq!(config.seed, Some(7));
}

#[test]
fn json_lines_fixture() {
    let store = LineStore::load(Path::new("tests/fixtures/lines.json")).unwrap();
    // empty key skipped, duplicate key keeps the later entry
    assert_eq!(store.len(), 2);
    assert_eq!(
        store.get("hub.checkin").map(|e| e.variants[0].text.as_str()),
        Some("What now?")
    );
    let greeting = store.get("root.greeting").unwrap();
    assert_eq!(greeting.no_repeat_window(), 1);
    assert_eq!(greeting.variants[1].effective_weight(), 1);
}

#[test]
fn json_window_alternates_two_variants() {
    let mut lines = LinesService::with_seed(
        LineSource::File("tests/fixtures/lines.json".into()),
        ContentMode::Production,
        99,
    );
    let mut previous = lines.resolve("root.greeting").variant;
    for _ in 0..20 {
        let next = lines.resolve("root.greeting").variant;
        assert_ne!(next, previous);
        previous = next;
    }
    assert_eq!(lines.resolve("nope").text, "...");
}

#[test]
fn portrait_fixture_first_wins() {
    let store = PortraitStore::load_from_ron(Path::new("tests/fixtures/portraits.ron")).unwrap();
    assert_eq!(store.len(), 2);
    let mut portraits = PortraitResolver::new(PortraitSource::Store(store));

    let (sprite, key) = portraits.resolve(&PortraitRequest::new(Mood::Sad, 4, Modifier::WideEyes));
    assert_eq!(sprite, Some(SpriteRef("sad_0.png".to_string())));
    assert_eq!(key, PortraitKey::new(Mood::Sad, 0, Modifier::Default));

    // the spriteless entry was dropped, so this falls through to neutral
    let (sprite, _) = portraits.resolve(&PortraitRequest::new(Mood::Shocked, 2, Modifier::Default));
    assert_eq!(sprite, Some(SpriteRef("neutral.png".to_string())));
}

#[test]
fn broken_flow_reports_unknown_module() {
    let library = ModuleLibrary::load_dir(Path::new(CONTENT_DIR)).unwrap();
    assert_eq!(library.len(), 2);
    let def = FlowDef::load_from_ron(Path::new("tests/fixtures/broken_flow.ron")).unwrap();
    match def.resolve(&library) {
        Err(ContentError::UnknownModule(id)) => assert_eq!(id, "does_not_exist"),
        other => panic!("expected unknown module, got {:?}", other.map(|f| f.flow_id)),
    }
}

#[test]
fn loop_fixture_parses() {
    let module = DialogueModule::load_from_ron(Path::new("tests/fixtures/loop.ron")).unwrap();
    assert_eq!(module.entry_node_id, "root");
    let middle = module.node("middle").unwrap();
    assert!(middle.is_tap_to_continue());
    assert_eq!(middle.tap_continue_target(), Some("root"));
}
