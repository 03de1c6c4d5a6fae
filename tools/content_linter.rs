/// Content Linter: validates a content directory's modules against its
/// lines and portraits.
///
/// Usage: content_linter <content_dir>

use checkin_dialogue::core::lines::LineStore;
use checkin_dialogue::core::portrait::PortraitStore;
use checkin_dialogue::schema::module::{DialogueModule, Flow};
use checkin_dialogue::schema::node::{PromptSource, SpecialAction};
use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::process;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: content_linter <content_dir>");
        process::exit(0);
    }

    let dir = Path::new(&args[1]);
    if !dir.is_dir() {
        eprintln!("ERROR: Path '{}' is not a directory", args[1]);
        process::exit(1);
    }

    let flow = match Flow::load_dir(dir) {
        Ok(flow) => flow,
        Err(e) => {
            eprintln!("ERROR: Failed to load flow: {}", e);
            process::exit(1);
        }
    };

    let lines_path = if dir.join("lines.ron").exists() {
        dir.join("lines.ron")
    } else {
        dir.join("lines.json")
    };
    let lines = match LineStore::load(&lines_path) {
        Ok(lines) => lines,
        Err(e) => {
            eprintln!("ERROR: Failed to load {}: {}", lines_path.display(), e);
            process::exit(1);
        }
    };

    let portraits = match PortraitStore::load_from_ron(&dir.join("portraits.ron")) {
        Ok(portraits) => portraits,
        Err(e) => {
            eprintln!("WARNING: No usable portraits.ron ({}), skipping portrait checks", e);
            PortraitStore::default()
        }
    };

    println!(
        "Loaded flow '{}': {} modules, {} line keys, {} portraits",
        flow.flow_id,
        flow.modules.len(),
        lines.len(),
        portraits.len()
    );

    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    for (index, module) in flow.modules.iter().enumerate() {
        let is_last = index + 1 == flow.modules.len();
        lint_module(module, &lines, is_last, &mut errors, &mut warnings);
    }
    lint_lines(&lines, &mut warnings);

    println!("\n=== Content Lint Report ===\n");

    if errors.is_empty() && warnings.is_empty() {
        println!("All checks passed!");
    }

    for warning in &warnings {
        println!("WARNING: {}", warning);
    }

    for error in &errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} errors, {} warnings",
        errors.len(),
        warnings.len()
    );

    if errors.is_empty() {
        process::exit(0);
    } else {
        process::exit(1);
    }
}

fn lint_module(
    module: &DialogueModule,
    lines: &LineStore,
    is_last: bool,
    errors: &mut Vec<String>,
    warnings: &mut Vec<String>,
) {
    let id = &module.module_id;

    if module.entry_node().is_none() {
        errors.push(format!(
            "Module '{}' has no entry node '{}'",
            id, module.entry_node_id
        ));
    }

    for node in &module.nodes {
        let at = format!("{}/{}", id, node.node_id);

        if node.node_id.is_empty() {
            warnings.push(format!("Module '{}' has a node with an empty id", id));
            continue;
        }

        for key in node
            .text_key
            .iter()
            .map(String::as_str)
            .chain(node.text_key_by_context.iter().map(|e| e.text_key.as_str()))
        {
            if lines.get(key).is_none() {
                errors.push(format!("{} uses missing text key '{}'", at, key));
            }
        }

        if node.is_tap_to_continue() {
            match node.tap_continue_target() {
                Some(target) if !module.contains(target) => errors.push(format!(
                    "{} continues to non-existent node '{}'",
                    at, target
                )),
                None => errors.push(format!("{} is tap-to-continue with no target", at)),
                _ => {}
            }
            if !node.options.is_empty() {
                warnings.push(format!("{} is tap-to-continue; its options are never shown", at));
            }
        }

        if node.triggers_end_overlay {
            if node.is_terminal() {
                warnings.push(format!(
                    "{} uses the deprecated end overlay flag; prefer an End option",
                    at
                ));
            } else {
                warnings.push(format!("{} flags the end overlay but is not terminal", at));
            }
        }

        for (i, choice) in node.options.iter().enumerate() {
            let option = format!("{} option {}", at, i + 1);

            if choice.label_key.is_none() && choice.label_text.is_none() {
                warnings.push(format!("{} has no label", option));
            }
            if let Some(key) = choice.label_key.as_deref() {
                if lines.get(key).is_none() && choice.label_text.is_none() {
                    errors.push(format!("{} uses missing label key '{}'", option, key));
                }
            }
            if let Some(key) = choice.reaction_key() {
                if lines.get(key).is_none() {
                    errors.push(format!("{} uses missing reaction key '{}'", option, key));
                }
            }
            if let Some(next) = choice.destination() {
                if choice.special != SpecialAction::None {
                    warnings.push(format!("{} has a special action; 'next' is ignored", option));
                }
                match module.node(next) {
                    None => errors.push(format!(
                        "{} points at non-existent node '{}'",
                        option, next
                    )),
                    Some(target) => {
                        if target.prompt_source(None) == PromptSource::Empty
                            && target.prompt_source(choice.entry_context()) == PromptSource::Empty
                        {
                            warnings.push(format!(
                                "{} reaches '{}' without a context it has text for",
                                option, next
                            ));
                        }
                    }
                }
            }
            if choice.special == SpecialAction::AdvanceModule && is_last {
                warnings.push(format!("{} advances past the last module", option));
            }
        }
    }

    for unreachable in unreachable_nodes(module) {
        warnings.push(format!("{}/{} is unreachable from the entry node", id, unreachable));
    }
}

fn lint_lines(lines: &LineStore, warnings: &mut Vec<String>) {
    let mut keys: Vec<_> = lines.entries().collect();
    keys.sort_by(|a, b| a.key.cmp(&b.key));
    for entry in keys {
        if entry.variants.is_empty() {
            warnings.push(format!("Line '{}' has no variants", entry.key));
        }
        let window = entry.no_repeat_window();
        if window > 0 && window >= entry.variants.len() {
            warnings.push(format!(
                "Line '{}' has a no-repeat window of {} with only {} variants",
                entry.key,
                window,
                entry.variants.len()
            ));
        }
    }
}

/// Breadth-first walk over options and continue targets.
fn unreachable_nodes(module: &DialogueModule) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<&str> = VecDeque::new();
    if module.contains(&module.entry_node_id) {
        queue.push_back(&module.entry_node_id);
    }

    while let Some(id) = queue.pop_front() {
        if !seen.insert(id) {
            continue;
        }
        let Some(node) = module.node(id) else {
            continue;
        };
        let targets = node
            .options
            .iter()
            .filter_map(|c| c.destination())
            .chain(node.tap_continue_target());
        for target in targets {
            if module.contains(target) && !seen.contains(target) {
                queue.push_back(target);
            }
        }
    }

    module
        .nodes
        .iter()
        .filter(|n| !n.node_id.is_empty() && !seen.contains(n.node_id.as_str()))
        .map(|n| n.node_id.clone())
        .collect()
}
