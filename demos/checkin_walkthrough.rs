/// Check-in walkthrough: plays a scripted session through the bundled
/// content, including a two-beat reaction, a back step, and the move into
/// the wind-down module.
///
/// Run with: cargo run --example checkin_walkthrough

use checkin_dialogue::core::engine::{ChoiceOutcome, DialogueEngine, Display, OptionKind};
use checkin_dialogue::schema::module::Flow;
use std::path::Path;

const CONTENT_DIR: &str = "content/checkin";

fn main() {
    let flow = Flow::load_dir(Path::new(CONTENT_DIR)).expect("Failed to load check-in flow");

    let mut engine = DialogueEngine::builder()
        .content_dir(CONTENT_DIR)
        .seed(2026)
        .build()
        .expect("Failed to build engine");

    engine.start(flow).expect("Failed to start session");

    println!("=== Check-in walkthrough ===\n");
    show(&engine);

    // --- Something happened: reaction first, then the clarifying question ---
    pick(&mut engine, 2);
    pick(&mut engine, 0);
    pick(&mut engine, 0);

    // --- Changed my mind: step back twice and take another route ---
    println!("--- back ---\n");
    engine.back();
    engine.back();
    show(&engine);
    println!("--- back ---\n");
    engine.back();
    engine.back();
    show(&engine);

    // --- I'm okay: keep it light and celebrate ---
    pick(&mut engine, 0);
    pick(&mut engine, 0);
    pick(&mut engine, 1);
    pick(&mut engine, 0);

    println!("Tags so far: {:?}\n", engine.tags().to_sorted());

    // --- Into the wind-down module ---
    pick(&mut engine, 2);
    pick(&mut engine, 1);
    pick(&mut engine, 1);
    pick(&mut engine, 2);

    if let Some(remaining) = engine.pending_end_in() {
        println!("(end overlay in {} ms)", remaining.as_millis());
        if let Some(event) = engine.tick(remaining) {
            println!("[{:?}] phase = {:?}", event, engine.phase());
        }
    }
}

fn pick(engine: &mut DialogueEngine, index: usize) {
    let label = engine
        .current_display()
        .and_then(|d| d.options.get(index))
        .map(|o| o.label.clone())
        .unwrap_or_default();
    println!("  -> {}", label);
    match engine.choose(index) {
        Ok(ChoiceOutcome::ModuleAdvanced { module_id, .. }) => {
            println!("  [entering module '{}']\n", module_id)
        }
        Ok(_) => println!(),
        Err(e) => println!("  [error: {}]\n", e),
    }
    show(engine);
}

fn show(engine: &DialogueEngine) {
    let Some(display) = engine.current_display() else {
        return;
    };
    print_display(display);
}

fn print_display(display: &Display) {
    let portrait = display
        .portrait
        .as_ref()
        .map_or("-", |sprite| sprite.0.as_str());
    println!("[{}] {}", display.node_id, portrait);
    println!("{:?}: {}", display.speaker, display.text);
    for (i, option) in display.options.iter().enumerate() {
        match option.kind {
            OptionKind::Choice(_) => println!("  {}. {}", i + 1, option.label),
            OptionKind::Continue | OptionKind::ConfirmReaction => {
                println!("  [{}]", option.label)
            }
        }
    }
    println!();
}
