/// Flow integration tests: whole sessions over the bundled check-in content.

use checkin_dialogue::core::config::ContentMode;
use checkin_dialogue::core::engine::{
    ChoiceOutcome, DialogueEngine, FlowError, OptionKind, SessionEvent, SessionPhase,
};
use checkin_dialogue::schema::module::{DialogueModule, Flow};
use checkin_dialogue::schema::node::{Node, Speaker};
use std::path::Path;
use std::time::Duration;

const CONTENT_DIR: &str = "content/checkin";

fn session(seed: u64) -> DialogueEngine {
    let mut engine = DialogueEngine::builder()
        .content_dir(CONTENT_DIR)
        .seed(seed)
        .build()
        .unwrap();
    engine
        .start(Flow::load_dir(Path::new(CONTENT_DIR)).unwrap())
        .unwrap();
    engine
}

fn node_id(engine: &DialogueEngine) -> String {
    engine.current_display().unwrap().node_id.clone()
}

fn text(engine: &DialogueEngine) -> String {
    engine.current_display().unwrap().text.clone()
}

#[test]
fn light_path_through_both_modules() {
    let mut engine = session(11);
    assert_eq!(node_id(&engine), "root");
    let greeting = text(&engine);

    engine.choose(0).unwrap(); // okay
    engine.choose(0).unwrap(); // keep it light
    engine.choose(1).unwrap(); // a moment that made me smile
    assert_eq!(text(&engine), "Hold onto that one. Small moments add up.");
    let celebrate = engine.current_display().unwrap().clone();
    assert_eq!(celebrate.options.len(), 1);
    assert_eq!(celebrate.options[0].kind, OptionKind::Continue);
    assert_eq!(celebrate.options[0].label, "Continue.");

    engine.choose(0).unwrap();
    assert_eq!(node_id(&engine), "hub_checkin");
    assert_eq!(engine.state().unwrap().context.as_deref(), Some("smile"));

    let outcome = engine.choose(2).unwrap();
    assert_eq!(
        outcome,
        ChoiceOutcome::ModuleAdvanced {
            module_id: "winddown".to_string(),
            node_id: "winddown_root".to_string()
        }
    );
    assert_eq!(text(&engine), "Good call. Let's wind down together.");

    engine.choose(2).unwrap();
    let goodnight = engine.current_display().unwrap().clone();
    assert_eq!(goodnight.speaker, Speaker::System);
    assert!(goodnight.options.is_empty());
    assert!(engine.pending_end_in().is_some(), "goodnight schedules the end overlay");

    // back out of the terminal node, across the module boundary, to the start
    assert!(engine.back());
    assert!(engine.pending_end_in().is_none());
    assert_eq!(engine.tick(Duration::from_secs(10)), None);
    assert_eq!(node_id(&engine), "winddown_root");
    assert!(engine.back());
    assert_eq!(node_id(&engine), "hub_checkin");
    assert_eq!(engine.current_module().unwrap().module_id, "checkin");
    assert!(engine.back());
    assert_eq!(celebrate, *engine.current_display().unwrap());
    while engine.back() {}
    assert_eq!(node_id(&engine), "root");
    assert_eq!(text(&engine), greeting);
}

#[test]
fn goodnight_timer_ends_session() {
    let mut engine = session(3);
    for index in [0, 0, 0, 0] {
        engine.choose(index).unwrap(); // okay → light → accomplishment → hub
    }
    engine.choose(2).unwrap();
    engine.choose(2).unwrap();
    assert_eq!(engine.pending_end_in(), Some(Duration::from_millis(1500)));

    assert_eq!(engine.tick(Duration::from_millis(1000)), None);
    assert_eq!(engine.pending_end_in(), Some(Duration::from_millis(500)));
    assert_eq!(engine.tick(Duration::from_millis(500)), Some(SessionEvent::EndRequested));
    assert_eq!(engine.phase(), SessionPhase::Ended);
    assert_eq!(engine.current_display().unwrap().phase, SessionPhase::Ended);
}

#[test]
fn two_beat_event_with_context() {
    let mut engine = session(21);
    engine.choose(2).unwrap(); // something happened
    assert_eq!(engine.choose(0), Ok(ChoiceOutcome::ReactionShown));

    let reaction = engine.current_display().unwrap().clone();
    assert!(reaction.showing_reaction);
    assert!(
        reaction.text == "That hurts. I'm sorry." || reaction.text == "Ouch. Being hurt by someone is heavy."
    );
    assert_eq!(reaction.options[0].kind, OptionKind::ConfirmReaction);
    assert_eq!(engine.tag("event"), Some("conflict"));
    assert_eq!(engine.tag("state"), Some("event"));

    engine.choose(0).unwrap();
    assert_eq!(node_id(&engine), "event_clarify");
    assert_eq!(text(&engine), "Is it more the situation, or how it made you feel?");

    engine.choose(0).unwrap();
    assert_eq!(text(&engine), "That makes sense. What would help right now?");

    engine.back();
    engine.back();
    assert_eq!(*engine.current_display().unwrap(), reaction);
}

#[test]
fn dead_end_reaction_rotates_without_repeats() {
    let mut engine = session(5);
    engine.choose(3).unwrap(); // I don't know
    let prompt = engine.current_display().unwrap().clone();

    let mut seen = Vec::new();
    for _ in 0..3 {
        assert_eq!(engine.choose(2), Ok(ChoiceOutcome::ReactionShown));
        let shown = engine.current_display().unwrap();
        assert_eq!(shown.node_id, "dontknow");
        assert_eq!(shown.options.len(), 3);
        seen.push(shown.text.clone());
    }
    assert_ne!(seen[0], seen[1]);
    assert_ne!(seen[1], seen[2]);
    assert_ne!(seen[0], seen[2]);

    // each reaction is its own snapshot
    for expected in seen.iter().rev().skip(1) {
        assert!(engine.back());
        assert_eq!(&text(&engine), expected);
    }
    assert!(engine.back());
    assert_eq!(*engine.current_display().unwrap(), prompt);
}

#[test]
fn check_in_again_clears_tags() {
    let mut engine = session(8);
    engine.choose(1).unwrap(); // support
    engine.choose(2).unwrap(); // reassurance
    assert_eq!(engine.tag("state"), Some("support"));
    assert_eq!(engine.tag("support"), Some("reassurance"));

    engine.choose(0).unwrap(); // thanks → hub
    engine.choose(0).unwrap(); // check in again
    assert_eq!(node_id(&engine), "root");
    assert!(engine.tags().is_empty());
    assert!(engine.can_go_back());
}

#[test]
fn context_flows_through_tap_to_continue() {
    let mut engine = session(13);
    engine.choose(3).unwrap(); // I don't know
    engine.choose(0).unwrap(); // emotions
    engine.choose(0).unwrap(); // anxious
    assert_eq!(
        text(&engine),
        "Anxiety is exhausting. Your body's trying to protect you."
    );
    engine.choose(0).unwrap();
    assert_eq!(node_id(&engine), "support_select_state");
    assert_eq!(text(&engine), "Want to slow things down together?");
    assert_eq!(engine.tag("emotion"), Some("anxious"));
}

#[test]
fn end_and_cancel_end() {
    let mut engine = session(2);
    engine.choose(1).unwrap();
    engine.choose(2).unwrap();
    engine.choose(0).unwrap(); // hub
    engine.choose(3).unwrap(); // session close
    let close = engine.current_display().unwrap().clone();
    assert_eq!(close.options[0].label, "Okay.");

    assert_eq!(engine.choose(0), Ok(ChoiceOutcome::SessionEnded));
    assert_eq!(engine.choose(0), Err(FlowError::SessionEnded));
    assert!(!engine.can_go_back());

    assert!(engine.cancel_end_session());
    assert_eq!(engine.phase(), SessionPhase::Active);
    assert_eq!(text(&engine), close.text);
    assert!(engine.back());
    assert_eq!(node_id(&engine), "hub_checkin");
}

#[test]
fn same_seed_replays_same_session() {
    let path = [0, 1, 0, 0, 1, 2, 0, 0];
    let mut a = session(77);
    let mut b = session(77);
    for index in path {
        a.choose(index).unwrap();
        b.choose(index).unwrap();
        assert_eq!(a.current_display(), b.current_display());
    }
}

#[test]
fn loop_fixture_tap_back_to_root_clears_tags() {
    let module = DialogueModule::load_from_ron(Path::new("tests/fixtures/loop.ron")).unwrap();
    let mut engine = DialogueEngine::builder().seed(1).build().unwrap();
    engine.start(module).unwrap();

    engine.choose(0).unwrap();
    assert_eq!(engine.tag("lap"), Some("one"));
    let middle = engine.current_display().unwrap();
    assert_eq!(middle.options[0].kind, OptionKind::Continue);
    assert_eq!(middle.options[0].label, "Continue");

    engine.choose(0).unwrap();
    assert_eq!(node_id(&engine), "root");
    assert!(engine.tags().is_empty());
    assert_eq!(engine.history_len(), 2);
}

#[test]
fn production_mode_hides_missing_keys() {
    let module = DialogueModule::new(
        "sparse",
        "root",
        vec![Node {
            node_id: "root".to_string(),
            text_key: Some("never.written".to_string()),
            ..Default::default()
        }],
    );

    let mut engine = DialogueEngine::builder()
        .content_mode(ContentMode::Production)
        .build()
        .unwrap();
    engine.start(module.clone()).unwrap();
    assert_eq!(text(&engine), "...");
    assert!(engine.current_display().unwrap().portrait.is_none());

    let mut engine = DialogueEngine::builder()
        .content_mode(ContentMode::Development)
        .build()
        .unwrap();
    engine.start(module).unwrap();
    assert_eq!(text(&engine), "MISSING_TEXTKEY: never.written");
}

#[test]
fn load_content_dir_helper() {
    let (mut engine, flow) = DialogueEngine::load_content_dir(CONTENT_DIR).unwrap();
    assert_eq!(flow.modules.len(), 2);
    engine.start(flow).unwrap();
    assert_eq!(engine.current_display().unwrap().module_id, "checkin");
    assert_eq!(engine.content_mode(), ContentMode::Development);
}
