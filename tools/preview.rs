/// Preview: interactive shell for playing a content directory.
///
/// Usage: preview [--content <dir>] [--seed <n>] [--production]
///
/// Commands:
///   <n>       pick option n (1-based)
///   back      go back one step
///   again     repeat the current line
///   tags      show session tags
///   state     show navigation state
///   end       fire the end action
///   resume    dismiss the end overlay
///   wait      fast-forward a pending end timer
///   restart   start the flow over
///   help      list commands
///   quit      exit

use checkin_dialogue::core::config::ContentMode;
use checkin_dialogue::core::engine::{DialogueEngine, Display, OptionKind, SessionPhase};
use checkin_dialogue::schema::module::Flow;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::time::Instant;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "checkin_dialogue=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut content_dir = "content/checkin".to_string();
    let mut seed: Option<u64> = None;
    let mut production = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_usage();
                return;
            }
            "--content" if i + 1 < args.len() => {
                i += 1;
                content_dir = args[i].clone();
            }
            "--seed" if i + 1 < args.len() => {
                i += 1;
                seed = args[i].parse().ok();
            }
            "--production" => production = true,
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let flow = match Flow::load_dir(Path::new(&content_dir)) {
        Ok(flow) => flow,
        Err(e) => {
            eprintln!("ERROR: failed to load flow from {}: {}", content_dir, e);
            std::process::exit(1);
        }
    };

    let mut builder = DialogueEngine::builder().content_dir(&content_dir);
    if let Some(seed) = seed {
        builder = builder.seed(seed);
    }
    if production {
        builder = builder.content_mode(ContentMode::Production);
    }
    let mut engine = match builder.build() {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    println!(
        "Loaded flow '{}' with {} modules",
        flow.flow_id,
        flow.modules.len()
    );
    match seed {
        Some(seed) => println!("Seed: {}", seed),
        None => println!("Seed: entropy"),
    }
    println!("Type 'help' for commands.\n");

    if let Err(e) = engine.start(flow.clone()) {
        eprintln!("ERROR: {}", e);
        std::process::exit(1);
    }
    print_display(&engine);

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut last_tick = Instant::now();

    loop {
        let now = Instant::now();
        if let Some(event) = engine.tick(now - last_tick) {
            println!("[{:?}]", event);
        }
        last_tick = now;

        print!("preview> ");
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Ok(n) = line.parse::<usize>() {
            if n == 0 {
                println!("Options are numbered from 1.");
                continue;
            }
            match engine.choose(n - 1) {
                Ok(outcome) => {
                    println!("[{:?}]", outcome);
                    print_display(&engine);
                }
                Err(e) => println!("Error: {}", e),
            }
            continue;
        }

        match line.to_lowercase().as_str() {
            "quit" | "exit" | "q" => {
                println!("Goodbye.");
                break;
            }
            "help" | "h" | "?" => print_help(),
            "back" | "b" => {
                if engine.back() {
                    print_display(&engine);
                } else {
                    println!("Nothing to go back to.");
                }
            }
            "again" | "a" => match engine.say_again() {
                Some(text) => println!("  \"{}\"", text),
                None => println!("Nothing on screen."),
            },
            "tags" => {
                let tags = engine.tags().to_sorted();
                if tags.is_empty() {
                    println!("No tags.");
                }
                for (category, value) in tags {
                    println!("  {} = {}", category, value);
                }
            }
            "state" => match engine.state() {
                Some(state) => {
                    println!("  module index: {}", state.module_index);
                    println!("  node:         {}", state.node_id);
                    println!("  context:      {:?}", state.context);
                    println!("  text:         {:?}", state.text);
                    println!("  portrait:     {}", state.portrait_key);
                    println!("  reaction:     {:?}", state.reaction);
                    println!("  history:      {}", engine.history_len());
                }
                None => println!("No session."),
            },
            "end" => {
                engine.end_session();
                println!("Session ended. Type 'resume' to dismiss.");
            }
            "resume" => {
                if engine.cancel_end_session() {
                    print_display(&engine);
                } else {
                    println!("Session is not ended.");
                }
            }
            "wait" => match engine.pending_end_in() {
                Some(remaining) => {
                    if let Some(event) = engine.tick(remaining) {
                        println!("[{:?}]", event);
                    }
                }
                None => println!("No timer pending."),
            },
            "restart" => match engine.start(flow.clone()) {
                Ok(()) => print_display(&engine),
                Err(e) => println!("Error: {}", e),
            },
            other => println!("Unknown command: {}. Type 'help'.", other),
        }
    }
}

fn print_display(engine: &DialogueEngine) {
    let Some(display) = engine.current_display() else {
        println!("(nothing on screen)");
        return;
    };
    render(display);
    if engine.pending_end_in().is_some() {
        println!("  (end overlay pending)");
    }
}

fn render(display: &Display) {
    let portrait = display
        .portrait
        .as_ref()
        .map_or("<none>", |sprite| sprite.0.as_str());
    println!();
    println!(
        "[{}/{}] {} ({})",
        display.module_id, display.node_id, portrait, display.portrait_key
    );
    let marker = if display.showing_reaction { "~" } else { ">" };
    println!("{:?} {} {}", display.speaker, marker, display.text);
    for (i, option) in display.options.iter().enumerate() {
        let hint = match option.kind {
            OptionKind::Choice(_) => "",
            OptionKind::Continue => " (tap)",
            OptionKind::ConfirmReaction => " (confirm)",
        };
        println!("  {}. {}{}", i + 1, option.label, hint);
    }
    if display.phase == SessionPhase::Ended {
        println!("  [session ended]");
    }
    println!();
}

fn print_usage() {
    println!("Usage: preview [--content <dir>] [--seed <n>] [--production]");
    println!();
    println!("Plays a content directory containing flow.ron, module files,");
    println!("lines.ron (or lines.json), portraits.ron and optionally config.ron.");
    println!("Set RUST_LOG=checkin_dialogue=debug to trace transitions.");
}

fn print_help() {
    println!("Commands:");
    println!("  <n>       Pick option n");
    println!("  back      Go back one step");
    println!("  again     Repeat the current line");
    println!("  tags      Show session tags");
    println!("  state     Show navigation state");
    println!("  end       Fire the end action");
    println!("  resume    Dismiss the end overlay");
    println!("  wait      Fast-forward a pending end timer");
    println!("  restart   Start the flow over");
    println!("  help      Show this help");
    println!("  quit      Exit");
}
