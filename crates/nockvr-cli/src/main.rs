//! `nockvr` – command line front end for the arrow-nock engine.
//!
//! ```text
//! nockvr replay <scenario.toml> [--config <path>]
//! nockvr check-config [path]
//! nockvr init [path]
//! nockvr schema
//! ```
//!
//! `replay` runs a scripted scenario against the simulated world and prints
//! every state transition with the synthetic-input commands it issued.
//! `check-config` prints the effective settings after defaults and
//! environment overrides are applied.  `init` writes a default settings file
//! and `schema` prints its JSON Schema.

mod config;
mod scenario;

use std::path::PathBuf;
use std::process::ExitCode;

use colored::Colorize;
use nockvr_runtime::{Command, NockState};
use nockvr_types::NockSettings;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("replay") => cmd_replay(&args[1..]),
        Some("check-config") => cmd_check_config(args.get(1).map(PathBuf::from)),
        Some("schema") => cmd_schema(),
        Some("init") => cmd_init(args.get(1).map(PathBuf::from)),
        Some("help" | "--help" | "-h") | None => {
            print_usage();
            ExitCode::SUCCESS
        }
        Some(other) => {
            eprintln!("{} '{}'", "Unknown command:".red(), other.yellow());
            print_usage();
            ExitCode::FAILURE
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

fn cmd_replay(args: &[String]) -> ExitCode {
    let mut scenario_path = None;
    let mut config_path = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => match iter.next() {
                Some(p) => config_path = Some(PathBuf::from(p)),
                None => {
                    eprintln!("{}", "--config needs a path".red());
                    return ExitCode::FAILURE;
                }
            },
            other => scenario_path = Some(PathBuf::from(other)),
        }
    }
    let Some(scenario_path) = scenario_path else {
        eprintln!("{}", "replay needs a scenario file".red());
        print_usage();
        return ExitCode::FAILURE;
    };

    let watcher = config::ConfigWatcher::new(config_path.unwrap_or_else(config::config_path));
    let settings = watcher.current().clone();
    let _guard = nockvr_runtime::telemetry::init_tracing("nockvr", settings.debug_print);

    let scenario = match scenario::load(&scenario_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}: {}", "Scenario error".red(), e);
            return ExitCode::FAILURE;
        }
    };

    let title = if scenario.name.is_empty() {
        scenario_path.display().to_string()
    } else {
        scenario.name.clone()
    };
    println!();
    println!("  {} {}", "Replaying".bold().cyan(), title.as_str().bold());
    println!("  Settings from {}", watcher.path().display().to_string().dimmed());
    println!();

    let report = scenario::replay(&scenario, settings, Some(Box::new(watcher)));
    for entry in &report.entries {
        println!(
            "  {:>7} ms  {:<28} {} → {}{}",
            entry.at.as_millis(),
            entry.label.dimmed(),
            paint(entry.from),
            paint(entry.to),
            format_commands(&entry.commands)
        );
    }

    println!();
    println!(
        "  Final state {}, {} synthetic state(s) asserted, {} feedback output(s).",
        paint(report.final_state),
        report.asserted,
        report.feedback_events
    );
    if report.asserted > 0 && report.final_state == NockState::Idle {
        println!("  {}", "✗ synthetic input left asserted in idle".red().bold());
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn cmd_check_config(path: Option<PathBuf>) -> ExitCode {
    let path = path.unwrap_or_else(config::config_path);
    let settings = match config::load_from(&path) {
        Ok(Some(s)) => {
            println!("  Config loaded from {}", path.display().to_string().bold());
            s
        }
        Ok(None) => {
            println!(
                "  {} {}, using defaults.",
                "No config at".yellow(),
                path.display().to_string().bold()
            );
            let mut defaults = NockSettings::default();
            config::apply_env_overrides(&mut defaults);
            defaults.sanitized()
        }
        Err(e) => {
            eprintln!("{}: {}", "Config error".red(), e);
            return ExitCode::FAILURE;
        }
    };

    match toml::to_string_pretty(&settings) {
        Ok(raw) => {
            println!();
            for line in raw.lines() {
                println!("    {line}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}: {}", "Serialize error".red(), e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_init(path: Option<PathBuf>) -> ExitCode {
    let path = path.unwrap_or_else(config::config_path);
    if path.exists() {
        println!(
            "  {} {}",
            "Config already exists at".yellow(),
            path.display().to_string().bold()
        );
        return ExitCode::SUCCESS;
    }
    match config::save_to(&NockSettings::default(), &path) {
        Ok(()) => {
            println!(
                "  {} Default config written to {}",
                "✓".green().bold(),
                path.display().to_string().bold()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}: {}", "Error saving config".red(), e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_schema() -> ExitCode {
    let schema = schemars::schema_for!(NockSettings);
    match serde_json::to_string_pretty(&schema) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}: {}", "Schema error".red(), e);
            ExitCode::FAILURE
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn paint(state: NockState) -> colored::ColoredString {
    match state {
        NockState::Idle => state.as_str().dimmed(),
        NockState::ArrowHeld => state.as_str().cyan(),
        NockState::TryingToNock => state.as_str().yellow(),
        NockState::ArrowNocked => state.as_str().green().bold(),
    }
}

fn format_commands(commands: &[Command]) -> String {
    if commands.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = commands
        .iter()
        .map(|c| match c {
            Command::SetDown(a) => format!("set_down({} {:?})", a.hand, a.button),
            Command::ClearDown(a) => format!("clear_down({} {:?})", a.hand, a.button),
            Command::ClearAll => "clear_all".to_string(),
            Command::SendMomentary(a) => format!("momentary({} {:?})", a.hand, a.button),
            Command::TriggerFeedback => "feedback".to_string(),
        })
        .collect();
    format!("  [{}]", parts.join(", ")).magenta().to_string()
}

fn print_usage() {
    println!();
    println!("  {} {}", "nockvr".bold(), format!("v{}", env!("CARGO_PKG_VERSION")).dimmed());
    println!();
    println!("  {}  – run a scripted scenario", "replay <scenario.toml> [--config <path>]".bold().cyan());
    println!("  {}                 – print the effective settings", "check-config [path]".bold().cyan());
    println!("  {}                         – write a default settings file", "init [path]".bold().cyan());
    println!("  {}                              – print the settings JSON Schema", "schema".bold().cyan());
    println!();
}
