//! duet CLI entry point.

mod cli;

use clap::Parser;
use duet::agent::Agent;
use duet::compare::Comparison;
use duet::config::{
    default_global_config_path, load_config, write_default_config_at, Config, ConfigInitResult,
};
use duet::error::ConfigError;
use duet::events::{EventBus, EventTopic};
use duet::render::Renderer;
use duet::settings::{
    load_model_settings, load_prompt, reset_settings, save_model_settings, save_prompt,
    JsonFileStore, PromptSlot, SettingsStore,
};
use duet::tools::ToolRegistry;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "DUET_LOG";
/// Store used when no config directory can be resolved.
const FALLBACK_SETTINGS_FILE: &str = "duet-settings.json";

#[tokio::main]
async fn main() {
    init_tracing();
    let args = cli::Args::parse();

    if let Some(cli::Command::Init { force }) = &args.command {
        let renderer = Renderer::new(!args.no_color);
        if let Err(msg) = run_init(&renderer, args.config.as_deref(), *force) {
            renderer.error(&msg);
            std::process::exit(1);
        }
        return;
    }

    let loaded = match load_config(args.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };
    let mut config = loaded.config;

    // CLI flags win over env and file.
    if let Some(model) = &args.model {
        config.model_overrides.model_name = Some(model.clone());
    }
    if let Some(url) = &args.base_url {
        config.model_overrides.api_url = Some(url.clone());
    }
    if args.no_color {
        config.display.color = false;
    }

    let renderer = Renderer::new(config.display.color);
    let store = JsonFileStore::new(
        loaded
            .settings_path
            .unwrap_or_else(|| PathBuf::from(FALLBACK_SETTINGS_FILE)),
    );

    if let Some(cli::Command::Settings { action }) = args.command {
        if let Err(e) = run_settings(&renderer, &store, &config, action) {
            renderer.error(&e.to_string());
            std::process::exit(1);
        }
        return;
    }

    let mut model = load_model_settings(&store);
    config.model_overrides.apply(&mut model);
    if let Err(e) = model.validate() {
        renderer.warn(&format!("model settings: {e}"));
    }
    if !model.has_api_key() {
        renderer.warn(&format!(
            "no API key set; run `duet settings set-model --api-key ...` (store: {})",
            store.path().display()
        ));
    }

    let tools = Arc::new(ToolRegistry::with_builtin_tools());
    let events = Arc::new(EventBus::new());
    if config.display.show_events {
        events.on(EventTopic::All, move |event| renderer.event(event));
    }
    let agent = Agent::new(model, config.api_timeout(), tools, Arc::clone(&events))
        .with_options(config.run_options());
    let mut comparison = Comparison::new(
        agent,
        load_prompt(&store, PromptSlot::A),
        load_prompt(&store, PromptSlot::B),
    );

    match args.message {
        Some(message) => {
            let Some(report) = comparison.send(&message, |_, _| {}).await else {
                renderer.error("message is empty");
                std::process::exit(1);
            };
            for slot in PromptSlot::ALL {
                renderer.column(comparison.column(slot));
            }
            if report.a.is_err() && report.b.is_err() {
                std::process::exit(1);
            }
        }
        None => run_interactive(&renderer, &mut comparison, &events).await,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run_init(renderer: &Renderer, path_override: Option<&str>, force: bool) -> Result<(), String> {
    let path = match path_override {
        Some(path) => PathBuf::from(path),
        None => default_global_config_path()
            .ok_or_else(|| "could not determine a config directory".to_string())?,
    };
    match write_default_config_at(&path, force).map_err(|e| e.to_string())? {
        ConfigInitResult::Created { path } => {
            renderer.field("created", &path.display().to_string());
        }
        ConfigInitResult::AlreadyExists { path } => {
            renderer.warn(&format!(
                "{} already exists; pass --force to overwrite",
                path.display()
            ));
        }
        ConfigInitResult::Overwritten { path, backup_path } => {
            renderer.field("overwritten", &path.display().to_string());
            renderer.field("backup", &backup_path.display().to_string());
        }
    }
    Ok(())
}

fn run_settings(
    renderer: &Renderer,
    store: &dyn SettingsStore,
    config: &Config,
    action: cli::SettingsAction,
) -> Result<(), ConfigError> {
    match action {
        cli::SettingsAction::Show => {
            let mut model = load_model_settings(store);
            config.model_overrides.apply(&mut model);
            let prompts: Vec<(PromptSlot, String)> = PromptSlot::ALL
                .iter()
                .map(|&slot| (slot, load_prompt(store, slot)))
                .collect();
            renderer.settings(&model, &prompts);
            if !config.model_overrides.is_empty() {
                renderer.warn("environment or CLI overrides are applied to the values above");
            }
        }
        cli::SettingsAction::SetModel {
            api_url,
            api_key,
            model,
            temperature,
            top_p,
        } => {
            let mut settings = load_model_settings(store);
            if let Some(url) = api_url {
                settings.api_url = url.trim().to_string();
            }
            if let Some(key) = api_key {
                settings.api_key = key.trim().to_string();
            }
            if let Some(name) = model {
                settings.model_name = name.trim().to_string();
            }
            if let Some(t) = temperature {
                settings.temperature = t;
            }
            if let Some(p) = top_p {
                settings.top_p = p;
            }
            save_model_settings(store, &settings)?;
            renderer.field("saved", "model settings");
        }
        cli::SettingsAction::SetPrompt { slot, text } => {
            let slot = PromptSlot::parse(&slot).ok_or_else(|| {
                ConfigError::Invalid(format!("unknown prompt slot `{slot}`, expected a or b"))
            })?;
            save_prompt(store, slot, &text)?;
            renderer.field("saved", slot.label());
        }
        cli::SettingsAction::Reset => {
            reset_settings(store)?;
            renderer.field("reset", "all settings restored to defaults");
        }
    }
    Ok(())
}

async fn run_interactive(renderer: &Renderer, comparison: &mut Comparison, events: &EventBus) {
    for slot in PromptSlot::ALL {
        renderer.column(comparison.column(slot));
    }
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        eprint!("> ");
        let _ = std::io::stderr().flush();
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                renderer.error(&format!("failed to read input: {e}"));
                break;
            }
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        match input.split_whitespace().collect::<Vec<_>>().as_slice() {
            ["/quit"] | ["/exit"] => break,
            ["/stats"] => {
                renderer.stats(&events.stats());
                continue;
            }
            ["/clear"] => {
                for slot in PromptSlot::ALL {
                    comparison.clear(slot);
                }
                renderer.field("cleared", "both columns");
                continue;
            }
            ["/clear", which] => {
                match PromptSlot::parse(which) {
                    Some(slot) => {
                        comparison.clear(slot);
                        renderer.field("cleared", slot.label());
                    }
                    None => renderer.warn("usage: /clear [a|b]"),
                }
                continue;
            }
            [command, ..] if command.starts_with('/') => {
                renderer.warn(&format!("unknown command `{command}`"));
                continue;
            }
            _ => {}
        }

        if let Some(report) = comparison.send(input, |_, _| {}).await {
            renderer.reply(PromptSlot::A, &report.a);
            renderer.reply(PromptSlot::B, &report.b);
        }
    }
}
