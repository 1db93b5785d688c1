//! CLI argument parsing via clap.

use clap::{Parser, Subcommand};

/// Compare two system prompts side by side on any OpenAI-compatible API.
#[derive(Debug, Parser)]
#[command(name = "duet", version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Message to send to both prompts. Without it, messages are read from stdin.
    pub message: Option<String>,

    /// Path to config file (default: ./duet.toml or ~/.config/duet/duet.toml).
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<String>,

    /// Override model name.
    #[arg(short = 'm', long = "model", global = true)]
    pub model: Option<String>,

    /// Override API base URL.
    #[arg(long = "base-url", global = true)]
    pub base_url: Option<String>,

    /// Disable color output.
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show or change stored model settings and prompts.
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Write the default duet.toml into the config directory.
    Init {
        /// Overwrite an existing file (the old one is kept as .bak).
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum SettingsAction {
    /// Print model settings and both prompts.
    Show,
    /// Update model connection and sampling settings.
    SetModel {
        #[arg(long = "api-url")]
        api_url: Option<String>,
        #[arg(long = "api-key")]
        api_key: Option<String>,
        #[arg(long = "model")]
        model: Option<String>,
        #[arg(long)]
        temperature: Option<f64>,
        #[arg(long = "top-p")]
        top_p: Option<f64>,
    },
    /// Replace the system prompt for column a or b.
    SetPrompt {
        /// `a` or `b`.
        slot: String,
        text: String,
    },
    /// Drop every stored setting and go back to defaults.
    Reset,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_runs_a_comparison() {
        let args = Args::parse_from(["duet", "张三"]);
        assert_eq!(args.message.as_deref(), Some("张三"));
        assert!(args.command.is_none());
        assert!(!args.no_color);
    }

    #[test]
    fn global_flags_work_after_subcommands() {
        let args = Args::parse_from(["duet", "settings", "show", "--no-color", "-c", "x.toml"]);
        assert!(args.no_color);
        assert_eq!(args.config.as_deref(), Some("x.toml"));
        assert!(matches!(
            args.command,
            Some(Command::Settings {
                action: SettingsAction::Show
            })
        ));
    }

    #[test]
    fn set_model_parses_each_field() {
        let args = Args::parse_from([
            "duet",
            "settings",
            "set-model",
            "--api-url",
            "http://localhost:11434/v1",
            "--api-key",
            "sk-test",
            "--temperature",
            "0.2",
            "--top-p",
            "1",
        ]);
        let Some(Command::Settings {
            action:
                SettingsAction::SetModel {
                    api_url,
                    api_key,
                    model,
                    temperature,
                    top_p,
                },
        }) = args.command
        else {
            panic!("expected set-model");
        };
        assert_eq!(api_url.as_deref(), Some("http://localhost:11434/v1"));
        assert_eq!(api_key.as_deref(), Some("sk-test"));
        assert!(model.is_none());
        assert_eq!(temperature, Some(0.2));
        assert_eq!(top_p, Some(1.0));
    }

    #[test]
    fn set_prompt_takes_slot_and_text() {
        let args = Args::parse_from(["duet", "settings", "set-prompt", "b", "Be brief."]);
        let Some(Command::Settings {
            action: SettingsAction::SetPrompt { slot, text },
        }) = args.command
        else {
            panic!("expected set-prompt");
        };
        assert_eq!(slot, "b");
        assert_eq!(text, "Be brief.");
    }

    #[test]
    fn init_accepts_force() {
        let args = Args::parse_from(["duet", "init", "--force"]);
        assert!(matches!(args.command, Some(Command::Init { force: true })));
    }
}
