//! CLI argument parsing with clap derive macros.

use clap::{Parser, Subcommand};

/// Keyboard-driven clicking for the foreground application.
///
/// A global hotkey reveals an overlay that labels every clickable element;
/// typing a label's characters activates that element without touching the
/// mouse. This build ships the simulated desktop backend: `run` drives it
/// from key names on stdin, `demo` runs a scripted end-to-end pass.
#[derive(Debug, Parser)]
#[command(name = "clickless", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the agent, reading key names from stdin
    #[command(after_help = "\
Key lines:
  hotkey                 The configured toggle chord
  a .. z                 Letter taps (a word taps each letter in order)
  space, enter, esc      Commit / right-commit / dismiss
  backspace              Erase one typed character
  up/down/left/right     Cursor motion taps (prefix shift+ to scroll)

Example session:
  clickless run
  hotkey                 # overlay up, elements labeled
  a                      # activate the element labeled A")]
    Run(RunArgs),

    /// Scripted end-to-end demonstration with JSON snapshot output
    Demo,
}

#[derive(Debug, clap::Args)]
pub struct RunArgs {
    /// Toggle hotkey, e.g. "cmd+shift+space" or "ctrl+g"
    #[arg(long, default_value = "cmd+shift+space")]
    pub hotkey: String,

    /// Scan time budget in milliseconds
    #[arg(long, default_value_t = 500, value_name = "MS")]
    pub scan_budget: u64,

    /// Maximum tree depth below the application root
    #[arg(long, default_value_t = 10)]
    pub max_depth: usize,

    /// Maximum elements per snapshot
    #[arg(long, default_value_t = 500)]
    pub max_elements: usize,

    /// Quiet period after scrolling before the overlay rescans, in
    /// milliseconds
    #[arg(long, default_value_t = 1000, value_name = "MS")]
    pub rescan_debounce: u64,
}

#[cfg(test)]
mod tests {
    use super::{Cli, Commands};
    use clap::Parser;

    #[test]
    fn run_parses_defaults() {
        let cli = Cli::parse_from(["clickless", "run"]);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.hotkey, "cmd+shift+space");
                assert_eq!(args.scan_budget, 500);
                assert_eq!(args.max_depth, 10);
                assert_eq!(args.max_elements, 500);
                assert_eq!(args.rescan_debounce, 1000);
            }
            Commands::Demo => panic!("expected run command"),
        }
    }

    #[test]
    fn run_accepts_overrides() {
        let cli = Cli::parse_from([
            "clickless",
            "run",
            "--hotkey",
            "ctrl+g",
            "--scan-budget",
            "200",
            "--max-elements",
            "50",
        ]);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.hotkey, "ctrl+g");
                assert_eq!(args.scan_budget, 200);
                assert_eq!(args.max_elements, 50);
            }
            Commands::Demo => panic!("expected run command"),
        }
    }
}
