//! clickless entry point.

mod args;
mod error;
mod interceptor;
mod platform;
mod session;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use clickless_core::input::{letter_to_keycode, Hotkey, KeyEvent};
use clickless_core::tree::scan::ScanBudget;
use tracing::{error, info};

use crate::args::{Cli, Commands, RunArgs};
use crate::interceptor::{Interceptor, StdinInterceptor, SyntheticInterceptor};
use crate::platform::synthetic::SyntheticDesktop;
use crate::platform::{Accessibility, JsonOverlay, Pointer, TracingOverlay};
use crate::session::{SessionConfig, SessionController};

fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run(run_args) => run_agent(run_args),
        Commands::Demo => run_demo(),
    };
    if let Err(e) = result {
        error!("{e:#}");
        std::process::exit(1);
    }
}

fn session_config(args: &RunArgs) -> anyhow::Result<SessionConfig> {
    let hotkey = Hotkey::parse(&args.hotkey).context("parsing --hotkey")?;
    Ok(SessionConfig {
        hotkey,
        budget: ScanBudget {
            time_budget: Duration::from_millis(args.scan_budget),
            max_depth: args.max_depth,
            max_elements: args.max_elements,
        },
        rescan_debounce: Duration::from_millis(args.rescan_debounce),
    })
}

/// Run the agent against the simulated desktop, fed from stdin.
///
/// A real platform adapter slots in behind the `Accessibility`, `Pointer`,
/// and `Interceptor` traits; everything downstream is identical.
fn run_agent(args: RunArgs) -> anyhow::Result<()> {
    let config = session_config(&args)?;
    let runtime = tokio::runtime::Runtime::new()?;

    runtime.block_on(async {
        let desktop = Arc::new(SyntheticDesktop::sample());
        info!("simulated desktop backend active; type key names on stdin");

        let controller = SessionController::new(
            Arc::clone(&desktop) as Arc<dyn Accessibility>,
            Arc::clone(&desktop) as Arc<dyn Pointer>,
            Arc::new(TracingOverlay),
            config,
        );

        let (tap, events) = interceptor::channel();
        let stdin_tap = StdinInterceptor::new(config.hotkey);
        stdin_tap.register(tap)?;

        tokio::select! {
            result = controller.run(events) => {
                if let Err(e) = result {
                    info!("session ended: {e}");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("received SIGINT, shutting down");
            }
            _ = sigterm() => {
                info!("received SIGTERM, shutting down");
            }
        }
        // Give captured keys back to the system before exit.
        stdin_tap.unregister();
        Ok(())
    })
}

/// Scripted end-to-end pass over the sample desktop: scan, dump the
/// labeled snapshot as JSON, activate by label, then show what happened.
fn run_demo() -> anyhow::Result<()> {
    let config = SessionConfig::default();
    let runtime = tokio::runtime::Runtime::new()?;

    // The session future borrows its non-`Sync` controller across awaits, so
    // it is `!Send` and cannot go on `tokio::spawn`; run it as a local task.
    let local = tokio::task::LocalSet::new();
    runtime.block_on(local.run_until(async {
        let desktop = Arc::new(SyntheticDesktop::sample());
        let controller = SessionController::new(
            Arc::clone(&desktop) as Arc<dyn Accessibility>,
            Arc::clone(&desktop) as Arc<dyn Pointer>,
            Arc::new(JsonOverlay),
            config,
        );

        let (tap, events) = interceptor::channel();
        let feed = SyntheticInterceptor::new();
        feed.register(tap)?;
        let session = tokio::task::spawn_local(controller.run(events));

        let settle = Duration::from_millis(150);

        // Toggle the overlay and let the scan land.
        let mut hotkey_down = KeyEvent::down(config.hotkey.code);
        hotkey_down.modifiers = config.hotkey.modifiers;
        feed.inject(hotkey_down);
        tokio::time::sleep(settle).await;

        // Activate the element labeled "S" (the Forward toolbar button).
        let s_key = letter_to_keycode('S').expect("letter keycode");
        feed.inject(KeyEvent::down(s_key));
        feed.inject(KeyEvent::up(s_key));
        tokio::time::sleep(settle).await;

        println!("activations: {:?}", desktop.tree().activations());
        println!("pointer ops: {:?}", desktop.pointer_ops());
        println!("live handles after teardown: {}", desktop.tree().live_handles());

        // Dropping the feed closes the channel, ending the session loop.
        feed.unregister();
        drop(feed);
        let _ = session.await;
        Ok(())
    }))
}

/// Wait for SIGTERM (Unix only).
#[cfg(unix)]
async fn sigterm() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            tracing::warn!("failed to register SIGTERM handler: {e}");
            std::future::pending::<()>().await;
        }
    }
}

/// SIGTERM is not available off Unix; never resolves.
#[cfg(not(unix))]
async fn sigterm() {
    std::future::pending::<()>().await;
}
