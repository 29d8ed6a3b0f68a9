#![cfg_attr(all(windows, not(debug_assertions)), windows_subsystem = "windows")]

use std::thread;

use anyhow::Context;
use browser_shell::backend;
use browser_shell::core::thread::UiTaskRunner;
use browser_shell::{ShellConfig, ShellProxy, SimpleApp, SimpleHandler};
use tokio::signal;
use tracing::{error, info, warn, Level};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn setup_logging(level: Level) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

async fn wait_for_signals(proxy: ShellProxy) {
    #[cfg(unix)]
    let mut show_requests = match signal::unix::signal(signal::unix::SignalKind::user_defined1()) {
        Ok(stream) => Some(stream),
        Err(e) => {
            warn!("SIGUSR1 handler unavailable: {}", e);
            None
        }
    };

    let mut interrupts = 0;
    loop {
        #[cfg(unix)]
        let show_requested = async {
            match show_requests.as_mut() {
                Some(stream) => stream.recv().await,
                None => std::future::pending().await,
            }
        };
        #[cfg(not(unix))]
        let show_requested = std::future::pending::<Option<()>>();

        tokio::select! {
            result = signal::ctrl_c() => {
                if let Err(e) = result {
                    error!("Failed to listen for Ctrl-C: {}", e);
                    return;
                }
                interrupts += 1;
                if interrupts == 1 {
                    info!("Received interrupt, closing browsers");
                    proxy.close_all_browsers(false);
                } else {
                    info!("Received second interrupt, forcing browsers closed");
                    proxy.close_all_browsers(true);
                }
            }
            Some(()) = show_requested => {
                info!("Received show request");
                proxy.show_main_window();
            }
        }
    }
}

fn spawn_signal_thread(proxy: ShellProxy) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .context("Failed to build signal runtime")?;

    thread::Builder::new()
        .name("signals".to_string())
        .spawn(move || runtime.block_on(wait_for_signals(proxy)))
        .context("Failed to spawn signal thread")?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let config = ShellConfig::from_args();
    setup_logging(config.log_level)?;

    info!("Starting Browser Shell");

    // The runner binds to the thread that will own the event loop.
    let runner = UiTaskRunner::<SimpleHandler>::new();
    spawn_signal_thread(ShellProxy::new(runner.clone()))?;

    backend::run(SimpleApp::new(config), runner).context("Browser shell terminated")?;

    info!("Browser Shell exited");
    Ok(())
}
