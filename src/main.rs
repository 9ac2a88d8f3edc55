use anyhow::{Context, Result};
use clap::Parser;
use remote_agent::command::handlers::HandlerContext;
use remote_agent::command::simulated::SimulatedDevice;
use remote_agent::command::CommandHandler;
use remote_agent::config::Cli;
use remote_agent::executor::{ActionService, LoggingWakeLock, Reporter, WakeLock};
use remote_agent::prefs::{FilePreferences, PreferenceStore};
use remote_agent::push::{PushMessage, PushRouter, SimulatedPush};
use remote_agent::registration::{
    HttpBackend, LogNotifier, RegistrationContext, RegistrationHandler, StaticTokenAuthenticator,
};
use remote_agent_shared::{FailureReport, StatusEvent};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = Cli::parse().into_config()?;

    info!("Remote agent starting: {}", config.backend.device_name);
    info!("  Backend: {}", config.backend.base_url);
    info!("  Preferences: {}", config.prefs_path.display());

    let prefs = Arc::new(
        FilePreferences::load(&config.prefs_path)
            .with_context(|| format!("loading {}", config.prefs_path.display()))?,
    );
    if let Some(account) = &config.account {
        prefs.set_account(Some(account.clone()))?;
    }

    // Observers standing in for the UI
    let failures = Arc::new(Reporter::<FailureReport>::new());
    let mut failure_rx = failures.attach();
    tokio::spawn(async move {
        while let Some(report) = failure_rx.recv().await {
            warn!("[UI] {}", report.message);
        }
    });

    let status = Arc::new(Reporter::<StatusEvent>::new());
    let mut status_rx = status.attach();
    tokio::spawn(async move {
        while let Some(event) = status_rx.recv().await {
            match event.error {
                Some(code) => info!("[UI] {:?} ({})", event.state, code),
                None => info!("[UI] {:?}", event.state),
            }
        }
    });

    // Command executor
    let device = Arc::new(SimulatedDevice::new(config.simulation.clone()));
    let command_handler = CommandHandler::new(HandlerContext {
        ringtone: device.clone(),
        vibrator: device.clone(),
        speech: device,
        locale: config.simulation.locale.clone(),
        vibrate_duration: config.vibrate_duration,
    });
    let command_lock: Arc<dyn WakeLock> = Arc::new(LoggingWakeLock::new("CommandExecutor"));
    let commands = Arc::new(ActionService::new(
        config.commands.clone(),
        Arc::new(command_handler),
        command_lock,
        failures.clone(),
    ));

    // Registration executor
    let (push_tx, push_rx) = mpsc::unbounded_channel();
    let backend = HttpBackend::new(
        &config.backend.user_agent,
        config.backend.request_timeout,
        StaticTokenAuthenticator::new(config.backend.auth_token.clone()),
    )?;
    let notifier = Arc::new(LogNotifier::new());
    let registration_handler = RegistrationHandler::new(
        config.backend.clone(),
        RegistrationContext {
            prefs: prefs.clone(),
            backend: Arc::new(backend),
            push: Arc::new(SimulatedPush::new(
                config.simulation.push_available,
                push_tx.clone(),
            )),
            foreground: notifier.clone(),
            notifier,
            status,
        },
    );
    let registration_lock: Arc<dyn WakeLock> =
        Arc::new(LoggingWakeLock::new("RegistrationDispatcher"));
    let registration = Arc::new(ActionService::new(
        config.registration.clone(),
        Arc::new(registration_handler),
        registration_lock,
        failures,
    ));

    let router = Arc::new(PushRouter::new(
        commands.clone(),
        registration.clone(),
        prefs,
    ));
    tokio::spawn(router.clone().run(push_rx));

    info!("Ready: connect | disconnect | cancel | push <command> | push-error <code> | quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if !handle_trigger(line.trim(), &router, &push_tx) {
            break;
        }
    }

    info!("Shutting down");
    commands.shutdown().await;
    registration.shutdown().await;
    Ok(())
}

/// Apply one trigger line; returns false on `quit`
fn handle_trigger(
    line: &str,
    router: &PushRouter,
    push_tx: &mpsc::UnboundedSender<PushMessage>,
) -> bool {
    let (verb, rest) = line.split_once(' ').unwrap_or((line, ""));
    let result = match verb {
        "" => Ok(()),
        "quit" => return false,
        "connect" => router.connect(),
        "disconnect" => router.disconnect(),
        "cancel" => {
            if !router.cancel_command() {
                info!("No command is running");
            }
            Ok(())
        }
        "push" => {
            send(push_tx, PushMessage::Command(rest.to_string()));
            Ok(())
        }
        "push-error" => {
            send(push_tx, PushMessage::Error(rest.trim().to_string()));
            Ok(())
        }
        other => {
            warn!("Unknown trigger: {}", other);
            Ok(())
        }
    };

    if let Err(e) = result {
        error!("Trigger {:?} rejected: {}", line, e);
    }
    true
}

fn send(push_tx: &mpsc::UnboundedSender<PushMessage>, message: PushMessage) {
    if push_tx.send(message).is_err() {
        error!("Push router is not running");
    }
}
