//! # letpot
//!
//! Command-line client: list devices, switch pumps, and run test cycles.

#![deny(unsafe_code)]

mod menu;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use letpot_client::{Device, LetPotClient, LetPotError};
use letpot_settings::LetPotSettings;
use tokio_util::sync::CancellationToken;

/// LetPot device client.
#[derive(Parser, Debug)]
#[command(name = "letpot", about = "Control LetPot hydroponic devices")]
struct Cli {
    /// Account email.
    #[arg(long, env = "LETPOT_EMAIL")]
    email: Option<String>,

    /// Account password (prompted when absent).
    #[arg(long, env = "LETPOT_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Settings file (defaults to `~/.letpot/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// List devices on the account.
    Devices,
    /// Turn a device's pump on.
    On {
        /// Device id.
        device: String,
        /// How long to run, in seconds.
        #[arg(long)]
        seconds: Option<u16>,
    },
    /// Turn a device's pump off.
    Off {
        /// Device id.
        device: String,
    },
    /// Turn on, wait, then turn off. Ctrl-C cancels the wait.
    Test {
        /// Device id.
        device: String,
        /// On-time and wait, in seconds.
        #[arg(long)]
        seconds: Option<u16>,
    },
    /// Interactive menu.
    Menu,
}

fn load_settings(path: Option<&PathBuf>) -> Result<LetPotSettings> {
    let settings = match path {
        Some(path) => letpot_settings::load_settings_from_path(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => letpot_settings::load_settings().context("Failed to load settings")?,
    };
    Ok(settings)
}

fn credentials(cli: &Cli) -> Result<(String, String)> {
    let email = match &cli.email {
        Some(email) => email.clone(),
        None => dialoguer::Input::<String>::new()
            .with_prompt("Email")
            .interact_text()
            .context("Failed to read email")?,
    };
    let password = match &cli.password {
        Some(password) => password.clone(),
        None => dialoguer::Password::new()
            .with_prompt("Password")
            .interact()
            .context("Failed to read password")?,
    };
    Ok((email, password))
}

/// Run a test cycle, cancelling it on Ctrl-C.
pub(crate) async fn run_test_cycle(client: &LetPotClient, device: &str, seconds: u16) -> Result<()> {
    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let result = client.test_cycle(device, seconds, &cancel).await;
    watcher.abort();
    cycle_outcome(result, seconds)
}

/// A cancelled cycle is a failure: the "off" command was never sent.
fn cycle_outcome(result: letpot_client::Result<()>, seconds: u16) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(e @ LetPotError::Cancelled) => Err(e).with_context(|| {
            format!("Test cycle cancelled before turning off; the pump stops after {seconds}s on its own")
        }),
        Err(e) => Err(e).context("Test cycle failed"),
    }
}

pub(crate) fn print_devices(devices: &[Device]) {
    if devices.is_empty() {
        println!("No devices found.");
        return;
    }
    for (i, device) in devices.iter().enumerate() {
        println!("{}. {} ({})", i + 1, device.display_name(), device.device_id);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = load_settings(cli.settings.as_ref())?;
    let _ = letpot_core::logging::init_subscriber(&settings.logging.level);

    let client = LetPotClient::new(&settings).context("Failed to build client")?;
    let (email, password) = credentials(&cli)?;
    let session = client
        .login(&email, &password)
        .await
        .context("Login failed")?;
    tracing::info!(user_id = %session.user_id, "login successful");

    let defaults = client.device_settings().clone();
    let outcome = match cli.command {
        Command::Devices => client
            .devices()
            .await
            .map(|devices| print_devices(&devices))
            .context("Failed to list devices"),
        Command::On { device, seconds } => {
            let seconds = seconds.unwrap_or(defaults.default_on_seconds);
            client
                .turn_on(&device, seconds)
                .await
                .with_context(|| format!("Failed to turn on {device}"))
        }
        Command::Off { device } => client
            .turn_off(&device)
            .await
            .with_context(|| format!("Failed to turn off {device}")),
        Command::Test { device, seconds } => {
            run_test_cycle(&client, &device, seconds.unwrap_or(defaults.test_cycle_seconds)).await
        }
        Command::Menu => menu::run(&client).await,
    };

    client.close().await;
    outcome
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
