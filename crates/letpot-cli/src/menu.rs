//! Interactive device menu.

use std::fmt;

use anyhow::{Context, Result};
use dialoguer::{Input, Select};
use letpot_client::{Device, LetPotClient};

use crate::{print_devices, run_test_cycle};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Action {
    TurnOnDefault,
    TurnOnCustom,
    TurnOff,
    TestCycle,
    Exit,
}

impl Action {
    const ALL: [Action; 5] = [
        Action::TurnOnDefault,
        Action::TurnOnCustom,
        Action::TurnOff,
        Action::TestCycle,
        Action::Exit,
    ];
}

/// Menu row; carries the configured defaults so labels show real durations.
struct Labelled {
    action: Action,
    on_seconds: u16,
    test_seconds: u16,
}

impl fmt::Display for Labelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.action {
            Action::TurnOnDefault => write!(f, "Turn on ({} seconds)", self.on_seconds),
            Action::TurnOnCustom => write!(f, "Turn on (custom duration)"),
            Action::TurnOff => write!(f, "Turn off"),
            Action::TestCycle => write!(
                f,
                "Test cycle ({} seconds on, then off)",
                self.test_seconds
            ),
            Action::Exit => write!(f, "Exit"),
        }
    }
}

fn pick_device(devices: &[Device]) -> Result<Option<String>> {
    if devices.is_empty() {
        return Ok(None);
    }
    let names: Vec<String> = devices
        .iter()
        .map(|d| format!("{} ({})", d.display_name(), d.device_id))
        .collect();
    let index = Select::new()
        .with_prompt("Select device")
        .items(&names)
        .default(0)
        .interact()
        .context("Failed to read device selection")?;
    Ok(devices.get(index).map(|d| d.device_id.clone()))
}

/// List devices, let the user pick one, then loop over pump actions.
///
/// A failed action is reported and the loop continues.
pub(crate) async fn run(client: &LetPotClient) -> Result<()> {
    let devices = client.devices().await.context("Failed to list devices")?;
    print_devices(&devices);
    let Some(device) = pick_device(&devices)? else {
        return Ok(());
    };

    let defaults = client.device_settings().clone();
    let rows: Vec<Labelled> = Action::ALL
        .iter()
        .map(|&action| Labelled {
            action,
            on_seconds: defaults.default_on_seconds,
            test_seconds: defaults.test_cycle_seconds,
        })
        .collect();

    loop {
        let choice = Select::new()
            .with_prompt(format!("{device}: choose an action"))
            .items(&rows)
            .default(0)
            .interact()
            .context("Failed to read menu selection")?;

        let outcome = match rows[choice].action {
            Action::TurnOnDefault => client
                .turn_on(&device, defaults.default_on_seconds)
                .await
                .map_err(anyhow::Error::from),
            Action::TurnOnCustom => {
                let seconds: u16 = Input::new()
                    .with_prompt("Duration in seconds")
                    .interact_text()
                    .context("Failed to read duration")?;
                client
                    .turn_on(&device, seconds)
                    .await
                    .map_err(anyhow::Error::from)
            }
            Action::TurnOff => client.turn_off(&device).await.map_err(anyhow::Error::from),
            Action::TestCycle => run_test_cycle(client, &device, defaults.test_cycle_seconds).await,
            Action::Exit => return Ok(()),
        };

        match outcome {
            Ok(()) => println!("Done."),
            Err(e) => println!("Error: {e:#}"),
        }
    }
}
