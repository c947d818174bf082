//! `chiptrack devices` – list audio output devices.

use anyhow::{Context, Result};
use chiptrack_core::player::output::output_device_names;

pub fn run_devices() -> Result<()> {
    let names = output_device_names().context("failed to list output devices")?;
    if names.is_empty() {
        println!("No output devices");
        return Ok(());
    }
    for (i, name) in names.iter().enumerate() {
        println!("#{i}: {name}");
    }
    Ok(())
}
