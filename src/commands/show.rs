//! `show`: list live objects

use anyhow::{Context as AnyhowContext, Result};
use plb_core::value::display_current;
use plb_core::{ResourceKind, instances};

use crate::Context;
use crate::cli::ShowArgs;
use crate::config::Settings;
use crate::device;
use crate::ui;

pub fn run(ctx: &Context, args: ShowArgs) -> Result<()> {
    let settings = Settings::load()?;
    let device_path = settings.device_path(args.device.device.as_deref())?;
    let store = device::load(&device_path)?;

    let mut kinds = ResourceKind::ALL.to_vec();
    kinds.sort_by_key(|k| k.rank());
    if let Some(only) = args.device.kind {
        let only = ResourceKind::from(only);
        kinds.retain(|k| *k == only);
    }

    ui::header(&format!("Device {}", device_path.display()));

    for kind in kinds {
        let objects = instances(&store, kind)
            .with_context(|| format!("Failed to list {kind} objects"))?;
        ui::section(&format!("{kind} ({})", objects.len()));
        if objects.is_empty() {
            ui::dim("none");
            continue;
        }

        for object in &objects {
            println!("  {}", object.identity());
            for (property, value) in object.values() {
                // Unreported properties are noise unless asked for
                if value.is_none() && ctx.verbose == 0 {
                    continue;
                }
                ui::kv(&format!("  {property}"), &display_current(value));
            }
        }
    }
    Ok(())
}
