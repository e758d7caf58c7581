//! `plan` and `apply`

use anyhow::{Context as AnyhowContext, Result, bail};
use manifest::{Manifest, ManifestStats};
use plb_core::{CapabilityRegistry, MemoryStore};
use std::path::{Path, PathBuf};

use crate::Context;
use crate::cli::{ApplyArgs, DeviceArgs, PlanArgs};
use crate::config::Settings;
use crate::device;
use crate::engine::differ::{PlanSummary, display_plans};
use crate::engine::{ExecuteOptions, execute, plan_all};
use crate::ui;

/// Everything a converge command works with
struct Session {
    manifest: Manifest,
    device_path: PathBuf,
    store: MemoryStore,
    registry: CapabilityRegistry,
}

fn open(ctx: &Context, manifest_path: &Path, args: &DeviceArgs) -> Result<Session> {
    let settings = Settings::load()?;
    let manifest = manifest::load(manifest_path)
        .with_context(|| format!("Failed to load manifest {}", manifest_path.display()))?;
    let device_path = settings.device_path(args.device.as_deref())?;
    let store = device::load(&device_path)?;
    let registry = CapabilityRegistry::compose(&settings.provider_config(args.platform.as_deref())?)
        .context("Provider is not usable")?;

    if !ctx.quiet {
        let stats = ManifestStats::from(&manifest);
        ui::header("plbsync");
        ui::kv("Manifest", &manifest_path.display().to_string());
        ui::kv("Device", &device_path.display().to_string());
        ui::kv("Platform", &registry.platform().name);
        ui::kv(
            "Resources",
            &format!(
                "{} services, {} device groups, {} nodes ({} absent)",
                stats.services, stats.device_groups, stats.nodes, stats.absent
            ),
        );
    }

    Ok(Session {
        manifest,
        device_path,
        store,
        registry,
    })
}

/// Preview what apply would change
pub fn plan(ctx: &Context, args: PlanArgs) -> Result<()> {
    let session = open(ctx, &args.manifest, &args.device)?;
    let kind = args.device.kind.map(Into::into);
    let plans = plan_all(&session.manifest, &session.store, &session.registry, kind)?;

    if ctx.quiet {
        let summary = PlanSummary::from_plans(&plans);
        println!(
            "{} create, {} update, {} remove",
            summary.creates, summary.updates, summary.destroys
        );
    } else {
        display_plans(&plans);
        let skipped: usize = plans.iter().map(|p| p.skipped.len()).sum();
        if skipped > 0 {
            println!();
            ui::warn(&format!(
                "{skipped} changes have no setter on platform `{}` and will be skipped",
                session.registry.platform().name
            ));
        }
    }
    Ok(())
}

/// Converge the device and write the snapshot back
pub fn apply(ctx: &Context, args: ApplyArgs) -> Result<()> {
    let mut session = open(ctx, &args.manifest, &args.device)?;
    let opts = ExecuteOptions {
        dry_run: args.dry_run,
        yes: args.yes,
        kind: args.device.kind.map(Into::into),
    };

    let summary = execute(&session.manifest, &mut session.store, &session.registry, &opts)?;

    // Partial progress is still written, so a re-run picks up where this one stopped
    if !opts.dry_run && (summary.total_changes() > 0 || summary.failed > 0) {
        device::save(&session.device_path, &session.store)?;
        if !ctx.quiet {
            ui::success(&format!("Saved {}", session.device_path.display()));
        }
    }

    if !summary.is_success() {
        bail!("{} resources failed to converge", summary.failed);
    }
    Ok(())
}
