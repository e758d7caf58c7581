//! Execution engine - runs the passes against a device store

use anyhow::{Context as AnyhowContext, Result};
use colored::Colorize;
use manifest::Manifest;
use plb_core::{CapabilityRegistry, DeviceStore, Outcome, Plan, ResourceKind, prefetch};

use super::differ::{PlanSummary, display_plans};
use super::planner::{Pass, passes};

/// Options for execution
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Skip confirmation prompts
    pub yes: bool,
    /// Limit to one resource kind
    pub kind: Option<ResourceKind>,
}

/// Result of converging one resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyResult {
    NoChange,
    Created,
    Modified,
    Removed,
    Failed { error: String },
}

impl From<Outcome> for ApplyResult {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Created => Self::Created,
            Outcome::Updated { .. } => Self::Modified,
            Outcome::Destroyed => Self::Removed,
            Outcome::NoChange => Self::NoChange,
        }
    }
}

/// Summary of execution results
#[derive(Debug, Default)]
pub struct ExecuteSummary {
    pub created: usize,
    pub modified: usize,
    pub removed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub no_change: usize,
}

impl ExecuteSummary {
    pub fn total_changes(&self) -> usize {
        self.created + self.modified + self.removed
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    pub fn add_result(&mut self, result: &ApplyResult) {
        match result {
            ApplyResult::NoChange => self.no_change += 1,
            ApplyResult::Created => self.created += 1,
            ApplyResult::Modified => self.modified += 1,
            ApplyResult::Removed => self.removed += 1,
            ApplyResult::Failed { .. } => self.failed += 1,
        }
    }
}

/// Preview every pass without writing
pub fn plan_all<S: DeviceStore + ?Sized>(
    manifest: &Manifest,
    store: &S,
    registry: &CapabilityRegistry,
    kind: Option<ResourceKind>,
) -> Result<Vec<Plan>> {
    let mut plans = Vec::new();
    for pass in passes(kind) {
        let descriptors = pass.descriptors(manifest);
        if descriptors.is_empty() {
            continue;
        }
        let caps = registry.for_kind(pass.kind);
        let providers = prefetch(store, caps, descriptors)
            .with_context(|| format!("Failed to match {} objects", pass.kind))?;
        for provider in &providers {
            plans.push(
                provider
                    .preview(store)
                    .with_context(|| format!("Failed to plan {}", provider.key()))?,
            );
        }
    }
    Ok(plans)
}

/// Show the plan, confirm, and converge every resource
pub fn execute<S: DeviceStore + ?Sized>(
    manifest: &Manifest,
    store: &mut S,
    registry: &CapabilityRegistry,
    opts: &ExecuteOptions,
) -> Result<ExecuteSummary> {
    // 1. Preview
    let plans = plan_all(manifest, &*store, registry, opts.kind)?;
    display_plans(&plans);

    let planned = PlanSummary::from_plans(&plans);
    if !planned.has_changes() {
        return Ok(ExecuteSummary {
            no_change: plans.len(),
            ..Default::default()
        });
    }

    // 2. Confirm (unless --yes)
    if !opts.yes && !opts.dry_run && !confirm_proceed()? {
        println!();
        println!("  {} Aborted", "✗".red());
        return Ok(ExecuteSummary {
            skipped: planned.total(),
            ..Default::default()
        });
    }

    if opts.dry_run {
        println!();
        println!("  {} Dry run - no changes made", "ℹ".blue());
        return Ok(ExecuteSummary::default());
    }

    // 3. Converge, pass by pass
    let mut summary = ExecuteSummary::default();
    for pass in passes(opts.kind) {
        run_pass(manifest, store, registry, pass, &mut summary)?;
    }

    // 4. Summary
    print_summary(&summary);

    Ok(summary)
}

/// Converge one pass; a failing resource does not stop the others
fn run_pass<S: DeviceStore + ?Sized>(
    manifest: &Manifest,
    store: &mut S,
    registry: &CapabilityRegistry,
    pass: Pass,
    summary: &mut ExecuteSummary,
) -> Result<()> {
    let descriptors = pass.descriptors(manifest);
    if descriptors.is_empty() {
        return Ok(());
    }

    println!();
    println!(
        "  {} Applying {} {} ({})...",
        "→".cyan(),
        descriptors.len(),
        pass.kind,
        pass.ensure
    );

    let caps = registry.for_kind(pass.kind);
    let providers = prefetch(&*store, caps, descriptors)
        .with_context(|| format!("Failed to match {} objects", pass.kind))?;

    for mut provider in providers {
        let result = match provider.converge(store) {
            Ok(outcome) => ApplyResult::from(outcome),
            Err(e) => {
                log::debug!("{e:?}");
                ApplyResult::Failed {
                    error: e.to_string(),
                }
            }
        };

        let symbol = match &result {
            ApplyResult::NoChange => "○".dimmed(),
            ApplyResult::Created | ApplyResult::Modified | ApplyResult::Removed => "✓".green(),
            ApplyResult::Failed { .. } => "✗".red(),
        };
        match &result {
            ApplyResult::Failed { error } => {
                println!("    {} {}: {}", symbol, provider.key(), error.red());
            }
            _ => println!("    {} {}", symbol, provider.key()),
        }

        summary.add_result(&result);
    }
    Ok(())
}

/// Confirm with user
fn confirm_proceed() -> Result<bool> {
    use dialoguer::Confirm;

    let confirmed = Confirm::new()
        .with_prompt("Continue?")
        .default(true)
        .interact()?;

    Ok(confirmed)
}

/// Print final summary
fn print_summary(summary: &ExecuteSummary) {
    println!();
    if summary.is_success() {
        println!(
            "  {} Configuration applied successfully!",
            "✓".green().bold()
        );
    } else {
        println!(
            "  {} Configuration applied with errors",
            "⚠".yellow().bold()
        );
    }

    if summary.created > 0 {
        println!("    • {} resources created", summary.created);
    }
    if summary.modified > 0 {
        println!("    • {} resources modified", summary.modified);
    }
    if summary.removed > 0 {
        println!("    • {} resources removed", summary.removed);
    }
    if summary.skipped > 0 {
        println!("    • {} resources skipped", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "resources".red());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plb_core::{
        DeviceCall, Identity, MemoryStore, ObjectKey, Operation, ProviderConfig, Value,
    };

    const MANIFEST: &str = r#"
[[device_group]]
name = "udpGroup"
probe_type = "udp"
probe_port = 53

[[device_group_node]]
plbdg = "udpGroup"
node = "1.1.1.1"
node_type = "ip"
weight = 5

[[service]]
name = "web"
device_group = "udpGroup"
access_list = "iap"
shutdown = false

[[service]]
name = "old"
ensure = "absent"
"#;

    fn apply_opts() -> ExecuteOptions {
        ExecuteOptions {
            yes: true,
            ..Default::default()
        }
    }

    fn registry() -> CapabilityRegistry {
        CapabilityRegistry::compose(&ProviderConfig::default()).unwrap()
    }

    #[test]
    fn test_execute_converges_every_pass() {
        let manifest = manifest::parse(MANIFEST).unwrap();
        let mut store = MemoryStore::new();
        store.insert(ResourceKind::Service, Identity::single("old"), []);

        let summary = execute(&manifest, &mut store, &registry(), &apply_opts()).unwrap();
        assert_eq!(summary.created, 3);
        assert_eq!(summary.removed, 1);
        assert!(summary.is_success());

        // parents are constructed before children
        let constructs: Vec<ResourceKind> = store
            .calls()
            .iter()
            .filter_map(|c| match c {
                DeviceCall::Construct(key) => Some(key.kind),
                _ => None,
            })
            .collect();
        assert_eq!(
            constructs,
            vec![
                ResourceKind::DeviceGroup,
                ResourceKind::DeviceGroupNode,
                ResourceKind::Service,
            ]
        );
    }

    #[test]
    fn test_second_execute_changes_nothing() {
        let manifest = manifest::parse(MANIFEST).unwrap();
        let mut store = MemoryStore::new();
        execute(&manifest, &mut store, &registry(), &apply_opts()).unwrap();
        store.take_calls();

        let plans = plan_all(&manifest, &store, &registry(), None).unwrap();
        assert!(plans.iter().all(|p| !p.has_changes()));

        let summary = execute(&manifest, &mut store, &registry(), &apply_opts()).unwrap();
        assert_eq!(summary.total_changes(), 0);
        assert!(store.calls().is_empty());
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let manifest = manifest::parse(MANIFEST).unwrap();
        let mut store = MemoryStore::new();
        let opts = ExecuteOptions {
            dry_run: true,
            ..Default::default()
        };

        execute(&manifest, &mut store, &registry(), &opts).unwrap();
        assert!(store.calls().is_empty());
        assert!(store.objects().is_empty());
    }

    #[test]
    fn test_failure_is_counted_and_others_continue() {
        let manifest = manifest::parse(MANIFEST).unwrap();
        let mut store = MemoryStore::new();
        store.insert(ResourceKind::Service, Identity::single("old"), []);
        store.fail_on(Operation::Destroy, None);

        let summary = execute(&manifest, &mut store, &registry(), &apply_opts()).unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.created, 3);
        assert!(!summary.is_success());
        let old = ObjectKey::new(ResourceKind::Service, Identity::single("old"));
        assert!(store.object(&old).is_some());
    }

    #[test]
    fn test_kind_filter_limits_passes() {
        let manifest = manifest::parse(MANIFEST).unwrap();
        let mut store = MemoryStore::new();
        let opts = ExecuteOptions {
            yes: true,
            kind: Some(ResourceKind::DeviceGroup),
            ..Default::default()
        };

        let summary = execute(&manifest, &mut store, &registry(), &opts).unwrap();
        assert_eq!(summary.created, 1);
        let key = ObjectKey::new(ResourceKind::DeviceGroup, Identity::single("udpGroup"));
        assert_eq!(store.value(&key, "probe_port"), Some(&Value::Int(53)));
    }

    #[test]
    fn test_outcome_maps_to_apply_result() {
        assert_eq!(
            ApplyResult::from(Outcome::Updated { writes: 2 }),
            ApplyResult::Modified
        );
        let mut summary = ExecuteSummary::default();
        summary.add_result(&ApplyResult::Failed {
            error: "boom".into(),
        });
        assert!(!summary.is_success());
    }
}
