//! Plan display

use colored::Colorize;
use plb_core::value::display_current;
use plb_core::{Desired, Plan, PlanAction, ResourceKind};

/// Counts of planned actions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanSummary {
    pub creates: usize,
    pub updates: usize,
    pub destroys: usize,
    pub unchanged: usize,
}

impl PlanSummary {
    pub fn from_plans(plans: &[Plan]) -> Self {
        let mut summary = Self::default();
        for plan in plans {
            match plan.action {
                PlanAction::Create => summary.creates += 1,
                PlanAction::Update => summary.updates += 1,
                PlanAction::Destroy => summary.destroys += 1,
                PlanAction::Unchanged => summary.unchanged += 1,
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.creates + self.updates + self.destroys
    }

    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

fn kind_title(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Service => "Services",
        ResourceKind::DeviceGroup => "Device groups",
        ResourceKind::DeviceGroupNode => "Device group nodes",
    }
}

/// Display planned changes, grouped by kind in pass order
pub fn display_plans(plans: &[Plan]) {
    let summary = PlanSummary::from_plans(plans);
    if !summary.has_changes() {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Configuration Diff".bold()
    );
    println!("│");

    let mut current_kind = None;
    for plan in plans.iter().filter(|p| p.has_changes()) {
        if current_kind != Some(plan.key.kind) {
            if current_kind.is_some() {
                println!("│");
            }
            current_kind = Some(plan.key.kind);
            println!("│ {}", kind_title(plan.key.kind).bold());
        }

        let (symbol, note) = match plan.action {
            PlanAction::Create => ("+".green(), "(new)"),
            PlanAction::Destroy => ("-".red(), "(will remove)"),
            PlanAction::Update => ("~".yellow(), ""),
            PlanAction::Unchanged => (" ".normal(), ""),
        };
        println!(
            "│   {} {:<30} {}",
            symbol,
            plan.key.identity.to_string(),
            note.dimmed()
        );

        for change in &plan.changes {
            let default_tag = if matches!(change.desired, Desired::Default) {
                " (default)".dimmed().to_string()
            } else {
                String::new()
            };
            let skipped = if plan.skipped.contains(&change.property) {
                " [no setter]".red().to_string()
            } else {
                String::new()
            };
            println!(
                "│       {:<28} {} → {}{}{}",
                change.property,
                display_current(change.current.as_ref()).dimmed(),
                change.resolved,
                default_tag,
                skipped
            );
        }
    }

    println!("│");
    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} changes ({} create, {} update, {} remove)",
        summary.total().to_string().bold(),
        summary.creates.to_string().green(),
        summary.updates.to_string().yellow(),
        summary.destroys.to_string().red()
    );
    println!("└─────────────────────────────────────────────────────┘");
}

#[cfg(test)]
mod tests {
    use super::*;
    use plb_core::{Identity, ObjectKey};

    fn plan(action: PlanAction) -> Plan {
        Plan {
            key: ObjectKey::new(ResourceKind::DeviceGroup, Identity::single("g")),
            action,
            changes: Vec::new(),
            skipped: Vec::new(),
        }
    }

    #[test]
    fn test_summary_counts_actions() {
        let plans = vec![
            plan(PlanAction::Create),
            plan(PlanAction::Update),
            plan(PlanAction::Update),
            plan(PlanAction::Unchanged),
        ];
        let summary = PlanSummary::from_plans(&plans);
        assert_eq!(summary.creates, 1);
        assert_eq!(summary.updates, 2);
        assert_eq!(summary.unchanged, 1);
        assert_eq!(summary.total(), 3);
    }

    #[test]
    fn test_unchanged_only_has_no_changes() {
        let summary = PlanSummary::from_plans(&[plan(PlanAction::Unchanged)]);
        assert!(!summary.has_changes());
    }
}
