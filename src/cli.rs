use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use plb_core::ResourceKind;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "plbsync")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Converge PLB services, device groups and nodes to a manifest", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show what apply would change, without writing
    Plan(PlanArgs),

    /// Converge the device to the manifest
    Apply(ApplyArgs),

    /// List live objects on the device
    Show(ShowArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Shared arguments
// ============================================================================

#[derive(Args, Clone)]
pub struct DeviceArgs {
    /// Device snapshot (JSON); overrides `device` in config.toml
    #[arg(short, long, env = "PLBSYNC_DEVICE")]
    pub device: Option<PathBuf>,

    /// Platform profile (generic, n7k, n9k); overrides config.toml
    #[arg(long)]
    pub platform: Option<String>,

    /// Only this resource kind
    #[arg(short, long, value_enum)]
    pub kind: Option<KindArg>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum KindArg {
    Service,
    DeviceGroup,
    DeviceGroupNode,
}

impl From<KindArg> for ResourceKind {
    fn from(value: KindArg) -> Self {
        match value {
            KindArg::Service => Self::Service,
            KindArg::DeviceGroup => Self::DeviceGroup,
            KindArg::DeviceGroupNode => Self::DeviceGroupNode,
        }
    }
}

// ============================================================================
// Plan / Apply
// ============================================================================

#[derive(Parser)]
pub struct PlanArgs {
    /// Manifest of desired objects (TOML)
    #[arg(short, long)]
    pub manifest: PathBuf,

    #[command(flatten)]
    pub device: DeviceArgs,
}

#[derive(Parser)]
pub struct ApplyArgs {
    /// Manifest of desired objects (TOML)
    #[arg(short, long)]
    pub manifest: PathBuf,

    #[command(flatten)]
    pub device: DeviceArgs,

    /// Show what would change without writing
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

// ============================================================================
// Show
// ============================================================================

#[derive(Parser)]
pub struct ShowArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_apply_flags_parse() {
        let cli = Cli::try_parse_from([
            "plbsync",
            "apply",
            "-m",
            "plb.toml",
            "--device",
            "device.json",
            "--kind",
            "device-group-node",
            "--dry-run",
            "--yes",
        ])
        .unwrap();
        let Command::Apply(args) = cli.command else {
            panic!("expected apply");
        };
        assert!(args.dry_run);
        assert!(args.yes);
        assert_eq!(args.device.device, Some(PathBuf::from("device.json")));
        assert_eq!(
            args.device.kind.map(ResourceKind::from),
            Some(ResourceKind::DeviceGroupNode)
        );
    }

    #[test]
    fn test_verbosity_counts() {
        let cli = Cli::try_parse_from(["plbsync", "-vv", "show"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(!cli.quiet);
    }
}
