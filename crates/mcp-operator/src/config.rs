use std::time::Duration;

use clap::{Parser, Subcommand};

/// MCP operator - aggregates MCP tools, prompts and resources into gateway deployments
#[derive(Parser, Debug)]
#[command(name = "mcp-operator", version, about, long_about = None)]
pub struct Cli {
    /// Print the CRD manifests and exit
    #[arg(long)]
    pub crd: bool,

    /// Only watch this namespace (default: all namespaces)
    #[arg(long, env = "MCP_WATCH_NAMESPACE", global = true)]
    pub watch_namespace: Option<String>,

    /// Seconds between periodic re-reconciles of healthy objects
    #[arg(long, env = "MCP_RESYNC_INTERVAL_SECS", default_value_t = 300, global = true)]
    pub resync_interval_secs: u64,

    /// Do not install CRDs on startup
    #[arg(long, env = "MCP_SKIP_CRD_INSTALL", global = true)]
    pub skip_crd_install: bool,

    /// Service name reported to the telemetry backend
    #[arg(long, env = "OTEL_SERVICE_NAME", default_value = "mcp-operator", global = true)]
    pub service_name: String,

    /// Mode to run in; defaults to `controller`
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Operator subcommands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the controllers (default mode)
    Controller,
}

impl Cli {
    /// Interval between periodic re-reconciles
    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_watch_everything() {
        let cli = Cli::try_parse_from(["mcp-operator"]).expect("no args should parse");
        assert!(!cli.crd);
        assert!(cli.command.is_none());
        assert_eq!(cli.resync_interval(), Duration::from_secs(300));
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "mcp-operator",
            "controller",
            "--watch-namespace",
            "mcp",
            "--resync-interval-secs",
            "60",
            "--skip-crd-install",
            "--service-name",
            "gateway-operator",
        ])
        .expect("flags should parse");

        assert_eq!(cli.command, Some(Commands::Controller));
        assert_eq!(cli.watch_namespace.as_deref(), Some("mcp"));
        assert_eq!(cli.resync_interval(), Duration::from_secs(60));
        assert!(cli.skip_crd_install);
        assert_eq!(cli.service_name, "gateway-operator");
    }

    #[test]
    fn crd_flag_parses_without_subcommand() {
        let cli = Cli::try_parse_from(["mcp-operator", "--crd"]).expect("--crd should parse");
        assert!(cli.crd);
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
        let help = Cli::command().render_long_help().to_string();
        assert!(help.contains("controller"));
    }

    #[test]
    fn non_numeric_resync_is_rejected() {
        assert!(Cli::try_parse_from(["mcp-operator", "--resync-interval-secs", "soon"]).is_err());
    }
}
