use std::path::PathBuf;

use clap::ArgAction;
use clap::Parser;
use utils::version;

use super::RunConfig;
use super::Selection;
use crate::k8s::kube_client::default_kubeconfig_path;
use crate::render::OutputFormat;

/// Executes a command in the running containers of a namespace and reports
/// exit code, stdout and stderr of each.
///
/// Piped standard input is forwarded to every execution; without a command it
/// is run by `sh`.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "k8sexec",
    about,
    long_about,
    version = &**version::VERSION,
    disable_version_flag = true
)]
pub struct Cli {
    #[arg(
        short = 'k',
        long,
        value_hint = clap::ValueHint::FilePath,
        help = "Path to the kubeconfig file [default: ~/.kube/config]"
    )]
    pub kubeconfig: Option<PathBuf>,

    #[arg(
        short,
        long,
        default_value = "default",
        help = "Namespace to enumerate"
    )]
    pub namespace: String,

    #[arg(
        short,
        long,
        help = "A pod name, if not provided then all containers in the namespace are enumerated"
    )]
    pub pod: Option<String>,

    #[arg(short, long, requires = "pod", help = "A container name within --pod")]
    pub container: Option<String>,

    #[arg(
        short,
        long,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format"
    )]
    pub output: OutputFormat,

    #[arg(short, long, help = "Enable debug logging on stderr")]
    pub debug: bool,

    #[arg(
        long,
        help = "Execute against every running replica instead of one pod per deployment or stateful set"
    )]
    pub all_replicas: bool,

    #[arg(
        long = "require",
        value_name = "UTIL",
        help = "Skip containers where UTIL cannot be executed"
    )]
    pub require_utility: Option<String>,

    #[arg(short = 'v', long, action = ArgAction::Version, help = "Print version")]
    pub version: Option<bool>,

    /// Command to execute, everything after `--` or the first positional argument
    #[arg(
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "COMMAND"
    )]
    pub command: Vec<String>,
}

impl Cli {
    /// Kubeconfig to load, falling back to the home directory default.
    pub fn kubeconfig_path(&self) -> Option<PathBuf> {
        self.kubeconfig.clone().or_else(default_kubeconfig_path)
    }

    pub fn run_config(&self) -> RunConfig {
        RunConfig::builder(&self.namespace)
            .selection(Selection::from_flags(self.pod.as_deref(), self.container.as_deref()))
            .command(self.command.clone())
            .all_replicas(self.all_replicas)
            .require_utility(self.require_utility.clone())
            .build()
    }
}
