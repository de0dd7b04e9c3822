use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "kubedeck",
    version,
    about = "Browse and act on Kubernetes resources across several contexts at once."
)]
pub struct CliArgs {
    /// Kubeconfig context to open; repeat for several
    #[arg(short, long = "context", value_name = "NAME")]
    pub contexts: Vec<String>,

    /// Open every context in the kubeconfig
    #[arg(long, conflicts_with = "contexts")]
    pub all_contexts: bool,

    /// Start in a specific namespace
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Start with all namespaces selected
    #[arg(short = 'A', long)]
    pub all_namespaces: bool,

    /// Resource kind to list first (for example: po, deploy, svc)
    #[arg(short, long)]
    pub kind: Option<String>,

    /// Refresh interval in seconds
    #[arg(long)]
    pub refresh_secs: Option<u64>,

    /// tracing filter (for example: info,debug,trace)
    #[arg(long, default_value = "info")]
    pub log_filter: String,

    /// Write tracing output to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}
