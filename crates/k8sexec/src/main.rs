use std::io::IsTerminal;
use std::io::Read;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use k8sexec::config::Cli;
use k8sexec::exec::KubeExecutor;
use k8sexec::k8s::kube_client;
use k8sexec::k8s::KubeCluster;
use k8sexec::orchestrator::resolve_command;
use k8sexec::orchestrator::Orchestrator;
use k8sexec::render::render;
use k8sexec::render::OutputFormat;
use utils::version;

/// Sets up global panic hooks.
fn setup_global_hooks() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        default_hook(panic_info);
        tracing::error!("Thread panicked: {}", panic_info);
    }));
}

/// Reads all of stdin unless it is an interactive terminal.
fn capture_stdin() -> Result<Vec<u8>> {
    let mut stdin = std::io::stdin();
    let mut buffer = Vec::new();
    if !stdin.is_terminal() {
        stdin
            .read_to_end(&mut buffer)
            .context("Failed to read stdin")?;
    }
    Ok(buffer)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    setup_global_hooks();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if err.use_stderr() => {
            err.print()?;
            std::process::exit(1);
        }
        Err(err) => err.exit(),
    };

    utils::logging::init(cli.debug);
    tracing::debug!("Starting k8sexec {}", &**version::VERSION);

    run(cli).await
}

async fn run(cli: Cli) -> Result<()> {
    let input = capture_stdin()?;
    let config = cli.run_config();

    // fail on an empty invocation before touching the kubeconfig
    resolve_command(&config.command, &input)
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    let client = kube_client::init_kube_client(cli.kubeconfig_path())
        .await
        .map_err(|e| anyhow::anyhow!("{e:?}"))?;
    let cluster = KubeCluster::new(client.clone(), config.namespace.as_str());
    let executor = KubeExecutor::new(client, config.namespace.as_str());

    let status = Orchestrator::new(&cluster, &executor, config)
        .run(&input)
        .await
        .map_err(|e| anyhow::anyhow!("{e:?}"))?;

    let output = render(&status, cli.output)
        .context("Failed to render results")?;
    match cli.output {
        OutputFormat::Json => println!("{output}"),
        OutputFormat::Text => print!("{output}"),
    }
    Ok(())
}
