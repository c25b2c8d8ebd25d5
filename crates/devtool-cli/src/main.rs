//! `dev-tool` — operator tooling for Rancher-managed clusters.
//!
//! ```text
//! dev-tool [--config PATH] rancher -e ENV login [--save] [--insecure]
//! dev-tool [--config PATH] rancher -e ENV setup -c CLUSTER -p PROJECT -n NAMESPACE [--insecure]
//! dev-tool [--config PATH] rancher -e ENV kubeconfig -c CLUSTER [--stdout] [--insecure]
//! ```

mod config;
mod kubeconfig;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use devtool_sdk::{
    get_token, ExchangeSettings, LoginOutcome, RancherClient, ServerConfig, TOKEN_DESCRIPTION,
};
use tracing::{info, warn};

use crate::config::{Config, RancherEnvironment};

/// Exit code when the login was not completed in time.
const EXIT_TIMED_OUT: u8 = 1;
/// Exit code when the operator interrupted the login.
const EXIT_CANCELLED: u8 = 130;

#[derive(Parser, Debug)]
#[command(name = "dev-tool")]
#[command(author, version, about = "Operator tooling for Rancher-managed clusters", long_about = None)]
struct Cli {
    /// Config file (default: $DEV_TOOL_CONFIG or ~/.dev-tool/dev-tool.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Rancher management server commands
    Rancher(RancherArgs),
}

#[derive(Args, Debug)]
struct RancherArgs {
    /// Environment name from the config file (e.g. prod)
    #[arg(short, long)]
    environment: String,

    #[command(subcommand)]
    command: RancherCommands,
}

#[derive(Subcommand, Debug)]
enum RancherCommands {
    /// Log in through the browser
    Login {
        /// Create a long-lived API token and store it in the config file
        #[arg(long)]
        save: bool,
        /// Skip TLS certificate verification
        #[arg(long)]
        insecure: bool,
    },
    /// Ensure a project and a namespace exist, then fetch the kubeconfig
    Setup {
        /// Cluster name
        #[arg(short, long)]
        cluster: String,
        /// Project name
        #[arg(short, long)]
        project: String,
        /// Namespace name
        #[arg(short, long)]
        namespace: String,
        /// Skip TLS certificate verification
        #[arg(long)]
        insecure: bool,
    },
    /// Fetch the kubeconfig of a cluster
    Kubeconfig {
        /// Cluster name
        #[arg(short, long)]
        cluster: String,
        /// Print the document instead of writing it to disk
        #[arg(long)]
        stdout: bool,
        /// Skip TLS certificate verification
        #[arg(long)]
        insecure: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so `--stdout` output stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    until_interrupted(run(cli), interrupted()).await
}

/// Drive `command` to completion unless `interrupt` resolves first.
async fn until_interrupted(
    command: impl Future<Output = anyhow::Result<ExitCode>>,
    interrupt: impl Future<Output = ()>,
) -> ExitCode {
    tokio::select! {
        biased;

        () = interrupt => {
            eprintln!("interrupted");
            ExitCode::from(EXIT_CANCELLED)
        }
        result = command => match result {
            Ok(code) => code,
            Err(e) => {
                eprintln!("error: {e:#}");
                ExitCode::FAILURE
            }
        },
    }
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "could not listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config_path = Config::resolve_path(cli.config)?;
    let mut config = Config::load_or_init(&config_path)?;

    match cli.command {
        Commands::Rancher(args) => rancher(args, &mut config, &config_path).await,
    }
}

async fn rancher(args: RancherArgs, config: &mut Config, config_path: &Path) -> anyhow::Result<ExitCode> {
    let env = config.environment(&args.environment)?.clone();

    match args.command {
        RancherCommands::Login { save, insecure } => {
            login(&env, save, insecure || env.insecure_skip_tls_verify, config, config_path).await
        }
        RancherCommands::Setup {
            cluster,
            project,
            namespace,
            insecure,
        } => {
            let client = connect(&env, insecure)?;

            let project = client.ensure_project(&cluster, &project).await?;
            println!("project {} ({})", project.name, project.id);

            let namespace = client.ensure_namespace(&namespace, &cluster, &project.name).await?;
            println!("namespace {} in project {}", namespace.name, project.name);

            let document = client.fetch_kubeconfig(&cluster).await?;
            let path = write_kubeconfig(config, config_path, &cluster, &document)?;
            println!("kubeconfig for {cluster} written to {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        RancherCommands::Kubeconfig {
            cluster,
            stdout,
            insecure,
        } => {
            let client = connect(&env, insecure)?;
            let document = client.fetch_kubeconfig(&cluster).await?;
            if stdout {
                print!("{document}");
            } else {
                let path = write_kubeconfig(config, config_path, &cluster, &document)?;
                println!("kubeconfig for {cluster} written to {}", path.display());
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn login(
    env: &RancherEnvironment,
    save: bool,
    insecure: bool,
    config: &mut Config,
    config_path: &Path,
) -> anyhow::Result<ExitCode> {
    let settings = ExchangeSettings {
        insecure_skip_tls_verify: insecure,
        ..ExchangeSettings::default()
    };
    let outcome = get_token(&env.url, settings)
        .await
        .with_context(|| format!("login to {} failed", env.url))?;

    let token = match outcome {
        LoginOutcome::Obtained(token) => token,
        LoginOutcome::TimedOut => {
            eprintln!("login timed out, no token received");
            return Ok(ExitCode::from(EXIT_TIMED_OUT));
        }
        LoginOutcome::Cancelled => {
            eprintln!("login cancelled");
            return Ok(ExitCode::from(EXIT_CANCELLED));
        }
    };
    info!(environment = %env.environment, "login successful");

    if !save {
        println!("{}", token.secret());
        return Ok(ExitCode::SUCCESS);
    }

    let server = ServerConfig::new(&env.url, token.secret())?.insecure_skip_tls_verify(insecure);
    let client = RancherClient::connect(&server)?;
    let record = client.create_token(TOKEN_DESCRIPTION).await?;
    config.set_token(&env.environment, &record.token)?;
    config.save(config_path)?;
    println!(
        "API token {} saved for environment {} in {}",
        record.name,
        env.environment,
        config_path.display()
    );
    Ok(ExitCode::SUCCESS)
}

fn connect(env: &RancherEnvironment, insecure: bool) -> anyhow::Result<RancherClient> {
    let server = ServerConfig::new(&env.url, &env.token)
        .with_context(|| {
            format!(
                "environment {0} has no usable token, run `dev-tool rancher -e {0} login --save`",
                env.environment
            )
        })?
        .insecure_skip_tls_verify(insecure || env.insecure_skip_tls_verify);
    Ok(RancherClient::connect(&server)?)
}

fn write_kubeconfig(
    config: &mut Config,
    config_path: &Path,
    cluster: &str,
    document: &str,
) -> anyhow::Result<PathBuf> {
    let path = kubeconfig::store(&kubeconfig::directory_for(config_path), cluster, document)?;
    config.record_kubeconfig(cluster, &path);
    config.save(config_path)?;
    Ok(path)
}
