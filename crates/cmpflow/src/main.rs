mod commands;
mod connect;
mod utils;

use clap::{Parser, Subcommand};
use cmpflow_cmp::HostType;
use cmpflow_config::ProviderConfig;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "cmpflow")]
#[command(about = "Run commands on CMP-managed machines and wait for the result", long_about = None)]
struct Cli {
    /// Config file (default: cmpflow.local.yaml, cmpflow.yaml, ~/.config/cmpflow/config.yaml)
    #[arg(long, env = "CMPFLOW_CONFIG_PATH", global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a command to instances and wait for it to finish
    Run {
        /// Host type (1: virtual machine, 2: physical machine)
        #[arg(long, default_value = "1")]
        host_type: HostType,
        /// Command body to execute
        #[arg(short, long)]
        content: String,
        /// Target instance ids, comma separated
        #[arg(short, long)]
        instance_ids: String,
        /// Command name (default: cmpflow-deploy-<timestamp>)
        #[arg(short, long)]
        name: Option<String>,
        /// Command description
        #[arg(long)]
        description: Option<String>,
        /// Return right after the command is accepted
        #[arg(long)]
        no_wait: bool,
    },
    /// Wait for a previously sent command to finish
    Wait {
        /// Record id returned by `run`
        record_id: String,
    },
    /// Show the current state of a command record
    Describe {
        /// Record id
        record_id: String,
    },
    /// List execution steps of a task
    Steps {
        /// Task id
        task_id: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        page_size: u32,
    },
    /// Request an access token with the configured credentials
    Token {
        /// Print the raw access token only
        #[arg(long)]
        print_token: bool,
    },
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ログ設定（-v で DEBUG、RUST_LOG で上書き可能）
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    // コマンド実行
    match cli.command {
        Commands::Run {
            host_type,
            content,
            instance_ids,
            name,
            description,
            no_wait,
        } => {
            let config = load_config(cli.config.as_deref())?;
            commands::run::handle(
                &config,
                host_type,
                content,
                instance_ids,
                name,
                description,
                no_wait,
            )
            .await?;
        }
        Commands::Wait { record_id } => {
            let config = load_config(cli.config.as_deref())?;
            commands::wait::handle(&config, &record_id).await?;
        }
        Commands::Describe { record_id } => {
            let config = load_config(cli.config.as_deref())?;
            commands::describe::handle(&config, &record_id).await?;
        }
        Commands::Steps {
            task_id,
            page,
            page_size,
        } => {
            let config = load_config(cli.config.as_deref())?;
            commands::steps::handle(&config, &task_id, page, page_size).await?;
        }
        Commands::Token { print_token } => {
            // SSO だけを使うので CMP エンドポイントは不要
            let config = read_config(cli.config.as_deref())?;
            commands::token::handle(&config, print_token).await?;
        }
        Commands::Version => {
            // 設定ファイル不要
            println!("cmpflow {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

/// 設定を読み込んで検証する（CMP を呼ぶコマンド用）
fn load_config(path: Option<&Path>) -> anyhow::Result<ProviderConfig> {
    let config = read_config(path)?;
    config.validate()?;
    Ok(config)
}

/// 設定を読み込む（検証なし）
///
/// 1. --config / CMPFLOW_CONFIG_PATH の明示パス
/// 2. 通常の探索順（cmpflow.local.yaml, cmpflow.yaml, ~/.config/cmpflow/config.yaml）
///
/// どちらの場合も CMPFLOW_* 環境変数で上書きされる。
fn read_config(path: Option<&Path>) -> anyhow::Result<ProviderConfig> {
    let config = match path {
        Some(path) => {
            let mut config = ProviderConfig::load_from(path)?;
            config.apply_env();
            config
        }
        None => ProviderConfig::load()?,
    };
    tracing::debug!(?config, "Loaded configuration");
    Ok(config)
}
