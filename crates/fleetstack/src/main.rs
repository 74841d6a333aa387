mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "fleetstack")]
#[command(about = "RHUI テスト環境をスタックとして作成し、inventory を出力する", long_about = None)]
struct Cli {
    /// デバッグログを出力
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// スタックを作成して inventory を書き出す
    Create(Box<commands::create::CreateArgs>),
    /// 既存の inventory ファイルを検証
    Validate {
        /// inventory ファイル
        file: PathBuf,
    },
    /// バージョン情報を表示
    Version,
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let outcome = match cli.command {
        Commands::Create(args) => commands::create::handle(*args).await?,
        Commands::Validate { file } => commands::validate::handle(&file)?,
        Commands::Version => {
            println!("fleetstack {}", env!("CARGO_PKG_VERSION"));
            commands::Outcome::Success
        }
    };

    Ok(outcome.into())
}
