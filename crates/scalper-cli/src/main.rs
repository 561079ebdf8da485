//! 스캘핑 봇 CLI.
//!
//! # 사용 예시
//!
//! ```bash
//! # 트레이딩 봇 실행
//! scalper run --config config/default.toml
//!
//! # 체결 알림 릴레이 실행 (별도 프로세스)
//! scalper relay --config config/default.toml
//! ```

use clap::{Parser, Subcommand};
use scalper_core::{init_logging, AppConfig, LogConfig};
use tracing::error;

mod commands;

#[derive(Parser)]
#[command(name = "scalper")]
#[command(about = "Scalping bot CLI - Bybit 선물 단타 자동매매", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 트레이딩 봇 시작
    Run {
        /// 설정 파일
        #[arg(short, long, default_value = "config/default.toml")]
        config: String,
    },

    /// 체결 알림 릴레이 시작
    Relay {
        /// 설정 파일
        #[arg(short, long, default_value = "config/default.toml")]
        config: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .env 파일이 있으면 로드
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config } => {
            let app_config = AppConfig::load(&config)?;
            init_tracing(&app_config)?;

            if let Err(e) = commands::run::run(app_config).await {
                error!("Trading bot failed: {}", e);
                return Err(e.into());
            }
        }

        Commands::Relay { config } => {
            let app_config = AppConfig::load(&config)?;
            init_tracing(&app_config)?;

            if let Err(e) = commands::relay::relay(app_config).await {
                error!("Notification relay failed: {}", e);
                return Err(e.into());
            }
        }
    }

    Ok(())
}

fn init_tracing(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let format = config.logging.format.parse().unwrap_or_default();
    init_logging(LogConfig::new(config.logging.level.as_str()).with_format(format))
}
