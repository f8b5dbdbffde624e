//! # 会员卡钱包工具 — 命令行入口
//!
//! 本文件仅负责参数解析、日志初始化与结果输出（JSON）。
//! 业务逻辑分布在各子模块中，详见 `lib.rs` 架构文档。

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;

use wallet_scan::card::{Card, CardRecord};
use wallet_scan::error::AppError;
use wallet_scan::image_handler::{ImageConfig, ImageHandler, ImageSource};
use wallet_scan::settings::AppSettings;
use wallet_scan::theme::{self, BackfillStats, BrandLogoRecord};

/// Barcode acquisition and brand theming for a loyalty-card wallet
#[derive(Parser)]
#[command(name = "wallet-scan")]
#[command(version)]
#[command(about = "Decode card barcodes and extract brand colors", long_about = None)]
struct Cli {
    /// JSON settings file overriding the default image configuration
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Allow loading URLs that resolve to private or local addresses
    #[arg(long, global = true)]
    allow_private_network: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode a barcode from a card photo
    Decode {
        #[command(flatten)]
        input: InputArgs,

        /// Skip contrast enhancement of the preprocessed canvas
        #[arg(long)]
        no_contrast: bool,
    },
    /// Extract a light/dark theme pair from a logo
    Theme {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Fill missing themes for brand logos and the cards that use them
    Backfill {
        /// JSON array of brand logo records
        #[arg(long)]
        logos: PathBuf,

        /// JSON array of card records
        #[arg(long)]
        cards: PathBuf,

        /// Only print statistics, do not extract anything
        #[arg(long)]
        dry_run: bool,

        /// Write updated records back to the input files
        #[arg(long)]
        write: bool,
    },
}

#[derive(clap::Args)]
#[group(required = true, multiple = false)]
struct InputArgs {
    /// Local image file
    #[arg(long)]
    file: Option<String>,

    /// Image URL
    #[arg(long)]
    url: Option<String>,

    /// Base64 payload or data URL
    #[arg(long)]
    base64: Option<String>,
}

impl InputArgs {
    fn into_source(self) -> Result<ImageSource, AppError> {
        match (self.file, self.url, self.base64) {
            (Some(path), None, None) => Ok(ImageSource::FilePath(path)),
            (None, Some(url), None) => Ok(ImageSource::Url(url)),
            (None, None, Some(data)) => Ok(ImageSource::Base64(data)),
            _ => Err(AppError::Settings("必须且只能指定一个图片来源".to_string())),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BackfillOutput {
    stats: BackfillStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    results: Option<theme::BackfillReport>,
}

fn build_config(cli: &Cli) -> Result<ImageConfig, AppError> {
    let mut config = match &cli.settings {
        Some(path) => AppSettings::load(path)?
            .ok_or_else(|| AppError::Settings(format!("设置文件不存在: {}", path.display())))?
            .to_config()?,
        None => ImageConfig::default(),
    };

    if cli.allow_private_network {
        config.allow_private_network = true;
    }
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let config = build_config(&cli)?;

    match cli.command {
        Command::Decode { input, no_contrast } => {
            let mut config = config;
            if no_contrast {
                config.contrast_enhancement = false;
            }
            let handler = ImageHandler::new(config)?;
            let outcome = handler.scan_barcode(input.into_source()?).await?;
            if !outcome.is_found() {
                log::info!("🔍 未识别到条码，可手动输入卡号");
            }
            print_json(&outcome)
        }
        Command::Theme { input } => {
            let handler = ImageHandler::new(config)?;
            let pair = handler.extract_theme(input.into_source()?).await?;
            print_json(&pair)
        }
        Command::Backfill {
            logos,
            cards,
            dry_run,
            write,
        } => {
            let mut logo_records: Vec<BrandLogoRecord> = serde_json::from_str(&std::fs::read_to_string(&logos)?)?;
            let card_records: Vec<CardRecord> = serde_json::from_str(&std::fs::read_to_string(&cards)?)?;
            let mut card_list: Vec<Card> = card_records.into_iter().map(Card::from).collect();

            let stats = BackfillStats::collect(&logo_records, &card_list);
            if dry_run {
                return print_json(&BackfillOutput { stats, results: None });
            }

            let handler = ImageHandler::new(config)?;
            let report = theme::backfill(&handler, &mut logo_records, &mut card_list).await;

            if write {
                let updated_cards: Vec<CardRecord> = card_list.into_iter().map(CardRecord::from).collect();
                std::fs::write(&logos, serde_json::to_string_pretty(&logo_records)?)?;
                std::fs::write(&cards, serde_json::to_string_pretty(&updated_cards)?)?;
                log::info!("💾 已写回 {} 与 {}", logos.display(), cards.display());
            }

            print_json(&BackfillOutput {
                stats,
                results: Some(report),
            })
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            log::error!("❌ {}", AppError::Runtime(err.to_string()));
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.stage() {
                Some(stage) => log::error!("❌ [{}@{}] {}", err.code(), stage, err),
                None => log::error!("❌ [{}] {}", err.code(), err),
            }
            ExitCode::FAILURE
        }
    }
}
