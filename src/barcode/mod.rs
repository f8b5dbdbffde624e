//! # 条码识别模块（barcode）
//!
//! ## 设计思路
//!
//! 识别原语（rxing）被视为黑盒，本模块只负责三件事：
//! - 以固定顺序驱动多种识别策略，首个成功即返回（`strategy`）
//! - 将识别器的原生格式枚举映射为稳定的字符串词表（本文件）
//! - 实时相机帧的持续识别循环（`live`）
//!
//! “未识别到”是可预期的结果而非错误，调用方应允许手动输入。

mod decoder;
mod live;
mod strategy;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use decoder::{NativeSymbol, RxingDecoder, SymbolDecoder, SymbolMiss};
pub use live::{LiveScanOutcome, LiveScanner};
pub use strategy::{BarcodeReader, DecodeOutcome, DecodeStrategy};

/// 应用内使用的条码类型词表。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BarcodeSymbology {
    Code128,
    Ean13,
    Upca,
    Qrcode,
    Pdf417,
    Datamatrix,
    Aztec,
    Code39,
}

impl BarcodeSymbology {
    pub const ALL: [BarcodeSymbology; 8] = [
        Self::Code128,
        Self::Ean13,
        Self::Upca,
        Self::Qrcode,
        Self::Pdf417,
        Self::Datamatrix,
        Self::Aztec,
        Self::Code39,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Code128 => "code128",
            Self::Ean13 => "ean13",
            Self::Upca => "upca",
            Self::Qrcode => "qrcode",
            Self::Pdf417 => "pdf417",
            Self::Datamatrix => "datamatrix",
            Self::Aztec => "aztec",
            Self::Code39 => "code39",
        }
    }

    /// 将识别器原生格式映射到词表，未覆盖的格式一律视为 code128。
    pub fn from_native(format: rxing::BarcodeFormat) -> Self {
        use rxing::BarcodeFormat;

        match format {
            BarcodeFormat::CODE_128 => Self::Code128,
            BarcodeFormat::EAN_13 => Self::Ean13,
            BarcodeFormat::UPC_A => Self::Upca,
            BarcodeFormat::QR_CODE => Self::Qrcode,
            BarcodeFormat::PDF_417 => Self::Pdf417,
            BarcodeFormat::DATA_MATRIX => Self::Datamatrix,
            BarcodeFormat::AZTEC => Self::Aztec,
            BarcodeFormat::CODE_39 => Self::Code39,
            other => {
                log::debug!("🔖 未映射的条码格式 {:?}，按 code128 处理", other);
                Self::Code128
            }
        }
    }
}

impl fmt::Display for BarcodeSymbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BarcodeSymbology {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|symbology| symbology.as_str() == s)
            .ok_or_else(|| format!("未知条码类型：{}", s))
    }
}

/// 识别结果：文本内容 + 条码类型。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeResult {
    pub text: String,
    pub format: BarcodeSymbology,
}

impl From<NativeSymbol> for DecodeResult {
    fn from(symbol: NativeSymbol) -> Self {
        Self {
            text: symbol.text,
            format: BarcodeSymbology::from_native(symbol.format),
        }
    }
}
