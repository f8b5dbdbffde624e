//! 识别原语。
//!
//! `SymbolDecoder` 只关心“给定画布，返回文本 + 原生格式，或失败”。
//! 识别器内部的任何错误（未找到、校验失败、格式异常）都统一视为一次未命中。

use std::collections::HashMap;

use crate::image_handler::Canvas;

/// 识别器原始输出。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeSymbol {
    pub text: String,
    pub format: rxing::BarcodeFormat,
}

/// 单次识别未命中。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("未识别到条码：{0}")]
pub struct SymbolMiss(pub String);

/// 识别原语能力。
pub trait SymbolDecoder {
    fn decode(&self, canvas: &Canvas) -> Result<NativeSymbol, SymbolMiss>;
}

impl<D: SymbolDecoder + ?Sized> SymbolDecoder for &D {
    fn decode(&self, canvas: &Canvas) -> Result<NativeSymbol, SymbolMiss> {
        (**self).decode(canvas)
    }
}

/// 基于 rxing 的多格式识别器。
#[derive(Debug, Clone, Copy)]
pub struct RxingDecoder {
    try_harder: bool,
}

impl RxingDecoder {
    /// `try_harder` 为 true 时启用穷举搜索，以延迟换召回。
    pub fn new(try_harder: bool) -> Self {
        Self { try_harder }
    }
}

impl Default for RxingDecoder {
    fn default() -> Self {
        Self::new(true)
    }
}

impl SymbolDecoder for RxingDecoder {
    fn decode(&self, canvas: &Canvas) -> Result<NativeSymbol, SymbolMiss> {
        let mut hints: rxing::DecodingHintDictionary = HashMap::new();
        if self.try_harder {
            hints.insert(
                rxing::DecodeHintType::TRY_HARDER,
                rxing::DecodeHintValue::TryHarder(true),
            );
        }

        let luma = canvas.to_luma();
        rxing::helpers::detect_in_luma_with_hints(luma, canvas.width(), canvas.height(), None, &mut hints)
            .map(|result| NativeSymbol {
                text: result.getText().to_string(),
                format: result.getBarcodeFormat().clone(),
            })
            .map_err(|e| SymbolMiss(e.to_string()))
    }
}
