//! # 识别策略编排
//!
//! ## 设计思路
//!
//! 以显式的有序策略列表代替层层 try/catch：
//! 1. `Preprocessed`：方向校正 + 尺寸包络 + 对比度增强后的画布
//! 2. `Rotations`：上述画布的 0°/90°/180°/270° 变体，依次尝试
//! 3. `Unprocessed`：跳过全部预处理、按原始分辨率解码（最后兜底）
//!
//! 每一步返回命中或未命中，首个命中立即返回，后续策略不再执行。
//!
//! ## 错误边界
//!
//! - 画布分配失败、像素/内存超限：硬失败，直接返回 `Err`
//! - 预处理中的其他失败：记录日志，视为该策略未命中，继续下一个策略
//! - 兜底阶段无法读取图片：没有更简单的路径可退，返回 `Err`

use serde::Serialize;

use super::{DecodeResult, SymbolDecoder};
use crate::image_handler::{
    preprocess,
    render_unprocessed,
    rotation_variants,
    Canvas,
    EncodedImage,
    ImageConfig,
    ImageError,
    RawImageData,
    Rotation,
};

/// 识别策略。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeStrategy {
    Preprocessed,
    Rotations,
    Unprocessed,
}

impl DecodeStrategy {
    /// 默认顺序：由便宜到昂贵，最后兜底。
    pub const DEFAULT_ORDER: [DecodeStrategy; 3] = [Self::Preprocessed, Self::Rotations, Self::Unprocessed];
}

/// 一次识别的最终结果。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DecodeOutcome {
    Found {
        result: DecodeResult,
        strategy: DecodeStrategy,
        /// 仅 `Rotations` 策略命中时存在。
        rotation: Option<Rotation>,
        attempts: usize,
    },
    NotFound {
        attempts: usize,
    },
}

impl DecodeOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }

    /// 调用识别原语的总次数。
    pub fn attempts(&self) -> usize {
        match self {
            Self::Found { attempts, .. } | Self::NotFound { attempts } => *attempts,
        }
    }

    pub fn result(&self) -> Option<&DecodeResult> {
        match self {
            Self::Found { result, .. } => Some(result),
            Self::NotFound { .. } => None,
        }
    }

    pub fn into_result(self) -> Option<DecodeResult> {
        match self {
            Self::Found { result, .. } => Some(result),
            Self::NotFound { .. } => None,
        }
    }
}

/// 条码识别适配器：按策略顺序驱动识别原语。
pub struct BarcodeReader<D> {
    decoder: D,
    strategies: Vec<DecodeStrategy>,
}

/// 预处理画布的惰性状态：`Rotations` 复用 `Preprocessed` 的结果。
enum Prepared {
    Pending,
    Ready(Canvas),
    Failed,
}

impl<D: SymbolDecoder> BarcodeReader<D> {
    pub fn new(decoder: D) -> Self {
        Self {
            decoder,
            strategies: DecodeStrategy::DEFAULT_ORDER.to_vec(),
        }
    }

    /// 自定义策略顺序。
    pub fn with_strategies(mut self, strategies: &[DecodeStrategy]) -> Self {
        self.strategies = strategies.to_vec();
        self
    }

    pub fn strategies(&self) -> &[DecodeStrategy] {
        &self.strategies
    }

    /// 识别一张卡面照片。
    pub fn decode(&self, raw: &RawImageData, config: &ImageConfig) -> Result<DecodeOutcome, ImageError> {
        let mut attempts = 0usize;
        let mut prepared = Prepared::Pending;

        for &strategy in &self.strategies {
            match strategy {
                DecodeStrategy::Preprocessed => {
                    let Some(canvas) = Self::prepared_canvas(&mut prepared, raw, config)? else {
                        continue;
                    };
                    attempts += 1;
                    if let Some(result) = self.try_canvas(canvas, strategy) {
                        return Ok(Self::found(result, strategy, None, attempts));
                    }
                }
                DecodeStrategy::Rotations => {
                    let Some(canvas) = Self::prepared_canvas(&mut prepared, raw, config)? else {
                        continue;
                    };
                    for variant in rotation_variants(canvas) {
                        attempts += 1;
                        if let Some(result) = self.try_canvas(&variant.canvas, strategy) {
                            return Ok(Self::found(result, strategy, Some(variant.rotation), attempts));
                        }
                        // 变体离开作用域即释放
                    }
                }
                DecodeStrategy::Unprocessed => {
                    let canvas = render_unprocessed(raw, config)?;
                    attempts += 1;
                    if let Some(result) = self.try_canvas(&canvas, strategy) {
                        return Ok(Self::found(result, strategy, None, attempts));
                    }
                }
            }
        }

        log::info!("🔍 全部识别策略均未命中（共 {} 次尝试），请手动输入", attempts);
        Ok(DecodeOutcome::NotFound { attempts })
    }

    fn found(result: DecodeResult, strategy: DecodeStrategy, rotation: Option<Rotation>, attempts: usize) -> DecodeOutcome {
        log::info!(
            "✅ 条码识别成功 - strategy={:?} rotation={:?} format={} attempts={}",
            strategy,
            rotation.map(Rotation::degrees),
            result.format,
            attempts
        );
        DecodeOutcome::Found {
            result,
            strategy,
            rotation,
            attempts,
        }
    }

    fn try_canvas(&self, canvas: &Canvas, strategy: DecodeStrategy) -> Option<DecodeResult> {
        match self.decoder.decode(canvas) {
            Ok(symbol) => Some(DecodeResult::from(symbol)),
            Err(miss) => {
                log::debug!("↩️ {:?} 未命中：{}", strategy, miss);
                None
            }
        }
    }

    fn prepared_canvas<'p>(
        prepared: &'p mut Prepared,
        raw: &RawImageData,
        config: &ImageConfig,
    ) -> Result<Option<&'p Canvas>, ImageError> {
        if matches!(prepared, Prepared::Pending) {
            let image = EncodedImage::new(raw, config);
            *prepared = match preprocess(&image, config) {
                Ok(canvas) => Prepared::Ready(canvas),
                Err(err @ (ImageError::Canvas(_) | ImageError::ResourceLimit(_))) => return Err(err),
                Err(err) => {
                    log::warn!("⚠️ 预处理失败，跳过预处理策略：{}", err);
                    Prepared::Failed
                }
            };
        }

        let prepared: &'p Prepared = prepared;
        Ok(match prepared {
            Prepared::Ready(canvas) => Some(canvas),
            Prepared::Pending | Prepared::Failed => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::barcode::{BarcodeSymbology, NativeSymbol, SymbolMiss};
    use image::{DynamicImage, ImageBuffer, ImageFormat, Rgba};
    use std::io::Cursor;
    use std::sync::Mutex;

    /// 按调用序号决定是否命中，并记录每次看到的画布尺寸。
    struct ScriptedDecoder {
        hit_on: Option<usize>,
        seen: Mutex<Vec<(u32, u32)>>,
    }

    impl ScriptedDecoder {
        fn new(hit_on: Option<usize>) -> Self {
            Self {
                hit_on,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl SymbolDecoder for ScriptedDecoder {
        fn decode(&self, canvas: &Canvas) -> Result<NativeSymbol, SymbolMiss> {
            let mut seen = self.seen.lock().unwrap();
            seen.push(canvas.dimensions());
            if Some(seen.len()) == self.hit_on {
                Ok(NativeSymbol {
                    text: "4006381333931".to_string(),
                    format: rxing::BarcodeFormat::EAN_13,
                })
            } else {
                Err(SymbolMiss("scripted".to_string()))
            }
        }
    }

    fn raw_png(width: u32, height: u32) -> RawImageData {
        let img = ImageBuffer::from_fn(width, height, |x, _| {
            if x % 7 < 3 { Rgba([0, 0, 0, 255]) } else { Rgba([255, 255, 255, 255]) }
        });
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut cursor, ImageFormat::Png)
            .expect("failed to encode test image");
        RawImageData {
            bytes: cursor.into_inner(),
            source_hint: "test",
        }
    }

    #[test]
    fn direct_hit_skips_every_fallback() {
        let decoder = ScriptedDecoder::new(Some(1));
        let outcome = BarcodeReader::new(&decoder)
            .decode(&raw_png(2000, 1500), &ImageConfig::default())
            .unwrap();

        assert!(matches!(
            outcome,
            DecodeOutcome::Found { strategy: DecodeStrategy::Preprocessed, rotation: None, attempts: 1, .. }
        ));
        assert_eq!(outcome.result().unwrap().format, BarcodeSymbology::Ean13);
        assert_eq!(decoder.seen.lock().unwrap().as_slice(), &[(1280, 960)]);
    }

    #[test]
    fn rotation_hit_reports_the_angle() {
        // 直接 1 次，0° 第 2 次，90° 第 3 次
        let decoder = ScriptedDecoder::new(Some(3));
        let outcome = BarcodeReader::new(&decoder)
            .decode(&raw_png(2000, 1500), &ImageConfig::default())
            .unwrap();

        assert!(matches!(
            outcome,
            DecodeOutcome::Found {
                strategy: DecodeStrategy::Rotations,
                rotation: Some(Rotation::Deg90),
                attempts: 3,
                ..
            }
        ));
        assert_eq!(
            decoder.seen.lock().unwrap().as_slice(),
            &[(1280, 960), (1280, 960), (960, 1280)]
        );
    }

    #[test]
    fn unprocessed_fallback_sees_native_resolution() {
        let decoder = ScriptedDecoder::new(Some(6));
        let outcome = BarcodeReader::new(&decoder)
            .decode(&raw_png(2000, 1500), &ImageConfig::default())
            .unwrap();

        assert!(matches!(outcome, DecodeOutcome::Found { strategy: DecodeStrategy::Unprocessed, .. }));
        assert_eq!(decoder.seen.lock().unwrap().last(), Some(&(2000, 1500)));
    }

    #[test]
    fn exhausted_strategies_are_not_found() {
        let decoder = ScriptedDecoder::new(None);
        let outcome = BarcodeReader::new(&decoder)
            .decode(&raw_png(900, 900), &ImageConfig::default())
            .unwrap();

        assert_eq!(outcome, DecodeOutcome::NotFound { attempts: 6 });
        assert!(outcome.into_result().is_none());
    }

    #[test]
    fn resource_limit_is_a_hard_failure() {
        let decoder = ScriptedDecoder::new(None);
        let mut config = ImageConfig::default();
        config.max_decoded_pixels = 1_000_000;

        let result = BarcodeReader::new(&decoder).decode(&raw_png(2000, 1500), &config);
        assert!(matches!(result, Err(ImageError::ResourceLimit(_))));
        assert!(decoder.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn undecodable_bytes_fail_at_unprocessed_stage() {
        let decoder = ScriptedDecoder::new(None);
        let raw = RawImageData {
            bytes: b"not an image at all".to_vec(),
            source_hint: "test",
        };

        let result = BarcodeReader::new(&decoder).decode(&raw, &ImageConfig::default());
        assert!(matches!(result, Err(ImageError::InvalidFormat(_))));
        assert!(decoder.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn custom_order_can_skip_rotations() {
        let decoder = ScriptedDecoder::new(None);
        let reader = BarcodeReader::new(&decoder)
            .with_strategies(&[DecodeStrategy::Preprocessed, DecodeStrategy::Unprocessed]);
        assert_eq!(reader.strategies().len(), 2);

        let outcome = reader.decode(&raw_png(900, 900), &ImageConfig::default()).unwrap();
        assert_eq!(outcome.attempts(), 2);
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let outcome = DecodeOutcome::NotFound { attempts: 6 };
        assert_eq!(
            serde_json::to_string(&outcome).unwrap(),
            r#"{"status":"not_found","attempts":6}"#
        );
    }
}
