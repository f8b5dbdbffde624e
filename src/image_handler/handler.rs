//! # 核心编排模块
//!
//! ## 设计思路
//!
//! `ImageHandler` 只负责流程编排与配置管理，不直接与 CLI 绑定。
//! 两条处理链路：
//! 1. 卡面识别：读取配置快照 → 加载原始字节 → `BarcodeReader` 按策略识别
//! 2. 品牌取色：读取配置快照 → 加载 Logo → 方向校正 + 只缩小不放大（不做对比度）→ 调色板取色
//!
//! ## 实现思路
//!
//! - 配置通过 `Arc<RwLock<ImageConfig>>` 支持运行时调整。
//! - 单次请求内使用“同一配置快照”，避免处理中途配置漂移。
//! - 记录 `load/decode/total` 阶段耗时，便于性能诊断。
//! - Logo URL → 配色结果放入 LRU 缓存，“无配色”同样缓存。

use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;

use super::pipeline::{render_logo, EncodedImage};
use super::{ImageConfig, ImageError, ImageSource, RawImageData};
use crate::barcode::{BarcodeReader, DecodeOutcome, RxingDecoder, SymbolDecoder};
use crate::theme::{self, BrandThemeCache, MedianCutPalette, ThemeColorPair};

/// 图片处理器。
///
/// 封装了配置状态与品牌配色缓存，并编排各子模块实现完整流程。
pub struct ImageHandler {
    pub(super) config: Arc<RwLock<ImageConfig>>,
    brand_cache: Mutex<BrandThemeCache>,
}

impl ImageHandler {
    /// 根据初始配置创建处理器。
    ///
    /// # 示例
    /// ```rust
    /// use wallet_scan::image_handler::{ImageConfig, ImageHandler};
    ///
    /// let handler = ImageHandler::new(ImageConfig::default())?;
    /// assert_eq!(handler.config_snapshot()?.max_dimension, 1280);
    /// # Ok::<(), wallet_scan::image_handler::ImageError>(())
    /// ```
    pub fn new(config: ImageConfig) -> Result<Self, ImageError> {
        config.validate()?;
        let brand_cache = BrandThemeCache::new(config.brand_cache_capacity);

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            brand_cache: Mutex::new(brand_cache),
        })
    }

    /// 获取配置快照。
    ///
    /// 作用：保证单次请求链路使用一致参数。
    pub fn config_snapshot(&self) -> Result<ImageConfig, ImageError> {
        self.config
            .read()
            .map(|cfg| cfg.clone())
            .map_err(|_| ImageError::ResourceLimit("配置读取锁已中毒".to_string()))
    }

    /// 替换当前配置，先校验再生效。
    pub fn update_config(&self, next: ImageConfig) -> Result<(), ImageError> {
        next.validate()?;

        let mut config = self
            .config
            .write()
            .map_err(|_| ImageError::ResourceLimit("配置写入锁已中毒".to_string()))?;

        log::info!(
            "⚙️ 已更新图片配置（envelope={}~{}, contrast={}/{:.0}, try_harder={}, palette={}）",
            next.min_dimension,
            next.max_dimension,
            next.contrast_enhancement,
            next.contrast_threshold,
            next.try_harder,
            next.palette_size
        );
        *config = next;

        Ok(())
    }

    /// 加载任意来源的原始字节（已做体积与签名校验）。
    pub async fn load(&self, source: ImageSource) -> Result<RawImageData, ImageError> {
        let config = self.config_snapshot()?;
        self.load_source(source, &config).await
    }

    /// 卡面识别主入口：使用 rxing 识别器。
    ///
    /// “未识别到”以 `DecodeOutcome::NotFound` 返回，调用方应转为手动输入。
    pub async fn scan_barcode(&self, source: ImageSource) -> Result<DecodeOutcome, ImageError> {
        let try_harder = self.config_snapshot()?.try_harder;
        self.scan_barcode_with(source, RxingDecoder::new(try_harder)).await
    }

    /// 使用指定识别器执行卡面识别。
    pub async fn scan_barcode_with<D: SymbolDecoder>(
        &self,
        source: ImageSource,
        decoder: D,
    ) -> Result<DecodeOutcome, ImageError> {
        let config = self.config_snapshot()?;
        let total_start = Instant::now();
        let hint = source.hint();

        let load_start = Instant::now();
        let raw = self.load_source(source, &config).await?;
        let load_elapsed = load_start.elapsed();

        let decode_start = Instant::now();
        let outcome = BarcodeReader::new(decoder).decode(&raw, &config)?;
        let decode_elapsed = decode_start.elapsed();
        // 原始字节到此为止
        drop(raw);

        log::info!(
            "✅ 卡面识别完成 - source={} found={} attempts={} load={}ms decode={}ms total={}ms",
            hint,
            outcome.is_found(),
            outcome.attempts(),
            load_elapsed.as_millis(),
            decode_elapsed.as_millis(),
            total_start.elapsed().as_millis()
        );

        Ok(outcome)
    }

    /// 品牌取色主入口。
    ///
    /// 返回 `Ok(None)` 表示 Logo 没有可用的颜色信号，调用方使用渐变兜底。
    pub async fn extract_theme(&self, source: ImageSource) -> Result<Option<ThemeColorPair>, ImageError> {
        let config = self.config_snapshot()?;
        let total_start = Instant::now();

        let load_start = Instant::now();
        let raw = self.load_source(source, &config).await?;
        let load_elapsed = load_start.elapsed();

        let extract_start = Instant::now();
        let canvas = {
            let image = EncodedImage::new(&raw, &config);
            render_logo(&image, &config)?
        };
        drop(raw);

        let extractor = MedianCutPalette::new(config.palette_quality);
        let pair = theme::extract_theme(&canvas, &extractor, config.palette_size);
        let extract_elapsed = extract_start.elapsed();

        log::info!(
            "🎨 品牌取色完成 - themed={} load={}ms extract={}ms total={}ms",
            pair.is_some(),
            load_elapsed.as_millis(),
            extract_elapsed.as_millis(),
            total_start.elapsed().as_millis()
        );

        Ok(pair)
    }

    /// 按 Logo URL 取色，命中缓存时不再下载。
    pub async fn theme_for_logo_url(&self, url: &str) -> Result<Option<ThemeColorPair>, ImageError> {
        if let Some(cached) = self.cached_theme(url)? {
            log::debug!("🗂️ 品牌配色缓存命中 - {}", Self::redact_url_for_log(url));
            return Ok(cached);
        }

        let pair = self.extract_theme(ImageSource::Url(url.to_string())).await?;

        self.brand_cache
            .lock()
            .map_err(|_| ImageError::ResourceLimit("品牌缓存锁已中毒".to_string()))?
            .insert(url, pair.clone());

        Ok(pair)
    }

    /// 预先写入已知品牌配色（例如从持久层恢复）。
    pub fn remember_theme(&self, url: &str, pair: Option<ThemeColorPair>) -> Result<(), ImageError> {
        self.brand_cache
            .lock()
            .map_err(|_| ImageError::ResourceLimit("品牌缓存锁已中毒".to_string()))?
            .insert(url, pair);
        Ok(())
    }

    fn cached_theme(&self, url: &str) -> Result<Option<Option<ThemeColorPair>>, ImageError> {
        let mut cache = self
            .brand_cache
            .lock()
            .map_err(|_| ImageError::ResourceLimit("品牌缓存锁已中毒".to_string()))?;
        Ok(cache.get(url))
    }
}
