//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中到 `ImageConfig`，保证运行时行为可观测、可调整、可测试。
//! 覆盖四个阶段：来源加载、预处理、条码识别、品牌取色。
//!
//! ## 实现思路
//!
//! - `Default` 提供生产可用的配置（800~1280 尺寸包络、对比度阈值 30、8 色调色板）。
//! - `validate` 在配置被应用前做区间校验，拒绝自相矛盾的组合。

use image::imageops::FilterType;

use super::ImageError;

/// 图片链路配置。
#[derive(Debug, Clone)]
pub struct ImageConfig {
    /// 下载/读取原始字节时允许的最大文件体积（字节）。
    pub max_file_size: u64,
    /// 网络下载超时时间（秒）。
    pub download_timeout: u64,
    /// 建立连接（TCP/TLS）超时时间（秒）。
    pub connect_timeout: u64,
    /// 最大重定向次数。
    pub max_redirects: usize,
    /// 是否允许访问内网或本地地址（默认关闭，防 SSRF）。
    pub allow_private_network: bool,
    /// 解码后的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
    /// 解码阶段允许的预计内存上限（按 RGBA 估算，字节）。
    pub max_decoded_bytes: u64,
    /// 预处理后较长边的上限，超过则等比缩小。
    pub max_dimension: u32,
    /// 预处理后较长边的下限，不足则等比放大。
    pub min_dimension: u32,
    /// 亮度动态范围超过该值才执行对比度拉伸（0~255）。
    pub contrast_threshold: f64,
    /// 是否对卡面照片执行对比度增强。
    pub contrast_enhancement: bool,
    /// 是否按 EXIF 方向校正像素。
    pub apply_exif_orientation: bool,
    /// 缩放滤镜策略。
    pub resize_filter: FilterType,
    /// 识别器是否启用穷举搜索（以延迟换召回）。
    pub try_harder: bool,
    /// 调色板最大颜色数。
    pub palette_size: usize,
    /// 调色板采样步长：每隔 N 个像素取样一次，1 为全量。
    pub palette_quality: usize,
    /// 品牌配色缓存条目上限。
    pub brand_cache_capacity: usize,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_file_size: 50 * 1024 * 1024,
            download_timeout: 30,
            connect_timeout: 8,
            max_redirects: 5,
            allow_private_network: false,
            max_decoded_pixels: 40_000_000,
            max_decoded_bytes: 160 * 1024 * 1024,
            max_dimension: 1280,
            min_dimension: 800,
            contrast_threshold: 30.0,
            contrast_enhancement: true,
            apply_exif_orientation: true,
            resize_filter: FilterType::Triangle,
            try_harder: true,
            palette_size: 8,
            palette_quality: 10,
            brand_cache_capacity: 128,
        }
    }
}

impl ImageConfig {
    /// 校验配置是否自洽。
    ///
    /// # 示例
    /// ```rust
    /// use wallet_scan::image_handler::ImageConfig;
    ///
    /// let mut config = ImageConfig::default();
    /// config.min_dimension = 2000;
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ImageError> {
        if self.min_dimension == 0 || self.max_dimension == 0 {
            return Err(ImageError::InvalidFormat("尺寸包络不能为 0".to_string()));
        }
        if self.min_dimension > self.max_dimension {
            return Err(ImageError::InvalidFormat(format!(
                "min_dimension（{}）不能大于 max_dimension（{}）",
                self.min_dimension, self.max_dimension
            )));
        }
        if !(0.0..=255.0).contains(&self.contrast_threshold) {
            return Err(ImageError::InvalidFormat("contrast_threshold 必须在 0~255 之间".to_string()));
        }
        if !(2..=255).contains(&self.palette_size) {
            return Err(ImageError::InvalidFormat("palette_size 必须在 2~255 之间".to_string()));
        }
        if self.palette_quality == 0 {
            return Err(ImageError::InvalidFormat("palette_quality 不能为 0".to_string()));
        }
        if self.brand_cache_capacity == 0 {
            return Err(ImageError::InvalidFormat("brand_cache_capacity 不能为 0".to_string()));
        }
        if !(1..=120).contains(&self.connect_timeout) {
            return Err(ImageError::InvalidFormat("connect_timeout 必须在 1~120 秒之间".to_string()));
        }
        if self.max_decoded_bytes < 8 * 1024 * 1024 {
            return Err(ImageError::InvalidFormat("max_decoded_bytes 不能小于 8MB".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(ImageConfig::default().validate().is_ok());
    }

    #[test]
    fn default_envelope_matches_decode_policy() {
        let config = ImageConfig::default();
        assert_eq!(config.min_dimension, 800);
        assert_eq!(config.max_dimension, 1280);
        assert_eq!(config.contrast_threshold, 30.0);
        assert_eq!(config.palette_size, 8);
    }

    #[test]
    fn rejects_palette_size_out_of_range() {
        let mut config = ImageConfig::default();
        config.palette_size = 1;
        assert!(matches!(config.validate(), Err(ImageError::InvalidFormat(_))));
    }

    #[test]
    fn rejects_zero_sampling_step() {
        let mut config = ImageConfig::default();
        config.palette_quality = 0;
        assert!(config.validate().is_err());
    }
}
