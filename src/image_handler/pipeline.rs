//! # 预处理流水线模块
//!
//! ## 设计思路
//!
//! 将“字节 → 方向校正 → 尺寸包络 → 画布 → 对比度拉伸”集中管理，
//! 输出适合条码识别的 `Canvas`。在完整解码前先按头信息做像素/内存上限检查，
//! 降低恶意输入触发高内存开销的风险。
//!
//! ## 实现思路
//!
//! 1. 读取头信息尺寸并按上限快速拒绝
//! 2. 读取 EXIF 方向（失败即按正常方向）
//! 3. 计算目标尺寸：长边 > 1280 缩小，长边 < 800 放大，区间内保持原分辨率
//! 4. 分配画布并绘制（解码出的中间位图绘制后立即释放）
//! 5. 亮度动态范围足够时执行线性拉伸
//!
//! 取色链路复用 1、2、4，尺寸只缩小不放大，且不执行第 5 步。

use fast_image_resize as fr;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageBuffer, ImageReader, Rgba, RgbaImage};
use std::io::Cursor;

use super::orientation;
use super::source::{copy_into, RawImageData};
use super::{Canvas, DecodableImage, ImageConfig, ImageError};

/// 已编码图片（JPEG/PNG/WebP...），按 EXIF 方向解码。
pub struct EncodedImage<'a> {
    bytes: &'a [u8],
    orientation: u32,
    filter: FilterType,
    max_decoded_pixels: u64,
    max_decoded_bytes: u64,
}

impl<'a> EncodedImage<'a> {
    pub fn new(raw: &'a RawImageData, config: &ImageConfig) -> Self {
        let orientation = if config.apply_exif_orientation {
            orientation::read_exif_orientation(&raw.bytes)
        } else {
            1
        };

        Self {
            bytes: &raw.bytes,
            orientation,
            filter: config.resize_filter,
            max_decoded_pixels: config.max_decoded_pixels,
            max_decoded_bytes: config.max_decoded_bytes,
        }
    }

    pub fn orientation(&self) -> u32 {
        self.orientation
    }

    /// 按头信息校验上限后完整解码，并应用方向。
    fn decode_oriented(&self) -> Result<DynamicImage, ImageError> {
        let (header_width, header_height) = inspect_dimensions_from_memory(self.bytes)?;
        validate_limits(self.max_decoded_pixels, self.max_decoded_bytes, header_width, header_height)?;

        let decoded = image::load_from_memory(self.bytes)
            .map_err(|e| ImageError::Decode(format!("图片解码失败：{}", e)))?;

        Ok(orientation::apply_orientation(decoded, self.orientation))
    }
}

impl DecodableImage for EncodedImage<'_> {
    fn load_dimensions(&self) -> Result<(u32, u32), ImageError> {
        let (width, height) = inspect_dimensions_from_memory(self.bytes)?;
        if orientation::swaps_dimensions(self.orientation) {
            Ok((height, width))
        } else {
            Ok((width, height))
        }
    }

    fn render_into(&self, buffer: &mut [u8], width: u32, height: u32) -> Result<(), ImageError> {
        let oriented = self.decode_oriented()?;

        if oriented.dimensions() == (width, height) {
            let rgba = oriented.into_rgba8();
            return copy_into(buffer, rgba.as_raw());
        }

        let resized = resize_rgba(oriented.into_rgba8(), width, height, self.filter)?;
        copy_into(buffer, resized.as_raw())
    }
}

/// 计算预处理目标尺寸。
///
/// 长边超过 `max_dim` 时等比缩小到 `max_dim`；长边不足 `min_dim` 时等比放大到 `min_dim`；
/// 其余情况保持原尺寸。短边四舍五入且至少为 1。
pub fn target_dimensions(width: u32, height: u32, min_dim: u32, max_dim: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest == 0 {
        return (width, height);
    }

    let bound = if longest > max_dim {
        max_dim
    } else if longest < min_dim {
        min_dim
    } else {
        return (width, height);
    };

    let scale = bound as f64 / longest as f64;
    if width > height {
        (bound, ((height as f64 * scale).round() as u32).max(1))
    } else {
        (((width as f64 * scale).round() as u32).max(1), bound)
    }
}

/// 预处理一张卡面照片。
///
/// 画布分配失败是硬失败；对比度增强失败不会出现（纯内存运算）。
pub fn preprocess(image: &dyn DecodableImage, config: &ImageConfig) -> Result<Canvas, ImageError> {
    let mut canvas = render_oriented(image, config)?;
    if config.contrast_enhancement {
        contrast_stretch(&mut canvas, config.contrast_threshold);
    }
    Ok(canvas)
}

/// 方向校正 + 尺寸包络，不做对比度增强。
pub fn render_oriented(image: &dyn DecodableImage, config: &ImageConfig) -> Result<Canvas, ImageError> {
    render_within(image, config.min_dimension, config.max_dimension)
}

/// Logo 取色用：方向校正，只缩小不放大。
///
/// 小 Logo 放大后插值会混出原图没有的边缘色，调色板必须看到原生像素。
pub fn render_logo(image: &dyn DecodableImage, config: &ImageConfig) -> Result<Canvas, ImageError> {
    render_within(image, 0, config.max_dimension)
}

fn render_within(image: &dyn DecodableImage, min_dim: u32, max_dim: u32) -> Result<Canvas, ImageError> {
    let (source_width, source_height) = image.load_dimensions()?;
    let (width, height) = target_dimensions(source_width, source_height, min_dim, max_dim);

    let mut canvas = Canvas::try_new(width, height)?;
    image.render_into(canvas.pixels_mut(), width, height)?;

    log::debug!(
        "🖼️ 预处理绘制完成：{}x{} -> {}x{}",
        source_width,
        source_height,
        width,
        height
    );

    Ok(canvas)
}

/// 不经任何预处理、按原始分辨率解码（最后兜底策略）。
pub fn render_unprocessed(raw: &RawImageData, config: &ImageConfig) -> Result<Canvas, ImageError> {
    let (width, height) = inspect_dimensions_from_memory(&raw.bytes)?;
    validate_limits(config.max_decoded_pixels, config.max_decoded_bytes, width, height)?;

    let decoded = image::load_from_memory(&raw.bytes)
        .map_err(|e| ImageError::Decode(format!("图片解码失败：{}", e)))?;

    Ok(Canvas::from_image(decoded.into_rgba8()))
}

/// 线性对比度拉伸。
///
/// 亮度按 `0.299R + 0.587G + 0.114B` 计算；动态范围不超过 `threshold` 时原样返回，
/// 否则每个通道按 `(v - min) * 255 / (max - min)` 拉伸并钳制到 [0, 255]。
/// Alpha 通道不变。返回是否修改了像素。
pub fn contrast_stretch(canvas: &mut Canvas, threshold: f64) -> bool {
    let (min_lum, max_lum) = luminance_range(canvas.pixels());
    let range = max_lum - min_lum;

    if range <= threshold {
        log::debug!("🌫️ 亮度范围 {:.1} 未超过阈值 {:.1}，跳过对比度拉伸", range, threshold);
        return false;
    }

    let factor = 255.0 / range;
    for px in canvas.pixels_mut().chunks_exact_mut(4) {
        for channel in px.iter_mut().take(3) {
            *channel = ((*channel as f64 - min_lum) * factor).round().clamp(0.0, 255.0) as u8;
        }
    }

    true
}

/// 返回 (最小亮度, 最大亮度)。空缓冲返回 (0, 0)。
pub fn luminance_range(pixels: &[u8]) -> (f64, f64) {
    let mut min_lum = f64::MAX;
    let mut max_lum = f64::MIN;

    for px in pixels.chunks_exact(4) {
        let lum = luminance(px[0], px[1], px[2]);
        min_lum = min_lum.min(lum);
        max_lum = max_lum.max(lum);
    }

    if min_lum > max_lum {
        return (0.0, 0.0);
    }
    (min_lum, max_lum)
}

pub fn luminance(r: u8, g: u8, b: u8) -> f64 {
    0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64
}

/// 仅通过内存中的图片头信息读取宽高。
///
/// 用于在完整解码前做像素限制检查。
pub(crate) fn inspect_dimensions_from_memory(bytes: &[u8]) -> Result<(u32, u32), ImageError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ImageError::InvalidFormat(format!("无法识别图片格式：{}", e)))?;

    reader
        .into_dimensions()
        .map_err(|e| ImageError::InvalidFormat(format!("无法读取图片尺寸：{}", e)))
}

/// 校验像素数量与预计解码内存是否超过上限。
pub(crate) fn validate_limits(
    max_pixels: u64,
    max_bytes: u64,
    width: u32,
    height: u32,
) -> Result<(), ImageError> {
    let pixels = (width as u64)
        .checked_mul(height as u64)
        .ok_or_else(|| ImageError::ResourceLimit("图片像素数溢出".to_string()))?;

    if pixels > max_pixels {
        return Err(ImageError::ResourceLimit(format!(
            "图片像素过大：{} 像素（限制：{} 像素）",
            pixels, max_pixels
        )));
    }

    let estimated = pixels
        .checked_mul(4)
        .ok_or_else(|| ImageError::ResourceLimit("图片解码内存估算溢出".to_string()))?;

    if estimated > max_bytes {
        return Err(ImageError::ResourceLimit(format!(
            "图片解码预计内存过大：{:.2} MB（限制：{:.2} MB）",
            estimated as f64 / 1024.0 / 1024.0,
            max_bytes as f64 / 1024.0 / 1024.0
        )));
    }

    Ok(())
}

/// 缩放 RGBA 图像；fast_image_resize 失败时回退 `image::imageops::resize`。
pub(crate) fn resize_rgba(
    src: RgbaImage,
    target_width: u32,
    target_height: u32,
    filter: FilterType,
) -> Result<RgbaImage, ImageError> {
    let (src_width, src_height) = src.dimensions();

    let src_image =
        fr::images::Image::from_vec_u8(src_width, src_height, src.into_raw(), fr::PixelType::U8x4)
            .map_err(|e| ImageError::Decode(format!("构建源图像缓冲失败：{}", e)))?;

    let mut dst_image = fr::images::Image::new(target_width, target_height, fr::PixelType::U8x4);
    let mut resizer = fr::Resizer::new();
    let options = fr::ResizeOptions::new().resize_alg(fr::ResizeAlg::Convolution(to_fast_filter(filter)));

    if let Err(err) = resizer.resize(&src_image, &mut dst_image, Some(&options)) {
        log::warn!("⚠️ fast_image_resize 缩放失败，回退 image::resize：{}", err);
        let fallback = RgbaImage::from_raw(src_width, src_height, src_image.into_vec())
            .ok_or_else(|| ImageError::Decode("源图像缓冲长度异常".to_string()))?;
        return Ok(image::imageops::resize(&fallback, target_width, target_height, filter));
    }
    // 中间位图先释放，再交出缩放结果
    drop(src_image);

    ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(target_width, target_height, dst_image.into_vec())
        .ok_or_else(|| ImageError::Decode("fast_image_resize 输出缓冲长度异常".to_string()))
}

fn to_fast_filter(filter: FilterType) -> fr::FilterType {
    match filter {
        FilterType::Nearest => fr::FilterType::Box,
        FilterType::Triangle => fr::FilterType::Bilinear,
        FilterType::CatmullRom => fr::FilterType::CatmullRom,
        FilterType::Gaussian => fr::FilterType::Mitchell,
        FilterType::Lanczos3 => fr::FilterType::Lanczos3,
    }
}
