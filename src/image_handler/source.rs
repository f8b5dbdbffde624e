//! # 数据源与中间模型
//!
//! ## 设计思路
//!
//! 将“外部输入类型”和“流水线中间结果”解耦：
//! - `ImageSource` 表示外部来源语义
//! - `RawImageData` 表示已加载但未解码的字节（仅在单次识别/取色期间存在）
//! - `DecodableImage` 是“可解码图片”能力：只暴露 `load_dimensions` 与 `render_into`，
//!   流水线其余部分不关心底层用的是哪种解码器
//! - `Canvas` 是预处理输出的 RGBA 像素缓冲，由创建它的调用独占

use image::RgbaImage;

use super::ImageError;

/// 图片输入来源。
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// 网络地址来源（品牌 Logo）。
    Url(String),
    /// Base64（支持 Data URL 与纯 Base64 字符串）。
    Base64(String),
    /// 本地文件路径来源。
    FilePath(String),
    /// 调用方已持有的原始字节（如表单上传）。
    Bytes(Vec<u8>),
}

impl ImageSource {
    /// 来源提示（用于日志与诊断）。
    pub fn hint(&self) -> &'static str {
        match self {
            Self::Url(_) => "url",
            Self::Base64(_) => "base64",
            Self::FilePath(_) => "file",
            Self::Bytes(_) => "bytes",
        }
    }
}

/// 加载阶段输出：原始字节与来源标识。
///
/// EXIF 方向等元数据尚未经过任何校验。
#[derive(Debug, Clone)]
pub struct RawImageData {
    /// 原始图片字节。
    pub bytes: Vec<u8>,
    /// 来源提示（用于日志与诊断）。
    pub source_hint: &'static str,
}

/// 可解码图片能力。
///
/// 浏览器里的 `ImageBitmap` / `<img>` 在这里被抽象为两个操作，
/// 便于替换为任意原生解码实现。
pub trait DecodableImage {
    /// 返回“显示方向”下的宽高（已计入方向元数据）。
    fn load_dimensions(&self) -> Result<(u32, u32), ImageError>;

    /// 将图片按显示方向缩放绘制到 `buffer`（RGBA8，长度为 `width * height * 4`）。
    fn render_into(&self, buffer: &mut [u8], width: u32, height: u32) -> Result<(), ImageError>;
}

/// 预处理输出的像素画布（RGBA8）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    image: RgbaImage,
}

impl Canvas {
    /// 分配一块全透明画布。
    ///
    /// 分配失败等价于“拿不到绘图上下文”，属于本次操作的硬失败。
    pub fn try_new(width: u32, height: u32) -> Result<Self, ImageError> {
        if width == 0 || height == 0 {
            return Err(ImageError::Canvas(format!("画布尺寸无效：{}x{}", width, height)));
        }

        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(4))
            .ok_or_else(|| ImageError::Canvas(format!("画布尺寸溢出：{}x{}", width, height)))?;

        let mut pixels = Vec::new();
        pixels
            .try_reserve_exact(len)
            .map_err(|e| ImageError::Canvas(format!("无法分配 {}x{} 画布：{}", width, height, e)))?;
        pixels.resize(len, 0);

        RgbaImage::from_raw(width, height, pixels)
            .map(|image| Self { image })
            .ok_or_else(|| ImageError::Canvas("画布缓冲长度异常".to_string()))
    }

    /// 从已有 RGBA 字节构建画布，长度必须与宽高一致。
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, ImageError> {
        if width == 0 || height == 0 {
            return Err(ImageError::Canvas(format!("画布尺寸无效：{}x{}", width, height)));
        }
        RgbaImage::from_raw(width, height, pixels)
            .map(|image| Self { image })
            .ok_or_else(|| ImageError::Canvas("RGBA 字节长度与尺寸不一致".to_string()))
    }

    pub fn from_image(image: RgbaImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// RGBA 字节（`width * height * 4`）。
    pub fn pixels(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.image
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.image.get_pixel(x, y).0
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }

    /// 转换为 8 位亮度数据，供识别器使用。
    ///
    /// 全透明像素视为白色。
    pub fn to_luma(&self) -> Vec<u8> {
        let mut luma = Vec::with_capacity(self.pixels().len() / 4);
        for px in self.pixels().chunks_exact(4) {
            let [r, g, b, a] = [px[0], px[1], px[2], px[3]];
            let value = if a == 0 {
                0xFF
            } else {
                // (306R + 601G + 117B) >> 10 ≈ 0.299R + 0.587G + 0.114B，0x200 用于四舍五入
                ((306 * r as u32 + 601 * g as u32 + 117 * b as u32 + 0x200) >> 10) as u8
            };
            luma.push(value);
        }
        luma
    }
}

/// 实时相机帧：已是 RGBA 像素，无方向元数据。
#[derive(Debug, Clone)]
pub struct RgbaFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl RgbaFrame {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self { width, height, data }
    }

    /// 将帧直接作为画布，不做任何预处理。
    pub fn into_canvas(self) -> Result<Canvas, ImageError> {
        Canvas::from_rgba(self.width, self.height, self.data)
    }
}

impl DecodableImage for RgbaFrame {
    fn load_dimensions(&self) -> Result<(u32, u32), ImageError> {
        Ok((self.width, self.height))
    }

    fn render_into(&self, buffer: &mut [u8], width: u32, height: u32) -> Result<(), ImageError> {
        let src = RgbaImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or_else(|| ImageError::Decode("相机帧字节长度与尺寸不一致".to_string()))?;

        if (width, height) == (self.width, self.height) {
            return copy_into(buffer, src.as_raw());
        }

        let resized = super::pipeline::resize_rgba(src, width, height, image::imageops::FilterType::Triangle)?;
        copy_into(buffer, resized.as_raw())
    }
}

pub(crate) fn copy_into(buffer: &mut [u8], pixels: &[u8]) -> Result<(), ImageError> {
    if buffer.len() != pixels.len() {
        return Err(ImageError::Canvas(format!(
            "目标缓冲长度不匹配：期望 {} 实际 {}",
            pixels.len(),
            buffer.len()
        )));
    }
    buffer.copy_from_slice(pixels);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canvas_rejects_zero_dimensions() {
        assert!(matches!(Canvas::try_new(0, 10), Err(ImageError::Canvas(_))));
        assert!(matches!(Canvas::try_new(10, 0), Err(ImageError::Canvas(_))));
    }

    #[test]
    fn canvas_from_rgba_checks_length() {
        assert!(Canvas::from_rgba(2, 2, vec![0; 16]).is_ok());
        assert!(matches!(Canvas::from_rgba(2, 2, vec![0; 15]), Err(ImageError::Canvas(_))));
    }

    #[test]
    fn luma_treats_transparent_pixels_as_white() {
        let canvas = Canvas::from_rgba(2, 1, vec![0, 0, 0, 0, 0, 0, 0, 255]).unwrap();
        assert_eq!(canvas.to_luma(), vec![255, 0]);
    }

    #[test]
    fn luma_uses_bt601_weights() {
        let canvas = Canvas::from_rgba(1, 1, vec![255, 0, 0, 255]).unwrap();
        assert_eq!(canvas.to_luma(), vec![76]);
    }

    #[test]
    fn frame_renders_at_native_size_without_copy_loss() {
        let data: Vec<u8> = (0..16u8).collect();
        let frame = RgbaFrame::new(2, 2, data.clone());
        let mut buf = vec![0u8; 16];
        frame.render_into(&mut buf, 2, 2).unwrap();
        assert_eq!(buf, data);
    }
}
