//! # 图片处理模块（image_handler）
//!
//! ## 设计思路
//!
//! 将“图片来源识别 → 加载校验 → 方向校正 → 尺寸包络 → 对比度增强 → 旋转变体”
//! 按职责拆分为多个子模块，条码识别与品牌取色都建立在这条流水线之上。
//!
//! - `handler`：编排整条处理流水线（识别 / 取色 / 品牌缓存）
//! - `loader`：负责 URL/Base64/文件/字节加载与安全校验
//! - `orientation`：EXIF 方向读取与像素校正
//! - `pipeline`：解码、像素限制、尺寸包络、对比度拉伸
//! - `rotation`：0°/90°/180°/270° 旋转变体
//! - `config/error/source`：配置、错误、中间数据模型
//!
//! ## 新同事快速上手
//!
//! ```text
//! CLI / 上层调用
//!    ↓
//! handler.rs（统一编排 + 阶段耗时日志）
//!    ├─ loader.rs（来源加载 + URL/体积安全校验）
//!    ├─ pipeline.rs（方向 + 尺寸 + 对比度）
//!    ├─ rotation.rs（旋转兜底）
//!    ├─ barcode::BarcodeReader（按策略顺序识别）
//!    └─ theme::extract_theme（调色板 → 品牌色）
//!    ↓
//! 返回 ImageError / DecodeOutcome / ThemeColorPair
//! ```

mod config;
mod error;
mod handler;
mod loader;
pub mod orientation;
mod pipeline;
mod rotation;
mod source;

pub use config::ImageConfig;
pub use error::ImageError;
pub use handler::ImageHandler;
pub use pipeline::{
    contrast_stretch,
    luminance,
    luminance_range,
    preprocess,
    render_logo,
    render_oriented,
    render_unprocessed,
    target_dimensions,
    EncodedImage,
};
pub use rotation::{rotate, rotation_variants, RotatedVariant, Rotation};
pub use source::{Canvas, DecodableImage, ImageSource, RawImageData, RgbaFrame};
