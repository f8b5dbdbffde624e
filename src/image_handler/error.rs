//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载“加载 → 预处理 → 识别 / 取色”链路中的所有硬失败。
//! 通过 `thiserror` 保持人类可读错误，同时让调用侧可按分支匹配。
//!
//! 注意：条码“未识别到”与取色“无可用颜色”都不是错误，
//! 它们分别由 `DecodeOutcome::NotFound` 与 `Option::None` 表达。

/// 图片链路统一错误类型。
///
/// 该类型会在 crate 层被上转为 `AppError`。
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("网络错误：{0}")]
    Network(String),

    #[error("解码错误：{0}")]
    Decode(String),

    #[error("格式错误：{0}")]
    InvalidFormat(String),

    #[error("画布错误：{0}")]
    Canvas(String),

    #[error("文件错误：{0}")]
    FileSystem(String),

    #[error("超时错误：{0}")]
    Timeout(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),
}

impl ImageError {
    /// 稳定错误码，供 CLI / 上层调用方按类别处理。
    pub fn code(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Decode(_) => "decode",
            Self::InvalidFormat(_) => "invalid_format",
            Self::Canvas(_) => "canvas",
            Self::FileSystem(_) => "file_system",
            Self::Timeout(_) => "timeout",
            Self::ResourceLimit(_) => "resource_limit",
        }
    }

    /// 错误发生的阶段。
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Network(_) | Self::Timeout(_) | Self::FileSystem(_) => "load",
            Self::InvalidFormat(_) | Self::Decode(_) | Self::ResourceLimit(_) => "decode",
            Self::Canvas(_) => "render",
        }
    }
}
