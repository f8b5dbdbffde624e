//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义全局统一的 `AppError` 枚举，CLI 与上层调用方只需处理这一种错误。
//! 条码“未识别到”与“没有配色”都是正常结果，不会出现在这里。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `ImageError` / `std::io::Error` 提供 `From` 转换，无需手动 map。
//! - 实现 `Serialize` 将错误序列化为字符串，便于以 JSON 输出。

use serde::Serialize;

use crate::image_handler::ImageError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 图片处理流水线错误（加载 / 预处理 / 识别 / 取色）
    #[error("{0}")]
    Image(#[from] ImageError),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 设置文件不可用
    #[error("设置错误: {0}")]
    Settings(String),

    /// 输入或输出数据无法（反）序列化
    #[error("数据格式错误: {0}")]
    Serialization(String),

    /// 异步运行时不可用
    #[error("运行时错误: {0}")]
    Runtime(String),
}

impl AppError {
    /// 稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            Self::Image(err) => err.code(),
            Self::Io(_) => "io",
            Self::Settings(_) => "settings",
            Self::Serialization(_) => "serialization",
            Self::Runtime(_) => "runtime",
        }
    }

    /// 图片链路错误所在阶段（load / decode / render），其余错误为 `None`。
    pub fn stage(&self) -> Option<&'static str> {
        match self {
            Self::Image(err) => Some(err.stage()),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// 将错误序列化为人类可读的字符串。
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_errors_keep_their_code_and_message() {
        let err = AppError::from(ImageError::Canvas("无法分配画布".to_string()));
        assert_eq!(err.code(), "canvas");
        assert_eq!(err.stage(), Some("render"));
        assert_eq!(serde_json::to_string(&err).unwrap(), r#""画布错误：无法分配画布""#);
    }

    #[test]
    fn json_errors_become_serialization_errors() {
        let err: AppError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert_eq!(err.code(), "serialization");
        assert_eq!(err.stage(), None);
    }
}
