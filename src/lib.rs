//! # 会员卡钱包 — 条码采集与品牌配色库
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │           调用方（CLI / 表单上传 / 相机会话）             │
//! └───────┬───────────────────────────────┬──────────────────┘
//!         ↓ ImageSource                   ↓ RgbaFrame (mpsc)
//! ┌───────┼───────────────────────────────┼──────────────────┐
//! │       ↓                               ↓                  │
//! │  image_handler::ImageHandler     barcode::LiveScanner    │
//! │   ├─ loader      URL/Base64/文件/字节 + 安全校验           │
//! │   ├─ pipeline    EXIF 方向 · 800~1280 包络 · 对比度拉伸    │
//! │   ├─ rotation    0/90/180/270 变体                        │
//! │   ├─ barcode::BarcodeReader   有序策略 → DecodeOutcome    │
//! │   └─ theme::extract_theme     调色板 → ThemeColorPair     │
//! │                                                          │
//! │  card      卡片记录 · 配色成对约束 · 渐变兜底              │
//! │  settings  JSON 覆盖 ImageConfig                          │
//! │  error     AppError (统一错误类型)                         │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError` |
//! | [`image_handler`] | 加载校验、预处理、旋转变体与整体编排 |
//! | [`barcode`] | 条码类型词表、识别原语、策略编排、实时相机识别 |
//! | [`theme`] | HSL 运算、调色板、品牌色挑选、配色缓存与历史补全 |
//! | [`card`] | 卡片记录、配色两列 ↔ 单一配对的转换、外观与相对时间 |
//! | [`settings`] | 设置文件读写与配置覆盖 |

pub mod error;
pub mod barcode;
pub mod card;
pub mod image_handler;
pub mod settings;
pub mod theme;
