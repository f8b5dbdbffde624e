//! # 旋转变体生成
//!
//! 直接识别失败时的次级策略：生成 0°/90°/180°/270° 四个变体。
//! 0° 直接借用输入画布，不做拷贝；90°/270° 交换宽高，绕几何中心旋转、不裁剪。

use std::borrow::Cow;

use image::imageops;

use super::Canvas;

/// 顺时针旋转角度。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum Rotation {
    #[serde(rename = "0")]
    Deg0,
    #[serde(rename = "90")]
    Deg90,
    #[serde(rename = "180")]
    Deg180,
    #[serde(rename = "270")]
    Deg270,
}

impl Rotation {
    /// 识别时的尝试顺序。
    pub const ALL: [Rotation; 4] = [Self::Deg0, Self::Deg90, Self::Deg180, Self::Deg270];

    pub fn degrees(self) -> u32 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    pub fn swaps_dimensions(self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }
}

/// 单个旋转变体。
#[derive(Debug, Clone)]
pub struct RotatedVariant<'a> {
    pub rotation: Rotation,
    pub canvas: Cow<'a, Canvas>,
}

/// 按角度旋转画布，返回新的画布。
pub fn rotate(canvas: &Canvas, rotation: Rotation) -> Canvas {
    let src = canvas.as_image();
    match rotation {
        Rotation::Deg0 => canvas.clone(),
        Rotation::Deg90 => Canvas::from_image(imageops::rotate90(src)),
        Rotation::Deg180 => Canvas::from_image(imageops::rotate180(src)),
        Rotation::Deg270 => Canvas::from_image(imageops::rotate270(src)),
    }
}

/// 生成四个旋转变体，顺序固定为 0/90/180/270。
pub fn rotation_variants(canvas: &Canvas) -> Vec<RotatedVariant<'_>> {
    Rotation::ALL
        .iter()
        .map(|&rotation| RotatedVariant {
            rotation,
            canvas: match rotation {
                Rotation::Deg0 => Cow::Borrowed(canvas),
                other => Cow::Owned(rotate(canvas, other)),
            },
        })
        .collect()
}
