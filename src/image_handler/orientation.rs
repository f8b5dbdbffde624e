//! # EXIF 方向校正
//!
//! 手机相机通常只写入方向标记（Tag 0x0112）而不旋转像素，
//! 不处理会导致条码横置或倒置。
//!
//! 读取失败、标记缺失或取值非法一律视为 1（正常方向），绝不让整次处理失败。
//!
//! 方向取值：
//! 1 = 正常，2 = 水平镜像，3 = 180°，4 = 垂直镜像，
//! 5 = 镜像 + 90° 顺时针，6 = 90° 顺时针，7 = 镜像 + 270° 顺时针，8 = 270° 顺时针

use image::DynamicImage;
use std::io::Cursor;

/// 从原始字节读取 EXIF 方向。
pub fn read_exif_orientation(bytes: &[u8]) -> u32 {
    let mut cursor = Cursor::new(bytes);
    let exif = match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(exif) => exif,
        Err(err) => {
            log::debug!("📷 未读取到 EXIF（按正常方向处理）：{}", err);
            return 1;
        }
    };

    match exif
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
    {
        Some(value @ 1..=8) => value,
        Some(other) => {
            log::warn!("⚠️ EXIF 方向取值非法：{}，忽略", other);
            1
        }
        None => 1,
    }
}

/// 方向是否会交换宽高。
pub fn swaps_dimensions(orientation: u32) -> bool {
    matches!(orientation, 5..=8)
}

/// 将 EXIF 方向应用到图片，使像素左上角与人眼所见一致。
pub fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}
