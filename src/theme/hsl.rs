//! # HSL 颜色运算
//!
//! 色相以度（0~360）表示，饱和度与亮度以百分比（0~100）表示。
//! 全部函数都是纯函数：相同输入永远得到相同的十六进制输出。

use serde::{Deserialize, Serialize};

/// 亮度高于该值视为近白。
pub const MAX_LIGHTNESS: f64 = 90.0;
/// 亮度低于该值视为近黑。
pub const MIN_LIGHTNESS: f64 = 10.0;
/// 饱和度低于该值视为灰色。
pub const MIN_SATURATION: f64 = 15.0;

const LIGHT_MODE_SATURATION_CAP: f64 = 60.0;
const LIGHT_MODE_LIGHTNESS: f64 = 88.0;
const DARK_MODE_SATURATION_CAP: f64 = 50.0;
const DARK_MODE_LIGHTNESS: f64 = 22.0;

/// 调色板中的一个颜色。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColorSample {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl ColorSample {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_hsl(self) -> Hsl {
        rgb_to_hsl(self.r, self.g, self.b)
    }

    pub fn to_hex(self) -> String {
        rgb_to_hex(self.r, self.g, self.b)
    }

    /// 解析 `#rrggbb`（大小写均可）。
    pub fn from_hex(raw: &str) -> Option<Self> {
        let hex = raw.trim().strip_prefix('#')?;
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }

        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Self { r, g, b })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    pub h: f64,
    pub s: f64,
    pub l: f64,
}

pub fn rgb_to_hsl(r: u8, g: u8, b: u8) -> Hsl {
    let r = r as f64 / 255.0;
    let g = g as f64 / 255.0;
    let b = b as f64 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    let (mut h, mut s) = (0.0, 0.0);

    if max != min {
        let d = max - min;
        s = if l > 0.5 { d / (2.0 - max - min) } else { d / (max + min) };

        h = if max == r {
            ((g - b) / d + if g < b { 6.0 } else { 0.0 }) / 6.0
        } else if max == g {
            ((b - r) / d + 2.0) / 6.0
        } else {
            ((r - g) / d + 4.0) / 6.0
        };
    }

    Hsl {
        h: h * 360.0,
        s: s * 100.0,
        l: l * 100.0,
    }
}

pub fn hsl_to_rgb(hsl: Hsl) -> ColorSample {
    let h = hsl.h / 360.0;
    let s = hsl.s / 100.0;
    let l = hsl.l / 100.0;

    let (r, g, b) = if s == 0.0 {
        (l, l, l)
    } else {
        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;
        (
            hue_to_channel(p, q, h + 1.0 / 3.0),
            hue_to_channel(p, q, h),
            hue_to_channel(p, q, h - 1.0 / 3.0),
        )
    };

    ColorSample::new(to_byte(r), to_byte(g), to_byte(b))
}

fn hue_to_channel(p: f64, q: f64, mut t: f64) -> f64 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }

    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 1.0 / 2.0 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

fn to_byte(channel: f64) -> u8 {
    (channel * 255.0).round().clamp(0.0, 255.0) as u8
}

pub fn rgb_to_hex(r: u8, g: u8, b: u8) -> String {
    format!("#{r:02x}{g:02x}{b:02x}")
}

/// 近白、近黑或过灰的颜色不适合作为品牌色。
pub fn should_filter_color(color: ColorSample) -> bool {
    let hsl = color.to_hsl();
    hsl.l > MAX_LIGHTNESS || hsl.l < MIN_LIGHTNESS || hsl.s < MIN_SATURATION
}

pub fn color_saturation(color: ColorSample) -> f64 {
    color.to_hsl().s
}

/// 浅色模式背景：保持色相，饱和度封顶 60%，亮度固定 88%。
pub fn generate_light_mode_color(color: ColorSample) -> String {
    let hsl = color.to_hsl();
    hsl_to_rgb(Hsl {
        h: hsl.h,
        s: hsl.s.min(LIGHT_MODE_SATURATION_CAP),
        l: LIGHT_MODE_LIGHTNESS,
    })
    .to_hex()
}

/// 深色模式背景：保持色相，饱和度封顶 50%，亮度固定 22%。
pub fn generate_dark_mode_color(color: ColorSample) -> String {
    let hsl = color.to_hsl();
    hsl_to_rgb(Hsl {
        h: hsl.h,
        s: hsl.s.min(DARK_MODE_SATURATION_CAP),
        l: DARK_MODE_LIGHTNESS,
    })
    .to_hex()
}
