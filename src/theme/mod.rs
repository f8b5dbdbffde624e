//! # 品牌取色模块（theme）
//!
//! ## 设计思路
//!
//! 从 Logo 图片中挑出“最像品牌色”的颜色，并合成浅色 / 深色两套卡片背景：
//! 1. 提取最多 N 色调色板；调色板失败时退回单一主色
//! 2. 过滤近白（L > 90）、近黑（L < 10）、过灰（S < 15）的颜色
//! 3. 在幸存颜色中取饱和度最高者；若全部被过滤，退回原调色板中饱和度最高者，
//!    其饱和度仍低于 5 则视为没有可用颜色
//! 4. 同一色相合成浅色（S ≤ 60，L = 88）与深色（S ≤ 50，L = 22）
//!
//! “没有配色”不是错误，调用方使用确定性的渐变 + 首字母展示。
//!
//! 浅色与深色永远成对出现：`ThemeColorPair` 只能整体存在或整体缺失。

mod backfill;
mod cache;
mod hsl;
mod palette;

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::image_handler::Canvas;

pub use backfill::{
    backfill,
    BackfillReport,
    BackfillStats,
    BrandLogoRecord,
    CardStats,
    CountSummary,
    LogoStats,
    LogoSummary,
};
pub use cache::BrandThemeCache;
pub use hsl::{
    color_saturation,
    generate_dark_mode_color,
    generate_light_mode_color,
    hsl_to_rgb,
    rgb_to_hex,
    rgb_to_hsl,
    should_filter_color,
    ColorSample,
    Hsl,
};
pub use palette::{MedianCutPalette, PaletteError, PaletteExtractor};

/// 最饱和颜色仍低于该值时，认为 Logo 没有颜色信号。
pub const MIN_FALLBACK_SATURATION: f64 = 5.0;

static HEX_COLOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").unwrap());

/// 浅色 / 深色背景配对，两者来自同一色相。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawThemeColorPair")]
pub struct ThemeColorPair {
    light: String,
    dark: String,
}

#[derive(Deserialize)]
struct RawThemeColorPair {
    light: String,
    dark: String,
}

impl TryFrom<RawThemeColorPair> for ThemeColorPair {
    type Error = String;

    fn try_from(raw: RawThemeColorPair) -> Result<Self, Self::Error> {
        Self::parse(&raw.light, &raw.dark)
            .ok_or_else(|| format!("配色格式无效：light={} dark={}", raw.light, raw.dark))
    }
}

impl ThemeColorPair {
    /// 由品牌色合成配对。
    pub fn from_color(color: ColorSample) -> Self {
        Self {
            light: generate_light_mode_color(color),
            dark: generate_dark_mode_color(color),
        }
    }

    /// 由两个已存在的十六进制颜色构造，任一无效返回 None。
    pub fn parse(light: &str, dark: &str) -> Option<Self> {
        if !HEX_COLOR.is_match(light) || !HEX_COLOR.is_match(dark) {
            return None;
        }
        Some(Self {
            light: light.to_ascii_lowercase(),
            dark: dark.to_ascii_lowercase(),
        })
    }

    /// 从历史数据的两列独立可空字段读取。
    ///
    /// 只有一列有值或格式错误时按“无配色”处理并告警。
    pub fn from_columns(light: Option<&str>, dark: Option<&str>) -> Option<Self> {
        match (light, dark) {
            (None, None) => None,
            (Some(light), Some(dark)) => {
                let pair = Self::parse(light, dark);
                if pair.is_none() {
                    log::warn!("⚠️ 配色格式无效，忽略：light={} dark={}", light, dark);
                }
                pair
            }
            (light, dark) => {
                log::warn!("⚠️ 配色只有一列有值，按无配色处理：light={:?} dark={:?}", light, dark);
                None
            }
        }
    }

    pub fn light(&self) -> &str {
        &self.light
    }

    pub fn dark(&self) -> &str {
        &self.dark
    }

    /// 按显示模式取背景色。
    pub fn background(&self, dark_mode: bool) -> &str {
        if dark_mode { &self.dark } else { &self.light }
    }

    /// 拆回两列，供持久层写入。
    pub fn into_columns(self) -> (String, String) {
        (self.light, self.dark)
    }
}

impl fmt::Display for ThemeColorPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.light, self.dark)
    }
}

/// 从调色板中挑选品牌色。
pub fn select_brand_color(palette: &[ColorSample]) -> Option<ColorSample> {
    let survivors = palette.iter().copied().filter(|&color| !should_filter_color(color));
    if let Some((color, _)) = most_saturated(survivors) {
        return Some(color);
    }

    let (color, saturation) = most_saturated(palette.iter().copied())?;
    if saturation < MIN_FALLBACK_SATURATION {
        log::debug!("🎨 调色板全部为中性色（最高饱和度 {:.1}），不生成配色", saturation);
        return None;
    }
    Some(color)
}

/// 饱和度最高的颜色；并列时保留先出现者。
fn most_saturated(colors: impl Iterator<Item = ColorSample>) -> Option<(ColorSample, f64)> {
    colors.fold(None, |best, color| {
        let saturation = color_saturation(color);
        match best {
            Some((_, best_saturation)) if best_saturation >= saturation => best,
            _ => Some((color, saturation)),
        }
    })
}

/// 从 Logo 画布提取配色。
///
/// 调色板失败时退回单一主色；主色也失败则返回 None。
pub fn extract_theme(
    canvas: &Canvas,
    extractor: &dyn PaletteExtractor,
    max_colors: usize,
) -> Option<ThemeColorPair> {
    let palette = match extractor.palette(canvas, max_colors) {
        Ok(palette) => palette,
        Err(err) => {
            log::debug!("🎨 调色板提取失败，退回主色：{}", err);
            match extractor.dominant(canvas) {
                Ok(color) => vec![color],
                Err(err) => {
                    log::info!("🎨 主色提取失败，不生成配色：{}", err);
                    return None;
                }
            }
        }
    };

    if palette.is_empty() {
        return None;
    }

    select_brand_color(&palette).map(ThemeColorPair::from_color)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingPalette {
        dominant: Option<ColorSample>,
    }

    impl PaletteExtractor for FailingPalette {
        fn palette(&self, _canvas: &Canvas, _max_colors: usize) -> Result<Vec<ColorSample>, PaletteError> {
            Err(PaletteError::NoUsablePixels)
        }

        fn dominant(&self, _canvas: &Canvas) -> Result<ColorSample, PaletteError> {
            self.dominant.ok_or(PaletteError::NoUsablePixels)
        }
    }

    fn tiny_canvas() -> Canvas {
        Canvas::from_rgba(1, 1, vec![0, 0, 0, 0]).unwrap()
    }

    #[test]
    fn picks_most_saturated_survivor() {
        let palette = [
            ColorSample::new(255, 255, 255),
            ColorSample::new(200, 120, 120),
            ColorSample::new(220, 20, 60),
            ColorSample::new(20, 20, 20),
        ];
        assert_eq!(select_brand_color(&palette), Some(ColorSample::new(220, 20, 60)));
    }

    #[test]
    fn falls_back_to_unfiltered_palette_when_all_filtered() {
        // 两者都因亮度被过滤，但第二个仍带有明显色彩
        let palette = [ColorSample::new(250, 250, 250), ColorSample::new(255, 235, 235)];
        assert_eq!(select_brand_color(&palette), Some(ColorSample::new(255, 235, 235)));
    }

    #[test]
    fn neutral_palette_has_no_brand_color() {
        let palette = [
            ColorSample::new(255, 255, 255),
            ColorSample::new(128, 129, 128),
            ColorSample::new(0, 0, 0),
        ];
        assert_eq!(select_brand_color(&palette), None);
        assert_eq!(select_brand_color(&[]), None);
    }

    #[test]
    fn first_of_equally_saturated_colors_wins() {
        let palette = [ColorSample::new(255, 0, 0), ColorSample::new(0, 0, 255)];
        assert_eq!(select_brand_color(&palette), Some(ColorSample::new(255, 0, 0)));
    }

    #[test]
    fn palette_failure_uses_dominant_color() {
        let extractor = FailingPalette {
            dominant: Some(ColorSample::new(30, 60, 200)),
        };
        let pair = extract_theme(&tiny_canvas(), &extractor, 8).expect("dominant color should be used");
        assert_eq!(pair, ThemeColorPair::from_color(ColorSample::new(30, 60, 200)));
    }

    #[test]
    fn palette_and_dominant_failure_is_no_theme() {
        let extractor = FailingPalette { dominant: None };
        assert_eq!(extract_theme(&tiny_canvas(), &extractor, 8), None);
    }

    #[test]
    fn columns_must_be_both_present_and_valid() {
        assert_eq!(ThemeColorPair::from_columns(None, None), None);
        assert_eq!(ThemeColorPair::from_columns(Some("#d6e0f5"), None), None);
        assert_eq!(ThemeColorPair::from_columns(None, Some("#1c2a4a")), None);
        assert_eq!(ThemeColorPair::from_columns(Some("blue"), Some("#1c2a4a")), None);

        let pair = ThemeColorPair::from_columns(Some("#D6E0F5"), Some("#1c2a4a")).unwrap();
        assert_eq!(pair.light(), "#d6e0f5");
        assert_eq!(pair.background(true), "#1c2a4a");
        assert_eq!(pair.into_columns(), ("#d6e0f5".to_string(), "#1c2a4a".to_string()));
    }

    #[test]
    fn deserialization_enforces_hex_format() {
        let ok: ThemeColorPair = serde_json::from_str(r##"{"light":"#d6e0f5","dark":"#1c2a4a"}"##).unwrap();
        assert_eq!(ok.dark(), "#1c2a4a");

        assert!(serde_json::from_str::<ThemeColorPair>(r##"{"light":"#d6e0f5"}"##).is_err());
        assert!(serde_json::from_str::<ThemeColorPair>(r##"{"light":"#d6e0f5","dark":"nope"}"##).is_err());
    }
}
