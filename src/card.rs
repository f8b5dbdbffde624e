//! # 卡片记录与展示
//!
//! ## 设计思路
//!
//! 持久层历史上用两列独立可空字段（`colorLight` / `colorDark`）保存配色，
//! 允许“只有一列有值”这种无意义状态。这里将二者收敛为单一 `Option<ThemeColorPair>`：
//! - 读：`CardRecord` → `Card`，半边配色按无配色处理
//! - 写：`Card` → `CardRecord`，两列要么同时有值，要么同时为空
//!
//! 没有配色的卡片使用按商户名长度确定的渐变色 + 首字母徽标。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::barcode::BarcodeSymbology;
use crate::theme::ThemeColorPair;

/// 无配色时的渐变（Tailwind 色名：起始色，结束色）。
pub const FALLBACK_GRADIENTS: [(&str, &str); 6] = [
    ("blue-500", "cyan-400"),
    ("purple-500", "pink-400"),
    ("emerald-500", "teal-400"),
    ("orange-500", "amber-400"),
    ("rose-500", "red-400"),
    ("indigo-500", "violet-400"),
];

/// 持久层的扁平记录。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardRecord {
    pub id: String,
    pub retailer: String,
    pub barcode_value: String,
    pub barcode_format: String,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub color_light: Option<String>,
    #[serde(default)]
    pub color_dark: Option<String>,
    #[serde(default)]
    pub last_used: Option<DateTime<Utc>>,
}

/// 一张会员卡。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    pub retailer: String,
    pub barcode_value: String,
    pub barcode_format: BarcodeSymbology,
    pub note: Option<String>,
    pub image: Option<String>,
    pub logo: Option<String>,
    pub theme: Option<ThemeColorPair>,
    pub last_used: Option<DateTime<Utc>>,
}

impl From<CardRecord> for Card {
    fn from(record: CardRecord) -> Self {
        let barcode_format = record.barcode_format.parse().unwrap_or_else(|err| {
            log::warn!("⚠️ 卡片 {} {}，按 code128 处理", record.id, err);
            BarcodeSymbology::Code128
        });
        let theme = ThemeColorPair::from_columns(record.color_light.as_deref(), record.color_dark.as_deref());

        Self {
            id: record.id,
            retailer: record.retailer,
            barcode_value: record.barcode_value,
            barcode_format,
            note: record.note,
            image: record.image,
            logo: record.logo,
            theme,
            last_used: record.last_used,
        }
    }
}

impl From<Card> for CardRecord {
    fn from(card: Card) -> Self {
        let (color_light, color_dark) = match card.theme {
            Some(pair) => {
                let (light, dark) = pair.into_columns();
                (Some(light), Some(dark))
            }
            None => (None, None),
        };

        Self {
            id: card.id,
            retailer: card.retailer,
            barcode_value: card.barcode_value,
            barcode_format: card.barcode_format.to_string(),
            note: card.note,
            image: card.image,
            logo: card.logo,
            color_light,
            color_dark,
            last_used: card.last_used,
        }
    }
}

/// 卡片背景。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CardBackground {
    Solid { color: String },
    Gradient { from: &'static str, to: &'static str },
}

/// 文字色调：浅色背景用深色文字，其余用白色文字。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextTone {
    Dark,
    Light,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardAppearance {
    pub background: CardBackground,
    pub text: TextTone,
    /// 没有 Logo 时显示的首字母。
    pub initial: Option<char>,
}

impl Card {
    /// 解析卡片在指定显示模式下的外观。
    pub fn appearance(&self, dark_mode: bool) -> CardAppearance {
        let (background, text) = match &self.theme {
            Some(pair) => {
                let tone = if dark_mode { TextTone::Light } else { TextTone::Dark };
                (
                    CardBackground::Solid {
                        color: pair.background(dark_mode).to_string(),
                    },
                    tone,
                )
            }
            None => {
                let (from, to) = fallback_gradient(&self.retailer);
                (CardBackground::Gradient { from, to }, TextTone::Light)
            }
        };

        let initial = match self.logo {
            Some(_) => None,
            None => self.retailer.chars().next().and_then(|c| c.to_uppercase().next()),
        };

        CardAppearance {
            background,
            text,
            initial,
        }
    }
}

/// 商户名长度决定渐变，保证同一商户每次展示一致。
///
/// 长度按 UTF-16 码元计，与网页端保存的卡片展示一致。
pub fn fallback_gradient(retailer: &str) -> (&'static str, &'static str) {
    FALLBACK_GRADIENTS[retailer.encode_utf16().count() % FALLBACK_GRADIENTS.len()]
}

/// 最近使用时间的相对描述。
pub fn format_relative_time(last_used: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(date) = last_used else {
        return "Never used".to_string();
    };

    let diff_ms = (now - date).num_milliseconds();
    let minutes = diff_ms.div_euclid(60_000);
    let hours = diff_ms.div_euclid(3_600_000);
    let days = diff_ms.div_euclid(86_400_000);

    if minutes < 1 {
        "Just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if hours < 24 {
        format!("{}h ago", hours)
    } else if days == 1 {
        "Yesterday".to_string()
    } else if days < 7 {
        format!("{}d ago", days)
    } else if days < 30 {
        format!("{}w ago", days / 7)
    } else {
        date.format("%Y-%m-%d").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn record() -> CardRecord {
        CardRecord {
            id: "card-1".to_string(),
            retailer: "target".to_string(),
            barcode_value: "4006381333931".to_string(),
            barcode_format: "ean13".to_string(),
            note: None,
            image: None,
            logo: None,
            color_light: None,
            color_dark: None,
            last_used: None,
        }
    }

    #[test]
    fn partial_colors_are_read_as_no_theme() {
        let mut partial = record();
        partial.color_light = Some("#d6e0f5".to_string());

        let card = Card::from(partial);
        assert!(card.theme.is_none());

        // 回写时两列同时为空
        let written = CardRecord::from(card);
        assert_eq!((written.color_light, written.color_dark), (None, None));
    }

    #[test]
    fn complete_colors_round_trip() {
        let mut full = record();
        full.color_light = Some("#d6e0f5".to_string());
        full.color_dark = Some("#1c2a4a".to_string());

        let card = Card::from(full.clone());
        assert!(card.theme.is_some());
        assert_eq!(card.barcode_format, BarcodeSymbology::Ean13);
        assert_eq!(CardRecord::from(card), full);
    }

    #[test]
    fn unknown_stored_format_reads_as_code128() {
        let mut odd = record();
        odd.barcode_format = "itf".to_string();
        assert_eq!(Card::from(odd).barcode_format, BarcodeSymbology::Code128);
    }

    #[test]
    fn themed_card_uses_mode_specific_background() {
        let mut full = record();
        full.color_light = Some("#d6e0f5".to_string());
        full.color_dark = Some("#1c2a4a".to_string());
        let card = Card::from(full);

        let light = card.appearance(false);
        assert_eq!(light.background, CardBackground::Solid { color: "#d6e0f5".to_string() });
        assert_eq!(light.text, TextTone::Dark);

        let dark = card.appearance(true);
        assert_eq!(dark.background, CardBackground::Solid { color: "#1c2a4a".to_string() });
        assert_eq!(dark.text, TextTone::Light);
    }

    #[test]
    fn unthemed_card_uses_gradient_and_initial() {
        let card = Card::from(record());
        let appearance = card.appearance(false);

        // "target" 长度为 6，6 % 6 = 0
        assert_eq!(
            appearance.background,
            CardBackground::Gradient { from: "blue-500", to: "cyan-400" }
        );
        assert_eq!(appearance.text, TextTone::Light);
        assert_eq!(appearance.initial, Some('T'));
    }

    #[test]
    fn logo_hides_initial() {
        let mut with_logo = record();
        with_logo.logo = Some("https://img.logo.dev/target.com".to_string());
        assert_eq!(Card::from(with_logo).appearance(false).initial, None);
    }

    #[test]
    fn gradient_depends_only_on_name_length() {
        assert_eq!(fallback_gradient("Costco"), fallback_gradient("Kroger"));
        assert_eq!(fallback_gradient("REI"), ("orange-500", "amber-400"));
        assert_eq!(fallback_gradient(""), ("blue-500", "cyan-400"));
        // 非 BMP 字符占两个 UTF-16 码元："🛒Mart" 长度为 6
        assert_eq!(fallback_gradient("🛒Mart"), ("blue-500", "cyan-400"));
        assert_eq!(fallback_gradient("éMart"), ("indigo-500", "violet-400"));
    }

    #[test]
    fn relative_time_buckets() {
        let now = Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap();
        let ago = |d: Duration| Some(now - d);

        assert_eq!(format_relative_time(None, now), "Never used");
        assert_eq!(format_relative_time(ago(Duration::seconds(30)), now), "Just now");
        assert_eq!(format_relative_time(ago(Duration::seconds(-90)), now), "Just now");
        assert_eq!(format_relative_time(ago(Duration::minutes(5)), now), "5m ago");
        assert_eq!(format_relative_time(ago(Duration::hours(3)), now), "3h ago");
        assert_eq!(format_relative_time(ago(Duration::hours(30)), now), "Yesterday");
        assert_eq!(format_relative_time(ago(Duration::days(4)), now), "4d ago");
        assert_eq!(format_relative_time(ago(Duration::days(15)), now), "2w ago");
        assert_eq!(format_relative_time(ago(Duration::days(45)), now), "2026-01-29");
    }

    #[test]
    fn record_deserializes_from_camel_case_json() {
        let json = r##"{
            "id": "c1",
            "retailer": "Costco",
            "barcodeValue": "123",
            "barcodeFormat": "qrcode",
            "colorLight": "#d6e0f5",
            "colorDark": "#1c2a4a",
            "lastUsed": "2026-03-01T08:00:00Z"
        }"##;
        let card = Card::from(serde_json::from_str::<CardRecord>(json).unwrap());
        assert_eq!(card.barcode_format, BarcodeSymbology::Qrcode);
        assert!(card.theme.is_some());
        assert!(card.last_used.is_some());
    }
}
