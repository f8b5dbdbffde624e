//! # 历史数据配色补全
//!
//! 为缺少配色的品牌 Logo 记录取色，并把结果同步到使用同一 Logo 且尚无配色的卡片。
//! 单个 Logo 失败只计入 `skipped`，不会中断整批处理。

use serde::{Deserialize, Serialize};

use super::ThemeColorPair;
use crate::card::Card;
use crate::image_handler::ImageHandler;

/// 品牌 Logo 缓存记录。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandLogoRecord {
    pub id: String,
    pub logo_url: String,
    #[serde(default)]
    pub theme: Option<ThemeColorPair>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LogoSummary {
    pub total: usize,
    pub updated: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CountSummary {
    /// 补全结束后仍缺少配色、但带有 Logo 的卡片数。
    pub total: usize,
    pub updated: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillReport {
    pub brand_logos: LogoSummary,
    pub cards: CountSummary,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoStats {
    pub total: usize,
    pub without_colors: usize,
    pub with_colors: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardStats {
    pub total_with_logo: usize,
    pub without_colors: usize,
    pub with_colors: usize,
}

/// 补全前的概况统计。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillStats {
    pub brand_logos: LogoStats,
    pub cards: CardStats,
}

impl BackfillStats {
    pub fn collect(logos: &[BrandLogoRecord], cards: &[Card]) -> Self {
        let logos_without = logos.iter().filter(|logo| logo.theme.is_none()).count();
        let with_logo: Vec<&Card> = cards.iter().filter(|card| card.logo.is_some()).collect();
        let cards_without = with_logo.iter().filter(|card| card.theme.is_none()).count();

        Self {
            brand_logos: LogoStats {
                total: logos.len(),
                without_colors: logos_without,
                with_colors: logos.len() - logos_without,
            },
            cards: CardStats {
                total_with_logo: with_logo.len(),
                without_colors: cards_without,
                with_colors: with_logo.len() - cards_without,
            },
        }
    }
}

/// 补全缺失配色。
pub async fn backfill(handler: &ImageHandler, logos: &mut [BrandLogoRecord], cards: &mut [Card]) -> BackfillReport {
    let mut report = BackfillReport::default();

    for logo in logos.iter_mut().filter(|logo| logo.theme.is_none()) {
        report.brand_logos.total += 1;

        let pair = match handler.theme_for_logo_url(&logo.logo_url).await {
            Ok(Some(pair)) => pair,
            Ok(None) => {
                log::debug!("🎨 Logo {} 没有可用颜色，跳过", logo.id);
                report.brand_logos.skipped += 1;
                continue;
            }
            Err(err) => {
                log::warn!("⚠️ Logo {} 取色失败（{}）：{}", logo.id, err.code(), err);
                report.brand_logos.skipped += 1;
                continue;
            }
        };

        for card in cards
            .iter_mut()
            .filter(|card| card.theme.is_none() && card.logo.as_deref() == Some(logo.logo_url.as_str()))
        {
            card.theme = Some(pair.clone());
            report.cards.updated += 1;
        }

        logo.theme = Some(pair);
        report.brand_logos.updated += 1;
    }

    report.cards.total = cards
        .iter()
        .filter(|card| card.logo.is_some() && card.theme.is_none())
        .count();

    log::info!(
        "✅ 配色补全完成 - logos: {}/{} 更新（跳过 {}），cards: 更新 {}，仍缺 {}",
        report.brand_logos.updated,
        report.brand_logos.total,
        report.brand_logos.skipped,
        report.cards.updated,
        report.cards.total
    );

    report
}
