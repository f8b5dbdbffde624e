// End-to-end tests for brand color extraction and card theming
use std::io::Cursor;

use image::{ImageFormat, Rgba, RgbaImage};
use wallet_scan::card::{Card, CardBackground, CardRecord, TextTone};
use wallet_scan::image_handler::{ImageConfig, ImageHandler, ImageSource};
use wallet_scan::theme::{BackfillStats, ColorSample, ThemeColorPair};

fn logo_png(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba([color[0], color[1], color[2], 255]));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

fn assert_close(actual: f64, expected: f64, tolerance: f64, what: &str) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "{}: expected {} ± {}, got {}",
        what,
        expected,
        tolerance,
        actual
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_blue_logo_yields_pastel_and_deep_variants() {
        let handler = ImageHandler::new(ImageConfig::default()).unwrap();

        let pair = handler
            .extract_theme(ImageSource::Bytes(logo_png(400, 300, [30, 60, 200])))
            .await
            .unwrap()
            .expect("saturated logo should produce a theme");

        let light = ColorSample::from_hex(pair.light()).unwrap().to_hsl();
        let dark = ColorSample::from_hex(pair.dark()).unwrap().to_hsl();

        assert_close(light.h, 229.0, 4.0, "light hue");
        assert_close(light.l, 88.0, 1.5, "light lightness");
        assert_close(light.s, 60.0, 4.0, "light saturation");

        assert_close(dark.h, 229.0, 4.0, "dark hue");
        assert_close(dark.l, 22.0, 1.5, "dark lightness");
        assert_close(dark.s, 50.0, 5.0, "dark saturation");
    }

    #[tokio::test]
    async fn test_gray_logo_has_no_theme() {
        let handler = ImageHandler::new(ImageConfig::default()).unwrap();

        let pair = handler
            .extract_theme(ImageSource::Bytes(logo_png(256, 256, [128, 128, 128])))
            .await
            .unwrap();

        assert_eq!(pair, None);
    }

    #[tokio::test]
    async fn test_extraction_is_deterministic() {
        let handler = ImageHandler::new(ImageConfig::default()).unwrap();
        let bytes = logo_png(320, 320, [0, 150, 80]);

        let first = handler.extract_theme(ImageSource::Bytes(bytes.clone())).await.unwrap();
        let second = handler.extract_theme(ImageSource::Bytes(bytes)).await.unwrap();

        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_corrupt_logo_is_an_error_not_a_missing_theme() {
        let handler = ImageHandler::new(ImageConfig::default()).unwrap();

        let result = handler
            .extract_theme(ImageSource::Bytes(b"definitely not an image".to_vec()))
            .await;

        assert!(result.is_err());
    }

    #[test]
    fn test_half_stored_theme_falls_back_to_gradient() {
        let record: CardRecord = serde_json::from_str(
            r##"{
                "id": "c1",
                "retailer": "Target",
                "barcodeValue": "4011200296908",
                "barcodeFormat": "ean13",
                "logo": "https://img.logo.dev/target.com",
                "colorLight": "#fbd5d5"
            }"##,
        )
        .unwrap();

        let card = Card::from(record);
        assert_eq!(card.theme, None);

        let look = card.appearance(false);
        assert!(matches!(look.background, CardBackground::Gradient { .. }));
        assert_eq!(look.text, TextTone::Light);
        // 有 Logo 时不显示首字母
        assert_eq!(look.initial, None);

        // 写回时两列同时为空
        let stored = CardRecord::from(card);
        assert_eq!((stored.color_light, stored.color_dark), (None, None));
    }

    #[test]
    fn test_themed_card_switches_background_with_display_mode() {
        let pair = ThemeColorPair::from_color(ColorSample::new(30, 60, 200));
        let record = CardRecord {
            id: "c2".to_string(),
            retailer: "Blue Mart".to_string(),
            barcode_value: "12345".to_string(),
            barcode_format: "maxicode".to_string(),
            note: None,
            image: None,
            logo: None,
            color_light: Some(pair.light().to_string()),
            color_dark: Some(pair.dark().to_string()),
            last_used: None,
        };

        let card = Card::from(record);
        assert_eq!(card.theme.as_ref(), Some(&pair));
        assert_eq!(card.barcode_format.as_str(), "code128");

        let light = card.appearance(false);
        let dark = card.appearance(true);
        assert_eq!(light.background, CardBackground::Solid { color: pair.light().to_string() });
        assert_eq!(light.text, TextTone::Dark);
        assert_eq!(dark.background, CardBackground::Solid { color: pair.dark().to_string() });
        assert_eq!(dark.text, TextTone::Light);
        assert_eq!(light.initial, Some('B'));

        let stats = BackfillStats::collect(&[], &[card]);
        assert_eq!(stats.cards.total_with_logo, 0);
    }
}
