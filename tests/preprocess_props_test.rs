// Property tests for the preprocessing size envelope and contrast stretch
use proptest::prelude::*;
use wallet_scan::image_handler::{contrast_stretch, luminance_range, target_dimensions, Canvas};

const MIN_DIM: u32 = 800;
const MAX_DIM: u32 = 1280;

proptest! {
    #[test]
    fn longest_side_lands_in_envelope(width in 1u32..6000, height in 1u32..6000) {
        let (w, h) = target_dimensions(width, height, MIN_DIM, MAX_DIM);
        let longest = width.max(height);

        prop_assert_eq!(w.max(h), longest.clamp(MIN_DIM, MAX_DIM));
        prop_assert!(w >= 1 && h >= 1);
    }

    #[test]
    fn orientation_and_aspect_are_kept(width in 1u32..6000, height in 1u32..6000) {
        let (w, h) = target_dimensions(width, height, MIN_DIM, MAX_DIM);

        if width >= height {
            prop_assert!(w >= h);
        }
        if height >= width {
            prop_assert!(h >= w);
        }

        // 短边只因四舍五入（及最小为 1）偏离精确比例
        let scale = w.max(h) as f64 / width.max(height) as f64;
        let exact_short = width.min(height) as f64 * scale;
        prop_assert!((w.min(h) as f64 - exact_short.max(1.0)).abs() <= 1.0);
    }

    #[test]
    fn in_envelope_images_are_untouched(width in MIN_DIM..=MAX_DIM, height in 1u32..=MAX_DIM) {
        let longest = width.max(height);
        prop_assume!(longest >= MIN_DIM);
        prop_assert_eq!(target_dimensions(width, height, MIN_DIM, MAX_DIM), (width, height));
    }

    #[test]
    fn stretch_never_touches_alpha(pixels in proptest::collection::vec(any::<u8>(), 4 * 64)) {
        let mut canvas = Canvas::from_rgba(8, 8, pixels.clone()).unwrap();
        contrast_stretch(&mut canvas, 30.0);

        let before: Vec<u8> = pixels.chunks_exact(4).map(|px| px[3]).collect();
        let after: Vec<u8> = canvas.pixels().chunks_exact(4).map(|px| px[3]).collect();
        prop_assert_eq!(before, after);
    }

    #[test]
    fn low_range_canvas_is_left_alone(base in 0u8..=200, spread in 0u8..=25) {
        let mut pixels = Vec::with_capacity(4 * 16);
        for i in 0..16u8 {
            let v = base + (i % 2) * spread;
            pixels.extend_from_slice(&[v, v, v, 255]);
        }
        let mut canvas = Canvas::from_rgba(4, 4, pixels.clone()).unwrap();

        let (min, max) = luminance_range(canvas.pixels());
        prop_assert!(max - min <= 30.0);
        prop_assert!(!contrast_stretch(&mut canvas, 30.0));
        prop_assert_eq!(canvas.pixels(), &pixels[..]);
    }
}
