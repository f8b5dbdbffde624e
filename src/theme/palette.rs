//! # 调色板提取
//!
//! ## 设计思路
//!
//! 调色板原语被视为黑盒：给定画布返回最多 N 个代表色，或失败。
//! 默认实现 `MedianCutPalette` 为改良中位切分（MMCQ）：
//! 1. 每隔 `quality` 个像素取样，跳过半透明与近白像素
//! 2. 每通道保留高 5 位，建立 32×32×32 直方图
//! 3. 先按像素数切分到目标数量的 75%，再按“像素数 × 体积”切分剩余部分
//! 4. 每个颜色盒取加权平均色，按“像素数 × 体积”降序输出

use crate::image_handler::Canvas;

use super::ColorSample;

const SIGBITS: u32 = 5;
const RSHIFT: u32 = 8 - SIGBITS;
const HISTO_SIZE: usize = 1 << (3 * SIGBITS);
const AXIS_SIZE: usize = 1 << SIGBITS;
const MAX_ITERATIONS: usize = 1000;
const FRACT_BY_POPULATION: f64 = 0.75;
const MIN_ALPHA: u8 = 125;
const WHITE_CUTOFF: u8 = 250;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaletteError {
    #[error("图片为空")]
    EmptyImage,

    #[error("没有可取样的像素（全透明或全白）")]
    NoUsablePixels,

    #[error("调色板颜色数无效：{0}")]
    InvalidColorCount(usize),
}

/// 调色板提取能力。
pub trait PaletteExtractor {
    /// 返回最多 `max_colors` 个代表色。
    fn palette(&self, canvas: &Canvas, max_colors: usize) -> Result<Vec<ColorSample>, PaletteError>;

    /// 返回单一主色，调色板失败时使用。
    fn dominant(&self, canvas: &Canvas) -> Result<ColorSample, PaletteError>;
}

/// 中位切分调色板。
#[derive(Debug, Clone, Copy)]
pub struct MedianCutPalette {
    quality: usize,
}

impl MedianCutPalette {
    /// `quality` 为取样步长，1 表示全部像素参与统计。
    pub fn new(quality: usize) -> Self {
        Self { quality: quality.max(1) }
    }
}

impl Default for MedianCutPalette {
    fn default() -> Self {
        Self::new(10)
    }
}

impl PaletteExtractor for MedianCutPalette {
    fn palette(&self, canvas: &Canvas, max_colors: usize) -> Result<Vec<ColorSample>, PaletteError> {
        if !(2..=256).contains(&max_colors) {
            return Err(PaletteError::InvalidColorCount(max_colors));
        }
        if canvas.pixels().is_empty() {
            return Err(PaletteError::EmptyImage);
        }

        let histogram = build_histogram(canvas.pixels(), self.quality)?;
        Ok(quantize(&histogram, max_colors))
    }

    fn dominant(&self, canvas: &Canvas) -> Result<ColorSample, PaletteError> {
        if canvas.pixels().is_empty() {
            return Err(PaletteError::EmptyImage);
        }

        let (mut r, mut g, mut b, mut n) = (0u64, 0u64, 0u64, 0u64);
        for px in canvas.pixels().chunks_exact(4).filter(|px| px[3] >= MIN_ALPHA) {
            r += px[0] as u64;
            g += px[1] as u64;
            b += px[2] as u64;
            n += 1;
        }

        if n == 0 {
            return Err(PaletteError::NoUsablePixels);
        }
        Ok(ColorSample::new((r / n) as u8, (g / n) as u8, (b / n) as u8))
    }
}

fn color_index(r: usize, g: usize, b: usize) -> usize {
    (r << (2 * SIGBITS)) | (g << SIGBITS) | b
}

fn build_histogram(pixels: &[u8], quality: usize) -> Result<Vec<u32>, PaletteError> {
    let mut histogram = vec![0u32; HISTO_SIZE];
    let mut sampled = 0usize;

    for px in pixels.chunks_exact(4).step_by(quality) {
        let [r, g, b, a] = [px[0], px[1], px[2], px[3]];
        if a < MIN_ALPHA || (r > WHITE_CUTOFF && g > WHITE_CUTOFF && b > WHITE_CUTOFF) {
            continue;
        }
        let idx = color_index((r >> RSHIFT) as usize, (g >> RSHIFT) as usize, (b >> RSHIFT) as usize);
        histogram[idx] += 1;
        sampled += 1;
    }

    if sampled == 0 {
        return Err(PaletteError::NoUsablePixels);
    }
    Ok(histogram)
}

/// 直方图空间中的颜色盒，上下界均为闭区间。
#[derive(Debug, Clone, Copy)]
struct VBox {
    lo: [usize; 3],
    hi: [usize; 3],
    count: u64,
}

impl VBox {
    /// 收缩到盒内非空桶的最小外接范围；空盒返回 None。
    fn shrink_wrapped(lo: [usize; 3], hi: [usize; 3], histogram: &[u32]) -> Option<Self> {
        let mut min = [usize::MAX; 3];
        let mut max = [0usize; 3];
        let mut count = 0u64;

        for r in lo[0]..=hi[0] {
            for g in lo[1]..=hi[1] {
                for b in lo[2]..=hi[2] {
                    let h = histogram[color_index(r, g, b)];
                    if h == 0 {
                        continue;
                    }
                    count += h as u64;
                    for (axis, value) in [r, g, b].into_iter().enumerate() {
                        min[axis] = min[axis].min(value);
                        max[axis] = max[axis].max(value);
                    }
                }
            }
        }

        (count > 0).then_some(Self { lo: min, hi: max, count })
    }

    fn width(&self, axis: usize) -> usize {
        self.hi[axis] - self.lo[axis] + 1
    }

    fn volume(&self) -> u64 {
        (0..3).map(|axis| self.width(axis) as u64).product()
    }

    fn splittable(&self) -> bool {
        self.count > 1 && self.volume() > 1
    }

    fn average(&self, histogram: &[u32]) -> ColorSample {
        let mult = (1 << RSHIFT) as f64;
        let mut sums = [0f64; 3];
        let mut total = 0f64;

        for r in self.lo[0]..=self.hi[0] {
            for g in self.lo[1]..=self.hi[1] {
                for b in self.lo[2]..=self.hi[2] {
                    let h = histogram[color_index(r, g, b)] as f64;
                    if h == 0.0 {
                        continue;
                    }
                    total += h;
                    for (sum, value) in sums.iter_mut().zip([r, g, b]) {
                        *sum += h * (value as f64 + 0.5) * mult;
                    }
                }
            }
        }

        let channel = |sum: f64| (sum / total).clamp(0.0, 255.0) as u8;
        ColorSample::new(channel(sums[0]), channel(sums[1]), channel(sums[2]))
    }

    /// 沿最长轴在中位附近切分为两个非空盒。
    fn median_cut(&self, histogram: &[u32]) -> Option<(VBox, VBox)> {
        if !self.splittable() {
            return None;
        }

        let axis = (0..3).max_by_key(|&axis| (self.width(axis), 3 - axis))?;
        let (lo, hi) = (self.lo[axis], self.hi[axis]);
        if lo == hi {
            return None;
        }

        let mut partial = [0u64; AXIS_SIZE];
        let mut running = 0u64;
        for (slice, slot) in partial.iter_mut().enumerate().take(hi + 1).skip(lo) {
            running += self.slice_count(axis, slice, histogram);
            *slot = running;
        }
        let total = running;

        let median = (lo..=hi).find(|&i| partial[i] * 2 > total)?;
        let left = median - lo;
        let right = hi - median;
        let cut = if left <= right {
            median + right / 2
        } else {
            median.saturating_sub(1 + left / 2).max(lo)
        }
        .clamp(lo, hi - 1);

        let mut first_hi = self.hi;
        first_hi[axis] = cut;
        let mut second_lo = self.lo;
        second_lo[axis] = cut + 1;

        let first = VBox::shrink_wrapped(self.lo, first_hi, histogram)?;
        let second = VBox::shrink_wrapped(second_lo, self.hi, histogram)?;
        Some((first, second))
    }

    fn slice_count(&self, axis: usize, slice: usize, histogram: &[u32]) -> u64 {
        let mut lo = self.lo;
        let mut hi = self.hi;
        lo[axis] = slice;
        hi[axis] = slice;

        let mut sum = 0u64;
        for r in lo[0]..=hi[0] {
            for g in lo[1]..=hi[1] {
                for b in lo[2]..=hi[2] {
                    sum += histogram[color_index(r, g, b)] as u64;
                }
            }
        }
        sum
    }
}

fn by_count(vbox: &VBox) -> u64 {
    vbox.count
}

fn by_count_and_volume(vbox: &VBox) -> u64 {
    vbox.count.saturating_mul(vbox.volume())
}

fn split_until(boxes: &mut Vec<VBox>, histogram: &[u32], target: usize, priority: fn(&VBox) -> u64) {
    for _ in 0..MAX_ITERATIONS {
        if boxes.len() >= target {
            return;
        }

        let Some(idx) = boxes
            .iter()
            .enumerate()
            .filter(|(_, vbox)| vbox.splittable())
            .max_by_key(|(_, vbox)| priority(vbox))
            .map(|(idx, _)| idx)
        else {
            return;
        };

        let vbox = boxes.swap_remove(idx);
        match vbox.median_cut(histogram) {
            Some((first, second)) => {
                boxes.push(first);
                boxes.push(second);
            }
            None => {
                boxes.push(vbox);
                return;
            }
        }
    }
}

fn quantize(histogram: &[u32], max_colors: usize) -> Vec<ColorSample> {
    let full = [AXIS_SIZE - 1; 3];
    let Some(root) = VBox::shrink_wrapped([0; 3], full, histogram) else {
        return Vec::new();
    };

    let mut boxes = vec![root];
    let by_population = ((FRACT_BY_POPULATION * max_colors as f64) as usize).max(1);
    split_until(&mut boxes, histogram, by_population, by_count);
    split_until(&mut boxes, histogram, max_colors, by_count_and_volume);

    boxes.sort_by_key(|vbox| std::cmp::Reverse(by_count_and_volume(vbox)));
    boxes.iter().map(|vbox| vbox.average(histogram)).collect()
}
