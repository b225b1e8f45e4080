/// Template matching implementation
///
/// Mean-subtracted normalized correlation over the three color channels.
/// Window sums come from integral tables and are kept in integers, so flat
/// regions are detected exactly. The cross term for every placement comes
/// from one FFT correlation over the interleaved RGB samples and is rounded
/// back to the exact integer.
use super::types::BestMatch;
use image::{GrayImage, RgbImage};
use imageproc::template_matching::{MatchTemplateMethod, match_template_parallel};
use rayon::prelude::*;
use rustfft::num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use std::sync::{Arc, OnceLock};

/// Whether a `tw`x`th` template can be placed at least once inside a frame.
pub fn fits(frame: (u32, u32), template: (u32, u32)) -> bool {
    template.0 > 0 && template.1 > 0 && template.0 <= frame.0 && template.1 <= frame.1
}

/// Per-channel sums and the total sum of squares of a pixel block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct BlockStats {
    sum: [u64; 3],
    sum_sq: u64,
}

impl BlockStats {
    /// `n * Σ(v - mean)²` summed over channels, exact.
    fn scaled_variance(&self, n: u64) -> u128 {
        let spread: u128 = self.sum.iter().map(|&s| s as u128 * s as u128).sum();
        (n as u128 * self.sum_sq as u128).saturating_sub(spread)
    }
}

/// Summed-area tables over an RGB frame.
struct IntegralTables {
    stride: usize,
    sum: Vec<[u64; 3]>,
    sum_sq: Vec<u64>,
}

impl IntegralTables {
    fn new(frame: &RgbImage) -> Self {
        let (w, h) = (frame.width() as usize, frame.height() as usize);
        let stride = w + 1;
        let mut sum = vec![[0u64; 3]; stride * (h + 1)];
        let mut sum_sq = vec![0u64; stride * (h + 1)];

        for (y, row_px) in frame.as_raw().chunks_exact(w * 3).enumerate() {
            let mut row = [0u64; 3];
            let mut row_sq = 0u64;
            for (x, p) in row_px.chunks_exact(3).enumerate() {
                for c in 0..3 {
                    row[c] += p[c] as u64;
                    row_sq += p[c] as u64 * p[c] as u64;
                }
                let above = y * stride + x + 1;
                let here = (y + 1) * stride + x + 1;
                for c in 0..3 {
                    sum[here][c] = sum[above][c] + row[c];
                }
                sum_sq[here] = sum_sq[above] + row_sq;
            }
        }

        Self {
            stride,
            sum,
            sum_sq,
        }
    }

    fn block(&self, x: usize, y: usize, w: usize, h: usize) -> BlockStats {
        let (a, b) = (y * self.stride + x, y * self.stride + x + w);
        let (c, d) = ((y + h) * self.stride + x, (y + h) * self.stride + x + w);
        let mut stats = BlockStats::default();
        for ch in 0..3 {
            stats.sum[ch] = self.sum[d][ch] + self.sum[a][ch] - self.sum[b][ch] - self.sum[c][ch];
        }
        stats.sum_sq = self.sum_sq[d] + self.sum_sq[a] - self.sum_sq[b] - self.sum_sq[c];
        stats
    }
}

fn template_stats(template: &RgbImage) -> BlockStats {
    let mut stats = BlockStats::default();
    for p in template.pixels() {
        for c in 0..3 {
            stats.sum[c] += p.0[c] as u64;
            stats.sum_sq += p.0[c] as u64 * p.0[c] as u64;
        }
    }
    stats
}

/// Two-dimensional FFT over a fixed `width`x`height` grid.
///
/// Spectra stay transposed (one row per column of the grid) between the
/// forward and the inverse pass.
struct Fft2d {
    width: usize,
    height: usize,
    row_forward: Arc<dyn Fft<f64>>,
    col_forward: Arc<dyn Fft<f64>>,
    row_inverse: Arc<dyn Fft<f64>>,
    col_inverse: Arc<dyn Fft<f64>>,
}

impl Fft2d {
    fn new(width: usize, height: usize) -> Self {
        let mut planner = FftPlanner::<f64>::new();
        Self {
            width,
            height,
            row_forward: planner.plan_fft_forward(width),
            col_forward: planner.plan_fft_forward(height),
            row_inverse: planner.plan_fft_inverse(width),
            col_inverse: planner.plan_fft_inverse(height),
        }
    }

    fn forward(&self, mut grid: Vec<Complex64>) -> Vec<Complex64> {
        run_rows(&self.row_forward, self.width, &mut grid);
        let mut spectrum = transpose(&grid, self.width, self.height);
        run_rows(&self.col_forward, self.height, &mut spectrum);
        spectrum
    }

    /// Unnormalized; values come back scaled by `width * height`.
    fn inverse(&self, mut spectrum: Vec<Complex64>) -> Vec<Complex64> {
        run_rows(&self.col_inverse, self.height, &mut spectrum);
        let mut grid = transpose(&spectrum, self.height, self.width);
        run_rows(&self.row_inverse, self.width, &mut grid);
        grid
    }
}

fn run_rows(fft: &Arc<dyn Fft<f64>>, len: usize, data: &mut [Complex64]) {
    let scratch_len = fft.get_inplace_scratch_len();
    data.par_chunks_mut(len).for_each_init(
        || vec![Complex64::default(); scratch_len],
        |scratch, row| fft.process_with_scratch(row, scratch),
    );
}

/// `data` holds `rows` rows of `cols` values; the result holds `cols` rows
/// of `rows` values.
fn transpose(data: &[Complex64], cols: usize, rows: usize) -> Vec<Complex64> {
    let mut out = vec![Complex64::default(); data.len()];
    out.par_chunks_mut(rows).enumerate().for_each(|(c, column)| {
        for (r, value) in column.iter_mut().enumerate() {
            *value = data[r * cols + c];
        }
    });
    out
}

/// Spectrum of a frame's raw RGB samples, laid out as a `3 * width` wide
/// single-channel grid. Correlating an equally interleaved template against
/// it sums the three channels in one pass.
struct FrameSpectrum {
    fft: Fft2d,
    spectrum: Vec<Complex64>,
}

impl FrameSpectrum {
    fn new(frame: &RgbImage) -> Self {
        let fft = Fft2d::new(frame.width() as usize * 3, frame.height() as usize);
        let grid = frame
            .as_raw()
            .iter()
            .map(|&v| Complex64::new(v as f64, 0.0))
            .collect();
        let spectrum = fft.forward(grid);
        Self { fft, spectrum }
    }

    /// Σ T·I for every placement. Placement (x, y) is at
    /// `y * 3 * frame_width + 3 * x`; placements that wrap are never read.
    fn cross_terms(&self, template: &RgbImage) -> Vec<f64> {
        let (width, height) = (self.fft.width, self.fft.height);
        let row_len = template.width() as usize * 3;

        let mut grid = vec![Complex64::default(); width * height];
        for (ty, row) in template.as_raw().chunks_exact(row_len).enumerate() {
            for (i, &v) in row.iter().enumerate() {
                grid[ty * width + i] = Complex64::new(v as f64, 0.0);
            }
        }

        let mut product = self.fft.forward(grid);
        product
            .par_iter_mut()
            .zip(self.spectrum.par_iter())
            .for_each(|(t, f)| *t = *f * t.conj());

        let scale = 1.0 / (width * height) as f64;
        self.fft
            .inverse(product)
            .into_iter()
            .map(|c| c.re * scale)
            .collect()
    }
}

/// A frame prepared once and shared by every template matched against it.
///
/// Integral tables and the frame spectrum are built on first use.
pub struct PreparedFrame<'a> {
    image: &'a RgbImage,
    tables: OnceLock<IntegralTables>,
    spectrum: OnceLock<FrameSpectrum>,
}

impl<'a> PreparedFrame<'a> {
    pub fn new(image: &'a RgbImage) -> Self {
        Self {
            image,
            tables: OnceLock::new(),
            spectrum: OnceLock::new(),
        }
    }

    fn tables(&self) -> &IntegralTables {
        self.tables.get_or_init(|| IntegralTables::new(self.image))
    }

    fn spectrum(&self) -> &FrameSpectrum {
        self.spectrum.get_or_init(|| FrameSpectrum::new(self.image))
    }
}

/// Score one window. Flat (zero-variance) blocks have no defined correlation:
/// two flat blocks of the same color score 1.0, anything else involving a
/// flat block scores 0.0.
fn coefficient_score(
    n: u64,
    tmpl: &BlockStats,
    tmpl_var: u128,
    window: &BlockStats,
    cross: impl FnOnce() -> u64,
) -> f32 {
    let window_var = window.scaled_variance(n);
    match (tmpl_var == 0, window_var == 0) {
        (true, true) => {
            if tmpl.sum == window.sum {
                1.0
            } else {
                0.0
            }
        }
        (true, false) | (false, true) => 0.0,
        (false, false) => {
            let means: i128 = (0..3)
                .map(|c| tmpl.sum[c] as i128 * window.sum[c] as i128)
                .sum();
            let numerator = n as i128 * cross() as i128 - means;
            let denominator = (tmpl_var as f64).sqrt() * (window_var as f64).sqrt();
            ((numerator as f64 / denominator) as f32).clamp(-1.0, 1.0)
        }
    }
}

/// Best location of `template` in `frame` by mean-subtracted normalized
/// correlation over RGB. Ties resolve to the first position in raster order.
///
/// Returns `None` when the template does not fit inside the frame.
pub fn correlation_coefficient(frame: &PreparedFrame, template: &RgbImage) -> Option<BestMatch> {
    let (fw, fh) = frame.image.dimensions();
    if !fits((fw, fh), template.dimensions()) {
        return None;
    }

    let (tw, th) = template.dimensions();
    let n = tw as u64 * th as u64;
    let tables = frame.tables();
    let tmpl = template_stats(template);
    let tmpl_var = tmpl.scaled_variance(n);
    // A flat template never reads the cross term.
    let cross = (tmpl_var != 0).then(|| frame.spectrum().cross_terms(template));
    let stride = fw as usize * 3;

    let row_bests: Vec<Option<BestMatch>> = (0..=(fh - th))
        .into_par_iter()
        .map(|y| {
            let mut best: Option<BestMatch> = None;
            for x in 0..=(fw - tw) {
                let window = tables.block(x as usize, y as usize, tw as usize, th as usize);
                let score = coefficient_score(n, &tmpl, tmpl_var, &window, || {
                    cross.as_ref().map_or(0, |c| {
                        c[y as usize * stride + 3 * x as usize].round().max(0.0) as u64
                    })
                });
                if best.is_none_or(|b| score > b.score) {
                    best = Some(BestMatch { x, y, score });
                }
            }
            best
        })
        .collect();

    row_bests.into_iter().flatten().fold(None, |best, row| {
        if best.is_none_or(|b: BestMatch| row.score > b.score) {
            Some(row)
        } else {
            best
        }
    })
}

/// Best location of `template` in `frame` by grayscale normalized
/// cross-correlation. Undefined scores (all-black windows) are skipped.
pub fn cross_correlation(frame: &GrayImage, template: &GrayImage) -> Option<BestMatch> {
    if !fits(frame.dimensions(), template.dimensions()) {
        return None;
    }

    let surface =
        match_template_parallel(frame, template, MatchTemplateMethod::CrossCorrelationNormalized);

    let mut best: Option<BestMatch> = None;
    for (x, y, pixel) in surface.enumerate_pixels() {
        let score = pixel[0];
        if !score.is_finite() {
            continue;
        }
        if best.is_none_or(|b| score > b.score) {
            best = Some(BestMatch { x, y, score });
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, imageops};
    use std::time::{Duration, Instant};

    fn best_of(frame: &RgbImage, template: &RgbImage) -> Option<BestMatch> {
        correlation_coefficient(&PreparedFrame::new(frame), template)
    }

    /// Σ T·I over the window at (x, y), summed directly.
    fn direct_cross_term(frame: &RgbImage, template: &RgbImage, x: u32, y: u32) -> u64 {
        let mut total = 0u64;
        for (tx, ty, t) in template.enumerate_pixels() {
            let f = frame.get_pixel(x + tx, y + ty);
            for c in 0..3 {
                total += t.0[c] as u64 * f.0[c] as u64;
            }
        }
        total
    }

    fn textured(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| {
            Rgb([
                ((x * 37 + y * 91) % 251) as u8,
                ((x * x + y * 13) % 256) as u8,
                (((x ^ y) * 7) % 256) as u8,
            ])
        })
    }

    #[test]
    fn test_exact_subimage_found() {
        let frame = textured(80, 60);
        let template = imageops::crop_imm(&frame, 30, 40, 12, 9).to_image();

        let best = best_of(&frame, &template).unwrap();
        assert_eq!((best.x, best.y), (30, 40));
        assert!(best.score > 0.999, "got {}", best.score);
    }

    #[test]
    fn test_brightness_shift_still_matches() {
        let frame = textured(50, 50);
        let mut template = imageops::crop_imm(&frame, 10, 5, 8, 8).to_image();
        for p in template.pixels_mut() {
            for c in 0..3 {
                p.0[c] = p.0[c] / 2 + 20;
            }
        }
        let best = best_of(&frame, &template).unwrap();
        assert_eq!((best.x, best.y), (10, 5));
        assert!(best.score > 0.99, "got {}", best.score);
    }

    #[test]
    fn test_inverted_template_scores_negative_at_source() {
        let frame = textured(40, 40);
        let source = imageops::crop_imm(&frame, 5, 5, 6, 6).to_image();
        let mut inverted = source.clone();
        imageops::invert(&mut inverted);

        let n = 36;
        let tmpl = template_stats(&inverted);
        let tables = IntegralTables::new(&frame);
        let window = tables.block(5, 5, 6, 6);
        let score = coefficient_score(n, &tmpl, tmpl.scaled_variance(n), &window, || {
            direct_cross_term(&frame, &inverted, 5, 5)
        });
        assert!(score < -0.999, "got {}", score);
    }

    #[test]
    fn test_solid_square_on_black() {
        let mut frame = RgbImage::new(200, 200);
        let color = Rgb([0, 200, 255]);
        for y in 50..70 {
            for x in 50..70 {
                frame.put_pixel(x, y, color);
            }
        }
        let template = RgbImage::from_pixel(20, 20, color);

        let best = best_of(&frame, &template).unwrap();
        assert_eq!((best.x, best.y), (50, 50));
        assert!((best.score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_template_larger_than_frame() {
        let frame = textured(10, 10);
        let template = textured(11, 4);
        assert!(best_of(&frame, &template).is_none());
        assert!(!fits((10, 10), (4, 11)));
    }

    #[test]
    fn test_template_same_size_as_frame() {
        let frame = textured(16, 12);
        let best = best_of(&frame, &frame.clone()).unwrap();
        assert_eq!((best.x, best.y), (0, 0));
        assert!(best.score > 0.999);
    }

    #[test]
    fn test_block_stats_match_direct_sum() {
        let frame = textured(20, 15);
        let tables = IntegralTables::new(&frame);
        let block = imageops::crop_imm(&frame, 3, 4, 7, 5).to_image();
        assert_eq!(tables.block(3, 4, 7, 5), template_stats(&block));
    }

    #[test]
    fn test_cross_correlation_grayscale() {
        let frame = image::DynamicImage::ImageRgb8(textured(60, 40)).to_luma8();
        let template = imageops::crop_imm(&frame, 22, 11, 10, 10).to_image();

        let best = cross_correlation(&frame, &template).unwrap();
        assert_eq!((best.x, best.y), (22, 11));
        assert!(best.score > 0.999, "got {}", best.score);
    }

    #[test]
    fn test_spectral_cross_terms_match_direct_sum() {
        let frame = textured(37, 23);
        let template = textured(9, 7);
        let spectrum = FrameSpectrum::new(&frame);
        let cross = spectrum.cross_terms(&template);

        for (x, y) in [(0, 0), (5, 3), (28, 16), (13, 9)] {
            let idx = y as usize * 37 * 3 + 3 * x as usize;
            assert_eq!(
                cross[idx].round() as u64,
                direct_cross_term(&frame, &template, x, y),
                "at ({}, {})",
                x,
                y
            );
        }
    }

    #[test]
    fn test_prepared_frame_reused_across_templates() {
        let frame = textured(90, 70);
        let prepared = PreparedFrame::new(&frame);
        let a = imageops::crop_imm(&frame, 3, 50, 14, 11).to_image();
        let b = imageops::crop_imm(&frame, 61, 8, 20, 16).to_image();

        let best_a = correlation_coefficient(&prepared, &a).unwrap();
        let best_b = correlation_coefficient(&prepared, &b).unwrap();
        assert_eq!((best_a.x, best_a.y), (3, 50));
        assert_eq!((best_b.x, best_b.y), (61, 8));
    }

    #[test]
    fn test_full_hd_frame_within_budget() {
        let frame = textured(1920, 1080);
        let template = imageops::crop_imm(&frame, 1500, 900, 48, 48).to_image();
        let budget = if cfg!(debug_assertions) {
            Duration::from_secs(20)
        } else {
            Duration::from_millis(500)
        };

        let started = Instant::now();
        let best = best_of(&frame, &template).unwrap();
        let elapsed = started.elapsed();

        assert_eq!((best.x, best.y), (1500, 900));
        assert!(elapsed < budget, "took {:?}", elapsed);
    }
}
