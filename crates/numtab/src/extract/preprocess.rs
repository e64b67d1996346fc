//! Image enhancement ahead of OCR.
//!
//! The input is reduced to grayscale, upscaled when small, then rendered into
//! several variants (contrast-equalized, denoised, sharpened, binarized,
//! morphologically cleaned). OCR engines disagree on which rendition they
//! read best, so all enabled variants are handed to recognition.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma};
use imageproc::distance_transform::Norm;

use super::config::{BilateralParams, ClaheParams, PreprocessConfig, VariantKind};

/// A labeled preprocessed image.
#[derive(Debug, Clone)]
pub struct Variant {
    pub kind: VariantKind,
    pub image: GrayImage,
}

impl Variant {
    pub fn label(&self) -> &'static str {
        self.kind.label()
    }
}

const SHARPEN_KERNEL: [f32; 9] = [0.0, -1.0, 0.0, -1.0, 5.0, -1.0, 0.0, -1.0, 0.0];

/// Produce the enabled variants in canonical order.
pub fn preprocess(image: &DynamicImage, cfg: &PreprocessConfig) -> Vec<Variant> {
    let gray = upscale_to_min_side(&image.to_luma8(), cfg.min_side_px);
    let enabled = |k: VariantKind| cfg.variants.contains(&k);
    let denoised = || clahe(&bilateral_filter(&gray, &cfg.bilateral), &cfg.clahe);

    let mut denoise_clahe: Option<GrayImage> = None;
    let mut otsu: Option<GrayImage> = None;
    let mut adaptive: Option<GrayImage> = None;

    let mut out = Vec::with_capacity(cfg.variants.len());
    for kind in VariantKind::ALL {
        if !enabled(kind) {
            continue;
        }
        let image = match kind {
            VariantKind::Clahe => clahe(&gray, &cfg.clahe),
            VariantKind::DenoiseClahe => denoise_clahe.get_or_insert_with(&denoised).clone(),
            VariantKind::Sharpened => {
                let base = denoise_clahe.get_or_insert_with(&denoised);
                imageops::filter3x3(&*base, &SHARPEN_KERNEL[..])
            }
            VariantKind::Otsu => {
                let base = denoise_clahe.get_or_insert_with(&denoised);
                otsu.get_or_insert_with(|| otsu_binarize(base)).clone()
            }
            VariantKind::Adaptive | VariantKind::AdaptiveInverted => {
                let base = denoise_clahe.get_or_insert_with(&denoised);
                let bin = adaptive.get_or_insert_with(|| {
                    adaptive_threshold(base, cfg.adaptive_radius, cfg.adaptive_c)
                });
                if kind == VariantKind::Adaptive {
                    bin.clone()
                } else {
                    invert(bin)
                }
            }
            VariantKind::Morphology => {
                let base = denoise_clahe.get_or_insert_with(&denoised);
                let bin = otsu.get_or_insert_with(|| otsu_binarize(base));
                let closed = imageproc::morphology::close(bin, Norm::LInf, cfg.morph_radius);
                imageproc::morphology::open(&closed, Norm::LInf, cfg.morph_radius)
            }
        };
        tracing::debug!(
            variant = kind.label(),
            width = image.width(),
            height = image.height(),
            "variant ready"
        );
        out.push(Variant { kind, image });
    }
    out
}

/// Catmull-Rom upscale so the smaller side reaches `min_side`; larger images
/// are returned unchanged.
pub fn upscale_to_min_side(gray: &GrayImage, min_side: u32) -> GrayImage {
    let (w, h) = gray.dimensions();
    let short = w.min(h);
    if short == 0 || short >= min_side {
        return gray.clone();
    }
    let scale = min_side as f64 / short as f64;
    let nw = ((w as f64 * scale).round() as u32).max(1);
    let nh = ((h as f64 * scale).round() as u32).max(1);
    imageops::resize(gray, nw, nh, FilterType::CatmullRom)
}

/// Edge-preserving smoothing: each pixel becomes a mean of its window,
/// weighted by spatial distance and intensity difference.
pub fn bilateral_filter(gray: &GrayImage, params: &BilateralParams) -> GrayImage {
    let (w, h) = gray.dimensions();
    let r = params.radius as i64;
    if r == 0 || w == 0 || h == 0 {
        return gray.clone();
    }

    let side = (2 * r + 1) as usize;
    let two_ss = 2.0 * params.sigma_space.max(1e-3).powi(2);
    let two_sc = 2.0 * params.sigma_color.max(1e-3).powi(2);
    let spatial: Vec<f32> = (-r..=r)
        .flat_map(|dy| (-r..=r).map(move |dx| ((dx * dx + dy * dy) as f32 / -two_ss).exp()))
        .collect();
    let range: Vec<f32> = (0..256)
        .map(|d| ((d * d) as f32 / -two_sc).exp())
        .collect();

    let mut out = GrayImage::new(w, h);
    for y in 0..h as i64 {
        for x in 0..w as i64 {
            let center = gray.get_pixel(x as u32, y as u32)[0];
            let mut acc = 0.0f32;
            let mut norm = 0.0f32;
            for dy in -r..=r {
                let yy = y + dy;
                if yy < 0 || yy >= h as i64 {
                    continue;
                }
                for dx in -r..=r {
                    let xx = x + dx;
                    if xx < 0 || xx >= w as i64 {
                        continue;
                    }
                    let v = gray.get_pixel(xx as u32, yy as u32)[0];
                    let ws = spatial[(dy + r) as usize * side + (dx + r) as usize];
                    let wr = range[center.abs_diff(v) as usize];
                    acc += ws * wr * v as f32;
                    norm += ws * wr;
                }
            }
            let v = if norm > 0.0 { acc / norm } else { center as f32 };
            out.put_pixel(x as u32, y as u32, Luma([v.round().clamp(0.0, 255.0) as u8]));
        }
    }
    out
}

/// Contrast-limited adaptive histogram equalization with bilinear blending
/// between tile lookup tables.
pub fn clahe(gray: &GrayImage, params: &ClaheParams) -> GrayImage {
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 {
        return gray.clone();
    }
    let tiles = params.tiles.max(1);
    let tile_w = w.div_ceil(tiles.min(w));
    let tile_h = h.div_ceil(tiles.min(h));
    let tiles_x = w.div_ceil(tile_w);
    let tiles_y = h.div_ceil(tile_h);

    let mut luts: Vec<[u8; 256]> = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(w);
            let y1 = (y0 + tile_h).min(h);
            let mut hist = [0u32; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[gray.get_pixel(x, y)[0] as usize] += 1;
                }
            }
            let count = (x1 - x0) * (y1 - y0);
            luts.push(clipped_equalization(&mut hist, count, params.clip_limit));
        }
    }

    let lut_at = |tx: u32, ty: u32| &luts[(ty * tiles_x + tx) as usize];
    let grid_coord = |p: u32, tile: u32, n: u32| -> (u32, u32, f32) {
        let f = (p as f32 + 0.5) / tile as f32 - 0.5;
        let i0 = f.floor().clamp(0.0, (n - 1) as f32) as u32;
        let i1 = (i0 + 1).min(n - 1);
        let a = (f - i0 as f32).clamp(0.0, 1.0);
        (i0, i1, a)
    };

    let mut out = GrayImage::new(w, h);
    for y in 0..h {
        let (ty0, ty1, ay) = grid_coord(y, tile_h, tiles_y);
        for x in 0..w {
            let (tx0, tx1, ax) = grid_coord(x, tile_w, tiles_x);
            let v = gray.get_pixel(x, y)[0] as usize;
            let top = lut_at(tx0, ty0)[v] as f32 * (1.0 - ax) + lut_at(tx1, ty0)[v] as f32 * ax;
            let bottom = lut_at(tx0, ty1)[v] as f32 * (1.0 - ax) + lut_at(tx1, ty1)[v] as f32 * ax;
            let blended = top * (1.0 - ay) + bottom * ay;
            out.put_pixel(x, y, Luma([blended.round().clamp(0.0, 255.0) as u8]));
        }
    }
    out
}

fn clipped_equalization(hist: &mut [u32; 256], count: u32, clip_limit: f32) -> [u8; 256] {
    let mut lut = [0u8; 256];
    if count == 0 {
        return lut;
    }
    if clip_limit > 0.0 {
        let clip = ((clip_limit * count as f32 / 256.0) as u32).max(1);
        let mut excess = 0u32;
        for bin in hist.iter_mut() {
            if *bin > clip {
                excess += *bin - clip;
                *bin = clip;
            }
        }
        let per_bin = excess / 256;
        let remainder = (excess % 256) as usize;
        for (i, bin) in hist.iter_mut().enumerate() {
            *bin += per_bin + u32::from(i < remainder);
        }
    }
    let mut cdf = 0u32;
    for (v, bin) in hist.iter().enumerate() {
        cdf += bin;
        lut[v] = ((cdf as f32 * 255.0 / count as f32).round()).clamp(0.0, 255.0) as u8;
    }
    lut
}

/// Global binarization at the Otsu level (foreground is white).
pub fn otsu_binarize(gray: &GrayImage) -> GrayImage {
    let level = imageproc::contrast::otsu_level(gray);
    binarize(gray, level)
}

fn binarize(gray: &GrayImage, level: u8) -> GrayImage {
    let mut out = gray.clone();
    for p in out.pixels_mut() {
        p[0] = if p[0] > level { 255 } else { 0 };
    }
    out
}

/// Local threshold: a pixel is white when brighter than its window mean
/// minus `c`.
pub fn adaptive_threshold(gray: &GrayImage, radius: u32, c: i16) -> GrayImage {
    let mean = imageproc::filter::box_filter(gray, radius, radius);
    let mut out = GrayImage::new(gray.width(), gray.height());
    for (x, y, p) in out.enumerate_pixels_mut() {
        let t = mean.get_pixel(x, y)[0] as i16 - c;
        p[0] = if (gray.get_pixel(x, y)[0] as i16) > t { 255 } else { 0 };
    }
    out
}

pub fn invert(gray: &GrayImage) -> GrayImage {
    let mut out = gray.clone();
    imageops::invert(&mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{draw_bars_image, gradient_image};

    #[test]
    fn small_images_are_upscaled() {
        let img = gradient_image(200, 100);
        let up = upscale_to_min_side(&img, 800);
        assert_eq!(up.height(), 800);
        assert_eq!(up.width(), 1600);
    }

    #[test]
    fn large_images_keep_size() {
        let img = gradient_image(900, 850);
        assert_eq!(upscale_to_min_side(&img, 800).dimensions(), (900, 850));
    }

    #[test]
    fn all_variants_in_order() {
        let img = DynamicImage::ImageLuma8(draw_bars_image(120, 90));
        let cfg = PreprocessConfig {
            min_side_px: 100,
            ..PreprocessConfig::default()
        };
        let variants = preprocess(&img, &cfg);
        let labels: Vec<_> = variants.iter().map(Variant::label).collect();
        assert_eq!(
            labels,
            vec![
                "clahe",
                "denoise_clahe",
                "sharpened",
                "otsu",
                "adaptive",
                "adaptive_inverted",
                "morphology"
            ]
        );
        let dims = variants[0].image.dimensions();
        assert_eq!(dims.1, 100);
        assert!(variants.iter().all(|v| v.image.dimensions() == dims));
    }

    #[test]
    fn disabled_variants_are_skipped() {
        let img = DynamicImage::ImageLuma8(draw_bars_image(64, 64));
        let cfg = PreprocessConfig {
            min_side_px: 64,
            variants: vec![VariantKind::Morphology, VariantKind::Otsu],
            ..PreprocessConfig::default()
        };
        let variants = preprocess(&img, &cfg);
        let kinds: Vec<_> = variants.iter().map(|v| v.kind).collect();
        assert_eq!(kinds, vec![VariantKind::Otsu, VariantKind::Morphology]);
    }

    #[test]
    fn binarized_variants_are_two_level() {
        let img = draw_bars_image(64, 64);
        let otsu = otsu_binarize(&img);
        assert!(otsu.pixels().all(|p| p[0] == 0 || p[0] == 255));
        let adaptive = adaptive_threshold(&img, 3, 2);
        let inverted = invert(&adaptive);
        for (a, b) in adaptive.pixels().zip(inverted.pixels()) {
            assert_eq!(a[0], 255 - b[0]);
        }
    }

    #[test]
    fn clahe_stretches_low_contrast() {
        let mut img = GrayImage::new(256, 256);
        for (x, _, p) in img.enumerate_pixels_mut() {
            p[0] = 100 + (x % 8) as u8;
        }
        let out = clahe(&img, &ClaheParams::default());
        let min = out.pixels().map(|p| p[0]).min().unwrap();
        let max = out.pixels().map(|p| p[0]).max().unwrap();
        assert!(max - min > 21, "range {min}..{max}");
    }

    #[test]
    fn bilateral_keeps_edges() {
        let img = draw_bars_image(40, 40);
        let out = bilateral_filter(
            &img,
            &BilateralParams {
                radius: 3,
                sigma_color: 20.0,
                sigma_space: 3.0,
            },
        );
        let flat = img.get_pixel(0, 0)[0] as i32;
        assert!((out.get_pixel(0, 0)[0] as i32 - flat).abs() <= 2);
        let distinct: std::collections::HashSet<u8> = out.pixels().map(|p| p[0]).collect();
        assert!(distinct.len() >= 2);
    }
}
