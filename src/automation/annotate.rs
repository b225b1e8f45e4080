//! Debug frame annotation

use font8x8::{BASIC_FONTS, UnicodeFonts};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::template_matching::MatchResult;

const CLEARED: Rgb<u8> = Rgb([0, 255, 0]);
const BELOW: Rgb<u8> = Rgb([255, 0, 0]);
const GLYPH: i32 = 8;
// Gap between the label's bottom edge and the box.
const LABEL_GAP: i32 = 5;

/// Copy of `frame` with each result's best box drawn 2 px wide, green when
/// it reaches `threshold` and red otherwise, labeled with its score.
pub fn annotate(frame: &RgbImage, results: &[MatchResult], threshold: f32) -> RgbImage {
    let mut out = frame.clone();

    for result in results {
        let Some(best) = result.best else {
            continue;
        };
        let color = if result.clears(threshold) { CLEARED } else { BELOW };
        let (w, h) = result.size;
        let (x, y) = (best.x as i32, best.y as i32);

        draw_hollow_rect_mut(&mut out, Rect::at(x, y).of_size(w, h), color);
        if w > 2 && h > 2 {
            draw_hollow_rect_mut(&mut out, Rect::at(x + 1, y + 1).of_size(w - 2, h - 2), color);
        }

        let mut label_y = y - LABEL_GAP - GLYPH;
        if label_y < 0 {
            label_y = y + 2;
        }
        draw_label(&mut out, x, label_y, &format!("{:.2}", best.score), color);
    }

    out
}

fn draw_label(img: &mut RgbImage, x: i32, y: i32, text: &str, color: Rgb<u8>) {
    let (width, height) = (img.width() as i32, img.height() as i32);
    let mut cursor_x = x;

    for ch in text.chars() {
        let Some(glyph) = BASIC_FONTS.get(ch) else {
            cursor_x += GLYPH;
            continue;
        };
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..GLYPH {
                if (bits >> col) & 1 == 0 {
                    continue;
                }
                let (px, py) = (cursor_x + col, y + row as i32);
                if px >= 0 && py >= 0 && px < width && py < height {
                    img.put_pixel(px as u32, py as u32, color);
                }
            }
        }
        cursor_x += GLYPH;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template_matching::{BestMatch, TemplateId};

    fn result(score: f32, x: u32, y: u32) -> MatchResult {
        MatchResult {
            template: TemplateId(0),
            name: "t.png".into(),
            best: Some(BestMatch { x, y, score }),
            size: (20, 20),
        }
    }

    #[test]
    fn test_box_color_follows_threshold() {
        let frame = RgbImage::new(100, 100);

        let above = annotate(&frame, &[result(0.95, 40, 40)], 0.9);
        assert_eq!(*above.get_pixel(40, 50), CLEARED);
        assert_eq!(*above.get_pixel(41, 50), CLEARED);
        assert_eq!(*above.get_pixel(42, 50), Rgb([0, 0, 0]));

        let below = annotate(&frame, &[result(0.5, 40, 40)], 0.9);
        assert_eq!(*below.get_pixel(59, 45), BELOW);
    }

    #[test]
    fn test_source_frame_untouched() {
        let frame = RgbImage::from_pixel(50, 50, Rgb([7, 7, 7]));
        let out = annotate(&frame, &[result(0.99, 0, 0)], 0.8);
        assert!(frame.pixels().all(|p| *p == Rgb([7, 7, 7])));
        assert_ne!(out, frame);
    }

    #[test]
    fn test_label_drawn_above_box() {
        let frame = RgbImage::new(100, 100);
        let out = annotate(&frame, &[result(0.97, 30, 40)], 0.9);
        let label_rows = (40 - LABEL_GAP - GLYPH) as u32..(40 - LABEL_GAP) as u32;
        let lit = label_rows
            .flat_map(|y| (30..62).map(move |x| (x, y)))
            .filter(|&(x, y)| *out.get_pixel(x, y) == CLEARED)
            .count();
        assert!(lit > 0);
    }

    #[test]
    fn test_unmatched_results_skipped() {
        let frame = RgbImage::new(10, 10);
        let unmatched = MatchResult {
            template: TemplateId(0),
            name: "huge.png".into(),
            best: None,
            size: (50, 50),
        };
        assert_eq!(annotate(&frame, &[unmatched], 0.8), frame);
    }
}
