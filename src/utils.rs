use image::{ DynamicImage, GenericImageView, GrayImage };
use imageproc::contrast;

use crate::detect::BoundingBox;

/// Clamp a box into `[0, width] x [0, height]`.
/// Returns `None` when nothing is left of it (zero area or inverted box).
pub fn clamp_box(a_box: &BoundingBox, width: u32, height: u32) -> Option<BoundingBox> {
    let (w, h) = (width as i64, height as i64);
    let x1 = (a_box.x1 as i64).max(0).min(w);
    let y1 = (a_box.y1 as i64).max(0).min(h);
    let x2 = (a_box.x2 as i64).max(0).min(w);
    let y2 = (a_box.y2 as i64).max(0).min(h);
    if x2 <= x1 || y2 <= y1 {
        return None;
    }
    Some(BoundingBox { x1: x1 as i32, y1: y1 as i32, x2: x2 as i32, y2: y2 as i32 })
}

/// Cut the box out of the image. The box must already be clamped to `img`.
pub fn crop(img: &DynamicImage, a_box: &BoundingBox) -> DynamicImage {
    debug_assert!(a_box.x2 as u32 <= img.width() && a_box.y2 as u32 <= img.height());
    img.crop_imm(a_box.x1 as u32, a_box.y1 as u32, a_box.width(), a_box.height())
}

/// 8 bit gray buffer handed to the ocr engine
pub fn ocr_input(img: &DynamicImage, equalize: bool) -> GrayImage {
    let mut gray = img.to_luma8();
    if equalize {
        contrast::equalize_histogram_mut(&mut gray);
    }
    gray
}


#[cfg(test)]
mod test {

    use image::{ DynamicImage, GenericImageView, RgbImage, Rgb };

    use super::*;

    fn bbox(x1: i32, y1: i32, x2: i32, y2: i32) -> BoundingBox {
        BoundingBox { x1, y1, x2, y2 }
    }

    fn gradient(width: u32, height: u32) -> DynamicImage {
        let img = RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 7]));
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn box_inside_image_is_untouched() {
        assert_eq!(clamp_box(&bbox(2, 3, 10, 12), 20, 20), Some(bbox(2, 3, 10, 12)));
    }

    #[test]
    fn box_past_the_edges_is_clamped() {
        assert_eq!(clamp_box(&bbox(-5, -1, 30, 25), 20, 10), Some(bbox(0, 0, 20, 10)));
        assert_eq!(clamp_box(&bbox(15, 4, 40, 9), 20, 10), Some(bbox(15, 4, 20, 9)));
    }

    #[test]
    fn degenerate_boxes_are_dropped() {
        // zero width
        assert_eq!(clamp_box(&bbox(5, 5, 5, 9), 20, 20), None);
        // inverted
        assert_eq!(clamp_box(&bbox(9, 5, 4, 9), 20, 20), None);
        // completely outside
        assert_eq!(clamp_box(&bbox(25, 2, 40, 8), 20, 20), None);
        assert_eq!(clamp_box(&bbox(-10, -10, -1, -1), 20, 20), None);
    }

    #[test]
    fn crop_returns_exact_region() {
        let img = gradient(16, 12);
        let cropped = crop(&img, &bbox(2, 3, 6, 8));
        assert_eq!(cropped.dimensions(), (4, 5));
        let cropped = cropped.to_rgb8();
        assert_eq!(*cropped.get_pixel(0, 0), Rgb([2, 3, 7]));
        assert_eq!(*cropped.get_pixel(3, 4), Rgb([5, 7, 7]));
    }

    #[test]
    fn ocr_input_is_gray_with_same_size() {
        let img = gradient(16, 12);
        let gray = ocr_input(&img, false);
        assert_eq!(gray.dimensions(), (16, 12));
        let equalized = ocr_input(&img, true);
        assert_eq!(equalized.dimensions(), (16, 12));
        // equalization stretches the darkest/brightest values apart
        let max = equalized.pixels().map(|p| p.0[0]).max().unwrap();
        assert_eq!(max, 255);
    }
}
