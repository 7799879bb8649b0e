//! Binarized page image used for foreground density sampling.

use crate::geometry::BBox;

/// One-bit page image stored as top-down rows of bytes, one byte per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryImage {
    width: i32,
    height: i32,
    pixels: Vec<u8>,
}

impl BinaryImage {
    /// All-background image.
    pub fn new(width: i32, height: i32) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Pixel at image column `x`, top-down row `row`.
    pub fn get(&self, x: i32, row: i32) -> bool {
        if x < 0 || row < 0 || x >= self.width || row >= self.height {
            return false;
        }
        self.pixels[(row * self.width + x) as usize] != 0
    }

    pub fn set(&mut self, x: i32, row: i32, on: bool) {
        if x < 0 || row < 0 || x >= self.width || row >= self.height {
            return;
        }
        self.pixels[(row * self.width + x) as usize] = u8::from(on);
    }

    /// Sets every pixel of a page box (y up) that falls inside the image.
    pub fn fill(&mut self, bbox: &BBox) {
        let Some((x0, r0, x1, r1)) = self.clip(bbox) else {
            return;
        };
        for row in r0..r1 {
            let start = (row * self.width + x0) as usize;
            let end = (row * self.width + x1) as usize;
            self.pixels[start..end].fill(1);
        }
    }

    /// Converts a page box to clipped image bounds `(x0, row0, x1, row1)`,
    /// end exclusive. `None` when nothing is left after clipping.
    fn clip(&self, bbox: &BBox) -> Option<(i32, i32, i32, i32)> {
        let x0 = bbox.left.max(0);
        let x1 = bbox.right.min(self.width);
        let r0 = (self.height - bbox.top).max(0);
        let r1 = (self.height - bbox.bottom).min(self.height);
        (x0 < x1 && r0 < r1).then_some((x0, r0, x1, r1))
    }

    /// Fraction of set pixels inside `bbox`, 0 when the box misses the image.
    pub fn foreground_fraction(&self, bbox: &BBox) -> f32 {
        let Some((x0, r0, x1, r1)) = self.clip(bbox) else {
            return 0.0;
        };
        let mut on = 0usize;
        for row in r0..r1 {
            let start = (row * self.width + x0) as usize;
            let end = (row * self.width + x1) as usize;
            on += self.pixels[start..end].iter().filter(|&&p| p != 0).count();
        }
        let area = (x1 - x0) as usize * (r1 - r0) as usize;
        on as f32 / area as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_foreground_fraction_top_half() {
        let mut img = BinaryImage::new(1024, 768);
        // Top half of the page in y-up coordinates.
        img.fill(&BBox::new(0, 384, 1024, 768));
        assert_eq!(img.foreground_fraction(&BBox::new(100, 0, 200, 300)), 0.0);
        assert_eq!(
            img.foreground_fraction(&BBox::new(100, 334, 200, 434)),
            0.5
        );
        assert_eq!(img.foreground_fraction(&BBox::new(100, 500, 200, 700)), 1.0);
    }

    #[test]
    fn test_out_of_image_box() {
        let img = BinaryImage::new(10, 10);
        assert_eq!(img.foreground_fraction(&BBox::new(20, 20, 30, 30)), 0.0);
        assert!(!img.get(-1, 0));
    }

    #[test]
    fn test_fill_clips_to_image() {
        let mut img = BinaryImage::new(10, 10);
        img.fill(&BBox::new(-5, -5, 3, 2));
        assert!(img.get(0, 9));
        assert!(img.get(2, 8));
        assert!(!img.get(3, 9));
        assert!(!img.get(0, 7));
    }
}
