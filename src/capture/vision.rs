use anyhow::Result;
use image::{imageops, DynamicImage, GrayImage};

use crate::mood::EmotionKind;

/// Axis-aligned face rectangle in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Camera or any other frame feed. `Ok(None)` means the feed has ended.
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> Result<Option<DynamicImage>>;
}

pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &GrayImage) -> Result<Vec<FaceBox>>;
}

pub trait EmotionClassifier: Send {
    /// Label and confidence for a cropped grayscale face.
    fn classify(&mut self, face: &GrayImage) -> Result<(EmotionKind, f32)>;
}

/// Crop `face` out of `frame`, clamped to the frame bounds. `None` when nothing is left.
pub fn crop_face(frame: &GrayImage, face: &FaceBox) -> Option<GrayImage> {
    let (frame_w, frame_h) = frame.dimensions();
    if face.x >= frame_w || face.y >= frame_h {
        return None;
    }

    let width = face.width.min(frame_w - face.x);
    let height = face.height.min(frame_h - face.y);
    if width == 0 || height == 0 {
        return None;
    }

    Some(imageops::crop_imm(frame, face.x, face.y, width, height).to_image())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn crop_is_clamped_to_frame() {
        let frame = GrayImage::from_pixel(10, 8, Luma([200]));

        let inside = crop_face(&frame, &FaceBox { x: 2, y: 2, width: 4, height: 4 }).unwrap();
        assert_eq!(inside.dimensions(), (4, 4));

        let overhang = crop_face(&frame, &FaceBox { x: 6, y: 5, width: 10, height: 10 }).unwrap();
        assert_eq!(overhang.dimensions(), (4, 3));

        assert!(crop_face(&frame, &FaceBox { x: 10, y: 0, width: 3, height: 3 }).is_none());
        assert!(crop_face(&frame, &FaceBox { x: 0, y: 0, width: 0, height: 3 }).is_none());
    }
}
