//! Frame overlay: boxes drawn onto snapshots, captions and HUD text as data

use crate::bbox::BBox;
use binsort_core::Command;
use image::{Rgb, RgbImage};
use serde::Serialize;

/// Box outline width in pixels
pub const BOX_THICKNESS: i32 = 3;

const PALETTE: [Rgb<u8>; 6] = [
    Rgb([255, 64, 64]),
    Rgb([64, 220, 64]),
    Rgb([64, 128, 255]),
    Rgb([255, 200, 0]),
    Rgb([255, 64, 255]),
    Rgb([0, 220, 255]),
];

/// One box to draw, with its caption
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayItem {
    pub class_id: u32,
    pub label: String,
    pub confidence: f64,
    pub bbox: BBox,
}

impl OverlayItem {
    /// Caption such as `PLASTIC_BOTTLE 87.5%`
    pub fn caption(&self) -> String {
        format!("{} {:.1}%", self.label, self.confidence * 100.0)
    }

    pub fn color(&self) -> Rgb<u8> {
        PALETTE[self.class_id as usize % PALETTE.len()]
    }
}

/// Copy of `image` with every item's box outlined. Parts of a box outside
/// the image are clipped.
pub fn annotate(image: &RgbImage, items: &[OverlayItem]) -> RgbImage {
    let mut output = image.clone();
    for item in items {
        draw_box(&mut output, item.bbox, item.color());
    }
    output
}

fn draw_box(image: &mut RgbImage, bbox: BBox, color: Rgb<u8>) {
    let (x1, y1, x2, y2) = bbox.to_pixels();
    let max_x = image.width() as i32 - 1;
    let max_y = image.height() as i32 - 1;

    for y in y1.max(0)..=y2.min(max_y) {
        for x in x1.max(0)..=x2.min(max_x) {
            let on_edge = x - x1 < BOX_THICKNESS
                || x2 - x < BOX_THICKNESS
                || y - y1 < BOX_THICKNESS
                || y2 - y < BOX_THICKNESS;
            if on_edge {
                image.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}

/// Frame-level text lines
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Hud {
    pub fps: Option<f64>,
    pub object_count: usize,
    pub command: Option<Command>,
}

impl Hud {
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(3);
        if let Some(fps) = self.fps {
            lines.push(format!("FPS: {:.2}", fps));
        }
        lines.push(format!("Objetos detectados: {}", self.object_count));
        if let Some(command) = self.command {
            lines.push(format!("Comando: {}", command));
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caption() {
        let item = OverlayItem {
            class_id: 1,
            label: "PLASTIC_BOTTLE".into(),
            confidence: 0.875,
            bbox: BBox::new(0.0, 0.0, 1.0, 1.0),
        };
        assert_eq!(item.caption(), "PLASTIC_BOTTLE 87.5%");
    }

    #[test]
    fn test_annotate_outlines_boxes() {
        let frame = RgbImage::new(40, 40);
        let item = OverlayItem {
            class_id: 1,
            label: "PLASTIC".into(),
            confidence: 0.9,
            bbox: BBox::new(10.0, 10.0, 30.0, 30.0),
        };

        let annotated = annotate(&frame, std::slice::from_ref(&item));

        assert_eq!(*annotated.get_pixel(10, 20), item.color());
        assert_eq!(*annotated.get_pixel(30, 30), item.color());
        assert_eq!(*annotated.get_pixel(20, 20), Rgb([0, 0, 0]));
        assert_eq!(*annotated.get_pixel(5, 5), Rgb([0, 0, 0]));
        // The source frame is left untouched.
        assert_eq!(*frame.get_pixel(10, 20), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_annotate_clips_boxes_at_the_border() {
        let frame = RgbImage::new(20, 20);
        let item = OverlayItem {
            class_id: 0,
            label: "METAL".into(),
            confidence: 0.8,
            bbox: BBox::new(-10.0, 5.0, 50.0, 15.0),
        };

        let annotated = annotate(&frame, &[item.clone()]);

        // Only the top and bottom edges fall inside the frame.
        assert_eq!(*annotated.get_pixel(0, 5), item.color());
        assert_eq!(*annotated.get_pixel(19, 15), item.color());
        assert_eq!(*annotated.get_pixel(0, 10), Rgb([0, 0, 0]));
        assert_eq!(*annotated.get_pixel(19, 10), Rgb([0, 0, 0]));

        let outside = OverlayItem {
            bbox: BBox::new(100.0, 100.0, 120.0, 120.0),
            ..item
        };
        assert_eq!(annotate(&frame, &[outside]), frame);
    }

    #[test]
    fn test_hud_lines() {
        let hud = Hud {
            fps: Some(24.456),
            object_count: 2,
            command: Some(Command::Metal),
        };
        assert_eq!(
            hud.lines(),
            vec!["FPS: 24.46", "Objetos detectados: 2", "Comando: METAL"]
        );

        let idle = Hud::default();
        assert_eq!(idle.lines(), vec!["Objetos detectados: 0"]);
    }
}
