use perchd_core::config::{Orientation, StripConfig};

/// Pure seat geometry: maps pointer coordinates to seat indices and seat
/// indices to visual centers, in strip-local pixels. Cell size, padding, and
/// orientation are fixed at construction from the measured strip config.
#[derive(Debug, Clone)]
pub struct StripGeometry {
    orientation: Orientation,
    cell_width: f32,
    cell_height: f32,
    padding: f32,
}

impl StripGeometry {
    pub fn new(strip: &StripConfig) -> Self {
        Self {
            orientation: strip.orientation,
            cell_width: strip.cell_width,
            cell_height: strip.cell_height,
            padding: strip.padding,
        }
    }

    /// Resolve a pointer coordinate to a seat index, clamped to
    /// `[0, seat_count - 1]`. The major axis depends on orientation.
    pub fn seat_for_pointer(&self, x: f32, y: f32, seat_count: usize) -> usize {
        let raw = match self.orientation {
            Orientation::Horizontal => ((x - self.padding) / self.cell_width).floor(),
            Orientation::Vertical => ((y - self.padding) / self.cell_height).floor(),
        };
        if seat_count == 0 || raw <= 0.0 {
            return 0;
        }
        (raw as usize).min(seat_count - 1)
    }

    /// Midpoint of the given seat's cell, in strip-local coordinates.
    pub fn visual_center(&self, seat: usize) -> (f32, f32) {
        match self.orientation {
            Orientation::Horizontal => (
                self.padding + self.cell_width * seat as f32 + self.cell_width / 2.0,
                self.padding + self.cell_height / 2.0,
            ),
            Orientation::Vertical => (
                self.padding + self.cell_width / 2.0,
                self.padding + self.cell_height * seat as f32 + self.cell_height / 2.0,
            ),
        }
    }

    pub fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
        (a.0 - b.0).hypot(a.1 - b.1)
    }
}
