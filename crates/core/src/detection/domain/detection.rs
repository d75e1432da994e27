use serde::Serialize;

/// One decoded candidate, in frame pixel units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    pub center_x: f64,
    pub center_y: f64,
    pub width: f64,
    pub height: f64,
    pub class_id: usize,
    pub confidence: f64,
}

impl Detection {
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_center(self.center_x, self.center_y, self.width, self.height)
    }

    pub fn center(&self) -> (f64, f64) {
        (self.center_x, self.center_y)
    }
}

/// Axis-aligned integer rectangle; `(x, y)` is the top-left corner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    /// Truncates toward zero, so a box may start at a negative coordinate
    /// when the detection hangs over the frame edge. Size is never negative.
    pub fn from_center(cx: f64, cy: f64, width: f64, height: f64) -> Self {
        let width = width.max(0.0);
        let height = height.max(0.0);
        Self {
            x: (cx - width / 2.0) as i32,
            y: (cy - height / 2.0) as i32,
            width: width as i32,
            height: height as i32,
        }
    }

    pub fn area(&self) -> f64 {
        self.width as f64 * self.height as f64
    }

    /// Jaccard index: intersection area over union area.
    ///
    /// Edges are computed in `i64`, so saturated boxes from garbage model
    /// output cannot overflow.
    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let (ax, ay) = (i64::from(self.x), i64::from(self.y));
        let (bx, by) = (i64::from(other.x), i64::from(other.y));
        let ix1 = ax.max(bx);
        let iy1 = ay.max(by);
        let ix2 = (ax + i64::from(self.width)).min(bx + i64::from(other.width));
        let iy2 = (ay + i64::from(self.height)).min(by + i64::from(other.height));

        let inter = (ix2 - ix1).max(0) as f64 * (iy2 - iy1).max(0) as f64;
        if inter == 0.0 {
            return 0.0;
        }
        inter / (self.area() + other.area() - inter)
    }
}
