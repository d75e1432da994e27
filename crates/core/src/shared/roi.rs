use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RoiError {
    #[error("ROI must be given as x,y,width,height, got '{0}'")]
    Malformed(String),
    #[error("ROI width and height must be positive, got {width}x{height}")]
    Empty { width: u32, height: u32 },
    #[error("ROI {roi} lies outside the {frame_width}x{frame_height} frame")]
    OutsideFrame {
        roi: Roi,
        frame_width: u32,
        frame_height: u32,
    },
}

/// The operator-selected counting region, fixed for the whole run.
///
/// Fields are private so a ROI can only come from [`Roi::new`], which
/// rejects empty rectangles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roi {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

impl Roi {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Result<Self, RoiError> {
        if width == 0 || height == 0 {
            return Err(RoiError::Empty { width, height });
        }
        Ok(Self {
            x,
            y,
            width,
            height,
        })
    }

    /// The ROI covering a whole `width` × `height` frame.
    pub fn full_frame(width: u32, height: u32) -> Result<Self, RoiError> {
        Self::new(0, 0, width, height)
    }

    pub fn x(&self) -> u32 {
        self.x
    }

    pub fn y(&self) -> u32 {
        self.y
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Strict containment: points on the boundary are outside.
    pub fn contains_strict(&self, px: f64, py: f64) -> bool {
        let left = self.x as f64;
        let top = self.y as f64;
        let right = left + self.width as f64;
        let bottom = top + self.height as f64;
        left < px && px < right && top < py && py < bottom
    }

    /// Checks that the ROI at least starts inside the frame.
    ///
    /// A ROI extending past the right/bottom edge is accepted; the part
    /// outside simply never contains a center.
    pub fn validate_for(&self, frame_width: u32, frame_height: u32) -> Result<(), RoiError> {
        if self.x >= frame_width || self.y >= frame_height {
            return Err(RoiError::OutsideFrame {
                roi: *self,
                frame_width,
                frame_height,
            });
        }
        Ok(())
    }
}

impl fmt::Display for Roi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}x{})",
            self.x, self.y, self.width, self.height
        )
    }
}

impl FromStr for Roi {
    type Err = RoiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .split(',')
            .map(|p| p.trim().parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| RoiError::Malformed(s.to_string()))?;
        match parts.as_slice() {
            [x, y, w, h] => Roi::new(*x, *y, *w, *h),
            _ => Err(RoiError::Malformed(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn roi(x: u32, y: u32, w: u32, h: u32) -> Roi {
        Roi::new(x, y, w, h).unwrap()
    }

    #[test]
    fn test_new_rejects_empty() {
        assert_eq!(
            Roi::new(0, 0, 0, 10),
            Err(RoiError::Empty {
                width: 0,
                height: 10
            })
        );
        assert!(Roi::new(5, 5, 10, 0).is_err());
    }

    #[rstest]
    #[case::center(50.0, 50.0, true)]
    #[case::just_inside_top_left(10.5, 20.5, true)]
    #[case::top_left_corner(10.0, 20.0, false)]
    #[case::left_edge(10.0, 50.0, false)]
    #[case::top_edge(50.0, 20.0, false)]
    #[case::right_edge(110.0, 50.0, false)]
    #[case::bottom_edge(50.0, 70.0, false)]
    #[case::bottom_right_corner(110.0, 70.0, false)]
    #[case::outside(200.0, 200.0, false)]
    fn test_contains_strict(#[case] px: f64, #[case] py: f64, #[case] expected: bool) {
        let r = roi(10, 20, 100, 50);
        assert_eq!(r.contains_strict(px, py), expected);
    }

    #[test]
    fn test_full_frame_excludes_frame_border() {
        let r = Roi::full_frame(640, 480).unwrap();
        assert!(r.contains_strict(320.0, 240.0));
        assert!(!r.contains_strict(0.0, 240.0));
        assert!(!r.contains_strict(640.0, 240.0));
    }

    #[test]
    fn test_parse() {
        assert_eq!("10,20,30,40".parse::<Roi>().unwrap(), roi(10, 20, 30, 40));
        assert_eq!(" 1, 2, 3, 4 ".parse::<Roi>().unwrap(), roi(1, 2, 3, 4));
    }

    #[rstest]
    #[case::too_few("1,2,3")]
    #[case::too_many("1,2,3,4,5")]
    #[case::negative("-1,2,3,4")]
    #[case::garbage("a,b,c,d")]
    fn test_parse_malformed(#[case] input: &str) {
        assert!(matches!(input.parse::<Roi>(), Err(RoiError::Malformed(_))));
    }

    #[test]
    fn test_parse_empty_size() {
        assert!(matches!(
            "1,2,0,4".parse::<Roi>(),
            Err(RoiError::Empty { .. })
        ));
    }

    #[test]
    fn test_validate_for_frame() {
        assert!(roi(0, 0, 100, 100).validate_for(640, 480).is_ok());
        assert!(roi(600, 400, 100, 100).validate_for(640, 480).is_ok());
        assert!(matches!(
            roi(640, 0, 10, 10).validate_for(640, 480),
            Err(RoiError::OutsideFrame { .. })
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(roi(1, 2, 3, 4).to_string(), "(1, 2, 3x4)");
    }
}
