use euclid::*;

/// Root window pixel coordinates.
pub struct XSpace;
pub type XPoint = Point2D<i32, XSpace>;
pub type XSize = Size2D<i32, XSpace>;
pub type ScreenBox = Box2D<i32, XSpace>;

/// Physical dimensions as reported by the monitor.
pub struct Millimeters;
pub type PhysicalSize = Size2D<u64, Millimeters>;

pub trait AsScreenBox {
    fn as_screen_box(&self) -> ScreenBox;
}

/// Box spanning `width` x `height` pixels from `(x, y)`.
pub fn screen_box(x: i32, y: i32, width: u32, height: u32) -> ScreenBox {
    let origin = XPoint::new(x, y);
    ScreenBox::new(origin, origin + XSize::new(width as i32, height as i32))
}

/// True when `b` covers no pixels, as for a disabled CRTC.
pub fn is_degenerate(b: &ScreenBox) -> bool {
    b.max.x <= b.min.x || b.max.y <= b.min.y
}

/// Smallest box containing every non-degenerate box in `boxes`.
pub fn bounding_box<I: IntoIterator<Item = ScreenBox>>(boxes: I) -> Option<ScreenBox> {
    boxes
        .into_iter()
        .filter(|b| !is_degenerate(b))
        .fold(None, |acc: Option<ScreenBox>, b| {
            Some(match acc {
                None => b,
                Some(acc) => ScreenBox::new(
                    XPoint::new(acc.min.x.min(b.min.x), acc.min.y.min(b.min.y)),
                    XPoint::new(acc.max.x.max(b.max.x), acc.max.y.max(b.max.y)),
                ),
            })
        })
}
