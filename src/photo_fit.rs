use crate::core::Point;
use crate::error::{CardpressError, CardpressResult};
use crate::scene::{ClipShape, Node, OriginX, OriginY};

/// A photo slot's rendered footprint, normalized to its center point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SlotGeometry {
    pub center: Point,
    /// Rendered width, local size times scale.
    pub width: f64,
    pub height: f64,
    pub circular: bool,
}

/// Resolve a slot node's rendered geometry. Returns `None` for nodes with no
/// intrinsic size (text, groups) or a degenerate rendered footprint; those
/// slots cannot receive a photo.
pub fn slot_geometry(node: &Node) -> Option<SlotGeometry> {
    let (local_w, local_h) = node.local_size()?;
    let width = local_w * node.scale_x;
    let height = local_h * node.scale_y;
    if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
        return None;
    }
    // Positions mean different points depending on the origin anchor. A
    // top-left anchor puts the center half a size further; a center anchor
    // is the center already.
    let cx = match node.origin_x {
        OriginX::Left => node.left + width / 2.0,
        OriginX::Center => node.left,
    };
    let cy = match node.origin_y {
        OriginY::Top => node.top + height / 2.0,
        OriginY::Center => node.top,
    };
    Some(SlotGeometry {
        center: Point::new(cx, cy),
        width,
        height,
        circular: node.binding.as_ref().is_some_and(|b| b.circular),
    })
}

/// Placement for a photo covering a slot: center position, uniform scale,
/// and the clip shape in the photo's own pre-scale coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhotoFit {
    pub center: Point,
    pub scale: f64,
    pub clip: ClipShape,
}

/// Cover-fit a photo into a slot: the photo fills the slot entirely and the
/// overflow is clipped away, never letterboxed. The clip shape is divided by
/// the scale because it applies before the photo's own scale transform.
pub fn fit_photo(slot: &SlotGeometry, image_w: u32, image_h: u32) -> CardpressResult<PhotoFit> {
    if image_w == 0 || image_h == 0 {
        return Err(CardpressError::compile("photo has zero pixel dimensions"));
    }
    let scale = f64::max(slot.width / image_w as f64, slot.height / image_h as f64);
    let clip = if slot.circular {
        ClipShape::Circle {
            radius: (slot.width / 2.0) / scale,
        }
    } else {
        ClipShape::Rect {
            width: slot.width / scale,
            height: slot.height / scale,
        }
    };
    Ok(PhotoFit {
        center: slot.center,
        scale,
        clip,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Binding, NodeKind, RectNode};

    fn slot_node(width: f64, height: f64, circular: bool) -> Node {
        let mut node = Node::new(NodeKind::Rect(RectNode {
            width,
            height,
            ..RectNode::default()
        }));
        node.binding = Some(Binding {
            key: None,
            photo_slot: true,
            circular,
        });
        node
    }

    #[test]
    fn circular_slot_matching_image_keeps_scale_one() {
        let mut node = slot_node(150.0, 150.0, true);
        node.left = 100.0;
        node.top = 40.0;
        let slot = slot_geometry(&node).unwrap();
        assert_eq!(slot.center, Point::new(175.0, 115.0));

        let fit = fit_photo(&slot, 150, 150).unwrap();
        assert_eq!(fit.scale, 1.0);
        assert_eq!(fit.clip, ClipShape::Circle { radius: 75.0 });
    }

    #[test]
    fn cover_fit_downscales_a_larger_image() {
        let slot = slot_geometry(&slot_node(150.0, 150.0, true)).unwrap();
        let fit = fit_photo(&slot, 300, 300).unwrap();
        assert_eq!(fit.scale, 0.5);
        assert_eq!(fit.clip, ClipShape::Circle { radius: 150.0 });
    }

    #[test]
    fn wide_slot_with_small_image_scales_to_cover() {
        let slot = slot_geometry(&slot_node(200.0, 100.0, false)).unwrap();
        let fit = fit_photo(&slot, 100, 100).unwrap();
        assert_eq!(fit.scale, 2.0);
        assert_eq!(
            fit.clip,
            ClipShape::Rect {
                width: 100.0,
                height: 50.0
            }
        );
    }

    #[test]
    fn center_normalization_depends_on_origin_anchor() {
        let mut top_left = slot_node(100.0, 60.0, false);
        top_left.left = 10.0;
        top_left.top = 20.0;
        top_left.scale_x = 2.0;
        let slot = slot_geometry(&top_left).unwrap();
        assert_eq!(slot.center, Point::new(110.0, 50.0));
        assert_eq!((slot.width, slot.height), (200.0, 60.0));

        let mut centered = slot_node(100.0, 60.0, false);
        centered.left = 10.0;
        centered.top = 20.0;
        centered.origin_x = OriginX::Center;
        centered.origin_y = OriginY::Center;
        let slot = slot_geometry(&centered).unwrap();
        assert_eq!(slot.center, Point::new(10.0, 20.0));
    }

    #[test]
    fn degenerate_slots_and_images_are_rejected() {
        assert!(slot_geometry(&slot_node(0.0, 150.0, false)).is_none());

        let mut text = Node::new(NodeKind::Text(Default::default()));
        text.binding = Some(Binding {
            photo_slot: true,
            ..Binding::default()
        });
        assert!(slot_geometry(&text).is_none());

        let slot = slot_geometry(&slot_node(150.0, 150.0, false)).unwrap();
        assert!(fit_photo(&slot, 0, 10).is_err());
    }
}
