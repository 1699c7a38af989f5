use std::sync::Arc;

use kurbo::Shape;

use crate::assets::{
    FontStore, PhotoSource, PreparedPhoto, PreparedText, TextBrushRgba8, TextLayoutEngine,
    measure_layout,
};
use crate::core::{Affine, BezPath, Canvas, Circle, Rect};
use crate::error::CardpressResult;
use crate::scene::{ClipShape, Node, NodeKind, OriginX, OriginY, Scene};

/// Backend-agnostic render plan for one card face.
///
/// Ops are in paint order (back to front). All coordinate work is done here;
/// a backend only replays transforms and fills.
#[derive(Clone, Debug)]
pub struct RenderPlan {
    pub canvas: Canvas,
    /// Straight (non-premultiplied) RGBA background.
    pub background: [u8; 4],
    pub ops: Vec<DrawOp>,
}

#[derive(Clone, Debug)]
/// Draw operation emitted by the planner.
pub enum DrawOp {
    FillPath {
        path: BezPath,
        transform: Affine,
        /// Straight RGBA fill color.
        color: [u8; 4],
        opacity: f32,
    },
    Photo {
        photo: PreparedPhoto,
        /// Maps photo pixel space onto the canvas.
        transform: Affine,
        /// Clip outline in photo pixel space.
        clip: Option<BezPath>,
        opacity: f32,
    },
    Text {
        text: PreparedText,
        transform: Affine,
        opacity: f32,
    },
}

/// Flatten a scene into draw ops.
///
/// Photos are fetched and decoded here; a missing or undecodable photo fails
/// the whole plan. Hidden nodes and nodes with zero effective opacity are
/// dropped. Group transforms and opacities compose onto their children.
#[tracing::instrument(skip(scene, photos, fonts, text_engine))]
pub fn build_plan(
    scene: &Scene,
    photos: &dyn PhotoSource,
    fonts: &FontStore,
    text_engine: &mut TextLayoutEngine,
) -> CardpressResult<RenderPlan> {
    scene.validate()?;
    let canvas = Canvas::new(scene.width, scene.height)?;
    let mut ops = Vec::new();
    plan_nodes(
        &scene.nodes,
        Affine::IDENTITY,
        1.0,
        photos,
        fonts,
        text_engine,
        &mut ops,
    )?;
    Ok(RenderPlan {
        canvas,
        background: scene.background_color.to_rgba8(),
        ops,
    })
}

#[allow(clippy::too_many_arguments)]
fn plan_nodes(
    nodes: &[Node],
    parent: Affine,
    parent_opacity: f32,
    photos: &dyn PhotoSource,
    fonts: &FontStore,
    text_engine: &mut TextLayoutEngine,
    ops: &mut Vec<DrawOp>,
) -> CardpressResult<()> {
    for node in nodes {
        if !node.visible {
            continue;
        }
        let opacity = (parent_opacity * node.opacity as f32).clamp(0.0, 1.0);
        if opacity <= 0.0 {
            continue;
        }

        match &node.kind {
            NodeKind::Rect(r) => {
                if !(r.width > 0.0 && r.height > 0.0) {
                    continue;
                }
                let transform = parent * node_affine(node, r.width, r.height);
                ops.push(DrawOp::FillPath {
                    path: Rect::new(0.0, 0.0, r.width, r.height).to_path(0.1),
                    transform,
                    color: r.fill.to_rgba8(),
                    opacity,
                });
            }
            NodeKind::Circle(c) => {
                if !(c.radius > 0.0) {
                    continue;
                }
                let d = c.radius * 2.0;
                let transform = parent * node_affine(node, d, d);
                ops.push(DrawOp::FillPath {
                    path: Circle::new((c.radius, c.radius), c.radius).to_path(0.1),
                    transform,
                    color: c.fill.to_rgba8(),
                    opacity,
                });
            }
            NodeKind::Text(t) => {
                if t.text.is_empty() {
                    continue;
                }
                let font_bytes = fonts.resolve(&t.font_family)?;
                let [r, g, b, a] = t.fill.to_rgba8();
                let brush = TextBrushRgba8 { r, g, b, a };
                let layout = text_engine.layout_plain(
                    &t.text,
                    &font_bytes,
                    t.font_size as f32,
                    t.font_weight,
                    brush,
                    t.box_width.map(|w| w as f32),
                    t.text_align,
                )?;
                let (measured_w, measured_h) = measure_layout(&layout);
                let local_w = t.box_width.unwrap_or(measured_w);
                let transform = parent * node_affine(node, local_w, measured_h);
                ops.push(DrawOp::Text {
                    text: PreparedText {
                        layout: Arc::new(layout),
                        font_bytes,
                    },
                    transform,
                    opacity,
                });
            }
            NodeKind::Image(img) => {
                let Some(src) = img.src.as_deref() else {
                    continue;
                };
                if !(img.width > 0.0 && img.height > 0.0) {
                    continue;
                }
                let photo = photos.fetch(src)?;
                let pw = f64::from(photo.width);
                let ph = f64::from(photo.height);
                // The op paints the photo's own pixel rect; fold the
                // pixel-to-local scale into the transform.
                let transform = parent
                    * node_affine(node, img.width, img.height)
                    * Affine::scale_non_uniform(img.width / pw, img.height / ph);
                let clip = img.clip.as_ref().map(|c| {
                    let local = clip_outline(c, img.width, img.height);
                    Affine::scale_non_uniform(pw / img.width, ph / img.height) * local
                });
                ops.push(DrawOp::Photo {
                    photo,
                    transform,
                    clip,
                    opacity,
                });
            }
            NodeKind::Group(g) => {
                // Groups have no local box, so origin anchors resolve to the
                // group's own position.
                let transform = parent * node_affine(node, 0.0, 0.0);
                plan_nodes(
                    &g.children,
                    transform,
                    opacity,
                    photos,
                    fonts,
                    text_engine,
                    ops,
                )?;
            }
        }
    }
    Ok(())
}

/// Local-to-parent transform of a node whose local box is `w` by `h`.
///
/// The origin anchors pick which point of the box lands on (left, top);
/// scale and rotation apply about that same point.
fn node_affine(node: &Node, w: f64, h: f64) -> Affine {
    let anchor_x = match node.origin_x {
        OriginX::Left => 0.0,
        OriginX::Center => w / 2.0,
    };
    let anchor_y = match node.origin_y {
        OriginY::Top => 0.0,
        OriginY::Center => h / 2.0,
    };
    Affine::translate((node.left, node.top))
        * Affine::rotate(node.rotation.to_radians())
        * Affine::scale_non_uniform(node.scale_x, node.scale_y)
        * Affine::translate((-anchor_x, -anchor_y))
}

/// Clip outline centered in a `w` by `h` box, in the same local units.
fn clip_outline(clip: &ClipShape, w: f64, h: f64) -> BezPath {
    match clip {
        ClipShape::Rect {
            width: cw,
            height: ch,
        } => Rect::new(
            (w - cw) / 2.0,
            (h - ch) / 2.0,
            (w + cw) / 2.0,
            (h + ch) / 2.0,
        )
        .to_path(0.1),
        ClipShape::Circle { radius } => Circle::new((w / 2.0, h / 2.0), *radius).to_path(0.1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Point;
    use crate::error::CardpressError;
    use crate::scene::{CircleNode, Color, GroupNode, ImageNode, RectNode};

    struct NoPhotos;

    impl PhotoSource for NoPhotos {
        fn fetch(&self, reference: &str) -> CardpressResult<PreparedPhoto> {
            Err(CardpressError::render(format!(
                "no photo for '{reference}'"
            )))
        }
    }

    struct OnePhoto {
        width: u32,
        height: u32,
    }

    impl PhotoSource for OnePhoto {
        fn fetch(&self, _reference: &str) -> CardpressResult<PreparedPhoto> {
            let n = (self.width * self.height * 4) as usize;
            Ok(PreparedPhoto {
                width: self.width,
                height: self.height,
                rgba8_premul: Arc::new(vec![255u8; n]),
            })
        }
    }

    fn rect_node(w: f64, h: f64) -> Node {
        Node::new(NodeKind::Rect(RectNode {
            width: w,
            height: h,
            fill: Color::rgba(1.0, 0.0, 0.0, 1.0),
        }))
    }

    #[test]
    fn hidden_and_fully_transparent_nodes_emit_nothing() {
        let mut scene = Scene::empty(100, 100);
        let mut hidden = rect_node(10.0, 10.0);
        hidden.visible = false;
        let mut clear = rect_node(10.0, 10.0);
        clear.opacity = 0.0;
        scene.nodes = vec![hidden, clear, rect_node(10.0, 10.0)];

        let plan = build_plan(
            &scene,
            &NoPhotos,
            &FontStore::new(),
            &mut TextLayoutEngine::new(),
        )
        .unwrap();
        assert_eq!(plan.ops.len(), 1);
        assert_eq!(plan.background, [255, 255, 255, 255]);
    }

    #[test]
    fn node_transform_anchors_scale_and_rotation_on_the_origin() {
        // Centered origin: the box center must stay fixed under scaling.
        let mut node = rect_node(20.0, 10.0);
        node.left = 50.0;
        node.top = 40.0;
        node.origin_x = OriginX::Center;
        node.origin_y = OriginY::Center;
        node.scale_x = 3.0;
        node.scale_y = 3.0;

        let a = node_affine(&node, 20.0, 10.0);
        let center = a * Point::new(10.0, 5.0);
        assert!((center.x - 50.0).abs() < 1e-9);
        assert!((center.y - 40.0).abs() < 1e-9);
        let corner = a * Point::new(0.0, 0.0);
        assert!((corner.x - 20.0).abs() < 1e-9);
        assert!((corner.y - 25.0).abs() < 1e-9);

        // Top-left origin: (left, top) is the fixed point instead.
        node.origin_x = OriginX::Left;
        node.origin_y = OriginY::Top;
        let a = node_affine(&node, 20.0, 10.0);
        let corner = a * Point::new(0.0, 0.0);
        assert!((corner.x - 50.0).abs() < 1e-9);
        assert!((corner.y - 40.0).abs() < 1e-9);
    }

    #[test]
    fn group_transform_and_opacity_compose_onto_children() {
        let mut child = rect_node(10.0, 10.0);
        child.left = 5.0;
        child.top = 0.0;
        child.opacity = 0.5;

        let mut group = Node::new(NodeKind::Group(GroupNode {
            children: vec![child],
        }));
        group.left = 100.0;
        group.top = 20.0;
        group.opacity = 0.5;

        let mut scene = Scene::empty(300, 300);
        scene.nodes = vec![group];

        let plan = build_plan(
            &scene,
            &NoPhotos,
            &FontStore::new(),
            &mut TextLayoutEngine::new(),
        )
        .unwrap();
        assert_eq!(plan.ops.len(), 1);
        let DrawOp::FillPath {
            transform, opacity, ..
        } = &plan.ops[0]
        else {
            panic!("expected a fill op");
        };
        assert!((*opacity - 0.25).abs() < 1e-6);
        let p = *transform * Point::new(0.0, 0.0);
        assert!((p.x - 105.0).abs() < 1e-9);
        assert!((p.y - 20.0).abs() < 1e-9);
    }

    #[test]
    fn photo_op_maps_pixels_into_the_declared_box_and_prescales_the_clip() {
        let mut image = Node::new(NodeKind::Image(ImageNode {
            width: 300.0,
            height: 300.0,
            src: Some("face.png".to_string()),
            clip: Some(ClipShape::Circle { radius: 150.0 }),
        }));
        image.left = 175.0;
        image.top = 115.0;
        image.origin_x = OriginX::Center;
        image.origin_y = OriginY::Center;
        image.scale_x = 0.5;
        image.scale_y = 0.5;

        let mut scene = Scene::empty(400, 400);
        scene.nodes = vec![image];

        let plan = build_plan(
            &scene,
            &OnePhoto {
                width: 300,
                height: 300,
            },
            &FontStore::new(),
            &mut TextLayoutEngine::new(),
        )
        .unwrap();
        let DrawOp::Photo {
            transform, clip, ..
        } = &plan.ops[0]
        else {
            panic!("expected a photo op");
        };
        // Photo pixel center lands on the node position, scaled by 0.5.
        let center = *transform * Point::new(150.0, 150.0);
        assert!((center.x - 175.0).abs() < 1e-9);
        assert!((center.y - 115.0).abs() < 1e-9);
        let corner = *transform * Point::new(0.0, 0.0);
        assert!((corner.x - 100.0).abs() < 1e-9);
        assert!((corner.y - 40.0).abs() < 1e-9);
        // Clip outline is in pixel space: a radius-150 circle about (150, 150).
        let bbox = clip.as_ref().unwrap().bounding_box();
        assert!((bbox.width() - 300.0).abs() < 0.5);
        assert!((bbox.center().x - 150.0).abs() < 0.5);
    }

    #[test]
    fn missing_photo_fails_the_plan() {
        let image = Node::new(NodeKind::Image(ImageNode {
            width: 10.0,
            height: 10.0,
            src: Some("gone.png".to_string()),
            clip: None,
        }));
        let mut scene = Scene::empty(100, 100);
        scene.nodes = vec![image];

        let err = build_plan(
            &scene,
            &NoPhotos,
            &FontStore::new(),
            &mut TextLayoutEngine::new(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("gone.png"));
    }

    #[test]
    fn image_without_source_is_skipped() {
        let image = Node::new(NodeKind::Image(ImageNode {
            width: 10.0,
            height: 10.0,
            src: None,
            clip: None,
        }));
        let mut scene = Scene::empty(100, 100);
        scene.nodes = vec![
            image,
            Node::new(NodeKind::Circle(CircleNode {
                radius: 5.0,
                fill: Color::black(),
            })),
        ];

        let plan = build_plan(
            &scene,
            &NoPhotos,
            &FontStore::new(),
            &mut TextLayoutEngine::new(),
        )
        .unwrap();
        assert_eq!(plan.ops.len(), 1);
        assert!(matches!(plan.ops[0], DrawOp::FillPath { .. }));
    }
}
