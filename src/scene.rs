use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CardpressError, CardpressResult};

/// One side of a card design: an ordered list of nodes painted back-to-front
/// over a solid background. Node order is the z-order and survives
/// serialization round-trips.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default = "Color::white")]
    pub background_color: Color,
    #[serde(default, rename = "objects")]
    pub nodes: Vec<Node>,
}

impl Scene {
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            background_color: Color::white(),
            nodes: Vec::new(),
        }
    }

    /// Strict checks for the rendering path. Editing and extraction stay
    /// lenient; rasterization needs real dimensions and finite geometry.
    pub fn validate(&self) -> CardpressResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(CardpressError::validation(
                "scene width/height must be > 0",
            ));
        }
        validate_nodes(&self.nodes)
    }
}

fn validate_nodes(nodes: &[Node]) -> CardpressResult<()> {
    for node in nodes {
        if !(node.scale_x.is_finite() && node.scale_y.is_finite()) {
            return Err(CardpressError::validation("node scale must be finite"));
        }
        if !node.opacity.is_finite() {
            return Err(CardpressError::validation("node opacity must be finite"));
        }
        match &node.kind {
            NodeKind::Text(t) => {
                if !t.font_size.is_finite() || t.font_size <= 0.0 {
                    return Err(CardpressError::validation(
                        "text fontSize must be finite and > 0",
                    ));
                }
            }
            NodeKind::Rect(r) => {
                if r.width < 0.0 || r.height < 0.0 {
                    return Err(CardpressError::validation(
                        "rect width/height must be >= 0",
                    ));
                }
            }
            NodeKind::Circle(c) => {
                if c.radius < 0.0 {
                    return Err(CardpressError::validation("circle radius must be >= 0"));
                }
            }
            NodeKind::Image(i) => {
                if i.width < 0.0 || i.height < 0.0 {
                    return Err(CardpressError::validation(
                        "image width/height must be >= 0",
                    ));
                }
            }
            NodeKind::Group(g) => validate_nodes(&g.children)?,
        }
    }
    Ok(())
}

/// A single visual element. Common attributes live here; kind-specific ones
/// in [`NodeKind`]. Attributes the model does not know are carried opaquely
/// in `extra` so documents from newer editor revisions round-trip unharmed.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub left: f64,
    pub top: f64,
    pub origin_x: OriginX,
    pub origin_y: OriginY,
    pub scale_x: f64,
    pub scale_y: f64,
    /// Rotation around the origin anchor, degrees clockwise.
    pub rotation: f64,
    pub opacity: f64,
    pub visible: bool,
    pub selectable: bool,
    pub movable: bool,
    pub binding: Option<Binding>,
    pub kind: NodeKind,
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            origin_x: OriginX::Left,
            origin_y: OriginY::Top,
            scale_x: 1.0,
            scale_y: 1.0,
            rotation: 0.0,
            opacity: 1.0,
            visible: true,
            selectable: true,
            movable: true,
            binding: None,
            kind,
            extra: BTreeMap::new(),
        }
    }

    /// Unscaled content size, when the kind has one. Text measures at layout
    /// time and groups derive from children, so both return `None`.
    pub fn local_size(&self) -> Option<(f64, f64)> {
        match &self.kind {
            NodeKind::Rect(r) => Some((r.width, r.height)),
            NodeKind::Circle(c) => Some((c.radius * 2.0, c.radius * 2.0)),
            NodeKind::Image(i) => Some((i.width, i.height)),
            NodeKind::Text(_) | NodeKind::Group(_) => None,
        }
    }

    pub fn is_photo_slot(&self) -> bool {
        self.binding.as_ref().is_some_and(|b| b.photo_slot)
    }

    /// Explicit binding key, trimmed; empty keys count as unbound.
    pub fn binding_key(&self) -> Option<&str> {
        let key = self.binding.as_ref()?.key.as_deref()?.trim();
        if key.is_empty() { None } else { Some(key) }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OriginX {
    #[default]
    Left,
    Center,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OriginY {
    #[default]
    Top,
    Center,
}

/// Marks a node's content as data-driven. `key` binds text to a subject
/// field; `photo_slot` reserves the node for a fitted photo; `circular`
/// selects the circular clip variant for that photo.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, rename = "isPhotoSlot", skip_serializing_if = "is_false")]
    pub photo_slot: bool,
    #[serde(default, rename = "isCircular", skip_serializing_if = "is_false")]
    pub circular: bool,
}

fn is_false(b: &bool) -> bool {
    !b
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Text(TextNode),
    Image(ImageNode),
    Rect(RectNode),
    Circle(CircleNode),
    Group(GroupNode),
}

impl NodeKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeKind::Text(_) => "text",
            NodeKind::Image(_) => "image",
            NodeKind::Rect(_) => "rect",
            NodeKind::Circle(_) => "circle",
            NodeKind::Group(_) => "group",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextNode {
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_font_family")]
    pub font_family: String,
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default = "default_font_weight")]
    pub font_weight: u16,
    #[serde(default = "Color::black")]
    pub fill: Color,
    #[serde(default)]
    pub text_align: TextAlign,
    /// Wrapping width in local units. Absent means auto width, single line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub box_width: Option<f64>,
}

impl Default for TextNode {
    fn default() -> Self {
        Self {
            text: String::new(),
            font_family: default_font_family(),
            font_size: default_font_size(),
            font_weight: default_font_weight(),
            fill: Color::black(),
            text_align: TextAlign::Left,
            box_width: None,
        }
    }
}

fn default_font_family() -> String {
    "sans-serif".to_string()
}

fn default_font_size() -> f64 {
    16.0
}

fn default_font_weight() -> u16 {
    400
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageNode {
    /// Natural source width in pixels.
    #[serde(default)]
    pub width: f64,
    /// Natural source height in pixels.
    #[serde(default)]
    pub height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    /// Mask shape, centered, in the image's own local pre-scale coordinates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip: Option<ClipShape>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RectNode {
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default = "Color::black")]
    pub fill: Color,
}

impl Default for RectNode {
    fn default() -> Self {
        Self {
            width: 0.0,
            height: 0.0,
            fill: Color::black(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircleNode {
    #[serde(default)]
    pub radius: f64,
    #[serde(default = "Color::black")]
    pub fill: Color,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupNode {
    #[serde(default, rename = "objects")]
    pub children: Vec<Node>,
}

/// Centered clip shape in the owning image's local pre-scale space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClipShape {
    #[serde(rename_all = "camelCase")]
    Rect { width: f64, height: f64 },
    #[serde(rename_all = "camelCase")]
    Circle { radius: f64 },
}

/// Straight (non-premultiplied) color with 0..1 channels. Deserializes from
/// hex strings, `{r,g,b,a}` objects, or 3/4-element arrays; serializes as the
/// object form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub fn rgba(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    pub fn white() -> Self {
        Self::rgba(1.0, 1.0, 1.0, 1.0)
    }

    pub fn black() -> Self {
        Self::rgba(0.0, 0.0, 0.0, 1.0)
    }

    pub fn to_rgba8(self) -> [u8; 4] {
        fn to_u8(x: f64) -> u8 {
            (x.clamp(0.0, 1.0) * 255.0).round() as u8
        }
        [to_u8(self.r), to_u8(self.g), to_u8(self.b), to_u8(self.a)]
    }

    pub fn to_rgba8_premul(self) -> crate::core::Rgba8Premul {
        let [r, g, b, a] = self.to_rgba8();
        crate::core::Rgba8Premul::from_straight_rgba(r, g, b, a)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Hex(String),
            RgbaObj {
                r: f64,
                g: f64,
                b: f64,
                #[serde(default = "one")]
                a: f64,
            },
            Arr(Vec<f64>),
        }

        fn one() -> f64 {
            1.0
        }

        match Repr::deserialize(deserializer)? {
            Repr::Hex(s) => parse_hex(&s).map_err(serde::de::Error::custom),
            Repr::RgbaObj { r, g, b, a } => Ok(Self::rgba(r, g, b, a)),
            Repr::Arr(v) => {
                if v.len() == 3 {
                    Ok(Self::rgba(v[0], v[1], v[2], 1.0))
                } else if v.len() == 4 {
                    Ok(Self::rgba(v[0], v[1], v[2], v[3]))
                } else {
                    Err(serde::de::Error::custom(
                        "color array must have len 3 ([r,g,b]) or 4 ([r,g,b,a])",
                    ))
                }
            }
        }
    }
}

impl std::str::FromStr for Color {
    type Err = CardpressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex(s).map_err(CardpressError::validation)
    }
}

fn parse_hex(s: &str) -> Result<Color, String> {
    let s = s.trim();
    let s = s.strip_prefix('#').unwrap_or(s);

    fn hex_byte(pair: &str) -> Result<u8, String> {
        u8::from_str_radix(pair, 16).map_err(|_| format!("invalid hex byte \"{pair}\""))
    }

    let (r, g, b, a) = match s.len() {
        6 => {
            let r = hex_byte(&s[0..2])?;
            let g = hex_byte(&s[2..4])?;
            let b = hex_byte(&s[4..6])?;
            (r, g, b, 255)
        }
        8 => {
            let r = hex_byte(&s[0..2])?;
            let g = hex_byte(&s[2..4])?;
            let b = hex_byte(&s[4..6])?;
            let a = hex_byte(&s[6..8])?;
            (r, g, b, a)
        }
        _ => {
            return Err("hex color must be #RRGGBB or #RRGGBBAA (case-insensitive)".to_owned());
        }
    };

    Ok(Color::rgba(
        (r as f64) / 255.0,
        (g as f64) / 255.0,
        (b as f64) / 255.0,
        (a as f64) / 255.0,
    ))
}

// Node (de)serialization goes through a JSON map so attributes the model does
// not know survive as opaque extras. Known keys win over extras on write.

const COMMON_KEYS: &[&str] = &[
    "type",
    "left",
    "top",
    "originX",
    "originY",
    "scaleX",
    "scaleY",
    "rotation",
    "opacity",
    "visible",
    "selectable",
    "movable",
    "data",
];

const TEXT_KEYS: &[&str] = &[
    "text",
    "fontFamily",
    "fontSize",
    "fontWeight",
    "fill",
    "textAlign",
    "boxWidth",
];
const IMAGE_KEYS: &[&str] = &["width", "height", "src", "clip"];
const RECT_KEYS: &[&str] = &["width", "height", "fill"];
const CIRCLE_KEYS: &[&str] = &["radius", "fill"];
const GROUP_KEYS: &[&str] = &["objects"];

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommonRepr {
    #[serde(default)]
    left: f64,
    #[serde(default)]
    top: f64,
    #[serde(default)]
    origin_x: OriginX,
    #[serde(default)]
    origin_y: OriginY,
    #[serde(default = "one_f64")]
    scale_x: f64,
    #[serde(default = "one_f64")]
    scale_y: f64,
    #[serde(default)]
    rotation: f64,
    #[serde(default = "one_f64")]
    opacity: f64,
    #[serde(default = "true_bool")]
    visible: bool,
    #[serde(default = "true_bool")]
    selectable: bool,
    #[serde(default = "true_bool")]
    movable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Binding>,
}

fn one_f64() -> f64 {
    1.0
}

fn true_bool() -> bool {
    true
}

impl Serialize for Node {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let map = node_to_map(self).map_err(serde::ser::Error::custom)?;
        map.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let map = serde_json::Map::<String, serde_json::Value>::deserialize(deserializer)?;
        node_from_map(&map).map_err(serde::de::Error::custom)
    }
}

fn node_to_map(node: &Node) -> Result<serde_json::Map<String, serde_json::Value>, String> {
    fn as_object(
        value: Result<serde_json::Value, serde_json::Error>,
    ) -> Result<serde_json::Map<String, serde_json::Value>, String> {
        match value {
            Ok(serde_json::Value::Object(map)) => Ok(map),
            Ok(_) => Err("node representation must be an object".to_string()),
            Err(e) => Err(e.to_string()),
        }
    }

    let common = CommonRepr {
        left: node.left,
        top: node.top,
        origin_x: node.origin_x,
        origin_y: node.origin_y,
        scale_x: node.scale_x,
        scale_y: node.scale_y,
        rotation: node.rotation,
        opacity: node.opacity,
        visible: node.visible,
        selectable: node.selectable,
        movable: node.movable,
        data: node.binding.clone(),
    };

    let mut map = as_object(serde_json::to_value(&common))?;
    map.insert(
        "type".to_string(),
        serde_json::Value::String(node.kind.type_name().to_string()),
    );

    let kind_map = match &node.kind {
        NodeKind::Text(t) => as_object(serde_json::to_value(t))?,
        NodeKind::Image(i) => as_object(serde_json::to_value(i))?,
        NodeKind::Rect(r) => as_object(serde_json::to_value(r))?,
        NodeKind::Circle(c) => as_object(serde_json::to_value(c))?,
        NodeKind::Group(g) => as_object(serde_json::to_value(g))?,
    };
    map.extend(kind_map);

    for (k, v) in &node.extra {
        map.entry(k.clone()).or_insert_with(|| v.clone());
    }

    Ok(map)
}

fn node_from_map(map: &serde_json::Map<String, serde_json::Value>) -> Result<Node, String> {
    let ty = map
        .get("type")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| "node is missing a string \"type\" field".to_string())?;

    let value = serde_json::Value::Object(map.clone());
    let common: CommonRepr = serde_json::from_value(value.clone()).map_err(|e| e.to_string())?;

    let (kind, kind_keys): (NodeKind, &[&str]) = match ty {
        "text" => (
            NodeKind::Text(serde_json::from_value(value).map_err(|e| e.to_string())?),
            TEXT_KEYS,
        ),
        "image" => (
            NodeKind::Image(serde_json::from_value(value).map_err(|e| e.to_string())?),
            IMAGE_KEYS,
        ),
        "rect" => (
            NodeKind::Rect(serde_json::from_value(value).map_err(|e| e.to_string())?),
            RECT_KEYS,
        ),
        "circle" => (
            NodeKind::Circle(serde_json::from_value(value).map_err(|e| e.to_string())?),
            CIRCLE_KEYS,
        ),
        "group" => (
            NodeKind::Group(serde_json::from_value(value).map_err(|e| e.to_string())?),
            GROUP_KEYS,
        ),
        other => return Err(format!("unknown node type \"{other}\"")),
    };

    let mut extra = BTreeMap::new();
    for (k, v) in map {
        if COMMON_KEYS.contains(&k.as_str()) || kind_keys.contains(&k.as_str()) {
            continue;
        }
        extra.insert(k.clone(), v.clone());
    }

    Ok(Node {
        left: common.left,
        top: common.top,
        origin_x: common.origin_x,
        origin_y: common.origin_y,
        scale_x: common.scale_x,
        scale_y: common.scale_y,
        rotation: common.rotation,
        opacity: common.opacity,
        visible: common.visible,
        selectable: common.selectable,
        movable: common.movable,
        binding: common.data,
        kind,
        extra,
    })
}

/// Walk a nested node path (indices into `objects` lists, groups descended).
pub fn node_at<'a>(nodes: &'a [Node], path: &[usize]) -> Option<&'a Node> {
    let (&first, rest) = path.split_first()?;
    let node = nodes.get(first)?;
    if rest.is_empty() {
        return Some(node);
    }
    match &node.kind {
        NodeKind::Group(g) => node_at(&g.children, rest),
        _ => None,
    }
}

pub fn node_at_mut<'a>(nodes: &'a mut [Node], path: &[usize]) -> Option<&'a mut Node> {
    let (&first, rest) = path.split_first()?;
    let node = nodes.get_mut(first)?;
    if rest.is_empty() {
        return Some(node);
    }
    match &mut node.kind {
        NodeKind::Group(g) => node_at_mut(&mut g.children, rest),
        _ => None,
    }
}

/// The sibling list a path points into: the scene's own list for a top-level
/// path, otherwise the children of the innermost enclosing group.
pub fn sibling_list_mut<'a>(
    nodes: &'a mut Vec<Node>,
    parent_path: &[usize],
) -> Option<&'a mut Vec<Node>> {
    let Some((&first, rest)) = parent_path.split_first() else {
        return Some(nodes);
    };
    let node = nodes.get_mut(first)?;
    match &mut node.kind {
        NodeKind::Group(g) => sibling_list_mut(&mut g.children, rest),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bound_text(text: &str, key: Option<&str>) -> Node {
        let mut node = Node::new(NodeKind::Text(TextNode {
            text: text.to_string(),
            ..TextNode::default()
        }));
        if let Some(key) = key {
            node.binding = Some(Binding {
                key: Some(key.to_string()),
                ..Binding::default()
            });
        }
        node
    }

    fn photo_slot(circular: bool) -> Node {
        let mut node = Node::new(NodeKind::Rect(RectNode {
            width: 150.0,
            height: 150.0,
            fill: Color::black(),
        }));
        node.binding = Some(Binding {
            key: None,
            photo_slot: true,
            circular,
        });
        node
    }

    fn sample_scene() -> Scene {
        Scene {
            width: 600,
            height: 380,
            background_color: Color::white(),
            nodes: vec![
                bound_text("{{name}}", None),
                photo_slot(true),
                Node::new(NodeKind::Circle(CircleNode {
                    radius: 12.0,
                    fill: Color::rgba(0.2, 0.4, 0.6, 1.0),
                })),
            ],
        }
    }

    #[test]
    fn json_roundtrip_preserves_order_bindings_and_flags() {
        let scene = sample_scene();
        let s = serde_json::to_string_pretty(&scene).unwrap();
        let de: Scene = serde_json::from_str(&s).unwrap();
        assert_eq!(de, scene);
        assert_eq!(de.nodes[1].binding.as_ref().unwrap().photo_slot, true);
        assert_eq!(de.nodes[1].binding.as_ref().unwrap().circular, true);
        assert!(matches!(de.nodes[0].kind, NodeKind::Text(_)));
        assert!(matches!(de.nodes[2].kind, NodeKind::Circle(_)));
    }

    #[test]
    fn unknown_node_attributes_roundtrip_opaquely() {
        let doc = json!({
            "width": 100,
            "height": 50,
            "objects": [{
                "type": "rect",
                "width": 10.0,
                "height": 10.0,
                "shadow": {"blur": 4, "color": "#00000080"},
                "customTag": "keep-me"
            }]
        });
        let scene: Scene = serde_json::from_value(doc).unwrap();
        assert_eq!(scene.nodes[0].extra.len(), 2);

        let out = serde_json::to_value(&scene).unwrap();
        assert_eq!(out["objects"][0]["customTag"], json!("keep-me"));
        assert_eq!(out["objects"][0]["shadow"]["blur"], json!(4));
    }

    #[test]
    fn node_defaults_apply_when_fields_are_absent() {
        let node: Node = serde_json::from_value(json!({"type": "text"})).unwrap();
        assert_eq!(node.scale_x, 1.0);
        assert_eq!(node.opacity, 1.0);
        assert!(node.visible && node.selectable && node.movable);
        assert!(node.binding.is_none());
        let NodeKind::Text(t) = &node.kind else {
            panic!("expected text node");
        };
        assert_eq!(t.font_size, 16.0);
        assert!(t.box_width.is_none());
    }

    #[test]
    fn unknown_node_type_is_rejected() {
        let err = serde_json::from_value::<Node>(json!({"type": "sparkle"})).unwrap_err();
        assert!(err.to_string().contains("unknown node type"));
    }

    #[test]
    fn color_parses_hex_object_and_array() {
        let c: Color = serde_json::from_value(json!("#ff0000")).unwrap();
        assert_eq!(c, Color::rgba(1.0, 0.0, 0.0, 1.0));

        let c: Color = serde_json::from_value(json!("#0000ff80")).unwrap();
        assert!((c.b - 1.0).abs() < 1e-9);
        assert!((c.a - (128.0 / 255.0)).abs() < 1e-9);

        let c: Color = serde_json::from_value(json!({"r": 0.25, "g": 0.5, "b": 0.75})).unwrap();
        assert_eq!(c, Color::rgba(0.25, 0.5, 0.75, 1.0));

        let c: Color = serde_json::from_value(json!([0.1, 0.2, 0.3, 0.4])).unwrap();
        assert_eq!(c, Color::rgba(0.1, 0.2, 0.3, 0.4));
    }

    #[test]
    fn color_from_str_takes_hex_only() {
        let c: Color = "#336699cc".parse().unwrap();
        assert_eq!(c.to_rgba8(), [0x33, 0x66, 0x99, 0xcc]);
        assert!("336699".parse::<Color>().is_ok());
        assert!("not-a-color".parse::<Color>().is_err());
    }

    #[test]
    fn group_children_are_nodes_with_paths() {
        let mut group = Node::new(NodeKind::Group(GroupNode {
            children: vec![bound_text("inner", Some("field_a"))],
        }));
        group.left = 40.0;
        let scene = Scene {
            nodes: vec![photo_slot(false), group],
            ..Scene::empty(200, 200)
        };

        let inner = node_at(&scene.nodes, &[1, 0]).unwrap();
        assert_eq!(inner.binding_key(), Some("field_a"));
        assert!(node_at(&scene.nodes, &[0, 0]).is_none());
        assert!(node_at(&scene.nodes, &[9]).is_none());
    }

    #[test]
    fn validate_rejects_zero_canvas_and_bad_text_size() {
        let mut scene = sample_scene();
        scene.validate().unwrap();

        scene.width = 0;
        assert!(scene.validate().is_err());

        let mut scene = sample_scene();
        let NodeKind::Text(t) = &mut scene.nodes[0].kind else {
            panic!("expected text node");
        };
        t.font_size = 0.0;
        assert!(scene.validate().is_err());
    }
}
