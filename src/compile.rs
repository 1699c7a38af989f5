use crate::assets::PhotoSource;
use crate::error::{CardpressError, CardpressResult};
use crate::extract::replace_placeholders;
use crate::photo_fit::{SlotGeometry, fit_photo, slot_geometry};
use crate::scene::{
    ImageNode, Node, NodeKind, OriginX, OriginY, Scene, node_at_mut, sibling_list_mut,
};
use crate::template::Subject;

/// How a compiled scene will be used. Preview keeps enough information to
/// undo the compilation exactly; batch output is final and may drop nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompileMode {
    Preview,
    Batch,
}

/// A scene with subject data substituted in, plus the journal needed to
/// reverse the substitution for preview use.
#[derive(Clone, Debug)]
pub struct CompiledScene {
    scene: Scene,
    journal: Journal,
    mode: CompileMode,
}

impl CompiledScene {
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn into_scene(self) -> Scene {
        self.scene
    }

    pub fn mode(&self) -> CompileMode {
        self.mode
    }

    /// Undo the compilation: drop the synthesized photo node, restore the
    /// slot's visibility and lock flags, and put every substituted text back.
    /// Only preview compilations keep the journal this needs.
    pub fn restore(&self) -> CardpressResult<Scene> {
        if self.mode == CompileMode::Batch {
            return Err(CardpressError::compile(
                "batch compilation is not reversible",
            ));
        }
        let mut scene = self.scene.clone();

        if let Some(photo) = &self.journal.photo {
            if let Some(siblings) = sibling_list_mut(&mut scene.nodes, &photo.parent_path) {
                if photo.synth_index < siblings.len() {
                    siblings.remove(photo.synth_index);
                }
            }
            if let Some(slot) = node_at_mut(&mut scene.nodes, &photo.slot_path) {
                slot.visible = photo.visible;
                slot.selectable = photo.selectable;
                slot.movable = photo.movable;
            }
        }

        for entry in &self.journal.texts {
            if let Some(node) = node_at_mut(&mut scene.nodes, &entry.path) {
                if let NodeKind::Text(text) = &mut node.kind {
                    text.text = entry.text.clone();
                }
                node.selectable = entry.selectable;
                node.movable = entry.movable;
            }
        }

        Ok(scene)
    }
}

#[derive(Clone, Debug, Default)]
struct Journal {
    texts: Vec<TextRestore>,
    photo: Option<PhotoRestore>,
}

#[derive(Clone, Debug)]
struct TextRestore {
    path: Vec<usize>,
    text: String,
    selectable: bool,
    movable: bool,
}

#[derive(Clone, Debug)]
struct PhotoRestore {
    slot_path: Vec<usize>,
    parent_path: Vec<usize>,
    synth_index: usize,
    visible: bool,
    selectable: bool,
    movable: bool,
}

/// Substitute subject data into a scene. The input is never mutated; the
/// returned [`CompiledScene`] owns an edited copy.
///
/// Text bindings resolve explicit keys first, then `{{key}}` placeholders in
/// the content; missing subject values substitute a visible `Sample <key>`
/// stand-in so previews are never mistaken for live data. The first photo
/// slot in paint order receives the subject's photo, cover-fitted; further
/// slots are left alone.
#[tracing::instrument(skip(scene, subject, photos))]
pub fn compile(
    scene: &Scene,
    subject: &Subject,
    photos: &dyn PhotoSource,
    mode: CompileMode,
) -> CardpressResult<CompiledScene> {
    let mut out = scene.clone();
    let mut journal = Journal::default();

    let mut path = Vec::new();
    substitute_texts(&mut out.nodes, subject, &mut journal.texts, &mut path);
    journal.photo = resolve_photo_slot(&mut out, subject, photos, mode);

    Ok(CompiledScene {
        scene: out,
        journal,
        mode,
    })
}

fn resolve_field(subject: &Subject, key: &str) -> String {
    match subject.field(key) {
        Some(value) => value.to_string(),
        None => format!("Sample {key}"),
    }
}

fn substitute_texts(
    nodes: &mut [Node],
    subject: &Subject,
    journal: &mut Vec<TextRestore>,
    path: &mut Vec<usize>,
) {
    for (idx, node) in nodes.iter_mut().enumerate() {
        path.push(idx);
        let explicit_key = node.binding_key().map(str::to_string);
        match &mut node.kind {
            NodeKind::Text(text) => {
                let (resolved, changed) = match explicit_key {
                    Some(key) => (resolve_field(subject, &key), true),
                    None => replace_placeholders(&text.text, |key| resolve_field(subject, key)),
                };
                if changed {
                    journal.push(TextRestore {
                        path: path.clone(),
                        text: std::mem::replace(&mut text.text, resolved),
                        selectable: node.selectable,
                        movable: node.movable,
                    });
                    node.selectable = false;
                    node.movable = false;
                }
            }
            NodeKind::Group(group) => {
                substitute_texts(&mut group.children, subject, journal, path);
            }
            _ => {}
        }
        path.pop();
    }
}

struct SlotFind {
    path: Vec<usize>,
    geometry: Option<SlotGeometry>,
}

fn find_first_photo_slot(nodes: &[Node], path: &mut Vec<usize>) -> Option<SlotFind> {
    for (idx, node) in nodes.iter().enumerate() {
        path.push(idx);
        if node.is_photo_slot() {
            let found = SlotFind {
                path: path.clone(),
                geometry: slot_geometry(node),
            };
            path.pop();
            return Some(found);
        }
        if let NodeKind::Group(group) = &node.kind {
            if let Some(found) = find_first_photo_slot(&group.children, path) {
                path.pop();
                return Some(found);
            }
        }
        path.pop();
    }
    None
}

struct AppliedPhoto {
    synth_index: usize,
    visible: bool,
    selectable: bool,
    movable: bool,
}

/// Mutate the slot's sibling list: hide (preview) or remove (batch) the slot
/// and append the fitted photo node, so it paints above its siblings in the
/// same coordinate space.
fn apply_photo(
    nodes: &mut Vec<Node>,
    path: &[usize],
    photo_node: Node,
    mode: CompileMode,
) -> Option<AppliedPhoto> {
    let (&idx, rest) = path.split_first()?;
    if !rest.is_empty() {
        let node = nodes.get_mut(idx)?;
        let NodeKind::Group(group) = &mut node.kind else {
            return None;
        };
        return apply_photo(&mut group.children, rest, photo_node, mode);
    }

    let slot = nodes.get_mut(idx)?;
    let applied = AppliedPhoto {
        synth_index: 0,
        visible: slot.visible,
        selectable: slot.selectable,
        movable: slot.movable,
    };
    match mode {
        CompileMode::Preview => {
            slot.visible = false;
            slot.selectable = false;
            slot.movable = false;
        }
        CompileMode::Batch => {
            nodes.remove(idx);
        }
    }
    nodes.push(photo_node);
    Some(AppliedPhoto {
        synth_index: nodes.len() - 1,
        ..applied
    })
}

fn resolve_photo_slot(
    scene: &mut Scene,
    subject: &Subject,
    photos: &dyn PhotoSource,
    mode: CompileMode,
) -> Option<PhotoRestore> {
    let mut walk_path = Vec::new();
    let found = find_first_photo_slot(&scene.nodes, &mut walk_path)?;

    let Some(geometry) = found.geometry else {
        tracing::warn!("photo slot has no usable geometry; leaving it as a placeholder");
        return None;
    };
    let reference = subject.photo_ref()?.to_string();

    let photo = match photos.fetch(&reference) {
        Ok(photo) => photo,
        Err(err) => {
            tracing::warn!("photo fetch failed for '{reference}': {err}");
            return None;
        }
    };
    let fit = match fit_photo(&geometry, photo.width, photo.height) {
        Ok(fit) => fit,
        Err(err) => {
            tracing::warn!("photo cannot be fitted for '{reference}': {err}");
            return None;
        }
    };

    let mut photo_node = Node::new(NodeKind::Image(ImageNode {
        width: f64::from(photo.width),
        height: f64::from(photo.height),
        src: Some(reference),
        clip: Some(fit.clip),
    }));
    photo_node.left = fit.center.x;
    photo_node.top = fit.center.y;
    photo_node.origin_x = OriginX::Center;
    photo_node.origin_y = OriginY::Center;
    photo_node.scale_x = fit.scale;
    photo_node.scale_y = fit.scale;
    photo_node.selectable = false;
    photo_node.movable = false;

    let parent_path = found.path[..found.path.len() - 1].to_vec();
    let applied = apply_photo(&mut scene.nodes, &found.path, photo_node, mode)?;

    match mode {
        CompileMode::Preview => Some(PhotoRestore {
            slot_path: found.path,
            parent_path,
            synth_index: applied.synth_index,
            visible: applied.visible,
            selectable: applied.selectable,
            movable: applied.movable,
        }),
        CompileMode::Batch => None,
    }
}
