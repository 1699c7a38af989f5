use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use crate::error::{CardpressError, CardpressResult};
use crate::scene::TextAlign;

/// Decoded photo in premultiplied RGBA8 form.
#[derive(Clone, Debug)]
pub struct PreparedPhoto {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel bytes in row-major premultiplied RGBA8.
    pub rgba8_premul: Arc<Vec<u8>>,
}

/// Supplies subject photos. `reference` holds whatever the subject's `photo`
/// field contains (a store-relative path for the file-backed source).
pub trait PhotoSource: Send + Sync {
    fn fetch(&self, reference: &str) -> CardpressResult<PreparedPhoto>;
}

/// Decode an encoded raster image (PNG, JPEG, ...) into premultiplied RGBA8.
pub fn decode_photo(bytes: &[u8]) -> CardpressResult<PreparedPhoto> {
    let dyn_img = image::load_from_memory(bytes).context("decode photo from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(PreparedPhoto {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

pub(crate) fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

/// Normalize and validate store-relative photo references.
///
/// The normalized result uses `/` separators, removes `.` segments, and
/// rejects absolute paths or parent traversals (`..`).
pub fn normalize_photo_ref(reference: &str) -> CardpressResult<String> {
    let s = reference.replace('\\', "/");
    if s.starts_with('/') {
        return Err(CardpressError::validation("photo paths must be relative"));
    }
    if s.is_empty() {
        return Err(CardpressError::validation("photo path must be non-empty"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(CardpressError::validation("photo paths must not contain '..'"));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(CardpressError::validation(
            "photo path must contain a file name",
        ));
    }

    Ok(out.join("/"))
}

/// Photo source reading encoded image files under a root directory.
#[derive(Clone, Debug)]
pub struct FilePhotoSource {
    root: PathBuf,
}

impl FilePhotoSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl PhotoSource for FilePhotoSource {
    fn fetch(&self, reference: &str) -> CardpressResult<PreparedPhoto> {
        let rel = normalize_photo_ref(reference)?;
        let path = self.root.join(rel);
        let bytes =
            std::fs::read(&path).with_context(|| format!("read photo '{}'", path.display()))?;
        decode_photo(&bytes)
    }
}

/// Raw font bytes keyed by family name. The first registered family doubles
/// as the default until one is set explicitly.
#[derive(Clone, Debug, Default)]
pub struct FontStore {
    families: BTreeMap<String, Arc<Vec<u8>>>,
    default_family: Option<Arc<Vec<u8>>>,
}

impl FontStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, family: impl Into<String>, bytes: Vec<u8>) {
        let bytes = Arc::new(bytes);
        if self.default_family.is_none() {
            self.default_family = Some(bytes.clone());
        }
        self.families.insert(family.into(), bytes);
    }

    pub fn register_file(
        &mut self,
        family: impl Into<String>,
        path: &Path,
    ) -> CardpressResult<()> {
        let bytes =
            std::fs::read(path).with_context(|| format!("read font '{}'", path.display()))?;
        self.register(family, bytes);
        Ok(())
    }

    pub fn set_default(&mut self, bytes: Vec<u8>) {
        self.default_family = Some(Arc::new(bytes));
    }

    pub fn set_default_file(&mut self, path: &Path) -> CardpressResult<()> {
        let bytes =
            std::fs::read(path).with_context(|| format!("read font '{}'", path.display()))?;
        self.set_default(bytes);
        Ok(())
    }

    /// Font bytes for a family, falling back to the default font when the
    /// family is unknown.
    pub fn resolve(&self, family: &str) -> CardpressResult<Arc<Vec<u8>>> {
        if let Some(bytes) = self.families.get(family) {
            return Ok(bytes.clone());
        }
        self.default_family.clone().ok_or_else(|| {
            CardpressError::validation(format!(
                "no font registered for family '{family}' and no default font set"
            ))
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// RGBA8 brush color used by Parley text layout.
pub struct TextBrushRgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// Stateful helper for building Parley text layouts from raw font bytes.
pub struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
}

impl Default for TextLayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayoutEngine {
    /// Construct a new layout engine with fresh Parley contexts.
    pub fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
        }
    }

    /// Shape and lay out plain text using provided font bytes and styling.
    /// Line breaking and horizontal alignment happen only when a wrap width
    /// is given; auto-width text stays on one line.
    pub fn layout_plain(
        &mut self,
        text: &str,
        font_bytes: &[u8],
        size_px: f32,
        weight: u16,
        brush: TextBrushRgba8,
        max_width_px: Option<f32>,
        align: TextAlign,
    ) -> CardpressResult<parley::Layout<TextBrushRgba8>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(CardpressError::validation(
                "text size_px must be finite and > 0",
            ));
        }

        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes.to_vec()), None);
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            CardpressError::validation("no font families registered from font bytes")
        })?;

        let family_name = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| CardpressError::validation("registered font family has no name"))?
            .to_string();

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family_name)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::FontWeight(
            parley::style::FontWeight::new(f32::from(weight)),
        ));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        if let Some(w) = max_width_px {
            layout.break_all_lines(Some(w));
            layout.align(
                Some(w),
                parley_alignment(align),
                parley::AlignmentOptions::default(),
            );
        } else {
            layout.break_all_lines(None);
        }

        Ok(layout)
    }
}

fn parley_alignment(align: TextAlign) -> parley::Alignment {
    match align {
        TextAlign::Left => parley::Alignment::Start,
        TextAlign::Center => parley::Alignment::Center,
        TextAlign::Right => parley::Alignment::End,
    }
}

/// A shaped text layout paired with the font bytes it was shaped against.
/// Glyph ids in the layout are only meaningful for this exact font blob.
#[derive(Clone)]
pub struct PreparedText {
    pub layout: Arc<parley::Layout<TextBrushRgba8>>,
    pub font_bytes: Arc<Vec<u8>>,
}

impl std::fmt::Debug for PreparedText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedText")
            .field("layout_ptr", &Arc::as_ptr(&self.layout))
            .field("font_bytes_len", &self.font_bytes.len())
            .finish()
    }
}

/// Measured box of a laid-out block of text: widest line advance by summed
/// line heights.
pub fn measure_layout(layout: &parley::Layout<TextBrushRgba8>) -> (f64, f64) {
    let mut w = 0.0f64;
    let mut h = 0.0f64;
    for line in layout.lines() {
        let m = line.metrics();
        w = w.max(f64::from(m.advance));
        h += f64::from(m.ascent + m.descent + m.leading);
    }
    (w, h)
}
