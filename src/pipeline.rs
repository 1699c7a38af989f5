use crate::{
    assets::{FontStore, PhotoSource, TextLayoutEngine},
    compile::{CompileMode, compile},
    error::CardpressResult,
    plan::build_plan,
    render::{CardRaster, RenderBackend},
    scene::Scene,
    template::Subject,
};

/// Plan + rasterize one card face.
///
/// The scene is rendered as-is; run it through [`compile`] first if it still
/// contains placeholders or an unresolved photo slot.
pub fn render_card(
    scene: &Scene,
    photos: &dyn PhotoSource,
    fonts: &FontStore,
    text_engine: &mut TextLayoutEngine,
    backend: &mut dyn RenderBackend,
) -> CardpressResult<CardRaster> {
    let plan = build_plan(scene, photos, fonts, text_engine)?;
    backend.render_plan(&plan)
}

/// Compile a design against one subject and rasterize the result.
///
/// This is the batch path: compilation runs in [`CompileMode::Batch`], so the
/// placeholder slot is dropped rather than hidden.
pub fn render_subject_card(
    design: &Scene,
    subject: &Subject,
    photos: &dyn PhotoSource,
    fonts: &FontStore,
    text_engine: &mut TextLayoutEngine,
    backend: &mut dyn RenderBackend,
) -> CardpressResult<CardRaster> {
    let compiled = compile(design, subject, photos, CompileMode::Batch)?;
    render_card(compiled.scene(), photos, fonts, text_engine, backend)
}
