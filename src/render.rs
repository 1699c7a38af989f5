use crate::{error::CardpressResult, plan::RenderPlan};

#[derive(Clone, Debug)]
/// Rendered card pixels: RGBA8, row-major, `width * height * 4` bytes.
pub struct CardRaster {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub premultiplied: bool,
}

pub trait RenderBackend {
    fn render_plan(&mut self, plan: &RenderPlan) -> CardpressResult<CardRaster>;
}

#[derive(Clone, Copy, Debug)]
pub enum BackendKind {
    Cpu,
}

#[derive(Clone, Debug, Default)]
pub struct RenderSettings {
    /// Straight RGBA. Overrides the scene background when set.
    pub clear_rgba: Option<[u8; 4]>,
}

pub fn create_backend(
    kind: BackendKind,
    settings: &RenderSettings,
) -> CardpressResult<Box<dyn RenderBackend>> {
    match kind {
        BackendKind::Cpu => Ok(Box::new(crate::render_cpu::CpuBackend::new(
            settings.clone(),
        ))),
    }
}
