//! Cardpress is a template compilation and rendering engine for two-sided
//! printable cards.
//!
//! The public API is session-oriented:
//!
//! - Load a [`Template`] and open an editing [`Session`]
//! - Edit either side with undo/redo, preview a [`Subject`] non-destructively
//! - Batch-compile subjects into card rasters and tile them onto print sheets
#![forbid(unsafe_code)]

pub mod assets;
pub mod compile;
pub mod composite_cpu;
pub mod core;
pub mod error;
pub mod extract;
pub mod photo_fit;
pub mod pipeline;
pub mod plan;
pub mod render;
pub mod render_cpu;
pub mod scene;
pub mod session;
pub mod sheet;
pub mod template;

pub use assets::{FilePhotoSource, FontStore, PhotoSource, PreparedPhoto, TextLayoutEngine};
pub use compile::{CompileMode, CompiledScene, compile};
pub use core::{Affine, BezPath, Canvas, Point, Rect, Rgba8Premul, Vec2};
pub use error::{CardpressError, CardpressResult};
pub use extract::extract_fields;
pub use pipeline::{render_card, render_subject_card};
pub use render::{BackendKind, CardRaster, RenderBackend, RenderSettings, create_backend};
pub use scene::{Color, Node, NodeKind, Scene};
pub use session::{Session, SessionMode, Side};
pub use sheet::{SheetLayout, compose_sheets};
pub use template::{Subject, Template};
