use std::sync::Arc;

use crate::assets::PhotoSource;
use crate::compile::{CompileMode, CompiledScene, compile};
use crate::error::{CardpressError, CardpressResult};
use crate::scene::Scene;
use crate::template::{Subject, Template};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Front,
    Back,
}

impl Side {
    pub fn other(self) -> Self {
        match self {
            Side::Front => Side::Back,
            Side::Back => Side::Front,
        }
    }
}

/// Editor lifecycle states. `SwitchingSide` gates the mutate transition so
/// the load performed during a side switch cannot re-enter the history.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionMode {
    Idle,
    Editing,
    Previewing,
    SwitchingSide,
}

/// A scene frozen as its canonical JSON string. Snapshots are what the
/// history stack and the per-side save slots store; equality of snapshots is
/// bit-for-bit equality of the serialized form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SceneSnapshot(String);

impl SceneSnapshot {
    pub fn capture(scene: &Scene) -> CardpressResult<Self> {
        serde_json::to_string(scene)
            .map(Self)
            .map_err(|e| CardpressError::serde(e.to_string()))
    }

    pub fn restore(&self) -> CardpressResult<Scene> {
        serde_json::from_str(&self.0).map_err(|e| CardpressError::serde(e.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The design pair a save hands back to the caller.
#[derive(Clone, Debug, PartialEq)]
pub struct SavePayload {
    pub front_design: Option<Scene>,
    pub back_design: Option<Scene>,
}

struct PreviewState {
    compiled: CompiledScene,
    subject: Subject,
}

/// The editor's live model: one scene being edited, per-side last-saved
/// snapshots, a linear snapshot history with a cursor, and an optional
/// applied preview. The uncompiled scene is always retained; a preview only
/// changes what [`Session::canvas_scene`] shows.
pub struct Session {
    photos: Arc<dyn PhotoSource>,
    card_width: u32,
    card_height: u32,
    front_saved: Option<SceneSnapshot>,
    back_saved: Option<SceneSnapshot>,
    live: Scene,
    preview: Option<PreviewState>,
    active_side: Side,
    history: Vec<SceneSnapshot>,
    cursor: usize,
    mode: SessionMode,
    selection: Option<Vec<usize>>,
}

impl Session {
    /// Open a session on a template's designs (or empty scenes without one).
    /// The initial front scene seeds the history so undo can reach it.
    pub fn new(template: Option<&Template>, photos: Arc<dyn PhotoSource>) -> CardpressResult<Self> {
        let (card_width, card_height) = template.map(Template::card_size).unwrap_or((0, 0));
        let live = template
            .and_then(|t| t.front_design.clone())
            .unwrap_or_else(|| Scene::empty(card_width, card_height));
        let back = template.and_then(|t| t.back_design.as_ref());

        let front_saved = Some(SceneSnapshot::capture(&live)?);
        let back_saved = back.map(SceneSnapshot::capture).transpose()?;
        let history = vec![SceneSnapshot::capture(&live)?];

        Ok(Self {
            photos,
            card_width,
            card_height,
            front_saved,
            back_saved,
            live,
            preview: None,
            active_side: Side::Front,
            history,
            cursor: 0,
            mode: SessionMode::Idle,
            selection: None,
        })
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn active_side(&self) -> Side {
        self.active_side
    }

    /// What the canvas should show: the compiled preview while previewing,
    /// the live scene otherwise.
    pub fn canvas_scene(&self) -> &Scene {
        match &self.preview {
            Some(state) if self.mode == SessionMode::Previewing => state.compiled.scene(),
            _ => &self.live,
        }
    }

    /// The underlying uncompiled scene, regardless of preview state.
    pub fn live_scene(&self) -> &Scene {
        &self.live
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn selection(&self) -> Option<&[usize]> {
        self.selection.as_deref()
    }

    pub fn select_node(&mut self, path: Option<Vec<usize>>) -> bool {
        if !matches!(self.mode, SessionMode::Idle | SessionMode::Editing) {
            return false;
        }
        self.selection = path;
        true
    }

    /// Apply an edit to the live scene, then snapshot it: history is
    /// truncated at the cursor, the snapshot appended, and the active side's
    /// save slot updated. Rejected (returns `Ok(false)`, scene untouched)
    /// while previewing or switching sides.
    pub fn edit_scene<F>(&mut self, edit: F) -> CardpressResult<bool>
    where
        F: FnOnce(&mut Scene),
    {
        if !matches!(self.mode, SessionMode::Idle | SessionMode::Editing) {
            return Ok(false);
        }
        edit(&mut self.live);
        let snapshot = SceneSnapshot::capture(&self.live)?;
        self.history.truncate(self.cursor + 1);
        self.history.push(snapshot.clone());
        self.cursor += 1;
        *self.saved_slot_mut(self.active_side) = Some(snapshot);
        self.mode = SessionMode::Editing;
        Ok(true)
    }

    /// Step back one history entry. Silent no-op at the start of history or
    /// outside Idle/Editing.
    pub fn undo(&mut self) -> CardpressResult<bool> {
        if !matches!(self.mode, SessionMode::Idle | SessionMode::Editing) {
            return Ok(false);
        }
        if self.cursor == 0 {
            return Ok(false);
        }
        self.cursor -= 1;
        self.live = self.history[self.cursor].restore()?;
        self.selection = None;
        Ok(true)
    }

    /// Step forward one history entry. Silent no-op at the tail.
    pub fn redo(&mut self) -> CardpressResult<bool> {
        if !matches!(self.mode, SessionMode::Idle | SessionMode::Editing) {
            return Ok(false);
        }
        if self.cursor + 1 >= self.history.len() {
            return Ok(false);
        }
        self.cursor += 1;
        self.live = self.history[self.cursor].restore()?;
        self.selection = None;
        Ok(true)
    }

    /// Compile the live scene against a subject for display. The live scene
    /// itself is untouched; it is also written to the side's save slot so a
    /// later side switch restores it.
    pub fn enter_preview(&mut self, subject: &Subject) -> CardpressResult<bool> {
        if !matches!(self.mode, SessionMode::Idle | SessionMode::Editing) {
            return Ok(false);
        }
        let snapshot = SceneSnapshot::capture(&self.live)?;
        *self.saved_slot_mut(self.active_side) = Some(snapshot);

        let compiled = compile(&self.live, subject, self.photos.as_ref(), CompileMode::Preview)?;
        self.preview = Some(PreviewState {
            compiled,
            subject: subject.clone(),
        });
        self.selection = None;
        self.mode = SessionMode::Previewing;
        Ok(true)
    }

    /// Reverse the preview compilation and return to editing.
    pub fn exit_preview(&mut self) -> CardpressResult<bool> {
        if self.mode != SessionMode::Previewing {
            return Ok(false);
        }
        let Some(state) = self.preview.take() else {
            return Err(CardpressError::session("previewing with no preview state"));
        };
        self.live = state.compiled.restore()?;
        self.mode = SessionMode::Editing;
        Ok(true)
    }

    /// Swap the canvas to the other side. The outgoing side is snapshotted
    /// unless a preview is active (its state is transient and must not
    /// clobber the last good save). An active preview is re-applied to the
    /// incoming side with the same subject. No history entries are recorded.
    pub fn switch_side(&mut self) -> CardpressResult<()> {
        if self.mode == SessionMode::SwitchingSide {
            return Ok(());
        }
        let previous_preview = match self.mode {
            SessionMode::Previewing => self.preview.take(),
            _ => {
                let snapshot = SceneSnapshot::capture(&self.live)?;
                *self.saved_slot_mut(self.active_side) = Some(snapshot);
                None
            }
        };
        self.mode = SessionMode::SwitchingSide;

        let target = self.active_side.other();
        let loaded = match self.saved_slot(target) {
            Some(snapshot) => snapshot.restore(),
            None => Ok(Scene::empty(self.card_width, self.card_height)),
        };
        let scene = match loaded {
            Ok(scene) => scene,
            Err(err) => {
                self.mode = SessionMode::Idle;
                return Err(err);
            }
        };

        self.live = scene;
        self.active_side = target;
        self.selection = None;

        match previous_preview {
            Some(state) => {
                let compiled = match compile(
                    &self.live,
                    &state.subject,
                    self.photos.as_ref(),
                    CompileMode::Preview,
                ) {
                    Ok(compiled) => compiled,
                    Err(err) => {
                        self.mode = SessionMode::Idle;
                        return Err(err);
                    }
                };
                self.preview = Some(PreviewState {
                    compiled,
                    subject: state.subject,
                });
                self.mode = SessionMode::Previewing;
            }
            None => {
                self.mode = SessionMode::Idle;
            }
        }
        Ok(())
    }

    /// Assemble the design pair for persistence: the active side contributes
    /// its live (uncompiled) scene, the other side its last-saved snapshot.
    /// State and history are left alone.
    pub fn save(&self) -> CardpressResult<SavePayload> {
        let current = Some(self.live.clone());
        let other = self
            .saved_slot(self.active_side.other())
            .map(SceneSnapshot::restore)
            .transpose()?;
        Ok(match self.active_side {
            Side::Front => SavePayload {
                front_design: current,
                back_design: other,
            },
            Side::Back => SavePayload {
                front_design: other,
                back_design: current,
            },
        })
    }

    fn saved_slot(&self, side: Side) -> Option<&SceneSnapshot> {
        match side {
            Side::Front => self.front_saved.as_ref(),
            Side::Back => self.back_saved.as_ref(),
        }
    }

    fn saved_slot_mut(&mut self, side: Side) -> &mut Option<SceneSnapshot> {
        match side {
            Side::Front => &mut self.front_saved,
            Side::Back => &mut self.back_saved,
        }
    }
}
