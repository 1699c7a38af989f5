use std::sync::Arc;

use cardpress::{
    CardpressResult, NodeKind, PhotoSource, PreparedPhoto, Scene, Session, SessionMode, Side,
    Subject, Template,
};

struct SquarePhotos;

impl PhotoSource for SquarePhotos {
    fn fetch(&self, _reference: &str) -> CardpressResult<PreparedPhoto> {
        Ok(PreparedPhoto {
            width: 150,
            height: 150,
            rgba8_premul: Arc::new(vec![255u8; 150 * 150 * 4]),
        })
    }
}

fn two_sided_template() -> Template {
    serde_json::from_value(serde_json::json!({
        "name": "Staff Badge",
        "cardWidthPx": 638,
        "cardHeightPx": 1011,
        "frontDesign": {
            "width": 638,
            "height": 1011,
            "objects": [
                { "type": "text", "left": 40.0, "top": 60.0, "text": "{{name}}" },
                { "type": "image", "left": 244.0, "top": 200.0,
                  "width": 150.0, "height": 150.0,
                  "data": { "key": "photo", "isPhotoSlot": true, "isCircular": true } }
            ]
        },
        "backDesign": {
            "width": 638,
            "height": 1011,
            "objects": [
                { "type": "text", "left": 40.0, "top": 60.0, "text": "If found, return to" }
            ]
        }
    }))
    .unwrap()
}

fn open_session() -> Session {
    Session::new(Some(&two_sided_template()), Arc::new(SquarePhotos)).unwrap()
}

fn retitle(label: &str) -> impl Fn(&mut Scene) + '_ {
    move |scene: &mut Scene| {
        if let NodeKind::Text(t) = &mut scene.nodes[0].kind {
            t.text = label.to_string();
        }
    }
}

fn first_text(scene: &Scene) -> &str {
    match &scene.nodes[0].kind {
        NodeKind::Text(t) => &t.text,
        other => panic!("expected text, got {other:?}"),
    }
}

#[test]
fn undo_all_then_redo_two_lands_on_the_second_edit() {
    let mut session = open_session();

    assert!(session.edit_scene(retitle("one")).unwrap());
    assert!(session.edit_scene(retitle("two")).unwrap());
    let after_second = serde_json::to_string(session.live_scene()).unwrap();
    assert!(session.edit_scene(retitle("three")).unwrap());
    assert_eq!(session.history_len(), 4);

    assert!(session.undo().unwrap());
    assert!(session.undo().unwrap());
    assert!(session.undo().unwrap());
    assert_eq!(first_text(session.live_scene()), "{{name}}");
    // A fourth undo is a silent no-op at the history edge.
    assert!(!session.undo().unwrap());

    assert!(session.redo().unwrap());
    assert!(session.redo().unwrap());
    assert_eq!(first_text(session.live_scene()), "two");
    assert_eq!(
        serde_json::to_string(session.live_scene()).unwrap(),
        after_second
    );
}

#[test]
fn a_new_edit_discards_the_redo_branch() {
    let mut session = open_session();
    session.edit_scene(retitle("one")).unwrap();
    session.edit_scene(retitle("two")).unwrap();
    session.undo().unwrap();

    session.edit_scene(retitle("fork")).unwrap();
    assert_eq!(session.history_len(), 3);
    assert!(!session.redo().unwrap());
    assert_eq!(first_text(session.live_scene()), "fork");
}

#[test]
fn switching_sides_round_trips_the_front_bit_for_bit() {
    let mut session = open_session();
    session.edit_scene(retitle("front edit")).unwrap();
    let front = serde_json::to_string(session.live_scene()).unwrap();
    let history_len = session.history_len();

    session.switch_side().unwrap();
    assert_eq!(session.active_side(), Side::Back);
    assert_eq!(first_text(session.live_scene()), "If found, return to");

    session.switch_side().unwrap();
    assert_eq!(session.active_side(), Side::Front);
    assert_eq!(serde_json::to_string(session.live_scene()).unwrap(), front);
    // Side switches do not append history entries.
    assert_eq!(session.history_len(), history_len);
}

#[test]
fn preview_locks_out_mutations_and_exit_restores_the_design() {
    let mut session = open_session();
    let before = serde_json::to_string(session.live_scene()).unwrap();

    let mut subject = Subject::new();
    subject.set("name", "Asha Rao").set("photo", "asha.png");
    assert!(session.enter_preview(&subject).unwrap());
    assert_eq!(session.mode(), SessionMode::Previewing);

    // The canvas shows the compiled scene, the live design is untouched.
    let canvas = serde_json::to_string(session.canvas_scene()).unwrap();
    assert!(canvas.contains("Asha Rao"));
    assert_eq!(serde_json::to_string(session.live_scene()).unwrap(), before);

    assert!(!session.edit_scene(retitle("blocked")).unwrap());
    assert!(!session.undo().unwrap());
    assert!(!session.redo().unwrap());
    assert!(!session.select_node(Some(vec![0])));

    assert!(session.exit_preview().unwrap());
    assert_eq!(session.mode(), SessionMode::Editing);
    assert_eq!(serde_json::to_string(session.live_scene()).unwrap(), before);
}

#[test]
fn preview_follows_a_side_switch() {
    let mut session = open_session();
    let mut subject = Subject::new();
    subject.set("name", "Asha Rao");
    session.enter_preview(&subject).unwrap();

    session.switch_side().unwrap();
    assert_eq!(session.active_side(), Side::Back);
    assert_eq!(session.mode(), SessionMode::Previewing);

    session.switch_side().unwrap();
    assert_eq!(session.active_side(), Side::Front);
    assert!(
        serde_json::to_string(session.canvas_scene())
            .unwrap()
            .contains("Asha Rao")
    );
}

#[test]
fn save_pairs_the_live_side_with_the_other_sides_snapshot() {
    let mut session = open_session();
    session.edit_scene(retitle("front edit")).unwrap();
    session.switch_side().unwrap();
    session.edit_scene(retitle("back edit")).unwrap();

    let payload = session.save().unwrap();
    assert_eq!(first_text(payload.front_design.as_ref().unwrap()), "front edit");
    assert_eq!(first_text(payload.back_design.as_ref().unwrap()), "back edit");
}

#[test]
fn save_during_preview_emits_the_uncompiled_design() {
    let mut session = open_session();
    let mut subject = Subject::new();
    subject.set("name", "Asha Rao");
    session.enter_preview(&subject).unwrap();

    let payload = session.save().unwrap();
    assert_eq!(first_text(payload.front_design.as_ref().unwrap()), "{{name}}");
}

#[test]
fn session_without_a_template_opens_empty() {
    let session = Session::new(None, Arc::new(SquarePhotos)).unwrap();
    assert!(session.live_scene().nodes.is_empty());
    assert_eq!(session.history_len(), 1);
    assert_eq!(session.mode(), SessionMode::Idle);
}
