use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::scene::Scene;

/// Reserved subject key holding the photo reference instead of text.
pub const PHOTO_FIELD: &str = "photo";

/// A named card design: up to two scenes (front/back) plus the card's
/// logical pixel dimensions.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub front_design: Option<Scene>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub back_design: Option<Scene>,
    pub card_width_px: u32,
    pub card_height_px: u32,
}

impl Template {
    /// Card pixel size, falling back to a design's canvas when the explicit
    /// dimensions are absent from an older record.
    pub fn card_size(&self) -> (u32, u32) {
        if self.card_width_px > 0 && self.card_height_px > 0 {
            return (self.card_width_px, self.card_height_px);
        }
        if let Some(scene) = self.front_design.as_ref().or(self.back_design.as_ref()) {
            return (scene.width, scene.height);
        }
        (0, 0)
    }
}

/// Old store records wrap a design one extra level, e.g.
/// `frontDesign: {frontDesign: {...}}`. The wrapper never carries an
/// `objects` list itself, which is how it is told apart from a real scene.
/// Unwrapped on read; writes always emit the direct form.
pub fn unwrap_legacy_design<'a>(
    value: &'a serde_json::Value,
    field: &str,
) -> &'a serde_json::Value {
    match value.as_object() {
        Some(map) if map.contains_key(field) && !map.contains_key("objects") => &map[field],
        _ => value,
    }
}

fn parse_design(
    value: Option<serde_json::Value>,
    field: &'static str,
) -> Result<Option<Scene>, String> {
    let Some(value) = value else {
        return Ok(None);
    };
    let inner = unwrap_legacy_design(&value, field);
    if inner.is_null() {
        return Ok(None);
    }
    serde_json::from_value(inner.clone())
        .map(Some)
        .map_err(|e| format!("invalid {field}: {e}"))
}

impl<'de> Deserialize<'de> for Template {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Repr {
            #[serde(default)]
            name: String,
            #[serde(default)]
            front_design: Option<serde_json::Value>,
            #[serde(default)]
            back_design: Option<serde_json::Value>,
            #[serde(default)]
            card_width_px: u32,
            #[serde(default)]
            card_height_px: u32,
        }

        let repr = Repr::deserialize(deserializer)?;
        Ok(Self {
            name: repr.name,
            front_design: parse_design(repr.front_design, "frontDesign")
                .map_err(serde::de::Error::custom)?,
            back_design: parse_design(repr.back_design, "backDesign")
                .map_err(serde::de::Error::custom)?,
            card_width_px: repr.card_width_px,
            card_height_px: repr.card_height_px,
        })
    }
}

/// One subject's data: flat field-to-value map. A null or absent value means
/// the field has no data for this subject.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Subject(pub BTreeMap<String, Option<String>>);

impl Subject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.0.insert(key.into(), Some(value.into()));
        self
    }

    /// Field value, treating null entries the same as absent ones.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.0.get(key)?.as_deref()
    }

    pub fn photo_ref(&self) -> Option<&str> {
        self.field(PHOTO_FIELD)
    }
}
