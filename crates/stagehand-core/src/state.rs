//! Cached editor-reported state.
//!
//! The editor owns the shape of its state payloads; this cache stores them
//! as an opaque key/value bag and only interprets the handful of keys the
//! registry surfaces as derived flags.

use crate::events::{editor_events, EditorEvent};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keys the registry knows how to derive flags from.
const KEY_IS_PLAYING: &str = "isPlaying";
const KEY_IS_COMPILING: &str = "isCompiling";
const KEY_ACTIVE_SCENE: &str = "activeScene";

/// Last-known editor state for one connection.
#[derive(Debug, Clone, Default)]
pub struct EditorStateCache {
    values: Map<String, Value>,
}

impl EditorStateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge an object payload into the bag, key by key. Non-object
    /// payloads are ignored — the cache never guesses at structure.
    pub fn merge(&mut self, payload: &Value) {
        if let Value::Object(map) = payload {
            for (k, v) in map {
                self.values.insert(k.clone(), v.clone());
            }
        }
    }

    /// Update the cache from an inbound editor event.
    pub fn apply_event(&mut self, event: &EditorEvent) {
        let Some(data) = &event.data else { return };

        match event.event_type.as_str() {
            editor_events::STATE_UPDATE => self.merge(data),
            // Some editor builds send the bare value rather than an object.
            editor_events::PLAY_MODE_CHANGED => match data {
                Value::Bool(playing) => {
                    self.values
                        .insert(KEY_IS_PLAYING.to_string(), Value::Bool(*playing));
                }
                other => self.merge(other),
            },
            editor_events::SCENE_OPENED => match data {
                Value::String(scene) => {
                    self.values
                        .insert(KEY_ACTIVE_SCENE.to_string(), Value::String(scene.clone()));
                }
                other => self.merge(other),
            },
            _ => {}
        }
    }

    /// Copy of the raw bag.
    pub fn snapshot(&self) -> Map<String, Value> {
        self.values.clone()
    }

    pub fn is_playing(&self) -> Option<bool> {
        self.values.get(KEY_IS_PLAYING).and_then(Value::as_bool)
    }

    pub fn is_compiling(&self) -> Option<bool> {
        self.values.get(KEY_IS_COMPILING).and_then(Value::as_bool)
    }

    pub fn active_scene(&self) -> Option<String> {
        self.values
            .get(KEY_ACTIVE_SCENE)
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    /// Flags derived from the bag, for status snapshots.
    pub fn derived(&self) -> DerivedEditorState {
        DerivedEditorState {
            is_playing: self.is_playing(),
            is_compiling: self.is_compiling(),
            active_scene: self.active_scene(),
        }
    }
}

/// The known flags, pulled out of the opaque bag for status queries.
/// `None` means the editor has not reported that key yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedEditorState {
    pub is_playing: Option<bool>,
    pub is_compiling: Option<bool>,
    pub active_scene: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(event_type: &str, data: Value) -> EditorEvent {
        EditorEvent {
            event_type: event_type.to_string(),
            data: Some(data),
            timestamp: None,
        }
    }

    #[test]
    fn test_state_update_merges_verbatim() {
        let mut cache = EditorStateCache::new();
        cache.apply_event(&event(
            editor_events::STATE_UPDATE,
            json!({"isPlaying": false, "isCompiling": true, "customKey": [1, 2]}),
        ));

        assert_eq!(cache.is_playing(), Some(false));
        assert_eq!(cache.is_compiling(), Some(true));
        // Unknown keys survive untouched.
        assert_eq!(cache.snapshot().get("customKey"), Some(&json!([1, 2])));
    }

    #[test]
    fn test_play_mode_changed_accepts_bare_bool() {
        let mut cache = EditorStateCache::new();
        cache.apply_event(&event(editor_events::PLAY_MODE_CHANGED, json!(true)));
        assert_eq!(cache.is_playing(), Some(true));

        cache.apply_event(&event(
            editor_events::PLAY_MODE_CHANGED,
            json!({"isPlaying": false}),
        ));
        assert_eq!(cache.is_playing(), Some(false));
    }

    #[test]
    fn test_scene_opened_sets_active_scene() {
        let mut cache = EditorStateCache::new();
        cache.apply_event(&event(editor_events::SCENE_OPENED, json!("Assets/Main.unity")));
        assert_eq!(cache.active_scene(), Some("Assets/Main.unity".to_string()));
    }

    #[test]
    fn test_unreported_flags_are_none() {
        let cache = EditorStateCache::new();
        assert_eq!(cache.derived(), DerivedEditorState::default());
    }

    #[test]
    fn test_hierarchy_changed_leaves_bag_untouched() {
        let mut cache = EditorStateCache::new();
        cache.apply_event(&event(editor_events::HIERARCHY_CHANGED, json!({"count": 3})));
        assert!(cache.snapshot().is_empty());
    }
}
