//! Generation scripts: JSON files describing global settings and segments.
//!
//! A script is parsed once, then resolved into immutable `SegmentSpec`s whose
//! parameters are fully merged (global defaults + per-segment overrides)
//! before anything is dispatched.

mod resolve;

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

pub use resolve::{segment_label, ParameterSet, SegmentSpec};

/// Model used when the script does not name one.
pub const DEFAULT_MODEL: &str = "veo-2.0-generate-001";
pub const DEFAULT_FPS: u32 = 24;
pub const DEFAULT_PERSON_GENERATION: &str = "allow_adult";
pub const DEFAULT_ASPECT_RATIO: &str = "16:9";
/// Segment duration in seconds when a segment omits it.
pub const DEFAULT_DURATION_SECS: u32 = 8;

/// Validation errors found while resolving a script.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ScriptError {
    #[error("script has no segments")]
    NoSegments,
    #[error("segment {0} has an empty prompt")]
    EmptyPrompt(usize),
    #[error("segment {0} has a zero duration")]
    ZeroDuration(usize),
    #[error("segment {0} resolves to fps 0")]
    ZeroFps(usize),
}

/// Settings shared by every segment unless overridden.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GlobalSettings {
    pub model: Option<String>,
    pub aspect_ratio: Option<String>,
    pub resolution: Option<String>,
    pub person_generation: Option<String>,
    pub generate_audio: bool,
    pub negative_prompt: Option<String>,
    pub fps: Option<u32>,
}

/// One entry of the `segments` array.
#[derive(Debug, Clone, Deserialize)]
pub struct SegmentEntry {
    pub prompt: String,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub aspect_ratio: Option<String>,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub person_generation: Option<String>,
    #[serde(default)]
    pub generate_audio: Option<bool>,
    #[serde(default)]
    pub negative_prompt: Option<String>,
    #[serde(default)]
    pub fps: Option<u32>,
}

/// Parsed script file.
#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    #[serde(default, rename = "global_settings")]
    pub global: GlobalSettings,
    #[serde(default)]
    pub segments: Vec<SegmentEntry>,
}

impl Script {
    /// Parse a script from JSON text.
    pub fn from_json(data: &str) -> Result<Self> {
        let script: Script = serde_json::from_str(data).context("invalid script JSON")?;
        Ok(script)
    }

    /// Resolve every segment into a dispatchable spec (1-based indices, input order).
    pub fn segment_specs(&self) -> std::result::Result<Vec<SegmentSpec>, ScriptError> {
        resolve::resolve_segments(&self.global, &self.segments)
    }
}

/// Load and parse a script file from disk.
pub fn load_script(path: &Path) -> Result<Script> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read script {}", path.display()))?;
    Script::from_json(&data).with_context(|| format!("failed to parse script {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_script() {
        let json = r#"{
            "global_settings": {
                "model": "veo-3.1-generate-preview",
                "aspect_ratio": "9:16",
                "resolution": "1080p",
                "person_generation": "allow_all",
                "generate_audio": true,
                "negative_prompt": "blurry",
                "fps": 30
            },
            "segments": [
                { "duration": 6, "prompt": "a lighthouse at dusk" },
                { "duration": 8, "prompt": "waves crash", "aspect_ratio": "16:9" }
            ]
        }"#;
        let script = Script::from_json(json).unwrap();
        assert_eq!(script.segments.len(), 2);
        assert_eq!(script.global.fps, Some(30));
        assert!(script.global.generate_audio);
        assert_eq!(script.segments[1].aspect_ratio.as_deref(), Some("16:9"));
    }

    #[test]
    fn missing_global_settings_is_allowed() {
        let script = Script::from_json(r#"{ "segments": [ { "prompt": "x" } ] }"#).unwrap();
        assert!(script.global.model.is_none());
        let specs = script.segment_specs().unwrap();
        assert_eq!(specs[0].params.model, DEFAULT_MODEL);
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(Script::from_json("{ not json").is_err());
    }

    #[test]
    fn load_script_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script.json");
        std::fs::write(&path, r#"{ "segments": [ { "prompt": "a" }, { "prompt": "b" } ] }"#)
            .unwrap();
        let script = load_script(&path).unwrap();
        assert_eq!(script.segments.len(), 2);
        assert!(load_script(&dir.path().join("missing.json")).is_err());
    }
}
