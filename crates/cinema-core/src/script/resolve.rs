//! Merge global settings with per-segment overrides into `SegmentSpec`s.

use serde::Serialize;

use super::{
    GlobalSettings, ScriptError, SegmentEntry, DEFAULT_ASPECT_RATIO, DEFAULT_DURATION_SECS,
    DEFAULT_FPS, DEFAULT_MODEL, DEFAULT_PERSON_GENERATION,
};

/// Fully resolved generation parameters for one segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterSet {
    #[serde(skip)]
    pub model: String,
    pub aspect_ratio: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    pub person_generation: String,
    pub generate_audio: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    pub fps: u32,
}

/// One unit of generation work. Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentSpec {
    /// 1-based position in the script; drives the output file name.
    pub index: usize,
    pub prompt: String,
    pub duration_secs: u32,
    pub params: ParameterSet,
}

impl SegmentSpec {
    /// Log identity, e.g. `Seg-03`.
    pub fn label(&self) -> String {
        segment_label(self.index)
    }
}

pub fn segment_label(index: usize) -> String {
    format!("Seg-{:02}", index)
}

/// Empty strings in scripts mean "not set".
fn non_empty(v: Option<&String>) -> Option<String> {
    v.map(|s| s.trim()).filter(|s| !s.is_empty()).map(str::to_string)
}

fn pick(over: Option<&String>, global: Option<&String>, default: &str) -> String {
    non_empty(over)
        .or_else(|| non_empty(global))
        .unwrap_or_else(|| default.to_string())
}

pub(super) fn resolve_segments(
    global: &GlobalSettings,
    entries: &[SegmentEntry],
) -> Result<Vec<SegmentSpec>, ScriptError> {
    if entries.is_empty() {
        return Err(ScriptError::NoSegments);
    }

    let model = pick(None, global.model.as_ref(), DEFAULT_MODEL);
    let mut specs = Vec::with_capacity(entries.len());
    for (pos, entry) in entries.iter().enumerate() {
        let index = pos + 1;
        let prompt = entry.prompt.trim();
        if prompt.is_empty() {
            return Err(ScriptError::EmptyPrompt(index));
        }
        let duration_secs = entry.duration.unwrap_or(DEFAULT_DURATION_SECS);
        if duration_secs == 0 {
            return Err(ScriptError::ZeroDuration(index));
        }
        // fps 0 in the global block means "unset", like an empty string.
        let fps = entry
            .fps
            .or(global.fps.filter(|f| *f > 0))
            .unwrap_or(DEFAULT_FPS);
        if fps == 0 {
            return Err(ScriptError::ZeroFps(index));
        }

        let params = ParameterSet {
            model: model.clone(),
            aspect_ratio: pick(
                entry.aspect_ratio.as_ref(),
                global.aspect_ratio.as_ref(),
                DEFAULT_ASPECT_RATIO,
            ),
            resolution: non_empty(entry.resolution.as_ref())
                .or_else(|| non_empty(global.resolution.as_ref())),
            person_generation: pick(
                entry.person_generation.as_ref(),
                global.person_generation.as_ref(),
                DEFAULT_PERSON_GENERATION,
            ),
            generate_audio: entry.generate_audio.unwrap_or(global.generate_audio),
            negative_prompt: non_empty(entry.negative_prompt.as_ref())
                .or_else(|| non_empty(global.negative_prompt.as_ref())),
            fps,
        };

        specs.push(SegmentSpec {
            index,
            prompt: prompt.to_string(),
            duration_secs,
            params,
        });
    }
    Ok(specs)
}
