pub mod scheduler;

pub use scheduler::PresetScheduler;

use crate::eval::parser::parse_script;
use anyhow::Context;
use std::path::Path;

/// Script-section validation failure.
#[derive(Debug, thiserror::Error)]
pub enum PresetError {
    #[error("invalid script in [{section}]: {message}")]
    Script { section: String, message: String },
    #[error("points must be at least 2, got {0}")]
    TooFewPoints(usize),
}

/// A superscope preset: four script sections that together define a
/// point-based audio-reactive drawing.
///
/// Text format: bracket-named sections, each followed by a script body.
/// Unknown sections are ignored; missing sections are empty scripts. An
/// optional `[meta]` section carries `name =` and `points =` lines.
///
/// ```text
/// [meta]
/// name = Ring
/// points = 256
///
/// [init]
/// spin = 0;
///
/// [point]
/// x = cos(i * 6.283 + spin) * 0.8;
/// y = sin(i * 6.283 + spin) * 0.8;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Preset {
    pub name: String,
    pub points: usize,
    pub init: String,
    pub frame: String,
    pub beat: String,
    pub point: String,
}

impl Default for Preset {
    fn default() -> Self {
        Self {
            name: String::new(),
            points: 512,
            init: String::new(),
            frame: String::new(),
            beat: String::new(),
            point: String::new(),
        }
    }
}

impl Preset {
    /// Parses preset text. Never fails: unreadable content just yields
    /// empty sections, which render nothing.
    pub fn parse(text: &str) -> Self {
        let mut preset = Preset::default();
        let mut section = String::new();
        let mut bodies: Vec<(String, String)> = Vec::new();

        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed.starts_with('[') && trimmed.ends_with(']') {
                section = trimmed[1..trimmed.len() - 1].trim().to_string();
                bodies.push((section.clone(), String::new()));
                continue;
            }
            if section == "meta" {
                if let Some((key, value)) = trimmed.split_once('=') {
                    match key.trim() {
                        "name" => preset.name = value.trim().to_string(),
                        "points" => {
                            if let Ok(n) = value.trim().parse::<usize>() {
                                preset.points = n;
                            }
                        }
                        _ => {}
                    }
                }
                continue;
            }
            if let Some((_, body)) = bodies.last_mut() {
                body.push_str(line);
                body.push('\n');
            }
        }

        for (name, body) in bodies {
            let body = body.trim().to_string();
            match name.as_str() {
                "init" => preset.init = body,
                "frame" => preset.frame = body,
                "beat" => preset.beat = body,
                "point" => preset.point = body,
                _ => {}
            }
        }

        preset
    }

    /// Syntax-checks every section and the point count.
    pub fn validate(&self) -> Result<(), PresetError> {
        if self.points < 2 {
            return Err(PresetError::TooFewPoints(self.points));
        }
        for (section, body) in [
            ("init", &self.init),
            ("frame", &self.frame),
            ("beat", &self.beat),
            ("point", &self.point),
        ] {
            if let Err(message) = parse_script(body) {
                return Err(PresetError::Script {
                    section: section.to_string(),
                    message,
                });
            }
        }
        Ok(())
    }

    /// Built-in oscilloscope: a horizontal waveform trace.
    pub fn default_scope() -> Self {
        Preset::parse(
            "[meta]\n\
             name = Scope\n\
             points = 256\n\
             [frame]\n\
             red = 0.2; green = 1; blue = 0.4;\n\
             [point]\n\
             x = i * 2 - 1;\n\
             y = v;\n",
        )
    }
}

/// Reads and parses a preset file.
pub fn load_preset(path: &Path) -> anyhow::Result<Preset> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read preset: {}", path.display()))?;
    let preset = Preset::parse(&text);
    Ok(preset)
}
