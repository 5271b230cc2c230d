use super::canvas::{Canvas, Color};
use super::plugin::VisualizerPlugin;
use crate::audio::AudioFeatures;
use crate::eval::Evaluator;
use crate::params::ParamValue;
use crate::preset::Preset;

/// Script-driven point renderer.
///
/// Owns one evaluator and one preset. `init` runs once at initialize (and
/// again when the preset is swapped), `frame` every render, `beat` on beat
/// frames, and `point` once per point with the per-point tier reset in
/// between. The point script reads `i`/`idx`/`n`/`v` and writes `x`/`y`
/// in [-1, 1] plus `red`/`green`/`blue` in [0, 1].
pub struct SuperscopePlugin {
    preset: Preset,
    evaluator: Evaluator,
    width: f32,
    height: f32,
    frame_index: u64,
    ready: bool,
    trace: Vec<(f32, f32, Color)>,
}

impl SuperscopePlugin {
    pub fn new(preset: Preset) -> Self {
        let capacity = preset.points;
        Self {
            preset,
            evaluator: Evaluator::new(),
            width: 0.0,
            height: 0.0,
            frame_index: 0,
            ready: false,
            trace: Vec::with_capacity(capacity),
        }
    }

    pub fn preset(&self) -> &Preset {
        &self.preset
    }

    /// Swaps the preset; globals reset and `init` re-runs.
    pub fn set_preset(&mut self, preset: Preset) {
        self.trace = Vec::with_capacity(preset.points);
        self.preset = preset;
        self.evaluator.reset_globals();
        self.evaluator.clear_cache();
        if self.ready {
            self.run_init();
        }
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    fn run_init(&mut self) {
        self.evaluator
            .set_canvas_context(self.width as f64, self.height as f64);
        if !self.preset.init.is_empty() && !self.evaluator.execute(&self.preset.init) {
            log::warn!(
                "preset '{}' init failed: {}",
                self.preset.name,
                self.evaluator.last_error().unwrap_or("unknown")
            );
        }
    }

    fn waveform_sample(features: &AudioFeatures, index: usize, total: usize) -> f64 {
        if features.waveform.is_empty() || total == 0 {
            return 0.0;
        }
        let pos = index * features.waveform.len() / total;
        features.waveform[pos.min(features.waveform.len() - 1)] as f64
    }
}

impl VisualizerPlugin for SuperscopePlugin {
    fn name(&self) -> &str {
        "superscope"
    }

    fn initialize(&mut self, width: u32, height: u32) {
        self.width = width as f32;
        self.height = height as f32;
        self.ready = true;
        self.run_init();
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width as f32;
        self.height = height as f32;
        self.evaluator
            .set_canvas_context(width as f64, height as f64);
    }

    fn render_frame(&mut self, features: &AudioFeatures, canvas: &mut dyn Canvas) {
        self.evaluator.clear_per_frame_variables();
        self.evaluator
            .set_frame_context(features.time_seconds, self.frame_index);
        self.evaluator.set_audio_context(features);
        self.frame_index += 1;

        if !self.preset.frame.is_empty() {
            self.evaluator.execute(&self.preset.frame);
        }
        if features.beat && !self.preset.beat.is_empty() {
            self.evaluator.execute(&self.preset.beat);
        }

        canvas.clear(Color::BLACK);
        if self.preset.point.is_empty() {
            return;
        }
        let total = self.preset.points.max(2);
        let handle = match self.evaluator.compile(&self.preset.point) {
            Some(handle) => handle,
            None => {
                log::warn!(
                    "preset '{}' point script failed to compile: {}",
                    self.preset.name,
                    self.evaluator.last_error().unwrap_or("unknown")
                );
                return;
            }
        };

        // Frame-tier color defaults; point scripts may override per point.
        let base_red = resolved_or(&self.evaluator, "red", 1.0);
        let base_green = resolved_or(&self.evaluator, "green", 1.0);
        let base_blue = resolved_or(&self.evaluator, "blue", 1.0);

        self.trace.clear();
        for index in 0..total {
            self.evaluator.clear_per_point_variables();
            self.evaluator.set_point_context(index, total);
            self.evaluator
                .set_point_variable("v", Self::waveform_sample(features, index, total));
            self.evaluator.set_point_variable("x", 0.0);
            self.evaluator.set_point_variable("y", 0.0);
            self.evaluator.set_point_variable("red", base_red);
            self.evaluator.set_point_variable("green", base_green);
            self.evaluator.set_point_variable("blue", base_blue);

            self.evaluator.evaluate_compiled(&handle);

            let x = self.evaluator.get_variable("x").clamp(-1.0, 1.0);
            let y = self.evaluator.get_variable("y").clamp(-1.0, 1.0);
            let color = Color::from_unit_rgb(
                self.evaluator.get_variable("red"),
                self.evaluator.get_variable("green"),
                self.evaluator.get_variable("blue"),
            );

            // [-1, 1] space to pixels, y pointing up.
            let px = ((x + 1.0) * 0.5) as f32 * self.width;
            let py = ((1.0 - y) * 0.5) as f32 * self.height;
            self.trace.push((px, py, color));
        }
        // The last point's values must not shadow next frame's scripts.
        self.evaluator.clear_per_point_variables();

        for pair in self.trace.windows(2) {
            let (x0, y0, _) = pair[0];
            let (x1, y1, color) = pair[1];
            canvas.line(x0, y0, x1, y1, color);
        }
    }

    fn dispose(&mut self) {
        self.evaluator.clear_cache();
        self.trace.clear();
    }

    fn set_parameter(&mut self, name: &str, value: &ParamValue) {
        match name {
            "points" => {
                if let Some(n) = value.as_number() {
                    self.preset.points = (n.max(2.0) as usize).min(16_384);
                    self.trace = Vec::with_capacity(self.preset.points);
                }
            }
            "preset" => {
                if let Some(text) = value.as_text() {
                    self.set_preset(Preset::parse(text));
                }
            }
            _ => {}
        }
    }
}

fn resolved_or(evaluator: &Evaluator, name: &str, fallback: f64) -> f64 {
    if evaluator.has_variable(name) {
        evaluator.get_variable(name)
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::canvas::{DrawCall, RecordingCanvas};

    fn render_once(plugin: &mut SuperscopePlugin, features: &AudioFeatures) -> RecordingCanvas {
        let mut canvas = RecordingCanvas::new(200.0, 100.0);
        plugin.render_frame(features, &mut canvas);
        canvas
    }

    #[test]
    fn scope_preset_traces_the_waveform() {
        let mut plugin = SuperscopePlugin::new(Preset::default_scope());
        plugin.initialize(200, 100);

        let mut features = AudioFeatures::silent(8, 0);
        features.waveform = vec![0.0; 256];
        let canvas = render_once(&mut plugin, &features);

        let lines: Vec<_> = canvas
            .calls
            .iter()
            .filter(|c| matches!(c, DrawCall::Line(..)))
            .collect();
        // 256 points -> 255 segments.
        assert_eq!(lines.len(), 255);

        // Flat waveform at 0 -> horizontal mid-height trace spanning x.
        if let DrawCall::Line(x0, y0, _, _, _) = canvas.calls[1] {
            assert!((x0 - 0.0).abs() < 1e-3);
            assert!((y0 - 50.0).abs() < 1e-3);
        } else {
            panic!("expected Line");
        }
        if let DrawCall::Line(_, _, x1, _, _) = canvas.calls[canvas.calls.len() - 1] {
            assert!((x1 - 200.0).abs() < 1e-3);
        } else {
            panic!("expected Line");
        }
    }

    #[test]
    fn init_runs_once_and_persists_globals() {
        let preset = Preset::parse("[init]\nbase = 0.5;\n[point]\nx = i; y = base;\n");
        let mut plugin = SuperscopePlugin::new(preset);
        plugin.initialize(200, 100);
        assert_eq!(plugin.evaluator().get_variable("base"), 0.5);

        let features = AudioFeatures::silent(8, 8);
        render_once(&mut plugin, &features);
        render_once(&mut plugin, &features);
        assert_eq!(plugin.evaluator().get_variable("base"), 0.5);
    }

    #[test]
    fn frame_state_accumulates_but_point_state_does_not() {
        // spin accumulates across frames (global); y resets every point.
        let preset = Preset::parse(
            "[init]\nspin = 0;\n[frame]\nspin = spin + 1;\n[point]\ny = y + 1; x = i * 2 - 1;\n",
        );
        let mut plugin = SuperscopePlugin::new(preset);
        plugin.initialize(200, 100);

        let features = AudioFeatures::silent(8, 8);
        let canvas = render_once(&mut plugin, &features);
        render_once(&mut plugin, &features);
        assert_eq!(plugin.evaluator().get_variable("spin"), 2.0);

        // y seeded 0 per point, so y+1 = 1 for every point: all segments
        // sit at the same pixel row. A leak would stack them upward.
        let ys: Vec<f32> = canvas
            .calls
            .iter()
            .filter_map(|c| match c {
                DrawCall::Line(_, y0, _, y1, _) => Some((*y0, *y1)),
                _ => None,
            })
            .flat_map(|(a, b)| [a, b])
            .collect();
        assert!(!ys.is_empty());
        assert!(ys.iter().all(|&y| (y - ys[0]).abs() < 1e-3));
    }

    #[test]
    fn frame_scripts_never_see_the_last_points_values() {
        // x lives in the point tier only. If it lingered after the point
        // loop, the next frame's script would read the final point's x
        // (1.0 here) instead of 0.
        let preset = Preset::parse("[frame]\ncarry = x;\n[point]\nx = i * 2 - 1;\n");
        let mut plugin = SuperscopePlugin::new(preset);
        plugin.initialize(100, 100);

        let features = AudioFeatures::silent(8, 8);
        render_once(&mut plugin, &features);
        render_once(&mut plugin, &features);
        assert_eq!(plugin.evaluator().get_variable("carry"), 0.0);
        assert!(!plugin.evaluator().has_variable("x"));
    }

    #[test]
    fn beat_script_runs_only_on_beat_frames() {
        let preset =
            Preset::parse("[init]\nhits = 0;\n[beat]\nhits = hits + 1;\n[point]\nx = i;\n");
        let mut plugin = SuperscopePlugin::new(preset);
        plugin.initialize(100, 100);

        let mut quiet = AudioFeatures::silent(8, 8);
        let mut thump = AudioFeatures::silent(8, 8);
        thump.beat = true;

        render_once(&mut plugin, &quiet);
        render_once(&mut plugin, &thump);
        render_once(&mut plugin, &quiet);
        render_once(&mut plugin, &thump);
        assert_eq!(plugin.evaluator().get_variable("hits"), 2.0);

        quiet.beat = false;
        render_once(&mut plugin, &quiet);
        assert_eq!(plugin.evaluator().get_variable("hits"), 2.0);
    }

    #[test]
    fn point_colors_override_frame_defaults() {
        let preset = Preset::parse(
            "[frame]\nred = 0; green = 0; blue = 1;\n[point]\nx = i * 2 - 1; red = i;\n",
        );
        let mut plugin = SuperscopePlugin::new(preset);
        plugin.set_parameter("points", &ParamValue::Number(3.0));
        plugin.initialize(100, 100);

        let features = AudioFeatures::silent(8, 8);
        let canvas = render_once(&mut plugin, &features);
        let colors: Vec<Color> = canvas
            .calls
            .iter()
            .filter_map(|c| match c {
                DrawCall::Line(_, _, _, _, color) => Some(*color),
                _ => None,
            })
            .collect();
        assert_eq!(colors.len(), 2);
        // Segment color comes from its newer endpoint: i = 0.5 then 1.0.
        assert_eq!(colors[0].red(), 128);
        assert_eq!(colors[1].red(), 255);
        assert_eq!(colors[0].blue(), 255);
    }

    #[test]
    fn empty_point_script_draws_nothing_but_clears() {
        let mut plugin = SuperscopePlugin::new(Preset::parse("[frame]\nq = 1;\n"));
        plugin.initialize(100, 100);
        let features = AudioFeatures::silent(8, 8);
        let canvas = render_once(&mut plugin, &features);
        assert_eq!(canvas.calls, vec![DrawCall::Clear(Color::BLACK)]);
    }

    #[test]
    fn swapping_preset_reruns_init() {
        let mut plugin = SuperscopePlugin::new(Preset::default_scope());
        plugin.initialize(100, 100);
        plugin.set_preset(Preset::parse("[init]\nmark = 7;\n[point]\nx = i;\n"));
        assert_eq!(plugin.evaluator().get_variable("mark"), 7.0);
    }

    #[test]
    fn broken_point_script_fails_soft() {
        let mut plugin = SuperscopePlugin::new(Preset::parse("[point]\nx = (;\n"));
        plugin.initialize(100, 100);
        let features = AudioFeatures::silent(8, 8);
        let canvas = render_once(&mut plugin, &features);
        // Clear only; no draw calls, no panic.
        assert_eq!(canvas.calls.len(), 1);
    }
}
