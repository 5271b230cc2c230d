pub mod builtins;
pub mod lexer;
pub mod parser;

pub use parser::{BinaryOp, Expr, Script, Stmt, UnaryOp};

use crate::audio::AudioFeatures;
use parser::parse_script;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// A registered native function callable from expressions.
pub type NativeFn = Box<dyn Fn(&[f64]) -> f64>;

/// Monotonic counters for one evaluator's lifetime. Reset only explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationStats {
    pub total_evaluations: u64,
    pub successful_evaluations: u64,
    pub failed_evaluations: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub total_eval_time: Duration,
}

impl EvaluationStats {
    pub fn average_eval_time(&self) -> Duration {
        if self.total_evaluations == 0 {
            Duration::ZERO
        } else {
            self.total_eval_time / self.total_evaluations as u32
        }
    }
}

/// Opaque pre-parsed script handle for hot paths (compile once per frame,
/// evaluate once per point). Keeps its source text so a cache clear only
/// costs a transparent recompile on next use.
#[derive(Debug, Clone)]
pub struct CompiledExpression {
    id: u64,
    source: String,
}

impl CompiledExpression {
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Three-tier variable namespace: point shadows frame shadows global.
#[derive(Debug, Default)]
struct VariableStore {
    global: HashMap<String, f64>,
    frame: HashMap<String, f64>,
    point: HashMap<String, f64>,
}

impl VariableStore {
    fn resolve(&self, name: &str) -> Option<f64> {
        self.point
            .get(name)
            .or_else(|| self.frame.get(name))
            .or_else(|| self.global.get(name))
            .copied()
    }

    /// Writes to the tier where the name currently resolves; names unknown
    /// to every tier are created as globals.
    fn assign(&mut self, name: &str, value: f64) {
        if let Some(slot) = self.point.get_mut(name) {
            *slot = value;
        } else if let Some(slot) = self.frame.get_mut(name) {
            *slot = value;
        } else {
            self.global.insert(name.to_string(), value);
        }
    }

    fn has(&self, name: &str) -> bool {
        self.point.contains_key(name)
            || self.frame.contains_key(name)
            || self.global.contains_key(name)
    }
}

/// NS-EEL style expression evaluator.
///
/// Each visualizer instance owns its own evaluator: the compiled cache,
/// stats, and variable tiers are never shared. All failures are absorbed
/// here and reported via [`Evaluator::last_error`] and the stats counters;
/// nothing crosses this boundary as a panic or `Err`.
pub struct Evaluator {
    vars: VariableStore,
    functions: HashMap<String, NativeFn>,
    cache: HashMap<String, Rc<Script>>,
    compiled: HashMap<u64, Rc<Script>>,
    handle_ids: HashMap<String, u64>,
    next_handle: u64,
    stats: EvaluationStats,
    last_error: Option<String>,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator {
    pub fn new() -> Self {
        let mut functions = HashMap::new();
        builtins::install(&mut functions);
        Self {
            vars: VariableStore::default(),
            functions,
            cache: HashMap::new(),
            compiled: HashMap::new(),
            handle_ids: HashMap::new(),
            next_handle: 1,
            stats: EvaluationStats::default(),
            last_error: None,
        }
    }

    // ---- evaluation -----------------------------------------------------

    /// Evaluates a single read-only expression against current variable
    /// state. Assignments and multi-statement scripts are a parse error
    /// here; use [`Evaluator::execute`] for those. Returns 0.0 on failure.
    pub fn evaluate(&mut self, text: &str) -> f64 {
        let start = Instant::now();
        self.stats.total_evaluations += 1;

        let script = match self.fetch_or_parse(text) {
            Ok(script) => script,
            Err(message) => return self.fail(message, start),
        };

        if !script.is_pure_expression() {
            return self.fail(
                "evaluate() takes a single read-only expression; use execute() to mutate"
                    .to_string(),
                start,
            );
        }

        let mut error = None;
        let value = match &script.stmts[0] {
            Stmt::Expr(expr) => eval_expr(expr, &self.functions, &self.vars, &mut error),
            Stmt::Assign(_, _) => unreachable!("pure expression cannot assign"),
        };

        match error {
            Some(message) => {
                self.last_error = Some(message);
                self.stats.failed_evaluations += 1;
            }
            None => self.stats.successful_evaluations += 1,
        }
        self.stats.total_eval_time += start.elapsed();
        value
    }

    /// Runs semicolon-separated statements in order for their side effects.
    /// Execution stops at the first failing statement; assignments made by
    /// earlier statements stay in place. Returns true when every statement
    /// succeeded.
    pub fn execute(&mut self, text: &str) -> bool {
        let start = Instant::now();
        self.stats.total_evaluations += 1;

        let script = match self.fetch_or_parse(text) {
            Ok(script) => script,
            Err(message) => {
                self.fail(message, start);
                return false;
            }
        };

        let mut error = None;
        run_script(&script, &self.functions, &mut self.vars, &mut error);

        let ok = error.is_none();
        match error {
            Some(message) => {
                self.last_error = Some(message);
                self.stats.failed_evaluations += 1;
            }
            None => self.stats.successful_evaluations += 1,
        }
        self.stats.total_eval_time += start.elapsed();
        ok
    }

    /// Parses a script once for repeated evaluation. Compiling the same
    /// source again returns the existing handle, so per-frame recompiles
    /// of an unchanged script keep the handle map at one entry. Returns
    /// `None` on a parse error (retrievable via [`Evaluator::last_error`]).
    pub fn compile(&mut self, text: &str) -> Option<CompiledExpression> {
        if let Some(&id) = self.handle_ids.get(text) {
            return Some(CompiledExpression {
                id,
                source: text.to_string(),
            });
        }
        match self.fetch_or_parse(text) {
            Ok(script) => {
                let id = self.next_handle;
                self.next_handle += 1;
                self.handle_ids.insert(text.to_string(), id);
                self.compiled.insert(id, script);
                Some(CompiledExpression {
                    id,
                    source: text.to_string(),
                })
            }
            Err(message) => {
                self.last_error = Some(message);
                None
            }
        }
    }

    /// Runs a compiled script and returns the value of its last statement.
    /// Compiled scripts may assign. A handle invalidated by a cache clear
    /// recompiles transparently from its retained source.
    pub fn evaluate_compiled(&mut self, handle: &CompiledExpression) -> f64 {
        let start = Instant::now();
        self.stats.total_evaluations += 1;

        let script = match self.compiled.get(&handle.id) {
            Some(script) => {
                self.stats.cache_hits += 1;
                script.clone()
            }
            None => match parse_script(&handle.source) {
                Ok(script) => {
                    self.stats.cache_misses += 1;
                    let script = Rc::new(script);
                    self.compiled.insert(handle.id, script.clone());
                    script
                }
                Err(message) => return self.fail(message, start),
            },
        };

        let mut error = None;
        let value = run_script(&script, &self.functions, &mut self.vars, &mut error);

        let value = match error {
            Some(message) => {
                self.last_error = Some(message);
                self.stats.failed_evaluations += 1;
                0.0
            }
            None => {
                self.stats.successful_evaluations += 1;
                value
            }
        };
        self.stats.total_eval_time += start.elapsed();
        value
    }

    fn fail(&mut self, message: String, start: Instant) -> f64 {
        log::debug!("eval error: {message}");
        self.last_error = Some(message);
        self.stats.failed_evaluations += 1;
        self.stats.total_eval_time += start.elapsed();
        0.0
    }

    fn fetch_or_parse(&mut self, text: &str) -> Result<Rc<Script>, String> {
        if let Some(script) = self.cache.get(text) {
            self.stats.cache_hits += 1;
            return Ok(script.clone());
        }
        self.stats.cache_misses += 1;
        let script = Rc::new(parse_script(text)?);
        self.cache.insert(text.to_string(), script.clone());
        Ok(script)
    }

    // ---- variables ------------------------------------------------------

    /// Writes through the tier resolution order (point > frame > global);
    /// unknown names become globals.
    pub fn set_variable(&mut self, name: &str, value: f64) {
        self.vars.assign(name, value);
    }

    /// Reads through the tier resolution order. Unknown names read as 0.0
    /// and are not an error.
    pub fn get_variable(&self, name: &str) -> f64 {
        self.vars.resolve(name).unwrap_or(0.0)
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.vars.has(name)
    }

    pub fn set_global_variable(&mut self, name: &str, value: f64) {
        self.vars.global.insert(name.to_string(), value);
    }

    pub fn set_frame_variable(&mut self, name: &str, value: f64) {
        self.vars.frame.insert(name.to_string(), value);
    }

    pub fn set_point_variable(&mut self, name: &str, value: f64) {
        self.vars.point.insert(name.to_string(), value);
    }

    /// Clears only the per-frame tier.
    pub fn clear_per_frame_variables(&mut self) {
        self.vars.frame.clear();
    }

    /// Clears only the per-point tier.
    pub fn clear_per_point_variables(&mut self) {
        self.vars.point.clear();
    }

    /// Globals persist across frames until this explicit reset.
    pub fn reset_globals(&mut self) {
        self.vars.global.clear();
    }

    // ---- well-known contexts -------------------------------------------

    /// Seeds `t` (seconds) and `frame` (tick index) into the frame tier.
    pub fn set_frame_context(&mut self, time_seconds: f64, frame_index: u64) {
        self.set_frame_variable("t", time_seconds);
        self.set_frame_variable("frame", frame_index as f64);
    }

    /// Seeds the audio feature names preset scripts hard-code.
    pub fn set_audio_context(&mut self, features: &AudioFeatures) {
        self.set_frame_variable("bass", features.bass as f64);
        self.set_frame_variable("mid", features.mid as f64);
        self.set_frame_variable("treb", features.treble as f64);
        self.set_frame_variable("rms", features.rms as f64);
        self.set_frame_variable("vol", features.volume as f64);
        self.set_frame_variable("energy", features.energy as f64);
        self.set_frame_variable("peak", features.peak as f64);
        self.set_frame_variable("beat", if features.beat { 1.0 } else { 0.0 });
        self.set_frame_variable("bpm", features.bpm as f64);
    }

    /// Seeds `w`/`h` into the global tier; they only change on resize.
    pub fn set_canvas_context(&mut self, width: f64, height: f64) {
        self.set_global_variable("w", width);
        self.set_global_variable("h", height);
    }

    /// Seeds the per-point tier for one point: `idx` (raw index), `n`
    /// (total), and `i` normalized to [0, 1].
    pub fn set_point_context(&mut self, index: usize, total: usize) {
        let i = if total > 1 {
            index as f64 / (total - 1) as f64
        } else {
            0.0
        };
        self.set_point_variable("idx", index as f64);
        self.set_point_variable("n", total as f64);
        self.set_point_variable("i", i);
    }

    // ---- functions ------------------------------------------------------

    /// Registers (or replaces) a native function. Any table mutation drops
    /// the whole compiled cache: a cached script may have parsed an
    /// identifier as a variable reference that the new name now captures.
    pub fn register_function<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&[f64]) -> f64 + 'static,
    {
        self.functions.insert(name.to_string(), Box::new(f));
        self.clear_cache();
    }

    pub fn unregister_function(&mut self, name: &str) -> bool {
        let removed = self.functions.remove(name).is_some();
        if removed {
            self.clear_cache();
        }
        removed
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    // ---- cache / stats / errors ----------------------------------------

    /// Drops every cached parse; handles keep their ids and recompile
    /// transparently on next use.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
        self.compiled.clear();
    }

    pub fn stats(&self) -> &EvaluationStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = EvaluationStats::default();
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn has_error(&self) -> bool {
        self.last_error.is_some()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }
}

fn run_script(
    script: &Script,
    functions: &HashMap<String, NativeFn>,
    vars: &mut VariableStore,
    error: &mut Option<String>,
) -> f64 {
    let mut last = 0.0;
    for stmt in &script.stmts {
        match stmt {
            Stmt::Assign(name, expr) => {
                let value = eval_expr(expr, functions, vars, error);
                if error.is_some() {
                    // The failing statement does not commit its write.
                    return 0.0;
                }
                vars.assign(name, value);
                last = value;
            }
            Stmt::Expr(expr) => {
                let value = eval_expr(expr, functions, vars, error);
                if error.is_some() {
                    return 0.0;
                }
                last = value;
            }
        }
    }
    last
}

fn eval_expr(
    expr: &Expr,
    functions: &HashMap<String, NativeFn>,
    vars: &VariableStore,
    error: &mut Option<String>,
) -> f64 {
    match expr {
        Expr::Number(value) => *value,
        Expr::Variable(name) => vars.resolve(name).unwrap_or(0.0),
        Expr::Unary(op, inner) => {
            let value = eval_expr(inner, functions, vars, error);
            match op {
                UnaryOp::Neg => -value,
                UnaryOp::Not => bool_to_f64(value == 0.0),
            }
        }
        Expr::Binary(op, lhs, rhs) => {
            let left = eval_expr(lhs, functions, vars, error);
            let right = eval_expr(rhs, functions, vars, error);
            match op {
                BinaryOp::Add => left + right,
                BinaryOp::Sub => left - right,
                BinaryOp::Mul => left * right,
                BinaryOp::Div => {
                    if right == 0.0 {
                        record_error(error, "Division by zero");
                        0.0
                    } else {
                        left / right
                    }
                }
                BinaryOp::Mod => {
                    if right == 0.0 {
                        record_error(error, "Modulo by zero");
                        0.0
                    } else {
                        left % right
                    }
                }
                BinaryOp::Eq => bool_to_f64(left == right),
                BinaryOp::Ne => bool_to_f64(left != right),
                BinaryOp::Lt => bool_to_f64(left < right),
                BinaryOp::Le => bool_to_f64(left <= right),
                BinaryOp::Gt => bool_to_f64(left > right),
                BinaryOp::Ge => bool_to_f64(left >= right),
                BinaryOp::And => bool_to_f64(left != 0.0 && right != 0.0),
                BinaryOp::Or => bool_to_f64(left != 0.0 || right != 0.0),
            }
        }
        Expr::Call(name, args) => match functions.get(name) {
            Some(f) => {
                let values: Vec<f64> = args
                    .iter()
                    .map(|a| eval_expr(a, functions, vars, error))
                    .collect();
                f(&values)
            }
            None => {
                record_error(error, &format!("Unknown function '{name}'"));
                0.0
            }
        },
    }
}

fn record_error(error: &mut Option<String>, message: &str) {
    if error.is_none() {
        *error = Some(message.to_string());
    }
}

fn bool_to_f64(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}
