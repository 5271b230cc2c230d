use super::NativeFn;
use std::collections::HashMap;

fn arg(args: &[f64], index: usize) -> f64 {
    args.get(index).copied().unwrap_or(0.0)
}

fn truthy(value: f64) -> bool {
    value != 0.0
}

/// Installs the default math function table every evaluator starts with.
/// Presets lean on these names, so they match the classic NS-EEL set.
pub fn install(table: &mut HashMap<String, NativeFn>) {
    let mut add = |name: &str, f: NativeFn| {
        table.insert(name.to_string(), f);
    };

    add("abs", Box::new(|a| arg(a, 0).abs()));
    add("sin", Box::new(|a| arg(a, 0).sin()));
    add("cos", Box::new(|a| arg(a, 0).cos()));
    add("tan", Box::new(|a| arg(a, 0).tan()));
    add("asin", Box::new(|a| arg(a, 0).asin()));
    add("acos", Box::new(|a| arg(a, 0).acos()));
    add("atan", Box::new(|a| arg(a, 0).atan()));
    add("atan2", Box::new(|a| arg(a, 0).atan2(arg(a, 1))));
    add("sqrt", Box::new(|a| arg(a, 0).max(0.0).sqrt()));
    add("sqr", Box::new(|a| arg(a, 0) * arg(a, 0)));
    add("pow", Box::new(|a| arg(a, 0).powf(arg(a, 1))));
    add("exp", Box::new(|a| arg(a, 0).exp()));
    add("log", Box::new(|a| safe_log(arg(a, 0), std::f64::consts::E)));
    add("log10", Box::new(|a| safe_log(arg(a, 0), 10.0)));
    add("floor", Box::new(|a| arg(a, 0).floor()));
    add("ceil", Box::new(|a| arg(a, 0).ceil()));
    add("min", Box::new(|a| arg(a, 0).min(arg(a, 1))));
    add("max", Box::new(|a| arg(a, 0).max(arg(a, 1))));
    add("sign", Box::new(|a| {
        let v = arg(a, 0);
        if v > 0.0 {
            1.0
        } else if v < 0.0 {
            -1.0
        } else {
            0.0
        }
    }));
    // Eagerly-evaluated conditional select.
    add("if", Box::new(|a| {
        if truthy(arg(a, 0)) {
            arg(a, 1)
        } else {
            arg(a, 2)
        }
    }));
    add("band", Box::new(|a| bool_to_f64(truthy(arg(a, 0)) && truthy(arg(a, 1)))));
    add("bor", Box::new(|a| bool_to_f64(truthy(arg(a, 0)) || truthy(arg(a, 1)))));
    add("bnot", Box::new(|a| bool_to_f64(!truthy(arg(a, 0)))));
    add("sigmoid", Box::new(|a| {
        let x = arg(a, 0);
        let constraint = arg(a, 1);
        let t = 1.0 + (-x * constraint.max(0.0)).exp();
        if t.abs() > f64::EPSILON {
            1.0 / t
        } else {
            0.0
        }
    }));
}

fn bool_to_f64(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

fn safe_log(value: f64, base: f64) -> f64 {
    if value > 0.0 {
        value.log(base)
    } else {
        0.0
    }
}
