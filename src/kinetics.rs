//! Hill-type dose-response functions and regulator name matching.

/// Hill activation with a basal floor.
///
/// Returns `leak + (1 - leak) * x^n / (K^n + x^n)`, so the result lies in
/// `[leak, 1]`. A non-positive `K` disables cooperativity and yields `leak`.
#[inline]
pub fn hill_activation(x: f64, k: f64, n: f64, leak: f64) -> f64 {
    if k <= 0.0 {
        return leak;
    }
    let x_pow_n = x.powf(n);
    let denom = k.powf(n) + x_pow_n;
    if denom == 0.0 {
        return leak;
    }
    leak + (1.0 - leak) * x_pow_n / denom
}

/// Hill repression, `1 / (1 + (x / K)^n)`. A non-positive `K` means no repression.
#[inline]
pub fn hill_repression(x: f64, k: f64, n: f64) -> f64 {
    if k <= 0.0 {
        return 1.0;
    }
    1.0 / (1.0 + (x / k).powf(n))
}

// Spellings seen in older circuits, normalized form -> canonical key.
const REGULATOR_SYNONYMS: &[(&str, &str)] = &[
    ("laci", "laci"),
    ("lacrepressor", "laci"),
    ("tetr", "tetr"),
    ("tetrepressor", "tetr"),
    ("ci", "ci"),
    ("lambdaci", "ci"),
    ("lambdacirepressor", "ci"),
    ("lambdac1", "ci"),
];

/// Key used to cross-reference regulator and protein names: alphanumerics
/// only, lowercased, with common repressor aliases folded together.
pub fn canonicalize_regulator_name(name: &str) -> String {
    let normalized: String = name
        .chars()
        .filter(|ch| ch.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect();
    REGULATOR_SYNONYMS
        .iter()
        .find(|(alias, _)| *alias == normalized)
        .map(|(_, key)| (*key).to_string())
        .unwrap_or(normalized)
}
