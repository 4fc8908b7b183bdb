use std::sync::LazyLock;

use regex::Regex;

static MODEL_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(MODEL [A-Z0-9]+)").expect("model pattern is valid"));
static ID_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(ID\.?\s*\d)").expect("id pattern is valid"));
static E_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(E[-\s]?\d+)").expect("e pattern is valid"));

/// Reduces a trade name to its model family, e.g. `"Model 3 Long Range"` to `"MODEL 3"`.
pub fn normalize_model(trade_name: Option<&str>) -> Option<String> {
    let name = trade_name?.trim().to_uppercase();

    if let Some(found) = MODEL_PREFIX.captures(&name).and_then(|c| c.get(1)) {
        return Some(found.as_str().to_string());
    }

    for pattern in [&*ID_PREFIX, &*E_PREFIX] {
        if let Some(found) = pattern.captures(&name).and_then(|c| c.get(1)) {
            return Some(found.as_str().replace(' ', ""));
        }
    }

    name.split_whitespace().next().map(str::to_string)
}
