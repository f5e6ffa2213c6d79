//! Logical key names → engine key tokens.

use std::collections::HashMap;
use std::sync::LazyLock;

use tapectl_core::TapeError;

use crate::script::ScriptLine;

/// One entry of the key table.
#[derive(Debug, Clone, Copy)]
pub struct KeySpec {
    /// Canonical name shown to callers.
    pub name: &'static str,
    /// Literal token the engine understands.
    pub token: &'static str,
    /// Extra spellings accepted for this key.
    pub aliases: &'static [&'static str],
}

/// The fixed key table.
pub const KEYS: &[KeySpec] = &[
    KeySpec { name: "Enter", token: "Enter", aliases: &["Return"] },
    KeySpec { name: "Tab", token: "Tab", aliases: &[] },
    KeySpec { name: "Space", token: "Space", aliases: &[] },
    KeySpec { name: "Backspace", token: "Backspace", aliases: &["Bksp"] },
    KeySpec { name: "Delete", token: "Delete", aliases: &["Del"] },
    KeySpec { name: "Escape", token: "Escape", aliases: &["Esc"] },
    KeySpec { name: "Up", token: "Up", aliases: &["ArrowUp"] },
    KeySpec { name: "Down", token: "Down", aliases: &["ArrowDown"] },
    KeySpec { name: "Left", token: "Left", aliases: &["ArrowLeft"] },
    KeySpec { name: "Right", token: "Right", aliases: &["ArrowRight"] },
    KeySpec { name: "Home", token: "Home", aliases: &[] },
    KeySpec { name: "End", token: "End", aliases: &[] },
    KeySpec { name: "PageUp", token: "PageUp", aliases: &["PgUp"] },
    KeySpec { name: "PageDown", token: "PageDown", aliases: &["PgDn", "PgDown"] },
    KeySpec { name: "Ctrl+A", token: "Ctrl+A", aliases: &[] },
    KeySpec { name: "Ctrl+B", token: "Ctrl+B", aliases: &[] },
    KeySpec { name: "Ctrl+C", token: "Ctrl+C", aliases: &[] },
    KeySpec { name: "Ctrl+D", token: "Ctrl+D", aliases: &[] },
    KeySpec { name: "Ctrl+E", token: "Ctrl+E", aliases: &[] },
    KeySpec { name: "Ctrl+F", token: "Ctrl+F", aliases: &[] },
    KeySpec { name: "Ctrl+K", token: "Ctrl+K", aliases: &[] },
    KeySpec { name: "Ctrl+L", token: "Ctrl+L", aliases: &[] },
    KeySpec { name: "Ctrl+N", token: "Ctrl+N", aliases: &[] },
    KeySpec { name: "Ctrl+P", token: "Ctrl+P", aliases: &[] },
    KeySpec { name: "Ctrl+R", token: "Ctrl+R", aliases: &[] },
    KeySpec { name: "Ctrl+U", token: "Ctrl+U", aliases: &[] },
    KeySpec { name: "Ctrl+W", token: "Ctrl+W", aliases: &[] },
    KeySpec { name: "Ctrl+Z", token: "Ctrl+Z", aliases: &[] },
];

static KEY_INDEX: LazyLock<HashMap<String, &'static str>> = LazyLock::new(|| {
    let mut index = HashMap::new();
    for spec in KEYS {
        index.insert(normalize(spec.name), spec.token);
        for alias in spec.aliases {
            index.insert(normalize(alias), spec.token);
        }
    }
    index
});

/// Lower-case the name and drop `-`, `_`, `+` and whitespace, so
/// "Ctrl-C", "ctrl_c" and "CTRL+c" all become "ctrlc".
pub fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '-' | '_' | '+') && !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Look up the engine token for a key name.
pub fn lookup(name: &str) -> Option<&'static str> {
    KEY_INDEX.get(&normalize(name)).copied()
}

/// Canonical names of every known key, in table order.
pub fn known_key_names() -> Vec<String> {
    KEYS.iter().map(|k| k.name.to_string()).collect()
}

/// Translate one caller key into a script line.
///
/// Known keys become their token; an unknown single character is typed
/// literally; anything else is `UnknownKey`.
pub fn translate(name: &str) -> tapectl_core::Result<ScriptLine> {
    if let Some(token) = lookup(name) {
        return Ok(ScriptLine::Key(token));
    }
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(ScriptLine::Type(c.to_string())),
        _ => Err(TapeError::UnknownKey {
            key: name.to_string(),
            known: known_key_names(),
        }),
    }
}

/// Translate every key or fail on the first unknown one.
pub fn translate_all(names: &[String]) -> tapectl_core::Result<Vec<ScriptLine>> {
    names.iter().map(|n| translate(n)).collect()
}
