//! Script accumulator and the engine's line-based tape language.

use std::fmt;

/// Name of the engine's multi-frame text dump inside the workspace.
pub const TEXT_OUTPUT_FILE: &str = "output.txt";

/// One instruction of the tape language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptLine {
    /// `Type "<text>"`: text is stored unescaped.
    Type(String),
    /// A named key token such as `Enter` or `Ctrl+C`.
    Key(&'static str),
    /// `Sleep <N>ms`
    Sleep(u64),
    /// `Wait /<pattern>/`
    Wait(String),
    /// `Screenshot <file>`
    Screenshot(String),
}

impl fmt::Display for ScriptLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type(text) => write!(f, "Type \"{}\"", escape_quotes(text)),
            Self::Key(token) => f.write_str(token),
            Self::Sleep(ms) => write!(f, "Sleep {ms}ms"),
            Self::Wait(pattern) => write!(f, "Wait /{pattern}/"),
            Self::Screenshot(file) => write!(f, "Screenshot {file}"),
        }
    }
}

/// Backslash-escape backslashes and double quotes for a quoted argument.
pub fn escape_quotes(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Lines that type `text`. Embedded newlines become `Enter` presses so each
/// emitted line stays a single instruction.
pub fn type_text(text: &str) -> Vec<ScriptLine> {
    let mut lines = Vec::new();
    for (i, part) in text.split('\n').enumerate() {
        if i > 0 {
            lines.push(ScriptLine::Key("Enter"));
        }
        let part = part.strip_suffix('\r').unwrap_or(part);
        if !part.is_empty() {
            lines.push(ScriptLine::Type(part.to_string()));
        }
    }
    lines
}

/// Engine preamble, rendered in front of the accumulated lines.
#[derive(Debug, Clone)]
pub struct ScriptHeader {
    pub output_file: String,
    pub typing_speed_ms: u64,
    pub shell: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl fmt::Display for ScriptHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Output {}", self.output_file)?;
        writeln!(f, "Set TypingSpeed {}ms", self.typing_speed_ms)?;
        write!(f, "Set Shell \"{}\"", escape_quotes(&self.shell))?;
        if let Some(width) = self.width {
            write!(f, "\nSet Width {width}")?;
        }
        if let Some(height) = self.height {
            write!(f, "\nSet Height {height}")?;
        }
        Ok(())
    }
}

/// Append-only, ordered list of rendered script lines.
#[derive(Debug, Clone, Default)]
pub struct Script {
    lines: Vec<String>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: ScriptLine) {
        self.lines.push(line.to_string());
    }

    pub fn extend(&mut self, lines: impl IntoIterator<Item = ScriptLine>) {
        for line in lines {
            self.push(line);
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Full script: header, then every accumulated line, newline-joined.
    pub fn render(&self, header: &ScriptHeader) -> String {
        let mut out = header.to_string();
        for line in &self.lines {
            out.push('\n');
            out.push_str(line);
        }
        out.push('\n');
        out
    }
}
