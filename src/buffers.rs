//! The three editable source buffers and their file identities.
//!
//! Buffers are created once (empty, from decoded URL state, or from the
//! sample document) and live for the whole session. Editing surfaces and
//! file loads replace their content; clearing empties them but never
//! destroys them.

use serde::Serialize;

/// Which of the three source slots a buffer occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BufferKind {
    Markup,
    Style,
    Script,
}

impl BufferKind {
    pub const ALL: [BufferKind; 3] = [BufferKind::Markup, BufferKind::Style, BufferKind::Script];

    /// Name of the URL query parameter carrying this buffer.
    pub fn query_param(self) -> &'static str {
        match self {
            BufferKind::Markup => "html",
            BufferKind::Style => "css",
            BufferKind::Script => "js",
        }
    }

    /// Download filename used when the buffer has no origin filename.
    pub fn default_filename(self) -> &'static str {
        match self {
            BufferKind::Markup => "index.html",
            BufferKind::Style => "styles.css",
            BufferKind::Script => "script.js",
        }
    }
}

/// One editable source text plus the filename it was loaded from, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceBuffer {
    pub content: String,
    pub origin_filename: Option<String>,
}

impl SourceBuffer {
    /// Blank contents don't participate in save-all.
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// The full editable state: exactly one buffer per kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Buffers {
    pub markup: SourceBuffer,
    pub style: SourceBuffer,
    pub script: SourceBuffer,
}

impl Buffers {
    pub fn get(&self, kind: BufferKind) -> &SourceBuffer {
        match kind {
            BufferKind::Markup => &self.markup,
            BufferKind::Style => &self.style,
            BufferKind::Script => &self.script,
        }
    }

    pub fn get_mut(&mut self, kind: BufferKind) -> &mut SourceBuffer {
        match kind {
            BufferKind::Markup => &mut self.markup,
            BufferKind::Style => &mut self.style,
            BufferKind::Script => &mut self.script,
        }
    }

    /// The hello-world document shown when a session starts with no state.
    pub fn sample() -> Self {
        let mut buffers = Buffers::default();
        buffers.markup.content = String::from(
            "<h1 class=\"revertable\">Hello, World!</h1>\n<button onClick=\"button()\">press me</button>\n",
        );
        buffers.style.content = String::from("h1 { color: blue; }\n");
        buffers.script.content = String::from(
            "function button() {\n    const element = document.querySelector('h1.revertable');\n    if (element) {\n        const text = element.textContent;\n        element.textContent = text.split('').reverse().join('');\n    }\n    console.log(\"reverted!\");\n}\n",
        );
        buffers
    }
}

/// A pending download: what the host should offer the user to save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveTarget {
    pub filename: String,
    pub content: String,
}
