//! Document composer - assembles one self-contained executable document
//! from the three buffer contents.
//!
//! Composition is pure: it builds text and executes nothing. Document
//! order is stylesheet, markup verbatim, then a single script block that
//! installs the bridge before the user script runs.

/// Bridge + error interceptor source, installed ahead of user code.
const BRIDGE_SOURCE: &str = include_str!("bootstrap.js");

/// A freshly composed document. Ephemeral: rebuilt on every update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedDocument {
    /// The full document text (style + markup + script block).
    pub html: String,
    /// The executable block alone, as fed to the sandbox.
    pub script: String,
}

/// Compose (markup, stylesheet, script) into one document.
///
/// The user script is embedded as an escaped string literal and run
/// exactly once through indirect `eval`, inside a `try`/`catch` routed
/// to the error interceptor. Indirect `eval` executes in global scope,
/// so top-level declarations stay reachable from event handlers in the
/// markup; no second copy of the script is injected.
pub fn compose(markup: &str, style: &str, script: &str) -> ComposedDocument {
    let executable = format!(
        "{bridge}\ntry {{\n  (0, eval)({user});\n}} catch (err) {{\n  globalThis.__preview_report__(err);\n}}\n",
        bridge = BRIDGE_SOURCE,
        user = js_string_literal(script),
    );
    let html = format!(
        "<style>\n{style}\n</style>\n{markup}\n<script>\n{executable}</script>\n",
        style = style,
        markup = markup,
        executable = executable,
    );
    ComposedDocument { html, script: executable }
}

/// Escape arbitrary text into a double-quoted JS string literal.
///
/// Also escapes `/`, so a user script containing `</script>` cannot
/// terminate the surrounding script block.
fn js_string_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '/' => out.push_str("\\/"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
