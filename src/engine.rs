//! The playground engine - sequences the update cycle.
//!
//! Every committed edit runs codec (persist) -> composer (build) ->
//! sandbox (replace contents); the bridge and interceptor installed by
//! the composed document then report into the shared panel. The editing
//! surface, file dialogs and keyboard shortcuts live outside: they hand
//! plain strings in and get plain strings back.

use crate::buffers::{BufferKind, Buffers, SaveTarget};
use crate::codec;
use crate::compose::compose;
use crate::console::{ConsoleEntry, LogPanel};
use crate::runtime::{Sandbox, SandboxLimits};

pub struct Playground {
    buffers: Buffers,
    panel: LogPanel,
    sandbox: Sandbox,
}

impl Playground {
    /// Start a session with the given buffers, without rendering yet.
    pub fn new(buffers: Buffers, limits: SandboxLimits) -> Self {
        let panel = LogPanel::new();
        let sandbox = Sandbox::new(panel.clone(), limits);
        Playground {
            buffers,
            panel,
            sandbox,
        }
    }

    /// Restore a session from the address-bar query string.
    ///
    /// Tolerant by contract: missing or malformed parameters become
    /// empty buffers and never prevent the session from starting.
    pub fn from_query(query: &str, limits: SandboxLimits) -> Self {
        Playground::new(codec::decode(query), limits)
    }

    pub fn buffers(&self) -> &Buffers {
        &self.buffers
    }

    pub fn buffer(&self, kind: BufferKind) -> &crate::buffers::SourceBuffer {
        self.buffers.get(kind)
    }

    /// Commit an edit to one buffer and run the full update cycle.
    ///
    /// Returns the new query string; the host replaces the current URL
    /// entry with it (no history entry is added).
    pub fn commit(&mut self, kind: BufferKind, content: String) -> String {
        self.buffers.get_mut(kind).content = content;
        self.refresh()
    }

    /// Complete a file load into one buffer: replaces its content and
    /// filename label, then triggers exactly one render.
    pub fn load_file(&mut self, kind: BufferKind, filename: &str, content: String) -> String {
        let buffer = self.buffers.get_mut(kind);
        buffer.content = content;
        buffer.origin_filename = Some(filename.to_string());
        self.refresh()
    }

    /// Replace all three buffers at once (session restore) and render.
    pub fn restore(&mut self, buffers: Buffers) -> String {
        self.buffers = buffers;
        self.refresh()
    }

    /// Clear all three buffers to empty content and re-render.
    pub fn clear_all(&mut self) -> String {
        for kind in BufferKind::ALL {
            self.buffers.get_mut(kind).content.clear();
        }
        self.refresh()
    }

    /// Persist, compose and render the current buffer state.
    pub fn refresh(&mut self) -> String {
        let query = codec::encode(&self.buffers);
        let document = compose(
            &self.buffers.markup.content,
            &self.buffers.style.content,
            &self.buffers.script.content,
        );
        self.sandbox.render(document);
        query
    }

    /// Full text of the most recently rendered document.
    pub fn document(&self) -> Option<&str> {
        self.sandbox.document()
    }

    pub fn is_loaded(&self) -> bool {
        self.sandbox.is_loaded()
    }

    /// The download the host should offer for one buffer.
    pub fn save_target(&self, kind: BufferKind) -> SaveTarget {
        let buffer = self.buffers.get(kind);
        SaveTarget {
            filename: buffer
                .origin_filename
                .clone()
                .unwrap_or_else(|| kind.default_filename().to_string()),
            content: buffer.content.clone(),
        }
    }

    /// Downloads for every buffer with non-blank content.
    pub fn save_all(&self) -> Vec<SaveTarget> {
        BufferKind::ALL
            .into_iter()
            .filter(|&kind| !self.buffers.get(kind).is_blank())
            .map(|kind| self.save_target(kind))
            .collect()
    }

    /// Snapshot of the log panel, oldest entry first.
    pub fn console(&self) -> Vec<ConsoleEntry> {
        self.panel.entries()
    }

    pub fn console_len(&self) -> usize {
        self.panel.len()
    }

    /// Explicit user-driven clear of the log panel.
    pub fn clear_console(&self) {
        self.panel.clear();
    }

    /// Report an uncaught error from the host page itself.
    pub fn report_host_error(&self, message: &str, source: &str, line: u32, column: u32) {
        self.panel.report_host_error(message, source, line, column);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::Severity;

    fn playground() -> Playground {
        Playground::new(Buffers::default(), SandboxLimits::default())
    }

    #[test]
    fn test_red_heading_scenario() {
        let mut playground = playground();
        playground.commit(BufferKind::Markup, "<h1>Hi</h1>".to_string());
        playground.commit(BufferKind::Style, "h1{color:red}".to_string());
        playground.commit(BufferKind::Script, "console.log('ok')".to_string());

        let document = playground.document().unwrap();
        assert!(document.contains("<h1>Hi</h1>"));
        assert!(document.contains("h1{color:red}"));

        let info: Vec<_> = playground
            .console()
            .into_iter()
            .filter(|e| e.severity == Severity::Info && e.text.contains("ok"))
            .collect();
        assert_eq!(info.len(), 1);
    }

    #[test]
    fn test_commit_returns_a_restorable_query() {
        let mut playground = playground();
        let query = playground.commit(BufferKind::Script, "console.log('persisted')".to_string());
        let restored = Playground::from_query(&query, SandboxLimits::default());
        assert_eq!(
            restored.buffer(BufferKind::Script).content,
            "console.log('persisted')"
        );
        assert!(restored.buffer(BufferKind::Markup).content.is_empty());
    }

    #[test]
    fn test_empty_buffers_still_render() {
        let mut playground = playground();
        assert!(!playground.is_loaded());
        playground.refresh();
        assert!(playground.is_loaded());
        assert!(playground.console().is_empty());
    }

    #[test]
    fn test_save_all_skips_blank_buffers() {
        let mut playground = playground();
        playground.commit(BufferKind::Script, "console.log('x')".to_string());
        let targets = playground.save_all();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].filename, "script.js");
        assert_eq!(targets[0].content, "console.log('x')");
    }

    #[test]
    fn test_save_target_prefers_origin_filename() {
        let mut playground = playground();
        playground.load_file(BufferKind::Markup, "page.html", "<p>x</p>".to_string());
        assert_eq!(playground.save_target(BufferKind::Markup).filename, "page.html");
        assert_eq!(playground.save_target(BufferKind::Style).filename, "styles.css");
    }

    #[test]
    fn test_load_file_replaces_content_and_renders_once() {
        let mut playground = playground();
        playground.load_file(BufferKind::Markup, "page.html", "<p>loaded</p>".to_string());
        assert!(playground.is_loaded());
        assert_eq!(playground.buffer(BufferKind::Markup).content, "<p>loaded</p>");
        assert_eq!(
            playground.buffer(BufferKind::Markup).origin_filename.as_deref(),
            Some("page.html")
        );
        assert!(playground.document().unwrap().contains("<p>loaded</p>"));
    }

    #[test]
    fn test_clear_all_empties_content_but_keeps_buffers() {
        let mut playground = playground();
        playground.load_file(BufferKind::Style, "theme.css", "body{}".to_string());
        playground.clear_all();
        assert!(playground.buffer(BufferKind::Style).content.is_empty());
        // Cleared, not destroyed: the filename label survives.
        assert_eq!(
            playground.buffer(BufferKind::Style).origin_filename.as_deref(),
            Some("theme.css")
        );
        assert!(playground.is_loaded());
    }

    #[test]
    fn test_console_grows_across_rebuilds_until_cleared() {
        let mut playground = playground();
        playground.commit(BufferKind::Script, "console.log('a')".to_string());
        playground.commit(BufferKind::Script, "console.log('b')".to_string());
        assert_eq!(playground.console_len(), 2);
        playground.clear_console();
        assert_eq!(playground.console_len(), 0);
    }

    #[test]
    fn test_restore_replaces_all_buffers_in_one_render() {
        let mut playground = playground();
        playground.commit(BufferKind::Markup, "<p>old</p>".to_string());
        let mut incoming = Buffers::default();
        incoming.script.content = "console.log('restored')".to_string();
        playground.restore(incoming);
        assert!(playground.buffer(BufferKind::Markup).content.is_empty());
        assert!(playground.console().iter().any(|e| e.text == "restored"));
    }

    #[test]
    fn test_host_errors_share_the_panel() {
        let mut playground = playground();
        playground.commit(BufferKind::Script, "console.log('sandbox')".to_string());
        playground.report_host_error("lookup failed", "host.js", 7, 1);
        let entries = playground.console();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].text, "Error: lookup failed at host.js:7:1");
    }

    #[test]
    fn test_script_error_scenario() {
        let mut playground = playground();
        playground.commit(BufferKind::Markup, "<h1>still here</h1>".to_string());
        playground.commit(BufferKind::Script, "throw new Error('boom')".to_string());
        assert!(playground.document().unwrap().contains("still here"));
        let errors: Vec<_> = playground
            .console()
            .into_iter()
            .filter(|e| e.severity == Severity::Error)
            .collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].text.contains("boom"));
    }
}
