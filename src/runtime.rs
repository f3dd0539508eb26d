//! Sandbox executor - runs composed documents in an isolated V8 isolate.
//!
//! Provides only what the bridge and playground scripts need:
//! - console.log/info/warn/error (mirrored to the host log panel)
//! - an uncaught-error reporting op for the error interceptor
//! - atob, btoa
//! - crypto.randomUUID, crypto.getRandomValues
//! - No fs, net, env, module imports or other system access

use crate::compose::ComposedDocument;
use crate::console::{ConsoleEntry, LogPanel, Severity};
use crate::loader::DeniedLoader;
use anyhow::{anyhow, Error};
use deno_core::error::JsError;
use deno_core::{op2, JsRuntime, OpState, RuntimeOptions};
use std::rc::Rc;
use std::sync::mpsc;
use std::time::Duration;

// ============================================================================
// Bridge Ops
// ============================================================================

#[op2(fast)]
fn op_console_append(state: &mut OpState, #[string] severity: &str, #[string] text: &str) {
    if let Some(panel) = state.try_borrow::<LogPanel>() {
        panel.append(ConsoleEntry {
            severity: Severity::from_label(severity),
            text: text.to_string(),
        });
    }
}

#[op2(fast)]
fn op_report_error(state: &mut OpState, #[string] message: &str, line: u32) {
    if let Some(panel) = state.try_borrow::<LogPanel>() {
        // Primitive throws carry no stack, so the throw site is unknown.
        let text = if line > 0 {
            format!("Error: {} at line {}", message, line)
        } else {
            format!("Error: {} at line ?", message)
        };
        panel.append(ConsoleEntry::error(text));
    }
}

// ============================================================================
// Convenience Ops
// ============================================================================

#[op2]
#[string]
fn op_btoa(#[string] data: &str) -> Result<String, Error> {
    use base64::Engine;
    // btoa expects Latin-1, but we'll be lenient and accept UTF-8
    Ok(base64::engine::general_purpose::STANDARD.encode(data.as_bytes()))
}

#[op2]
#[string]
fn op_atob(#[string] data: &str) -> Result<String, Error> {
    use base64::Engine;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|e| anyhow!("Invalid base64: {}", e))?;
    String::from_utf8(bytes).map_err(|e| anyhow!("Invalid UTF-8 in decoded data: {}", e))
}

#[op2]
#[string]
fn op_crypto_random_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[op2(fast)]
fn op_crypto_get_random_values(#[buffer] buf: &mut [u8]) {
    use rand::RngCore;
    rand::thread_rng().fill_bytes(buf);
}

deno_core::extension!(
    preview_runtime,
    ops = [
        op_console_append,
        op_report_error,
        op_btoa,
        op_atob,
        op_crypto_random_uuid,
        op_crypto_get_random_values,
    ],
);

/// Resource limits for one sandbox isolate.
pub struct SandboxLimits {
    /// Maximum heap size in bytes (default: 64MB, None = unlimited)
    pub max_heap_size: Option<usize>,
    /// Maximum time for the synchronous part of a render in milliseconds
    /// (default: 5000ms, None = unlimited)
    pub timeout_ms: Option<u64>,
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self {
            max_heap_size: Some(64 * 1024 * 1024), // 64MB default
            timeout_ms: Some(5_000),
        }
    }
}

enum SandboxState {
    Empty,
    Loaded(LoadedSandbox),
}

struct LoadedSandbox {
    runtime: JsRuntime,
    document: ComposedDocument,
}

/// The isolated execution context for composed documents.
///
/// Two states: Empty (no document yet) and Loaded (the most recent
/// render). `render` replaces the whole context - destroy-then-recreate,
/// never incremental patching - and there is no way back to Empty.
pub struct Sandbox {
    panel: LogPanel,
    limits: SandboxLimits,
    state: SandboxState,
}

impl Sandbox {
    pub fn new(panel: LogPanel, limits: SandboxLimits) -> Self {
        Sandbox {
            panel,
            limits,
            state: SandboxState::Empty,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.state, SandboxState::Loaded(_))
    }

    /// Full text of the most recently rendered document.
    pub fn document(&self) -> Option<&str> {
        match &self.state {
            SandboxState::Empty => None,
            SandboxState::Loaded(loaded) => Some(&loaded.document.html),
        }
    }

    /// Replace the sandbox contents with a freshly composed document.
    ///
    /// By the time this returns the bridge is installed and the user
    /// script has run its synchronous portion; asynchronous work it
    /// scheduled is neither tracked nor awaited. Never fails: every
    /// execution failure is downgraded to an Error entry on the panel.
    pub fn render(&mut self, document: ComposedDocument) {
        // Drop the previous isolate first; pending async work in it
        // becomes unobservable garbage with no cancellation step.
        if let SandboxState::Loaded(previous) = std::mem::replace(&mut self.state, SandboxState::Empty)
        {
            drop(previous.runtime);
        }

        let mut runtime = self.new_runtime();
        if let Err(err) = self.execute(&mut runtime, &document) {
            self.panel.append(uncaught_entry(&err));
        }
        self.state = SandboxState::Loaded(LoadedSandbox { runtime, document });
    }

    fn new_runtime(&self) -> JsRuntime {
        // Configure V8 heap limits if specified
        let create_params = self
            .limits
            .max_heap_size
            .map(|max_bytes| deno_core::v8::Isolate::create_params().heap_limits(0, max_bytes));

        let mut runtime = JsRuntime::new(RuntimeOptions {
            module_loader: Some(Rc::new(DeniedLoader)),
            extensions: vec![preview_runtime::init_ops()],
            create_params,
            ..Default::default()
        });

        if self.limits.max_heap_size.is_some() {
            runtime.add_near_heap_limit_callback(|current, initial| {
                // Don't raise the limit - let V8 terminate gracefully
                eprintln!(
                    "[preview-sandbox] Near heap limit: current={}MB, initial={}MB",
                    current / (1024 * 1024),
                    initial / (1024 * 1024)
                );
                current
            });
        }

        // The bridge ops report into the shared panel
        runtime.op_state().borrow_mut().put(self.panel.clone());

        runtime
    }

    fn execute(&self, runtime: &mut JsRuntime, document: &ComposedDocument) -> Result<(), Error> {
        let script = document.script.clone();
        match self.limits.timeout_ms {
            Some(ms) => {
                // Watchdog thread terminates runaway synchronous scripts;
                // execute_script blocks this thread, so the guard cannot
                // live on it.
                let isolate_handle = runtime.v8_isolate().thread_safe_handle();
                let (done_tx, done_rx) = mpsc::channel::<()>();
                let watchdog = std::thread::spawn(move || {
                    if done_rx.recv_timeout(Duration::from_millis(ms)).is_err() {
                        isolate_handle.terminate_execution();
                    }
                });

                let result = runtime.execute_script("<preview>", script).map(|_| ());

                let _ = done_tx.send(());
                let _ = watchdog.join();

                match result {
                    Err(e) if e.to_string().contains("terminated") => {
                        Err(anyhow!("script timed out after {}ms", ms))
                    }
                    other => other,
                }
            }
            None => runtime.execute_script("<preview>", script).map(|_| ()),
        }
    }
}

/// Map an execution failure to one Error entry.
///
/// Fires only for throws the composed try/catch wrapper could not see
/// (bridge failure, termination), so a single throw is never reported
/// by both sinks.
fn uncaught_entry(err: &Error) -> ConsoleEntry {
    if let Some(js_err) = err.downcast_ref::<JsError>() {
        let line = js_err.frames.first().and_then(|frame| frame.line_number);
        match line {
            Some(n) => ConsoleEntry::error(format!("{} at line {}", js_err.exception_message, n)),
            None => ConsoleEntry::error(js_err.exception_message.clone()),
        }
    } else {
        ConsoleEntry::error(format!("Error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::compose;

    fn sandbox() -> (Sandbox, LogPanel) {
        let panel = LogPanel::new();
        let sandbox = Sandbox::new(panel.clone(), SandboxLimits::default());
        (sandbox, panel)
    }

    #[test]
    fn test_console_log_reaches_the_panel() {
        let (mut sandbox, panel) = sandbox();
        sandbox.render(compose("<h1>Hi</h1>", "h1{color:red}", "console.log('ok')"));
        let entries = panel.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].severity, Severity::Info);
        assert_eq!(entries[0].text, "ok");
    }

    #[test]
    fn test_severity_mapping() {
        let (mut sandbox, panel) = sandbox();
        sandbox.render(compose(
            "",
            "",
            "console.info('i'); console.warn('w'); console.error('e');",
        ));
        let severities: Vec<_> = panel.entries().iter().map(|e| e.severity).collect();
        assert_eq!(severities, vec![Severity::Info, Severity::Warning, Severity::Error]);
    }

    #[test]
    fn test_multiple_arguments_join_to_one_line() {
        let (mut sandbox, panel) = sandbox();
        sandbox.render(compose("", "", "console.log('n =', 42, {a: 1})"));
        assert_eq!(panel.entries()[0].text, "n = 42 {\"a\":1}");
    }

    #[test]
    fn test_throw_yields_exactly_one_error_entry_with_line() {
        let (mut sandbox, panel) = sandbox();
        sandbox.render(compose("", "", "throw new Error('boom')"));
        let entries = panel.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].severity, Severity::Error);
        assert!(entries[0].text.contains("boom"), "got: {}", entries[0].text);
        assert!(entries[0].text.contains("at line 1"), "got: {}", entries[0].text);
    }

    #[test]
    fn test_throw_line_number_is_relative_to_the_user_script() {
        let (mut sandbox, panel) = sandbox();
        sandbox.render(compose("", "", "\n\nthrow new Error('boom')"));
        let entries = panel.entries();
        assert_eq!(entries.len(), 1);
        assert!(
            entries[0].text.contains("at line 3"),
            "got: {}",
            entries[0].text
        );
    }

    #[test]
    fn test_primitive_throw_reports_message_and_line_marker() {
        let (mut sandbox, panel) = sandbox();
        sandbox.render(compose("", "", "throw 'plain string'"));
        let entries = panel.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].severity, Severity::Error);
        assert_eq!(entries[0].text, "Error: plain string at line ?");
    }

    #[test]
    fn test_markup_still_renders_when_script_throws() {
        let (mut sandbox, panel) = sandbox();
        sandbox.render(compose("<h1>Hi</h1>", "h1{color:red}", "throw new Error('boom')"));
        assert!(sandbox.is_loaded());
        let document = sandbox.document().unwrap();
        assert!(document.contains("<h1>Hi</h1>"));
        assert!(document.contains("h1{color:red}"));
        assert_eq!(panel.entries().len(), 1);
    }

    #[test]
    fn test_syntax_error_is_reported_once() {
        let (mut sandbox, panel) = sandbox();
        sandbox.render(compose("", "", "console.log('unterminated"));
        let entries = panel.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].severity, Severity::Error);
    }

    #[test]
    fn test_empty_document_loads_cleanly() {
        let (mut sandbox, panel) = sandbox();
        assert!(!sandbox.is_loaded());
        sandbox.render(compose("", "", ""));
        assert!(sandbox.is_loaded());
        assert!(panel.is_empty());
    }

    #[test]
    fn test_top_level_declarations_land_on_the_global() {
        let (mut sandbox, panel) = sandbox();
        sandbox.render(compose(
            "",
            "",
            "function button() { return 'hi'; }\nconsole.log(typeof globalThis.button);",
        ));
        assert_eq!(panel.entries()[0].text, "function");
    }

    #[test]
    fn test_panel_accumulates_across_renders() {
        let (mut sandbox, panel) = sandbox();
        let document = compose("", "", "console.log('ok')");
        sandbox.render(document.clone());
        sandbox.render(document);
        // Re-rendering re-executes; side effects accumulate.
        let entries = panel.entries();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.text == "ok"));
    }

    #[test]
    fn test_rebuild_discards_previous_globals() {
        let (mut sandbox, panel) = sandbox();
        sandbox.render(compose("", "", "globalThis.marker = 'old';"));
        sandbox.render(compose("", "", "console.log(typeof globalThis.marker);"));
        assert_eq!(panel.entries()[0].text, "undefined");
    }

    #[test]
    fn test_atob_btoa_round_trip() {
        let (mut sandbox, panel) = sandbox();
        sandbox.render(compose("", "", "console.log(atob(btoa('hi')))"));
        assert_eq!(panel.entries()[0].text, "hi");
    }

    #[test]
    fn test_crypto_random_uuid_shape() {
        let (mut sandbox, panel) = sandbox();
        sandbox.render(compose("", "", "console.log(crypto.randomUUID().length)"));
        assert_eq!(panel.entries()[0].text, "36");
    }

    #[test]
    fn test_runaway_script_times_out() {
        let panel = LogPanel::new();
        let limits = SandboxLimits {
            timeout_ms: Some(200),
            ..Default::default()
        };
        let mut sandbox = Sandbox::new(panel.clone(), limits);
        sandbox.render(compose("", "", "while (true) {}"));
        let entries = panel.entries();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].text.contains("timed out"), "got: {}", entries[0].text);
    }
}
