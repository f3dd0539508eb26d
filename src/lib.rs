//! # Preview Sandbox
//!
//! The live-preview core of an HTML/CSS/JS playground: three editable
//! source buffers are persisted in a URL query string, composed into one
//! executable document, and executed in an isolated V8 context whose
//! console and error signals are mirrored to a host-visible log panel.
//!
//! ## Behavior
//!
//! - **URL state**: buffers round-trip through `html`/`css`/`js` query
//!   parameters (URL-safe base64); broken parameters restore as empty
//!   buffers and never block loading
//! - **Composition**: pure; stylesheet, markup verbatim, then one script
//!   block that installs the console bridge before the user script runs
//! - **Isolation**: every render discards the previous isolate and builds
//!   a fresh one; no fs, net, env or module imports inside
//! - **Reporting**: console calls and uncaught errors become ordered
//!   entries on a panel that survives rebuilds until explicitly cleared
//!
//! ## Usage
//!
//! ```rust,ignore
//! use preview_sandbox::{BufferKind, Buffers, Playground, SandboxLimits};
//!
//! fn main() {
//!     let mut playground = Playground::new(Buffers::default(), SandboxLimits::default());
//!     let query = playground.commit(BufferKind::Script, "console.log('ok')".into());
//!
//!     // `query` goes into the address bar; the panel holds one Info entry.
//!     for entry in playground.console() {
//!         eprintln!("{}", entry);
//!     }
//! }
//! ```

mod buffers;
mod codec;
mod compose;
mod console;
mod engine;
mod loader;
mod runtime;

pub use buffers::{BufferKind, Buffers, SaveTarget, SourceBuffer};
pub use codec::{decode, decode_component, encode};
pub use compose::{compose, ComposedDocument};
pub use console::{ConsoleEntry, LogPanel, Severity};
pub use engine::Playground;
pub use loader::DeniedLoader;
pub use runtime::{Sandbox, SandboxLimits};
