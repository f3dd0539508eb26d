//! Module loader that denies every import.
//!
//! The preview sandbox runs classic scripts only; there is no module
//! graph, no filesystem and no network. Static and dynamic imports both
//! fail with a message the user sees in the panel instead of a crash.

use deno_core::{
    anyhow::{anyhow, Error},
    ModuleLoadResponse, ModuleLoader, ModuleSpecifier, RequestedModuleType, ResolutionKind,
};

pub struct DeniedLoader;

impl ModuleLoader for DeniedLoader {
    fn resolve(
        &self,
        specifier: &str,
        _referrer: &str,
        _kind: ResolutionKind,
    ) -> Result<ModuleSpecifier, Error> {
        Err(anyhow!(
            "imports are not available in the preview sandbox: {}",
            specifier
        ))
    }

    fn load(
        &self,
        module_specifier: &ModuleSpecifier,
        _maybe_referrer: Option<&ModuleSpecifier>,
        _is_dyn_import: bool,
        _requested_module_type: RequestedModuleType,
    ) -> ModuleLoadResponse {
        ModuleLoadResponse::Sync(Err(anyhow!(
            "imports are not available in the preview sandbox: {}",
            module_specifier
        )))
    }
}
