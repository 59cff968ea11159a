//! Naming conventions binding native code to embedded scripts.
//!
//! Nothing but names connects the build step, the linker symbols, and the
//! script's exported factory:
//!
//! - A source file name becomes a resource identifier by replacing every
//!   character outside `[A-Za-z0-9]` with `_`
//!   (`determine-basal.mjs` → `determine_basal_mjs`).
//! - A module exposes its callable through a global zero-argument factory
//!   named [`ENTRY_PREFIX`] followed by the module name.
//! - An embedded payload ends with a single [`PAYLOAD_TERMINATOR`] byte that
//!   is not part of the script source.

/// Prefix of the global factory binding every module must define.
pub const ENTRY_PREFIX: &str = "require_";

/// Byte appended after the script text by the embedding step.
pub const PAYLOAD_TERMINATOR: u8 = 0;

/// Label attached to loader log spans as the `source` field.
///
/// It is a log field only; engine backtraces name the code `eval_script`.
pub const EMBED_SOURCE_LABEL: &str = "<embed>";

/// Replacement for characters that cannot appear in a linker symbol.
const IDENT_REPLACEMENT: char = '_';

/// Derive the resource identifier for a source file name.
///
/// The identifier is what the linker symbols (or section) are named after, so
/// it must match the build step byte for byte.
pub fn resource_identifier(file_name: &str) -> String {
    file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c
            } else {
                IDENT_REPLACEMENT
            }
        })
        .collect()
}

/// Name of the global factory binding for a module.
pub fn entry_point_name(module_name: &str) -> String {
    let mut name = String::with_capacity(ENTRY_PREFIX.len() + module_name.len());
    name.push_str(ENTRY_PREFIX);
    name.push_str(module_name);
    name
}

/// The part of a payload that is script source.
///
/// Removes one trailing [`PAYLOAD_TERMINATOR`] when `strip_terminator` is set
/// and the payload ends with it. Anything else is returned unchanged.
pub fn script_source(payload: &[u8], strip_terminator: bool) -> &[u8] {
    match payload.split_last() {
        Some((&PAYLOAD_TERMINATOR, source)) if strip_terminator => source,
        _ => payload,
    }
}
