//! Link-time embedded resources.
//!
//! A script payload is turned into an object file by the build step and linked
//! into the executable's data segment. The linker names the payload after its
//! resource identifier (see [`crate::naming::resource_identifier`]) using one
//! of three conventions:
//!
//! | Platform | Start | Length |
//! |----------|-------|--------|
//! | GNU ld (Linux, BSD) | `_binary_<id>_start` | `_binary_<id>_end` − start |
//! | MinGW (Windows) | `binary_<id>_start` | `binary_<id>_end` − start |
//! | Mach-O (macOS) | `section$start$__DATA$__<id>` | `getsectbyname("__DATA", "__<id>")` |
//!
//! [`embedded_resource!`](crate::embedded_resource) picks the convention at
//! build time and always yields an [`EmbeddedResource`]. Missing symbols are a
//! link error, so locating a resource cannot fail at runtime.

use std::fmt;

use tracing::{trace, warn};

/// Linker convention used to name an embedded payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolConvention {
    /// `ld -r -b binary` on ELF targets: start/end symbol pair.
    GnuLd,
    /// MinGW `ld`: start/end symbol pair without the leading underscore.
    MinGw,
    /// `ld64 -sectcreate`: one section, sized at runtime.
    MachOSection,
}

impl SymbolConvention {
    /// The convention of the target being built.
    pub const CURRENT: Self = if cfg!(target_os = "macos") {
        Self::MachOSection
    } else if cfg!(windows) {
        Self::MinGw
    } else {
        Self::GnuLd
    };

    /// Symbol marking the first byte of the payload.
    pub fn start_symbol(self, ident: &str) -> String {
        match self {
            Self::GnuLd => format!("_binary_{ident}_start"),
            Self::MinGw => format!("binary_{ident}_start"),
            Self::MachOSection => format!("section$start$__DATA$__{ident}"),
        }
    }

    /// Symbol marking one past the last byte, if the convention has one.
    pub fn end_symbol(self, ident: &str) -> Option<String> {
        match self {
            Self::GnuLd => Some(format!("_binary_{ident}_end")),
            Self::MinGw => Some(format!("binary_{ident}_end")),
            Self::MachOSection => None,
        }
    }

    /// `(segment, section)` holding the payload, if the convention uses one.
    pub fn section(self, ident: &str) -> Option<(&'static str, String)> {
        match self {
            Self::MachOSection => Some(("__DATA", format!("__{ident}"))),
            Self::GnuLd | Self::MinGw => None,
        }
    }
}

impl fmt::Display for SymbolConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GnuLd => f.write_str("gnu-ld"),
            Self::MinGw => f.write_str("mingw"),
            Self::MachOSection => f.write_str("mach-o-section"),
        }
    }
}

/// A byte payload linked into the executable.
///
/// The bytes live for the whole process and are never written or freed. A
/// resource without data ("null") can exist; loading it fails with
/// [`BridgeError::NoData`](embed_bridge_common::BridgeError::NoData).
#[derive(Clone, Copy)]
pub struct EmbeddedResource {
    name: &'static str,
    bytes: Option<&'static [u8]>,
}

impl EmbeddedResource {
    /// A resource with no data.
    pub const fn null(name: &'static str) -> Self {
        Self { name, bytes: None }
    }

    /// A resource backed by bytes already in the binary, e.g. from
    /// `include_bytes!`.
    pub const fn from_static(name: &'static str, bytes: &'static [u8]) -> Self {
        Self {
            name,
            bytes: Some(bytes),
        }
    }

    /// Build a resource from a linker start/end symbol pair.
    ///
    /// The length is `end - start`. An `end` below `start` yields an empty
    /// payload. A null `start` yields a null resource.
    ///
    /// # Safety
    ///
    /// `start..end` must bound one immutable allocation that lives for the
    /// rest of the process.
    #[allow(unsafe_code)]
    pub unsafe fn from_symbol_pair(name: &'static str, start: *const u8, end: *const u8) -> Self {
        if start.is_null() {
            return Self::null(name);
        }

        let len = (end as usize).checked_sub(start as usize).unwrap_or_else(|| {
            warn!(
                resource = name,
                start = ?start,
                end = ?end,
                "End symbol precedes start symbol; treating payload as empty"
            );
            0
        });

        trace!(
            resource = name,
            convention = %SymbolConvention::CURRENT,
            len,
            "Embedded resource located"
        );

        // SAFETY: the caller guarantees `start..start + len` is one live,
        // immutable allocation.
        let bytes = unsafe { std::slice::from_raw_parts(start, len) };
        Self::from_static(name, bytes)
    }

    /// Build a resource from a section start and its looked-up size.
    ///
    /// # Safety
    ///
    /// `len` bytes starting at `start` must be one immutable allocation that
    /// lives for the rest of the process.
    #[allow(unsafe_code)]
    pub unsafe fn from_section(name: &'static str, start: *const u8, len: usize) -> Self {
        if start.is_null() {
            return Self::null(name);
        }

        trace!(
            resource = name,
            convention = %SymbolConvention::CURRENT,
            len,
            "Embedded resource located"
        );

        // SAFETY: upheld by the caller.
        let bytes = unsafe { std::slice::from_raw_parts(start, len) };
        Self::from_static(name, bytes)
    }

    /// Logical resource name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The payload, or `None` for a null resource.
    pub fn bytes(&self) -> Option<&'static [u8]> {
        self.bytes
    }

    /// Pointer to the first byte, or null.
    pub fn as_ptr(&self) -> *const u8 {
        self.bytes.map_or(std::ptr::null(), <[u8]>::as_ptr)
    }

    /// Payload length in bytes (0 for a null resource).
    pub fn len(&self) -> usize {
        self.bytes.map_or(0, <[u8]>::len)
    }

    /// Returns `true` if the payload has no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if the resource has no data at all.
    pub fn is_null(&self) -> bool {
        self.bytes.is_none()
    }
}

impl fmt::Debug for EmbeddedResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddedResource")
            .field("name", &self.name)
            .field("ptr", &self.as_ptr())
            .field("len", &self.len())
            .finish()
    }
}

/// Size of a `__DATA` section in the running image, or 0 if it is missing.
///
/// `section` is the NUL-terminated section name. Used by
/// [`embedded_resource!`](crate::embedded_resource); Mach-O section names are
/// limited to 16 bytes.
#[cfg(target_os = "macos")]
#[doc(hidden)]
#[allow(unsafe_code)]
pub fn data_section_size(section: &'static str) -> usize {
    use std::ffi::{CStr, c_char};

    /// `struct section_64` from `<mach-o/loader.h>`.
    #[repr(C)]
    #[allow(dead_code)]
    struct Section64 {
        sectname: [c_char; 16],
        segname: [c_char; 16],
        addr: u64,
        size: u64,
        offset: u32,
        align: u32,
        reloff: u32,
        nreloc: u32,
        flags: u32,
        reserved1: u32,
        reserved2: u32,
        reserved3: u32,
    }

    unsafe extern "C" {
        fn getsectbyname(segname: *const c_char, sectname: *const c_char) -> *const Section64;
    }

    let Ok(sectname) = CStr::from_bytes_with_nul(section.as_bytes()) else {
        warn!(section, "Section name is not NUL-terminated");
        return 0;
    };

    // SAFETY: both arguments are valid C strings; the returned pointer is
    // either null or points into the loaded image's headers.
    let header = unsafe { getsectbyname(c"__DATA".as_ptr(), sectname.as_ptr()) };
    if header.is_null() {
        warn!(section, "Section not found in __DATA segment");
        return 0;
    }

    // SAFETY: non-null results reference a valid `section_64` header.
    let size = unsafe { (*header).size };
    usize::try_from(size).unwrap_or(0)
}

/// Locate an embedded resource by its identifier.
///
/// The identifier is the source file name with every non-alphanumeric
/// character replaced by `_`. The linker symbols for it must exist in the
/// final executable, otherwise linking fails.
///
/// ```ignore
/// use embed_bridge_core::embedded_resource;
///
/// // Built from `determine-basal.mjs`
/// let resource = embedded_resource!(determine_basal_mjs);
/// assert!(!resource.is_null());
/// ```
#[macro_export]
macro_rules! embedded_resource {
    ($ident:ident) => {{
        #[cfg(target_os = "macos")]
        #[allow(unsafe_code)]
        fn locate() -> $crate::resource::EmbeddedResource {
            unsafe extern "C" {
                #[link_name = concat!("\u{1}section$start$__DATA$__", stringify!($ident))]
                static START: u8;
            }

            let len =
                $crate::resource::data_section_size(concat!("__", stringify!($ident), "\0"));
            // SAFETY: ld64 places the whole section at `START`.
            unsafe {
                $crate::resource::EmbeddedResource::from_section(
                    stringify!($ident),
                    &raw const START,
                    len,
                )
            }
        }

        #[cfg(all(windows, not(target_os = "macos")))]
        #[allow(unsafe_code)]
        fn locate() -> $crate::resource::EmbeddedResource {
            unsafe extern "C" {
                #[link_name = concat!("binary_", stringify!($ident), "_start")]
                static START: u8;
                #[link_name = concat!("binary_", stringify!($ident), "_end")]
                static END: u8;
            }

            // SAFETY: the linker brackets one read-only blob with these symbols.
            unsafe {
                $crate::resource::EmbeddedResource::from_symbol_pair(
                    stringify!($ident),
                    &raw const START,
                    &raw const END,
                )
            }
        }

        #[cfg(not(any(windows, target_os = "macos")))]
        #[allow(unsafe_code)]
        fn locate() -> $crate::resource::EmbeddedResource {
            unsafe extern "C" {
                #[link_name = concat!("_binary_", stringify!($ident), "_start")]
                static START: u8;
                #[link_name = concat!("_binary_", stringify!($ident), "_end")]
                static END: u8;
            }

            // SAFETY: the linker brackets one read-only blob with these symbols.
            unsafe {
                $crate::resource::EmbeddedResource::from_symbol_pair(
                    stringify!($ident),
                    &raw const START,
                    &raw const END,
                )
            }
        }

        locate()
    }};
}
