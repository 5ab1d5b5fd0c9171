//! # Key Space Primitives
//!
//! Fixed limits for the console key space and store queries.
//! These are compiled into the binary and are immutable at runtime.

/// Page size used by list views when listing a namespace.
///
/// Callers must not assume the whole namespace fits in one page.
pub const DEFAULT_RANGE_LIMIT: usize = 2000;

/// Upper bound on a single range query, whatever the caller asks for.
pub const MAX_RANGE_LIMIT: usize = 10_000;

/// Maximum length of a full hierarchical key in bytes.
pub const MAX_KEY_LENGTH: usize = 1024;

/// Maximum encoded size of a single stored value (4 MB).
///
/// Multiline fields carry whole XML site files, so this is generous.
pub const MAX_VALUE_BYTES: usize = 4 * 1024 * 1024;

/// Path separator of the key space.
pub const SEPARATOR: char = '/';
