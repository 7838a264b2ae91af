//! Node name validation and extension derivation.
//!
//! Every user-supplied name (directory, upload filename, rename target) passes through
//! [`sanitize_name`] before it reaches the catalog or is used to derive anything else.

use crate::MAX_NAME_LEN;
use std::fmt;

/// Longest extension recorded for a file.
const MAX_EXTENSION_LEN: usize = 16;

/// A node name that passed sanitizing.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SafeName(String);

impl SafeName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Lowercased extension derived from the name, if any.
    pub fn extension(&self) -> Option<String> {
        extension_of(&self.0)
    }
}

impl fmt::Debug for SafeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SafeName({:?})", self.0)
    }
}

impl fmt::Display for SafeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SafeName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Validate a node name.
///
/// Surrounding whitespace is trimmed. Path separators, `.`/`..` and control
/// characters are rejected as unsafe; empty or overlong names are invalid.
pub fn sanitize_name(raw: &str) -> crate::Result<SafeName> {
    let name = raw.trim();

    if name.is_empty() {
        return Err(crate::Error::InvalidName("name must not be empty".to_string()));
    }

    if name.len() > MAX_NAME_LEN {
        return Err(crate::Error::InvalidName(format!(
            "name is {} bytes long (max: {})",
            name.len(),
            MAX_NAME_LEN
        )));
    }

    if name == "." || name == ".." {
        return Err(crate::Error::UnsafeFilename(name.to_string()));
    }

    if name.contains(['/', '\\']) {
        return Err(crate::Error::UnsafeFilename(format!(
            "path separators not allowed: {name}"
        )));
    }

    if name.chars().any(char::is_control) {
        return Err(crate::Error::UnsafeFilename(
            "control characters not allowed".to_string(),
        ));
    }

    Ok(SafeName(name.to_string()))
}

/// Derive the lowercased extension of a file name.
///
/// Dotfiles such as `.bashrc` have no extension. Extensions that are not plain
/// alphanumerics or that exceed 16 characters are ignored.
pub fn extension_of(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.len() > MAX_EXTENSION_LEN {
        return None;
    }
    if !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
