//! Deterministic archive file naming.

use slug::slugify;

/// Suffix used for files that are being written or that could not be deleted.
pub const TEMP_SUFFIX: &str = ".tmp";

/// Chroma names the catalog uses to mean "no chroma".
const NO_CHROMA: &[&str] = &["", "null"];

/// Builds the on-disk archive file name for a skin and optional chroma.
///
/// The name is lowercased and reduced to `[a-z0-9-]`, so two calls with the
/// same input always produce the same file name.
///
/// ```
/// use ltk_skin_registry::archive_file_name;
///
/// assert_eq!(archive_file_name("Aatrox Skin Name", None, "archive"), "aatrox-skin-name.archive");
/// assert_eq!(
///     archive_file_name("Blood Moon Aatrox", Some("Ruby"), "fantome"),
///     "blood-moon-aatrox-ruby.fantome"
/// );
/// ```
pub fn archive_file_name(display_name: &str, chroma_name: Option<&str>, extension: &str) -> String {
    let mut stem = slugify(display_name);

    if let Some(chroma) = chroma_name.map(str::trim) {
        if !NO_CHROMA.contains(&chroma.to_ascii_lowercase().as_str()) {
            let chroma = slugify(chroma);
            if !chroma.is_empty() {
                if !stem.is_empty() {
                    stem.push('-');
                }
                stem.push_str(&chroma);
            }
        }
    }

    if stem.is_empty() {
        stem.push_str("skin");
    }

    let extension = extension.trim_start_matches('.');
    if extension.is_empty() {
        stem
    } else {
        format!("{stem}.{extension}")
    }
}

/// Returns the temporary name used while writing or parking `file_name`.
pub fn temp_file_name(file_name: &str) -> String {
    format!("{file_name}{TEMP_SUFFIX}")
}

/// Whether `file_name` is a leftover temporary file.
pub fn is_temp_file(file_name: &str) -> bool {
    file_name.ends_with(TEMP_SUFFIX)
}
