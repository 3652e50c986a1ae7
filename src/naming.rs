//! Physical file names for stored uploads.
//!
//! The stored name comes from the `physical_name` template, with these
//! tokens expanded:
//!
//! | Token | Value for record `7`, upload `Holiday Pic.JPG` |
//! |---|---|
//! | `{ID}` | `7` |
//! | `{FILENAME}` | `Holiday-Pic.JPG` |
//! | `{BASENAME}` | `Holiday-Pic` |
//! | `{EXT}` | `jpg` |
//!
//! Every derivative reuses the same name in its own directory, so the
//! extension (and with it the output format) always matches the source.

/// Replace anything outside `[A-Za-z0-9._-]` with `-` and strip leading dots.
///
/// Returns `"file"` when nothing usable is left.
///
/// - `"Holiday Pic.JPG"` → `"Holiday-Pic.JPG"`
/// - `"../../etc/passwd"` → `"-..-etc-passwd"`
/// - `".hidden.png"` → `"hidden.png"`
/// - `"日本.gif"` → `"--.gif"`
pub fn sanitize_file_name(name: &str) -> String {
    let mapped: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '-'
            }
        })
        .collect();
    let trimmed = mapped.trim_start_matches('.');
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Split a (sanitized) file name into stem and lowercased extension.
///
/// A trailing dot or a name with no dot yields an empty extension.
pub fn split_extension(name: &str) -> (&str, String) {
    match name.rfind('.') {
        Some(pos) if pos > 0 => (&name[..pos], name[pos + 1..].to_ascii_lowercase()),
        _ => (name, String::new()),
    }
}

/// Expand the `physical_name` template for one upload.
pub fn physical_name(template: &str, record_id: &str, original_name: &str) -> String {
    let file_name = sanitize_file_name(original_name);
    let (base_name, ext) = split_extension(&file_name);
    let id = sanitize_file_name(record_id);

    let expanded = template
        .replace("{ID}", &id)
        .replace("{BASENAME}", base_name)
        .replace("{EXT}", &ext)
        .replace("{FILENAME}", &file_name);
    sanitize_file_name(&expanded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_keeps_safe_characters() {
        assert_eq!(sanitize_file_name("a-b_c.d9.png"), "a-b_c.d9.png");
    }

    #[test]
    fn sanitize_replaces_spaces_and_unicode() {
        assert_eq!(sanitize_file_name("Holiday Pic.JPG"), "Holiday-Pic.JPG");
        assert_eq!(sanitize_file_name("日本.gif"), "--.gif");
    }

    #[test]
    fn sanitize_cannot_escape_directory() {
        let name = sanitize_file_name("../../etc/passwd");
        assert!(!name.contains('/'));
        assert!(!name.starts_with('.'));
        assert_eq!(name, "-..-etc-passwd");
    }

    #[test]
    fn sanitize_strips_leading_dots() {
        assert_eq!(sanitize_file_name(".hidden.png"), "hidden.png");
        assert_eq!(sanitize_file_name("..."), "file");
        assert_eq!(sanitize_file_name(""), "file");
    }

    #[test]
    fn split_extension_lowercases() {
        assert_eq!(split_extension("Photo.JPEG"), ("Photo", "jpeg".to_string()));
        assert_eq!(
            split_extension("archive.tar.GZ"),
            ("archive.tar", "gz".to_string())
        );
    }

    #[test]
    fn split_extension_without_dot() {
        assert_eq!(split_extension("README"), ("README", String::new()));
    }

    #[test]
    fn default_template() {
        assert_eq!(
            physical_name("{ID}-{FILENAME}", "7", "Holiday Pic.JPG"),
            "7-Holiday-Pic.JPG"
        );
    }

    #[test]
    fn basename_and_ext_tokens() {
        assert_eq!(
            physical_name("{BASENAME}_{ID}.{EXT}", "42", "Cat.PNG"),
            "Cat_42.png"
        );
    }

    #[test]
    fn record_id_is_sanitized() {
        assert_eq!(physical_name("{ID}-{FILENAME}", "a/b", "x.gif"), "a-b-x.gif");
    }

    #[test]
    fn template_slashes_are_neutralized() {
        assert_eq!(physical_name("{ID}/{FILENAME}", "1", "x.gif"), "1-x.gif");
    }
}
