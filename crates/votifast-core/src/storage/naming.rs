//! Linux-safe file names for output artifacts.

const NAME_MAX: usize = 255;
const FINAL_EXTENSION: &str = ".m4a";

/// Sanitizes a candidate file name for safe use on Linux.
///
/// - Replaces NUL, `/`, `\`, and control characters with `_`
/// - Collapses consecutive replacements into one `_`
/// - Trims leading/trailing whitespace and dots
/// - Limits length to 255 bytes (Linux NAME_MAX)
///
/// Spaces are kept: titles are meant to be read.
pub fn sanitize_file_name(name: &str) -> String {
    truncate_to(sanitize(name), NAME_MAX)
}

/// `<artist line> - <title>.m4a`, sanitized, extension always preserved.
pub fn final_file_name(artist_line: &str, title: &str) -> String {
    name_with_suffix(artist_line, title, "")
}

/// `<artist line> - <title> (<n>).m4a` for the n-th item of a batch sharing
/// the same artist line and title.
pub fn numbered_file_name(artist_line: &str, title: &str, n: usize) -> String {
    name_with_suffix(artist_line, title, &format!(" ({n})"))
}

fn name_with_suffix(artist_line: &str, title: &str, suffix: &str) -> String {
    let stem = sanitize(&format!("{artist_line} - {title}"));
    let stem = truncate_to(stem, NAME_MAX - FINAL_EXTENSION.len() - suffix.len());
    let stem = if stem.is_empty() { "untitled".to_string() } else { stem };
    format!("{stem}{suffix}{FINAL_EXTENSION}")
}

fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_replaced = false;

    for c in name.chars() {
        if c == '\0' || c == '/' || c == '\\' || c.is_control() {
            if !prev_replaced {
                out.push('_');
            }
            prev_replaced = true;
        } else {
            out.push(c);
            prev_replaced = false;
        }
    }

    out.trim_matches(|c: char| c.is_whitespace() || c == '.')
        .to_string()
}

fn truncate_to(mut s: String, max: usize) -> String {
    if s.len() > max {
        let mut take = max;
        while take > 0 && !s.is_char_boundary(take) {
            take -= 1;
        }
        s.truncate(take);
    }
    s
}
