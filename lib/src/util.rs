use std::path::{Path, PathBuf};

use crate::error::{Chainable, Result};

/// Convert text into a URL/file-safe token: transliterate to ASCII,
/// lowercase, turn whitespace runs and hyphens into a single hyphen, spell
/// `&` as `and`, and drop everything else. The output never starts or ends
/// with a hyphen and never contains two in a row.
pub fn slugify(string: &str) -> String {
    let mut output = String::with_capacity(string.len());

    let mut need_dash = false;
    for ch in string.chars() {
        for b in deunicode::deunicode_char(ch).unwrap_or("").bytes() {
            match b {
                b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' => {
                    if need_dash {
                        output.push('-');
                        need_dash = false;
                    }

                    output.push(b.to_ascii_lowercase() as char);
                }
                b'&' => {
                    if !output.is_empty() {
                        output.push('-');
                    }

                    output.push_str("and");
                    need_dash = true;
                }
                b'-' | b' ' | b'\t' | b'\r' | b'\n' => need_dash = true,
                _ => { }
            }
        }
    }

    output
}

/// Strip leading and trailing `/` from a user-supplied path string.
pub fn trim_slashes(string: &str) -> &str {
    string.trim_matches('/')
}

/// Resolve a user-supplied output path: absolute paths are taken as-is,
/// relative ones are anchored at the process working directory.
pub fn clean_path(string: &str) -> Result<PathBuf> {
    let path = Path::new(string);
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }

    let cwd = std::env::current_dir()
        .chain_with(|| "failed to determine the working directory")?;

    Ok(cwd.join(trim_slashes(string)))
}
