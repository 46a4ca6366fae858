//! Extraction of build-time constants from a generated service worker
//!
//! Generated workers embed the manifest as two JSON literals:
//!
//! ```text
//! const RESOURCES = {"index.html": "316dbd5a...", ...};
//! const CORE = ["main.dart.js", "index.html", ...];
//! ```
//!
//! Only those literals are read; the rest of the script is ignored.

use super::{AppManifest, CoreAssets, ResourceManifest};

const RESOURCES_DECL: &str = "const RESOURCES";
const CORE_DECL: &str = "const CORE";

/// Parse the `RESOURCES` and `CORE` constants out of a worker script
pub fn parse_worker_script(script: &str) -> Result<AppManifest, String> {
    let resources_literal = literal_after(script, RESOURCES_DECL, '{', '}')?;
    let resources: ResourceManifest = serde_json::from_str(resources_literal)
        .map_err(|e| format!("RESOURCES is not a JSON object of strings: {}", e))?;

    // Older generators had no CORE list; an empty one just stages nothing.
    let core = if script.contains(CORE_DECL) {
        let core_literal = literal_after(script, CORE_DECL, '[', ']')?;
        serde_json::from_str::<CoreAssets>(core_literal)
            .map_err(|e| format!("CORE is not a JSON array of strings: {}", e))?
    } else {
        CoreAssets::default()
    };

    Ok(AppManifest { resources, core })
}

/// Find the bracketed literal assigned to `decl`
fn literal_after<'a>(script: &'a str, decl: &str, open: char, close: char) -> Result<&'a str, String> {
    let decl_at = script
        .find(decl)
        .ok_or_else(|| format!("'{}' not found in worker script", decl))?;
    let after_decl = &script[decl_at + decl.len()..];

    let eq = after_decl
        .find('=')
        .ok_or_else(|| format!("'{}' has no initializer", decl))?;
    let value = after_decl[eq + 1..].trim_start();

    if !value.starts_with(open) {
        return Err(format!("'{}' must be initialized with a '{}' literal", decl, open));
    }

    let end = matching_close(value, open, close)
        .ok_or_else(|| format!("unterminated literal for '{}'", decl))?;
    Ok(&value[..=end])
}

/// Byte index of the bracket closing the one at index 0, skipping strings
fn matching_close(value: &str, open: char, close: char) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string: Option<char> = None;
    let mut escaped = false;

    for (idx, c) in value.char_indices() {
        if let Some(quote) = in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == quote {
                in_string = None;
            }
            continue;
        }

        match c {
            '"' | '\'' => in_string = Some(c),
            c if c == open => depth += 1,
            c if c == close => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }

    None
}
