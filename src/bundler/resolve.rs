use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Extensions tried, in order, for an extension-less local specifier.
const EXTENSIONS: &[&str] = &["ts", "js", "mjs"];

const INDEX_FILES: &[&str] = &["index.ts", "index.js"];

/// Local specifiers are relative paths; everything else is left to the runtime.
pub fn is_local_specifier(specifier: &str) -> bool {
    specifier.starts_with("./") || specifier.starts_with("../")
}

/// Resolve a local import specifier against the importing file's directory.
///
/// Returns the canonical path of the first existing candidate.
pub fn resolve_import(dir: &Path, specifier: &str) -> Option<PathBuf> {
    let base = dir.join(specifier);

    let mut candidates = vec![base.clone()];
    for ext in EXTENSIONS {
        let mut with_ext = OsString::from(base.as_os_str());
        with_ext.push(".");
        with_ext.push(ext);
        candidates.push(PathBuf::from(with_ext));
    }
    // TypeScript ESM sources import `./x.js` while the file on disk is `x.ts`.
    if let Some(stem) = specifier.strip_suffix(".js") {
        candidates.push(dir.join(format!("{}.ts", stem)));
    }
    for index in INDEX_FILES {
        candidates.push(base.join(index));
    }

    candidates
        .into_iter()
        .find(|candidate| candidate.is_file())
        .and_then(|found| found.canonicalize().ok())
}
