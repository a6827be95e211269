//! Bundling of a tool's entry source and its local imports into one file.
//!
//! Local modules (`./` and `../` specifiers) are inlined dependency-first,
//! each exactly once. External imports are hoisted to the top and left for
//! the hosting runtime to resolve.

mod resolve;

use crate::error::{PackagingError, Result};
use crate::script;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub use resolve::{is_local_specifier, resolve_import};

/// Result of bundling one entry file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    pub code: String,
    /// Hex SHA-256 of `code`.
    pub sha256: String,
}

impl Bundle {
    fn new(code: String) -> Self {
        let sha256 = Sha256::digest(code.as_bytes())
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();
        Self { code, sha256 }
    }
}

/// Import/re-export statements that carry a module specifier.
fn import_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"(?m)^[ \t]*(import|export)\s+(?:type\s+)?((?:[^;'"`]*?\s)?from\s*)?['"]([^'"\n]+)['"][ \t]*;?[ \t]*\r?\n?"#,
        )
        .expect("import pattern is a valid regex")
    })
}

fn namespace_import_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\s*import\s+\*\s+as\s").expect("valid regex"))
}

fn reexport_list_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\s*export\s+(?:type\s+)?(\{[^}]*\})").expect("valid regex"))
}

/// `export` on declarations of inlined dependencies.
fn export_declaration_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?m)^([ \t]*)export\s+(?:default\s+)?((?:declare\s+)?(?:async\s+function|function|abstract\s+class|class|const\s+enum|const|let|var|interface|type|enum)\b)",
        )
        .expect("valid regex")
    })
}

/// `as` inside a named import/export list.
fn alias_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\bas\b").expect("valid regex"))
}

/// `export default` followed by whatever it exports.
fn export_default_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?m)^[ \t]*export\s+default\s+(?:(async\s+function|function|abstract\s+class|class|interface)\b)?")
            .expect("valid regex")
    })
}

/// Local `export { a, b };` lists in inlined dependencies.
fn export_list_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?m)^[ \t]*export\s+(?:type\s+)?\{[^}]*\}[ \t]*;?[ \t]*\r?\n?").expect("valid regex")
    })
}

struct BundleState {
    root: PathBuf,
    visited: HashSet<PathBuf>,
    externals: Vec<String>,
    seen_externals: HashSet<String>,
    modules: Vec<String>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Bundler;

impl Bundler {
    pub fn new() -> Self {
        Self
    }

    /// Bundle `entry` and every local module it transitively imports.
    ///
    /// Deterministic: the same inputs always produce byte-identical code.
    pub fn bundle(&self, entry: &Path) -> Result<Bundle> {
        let entry = entry
            .canonicalize()
            .map_err(|e| PackagingError::bundle(entry, format!("cannot read entry: {}", e)))?;
        let root = entry
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("/"));

        let mut state = BundleState {
            root,
            visited: HashSet::new(),
            externals: Vec::new(),
            seen_externals: HashSet::new(),
            modules: Vec::new(),
        };
        self.visit(&entry, true, &mut state)?;

        let mut code = String::new();
        if !state.externals.is_empty() {
            code.push_str(&state.externals.join("\n"));
            code.push_str("\n\n");
        }
        code.push_str(&state.modules.join("\n\n"));
        code.push('\n');

        let bundle = Bundle::new(code);
        tracing::info!(
            entry = %entry.display(),
            modules = state.modules.len(),
            external_imports = state.externals.len(),
            bytes = bundle.code.len(),
            sha256 = %bundle.sha256,
            "Tool bundled"
        );
        Ok(bundle)
    }

    fn visit(&self, path: &Path, is_entry: bool, state: &mut BundleState) -> Result<()> {
        if !state.visited.insert(path.to_path_buf()) {
            return Ok(());
        }

        if matches!(path.extension().and_then(|e| e.to_str()), Some("tsx" | "jsx")) {
            return Err(PackagingError::bundle(path, "JSX sources are not supported"));
        }

        let source = std::fs::read_to_string(path)
            .map_err(|e| PackagingError::bundle(path, format!("cannot read: {}", e)))?;
        let masked = script::mask(&source, false)
            .map_err(|e| PackagingError::bundle(path, format!("syntax error at {}", e)))?;

        // Inlined modules lose their exports, so a default-exported
        // expression would be left dangling.
        if !is_entry {
            let dangling = export_default_pattern()
                .captures_iter(&masked)
                .find(|caps| caps.get(1).is_none())
                .and_then(|caps| caps.get(0));
            if let Some(found) = dangling {
                return Err(PackagingError::bundle(
                    path,
                    format!(
                        "line {}: `export default` of an expression is not supported in an imported module",
                        script::line_of(&source, found.start())
                    ),
                ));
            }
        }

        let dir = path.parent().unwrap_or(Path::new("/"));
        let mut body = String::with_capacity(source.len());
        let mut last = 0;

        for caps in import_pattern().captures_iter(&masked) {
            let (Some(whole), Some(keyword), Some(specifier)) = (caps.get(0), caps.get(1), caps.get(3))
            else {
                continue;
            };
            let statement = &source[whole.range()];
            body.push_str(&source[last..whole.start()]);
            last = whole.end();

            let specifier = specifier.as_str();
            if !is_local_specifier(specifier) {
                let statement = statement.trim().to_string();
                if state.seen_externals.insert(statement.clone()) {
                    state.externals.push(statement);
                }
                continue;
            }

            if namespace_import_pattern().is_match(statement) {
                return Err(PackagingError::bundle(
                    path,
                    format!("namespace import of local module '{}' is not supported", specifier),
                ));
            }

            if let Some(clause) = caps.get(2) {
                check_local_bindings(
                    path,
                    specifier,
                    keyword.as_str(),
                    is_entry,
                    &masked[clause.range()],
                )?;
            }

            let target = resolve_import(dir, specifier).ok_or_else(|| {
                PackagingError::bundle(path, format!("unresolved import '{}'", specifier))
            })?;
            self.visit(&target, false, state)?;

            // The entry keeps the names it re-exports from inlined modules.
            if is_entry && keyword.as_str() == "export" {
                match reexport_list_pattern().captures(statement).and_then(|c| c.get(1)) {
                    Some(names) => {
                        body.push_str(&format!("export {};\n", names.as_str()));
                    }
                    None => {
                        return Err(PackagingError::bundle(
                            path,
                            format!("wildcard re-export of local module '{}' is not supported", specifier),
                        ))
                    }
                }
            }
        }
        body.push_str(&source[last..]);

        let body = if is_entry {
            body
        } else {
            strip_exports(&body)
        };

        let marker = relative_display(&state.root, path);
        state
            .modules
            .push(format!("// {}\n{}", marker, body.trim_matches(|c| c == '\n' || c == '\r')));
        Ok(())
    }
}

/// Inlining makes the imported names visible under their declared names
/// only, so bindings that rename or take the default export cannot be kept.
fn check_local_bindings(
    path: &Path,
    specifier: &str,
    keyword: &str,
    is_entry: bool,
    clause: &str,
) -> Result<()> {
    let clause = clause.trim_end();
    let clause = clause.strip_suffix("from").unwrap_or(clause).trim();

    let (default_binding, named) = match clause.find('{') {
        Some(open) => (clause[..open].trim().trim_end_matches(','), &clause[open..]),
        None => (clause, ""),
    };

    if keyword == "import" && !default_binding.trim().is_empty() {
        return Err(PackagingError::bundle(
            path,
            format!("default import of local module '{}' is not supported", specifier),
        ));
    }
    // The entry keeps `export { a as b };`, which stays valid once `a` is inlined.
    let renames_allowed = keyword == "export" && is_entry;
    if !renames_allowed && alias_pattern().is_match(named) {
        return Err(PackagingError::bundle(
            path,
            format!("renamed binding from local module '{}' is not supported", specifier),
        ));
    }
    Ok(())
}

/// Remove `export` from declarations of an inlined module.
fn strip_exports(body: &str) -> String {
    let without_lists = export_list_pattern().replace_all(body, "");
    export_declaration_pattern()
        .replace_all(&without_lists, "$1$2")
        .into_owned()
}

/// Display `path` relative to `root` with `/` separators.
fn relative_display(root: &Path, path: &Path) -> String {
    let root: Vec<_> = root.components().collect();
    let target: Vec<_> = path.components().collect();
    let common = root
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let ups = std::iter::repeat("..".to_string()).take(root.len() - common);
    let downs = target[common..]
        .iter()
        .map(|c| c.as_os_str().to_string_lossy().into_owned());
    ups.chain(downs).collect::<Vec<_>>().join("/")
}
