//! Extraction of the `definition` export from bundled tool code.
//!
//! The code is scanned, never executed: the `definition` binding is located
//! in the comment- and string-masked source and its object literal is parsed
//! into a typed [`ToolDefinition`].

use crate::definition::types::ToolDefinition;
use crate::error::{PackagingError, Result};
use crate::script::{self, parse_literal_at};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// Matches the binding forms tool authors use:
/// `export const definition: T = {`, `const definition = {`,
/// and class fields such as `definition: ToolDefinition<C, P, R> = {`.
fn definition_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?:^|[\s;{}])(?:export\s+)?(?:(?:const|let|var)\s+)?(?:(?:public|readonly|static)\s+)*definition\s*(?::\s*[^=;{}()]*?)?=",
        )
        .expect("definition pattern is a valid regex")
    })
}

/// Load and validate the tool definition declared in the file at `path`.
pub fn load_definition(path: &Path) -> Result<ToolDefinition> {
    let source = std::fs::read_to_string(path).map_err(|e| {
        PackagingError::DefinitionLoad(format!("cannot read {}: {}", path.display(), e))
    })?;
    let definition = load_definition_from_source(&source)?;

    tracing::debug!(
        path = %path.display(),
        tool_id = %definition.id,
        "Tool definition loaded"
    );
    Ok(definition)
}

/// Extract and validate the `definition` declared in `source`.
pub fn load_definition_from_source(source: &str) -> Result<ToolDefinition> {
    let masked = script::mask(source, true)
        .map_err(|e| PackagingError::DefinitionLoad(format!("malformed source: {}", e)))?;

    let literal_start = definition_pattern()
        .find_iter(&masked)
        .map(|m| m.end())
        // `definition ==` and `definition =>` are expressions, not bindings.
        .find(|&end| !matches!(masked.as_bytes().get(end), Some(b'=') | Some(b'>')))
        .ok_or_else(|| {
            PackagingError::DefinitionLoad("no `definition` export found".to_string())
        })?;

    let (value, _) = parse_literal_at(source, literal_start)
        .map_err(|e| PackagingError::DefinitionLoad(format!("definition literal: {}", e)))?;

    ToolDefinition::from_value(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMAS: &str = r#"
        configurations: { type: 'object', properties: {}, required: [] },
        parameters: {
            type: 'object',
            properties: { message: { type: 'string' } },
            required: ['message'],
        },
        result: {
            type: 'object',
            properties: { message: { type: 'string' } },
            required: ['message'],
        },
    "#;

    #[test]
    fn test_export_const_with_type_annotation() {
        let src = format!(
            r#"
            import {{ BaseTool }} from '@shinkai/tool';
            export const definition: ToolDefinition<typeof run> = {{
                id: 'shinkai-tool-echo',
                name: 'Shinkai: Echo',
                description: 'Echoes the input message',
                author: 'Shinkai',
                keywords: ['echo', 'shinkai'],
                {SCHEMAS}
            }};
            export const run = async (config, params) => ({{ message: params.message }});
            "#
        );
        let def = load_definition_from_source(&src).unwrap();
        assert_eq!(def.id, "shinkai-tool-echo");
        assert_eq!(def.keywords, vec!["echo", "shinkai"]);
        assert_eq!(def.parameters["required"][0], "message");
    }

    #[test]
    fn test_class_field_form() {
        let src = format!(
            r#"
            export class Tool extends BaseTool<Config, Params, Result> {{
              definition: ToolDefinition<Config, Params, Result> = {{
                id: 'shinkai-tool-find-file-fs',
                name: 'Shinkai: Find File Path',
                description:
                  'Finds a file path using its name, partial name and/ or extension.',
                author: 'Shinkai',
                keywords: ['find-file-fs', 'shinkai'],
                {SCHEMAS}
              }};

              async run(params: Params): Promise<RunResult<Result>> {{
                return {{ data: {{ files: [] }} }};
              }}
            }}
            "#
        );
        let def = load_definition_from_source(&src).unwrap();
        assert_eq!(def.id, "shinkai-tool-find-file-fs");
    }

    #[test]
    fn test_commented_out_definition_ignored() {
        let src = format!(
            r#"
            // export const definition = {{ id: 'old' }};
            const note = "definition = nope";
            export const definition = {{
                id: 'current', name: 'n', description: 'd', author: 'a', keywords: [],
                {SCHEMAS}
            }};
            "#
        );
        let def = load_definition_from_source(&src).unwrap();
        assert_eq!(def.id, "current");
    }

    #[test]
    fn test_comparison_is_not_a_binding() {
        let src = "if (definition == null) { throw new Error('x'); }";
        let err = load_definition_from_source(src).unwrap_err();
        assert!(matches!(err, PackagingError::DefinitionLoad(_)));
    }

    #[test]
    fn test_missing_export() {
        let err = load_definition_from_source("export const run = () => 1;").unwrap_err();
        assert!(err.to_string().contains("no `definition` export"));
    }

    #[test]
    fn test_non_literal_definition() {
        let src = "export const definition = buildDefinition();";
        assert!(load_definition_from_source(src).is_err());
    }

    #[test]
    fn test_schema_violation_is_definition_error() {
        let src = r#"
            export const definition = {
                id: 'bad', name: 'n', description: 'd', author: 'a', keywords: [],
                configurations: { type: 'object', properties: {} },
                parameters: { type: 'object', properties: {}, required: ['ghost'] },
                result: { type: 'object', properties: {} },
            };
        "#;
        let err = load_definition_from_source(src).unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_load_definition_missing_file() {
        let err = load_definition(Path::new("/nonexistent/index.ts")).unwrap_err();
        assert!(matches!(err, PackagingError::DefinitionLoad(_)));
    }
}
