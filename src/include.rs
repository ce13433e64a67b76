//! Template inclusion for HTML pages
//!
//! Supports `@@include('path')` and `@@include('path', {"key": value})`.
//! Paths are resolved relative to the including file's directory. The JSON
//! object becomes a variable context: `@@key` inside the included file is
//! replaced with the value. Nested includes inherit the context of their
//! parent, with their own arguments taking precedence.
//!
//! The prefix (`@@` above) is configurable.

use regex::Regex;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type for include resolution failures.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum IncludeError {
    /// Circular include detected
    #[error("Circular include detected: {}", .0.display())]
    Circular(PathBuf),
    /// File not found
    #[error("Include file not found '{}' (included from {})", .path.display(), .from.display())]
    NotFound { path: PathBuf, from: PathBuf },
    /// Directive could not be parsed
    #[error("Malformed include in {}: {1}", .0.display())]
    Malformed(PathBuf, String),
    /// IO error reading file
    #[error("Error reading include file '{}': {1}", .0.display())]
    Io(PathBuf, String),
}

impl IncludeError {
    /// Cycles abort the initial build; everything else only fails the page's transform.
    pub fn is_fatal(&self) -> bool {
        matches!(self, IncludeError::Circular(_))
    }
}

/// Expands include directives.
#[derive(Debug, Clone)]
pub struct Includer {
    prefix: String,
    directive: Regex,
}

impl Includer {
    pub fn new(prefix: &str) -> Self {
        let pattern = format!(r"{}include\(\s*", regex::escape(prefix));
        let directive = Regex::new(&pattern).expect("escaped prefix is a valid regex");
        Self { prefix: prefix.to_string(), directive }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Expand every directive in `text`, which was read from `file`.
    pub fn expand(&self, text: &str, file: &Path) -> Result<String, IncludeError> {
        let root = std::fs::canonicalize(file).unwrap_or_else(|_| file.to_path_buf());
        let mut stack = vec![root];
        self.expand_with_context(text, file, &Map::new(), &mut stack)
    }

    fn expand_with_context(
        &self,
        text: &str,
        file: &Path,
        context: &Map<String, Value>,
        stack: &mut Vec<PathBuf>,
    ) -> Result<String, IncludeError> {
        let dir = file.parent().unwrap_or(Path::new(""));
        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;

        while let Some(found) = self.directive.find_at(text, cursor) {
            out.push_str(&substitute(&text[cursor..found.start()], &self.prefix, context));

            let (directive, consumed) = parse_directive(&text[found.end()..])
                .map_err(|msg| IncludeError::Malformed(file.to_path_buf(), msg))?;
            cursor = found.end() + consumed;

            let target = dir.join(&directive.path);
            let canonical = std::fs::canonicalize(&target).map_err(|_| IncludeError::NotFound {
                path: target.clone(),
                from: file.to_path_buf(),
            })?;
            if stack.contains(&canonical) {
                return Err(IncludeError::Circular(canonical));
            }

            let contents = std::fs::read_to_string(&canonical)
                .map_err(|e| IncludeError::Io(canonical.clone(), e.to_string()))?;

            let mut child_context = context.clone();
            child_context.extend(directive.args);

            stack.push(canonical);
            let expanded = self.expand_with_context(&contents, &target, &child_context, stack);
            stack.pop();
            out.push_str(&expanded?);
        }

        out.push_str(&substitute(&text[cursor..], &self.prefix, context));
        Ok(out)
    }
}

#[derive(Debug)]
struct Directive {
    path: String,
    args: Map<String, Value>,
}

/// Parse `'path' [, {json}] )` and return it with the number of bytes consumed.
fn parse_directive(rest: &str) -> Result<(Directive, usize), String> {
    let quote = rest.chars().next().ok_or("unexpected end of input")?;
    if quote != '\'' && quote != '"' {
        return Err("expected a quoted path".to_string());
    }
    let close = rest[1..].find(quote).ok_or("unterminated path string")? + 1;
    let path = rest[1..close].to_string();
    let mut pos = close + 1;

    let skip_ws = |pos: usize| pos + rest[pos..].len() - rest[pos..].trim_start().len();
    pos = skip_ws(pos);

    let mut args = Map::new();
    if rest[pos..].starts_with(',') {
        pos = skip_ws(pos + 1);
        let mut stream = serde_json::Deserializer::from_str(&rest[pos..]).into_iter::<Value>();
        match stream.next() {
            Some(Ok(Value::Object(map))) => args = map,
            Some(Ok(_)) => return Err("include arguments must be a JSON object".to_string()),
            Some(Err(e)) => return Err(format!("invalid include arguments: {}", e)),
            None => return Err("missing include arguments".to_string()),
        }
        pos = skip_ws(pos + stream.byte_offset());
    }

    if !rest[pos..].starts_with(')') {
        return Err(format!("expected ')' after include of '{}'", path));
    }
    Ok((Directive { path, args }, pos + 1))
}

/// Replace `<prefix><key>` with the context value. Longer keys win over their prefixes.
fn substitute(text: &str, prefix: &str, context: &Map<String, Value>) -> String {
    if context.is_empty() || !text.contains(prefix) {
        return text.to_string();
    }
    let mut keys: Vec<&String> = context.keys().collect();
    keys.sort_by_key(|k| std::cmp::Reverse(k.len()));

    let mut out = text.to_string();
    for key in keys {
        let value = match &context[key] {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        out = out.replace(&format!("{}{}", prefix, key), &value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, text: &str) -> PathBuf {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_simple_include() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "partials/header.html", "<header>Hi</header>");
        let page = write(temp.path(), "index.html", "<body>@@include('partials/header.html')</body>");

        let text = fs::read_to_string(&page).unwrap();
        let out = Includer::new("@@").expand(&text, &page).unwrap();
        assert_eq!(out, "<body><header>Hi</header></body>");
    }

    #[test]
    fn test_nested_relative_to_including_file() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "partials/nav.html", "<nav/>");
        write(temp.path(), "partials/header.html", "<header>@@include(\"nav.html\")</header>");
        let page = write(temp.path(), "pages/index.html", "@@include('../partials/header.html')");

        let text = fs::read_to_string(&page).unwrap();
        let out = Includer::new("@@").expand(&text, &page).unwrap();
        assert_eq!(out, "<header><nav/></header>");
    }

    #[test]
    fn test_variables_and_inheritance() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "item.html", "<li>@@label @@count</li>");
        write(temp.path(), "list.html", "<h1>@@title</h1>@@include('item.html', {\"count\": 3})");
        let page = write(
            temp.path(),
            "index.html",
            "@@include('list.html', {\"title\": \"Menu\", \"label\": \"Item\"})",
        );

        let text = fs::read_to_string(&page).unwrap();
        let out = Includer::new("@@").expand(&text, &page).unwrap();
        assert_eq!(out, "<h1>Menu</h1><li>Item 3</li>");
    }

    #[test]
    fn test_longer_keys_substituted_first() {
        let mut ctx = Map::new();
        ctx.insert("a".to_string(), Value::String("x".to_string()));
        ctx.insert("ab".to_string(), Value::String("y".to_string()));
        assert_eq!(substitute("@@ab @@a", "@@", &ctx), "y x");
    }

    #[test]
    fn test_custom_prefix() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "part.html", "P");
        let page = write(temp.path(), "index.html", "$$include('part.html') @@include('x')");

        let text = fs::read_to_string(&page).unwrap();
        let out = Includer::new("$$").expand(&text, &page).unwrap();
        assert_eq!(out, "P @@include('x')");
    }

    #[test]
    fn test_circular_include_detection() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.html", "@@include('b.html')");
        write(temp.path(), "b.html", "@@include('a.html')");
        let page = write(temp.path(), "index.html", "@@include('a.html')");

        let text = fs::read_to_string(&page).unwrap();
        let err = Includer::new("@@").expand(&text, &page).unwrap_err();
        match &err {
            IncludeError::Circular(path) => assert!(path.ends_with("a.html")),
            other => panic!("expected circular error, got {other:?}"),
        }
        assert!(err.is_fatal());
    }

    #[test]
    fn test_self_include_is_circular() {
        let temp = TempDir::new().unwrap();
        let page = write(temp.path(), "index.html", "@@include('index.html')");
        let text = fs::read_to_string(&page).unwrap();
        let err = Includer::new("@@").expand(&text, &page).unwrap_err();
        assert!(matches!(err, IncludeError::Circular(_)));
    }

    #[test]
    fn test_same_partial_twice_is_not_a_cycle() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "hr.html", "<hr>");
        let page = write(temp.path(), "index.html", "@@include('hr.html')@@include('hr.html')");
        let text = fs::read_to_string(&page).unwrap();
        let out = Includer::new("@@").expand(&text, &page).unwrap();
        assert_eq!(out, "<hr><hr>");
    }

    #[test]
    fn test_missing_partial_is_not_fatal() {
        let temp = TempDir::new().unwrap();
        let page = write(temp.path(), "index.html", "@@include('missing.html')");
        let text = fs::read_to_string(&page).unwrap();
        let err = Includer::new("@@").expand(&text, &page).unwrap_err();
        assert!(matches!(err, IncludeError::NotFound { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_malformed_arguments() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "p.html", "");
        let page = write(temp.path(), "index.html", "@@include('p.html', [1, 2])");
        let text = fs::read_to_string(&page).unwrap();
        let err = Includer::new("@@").expand(&text, &page).unwrap_err();
        assert!(matches!(err, IncludeError::Malformed(_, _)));
    }

    #[test]
    fn test_parse_directive_nested_json() {
        let (directive, consumed) =
            parse_directive("'card.html', {\"meta\": {\"a\": 1}} ) tail").unwrap();
        assert_eq!(directive.path, "card.html");
        assert_eq!(directive.args["meta"]["a"], 1);
        assert_eq!(&"'card.html', {\"meta\": {\"a\": 1}} ) tail"[consumed..], " tail");
    }
}
