//! Stages shared by the style and script chains.

use crate::build::{FileRecord, Stage, StageError};
use crate::sourcemap::{CommentStyle, SourceMap};
use std::path::PathBuf;

/// Start recording a source map on every record.
pub struct SourceMapInit;

impl Stage for SourceMapInit {
    fn name(&self) -> &'static str {
        "sourcemap-init"
    }

    fn apply(&self, files: Vec<FileRecord>) -> Result<Vec<FileRecord>, StageError> {
        files
            .into_iter()
            .map(|mut file| {
                let map = SourceMap::identity(&file.display_name(), file.text()?);
                file.source_map = Some(map);
                Ok(file)
            })
            .collect()
    }
}

/// Join all records into one named file.
///
/// Maps of the inputs (when recording) are merged with their offsets in
/// the joined text. No input produces no output.
pub struct Concat {
    file_name: String,
    separator: String,
}

impl Concat {
    pub fn new(file_name: &str, separator: &str) -> Self {
        Self { file_name: file_name.to_string(), separator: separator.to_string() }
    }
}

impl Stage for Concat {
    fn name(&self) -> &'static str {
        "concat"
    }

    fn apply(&self, files: Vec<FileRecord>) -> Result<Vec<FileRecord>, StageError> {
        let Some(first) = files.first() else {
            return Ok(vec![]);
        };
        let base = first.base.clone();
        let recording = files.iter().any(|f| f.source_map.is_some());

        let mut joined = String::new();
        let mut map = recording.then(SourceMap::default);

        for (index, file) in files.iter().enumerate() {
            if index > 0 {
                joined.push_str(&self.separator);
            }
            if let (Some(map), Some(part)) = (map.as_mut(), file.source_map.as_ref()) {
                let line = joined.matches('\n').count();
                let column = joined.rsplit('\n').next().map_or(0, |tail| tail.chars().count());
                map.append(part, line, column as u32);
            }
            joined.push_str(file.text()?);
        }

        let mut out = FileRecord::new(&base, &PathBuf::from(&self.file_name), joined.into_bytes());
        out.source_map = map.map(|mut m| {
            m.set_file(self.file_name.clone());
            m
        });
        Ok(vec![out])
    }
}

/// Append the recorded map as an inline comment.
pub struct SourceMapWrite {
    style: CommentStyle,
}

impl SourceMapWrite {
    pub fn new(style: CommentStyle) -> Self {
        Self { style }
    }
}

impl Stage for SourceMapWrite {
    fn name(&self) -> &'static str {
        "sourcemap-write"
    }

    fn apply(&self, files: Vec<FileRecord>) -> Result<Vec<FileRecord>, StageError> {
        files
            .into_iter()
            .map(|mut file| {
                if let Some(mut map) = file.source_map.take() {
                    map.set_file(file.display_name());
                    let text = format!("{}{}", file.text()?, map.inline_comment(self.style));
                    file.set_text(text);
                }
                Ok(file)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::Chain;
    use std::path::Path;

    fn record(name: &str, text: &str) -> FileRecord {
        FileRecord::new(Path::new("/src"), Path::new(name), text.as_bytes().to_vec())
    }

    #[test]
    fn test_concat_joins_in_order() {
        let out = Concat::new("all.js", ";")
            .apply(vec![record("a.js", "a()"), record("b.js", "b()")])
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].path, PathBuf::from("all.js"));
        assert_eq!(out[0].contents, b"a();b()");
        assert!(out[0].source_map.is_none());
    }

    #[test]
    fn test_concat_empty_input() {
        assert!(Concat::new("all.js", ";").apply(vec![]).unwrap().is_empty());
    }

    #[test]
    fn test_concat_merges_maps() {
        let chain = Chain::new().stage(SourceMapInit).stage(Concat::new("style.css", "\n"));
        let out = chain.run(vec![record("lib.css", "a{}\nb{}"), record("main.css", "c{}")]).unwrap();

        let map = out[0].source_map.as_ref().unwrap();
        assert_eq!(map.sources(), &["lib.css".to_string(), "main.css".to_string()]);
        assert_eq!(map.file(), "style.css");
        assert_eq!(map.mappings(), "AAAA;AACA;ACDA");
    }

    #[test]
    fn test_sourcemap_write_comment_styles() {
        let chain = Chain::new()
            .stage(SourceMapInit)
            .stage(Concat::new("script.min.js", ";"))
            .stage(SourceMapWrite::new(CommentStyle::Js));
        let out = chain.run(vec![record("main.js", "go()")]).unwrap();

        let text = String::from_utf8(out[0].contents.clone()).unwrap();
        assert!(text.starts_with("go()\n//# sourceMappingURL=data:application/json"));
        assert!(out[0].source_map.is_none());
    }

    #[test]
    fn test_sourcemap_write_without_map_is_noop() {
        let out = SourceMapWrite::new(CommentStyle::Css).apply(vec![record("a.css", "a{}")]).unwrap();
        assert_eq!(out[0].contents, b"a{}");
    }
}
