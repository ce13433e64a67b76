//! Line-level source maps (revision 3).
//!
//! Maps are attached to file records when recording starts and follow the
//! record through concatenation. Every original line is mapped at column 0;
//! that is the granularity the concatenating stages can guarantee. Stages
//! that rewrite text opaquely (the Sass compiler) collapse the map onto one
//! source so the generated file still points at the right inputs.

use base64::Engine;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Mapping {
    generated_column: u32,
    source: u32,
    original_line: u32,
    original_column: u32,
}

/// Source map accumulated while a record moves through a chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceMap {
    file: String,
    sources: Vec<String>,
    sources_content: Vec<Option<String>>,
    lines: Vec<Vec<Mapping>>,
}

/// How the map reference is embedded in the generated file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentStyle {
    /// `/*# sourceMappingURL=... */`
    Css,
    /// `//# sourceMappingURL=...`
    Js,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RawSourceMap<'a> {
    version: u8,
    file: &'a str,
    sources: &'a [String],
    sources_content: &'a [Option<String>],
    names: [&'a str; 0],
    mappings: String,
}

impl SourceMap {
    /// Map every line of `content` onto itself.
    pub fn identity(source: &str, content: &str) -> Self {
        let line_count = content.split('\n').count();
        let lines = (0..line_count)
            .map(|line| {
                vec![Mapping {
                    generated_column: 0,
                    source: 0,
                    original_line: line as u32,
                    original_column: 0,
                }]
            })
            .collect();
        Self {
            file: source.to_string(),
            sources: vec![source.to_string()],
            sources_content: vec![Some(content.to_string())],
            lines,
        }
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn set_file(&mut self, file: impl Into<String>) {
        self.file = file.into();
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Register a source (with content) without adding mappings. Returns its index.
    pub fn add_source(&mut self, name: &str, content: Option<&str>) -> u32 {
        if let Some(index) = self.sources.iter().position(|s| s == name) {
            return index as u32;
        }
        self.sources.push(name.to_string());
        self.sources_content.push(content.map(str::to_string));
        (self.sources.len() - 1) as u32
    }

    /// Append `other`, whose generated text starts at `line_offset`/`column_offset`
    /// of this map's generated text.
    pub fn append(&mut self, other: &SourceMap, line_offset: usize, column_offset: u32) {
        let remap: Vec<u32> = other
            .sources
            .iter()
            .zip(&other.sources_content)
            .map(|(name, content)| self.add_source(name, content.as_deref()))
            .collect();

        for (index, segments) in other.lines.iter().enumerate() {
            let target = line_offset + index;
            if self.lines.len() <= target {
                self.lines.resize(target + 1, Vec::new());
            }
            let shift = if index == 0 { column_offset } else { 0 };
            self.lines[target].extend(segments.iter().map(|m| Mapping {
                generated_column: m.generated_column + shift,
                source: remap[m.source as usize],
                ..*m
            }));
        }
    }

    /// Replace all mappings with one per generated line pointing at the start of `source`.
    pub fn attribute_all_to(&mut self, source: u32, generated: &str) {
        let line_count = generated.split('\n').count();
        self.lines = (0..line_count)
            .map(|_| {
                vec![Mapping { generated_column: 0, source, original_line: 0, original_column: 0 }]
            })
            .collect();
    }

    /// Encoded `mappings` field.
    pub fn mappings(&self) -> String {
        let mut out = String::new();
        let mut prev_source = 0i64;
        let mut prev_line = 0i64;
        let mut prev_column = 0i64;

        for (index, segments) in self.lines.iter().enumerate() {
            if index > 0 {
                out.push(';');
            }
            let mut prev_generated = 0i64;
            let mut sorted = segments.clone();
            sorted.sort_by_key(|m| m.generated_column);
            for (i, m) in sorted.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                encode_vlq(&mut out, m.generated_column as i64 - prev_generated);
                encode_vlq(&mut out, m.source as i64 - prev_source);
                encode_vlq(&mut out, m.original_line as i64 - prev_line);
                encode_vlq(&mut out, m.original_column as i64 - prev_column);
                prev_generated = m.generated_column as i64;
                prev_source = m.source as i64;
                prev_line = m.original_line as i64;
                prev_column = m.original_column as i64;
            }
        }
        out
    }

    /// Serialize as a revision 3 JSON document.
    pub fn to_json(&self) -> String {
        let raw = RawSourceMap {
            version: 3,
            file: &self.file,
            sources: &self.sources,
            sources_content: &self.sources_content,
            names: [],
            mappings: self.mappings(),
        };
        serde_json::to_string(&raw).unwrap_or_default()
    }

    /// Inline reference comment carrying the whole map as a base64 data URL.
    pub fn inline_comment(&self, style: CommentStyle) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(self.to_json());
        let url = format!("data:application/json;charset=utf8;base64,{}", encoded);
        match style {
            CommentStyle::Css => format!("\n/*# sourceMappingURL={} */\n", url),
            CommentStyle::Js => format!("\n//# sourceMappingURL={}\n", url),
        }
    }
}

const BASE64_CHARS: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

fn encode_vlq(out: &mut String, value: i64) {
    let mut vlq = if value < 0 { ((-value) << 1) | 1 } else { value << 1 };
    loop {
        let mut digit = (vlq & 0b11111) as usize;
        vlq >>= 5;
        if vlq > 0 {
            digit |= 0b100000;
        }
        out.push(BASE64_CHARS[digit] as char);
        if vlq == 0 {
            break;
        }
    }
}
