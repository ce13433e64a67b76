//! SVG symbol sprite.
//!
//! Every source SVG becomes a `<symbol>` whose id is its path relative to
//! the sprite directory, without extension, with `/` replaced by `--`.

use crate::transforms::{TransformError, TransformOutput};
use crate::build::discovery::SourceGlob;
use crate::build::StageError;
use roxmltree::{Document, ParsingOptions};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

const SPRITE_HEADER: &str = r#"<?xml version="1.0" encoding="utf-8"?><svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink">"#;

/// Symbol id for a sprite source path relative to the sprite base.
pub fn symbol_id(relative: &Path) -> String {
    relative
        .with_extension("")
        .to_string_lossy()
        .replace('\\', "/")
        .replace('/', "--")
        .replace(' ', "_")
}

/// Wrap one SVG document in a `<symbol>`.
///
/// The viewBox is taken from the source, or derived from its width and
/// height when missing.
pub fn to_symbol(id: &str, svg: &str) -> Result<String, String> {
    let options = ParsingOptions { allow_dtd: true, ..ParsingOptions::default() };
    let doc = Document::parse_with_options(svg, options).map_err(|e| e.to_string())?;
    let root = doc.root_element();
    if root.tag_name().name() != "svg" {
        return Err(format!("root element is <{}>, not <svg>", root.tag_name().name()));
    }

    let view_box = root.attribute("viewBox").map(str::to_string).or_else(|| {
        let width = root.attribute("width")?.trim_end_matches("px");
        let height = root.attribute("height")?.trim_end_matches("px");
        Some(format!("0 0 {} {}", width, height))
    });

    let inner = match (root.first_child(), root.last_child()) {
        (Some(first), Some(last)) => &svg[first.range().start..last.range().end],
        _ => "",
    };

    let mut symbol = format!("<symbol id=\"{}\"", id);
    if let Some(view_box) = view_box {
        symbol.push_str(&format!(" viewBox=\"{}\"", view_box));
    }
    symbol.push('>');
    symbol.push_str(inner.trim());
    symbol.push_str("</symbol>");
    Ok(symbol)
}

/// Builds the sprite file from the sprite glob.
#[derive(Debug, Clone)]
pub struct SpriteBuilder {
    glob: SourceGlob,
    output: PathBuf,
}

impl SpriteBuilder {
    pub fn new(glob: SourceGlob, output: PathBuf) -> Self {
        Self { glob, output }
    }

    pub fn run(&self) -> Result<TransformOutput, TransformError> {
        let sources = self.glob.discover();
        if sources.is_empty() {
            return Ok(TransformOutput::default());
        }

        let mut warnings = Vec::new();
        let mut seen = HashSet::new();
        let mut sprite = String::from(SPRITE_HEADER);

        for source in &sources {
            let id = symbol_id(self.glob.relative(source));
            if !seen.insert(id.clone()) {
                let msg = format!("{}: duplicate sprite id '{}', skipped", source.display(), id);
                tracing::warn!("{}", msg);
                warnings.push(msg);
                continue;
            }
            let symbol = std::fs::read_to_string(source)
                .map_err(|e| e.to_string())
                .and_then(|svg| to_symbol(&id, &svg));
            match symbol {
                Ok(symbol) => sprite.push_str(&symbol),
                Err(e) => {
                    let msg = format!("{}: {}", source.display(), e);
                    tracing::warn!("skipping sprite source {}", msg);
                    warnings.push(msg);
                }
            }
        }
        sprite.push_str("</svg>");

        if let Some(parent) = self.output.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StageError::io(parent, e))?;
        }
        std::fs::write(&self.output, sprite).map_err(|e| StageError::io(&self.output, e))?;

        Ok(TransformOutput { written: vec![self.output.clone()], unchanged: 0, warnings })
    }
}
