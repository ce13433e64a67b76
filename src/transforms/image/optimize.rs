//! Per-format image optimization.

use crate::transforms::{TransformError, TransformOutput};
use crate::build::incremental::ChangeTracker;
use crate::build::StageError;
use image::codecs::jpeg::JpegEncoder;
use image::ImageFormat;
use rayon::prelude::*;
use regex::Regex;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static XML_PROLOG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<\?xml[^>]*\?>").expect("Invalid regex"));
static DOCTYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!DOCTYPE[^\[>]*(\[.*?\])?\s*>").expect("Invalid regex"));
static COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("Invalid regex"));
static METADATA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<metadata\b[^>]*/>|<metadata\b.*?</metadata>").expect("Invalid regex")
});
static BETWEEN_TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r">\s+<").expect("Invalid regex"));
static SVG_OPEN_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<svg\b[^>]*>").expect("Invalid regex"));
static VIEW_BOX_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\s+viewBox\s*=\s*["']([^"']*)["']"#).expect("Invalid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimizeSettings {
    pub jpeg_quality: u8,
    pub png_level: u8,
    pub gif_interlaced: bool,
    pub svg_remove_viewbox: bool,
}

impl Default for OptimizeSettings {
    fn default() -> Self {
        Self { jpeg_quality: 75, png_level: 5, gif_interlaced: true, svg_remove_viewbox: true }
    }
}

fn extension(path: &Path) -> String {
    path.extension().map(|e| e.to_string_lossy().to_ascii_lowercase()).unwrap_or_default()
}

/// Optimize one image by its extension. Unknown formats pass through.
///
/// Never returns more bytes than it was given.
pub fn optimize(path: &Path, data: &[u8], settings: &OptimizeSettings) -> Result<Vec<u8>, String> {
    let optimized = match extension(path).as_str() {
        "gif" => reencode_gif(data, settings.gif_interlaced)?,
        "jpg" | "jpeg" => reencode_jpeg(data, settings.jpeg_quality)?,
        "png" => oxipng::optimize_from_memory(data, &oxipng::Options::from_preset(settings.png_level))
            .map_err(|e| e.to_string())?,
        "svg" => {
            let text = std::str::from_utf8(data).map_err(|_| "SVG is not UTF-8".to_string())?;
            minify_svg(text, settings.svg_remove_viewbox).into_bytes()
        }
        _ => return Ok(data.to_vec()),
    };
    if optimized.len() > data.len() {
        Ok(data.to_vec())
    } else {
        Ok(optimized)
    }
}

fn reencode_jpeg(data: &[u8], quality: u8) -> Result<Vec<u8>, String> {
    let image = image::load_from_memory_with_format(data, ImageFormat::Jpeg)
        .map_err(|e| e.to_string())?
        .to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100))
        .encode_image(&image)
        .map_err(|e| e.to_string())?;
    Ok(out)
}

/// Row order of an interlaced GIF frame: every 8th row from 0, every 8th
/// from 4, every 4th from 2, then every odd row.
fn interlace_rows(height: usize) -> Vec<usize> {
    [(0, 8), (4, 8), (2, 4), (1, 2)]
        .iter()
        .flat_map(|&(start, step)| (start..height).step_by(step))
        .collect()
}

fn interlace(buffer: &[u8], width: usize, height: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(buffer.len());
    for row in interlace_rows(height) {
        out.extend_from_slice(&buffer[row * width..(row + 1) * width]);
    }
    out
}

fn reencode_gif(data: &[u8], interlaced: bool) -> Result<Vec<u8>, String> {
    let mut options = gif::DecodeOptions::new();
    options.set_color_output(gif::ColorOutput::Indexed);
    let mut decoder = options.read_info(data).map_err(|e| e.to_string())?;
    let palette = decoder.global_palette().map(<[u8]>::to_vec).unwrap_or_default();

    let mut frames = Vec::new();
    while let Some(frame) = decoder.read_next_frame().map_err(|e| e.to_string())? {
        frames.push(frame.clone());
    }

    let mut out = Vec::new();
    {
        let mut encoder = gif::Encoder::new(&mut out, decoder.width(), decoder.height(), &palette)
            .map_err(|e| e.to_string())?;
        if frames.len() > 1 {
            encoder.set_repeat(gif::Repeat::Infinite).map_err(|e| e.to_string())?;
        }
        for mut frame in frames {
            // Decoded buffers are always in display row order.
            let (width, height) = (usize::from(frame.width), usize::from(frame.height));
            if interlaced && frame.buffer.len() == width * height {
                frame.buffer = Cow::Owned(interlace(&frame.buffer, width, height));
                frame.interlaced = true;
            } else {
                frame.interlaced = false;
            }
            encoder.write_frame(&frame).map_err(|e| e.to_string())?;
        }
    }
    Ok(out)
}

fn parse_length(value: &str) -> Option<f64> {
    value.trim().trim_end_matches("px").parse().ok()
}

fn attribute<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    let re = Regex::new(&format!(r#"\s{}\s*=\s*["']([^"']*)["']"#, regex::escape(name))).ok()?;
    re.captures(tag).and_then(|c| c.get(1)).map(|m| m.as_str())
}

/// Drop `viewBox` from the root tag when it is exactly `0 0 width height`.
fn remove_redundant_view_box(svg: &str) -> String {
    let Some(tag) = SVG_OPEN_TAG.find(svg) else {
        return svg.to_string();
    };
    let open = tag.as_str();
    let (Some(width), Some(height), Some(view_box)) = (
        attribute(open, "width").and_then(parse_length),
        attribute(open, "height").and_then(parse_length),
        VIEW_BOX_ATTR.captures(open).and_then(|c| c.get(1)),
    ) else {
        return svg.to_string();
    };

    let numbers: Vec<f64> = view_box
        .as_str()
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect();
    if numbers != [0.0, 0.0, width, height] {
        return svg.to_string();
    }

    let stripped = VIEW_BOX_ATTR.replace(open, "");
    format!("{}{}{}", &svg[..tag.start()], stripped, &svg[tag.end()..])
}

/// Strip the prolog, doctype, comments, metadata and whitespace between tags.
pub fn minify_svg(svg: &str, remove_view_box: bool) -> String {
    let text = XML_PROLOG.replace_all(svg, "");
    let text = DOCTYPE.replace_all(&text, "");
    let text = COMMENT.replace_all(&text, "");
    let text = METADATA.replace_all(&text, "");
    let text = BETWEEN_TAGS.replace_all(&text, "><");
    let text = text.trim();
    if remove_view_box {
        remove_redundant_view_box(text)
    } else {
        text.to_string()
    }
}

/// Optimizes general images into the images destination.
#[derive(Debug, Clone)]
pub struct ImageOptimizer {
    tracker: ChangeTracker,
    settings: OptimizeSettings,
}

enum FileOutcome {
    Written(PathBuf),
    Skipped(String),
}

impl ImageOptimizer {
    pub fn new(base: &Path, dest: &Path, settings: OptimizeSettings) -> Self {
        Self { tracker: ChangeTracker::new(base, dest), settings }
    }

    fn optimize_file(&self, source: &Path) -> Result<FileOutcome, StageError> {
        let dest = self.tracker.dest_for(source);
        let data = std::fs::read(source).map_err(|e| StageError::io(source, e))?;
        let bytes = match optimize(source, &data, &self.settings) {
            Ok(bytes) => bytes,
            Err(e) => {
                let msg = format!("{}: {}", source.display(), e);
                tracing::warn!("skipping image {}", msg);
                return Ok(FileOutcome::Skipped(msg));
            }
        };
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StageError::io(parent, e))?;
        }
        std::fs::write(&dest, &bytes).map_err(|e| StageError::io(&dest, e))?;
        tracing::debug!("{} -> {} ({} -> {} bytes)", source.display(), dest.display(), data.len(), bytes.len());
        Ok(FileOutcome::Written(dest))
    }

    /// Optimize the stale sources in parallel. Fresh ones are not touched.
    pub fn run(&self, sources: Vec<PathBuf>) -> Result<TransformOutput, TransformError> {
        let changes = self.tracker.split(sources);
        let outcomes = changes
            .stale
            .par_iter()
            .map(|source| self.optimize_file(source))
            .collect::<Result<Vec<_>, _>>()?;

        let mut output = TransformOutput { unchanged: changes.fresh, ..TransformOutput::default() };
        for outcome in outcomes {
            match outcome {
                FileOutcome::Written(path) => output.written.push(path),
                FileOutcome::Skipped(warning) => output.warnings.push(warning),
            }
        }
        Ok(output)
    }
}
