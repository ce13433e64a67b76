//! Favicon and Apple touch icon generation from one raster source.

use crate::transforms::{TransformError, TransformOutput};
use crate::build::discovery::SourceGlob;
use crate::build::StageError;
use image::codecs::ico::{IcoEncoder, IcoFrame};
use image::imageops::{self, FilterType};
use image::{ColorType, DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

pub const FAVICON_SIZES: [u32; 3] = [16, 32, 48];
pub const ICO_SIZES: [u32; 5] = [16, 24, 32, 48, 64];
pub const APPLE_TOUCH_SIZES: [u32; 11] = [57, 60, 72, 76, 114, 120, 144, 152, 167, 180, 1024];
const APPLE_DEFAULT_SIZE: u32 = 180;

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Every file name one source expands into.
pub fn variant_names() -> Vec<String> {
    let mut names: Vec<String> =
        FAVICON_SIZES.iter().map(|s| format!("favicon-{s}x{s}.png")).collect();
    names.push("favicon.ico".to_string());
    names.extend(APPLE_TOUCH_SIZES.iter().map(|s| format!("apple-touch-icon-{s}x{s}.png")));
    names.push("apple-touch-icon.png".to_string());
    names.push("apple-touch-icon-precomposed.png".to_string());
    names
}

/// Fit `source` into a `size`-pixel square, centred on `background`.
pub fn render(source: &DynamicImage, size: u32, background: Rgba<u8>) -> RgbaImage {
    let resized = source.resize(size, size, FilterType::Lanczos3).to_rgba8();
    let mut canvas = RgbaImage::from_pixel(size, size, background);
    let x = (size - resized.width().min(size)) / 2;
    let y = (size - resized.height().min(size)) / 2;
    imageops::overlay(&mut canvas, &resized, i64::from(x), i64::from(y));
    canvas
}

fn is_vector(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("svg"))
}

#[derive(Debug, Clone)]
pub struct FaviconGenerator {
    glob: SourceGlob,
    dest: PathBuf,
    background: Rgba<u8>,
}

impl FaviconGenerator {
    pub fn new(glob: SourceGlob, dest: PathBuf, background: Rgba<u8>) -> Self {
        Self { glob, dest, background }
    }

    /// Expand the first raster source into the variant set.
    ///
    /// Every variant has a fixed name, so further raster sources would
    /// overwrite it; they are skipped with a warning.
    pub fn run(&self) -> Result<TransformOutput, TransformError> {
        let mut warnings = Vec::new();
        let mut chosen = None;

        for source in self.glob.discover() {
            if is_vector(&source) {
                let msg = format!("{}: vector favicons cannot be rasterized, skipped", source.display());
                tracing::warn!("{}", msg);
                warnings.push(msg);
            } else if chosen.is_none() {
                chosen = Some(source);
            } else {
                let msg = format!("{}: only one favicon source is used, skipped", source.display());
                tracing::warn!("{}", msg);
                warnings.push(msg);
            }
        }

        let Some(source) = chosen else {
            return Ok(TransformOutput { warnings, ..TransformOutput::default() });
        };

        let image = match image::open(&source) {
            Ok(image) => image,
            Err(e) => {
                let msg = format!("{}: {}", source.display(), e);
                tracing::warn!("skipping favicon source {}", msg);
                warnings.push(msg);
                return Ok(TransformOutput { warnings, ..TransformOutput::default() });
            }
        };

        std::fs::create_dir_all(&self.dest).map_err(|e| StageError::io(&self.dest, e))?;
        let mut written = Vec::new();

        for size in FAVICON_SIZES {
            let name = format!("favicon-{size}x{size}.png");
            written.push(self.save_png(&render(&image, size, TRANSPARENT), &name)?);
        }
        written.push(self.save_ico(&image)?);

        for size in APPLE_TOUCH_SIZES {
            let name = format!("apple-touch-icon-{size}x{size}.png");
            written.push(self.save_png(&render(&image, size, self.background), &name)?);
        }
        let apple = render(&image, APPLE_DEFAULT_SIZE, self.background);
        written.push(self.save_png(&apple, "apple-touch-icon.png")?);
        written.push(self.save_png(&apple, "apple-touch-icon-precomposed.png")?);

        tracing::debug!("generated {} favicons from {}", written.len(), source.display());
        Ok(TransformOutput { written, unchanged: 0, warnings })
    }

    fn save_png(&self, icon: &RgbaImage, name: &str) -> Result<PathBuf, StageError> {
        let path = self.dest.join(name);
        icon.save_with_format(&path, ImageFormat::Png)
            .map_err(|e| StageError::Tool { stage: "favicons", message: format!("{}: {}", name, e) })?;
        Ok(path)
    }

    fn save_ico(&self, image: &DynamicImage) -> Result<PathBuf, StageError> {
        let path = self.dest.join("favicon.ico");
        let tool_error = |e: image::ImageError| StageError::Tool {
            stage: "favicons",
            message: format!("favicon.ico: {}", e),
        };

        let frames = ICO_SIZES
            .iter()
            .map(|&size| {
                let icon = render(image, size, TRANSPARENT);
                IcoFrame::as_png(icon.as_raw(), size, size, ColorType::Rgba8)
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(tool_error)?;

        let file = File::create(&path).map_err(|e| StageError::io(&path, e))?;
        IcoEncoder::new(BufWriter::new(file)).encode_images(&frames).map_err(tool_error)?;
        Ok(path)
    }
}
