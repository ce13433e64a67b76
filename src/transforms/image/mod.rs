//! Images: the SVG sprite, favicons and general optimization.
//!
//! The three parts read disjoint sources and write disjoint outputs, so one
//! run executes them side by side on the rayon pool.

pub mod favicon;
pub mod optimize;
pub mod sprite;

pub use favicon::FaviconGenerator;
pub use optimize::{ImageOptimizer, OptimizeSettings};
pub use sprite::SpriteBuilder;

use super::{AssetTransform, TransformError, TransformOutput};
use crate::build::discovery::{discover_excluding, SourceGlob};
use crate::build::{AssetKind, BuildContext};
use crate::css::color::parse_color;

pub struct ImageTransform {
    sprite: SpriteBuilder,
    favicons: FaviconGenerator,
    images: SourceGlob,
    excluded: [SourceGlob; 2],
    optimizer: ImageOptimizer,
}

impl ImageTransform {
    pub fn new(ctx: &BuildContext) -> Result<Self, TransformError> {
        let settings = &ctx.config().images;
        let paths = ctx.paths();
        let sources = &paths.sources;

        let optimize = OptimizeSettings {
            jpeg_quality: settings.jpeg_quality,
            png_level: settings.png_level,
            gif_interlaced: settings.gif_interlaced,
            svg_remove_viewbox: settings.svg_remove_viewbox,
        };

        Ok(Self {
            sprite: SpriteBuilder::new(
                sources.sprite.clone(),
                paths.dest.images.join(&settings.sprite_file),
            ),
            favicons: FaviconGenerator::new(
                sources.favicons.clone(),
                paths.dest.favicons.clone(),
                parse_color(&settings.favicon_background)?,
            ),
            images: sources.images.clone(),
            excluded: [sources.sprite.clone(), sources.favicons.clone()],
            optimizer: ImageOptimizer::new(sources.images.base(), &paths.dest.images, optimize),
        })
    }
}

impl AssetTransform for ImageTransform {
    fn kind(&self) -> AssetKind {
        AssetKind::Image
    }

    fn run(&self) -> Result<TransformOutput, TransformError> {
        let (sprite, (favicons, images)) = rayon::join(
            || self.sprite.run(),
            || {
                rayon::join(
                    || self.favicons.run(),
                    || {
                        let [sprite, favicons] = &self.excluded;
                        self.optimizer.run(discover_excluding(&self.images, &[sprite, favicons]))
                    },
                )
            },
        );

        let mut output = sprite?;
        output.merge(favicons?);
        output.merge(images?);
        Ok(output)
    }
}
