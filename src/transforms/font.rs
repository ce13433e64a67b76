//! Fonts are copied verbatim.

use super::{AssetTransform, TransformError, TransformOutput};
use crate::build::discovery::SourceGlob;
use crate::build::{AssetKind, BuildContext, StageError};
use std::path::PathBuf;

pub struct FontTransform {
    glob: SourceGlob,
    dest: PathBuf,
}

impl FontTransform {
    pub fn new(ctx: &BuildContext) -> Self {
        Self { glob: ctx.paths().sources.fonts.clone(), dest: ctx.paths().dest.fonts.clone() }
    }
}

impl AssetTransform for FontTransform {
    fn kind(&self) -> AssetKind {
        AssetKind::Font
    }

    fn run(&self) -> Result<TransformOutput, TransformError> {
        let mut written = Vec::new();
        for source in self.glob.discover() {
            let target = self.dest.join(self.glob.relative(&source));
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(|e| StageError::io(parent, e))?;
            }
            std::fs::copy(&source, &target).map_err(|e| StageError::io(&source, e))?;
            written.push(target);
        }
        Ok(TransformOutput::written(written))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_config;
    use crate::env::Environment;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    #[test]
    fn test_copies_preserving_relative_paths() {
        let temp = TempDir::new().unwrap();
        let fonts = temp.path().join("src/assets/fonts");
        fs::create_dir_all(fonts.join("inter")).unwrap();
        fs::write(fonts.join("inter/inter.woff2"), [0u8, 1, 2, 3]).unwrap();
        fs::write(fonts.join("mono.woff"), [9u8]).unwrap();
        fs::write(fonts.join("source.ttf"), [7u8]).unwrap();

        let ctx = BuildContext::new(default_config(), temp.path(), Environment::Production).unwrap();
        let out = FontTransform::new(&ctx).run().unwrap();

        let dest = temp.path().join("docs/assets/fonts");
        assert_eq!(out.written.len(), 2);
        assert_eq!(fs::read(dest.join("inter/inter.woff2")).unwrap(), vec![0u8, 1, 2, 3]);
        assert_eq!(fs::read(dest.join("mono.woff")).unwrap(), vec![9u8]);
        assert!(!dest.join("source.ttf").exists());
    }

    #[test]
    fn test_no_fonts_is_noop() {
        let temp = TempDir::new().unwrap();
        let ctx =
            BuildContext::new(default_config(), Path::new(temp.path()), Environment::Development)
                .unwrap();
        let out = FontTransform::new(&ctx).run().unwrap();
        assert!(out.written.is_empty());
    }
}
