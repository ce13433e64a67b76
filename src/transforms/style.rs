//! Stylesheets: library CSS plus the Sass entry, compiled into one file.

use super::common::{Concat, SourceMapInit, SourceMapWrite};
use super::{AssetTransform, TransformError, TransformOutput};
use crate::build::discovery::{read_record, read_records, SourceGlob};
use crate::build::{write_records, AssetKind, BuildContext, Chain, FileRecord, Stage, StageError};
use crate::css::{expand_glob_imports, group_media, PostProcessor, PxToRem};
use crate::sourcemap::CommentStyle;
use std::path::{Path, PathBuf};

/// Expand glob `@import`s relative to the entry directory.
pub struct GlobImport {
    dir: PathBuf,
}

impl Stage for GlobImport {
    fn name(&self) -> &'static str {
        "glob-import"
    }

    fn apply(&self, files: Vec<FileRecord>) -> Result<Vec<FileRecord>, StageError> {
        files
            .into_iter()
            .map(|mut file| {
                let expanded = expand_glob_imports(file.text()?, &self.dir).map_err(|e| {
                    StageError::Compile { file: file.source_path(), message: e.to_string() }
                })?;
                if let Some(map) = file.source_map.as_mut() {
                    for partial in &expanded.files {
                        let content = std::fs::read_to_string(partial).ok();
                        let name = partial.strip_prefix(&self.dir).unwrap_or(partial);
                        map.add_source(&name.to_string_lossy().replace('\\', "/"), content.as_deref());
                    }
                }
                file.set_text(expanded.source);
                Ok(file)
            })
            .collect()
    }
}

/// Compile Sass to CSS.
pub struct CompileSass {
    /// Source name the compiled output is attributed to in the map
    entry_name: String,
    load_paths: Vec<PathBuf>,
}

impl Stage for CompileSass {
    fn name(&self) -> &'static str {
        "compile"
    }

    fn apply(&self, files: Vec<FileRecord>) -> Result<Vec<FileRecord>, StageError> {
        files
            .into_iter()
            .map(|mut file| {
                let options = self
                    .load_paths
                    .iter()
                    .fold(grass::Options::default(), |opts, path| opts.load_path(path))
                    .style(grass::OutputStyle::Expanded);
                let css = grass::from_string(file.text()?.to_string(), &options).map_err(|e| {
                    StageError::Compile { file: file.source_path(), message: e.to_string() }
                })?;
                if let Some(map) = file.source_map.as_mut() {
                    let entry = map.add_source(&self.entry_name, None);
                    map.attribute_all_to(entry, &css);
                }
                file.set_text(css);
                Ok(file)
            })
            .collect()
    }
}

/// Merge duplicate top-level media queries.
pub struct GroupMedia;

impl Stage for GroupMedia {
    fn name(&self) -> &'static str {
        "group-media"
    }

    fn apply(&self, files: Vec<FileRecord>) -> Result<Vec<FileRecord>, StageError> {
        files
            .into_iter()
            .map(|mut file| {
                let grouped = group_media(file.text()?)
                    .map_err(|e| StageError::Tool { stage: "group-media", message: e.to_string() })?;
                file.set_text(grouped);
                Ok(file)
            })
            .collect()
    }
}

/// Convert px lengths to rem.
pub struct PxToRemStage(pub PxToRem);

impl Stage for PxToRemStage {
    fn name(&self) -> &'static str {
        "px-to-rem"
    }

    fn apply(&self, files: Vec<FileRecord>) -> Result<Vec<FileRecord>, StageError> {
        files
            .into_iter()
            .map(|mut file| {
                let converted = self.0.convert(file.text()?);
                file.set_text(converted);
                Ok(file)
            })
            .collect()
    }
}

/// Vendor prefixing and minification.
pub struct PostProcess(pub PostProcessor);

impl Stage for PostProcess {
    fn name(&self) -> &'static str {
        "postprocess"
    }

    fn apply(&self, files: Vec<FileRecord>) -> Result<Vec<FileRecord>, StageError> {
        files
            .into_iter()
            .map(|mut file| {
                let processed = self
                    .0
                    .process(file.text()?)
                    .map_err(|e| StageError::Tool { stage: "postprocess", message: e.to_string() })?;
                file.set_text(processed);
                Ok(file)
            })
            .collect()
    }
}

/// Builds `style.min.css`.
pub struct StyleTransform {
    libs: Vec<PathBuf>,
    entry: SourceGlob,
    dest: PathBuf,
    chain: Chain,
}

impl StyleTransform {
    pub fn new(ctx: &BuildContext) -> Result<Self, TransformError> {
        let style = &ctx.config().style;
        let paths = ctx.paths();
        let entry = paths.sources.style.clone();
        let entry_dir = entry.base().to_path_buf();
        let production = ctx.env().is_production();
        let development = ctx.env().is_development();

        let mut load_paths = vec![entry_dir.clone()];
        load_paths.extend(ctx.style_load_paths());

        let entry_name = Path::new(entry.pattern())
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut chain = Chain::new()
            .stage_if(development, SourceMapInit)
            .stage(Concat::new(&style.output, "\n"))
            .stage(GlobImport { dir: entry_dir })
            .stage(CompileSass { entry_name, load_paths })
            .stage_if(production, GroupMedia)
            .stage(PxToRemStage(PxToRem {
                root_value: style.root_value,
                unit_precision: style.unit_precision,
                min_pixel_value: style.min_pixel_value,
            }));
        if production {
            chain = chain.stage(PostProcess(PostProcessor::new(&style.browsers)?));
        }
        let chain = chain.stage_if(development, SourceMapWrite::new(CommentStyle::Css));

        Ok(Self { libs: paths.style_libs.clone(), entry, dest: paths.dest.style.clone(), chain })
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }
}

/// Library files first (each relative to its own directory), then the entry matches.
pub(crate) fn read_libs_then_entry(
    libs: &[PathBuf],
    entry: &SourceGlob,
) -> Result<Vec<FileRecord>, TransformError> {
    let mut records = Vec::new();
    for lib in libs {
        let base = lib.parent().unwrap_or(Path::new(""));
        records.push(read_record(base, lib)?);
    }
    records.extend(read_records(entry)?);
    Ok(records)
}

impl AssetTransform for StyleTransform {
    fn kind(&self) -> AssetKind {
        AssetKind::Style
    }

    fn run(&self) -> Result<TransformOutput, TransformError> {
        let sources = read_libs_then_entry(&self.libs, &self.entry)?;
        if sources.is_empty() {
            return Ok(TransformOutput::default());
        }
        let built = self.chain.run(sources)?;
        Ok(TransformOutput::written(write_records(&self.dest, &built)?))
    }
}
