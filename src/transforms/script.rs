//! Scripts: library files plus the entry, concatenated into one bundle.
//!
//! Transpilation and minification sit behind [`Transpiler`] and [`Minifier`]
//! so the defaults (an external command and `minify-js`) can be replaced.

use super::common::{Concat, SourceMapInit, SourceMapWrite};
use super::style::read_libs_then_entry;
use super::{AssetTransform, TransformError, TransformOutput};
use crate::build::discovery::SourceGlob;
use crate::build::{write_records, AssetKind, BuildContext, Chain, FileRecord, Stage, StageError};
use crate::sourcemap::CommentStyle;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

/// Rewrites modern syntax for older runtimes.
pub trait Transpiler: Send + Sync {
    fn transpile(&self, source: &str) -> Result<String, String>;
}

/// Shrinks a script.
pub trait Minifier: Send + Sync {
    fn minify(&self, source: &str) -> Result<String, String>;
}

/// Runs an external command with the script on stdin and reads the result from stdout.
#[derive(Debug, Clone)]
pub struct CommandTranspiler {
    command: Vec<String>,
    cwd: PathBuf,
}

impl CommandTranspiler {
    pub fn new(command: Vec<String>, cwd: &Path) -> Self {
        Self { command, cwd: cwd.to_path_buf() }
    }
}

impl Transpiler for CommandTranspiler {
    fn transpile(&self, source: &str) -> Result<String, String> {
        let (program, args) = self.command.split_first().ok_or("no transpiler command configured")?;
        let mut child = Command::new(program)
            .args(args)
            .current_dir(&self.cwd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| format!("failed to start '{}': {}", program, e))?;

        let mut stdin = child.stdin.take().ok_or("transpiler stdin unavailable")?;
        let input = source.to_string();
        let writer = std::thread::spawn(move || stdin.write_all(input.as_bytes()));

        let output = child.wait_with_output().map_err(|e| e.to_string())?;
        match writer.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(format!("failed to write to '{}': {}", program, e)),
            Err(_) => return Err("transpiler input thread panicked".to_string()),
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!("'{}' exited with {}: {}", program, output.status, stderr.trim()));
        }
        String::from_utf8(output.stdout).map_err(|_| "transpiler output is not UTF-8".to_string())
    }
}

/// `minify-js` with global top-level scope.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsMinifier;

impl Minifier for JsMinifier {
    fn minify(&self, source: &str) -> Result<String, String> {
        let session = minify_js::Session::new();
        let mut out = Vec::new();
        minify_js::minify(&session, minify_js::TopLevelMode::Global, source.as_bytes(), &mut out)
            .map_err(|e| format!("{:?}", e))?;
        String::from_utf8(out).map_err(|_| "minifier output is not UTF-8".to_string())
    }
}

pub struct Transpile(Arc<dyn Transpiler>);

impl Stage for Transpile {
    fn name(&self) -> &'static str {
        "transpile"
    }

    fn apply(&self, files: Vec<FileRecord>) -> Result<Vec<FileRecord>, StageError> {
        files
            .into_iter()
            .map(|mut file| {
                let out = self
                    .0
                    .transpile(file.text()?)
                    .map_err(|message| StageError::Tool { stage: "transpile", message })?;
                file.set_text(out);
                Ok(file)
            })
            .collect()
    }
}

pub struct Minify(Arc<dyn Minifier>);

impl Stage for Minify {
    fn name(&self) -> &'static str {
        "minify"
    }

    fn apply(&self, files: Vec<FileRecord>) -> Result<Vec<FileRecord>, StageError> {
        files
            .into_iter()
            .map(|mut file| {
                let out = self
                    .0
                    .minify(file.text()?)
                    .map_err(|message| StageError::Tool { stage: "minify", message })?;
                file.set_text(out);
                Ok(file)
            })
            .collect()
    }
}

/// Builds `script.min.js`.
pub struct ScriptTransform {
    libs: Vec<PathBuf>,
    entry: SourceGlob,
    dest: PathBuf,
    chain: Chain,
}

impl ScriptTransform {
    /// Default tools: the configured transpile command and `minify-js`.
    pub fn new(ctx: &BuildContext) -> Self {
        let command = &ctx.config().script.transpile_command;
        let transpiler: Option<Arc<dyn Transpiler>> = if command.is_empty() {
            None
        } else {
            Some(Arc::new(CommandTranspiler::new(command.clone(), ctx.project_root())))
        };
        Self::with_tools(ctx, transpiler, Arc::new(JsMinifier))
    }

    /// Build with explicit tools. `None` leaves transpilation out.
    pub fn with_tools(
        ctx: &BuildContext,
        transpiler: Option<Arc<dyn Transpiler>>,
        minifier: Arc<dyn Minifier>,
    ) -> Self {
        let script = &ctx.config().script;
        let paths = ctx.paths();
        let production = ctx.env().is_production();
        let development = ctx.env().is_development();

        let mut chain = Chain::new()
            .stage_if(development, SourceMapInit)
            .stage(Concat::new(&script.output, &script.separator));
        if production {
            match transpiler {
                Some(t) => chain = chain.stage(Transpile(t)),
                None => tracing::warn!("no transpile command configured, scripts are not transpiled"),
            }
        }
        let chain = chain
            .stage_if(production, Minify(minifier))
            .stage_if(development, SourceMapWrite::new(CommentStyle::Js));

        Self {
            libs: paths.script_libs.clone(),
            entry: paths.sources.script.clone(),
            dest: paths.dest.script.clone(),
            chain,
        }
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }
}

impl AssetTransform for ScriptTransform {
    fn kind(&self) -> AssetKind {
        AssetKind::Script
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
