//! HTML pages: template inclusion, optional minification and asset path rewriting.

use super::{AssetTransform, TransformError, TransformOutput};
use crate::build::discovery::{read_records, SourceGlob};
use crate::build::{write_records, AssetKind, BuildContext, Chain, FileRecord, Stage, StageError};
use crate::include::Includer;
use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;

/// Expand include directives in every page.
pub struct IncludeStage {
    includer: Includer,
}

impl IncludeStage {
    pub fn new(prefix: &str) -> Self {
        Self { includer: Includer::new(prefix) }
    }
}

impl Stage for IncludeStage {
    fn name(&self) -> &'static str {
        "include"
    }

    fn apply(&self, files: Vec<FileRecord>) -> Result<Vec<FileRecord>, StageError> {
        files
            .into_iter()
            .map(|mut file| {
                let expanded = self.includer.expand(file.text()?, &file.source_path())?;
                file.set_text(expanded);
                Ok(file)
            })
            .collect()
    }
}

/// Remove comments and collapse whitespace.
pub struct MinifyHtml;

impl Stage for MinifyHtml {
    fn name(&self) -> &'static str {
        "minify-html"
    }

    fn apply(&self, files: Vec<FileRecord>) -> Result<Vec<FileRecord>, StageError> {
        files
            .into_iter()
            .map(|mut file| {
                let minified = minify_html(file.text()?);
                file.set_text(minified);
                Ok(file)
            })
            .collect()
    }
}

/// Literal substitution of the authoring-time asset prefix.
pub struct RewriteAssetPrefix {
    from: String,
    to: String,
}

impl RewriteAssetPrefix {
    pub fn new(from: &str, to: &str) -> Self {
        Self { from: from.to_string(), to: to.to_string() }
    }
}

impl Stage for RewriteAssetPrefix {
    fn name(&self) -> &'static str {
        "rewrite-asset-prefix"
    }

    fn apply(&self, files: Vec<FileRecord>) -> Result<Vec<FileRecord>, StageError> {
        if self.from.is_empty() {
            return Ok(files);
        }
        files
            .into_iter()
            .map(|mut file| {
                let rewritten = file.text()?.replace(&self.from, &self.to);
                file.set_text(rewritten);
                Ok(file)
            })
            .collect()
    }
}

/// Elements whose surrounding whitespace is significant.
const INLINE_ELEMENTS: &[&str] = &[
    "a", "abbr", "acronym", "b", "bdi", "bdo", "big", "button", "cite", "code", "del", "dfn", "em",
    "font", "i", "img", "input", "ins", "kbd", "label", "mark", "math", "nobr", "object", "q",
    "rp", "rt", "rtc", "ruby", "s", "samp", "select", "small", "span", "strike", "strong", "sub",
    "sup", "svg", "textarea", "time", "tt", "u", "var",
];

/// Comments, whitespace-sensitive elements (kept whole) and tags.
static MARKUP_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)<!--.*?-->|<pre\b[^>]*>.*?</pre\s*>|<textarea\b[^>]*>.*?</textarea\s*>|<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>|<[^>]+>",
    )
    .expect("Invalid regex")
});

static TAG_NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^</?([!A-Za-z][A-Za-z0-9:-]*)").expect("Invalid regex"));

static WHITESPACE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid regex"));

enum Token<'a> {
    Text(String),
    Markup { text: &'a str, inline: bool },
}

fn is_inline(markup: &str) -> bool {
    TAG_NAME_REGEX
        .captures(markup)
        .map(|c| INLINE_ELEMENTS.contains(&c[1].to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn push_text<'a>(tokens: &mut Vec<Token<'a>>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Token::Text(prev)) = tokens.last_mut() {
        prev.push_str(text);
    } else {
        tokens.push(Token::Text(text.to_string()));
    }
}

/// Minify an HTML document.
///
/// Comments are removed except conditional comments (`<!--[if ...`).
/// Whitespace runs collapse to one space; whitespace touching a block-level
/// tag is removed. `pre`, `textarea`, `script` and `style` contents are
/// left alone.
pub fn minify_html(html: &str) -> String {
    let mut tokens = Vec::new();
    let mut cursor = 0;
    for found in MARKUP_REGEX.find_iter(html) {
        push_text(&mut tokens, &html[cursor..found.start()]);
        cursor = found.end();

        let text = found.as_str();
        if text.starts_with("<!--") {
            if text.starts_with("<!--[if") {
                tokens.push(Token::Markup { text, inline: false });
            }
            continue;
        }
        tokens.push(Token::Markup { text, inline: is_inline(text) });
    }
    push_text(&mut tokens, &html[cursor..]);

    let block_at = |token: Option<&Token>| match token {
        None => true,
        Some(Token::Markup { inline, .. }) => !inline,
        Some(Token::Text(_)) => false,
    };

    let mut out = String::with_capacity(html.len());
    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::Markup { text, .. } => out.push_str(text),
            Token::Text(text) => {
                let collapsed = WHITESPACE_REGEX.replace_all(text, " ");
                let mut slice: &str = &collapsed;
                if block_at(i.checked_sub(1).and_then(|p| tokens.get(p))) {
                    slice = slice.trim_start();
                }
                if block_at(tokens.get(i + 1)) {
                    slice = slice.trim_end();
                }
                out.push_str(slice);
            }
        }
    }
    out
}

/// Builds every page under the html source glob.
pub struct HtmlTransform {
    glob: SourceGlob,
    dest: PathBuf,
    chain: Chain,
}

impl HtmlTransform {
    pub fn new(ctx: &BuildContext) -> Self {
        let html = &ctx.config().html;
        let chain = Chain::new()
            .stage(IncludeStage::new(&html.include_prefix))
            .stage_if(ctx.env().is_production(), MinifyHtml)
            .stage(RewriteAssetPrefix::new(&html.asset_prefix, &html.asset_replacement));
        Self {
            glob: ctx.paths().sources.html.clone(),
            dest: ctx.paths().dest.html.clone(),
            chain,
        }
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }
}

impl AssetTransform for HtmlTransform {
    fn kind(&self) -> AssetKind {
        AssetKind::Html
    }

    fn run(&self) -> Result<TransformOutput, TransformError> {
        let pages = read_records(&self.glob)?;
        if pages.is_empty() {
            return Ok(TransformOutput::default());
        }
        let built = self.chain.run(pages)?;
        Ok(TransformOutput::written(write_records(&self.dest, &built)?))
    }
}
