//! Production CSS post-processing: vendor prefixes for the configured
//! browserslist targets, then minification.

use super::CssError;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};

#[derive(Debug, Clone)]
pub struct PostProcessor {
    targets: Targets,
}

impl PostProcessor {
    /// Resolve `browsers` (browserslist queries) into prefixing targets.
    pub fn new(browsers: &[String]) -> Result<Self, CssError> {
        let browsers = Browsers::from_browserslist(browsers.iter().map(String::as_str))
            .map_err(|e| CssError::Browsers(e.to_string()))?;
        Ok(Self { targets: Targets { browsers, ..Targets::default() } })
    }

    /// Prefix and minify. Comments are dropped; z-index values are kept as written.
    pub fn process(&self, css: &str) -> Result<String, CssError> {
        let mut sheet = StyleSheet::parse(css, ParserOptions::default())
            .map_err(|e| CssError::Parse(e.to_string()))?;
        sheet
            .minify(MinifyOptions { targets: self.targets, ..MinifyOptions::default() })
            .map_err(|e| CssError::Minify(e.to_string()))?;
        let printed = sheet
            .to_css(PrinterOptions { minify: true, targets: self.targets, ..PrinterOptions::default() })
            .map_err(|e| CssError::Print(e.to_string()))?;
        Ok(printed.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processor(query: &str) -> PostProcessor {
        PostProcessor::new(&[query.to_string()]).unwrap()
    }

    #[test]
    fn test_minifies_and_drops_comments() {
        let out = processor("defaults").process("/* note */\n.a {\n  margin: 0 0 0 0;\n}\n").unwrap();
        assert!(!out.contains("note"));
        assert!(!out.contains('\n'));
        assert!(out.starts_with(".a{"));
    }

    #[test]
    fn test_adds_vendor_prefixes_for_old_targets() {
        let out = processor("safari 8").process(".a { user-select: none; }").unwrap();
        assert!(out.contains("-webkit-user-select:none"));
    }

    #[test]
    fn test_z_index_untouched() {
        let out = processor("defaults").process(".a{z-index:100}.b{z-index:9999}").unwrap();
        assert!(out.contains("z-index:100"));
        assert!(out.contains("z-index:9999"));
    }

    #[test]
    fn test_invalid_query() {
        let result = PostProcessor::new(&["not a real browser 99".to_string()]);
        assert!(matches!(result, Err(CssError::Browsers(_))));
    }
}
