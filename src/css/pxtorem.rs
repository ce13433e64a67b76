//! Pixel to rem conversion.
//!
//! Rewrites `<n>px` inside declaration values. Selectors, at-rule preludes
//! (media queries included), comments, strings and `url()` arguments are
//! copied through unchanged.

use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Quoted strings and `url()` are matched first so the alternation skips them.
static PX_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""[^"]*"|'[^']*'|url\([^)]*\)|(\d*\.?\d+)px"#).expect("Invalid regex")
});

/// Conversion settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PxToRem {
    pub root_value: f64,
    pub unit_precision: usize,
    pub min_pixel_value: f64,
}

impl Default for PxToRem {
    fn default() -> Self {
        Self { root_value: 16.0, unit_precision: 5, min_pixel_value: 2.0 }
    }
}

impl PxToRem {
    /// Convert every eligible px value in a stylesheet.
    pub fn convert(&self, css: &str) -> String {
        let bytes = css.as_bytes();
        let mut out = String::with_capacity(css.len());
        let mut segment_start = 0;
        let mut paren_depth = 0usize;
        // set when a comment split a declaration after its colon
        let mut in_value = false;
        let mut i = 0;

        while i < bytes.len() {
            match bytes[i] {
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    let pending = &css[segment_start..i];
                    if !pending.trim().is_empty() {
                        out.push_str(&self.convert_segment(pending, in_value));
                        in_value = in_value || is_declaration(pending);
                    } else {
                        out.push_str(pending);
                    }
                    let end = css[i + 2..].find("*/").map_or(css.len(), |p| i + 2 + p + 2);
                    out.push_str(&css[i..end]);
                    segment_start = end;
                    i = end;
                    continue;
                }
                quote @ (b'"' | b'\'') => {
                    i = skip_string(bytes, i, quote);
                    continue;
                }
                b'(' => paren_depth += 1,
                b')' => paren_depth = paren_depth.saturating_sub(1),
                b'{' if paren_depth == 0 => {
                    out.push_str(&css[segment_start..=i]);
                    segment_start = i + 1;
                    in_value = false;
                }
                b';' | b'}' if paren_depth == 0 => {
                    out.push_str(&self.convert_segment(&css[segment_start..i], in_value));
                    out.push(bytes[i] as char);
                    segment_start = i + 1;
                    in_value = false;
                }
                _ => {}
            }
            i += 1;
        }

        out.push_str(&self.convert_segment(&css[segment_start..], in_value));
        out
    }

    fn convert_segment(&self, segment: &str, in_value: bool) -> String {
        if in_value {
            return self.convert_value(segment);
        }
        if !is_declaration(segment) {
            return segment.to_string();
        }
        match segment.find(':') {
            Some(colon) => {
                let (property, value) = segment.split_at(colon);
                format!("{}{}", property, self.convert_value(value))
            }
            None => segment.to_string(),
        }
    }

    /// Convert px values in a single declaration value.
    pub fn convert_value(&self, value: &str) -> String {
        PX_REGEX
            .replace_all(value, |caps: &Captures| {
                let whole = caps[0].to_string();
                let Some(number) = caps.get(1) else {
                    return whole;
                };
                match number.as_str().parse::<f64>() {
                    Ok(px) if px >= self.min_pixel_value => self.format_rem(px),
                    _ => whole,
                }
            })
            .into_owned()
    }

    fn format_rem(&self, px: f64) -> String {
        let fixed = format!("{:.*}", self.unit_precision, px / self.root_value);
        let trimmed = if fixed.contains('.') {
            fixed.trim_end_matches('0').trim_end_matches('.')
        } else {
            fixed.as_str()
        };
        if trimmed == "0" {
            "0".to_string()
        } else {
            format!("{}rem", trimmed)
        }
    }
}

fn is_declaration(segment: &str) -> bool {
    segment.contains(':') && !segment.trim_start().starts_with('@')
}

fn skip_string(bytes: &[u8], start: usize, quote: u8) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert(css: &str) -> String {
        PxToRem::default().convert(css)
    }

    #[test]
    fn test_basic_conversion() {
        assert_eq!(convert("a { margin: 16px 8px; }"), "a { margin: 1rem 0.5rem; }");
    }

    #[test]
    fn test_precision_and_trimming() {
        assert_eq!(convert("a{width:5px}"), "a{width:0.3125rem}");
        assert_eq!(convert("a{width:3px}"), "a{width:0.1875rem}");
        assert_eq!(convert("a{width:1000px}"), "a{width:62.5rem}");
        assert_eq!(convert("a{width:0.5px}"), "a{width:0.5px}");
    }

    #[test]
    fn test_min_pixel_value() {
        assert_eq!(convert("a{border:1px solid}"), "a{border:1px solid}");
        assert_eq!(convert("a{border:2px solid}"), "a{border:0.125rem solid}");
    }

    #[test]
    fn test_negative_and_decimal_values() {
        assert_eq!(convert("a{margin:-32px}"), "a{margin:-2rem}");
        assert_eq!(convert("a{margin:.5px 24.8px}"), "a{margin:.5px 1.55rem}");
    }

    #[test]
    fn test_media_query_prelude_untouched() {
        let css = "@media (min-width: 768px) {\n  a { padding: 32px; }\n}";
        assert_eq!(convert(css), "@media (min-width: 768px) {\n  a { padding: 2rem; }\n}");
    }

    #[test]
    fn test_strings_and_urls_untouched() {
        let css = r#"a{content:"16px";background:url(img-16px.png) 16px;}"#;
        assert_eq!(convert(css), r#"a{content:"16px";background:url(img-16px.png) 1rem;}"#);
    }

    #[test]
    fn test_data_url_with_semicolon() {
        let css = "a{background:url(data:image/png;base64,AAA16px) 32px;}";
        assert_eq!(convert(css), "a{background:url(data:image/png;base64,AAA16px) 2rem;}");
    }

    #[test]
    fn test_comments_untouched() {
        let css = "/* 16px grid */\na { /* gap 8px */ gap: 8px; }";
        assert_eq!(convert(css), "/* 16px grid */\na { /* gap 8px */ gap: 0.5rem; }");
    }

    #[test]
    fn test_comment_inside_value() {
        let css = "a{margin: 16px /* top */ 32px;}";
        assert_eq!(convert(css), "a{margin: 1rem /* top */ 2rem;}");
    }

    #[test]
    fn test_selectors_untouched() {
        let css = ".w-16px { width: 16px; }";
        assert_eq!(convert(css), ".w-16px { width: 1rem; }");
    }

    #[test]
    fn test_custom_root_value() {
        let conv = PxToRem { root_value: 10.0, unit_precision: 2, min_pixel_value: 0.0 };
        assert_eq!(conv.convert("a{font-size:15px;width:0px}"), "a{font-size:1.5rem;width:0}");
    }
}
