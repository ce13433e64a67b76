//! Media query grouping.
//!
//! Top-level `@media` blocks with the same query are merged into one block.
//! Merged blocks are appended after all other rules, in the order each
//! query was first seen.

use super::CssError;
use lightningcss::media_query::MediaList;
use lightningcss::rules::media::MediaRule;
use lightningcss::rules::CssRule;
use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::traits::ToCss;

/// Merge identical top-level media queries in `css`.
pub fn group_media(css: &str) -> Result<String, CssError> {
    let mut sheet = StyleSheet::parse(css, ParserOptions::default())
        .map_err(|e| CssError::Parse(e.to_string()))?;

    let mut others = Vec::new();
    let mut groups: Vec<(String, MediaRule<'_>)> = Vec::new();

    for rule in std::mem::take(&mut sheet.rules.0) {
        match rule {
            CssRule::Media(media) => {
                let key = query_key(&media.query)?;
                match groups.iter_mut().find(|(k, _)| *k == key) {
                    Some((_, existing)) => existing.rules.0.extend(media.rules.0),
                    None => groups.push((key, media)),
                }
            }
            other => others.push(other),
        }
    }

    others.extend(groups.into_iter().map(|(_, media)| CssRule::Media(media)));
    sheet.rules.0 = others;

    let printed =
        sheet.to_css(PrinterOptions::default()).map_err(|e| CssError::Print(e.to_string()))?;
    Ok(printed.code)
}

fn query_key(query: &MediaList<'_>) -> Result<String, CssError> {
    query.to_css_string(PrinterOptions::default()).map_err(|e| CssError::Print(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merges_identical_queries() {
        let css = "@media (min-width: 768px) { .a { color: red } }\n\
                   .b { color: blue }\n\
                   @media (min-width: 768px) { .c { color: green } }";
        let out = group_media(css).unwrap();

        assert_eq!(out.matches("@media").count(), 1);
        let b = out.find(".b").unwrap();
        let media = out.find("@media").unwrap();
        let a = out.find(".a").unwrap();
        let c = out.find(".c").unwrap();
        assert!(b < media && media < a && a < c);
    }

    #[test]
    fn test_distinct_queries_keep_first_seen_order() {
        let css = "@media print { .p { color: black } }\n\
                   @media (max-width: 600px) { .m { color: red } }\n\
                   @media print { .q { color: gray } }";
        let out = group_media(css).unwrap();

        assert_eq!(out.matches("@media").count(), 2);
        assert!(out.find("print").unwrap() < out.find("max-width").unwrap());
        assert!(out.find(".q").unwrap() < out.find("max-width").unwrap());
    }

    #[test]
    fn test_no_media_is_unchanged_structurally() {
        let out = group_media(".a { color: red }").unwrap();
        assert!(out.contains(".a"));
        assert!(!out.contains("@media"));
    }
}
