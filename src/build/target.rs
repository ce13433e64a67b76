//! Asset categories.
//!
//! Each category owns one transform, one watch glob and a disjoint set of
//! destination paths.

/// Category of asset handled by one transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssetKind {
    /// Page templates
    Html,
    /// Sass stylesheets
    Style,
    /// Script files
    Script,
    /// Raster and vector images, sprite and favicons
    Image,
    /// Web fonts
    Font,
}

impl AssetKind {
    /// All kinds in the order the build phase schedules them.
    pub const ALL: [AssetKind; 5] =
        [AssetKind::Html, AssetKind::Style, AssetKind::Script, AssetKind::Image, AssetKind::Font];

    pub fn as_str(self) -> &'static str {
        match self {
            AssetKind::Html => "html",
            AssetKind::Style => "style",
            AssetKind::Script => "script",
            AssetKind::Image => "image",
            AssetKind::Font => "font",
        }
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
