//! Per-extension transport metadata applied at upload time.
//!
//! HTML entry points reference hashed asset names, so they must always be
//! revalidated; every other file is cached for 30 days.

use std::path::Path;

/// Cache-Control for files that must be refetched on every load.
pub const NO_CACHE: &str = "max-age=0, must-revalidate";

/// Cache-Control for everything without an override (30 days).
pub const DEFAULT_CACHE_CONTROL: &str = "max-age=2592000, must-revalidate";

/// File kinds with a known content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    JavaScript,
    Html,
    Css,
    Png,
    Gif,
    Jpeg,
    Svg,
    Json,
    SourceMap,
    Icon,
    Woff,
    Woff2,
    Text,
}

impl FileKind {
    /// Exact, case-sensitive match on the extension including its leading dot.
    pub fn from_extension(extension: &str) -> Option<Self> {
        let kind = match extension {
            ".js" => FileKind::JavaScript,
            ".html" => FileKind::Html,
            ".css" => FileKind::Css,
            ".png" => FileKind::Png,
            ".gif" => FileKind::Gif,
            ".jpeg" | ".jpg" => FileKind::Jpeg,
            ".svg" => FileKind::Svg,
            ".json" => FileKind::Json,
            ".map" => FileKind::SourceMap,
            ".ico" => FileKind::Icon,
            ".woff" => FileKind::Woff,
            ".woff2" => FileKind::Woff2,
            ".txt" => FileKind::Text,
            _ => return None,
        };
        Some(kind)
    }

    pub fn content_type(self) -> &'static str {
        match self {
            FileKind::JavaScript => "application/javascript",
            FileKind::Html => "text/html",
            FileKind::Css => "text/css",
            FileKind::Png => "image/png",
            FileKind::Gif => "image/gif",
            FileKind::Jpeg => "image/jpeg",
            FileKind::Svg => "image/svg+xml",
            FileKind::Json | FileKind::SourceMap => "application/json",
            FileKind::Icon => "image/x-icon",
            FileKind::Woff => "font/woff",
            FileKind::Woff2 => "font/woff2",
            FileKind::Text => "text/plain",
        }
    }

    /// `None` means the default cache policy applies.
    pub fn cache_control_override(self) -> Option<&'static str> {
        match self {
            FileKind::Html => Some(NO_CACHE),
            _ => None,
        }
    }
}

/// Content type for an extension such as `".js"`; `None` leaves it unset.
pub fn content_type(extension: &str) -> Option<&'static str> {
    FileKind::from_extension(extension).map(FileKind::content_type)
}

/// Cache-Control for an extension such as `".html"`.
pub fn cache_control(extension: &str) -> &'static str {
    FileKind::from_extension(extension)
        .and_then(FileKind::cache_control_override)
        .unwrap_or(DEFAULT_CACHE_CONTROL)
}

/// Extension of `path` with its leading dot, or `""` when it has none.
///
/// Dotfiles such as `.htaccess` have no extension.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &[(&str, &str)] = &[
        (".js", "application/javascript"),
        (".html", "text/html"),
        (".css", "text/css"),
        (".png", "image/png"),
        (".gif", "image/gif"),
        (".jpeg", "image/jpeg"),
        (".jpg", "image/jpeg"),
        (".svg", "image/svg+xml"),
        (".json", "application/json"),
        (".map", "application/json"),
        (".ico", "image/x-icon"),
        (".woff", "font/woff"),
        (".woff2", "font/woff2"),
        (".txt", "text/plain"),
    ];

    #[test]
    fn known_extensions_map_to_their_content_type() {
        for (ext, expected) in TABLE {
            assert_eq!(content_type(ext), Some(*expected), "extension {ext}");
        }
    }

    #[test]
    fn unknown_extensions_leave_content_type_unset() {
        for ext in ["", ".wasm", ".HTML", "js", ".js.gz", "jpeg"] {
            assert_eq!(content_type(ext), None, "extension {ext:?}");
        }
    }

    #[test]
    fn only_html_overrides_cache_control() {
        assert_eq!(cache_control(".html"), NO_CACHE);
        for (ext, _) in TABLE.iter().filter(|(ext, _)| *ext != ".html") {
            assert_eq!(cache_control(ext), DEFAULT_CACHE_CONTROL, "extension {ext}");
        }
        assert_eq!(cache_control(""), DEFAULT_CACHE_CONTROL);
        assert_eq!(cache_control(".unknown"), DEFAULT_CACHE_CONTROL);
    }

    #[test]
    fn extension_includes_the_dot() {
        assert_eq!(extension_of(Path::new("assets/app.abc123.js")), ".js");
        assert_eq!(extension_of(Path::new("index.html")), ".html");
        assert_eq!(extension_of(Path::new("LICENSE")), "");
        assert_eq!(extension_of(Path::new(".htaccess")), "");
    }
}
