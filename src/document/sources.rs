//! Style and script sources reachable from a document.
//!
//! A [`ResourceSnapshot`] is taken once per run. Linked style sheets are
//! read through a [`SourceLoader`]; anything the loader cannot read is kept
//! in the snapshot as blocked instead of failing the run.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;
use thiserror::Error;
use tracing::warn;
use url::{Position, Url};

use super::{Document, NodeId};
use crate::css::Stylesheet;

/// Why a source could not be read.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockReason {
    #[error("cross-origin source is not accessible")]
    CrossOrigin,
    #[error("unreadable: {0}")]
    Unreadable(String),
}

/// Reads linked resources on behalf of the snapshot.
pub trait SourceLoader {
    /// Return the text behind `href` or the reason it is blocked.
    fn load(&self, href: &str) -> Result<String, BlockReason>;
}

/// Loads same-origin resources from the filesystem.
///
/// Relative references resolve against the document's directory as `file:`
/// URLs. Any other scheme, or a reference naming a host, is treated as
/// cross-origin and never fetched.
#[derive(Debug, Clone, Default)]
pub struct FsLoader {
    base_dir: Option<PathBuf>,
}

impl FsLoader {
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: Some(base_dir.as_ref().to_path_buf()),
        }
    }

    /// Loader rooted at the directory the document was read from.
    pub fn for_document(doc: &Document) -> Self {
        Self {
            base_dir: doc.base_dir().map(Path::to_path_buf),
        }
    }
}

impl FsLoader {
    /// Absolute URL of `href`, resolved against the base directory.
    fn resolve(&self, href: &str) -> Result<Url, BlockReason> {
        let base = match &self.base_dir {
            Some(dir) => Some(directory_url(dir)?),
            None => None,
        };
        Url::options()
            .base_url(base.as_ref())
            .parse(href)
            .map_err(|e| match e {
                url::ParseError::RelativeUrlWithoutBase => {
                    BlockReason::Unreadable("no base directory for relative path".to_string())
                }
                e => BlockReason::Unreadable(format!("{}: {}", href, e)),
            })
    }
}

impl SourceLoader for FsLoader {
    fn load(&self, href: &str) -> Result<String, BlockReason> {
        let url = self.resolve(href.trim())?;
        match url.scheme() {
            "data" => decode_data_url(&url),
            "file" if url.host().is_none() => {
                let path = url
                    .to_file_path()
                    .map_err(|()| BlockReason::Unreadable(format!("{}: not a local path", url)))?;
                std::fs::read_to_string(&path)
                    .map_err(|e| BlockReason::Unreadable(format!("{}: {}", path.display(), e)))
            }
            _ => Err(BlockReason::CrossOrigin),
        }
    }
}

fn directory_url(dir: &Path) -> Result<Url, BlockReason> {
    let absolute = if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| BlockReason::Unreadable(format!("{}: {}", dir.display(), e)))?
            .join(dir)
    };
    Url::from_directory_path(&absolute).map_err(|()| {
        BlockReason::Unreadable(format!("{}: not a directory path", absolute.display()))
    })
}

/// Decode a `data:` URL. Only percent-encoded payloads are read.
fn decode_data_url(url: &Url) -> Result<String, BlockReason> {
    let (meta, payload) = url[Position::BeforePath..Position::AfterQuery]
        .split_once(',')
        .ok_or_else(|| BlockReason::Unreadable("malformed data URL".to_string()))?;
    if meta.trim_end().to_ascii_lowercase().ends_with(";base64") {
        return Err(BlockReason::Unreadable(
            "base64 data URLs are not decoded".to_string(),
        ));
    }
    Ok(percent_decode_str(payload).decode_utf8_lossy().into_owned())
}

/// In-memory loader, keyed by the exact href.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    files: HashMap<String, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, href: &str, content: &str) -> Self {
        self.files.insert(href.to_string(), content.to_string());
        self
    }
}

impl SourceLoader for MemoryLoader {
    fn load(&self, href: &str) -> Result<String, BlockReason> {
        if let Some(content) = self.files.get(href) {
            return Ok(content.clone());
        }
        match Url::parse(href) {
            Ok(url) if !matches!(url.scheme(), "file" | "data") => Err(BlockReason::CrossOrigin),
            _ => Err(BlockReason::Unreadable(format!("{}: not found", href))),
        }
    }
}

/// Where a style source came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleOrigin {
    /// A `<style>` block; `index` counts every style source from 0.
    Embedded { index: usize },
    /// A `<link rel="stylesheet">`.
    Linked { href: String },
}

/// Parsed rules, or the reason they are unavailable.
#[derive(Debug, Clone)]
pub enum SourceState {
    Loaded(Stylesheet),
    Blocked(BlockReason),
}

/// One style sheet reachable from the document.
#[derive(Debug, Clone)]
pub struct StyleSource {
    /// Source identifier used when grouping matches: the href or `inline`.
    pub label: String,
    pub origin: StyleOrigin,
    pub state: SourceState,
}

impl StyleSource {
    pub fn is_blocked(&self) -> bool {
        matches!(self.state, SourceState::Blocked(_))
    }

    pub fn stylesheet(&self) -> Option<&Stylesheet> {
        match &self.state {
            SourceState::Loaded(sheet) => Some(sheet),
            SourceState::Blocked(_) => None,
        }
    }
}

/// An inline `<script>` block.
#[derive(Debug, Clone)]
pub struct InlineScript {
    /// `Inline Script #n`, counting inline scripts from 1.
    pub label: String,
    pub content: String,
    pub script_type: String,
}

/// A `<script src>` reference. Its content is never read.
#[derive(Debug, Clone)]
pub struct ExternalScript {
    pub src: String,
    pub is_async: bool,
    pub defer: bool,
    pub script_type: String,
}

/// An `on*` attribute anywhere in the document.
#[derive(Debug, Clone)]
pub struct EventHandlerAttr {
    pub node: NodeId,
    pub label: String,
    pub event: String,
    pub code: String,
}

/// Read-only view of every style and script source, taken once per run.
#[derive(Debug, Clone, Default)]
pub struct ResourceSnapshot {
    pub styles: Vec<StyleSource>,
    pub inline_scripts: Vec<InlineScript>,
    pub external_scripts: Vec<ExternalScript>,
    pub handlers: Vec<EventHandlerAttr>,
}

impl ResourceSnapshot {
    /// Walk the rendered document once and read every reachable source.
    pub fn capture(doc: &Document, loader: &dyn SourceLoader) -> Self {
        let mut snapshot = ResourceSnapshot::default();

        for id in doc.iter() {
            let el = doc.element(id);
            match el.tag() {
                "style" => {
                    let index = snapshot.styles.len();
                    snapshot.styles.push(StyleSource {
                        label: "inline".to_string(),
                        origin: StyleOrigin::Embedded { index },
                        state: SourceState::Loaded(Stylesheet::parse(&doc.text_content(id))),
                    });
                }
                "link" if is_stylesheet_link(el.attr("rel")) => {
                    let Some(href) = el.attr("href").filter(|h| !h.trim().is_empty()) else {
                        continue;
                    };
                    let state = match loader.load(href) {
                        Ok(text) => SourceState::Loaded(Stylesheet::parse(&text)),
                        Err(reason) => {
                            warn!(href, %reason, "style sheet blocked");
                            SourceState::Blocked(reason)
                        }
                    };
                    snapshot.styles.push(StyleSource {
                        label: href.to_string(),
                        origin: StyleOrigin::Linked {
                            href: href.to_string(),
                        },
                        state,
                    });
                }
                "script" => match el.attr("src") {
                    Some(src) => snapshot.external_scripts.push(ExternalScript {
                        src: src.to_string(),
                        is_async: el.has_attr("async"),
                        defer: el.has_attr("defer"),
                        script_type: script_type(el.attr("type")),
                    }),
                    None => {
                        let number = snapshot.inline_scripts.len() + 1;
                        snapshot.inline_scripts.push(InlineScript {
                            label: format!("Inline Script #{}", number),
                            content: doc.text_content(id),
                            script_type: script_type(el.attr("type")),
                        });
                    }
                },
                _ => {}
            }

            for (name, value) in el.attrs() {
                if let Some(event) = name.strip_prefix("on") {
                    snapshot.handlers.push(EventHandlerAttr {
                        node: id,
                        label: format!("Event handler {} [{}]", doc.generate_selector(id), name),
                        event: event.to_string(),
                        code: value.to_string(),
                    });
                }
            }
        }

        snapshot
    }

    /// Elements carrying a `style` attribute, in document order.
    pub fn styled_elements(doc: &Document) -> Vec<NodeId> {
        doc.iter()
            .into_iter()
            .filter(|&id| doc.element(id).attr("style").is_some())
            .collect()
    }
}

fn is_stylesheet_link(rel: Option<&str>) -> bool {
    rel.map(|rel| {
        rel.split_ascii_whitespace()
            .any(|token| token.eq_ignore_ascii_case("stylesheet"))
    })
    .unwrap_or(false)
}

fn script_type(attr: Option<&str>) -> String {
    match attr {
        Some(t) if !t.trim().is_empty() => t.trim().to_string(),
        _ => "text/javascript".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_capture_sources_in_document_order() {
        let doc = Document::parse(
            r#"<html><head>
<link rel="stylesheet" href="https://cdn.example.net/site.css">
<style>.a { color: red; }</style>
<link rel="stylesheet" href="local.css">
<script src="app.js" defer></script>
<script>var x = 1;</script>
</head><body><button onclick="go()">b</button><script>go();</script></body></html>"#,
        );
        let loader = MemoryLoader::new().with("local.css", ".b { margin: 0; }");
        let snapshot = ResourceSnapshot::capture(&doc, &loader);

        let labels: Vec<&str> = snapshot.styles.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["https://cdn.example.net/site.css", "inline", "local.css"]
        );
        assert!(matches!(
            snapshot.styles[0].state,
            SourceState::Blocked(BlockReason::CrossOrigin)
        ));
        assert_eq!(snapshot.styles[2].stylesheet().unwrap().rule_count(), 1);

        assert_eq!(snapshot.external_scripts.len(), 1);
        assert!(snapshot.external_scripts[0].defer);
        let scripts: Vec<&str> = snapshot
            .inline_scripts
            .iter()
            .map(|s| s.label.as_str())
            .collect();
        assert_eq!(scripts, vec!["Inline Script #1", "Inline Script #2"]);

        assert_eq!(snapshot.handlers.len(), 1);
        assert_eq!(snapshot.handlers[0].event, "click");
        assert_eq!(snapshot.handlers[0].code, "go()");
    }

    #[test]
    fn test_fs_loader() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("theme.css"), "body { color: blue; }").unwrap();
        let loader = FsLoader::new(temp.path());

        assert_eq!(loader.load("theme.css?v=2").unwrap(), "body { color: blue; }");
        assert_eq!(
            loader.load("https://other.org/x.css"),
            Err(BlockReason::CrossOrigin)
        );
        assert!(matches!(
            loader.load("missing.css"),
            Err(BlockReason::Unreadable(_))
        ));
        assert_eq!(
            loader.load("data:text/css,p%20%7B%20color%3A%20red%20%7D").unwrap(),
            "p { color: red }"
        );
        assert!(loader.load("data:text/css;base64,cCB7fQ==").is_err());
    }

    #[test]
    fn test_fs_loader_resolves_references() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("css")).unwrap();
        std::fs::write(temp.path().join("css").join("my theme.css"), "a { }").unwrap();
        std::fs::write(temp.path().join("base.css"), "b { }").unwrap();
        let loader = FsLoader::new(temp.path().join("css"));

        assert_eq!(loader.load("my%20theme.css#top").unwrap(), "a { }");
        assert_eq!(loader.load("./my theme.css").unwrap(), "a { }");
        assert_eq!(loader.load("../base.css").unwrap(), "b { }");

        let absolute = Url::from_file_path(temp.path().join("base.css")).unwrap();
        assert_eq!(loader.load(absolute.as_str()).unwrap(), "b { }");

        assert_eq!(
            loader.load("//cdn.example.com/x.css"),
            Err(BlockReason::CrossOrigin)
        );
        assert_eq!(
            loader.load("HTTPS://cdn.example.com/x.css"),
            Err(BlockReason::CrossOrigin)
        );
        assert_eq!(
            loader.load("ftp://files.example.com/x.css"),
            Err(BlockReason::CrossOrigin)
        );
    }

    #[test]
    fn test_data_urls() {
        let loader = FsLoader::default();
        assert_eq!(
            loader.load("data:,a%7Bcolor:red%7D").unwrap(),
            "a{color:red}"
        );
        assert_eq!(
            loader.load("data:text/css;charset=utf-8,%E2%9C%93").unwrap(),
            "\u{2713}"
        );
        assert_eq!(
            loader.load("data:text/css,p?q").unwrap(),
            "p?q"
        );
        assert!(matches!(
            loader.load("data:text/css"),
            Err(BlockReason::Unreadable(_))
        ));
        assert!(matches!(
            loader.load("theme.css"),
            Err(BlockReason::Unreadable(_))
        ));
    }

    #[test]
    fn test_memory_loader() {
        let loader = MemoryLoader::new().with("local.css", "a { }");
        assert_eq!(loader.load("local.css").unwrap(), "a { }");
        assert_eq!(
            loader.load("http://example.com/x.css"),
            Err(BlockReason::CrossOrigin)
        );
        assert!(matches!(
            loader.load("other.css"),
            Err(BlockReason::Unreadable(_))
        ));
    }
}
