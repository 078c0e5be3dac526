use reqwest::{Client, ClientBuilder};
use scraper::{ElementRef, Html, Node, Selector};
use std::time::Duration;
use once_cell::sync::Lazy;
use url::Url;
use crate::config::Config;
use crate::error::{AppError, Result};

/// Pages yielding less text than this are treated as empty.
pub const MIN_CONTENT_CHARS: usize = 50;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

const SKIP_TAGS: &[&str] = &[
    "script", "style", "nav", "header", "footer", "noscript", "template", "svg", "iframe",
];

const BLOCK_TAGS: &[&str] = &[
    "p", "div", "br", "h1", "h2", "h3", "h4", "h5", "h6", "li", "tr", "td", "th",
    "article", "section", "main", "blockquote", "pre", "figcaption", "dt", "dd",
];

// Create static selectors to avoid recompiling them each time
static CONTENT_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    ["article", "main", "[role=\"main\"]"]
        .iter()
        .map(|s| Selector::parse(s).expect("Failed to parse content selector"))
        .collect()
});

static BODY_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("body").expect("Failed to parse body selector")
});

/// Plain text pulled from one page. Lives only for the duration of a request.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    pub plain_text: String,
    pub source_url: String,
    /// Set when the text was cut at the configured character cap.
    pub truncated: bool,
}

pub struct Fetcher {
    client: Client,
    max_chars: Option<usize>,
}

impl Fetcher {
    pub fn new(config: &Config) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(config.fetch_timeout)
            .connect_timeout(Duration::from_secs(5))
            .pool_max_idle_per_host(10)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AppError::ConfigError(format!("Failed to build HTTP client: {e}")))?;

        Ok(Fetcher {
            client,
            max_chars: config.max_content_chars,
        })
    }

    pub async fn fetch(&self, url: &str) -> Result<ExtractedDocument> {
        let url = normalize_url(url)?;
        tracing::info!(%url, "Fetching content");

        let html = self.fetch_html(&url).await?;
        let text = extract_text(&html);

        let length = text.chars().count();
        if length < MIN_CONTENT_CHARS {
            return Err(AppError::NoContent(format!(
                "extracted {length} characters, need at least {MIN_CONTENT_CHARS}"
            )));
        }

        let (plain_text, truncated) = match self.max_chars {
            Some(max) => truncate_chars(&text, max),
            None => (text, false),
        };
        if truncated {
            tracing::info!(%url, original = length, kept = plain_text.chars().count(), "Extracted text truncated");
        }

        tracing::info!(%url, chars = plain_text.chars().count(), "Successfully extracted text");
        Ok(ExtractedDocument {
            plain_text,
            source_url: url.to_string(),
            truncated,
        })
    }

    async fn fetch_html(&self, url: &Url) -> Result<String> {
        let response = self.client.get(url.as_str()).send().await?;
        let response = response.error_for_status()?;
        let html = response.text().await?;
        Ok(html)
    }
}

/// Parses `raw` as an absolute http(s) URL with a host.
pub fn parse_absolute_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| AppError::InvalidUrl(e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::InvalidUrl(format!(
            "unsupported scheme '{}'",
            url.scheme()
        )));
    }
    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(AppError::InvalidUrl("missing host".to_string())),
    }
}

/// Like [`parse_absolute_url`], but assumes `https://` when no scheme is given.
pub fn normalize_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AppError::InvalidUrl("empty URL".to_string()));
    }

    let lower = raw.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        parse_absolute_url(raw)
    } else if let Some((scheme, _)) = raw.split_once("://") {
        Err(AppError::InvalidUrl(format!("unsupported scheme '{scheme}'")))
    } else {
        parse_absolute_url(&format!("https://{raw}"))
    }
}

/// Visible text of a page with boilerplate subtrees removed.
///
/// Prefers an `<article>`/`<main>` region when it carries a reasonable amount
/// of text, otherwise falls back to `<body>` and finally the whole document.
pub fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);

    for selector in CONTENT_SELECTORS.iter() {
        if let Some(element) = document.select(selector).next() {
            let text = element_text(&element);
            if text.chars().count() >= 2 * MIN_CONTENT_CHARS {
                return text;
            }
        }
    }

    if let Some(body) = document.select(&BODY_SELECTOR).next() {
        return element_text(&body);
    }

    element_text(&document.root_element())
}

fn element_text(element: &ElementRef<'_>) -> String {
    let mut buf = String::new();
    collect_text(element, &mut buf);
    collapse_whitespace(&buf)
}

fn collect_text(element: &ElementRef<'_>, buf: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => buf.push_str(text),
            Node::Element(el) => {
                let tag = el.name();
                if SKIP_TAGS.contains(&tag) {
                    continue;
                }
                let is_block = BLOCK_TAGS.contains(&tag);
                if is_block {
                    buf.push('\n');
                }
                if let Some(child_ref) = ElementRef::wrap(child) {
                    collect_text(&child_ref, buf);
                }
                if is_block {
                    buf.push('\n');
                }
            }
            _ => {}
        }
    }
}

/// Trims every line, splits on runs of two or more spaces and joins the
/// non-empty phrases with a single space.
pub fn collapse_whitespace(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for line in text.lines() {
        for phrase in line.trim().split("  ") {
            let phrase = phrase.trim();
            if phrase.is_empty() {
                continue;
            }
            if !result.is_empty() {
                result.push(' ');
            }
            result.push_str(phrase);
        }
    }

    result
}

fn truncate_chars(text: &str, max: usize) -> (String, bool) {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => (text[..byte_idx].to_string(), true),
        None => (text.to_string(), false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_prepends_https() {
        let url = normalize_url("example.com/article").unwrap();
        assert_eq!(url.as_str(), "https://example.com/article");
    }

    #[test]
    fn normalize_keeps_explicit_scheme() {
        let url = normalize_url("http://example.com").unwrap();
        assert_eq!(url.scheme(), "http");
    }

    #[test]
    fn normalize_rejects_garbage() {
        assert!(matches!(normalize_url(""), Err(AppError::InvalidUrl(_))));
        assert!(matches!(normalize_url("ftp://example.com"), Err(AppError::InvalidUrl(_))));
        assert!(matches!(normalize_url("https://"), Err(AppError::InvalidUrl(_))));
        assert!(matches!(normalize_url("not a url at all"), Err(AppError::InvalidUrl(_))));
    }

    #[test]
    fn absolute_url_requires_scheme_and_host() {
        assert!(parse_absolute_url("https://example.com/a").is_ok());
        assert!(matches!(parse_absolute_url("example.com"), Err(AppError::InvalidUrl(_))));
        assert!(matches!(parse_absolute_url("mailto:me@example.com"), Err(AppError::InvalidUrl(_))));
        assert!(matches!(parse_absolute_url("file:///etc/passwd"), Err(AppError::InvalidUrl(_))));
    }

    #[test]
    fn extraction_drops_boilerplate() {
        let html = r#"
            <html>
              <head><style>body { color: red; }</style></head>
              <body>
                <header>Site header</header>
                <nav><a href="/">Home</a></nav>
                <p>First   paragraph.</p>
                <script>var tracking = true;</script>
                <p>Second paragraph.</p>
                <footer>Copyright</footer>
              </body>
            </html>"#;

        let text = extract_text(html);
        assert_eq!(text, "First paragraph. Second paragraph.");
    }

    #[test]
    fn text_after_block_elements_stays_separated() {
        let html = "<div>Intro<h2>Heading</h2>Following text<p>Para</p>Outro</div>";
        assert_eq!(extract_text(html), "Intro Heading Following text Para Outro");
    }

    #[test]
    fn extraction_prefers_article_region() {
        let body = "The article body is long enough to be picked over the sidebar. ".repeat(3);
        let html = format!(
            "<html><body><aside>Sidebar links and promos</aside><article><p>{body}</p></article></body></html>"
        );

        let text = extract_text(&html);
        assert!(!text.contains("Sidebar"));
        assert!(text.starts_with("The article body"));
    }

    #[test]
    fn collapse_joins_phrases_with_single_spaces() {
        let text = "  Title  \n\n   one  two\tthree  \n    \nlast line ";
        assert_eq!(collapse_whitespace(text), "Title one two\tthree last line");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let (text, truncated) = truncate_chars("héllo wörld", 7);
        assert_eq!(text, "héllo w");
        assert!(truncated);

        let (text, truncated) = truncate_chars("short", 10);
        assert_eq!(text, "short");
        assert!(!truncated);
    }
}
