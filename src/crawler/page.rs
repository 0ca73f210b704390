use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde_json::{Map, Value};
use url::Url;

// Always dropped before conversion, on top of the caller's excluded tags.
const NON_CONTENT_TAGS: &[&str] = &["script", "style", "noscript", "template"];

static BODY_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("body").expect("Failed to parse body selector"));

static TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("title").expect("Failed to parse title selector"));

static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("Failed to parse link selector"));

static META_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("meta[content]").expect("Failed to parse meta selector"));

/// What the crawler keeps from a fetched HTML document.
#[derive(Debug, Clone, Default)]
pub struct PageContent {
    pub markdown: String,
    pub links: Vec<String>,
    pub metadata: Map<String, Value>,
}

impl PageContent {
    pub fn parse(html: &str, base_url: &Url, excluded_tags: &[String]) -> Self {
        let mut document = Html::parse_document(html);

        // Links and metadata come from the untouched document; nav and
        // header links are still links.
        let links = extract_links(&document, base_url);
        let metadata = extract_metadata(&document);

        remove_tags(&mut document, excluded_tags);
        let body = extract_body(&document).unwrap_or_else(|| document.root_element().html());
        let markdown = format_markdown(&html_to_markdown(&body));

        Self {
            markdown,
            links,
            metadata,
        }
    }
}

fn remove_tags(document: &mut Html, excluded_tags: &[String]) {
    let tags = NON_CONTENT_TAGS
        .iter()
        .copied()
        .chain(excluded_tags.iter().map(String::as_str));

    for tag in tags {
        let Ok(selector) = Selector::parse(tag) else {
            tracing::warn!(tag, "ignoring unparsable excluded tag");
            continue;
        };
        let ids: Vec<_> = document.select(&selector).map(|el| el.id()).collect();
        for id in ids {
            if let Some(mut node) = document.tree.get_mut(id) {
                node.detach();
            }
        }
    }
}

pub fn extract_body(document: &Html) -> Option<String> {
    document
        .select(&BODY_SELECTOR)
        .next()
        .map(|element| element.inner_html())
}

fn html_to_markdown(html: &str) -> String {
    htmd::convert(html).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "markdown conversion failed, falling back to text");
        Html::parse_fragment(html)
            .root_element()
            .text()
            .collect::<Vec<_>>()
            .join(" ")
    })
}

/// Trims trailing whitespace on each line and collapses runs of blank lines.
/// A two-space hard line break on a non-empty line is kept.
pub fn format_markdown(markdown: &str) -> String {
    let mut result = String::with_capacity(markdown.len());
    let mut pending_blank = false;

    for raw in markdown.lines() {
        let line = raw.trim_end();
        if line.is_empty() {
            pending_blank = !result.is_empty();
            continue;
        }
        if pending_blank {
            result.push('\n');
            pending_blank = false;
        }
        if !result.is_empty() {
            result.push('\n');
        }
        result.push_str(line);
        if raw.ends_with("  ") {
            result.push_str("  ");
        }
    }

    result
}

/// Absolute http(s) links in document order, without duplicates or fragments.
pub fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();

    document
        .select(&LINK_SELECTOR)
        .filter_map(|el| el.value().attr("href"))
        .filter_map(|href| base_url.join(href.trim()).ok())
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .map(|mut url| {
            url.set_fragment(None);
            url.to_string()
        })
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

/// `title`, `description`, and any OpenGraph (`og:*`) properties.
pub fn extract_metadata(document: &Html) -> Map<String, Value> {
    let mut metadata = Map::new();

    if let Some(title) = document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
    {
        metadata.insert("title".into(), Value::String(title));
    }

    for meta in document.select(&META_SELECTOR) {
        let el = meta.value();
        let Some(content) = el.attr("content").map(str::trim).filter(|c| !c.is_empty()) else {
            continue;
        };
        let key = match (el.attr("name"), el.attr("property")) {
            (Some(name), _) if name.eq_ignore_ascii_case("description") => "description",
            (_, Some(property)) if property.starts_with("og:") => property,
            _ => continue,
        };
        metadata
            .entry(key.to_string())
            .or_insert_with(|| Value::String(content.to_string()));
    }

    metadata
}
