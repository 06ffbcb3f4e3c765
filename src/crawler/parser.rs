//! HTML content extraction
//!
//! This module turns a fetched page into what the classifier sees:
//! - The page title
//! - The visible body text, whitespace-normalized, with layout chrome removed
//! - Raw `<a href>` values for the link-following discovery mode

use crate::config::WidgetRule;
use crate::{ConfigError, ConfigResult};
use scraper::{ElementRef, Html, Selector};

/// Elements never considered page content
const NOISE_SELECTOR: &str = "script, style, nav, footer, header";

const UNTITLED: &str = "Untitled Page";

/// Extracted information from an HTML page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContent {
    /// The page title, or "Untitled Page"
    pub title: String,

    /// Body text with runs of whitespace collapsed to single spaces
    pub text: String,

    /// `href` values of the remaining anchors, unresolved
    pub links: Vec<String>,
}

/// A widget rule with its selector compiled
#[derive(Debug)]
struct CompiledWidgetRule {
    heading: Selector,
    /// Lowercased, whitespace-normalized labels
    labels: Vec<String>,
    min_links: usize,
}

/// Compiled cleanup rules of one site
#[derive(Debug)]
pub struct ContentRules {
    noise: Selector,
    body: Selector,
    title: Selector,
    anchors: Selector,
    widgets: Vec<CompiledWidgetRule>,
}

impl ContentRules {
    /// Compiles the cleanup rules of a site
    ///
    /// # Arguments
    ///
    /// * `widget_rules` - Heading-labelled link blocks to strip
    ///
    /// # Returns
    ///
    /// * `Ok(ContentRules)` - All selectors compiled
    /// * `Err(ConfigError::InvalidPattern)` - A heading selector failed to parse
    pub fn new(widget_rules: &[WidgetRule]) -> ConfigResult<Self> {
        let widgets = widget_rules
            .iter()
            .map(|rule| {
                Ok(CompiledWidgetRule {
                    heading: parse_selector(&rule.heading_selector)?,
                    labels: rule
                        .heading_labels
                        .iter()
                        .map(|label| normalize_whitespace(label).to_lowercase())
                        .collect(),
                    min_links: rule.min_links,
                })
            })
            .collect::<ConfigResult<Vec<_>>>()?;

        Ok(Self {
            noise: parse_selector(NOISE_SELECTOR)?,
            body: parse_selector("body")?,
            title: parse_selector("title")?,
            anchors: parse_selector("a[href]")?,
            widgets,
        })
    }
}

/// Extracts title, text and links from an HTML document
///
/// Noise elements are removed first. Then, for every widget rule, each heading
/// whose text equals one of the rule's labels (case-insensitively) is removed
/// together with its next element sibling, provided that sibling holds at
/// least `min_links` anchors.
///
/// # Example
///
/// ```
/// use invoice_scout::crawler::{extract_content, ContentRules};
///
/// let rules = ContentRules::new(&[]).unwrap();
/// let html = r#"<html><head><title> Home </title></head>
///     <body><nav>Menu</nav><p>Tax   invoice rules</p></body></html>"#;
/// let page = extract_content(html, &rules);
/// assert_eq!(page.title, "Home");
/// assert_eq!(page.text, "Tax invoice rules");
/// ```
pub fn extract_content(html: &str, rules: &ContentRules) -> PageContent {
    let mut document = Html::parse_document(html);

    let title = document
        .select(&rules.title)
        .next()
        .map(|element| normalize_whitespace(&element.text().collect::<String>()))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string());

    let mut doomed: Vec<_> = document.select(&rules.noise).map(|e| e.id()).collect();
    for widget in &rules.widgets {
        for heading in document.select(&widget.heading) {
            let label = normalize_whitespace(&heading.text().collect::<String>()).to_lowercase();
            if !widget.labels.contains(&label) {
                continue;
            }

            let Some(block) = heading.next_siblings().find_map(ElementRef::wrap) else {
                continue;
            };
            if block.select(&rules.anchors).count() >= widget.min_links {
                doomed.push(heading.id());
                doomed.push(block.id());
            }
        }
    }

    for id in doomed {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }

    let text = document
        .select(&rules.body)
        .next()
        .map(|body| normalize_whitespace(&body.text().collect::<String>()))
        .unwrap_or_default();

    // `Html::select` also visits detached nodes; walk from the root instead.
    let links = document
        .root_element()
        .select(&rules.anchors)
        .filter(|a| a.value().attr("download").is_none())
        .filter_map(|a| a.value().attr("href"))
        .map(str::to_string)
        .collect();

    PageContent { title, text, links }
}

/// Collapses every run of whitespace into one space and trims the ends
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Returns at most `max_chars` characters of `text`
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

fn parse_selector(selector: &str) -> ConfigResult<Selector> {
    Selector::parse(selector)
        .map_err(|e| ConfigError::InvalidPattern(format!("selector '{}': {:?}", selector, e)))
}
