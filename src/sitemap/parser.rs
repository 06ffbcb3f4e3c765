use crate::sitemap::{SitemapError, SitemapResult};
use quick_xml::events::Event;
use quick_xml::Reader;

/// `<loc>` entries of one sitemap document, split by their parent element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SitemapDocument {
    /// `<sitemap><loc>` entries; non-empty means the document is an index
    pub sitemaps: Vec<String>,
    /// `<url><loc>` entries
    pub urls: Vec<String>,
}

impl SitemapDocument {
    pub fn is_index(&self) -> bool {
        !self.sitemaps.is_empty()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Parent {
    None,
    Sitemap,
    Url,
}

/// Parses a sitemap or sitemap index
///
/// Element names are matched on their local part, so namespace prefixes do
/// not matter. Locations are trimmed and empty ones dropped.
///
/// # Examples
///
/// ```
/// use invoice_scout::sitemap::parse_sitemap;
///
/// let xml = r#"<urlset><url><loc> https://mof.gov.ae/en/a </loc></url></urlset>"#;
/// let doc = parse_sitemap(xml).unwrap();
/// assert!(!doc.is_index());
/// assert_eq!(doc.urls, vec!["https://mof.gov.ae/en/a".to_string()]);
/// ```
pub fn parse_sitemap(xml: &str) -> SitemapResult<SitemapDocument> {
    let mut reader = Reader::from_str(xml);
    let mut doc = SitemapDocument::default();
    let mut parent = Parent::None;
    // Depth of the open <sitemap>/<url>, so nested extension <loc>s are skipped
    let mut parent_depth = 0usize;
    let mut depth = 0usize;
    let mut in_loc = false;
    let mut loc = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                match e.local_name().as_ref() {
                    b"sitemap" if parent == Parent::None => {
                        parent = Parent::Sitemap;
                        parent_depth = depth;
                    }
                    b"url" if parent == Parent::None => {
                        parent = Parent::Url;
                        parent_depth = depth;
                    }
                    b"loc" if parent != Parent::None && depth == parent_depth + 1 => {
                        in_loc = true;
                        loc.clear();
                    }
                    _ => {}
                }
                depth += 1;
            }
            Ok(Event::Text(e)) if in_loc => {
                let text = e.unescape().map_err(|e| SitemapError::Xml(e.to_string()))?;
                loc.push_str(&text);
            }
            Ok(Event::CData(e)) if in_loc => {
                loc.push_str(&String::from_utf8_lossy(&e.into_inner()));
            }
            Ok(Event::End(e)) => {
                depth = depth.saturating_sub(1);
                match e.local_name().as_ref() {
                    b"loc" if in_loc => {
                        in_loc = false;
                        let value = loc.trim();
                        if !value.is_empty() {
                            match parent {
                                Parent::Sitemap => doc.sitemaps.push(value.to_string()),
                                Parent::Url => doc.urls.push(value.to_string()),
                                Parent::None => {}
                            }
                        }
                    }
                    b"sitemap" | b"url" if depth == parent_depth => parent = Parent::None,
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(SitemapError::Xml(format!(
                    "at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_index() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sitemap><loc>https://mof.gov.ae/page-sitemap.xml</loc><lastmod>2024-01-01</lastmod></sitemap>
  <sitemap><loc>https://mof.gov.ae/post-sitemap.xml</loc></sitemap>
</sitemapindex>"#;

        let doc = parse_sitemap(xml).unwrap();
        assert!(doc.is_index());
        assert_eq!(
            doc.sitemaps,
            vec![
                "https://mof.gov.ae/page-sitemap.xml".to_string(),
                "https://mof.gov.ae/post-sitemap.xml".to_string(),
            ]
        );
        assert!(doc.urls.is_empty());
    }

    #[test]
    fn test_parse_urlset() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url>
    <loc>
      https://mof.gov.ae/en/a/
    </loc>
  </url>
  <url><loc>https://mof.gov.ae/en/b/?x=1&amp;y=2</loc></url>
  <url><loc></loc></url>
</urlset>"#;

        let doc = parse_sitemap(xml).unwrap();
        assert!(!doc.is_index());
        assert_eq!(
            doc.urls,
            vec![
                "https://mof.gov.ae/en/a/".to_string(),
                "https://mof.gov.ae/en/b/?x=1&y=2".to_string(),
            ]
        );
    }

    #[test]
    fn test_namespace_prefix_and_cdata() {
        let xml = r#"<s:urlset xmlns:s="http://www.sitemaps.org/schemas/sitemap/0.9">
  <s:url><s:loc><![CDATA[https://bosa.belgium.be/fr]]></s:loc></s:url>
</s:urlset>"#;

        let doc = parse_sitemap(xml).unwrap();
        assert_eq!(doc.urls, vec!["https://bosa.belgium.be/fr".to_string()]);
    }

    #[test]
    fn test_loc_outside_entries_ignored() {
        // Image and other extension locations are not page entries
        let xml = r#"<urlset><loc>https://stray.example/</loc>
  <url><loc>https://mof.gov.ae/en/a</loc></url></urlset>"#;
        let doc = parse_sitemap(xml).unwrap();
        assert_eq!(doc.urls, vec!["https://mof.gov.ae/en/a".to_string()]);
    }

    #[test]
    fn test_nested_extension_loc_ignored() {
        let xml = r#"<urlset xmlns:image="http://www.google.com/schemas/sitemap-image/1.1">
  <url>
    <loc>https://mof.gov.ae/en/a</loc>
    <image:image><image:loc>https://mof.gov.ae/img/a.png</image:loc></image:image>
  </url>
</urlset>"#;
        let doc = parse_sitemap(xml).unwrap();
        assert_eq!(doc.urls, vec!["https://mof.gov.ae/en/a".to_string()]);
    }

    #[test]
    fn test_malformed_xml() {
        let result = parse_sitemap("<urlset><url><loc>https://a</url></urlset>");
        assert!(matches!(result, Err(SitemapError::Xml(_))));
    }

    #[test]
    fn test_empty_document() {
        let doc = parse_sitemap("").unwrap();
        assert_eq!(doc, SitemapDocument::default());
    }
}
