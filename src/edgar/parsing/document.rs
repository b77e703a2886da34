use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{FactsError, Result};

/// Markup flavour of a filing document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// Inline-tagged HTML (or XHTML), parsed leniently
    Html,
    /// Standalone XBRL instance, parsed strictly
    Xml,
}

impl DocumentFormat {
    /// Guesses the format from the first bytes of the document. Inline XBRL
    /// published as XHTML carries an XML declaration and is read strictly.
    pub fn sniff(content: &str) -> Self {
        let head: String = content
            .trim_start_matches('\u{feff}')
            .trim_start()
            .chars()
            .take(512)
            .collect::<String>()
            .to_lowercase();

        if head.starts_with("<?xml") || head.starts_with("<xbrl") || head.starts_with("<xbrli:xbrl") {
            DocumentFormat::Xml
        } else {
            DocumentFormat::Html
        }
    }
}

impl FromStr for DocumentFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "html" | "htm" | "ixbrl" | "inline" => Ok(DocumentFormat::Html),
            "xml" | "xbrl" => Ok(DocumentFormat::Xml),
            _ => Err(format!("Unknown document format: {}", s)),
        }
    }
}

/// The capabilities fact extraction needs from a markup element.
pub trait TaggedElement: Sized {
    /// Tag name as written, namespace prefix included.
    fn tag_name(&self) -> String;

    /// Attribute value; names match case-insensitively.
    fn attribute(&self, name: &str) -> Option<&str>;

    /// Concatenated descendant text, skipping inline `exclude` blocks.
    fn text(&self) -> String;

    fn children(&self) -> Vec<Self>;

    /// False when the parser folds tag names to lowercase.
    fn preserves_case(&self) -> bool {
        true
    }

    fn local_name(&self) -> String {
        local_name(&self.tag_name()).to_string()
    }

    fn has_local_name(&self, name: &str) -> bool {
        self.local_name().eq_ignore_ascii_case(name)
    }

    /// Descendant elements with the given local name, in document order.
    fn descendants_named(&self, name: &str) -> Vec<Self> {
        let mut found = Vec::new();
        for child in self.children() {
            let nested = child.descendants_named(name);
            if child.has_local_name(name) {
                found.push(child);
            }
            found.extend(nested);
        }
        found
    }
}

/// A parsed document exposing its elements in document order.
pub trait TaggedDocument {
    type Element<'a>: TaggedElement
    where
        Self: 'a;

    /// Name used to identify the document in errors and diagnostics.
    fn name(&self) -> &str;

    fn elements(&self) -> Vec<Self::Element<'_>>;
}

/// Part of a qualified name after the namespace prefix.
pub fn local_name(qualified: &str) -> &str {
    qualified.rsplit(':').next().unwrap_or(qualified)
}

pub struct HtmlDocument {
    name: String,
    html: Html,
}

impl HtmlDocument {
    pub fn parse(name: &str, content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Err(FactsError::document_parse(name, "document is empty"));
        }

        let html = Html::parse_document(content);
        if !html.errors.is_empty() {
            log::debug!(
                "{} parsed with {} recoverable HTML errors",
                name,
                html.errors.len()
            );
        }

        Ok(Self {
            name: name.to_string(),
            html,
        })
    }
}

#[derive(Clone, Copy)]
pub struct HtmlElement<'a> {
    element: ElementRef<'a>,
}

impl<'a> TaggedElement for HtmlElement<'a> {
    fn tag_name(&self) -> String {
        self.element.value().name().to_string()
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.element
            .value()
            .attrs()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    fn text(&self) -> String {
        let root = self.element.id();
        let mut text = String::new();

        for node in self.element.descendants() {
            let Some(fragment) = node.value().as_text() else {
                continue;
            };
            let excluded = node
                .ancestors()
                .take_while(|ancestor| ancestor.id() != root)
                .filter_map(ElementRef::wrap)
                .any(|ancestor| local_name(ancestor.value().name()).eq_ignore_ascii_case("exclude"));
            if !excluded {
                text.push_str(fragment);
            }
        }

        text
    }

    fn children(&self) -> Vec<Self> {
        self.element
            .children()
            .filter_map(ElementRef::wrap)
            .map(|element| HtmlElement { element })
            .collect()
    }

    fn preserves_case(&self) -> bool {
        false
    }
}

impl TaggedDocument for HtmlDocument {
    type Element<'a> = HtmlElement<'a> where Self: 'a;

    fn name(&self) -> &str {
        &self.name
    }

    fn elements(&self) -> Vec<HtmlElement<'_>> {
        self.html
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .map(|element| HtmlElement { element })
            .collect()
    }
}

pub struct XmlDocument<'input> {
    name: String,
    tree: roxmltree::Document<'input>,
}

impl<'input> XmlDocument<'input> {
    /// Fails on malformed markup; instance documents must be well-formed.
    pub fn parse(name: &str, content: &'input str) -> Result<Self> {
        let options = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..roxmltree::ParsingOptions::default()
        };
        let tree = roxmltree::Document::parse_with_options(content, options)
            .map_err(|e| FactsError::document_parse(name, e))?;

        Ok(Self {
            name: name.to_string(),
            tree,
        })
    }
}

#[derive(Clone, Copy)]
pub struct XmlElement<'a, 'input> {
    node: roxmltree::Node<'a, 'input>,
}

impl<'a, 'input> TaggedElement for XmlElement<'a, 'input> {
    fn tag_name(&self) -> String {
        let tag = self.node.tag_name();
        match tag
            .namespace()
            .and_then(|namespace| self.node.lookup_prefix(namespace))
        {
            Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, tag.name()),
            _ => tag.name().to_string(),
        }
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.node
            .attributes()
            .find(|attr| attr.name().eq_ignore_ascii_case(name))
            .map(|attr| attr.value())
    }

    fn text(&self) -> String {
        let root = self.node;
        let mut text = String::new();

        for node in self.node.descendants().filter(|n| n.is_text()) {
            let excluded = node
                .ancestors()
                .take_while(|ancestor| *ancestor != root)
                .any(|ancestor| {
                    ancestor.is_element() && ancestor.tag_name().name().eq_ignore_ascii_case("exclude")
                });
            if !excluded {
                text.push_str(node.text().unwrap_or(""));
            }
        }

        text
    }

    fn children(&self) -> Vec<Self> {
        self.node
            .children()
            .filter(|n| n.is_element())
            .map(|node| XmlElement { node })
            .collect()
    }
}

impl<'input> TaggedDocument for XmlDocument<'input> {
    type Element<'a> = XmlElement<'a, 'input> where Self: 'a;

    fn name(&self) -> &str {
        &self.name
    }

    fn elements(&self) -> Vec<XmlElement<'_, 'input>> {
        self.tree
            .root_element()
            .descendants()
            .filter(|n| n.is_element())
            .map(|node| XmlElement { node })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_format() {
        assert_eq!(
            DocumentFormat::sniff("<?xml version=\"1.0\"?><xbrli:xbrl/>"),
            DocumentFormat::Xml
        );
        assert_eq!(
            DocumentFormat::sniff("<?xml version=\"1.0\"?>\n<html xmlns=\"http://www.w3.org/1999/xhtml\">"),
            DocumentFormat::Xml
        );
        assert_eq!(DocumentFormat::sniff("<html><body/></html>"), DocumentFormat::Html);
        assert_eq!("xbrl".parse::<DocumentFormat>().unwrap(), DocumentFormat::Xml);
    }

    #[test]
    fn test_html_attributes_are_case_insensitive() {
        let doc = HtmlDocument::parse(
            "test.htm",
            r#"<html><body><ix:nonFraction name="us-gaap:Assets" contextRef="c1">1<ix:exclude>x</ix:exclude>00</ix:nonFraction></body></html>"#,
        )
        .unwrap();

        let element = doc
            .elements()
            .into_iter()
            .find(|e| e.attribute("contextref").is_some())
            .unwrap();
        assert_eq!(element.attribute("contextRef"), Some("c1"));
        assert_eq!(element.attribute("NAME"), Some("us-gaap:Assets"));
        assert!(element.has_local_name("nonfraction"));
        assert_eq!(element.text(), "100");
    }

    #[test]
    fn test_xml_tag_names_keep_prefix() {
        let content = r#"<xbrli:xbrl xmlns:xbrli="http://www.xbrl.org/2003/instance" xmlns:us-gaap="http://fasb.org/us-gaap/2023">
            <us-gaap:Assets contextRef="c1">5</us-gaap:Assets>
        </xbrli:xbrl>"#;
        let doc = XmlDocument::parse("instance.xml", content).unwrap();

        let names: Vec<String> = doc.elements().iter().map(|e| e.tag_name()).collect();
        assert_eq!(names, vec!["xbrli:xbrl", "us-gaap:Assets"]);
        assert_eq!(doc.elements()[1].attribute("contextref"), Some("c1"));
        assert_eq!(doc.elements()[0].children().len(), 1);
    }

    #[test]
    fn test_malformed_xml_names_document() {
        let err = XmlDocument::parse("broken.xml", "<xbrl><unclosed></xbrl>")
            .err()
            .unwrap();
        match err {
            FactsError::DocumentParse { document, .. } => assert_eq!(document, "broken.xml"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_empty_html_is_fatal() {
        assert!(HtmlDocument::parse("empty.htm", "   ").is_err());
    }
}
