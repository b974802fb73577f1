//! Generated relation documentation.
//!
//! The registry groups what it knows about a relation into [`RelationDocs`]; turning that
//! into a page is up to a [`DocumentationRenderer`].

use http::Method;
use pulldown_cmark_escape::escape_html;

/// Everything registered for one relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDocs {
    /// Normalized relation (`ns:name`)
    pub relation: String,
    /// Namespace-provided text, present only when no verb carries its own description
    pub description: Option<String>,
    pub routes: Vec<RouteDocs>,
}

/// One path providing the relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDocs {
    pub href: String,
    pub verbs: Vec<VerbDocs>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerbDocs {
    pub verb: Method,
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Renders relation documentation for the documentation endpoint.
pub trait DocumentationRenderer: Send + Sync {
    fn render(&self, docs: &RelationDocs) -> String;

    /// Media type of the rendered output.
    fn content_type(&self) -> &'static str {
        "text/html; charset=utf-8"
    }
}

/// Minimal HTML page: a heading per path, a sub-heading and paragraph per described verb.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

impl DocumentationRenderer for HtmlRenderer {
    fn render(&self, docs: &RelationDocs) -> String {
        let mut out = String::new();
        for route in &docs.routes {
            element(&mut out, "h1", &route.href);
            for verb in &route.verbs {
                if let Some(description) = &verb.description {
                    element(&mut out, "h2", verb.verb.as_str());
                    element(&mut out, "p", description);
                }
            }
        }
        if let Some(description) = &docs.description {
            element(&mut out, "p", description);
        }
        out
    }
}

fn element(out: &mut String, tag: &str, text: &str) {
    out.push('<');
    out.push_str(tag);
    out.push('>');
    escape_html(&mut *out, text).unwrap_or_default();
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}
