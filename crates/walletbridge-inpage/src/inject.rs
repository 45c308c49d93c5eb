//! Injection gating: only real HTML documents get a provider.

/// The bits of `document` / `location` the gate looks at.
#[derive(Debug, Clone, Default)]
pub struct DocumentInfo {
    /// `document.doctype?.name`
    pub doctype_name: Option<String>,
    /// `document.documentElement?.nodeName`
    pub document_element: Option<String>,
    /// `window.location.pathname`
    pub pathname: String,
}

impl DocumentInfo {
    pub fn html(pathname: &str) -> Self {
        Self {
            doctype_name: Some("html".into()),
            document_element: Some("HTML".into()),
            pathname: pathname.to_string(),
        }
    }
}

const BLOCKED_SUFFIXES: [&str; 2] = [".xml", ".pdf"];

pub fn should_inject(doc: &DocumentInfo) -> bool {
    doctype_ok(doc) && suffix_ok(doc) && document_element_ok(doc)
}

/// A missing doctype is fine; a non-HTML one is not.
fn doctype_ok(doc: &DocumentInfo) -> bool {
    doc.doctype_name.as_deref().map_or(true, |name| name == "html")
}

fn suffix_ok(doc: &DocumentInfo) -> bool {
    !BLOCKED_SUFFIXES.iter().any(|s| doc.pathname.ends_with(s))
}

/// Same rule as the doctype: absent passes, anything but `html` does not.
fn document_element_ok(doc: &DocumentInfo) -> bool {
    doc.document_element
        .as_deref()
        .map_or(true, |n| n.eq_ignore_ascii_case("html"))
}
