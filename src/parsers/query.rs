//! Small element-query layer over `scraper`.
//!
//! Every lookup returns `Option` so a missing element skips one row instead of
//! failing the page.

use scraper::{ElementRef, Selector};
use url::Url;

/// Compiles a literal selector. Only call with selectors written in this crate.
pub fn compile(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid selector `{}`: {:?}", css, e))
}

pub fn first<'a>(scope: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    scope.select(selector).next()
}

/// Visible text of an element with whitespace collapsed.
pub fn text(el: ElementRef<'_>) -> String {
    normalize_ws(&el.text().collect::<Vec<_>>().join(" "))
}

pub fn non_empty_text(el: ElementRef<'_>) -> Option<String> {
    Some(text(el)).filter(|t| !t.is_empty())
}

pub fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    first(scope, selector).and_then(non_empty_text)
}

pub fn attr(el: ElementRef<'_>, name: &str) -> Option<String> {
    el.value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub fn first_attr(scope: ElementRef<'_>, selector: &Selector, name: &str) -> Option<String> {
    first(scope, selector).and_then(|el| attr(el, name))
}

/// True when the element has a descendant element with the given tag name.
pub fn has_descendant_tag(el: ElementRef<'_>, tag: &str) -> bool {
    el.descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .any(|d| d.value().name() == tag)
}

pub fn has_class(el: ElementRef<'_>, class: &str) -> bool {
    el.value().classes().any(|c| c == class)
}

/// Resolves `href` against a source origin. Absolute links pass through.
pub fn resolve_link(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    base.join(href).ok().map(|u| u.to_string())
}

pub fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
