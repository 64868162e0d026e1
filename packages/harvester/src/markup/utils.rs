//! Utility functions for reading data out of parsed HTML elements.

use scraper::ElementRef;

use crate::normalize::collapse_whitespace;

/// Get the lowercase local tag name of an element.
///
/// # Examples
/// ```
/// use scraper::{Html, Selector};
/// use tafseer_harvester::markup::tag_name;
///
/// let html = Html::parse_fragment("<SPAN>x</SPAN>");
/// let span = html.select(&Selector::parse("span").unwrap()).next().unwrap();
/// assert_eq!(tag_name(span), "span");
/// ```
pub fn tag_name<'a>(element: ElementRef<'a>) -> &'a str {
    element.value().name()
}

/// Check if an element carries a class.
///
/// # Examples
/// ```
/// use scraper::{Html, Selector};
/// use tafseer_harvester::markup::has_class;
///
/// let html = Html::parse_fragment(r#"<span class="tip small">x</span>"#);
/// let span = html.select(&Selector::parse("span").unwrap()).next().unwrap();
/// assert!(has_class(span, "tip"));
/// assert!(!has_class(span, "title-1"));
/// ```
pub fn has_class(element: ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}

/// Check if an element carries any of the given classes.
pub fn has_any_class(element: ElementRef<'_>, classes: &[String]) -> bool {
    classes.iter().any(|wanted| has_class(element, wanted))
}

/// Get an attribute value from an element.
pub fn get_attribute<'a>(element: ElementRef<'a>, name: &str) -> Option<&'a str> {
    element.value().attr(name)
}

/// Get all text below an element with whitespace collapsed.
///
/// Text nodes are concatenated as they are, so inline markup inside a word
/// does not split it.
///
/// # Examples
/// ```
/// use scraper::{Html, Selector};
/// use tafseer_harvester::markup::get_text;
///
/// let html = Html::parse_fragment("<h5>  تفسير <b>الآيات</b>\n </h5>");
/// let h5 = html.select(&Selector::parse("h5").unwrap()).next().unwrap();
/// assert_eq!(get_text(h5), "تفسير الآيات");
/// ```
pub fn get_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}
