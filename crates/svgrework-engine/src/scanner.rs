//! Directive scanning inside declaration values.
//!
//! A directive is `svgurl(<image>) svg(<style spec>)`, optionally preceded by
//! one whitespace character that is kept when the directive is replaced:
//!
//! ```text
//! background-image: svgurl('icons/star.svg') svg(path fill red), url(bg.png);
//!                   ^------------------------------------------^
//! ```

use std::ops::Range;

const URL_FUNCTION: &str = "svgurl(";
const STYLE_FUNCTION: &str = "svg(";

/// One directive found in a declaration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive<'a> {
    /// Byte range of the whole occurrence, leading whitespace included.
    pub range: Range<usize>,
    /// Zero or one whitespace character before `svgurl(`.
    pub leading_whitespace: &'a str,
    /// Raw `svgurl(...)` argument: a path, possibly quoted, or `url(data:...)`.
    pub url: &'a str,
    /// Trimmed `svg(...)` argument; empty when the directive carries no styling.
    pub style: &'a str,
}

/// Find the first directive in `value`.
pub fn find_directive(value: &str) -> Option<Directive<'_>> {
    let mut search = 0;
    while let Some(offset) = value[search..].find(URL_FUNCTION) {
        let start = search + offset;
        if let Some(directive) = match_at(value, start) {
            return Some(directive);
        }
        search = start + URL_FUNCTION.len();
    }
    None
}

/// Try to match a directive whose `svgurl(` starts at `start`.
///
/// The image argument ends at the first `)` that is followed by whitespace and
/// `svg(`, which lets `url(data:...)` payloads nest one level of parentheses.
/// Neither argument may span a line break.
fn match_at(value: &str, start: usize) -> Option<Directive<'_>> {
    let url_start = start + URL_FUNCTION.len();

    for (relative, _) in value[url_start..].match_indices(')') {
        let url_end = url_start + relative;
        let url = &value[url_start..url_end];
        if url.contains('\n') {
            return None;
        }

        let rest = &value[url_end + 1..];
        let after_gap = rest.trim_start();
        let gap = rest.len() - after_gap.len();
        if gap == 0 || !after_gap.starts_with(STYLE_FUNCTION) {
            continue;
        }

        let style_start = url_end + 1 + gap + STYLE_FUNCTION.len();
        let style_end = style_start + value[style_start..].find(')')?;
        let style = &value[style_start..style_end];
        if style.contains('\n') {
            continue;
        }

        let lead_start = value[..start]
            .chars()
            .next_back()
            .filter(|c| c.is_whitespace())
            .map_or(start, |c| start - c.len_utf8());

        return Some(Directive {
            range: lead_start..style_end + 1,
            leading_whitespace: &value[lead_start..start],
            url,
            style: style.trim(),
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finds_directive_with_style() {
        let value = "svgurl('icons/star.svg') svg(path fill red, $a stroke blue)";
        let d = find_directive(value).unwrap();
        assert_eq!(d.range, 0..value.len());
        assert_eq!(d.leading_whitespace, "");
        assert_eq!(d.url, "'icons/star.svg'");
        assert_eq!(d.style, "path fill red, $a stroke blue");
    }

    #[test]
    fn test_empty_style_argument() {
        let d = find_directive("svgurl(a.svg) svg( )").unwrap();
        assert_eq!(d.url, "a.svg");
        assert_eq!(d.style, "");

        let d = find_directive("svgurl(a.svg)   svg()").unwrap();
        assert_eq!(d.style, "");
    }

    #[test]
    fn test_leading_whitespace_is_one_character() {
        let value = "url(bg.png),  svgurl(a.svg) svg(rect fill red)";
        let d = find_directive(value).unwrap();
        assert_eq!(d.leading_whitespace, " ");
        assert_eq!(&value[d.range.clone()], " svgurl(a.svg) svg(rect fill red)");
    }

    #[test]
    fn test_inline_data_uri_argument() {
        let value = "svgurl(url('data:image/svg+xml;base64,PHN2Zy8+')) svg(svg fill red)";
        let d = find_directive(value).unwrap();
        assert_eq!(d.url, "url('data:image/svg+xml;base64,PHN2Zy8+')");
        assert_eq!(d.style, "svg fill red");
    }

    #[test]
    fn test_requires_whitespace_before_style_call() {
        assert!(find_directive("svgurl(a.svg)svg(rect fill red)").is_none());
        assert!(find_directive("svgurl(a.svg) url(b.png)").is_none());
        assert!(find_directive("svgurl(a.svg) svg(rect fill red").is_none());
        assert!(find_directive("url(a.svg)").is_none());
    }

    #[test]
    fn test_arguments_do_not_span_lines() {
        assert!(find_directive("svgurl(a\n.svg) svg(rect fill red)").is_none());
        assert!(find_directive("svgurl(a.svg) svg(rect\nfill red)").is_none());
    }

    #[test]
    fn test_image_argument_extends_to_first_usable_paren() {
        let value = "svgurl(broken, svgurl(b.svg) svg()";
        let d = find_directive(value).unwrap();
        assert_eq!(d.range.start, 0);
        assert_eq!(d.url, "broken, svgurl(b.svg");
    }
}
