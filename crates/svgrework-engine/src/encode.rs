//! Image loading, restyling and data URI encoding.

use crate::apply::apply_style_rules;
use crate::stylespec::compile_style_spec;
use base64::Engine;
use std::path::PathBuf;
use svgrework_core::{SvgReworkError, SvgReworkResult, TransformConfig};
use svgrework_dom::Document;
use tracing::{debug, debug_span};

/// Prefix of every data URI produced by the transform.
pub const SVG_DATA_URI_PREFIX: &str = "data:image/svg+xml;base64,";

/// Where a directive's image comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource<'a> {
    /// Base64 payload of an already-inlined SVG data URI.
    Inline(&'a str),
    /// File on disk, already resolved against the base path.
    File(PathBuf),
}

impl<'a> ImageSource<'a> {
    /// Classify a raw `svgurl(...)` argument.
    ///
    /// `url(data:image/svg+xml;base64,...)` (quoted or not) and a bare SVG data
    /// URI are inline payloads. Anything else, including `url(path)`, is a file
    /// reference with one pair of surrounding quotes removed.
    pub fn from_argument(argument: &'a str, config: &TransformConfig) -> Self {
        let argument = argument.trim();
        let inner = argument
            .strip_prefix("url(")
            .and_then(|rest| rest.strip_suffix(')'))
            .map_or(argument, str::trim);
        let inner = strip_quotes(inner);

        match inner.strip_prefix(SVG_DATA_URI_PREFIX) {
            Some(payload) => ImageSource::Inline(payload.trim()),
            None => ImageSource::File(config.resolve_path(inner)),
        }
    }

    /// Read the SVG markup.
    pub fn load(&self) -> SvgReworkResult<String> {
        match self {
            ImageSource::Inline(payload) => {
                let bytes = base64::engine::general_purpose::STANDARD.decode(payload)?;
                Ok(String::from_utf8(bytes)?)
            }
            ImageSource::File(path) => {
                std::fs::read_to_string(path).map_err(|e| SvgReworkError::io(path, e))
            }
        }
    }
}

/// Encode SVG markup as a base64 data URI.
pub fn encode_data_uri(markup: &str) -> String {
    let payload = base64::engine::general_purpose::STANDARD.encode(markup.as_bytes());
    format!("{SVG_DATA_URI_PREFIX}{payload}")
}

/// Restyle SVG markup with mini-language `style` and return the new markup.
pub fn restyle_markup(markup: &str, style: &str) -> SvgReworkResult<String> {
    let rules = compile_style_spec(style)?;
    let mut doc = Document::parse_xml(markup)?;
    let writes = apply_style_rules(&mut doc, &rules)?;
    debug!(rules = rules.len(), writes, "styles applied");
    Ok(doc.serialize()?)
}

/// Render one directive (`svgurl(url) svg(style)`) to its data URI.
pub fn render_directive(url: &str, style: &str, config: &TransformConfig) -> SvgReworkResult<String> {
    let _span = debug_span!("directive", url).entered();

    let source = ImageSource::from_argument(url, config);
    debug!(?source, "loading image");
    let markup = source.load()?;
    let styled = restyle_markup(&markup, style)?;
    Ok(encode_data_uri(&styled))
}

fn strip_quotes(value: &str) -> &str {
    let value = value.strip_prefix(['"', '\'']).unwrap_or(value);
    value.strip_suffix(['"', '\'']).unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn decode(uri: &str) -> String {
        let payload = uri.strip_prefix(SVG_DATA_URI_PREFIX).unwrap();
        let bytes = base64::engine::general_purpose::STANDARD.decode(payload).unwrap();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_classify_arguments() {
        let config = TransformConfig::new();
        assert_eq!(
            ImageSource::from_argument("url('data:image/svg+xml;base64,PHN2Zy8+')", &config),
            ImageSource::Inline("PHN2Zy8+")
        );
        assert_eq!(
            ImageSource::from_argument("url(data:image/svg+xml;base64,PHN2Zy8+)", &config),
            ImageSource::Inline("PHN2Zy8+")
        );
        assert_eq!(
            ImageSource::from_argument("\"data:image/svg+xml;base64,PHN2Zy8+\"", &config),
            ImageSource::Inline("PHN2Zy8+")
        );
        assert_eq!(
            ImageSource::from_argument("'icons/a.svg'", &config),
            ImageSource::File(PathBuf::from("icons/a.svg"))
        );
        assert_eq!(
            ImageSource::from_argument("url(\"a.svg\")", &config.clone().with_base_path("img")),
            ImageSource::File(Path::new("img").join("a.svg"))
        );
    }

    #[test]
    fn test_inline_payload_round_trip() {
        let uri = encode_data_uri("<svg><rect/></svg>");
        let argument = format!("url('{uri}')");
        let markup = ImageSource::from_argument(&argument, &TransformConfig::new())
            .load()
            .unwrap();
        assert_eq!(markup, "<svg><rect/></svg>");
    }

    #[test]
    fn test_invalid_inline_payloads_are_errors() {
        let config = TransformConfig::new();
        let bad_base64 = ImageSource::from_argument("url(data:image/svg+xml;base64,@@@)", &config);
        assert!(matches!(bad_base64.load(), Err(SvgReworkError::Decode(_))));

        // 0xFF 0xFE is not UTF-8.
        let not_utf8 = ImageSource::from_argument("url(data:image/svg+xml;base64,//4=)", &config);
        assert!(matches!(not_utf8.load(), Err(SvgReworkError::Utf8(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let source = ImageSource::File(PathBuf::from("definitely/not/here.svg"));
        let err = source.load().unwrap_err();
        assert_eq!(err.category(), "io");
    }

    #[test]
    fn test_render_inline_directive() {
        let source = encode_data_uri(r#"<svg><g><rect id="foo"/></g></svg>"#);
        let uri = render_directive(
            &format!("url({source})"),
            "rect#foo fill red",
            &TransformConfig::new(),
        )
        .unwrap();
        assert_eq!(decode(&uri), r#"<svg><g><rect id="foo" fill="red"/></g></svg>"#);
    }

    #[test]
    fn test_empty_style_keeps_markup() {
        let markup = "<svg viewBox=\"0 0 1 1\">\n  <path d=\"M0 0\"/>\n</svg>";
        assert_eq!(restyle_markup(markup, "").unwrap(), markup);
    }

    #[test]
    fn test_restyles_deeply_nested_markup() {
        const DEPTH: usize = 20_000;
        let markup = format!("<svg>{}{}</svg>", "<g>".repeat(DEPTH), "</g>".repeat(DEPTH));

        let out = restyle_markup(&markup, "g fill red").unwrap();

        assert_eq!(out.matches(r#"<g fill="red">"#).count(), DEPTH);
        assert!(out.ends_with("</g></svg>"));
    }

    #[test]
    fn test_namespaced_property_is_written_as_prefix() {
        let out = restyle_markup("<svg><use/></svg>", "use xlink:href #a").unwrap();
        assert_eq!(out, r#"<svg><use xlink="href:#a"/></svg>"#);
    }

    #[test]
    fn test_malformed_markup_is_error() {
        let source = encode_data_uri("<svg><g></svg>");
        let err = render_directive(&format!("url({source})"), "", &TransformConfig::new())
            .unwrap_err();
        assert!(matches!(err, SvgReworkError::Dom(_)));
    }
}
