//! # svgrework engine
//!
//! Rewrites `svgurl(<image>) svg(<style spec>)` directives in stylesheet
//! declarations into `url('data:image/svg+xml;base64,...')` references. The
//! referenced SVG is loaded from disk or from an inline data URI, restyled by
//! writing the style spec's declarations as attributes on matching elements,
//! then re-encoded.
//!
//! ```text
//! .star { background-image: svgurl('star.svg') svg(path fill gold, path$outline stroke #000); }
//! ```
//!
//! Processing is synchronous and holds no state between calls beyond the
//! [`TransformConfig`] owned by [`SvgRework`].

pub mod apply;
pub mod encode;
pub mod scanner;
pub mod selector;
pub mod stylespec;
pub mod transform;

pub use apply::apply_style_rules;
pub use encode::{encode_data_uri, render_directive, restyle_markup, ImageSource, SVG_DATA_URI_PREFIX};
pub use scanner::{find_directive, Directive};
pub use selector::{query_selector_all, SelectorLevel, SelectorPath};
pub use stylespec::{compile_style_spec, lower_style_spec, tokenize_style_spec, StyleFragment};
pub use svgrework_core::{SvgReworkError, SvgReworkResult, TransformConfig};
pub use transform::{rewrite_value, transform_declaration, transform_rules, transform_stylesheet};

use svgrework_cssparser::{parse_stylesheet, StylesheetAst};
use tracing::{debug, info_span};

/// Stylesheet transform bound to one configuration.
#[derive(Debug, Clone, Default)]
pub struct SvgRework {
    config: TransformConfig,
}

impl SvgRework {
    pub fn new(config: TransformConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TransformConfig {
        &self.config
    }

    /// Transform stylesheet text and return the rewritten stylesheet.
    ///
    /// Text without any directive is returned unchanged. Otherwise the
    /// stylesheet is parsed, rewritten and serialized again.
    pub fn process(&self, css: &str) -> SvgReworkResult<String> {
        let _span = info_span!("process", bytes = css.len()).entered();

        if find_directive(css).is_none() {
            debug!("no directives; stylesheet left as is");
            return Ok(css.to_string());
        }

        let mut sheet = parse_stylesheet(css)?;
        let replaced = self.transform(&mut sheet)?;
        debug!(rules = sheet.rule_count(), replaced, "stylesheet transformed");
        Ok(sheet.to_css())
    }

    /// Transform a parsed stylesheet in place. Returns the number of
    /// directives replaced.
    pub fn transform(&self, sheet: &mut StylesheetAst) -> SvgReworkResult<usize> {
        transform_stylesheet(sheet, &self.config)
    }
}
