//! The inline styling mini-language carried by `svg(...)`.
//!
//! `rect fill red, circle$badge stroke #fff` is a comma-separated list of
//! `selector property value` fragments. `$` stands for `#` in selectors so an id
//! can be written without clashing with color values.
//!
//! Fragments are lowered to stylesheet text (`rect{fill:red} circle#badge{stroke:#fff} `)
//! and parsed with the regular stylesheet parser, so the applicator works on the
//! same rule shape a stylesheet produces.
//!
//! The lowered declaration is split at its first `:`, so a namespaced property
//! does not survive: `use xlink:href #a` writes `xlink="href:#a"`. Use the plain
//! `href` attribute of SVG 2 instead.

use svgrework_core::SvgReworkResult;
use svgrework_cssparser::{parse_stylesheet, RuleAst, StyleRuleAst};
use tracing::trace;

/// One `selector property value` fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleFragment {
    pub selector: String,
    pub property: String,
    pub value: String,
}

/// Split mini-language text into fragments.
///
/// Fragments with fewer than three tokens are dropped; tokens past the third
/// are ignored.
pub fn tokenize_style_spec(text: &str) -> Vec<StyleFragment> {
    text.split(',')
        .filter_map(|fragment| {
            let mut tokens = fragment.split_whitespace();
            match (tokens.next(), tokens.next(), tokens.next()) {
                (Some(selector), Some(property), Some(value)) => Some(StyleFragment {
                    selector: selector.replace('$', "#"),
                    property: property.to_string(),
                    value: value.to_string(),
                }),
                _ => {
                    if !fragment.trim().is_empty() {
                        trace!(fragment, "dropping style fragment with fewer than three tokens");
                    }
                    None
                }
            }
        })
        .collect()
}

/// Lower mini-language text to pseudo-stylesheet text.
pub fn lower_style_spec(text: &str) -> String {
    tokenize_style_spec(text)
        .iter()
        .map(|f| format!("{}{{{}:{}}} ", f.selector, f.property, f.value))
        .collect()
}

/// Compile mini-language text into style rules, in source order.
///
/// Empty text yields no rules.
pub fn compile_style_spec(text: &str) -> SvgReworkResult<Vec<StyleRuleAst>> {
    let lowered = lower_style_spec(text);
    if lowered.is_empty() {
        return Ok(Vec::new());
    }

    let sheet = parse_stylesheet(&lowered)?;
    Ok(sheet
        .rules
        .into_iter()
        .filter_map(|rule| match rule {
            RuleAst::Style(style) => Some(style),
            RuleAst::Container(_) | RuleAst::Statement(_) => None,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use svgrework_cssparser::DeclarationAst;

    #[test]
    fn test_two_fragments_with_id_shorthand() {
        let rules = compile_style_spec("rect fill red, $bar stroke blue").unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].selectors, vec!["rect"]);
        assert_eq!(rules[0].declarations, vec![DeclarationAst::new("fill", "red")]);
        assert_eq!(rules[1].selectors, vec!["#bar"]);
        assert_eq!(rules[1].declarations, vec![DeclarationAst::new("stroke", "blue")]);
    }

    #[test]
    fn test_short_fragment_is_dropped() {
        assert!(compile_style_spec("rect fill").unwrap().is_empty());

        let rules = compile_style_spec("rect fill, circle fill green").unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].selectors, vec!["circle"]);
    }

    #[test]
    fn test_extra_tokens_are_discarded() {
        let fragments = tokenize_style_spec("  g#a   opacity  0.5  ignored tokens ");
        assert_eq!(
            fragments,
            vec![StyleFragment {
                selector: "g#a".into(),
                property: "opacity".into(),
                value: "0.5".into(),
            }]
        );
    }

    #[test]
    fn test_every_dollar_is_rewritten() {
        let fragments = tokenize_style_spec("g$a$b fill red");
        assert_eq!(fragments[0].selector, "g#a#b");
    }

    #[test]
    fn test_lowering() {
        assert_eq!(
            lower_style_spec("rect fill red, $bar stroke blue"),
            "rect{fill:red} #bar{stroke:blue} "
        );
        assert_eq!(lower_style_spec(""), "");
    }

    #[test]
    fn test_empty_spec_is_no_op() {
        assert!(compile_style_spec("").unwrap().is_empty());
        assert!(compile_style_spec("  ,  ").unwrap().is_empty());
    }

    #[test]
    fn test_namespaced_property_splits_at_first_colon() {
        let rules = compile_style_spec("use xlink:href #a").unwrap();
        assert_eq!(rules[0].selectors, vec!["use"]);
        assert_eq!(rules[0].declarations, vec![DeclarationAst::new("xlink", "href:#a")]);
    }

    #[test]
    fn test_attribute_selector_survives_lowering() {
        let rules = compile_style_spec("path[data-part=tail] fill #f00").unwrap();
        assert_eq!(rules[0].selectors, vec!["path[data-part=tail]"]);
        assert_eq!(rules[0].declarations[0].value, "#f00");
    }
}
