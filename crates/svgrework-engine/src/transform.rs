//! Stylesheet traversal and in-place declaration rewriting.

use crate::encode::render_directive;
use crate::scanner::find_directive;
use svgrework_core::{SvgReworkResult, TransformConfig};
use svgrework_cssparser::{DeclarationAst, RuleAst, StylesheetAst};
use tracing::{debug, warn};

/// Upper bound on rewrite passes over one declaration value.
pub const MAX_REWRITE_PASSES: usize = 64;

/// Replace every directive in `value` with its `url('data:...')` reference.
///
/// Each pass rewrites the first remaining directive, keeping its leading
/// whitespace, and the value is rescanned until no directive is left or
/// [`MAX_REWRITE_PASSES`] is reached. Returns `None` when the value holds no
/// directive.
pub fn rewrite_value(value: &str, config: &TransformConfig) -> SvgReworkResult<Option<String>> {
    let (rewritten, passes) = rewrite_directives(value, config)?;
    Ok((passes > 0).then_some(rewritten))
}

fn rewrite_directives(value: &str, config: &TransformConfig) -> SvgReworkResult<(String, usize)> {
    let mut current = value.to_string();
    let mut passes = 0;

    while let Some(directive) = find_directive(&current) {
        if passes == MAX_REWRITE_PASSES {
            warn!(
                passes,
                "directive still present after the maximum number of rewrite passes; leaving the rest"
            );
            break;
        }
        passes += 1;

        let uri = render_directive(directive.url, directive.style, config)?;
        let replacement = format!("{}url('{}')", directive.leading_whitespace, uri);
        let range = directive.range.clone();
        current.replace_range(range, &replacement);
    }

    Ok((current, passes))
}

/// Rewrite one declaration in place. Returns the number of directives replaced.
pub fn transform_declaration(
    decl: &mut DeclarationAst,
    config: &TransformConfig,
) -> SvgReworkResult<usize> {
    if !config.rewrites_property(&decl.property) {
        return Ok(0);
    }

    let (rewritten, replaced) = rewrite_directives(&decl.value, config)?;
    if replaced == 0 {
        return Ok(0);
    }
    debug!(property = %decl.property, replaced, "declaration rewritten");
    decl.value = rewritten;
    Ok(replaced)
}

/// Rewrite declarations in `rules`, descending into nested containers.
pub fn transform_rules(rules: &mut [RuleAst], config: &TransformConfig) -> SvgReworkResult<usize> {
    let mut replaced = 0;
    for rule in rules {
        match rule {
            RuleAst::Style(style) => {
                for decl in &mut style.declarations {
                    replaced += transform_declaration(decl, config)?;
                }
            }
            RuleAst::Container(container) => {
                replaced += transform_rules(&mut container.rules, config)?;
            }
            RuleAst::Statement(_) => {}
        }
    }
    Ok(replaced)
}

/// Rewrite every declaration of a parsed stylesheet.
pub fn transform_stylesheet(
    sheet: &mut StylesheetAst,
    config: &TransformConfig,
) -> SvgReworkResult<usize> {
    transform_rules(&mut sheet.rules, config)
}
