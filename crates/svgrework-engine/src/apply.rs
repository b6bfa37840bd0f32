//! Writing compiled style rules onto document elements.

use crate::selector::query_selector_all;
use svgrework_core::SvgReworkResult;
use svgrework_cssparser::StyleRuleAst;
use svgrework_dom::Document;
use tracing::trace;

/// Apply `rules` to `doc` as attribute writes.
///
/// Rules, their selectors and their declarations are processed in source
/// order and each write overwrites the previous value, so the last write to an
/// element attribute wins. Returns the number of attribute writes.
pub fn apply_style_rules(doc: &mut Document, rules: &[StyleRuleAst]) -> SvgReworkResult<usize> {
    let root = doc.root_element();
    let mut writes = 0;

    for rule in rules {
        for selector in &rule.selectors {
            let targets = query_selector_all(doc, root, selector);
            trace!(selector = %selector, targets = targets.len(), "applying rule");

            for target in targets {
                for decl in &rule.declarations {
                    doc.set_attribute(target, &decl.property, decl.value.as_str())?;
                    writes += 1;
                }
            }
        }
    }

    Ok(writes)
}
