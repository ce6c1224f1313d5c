//! Unparsing the rule tree into indented, wrapped CSS text.

use crate::options::RemapOptions;
use crate::output::assemble::RenderedRule;

const BEGIN_MARKER: &str = "/* begin cssremap rules */";
const END_MARKER: &str = "/* end cssremap rules */";

pub fn print(rules: &[RenderedRule], opts: &RemapOptions) -> String {
    if rules.is_empty() {
        return String::new();
    }

    let declaration_indent = " ".repeat(opts.indent_declaration);
    let mut lines: Vec<String> = Vec::new();
    if opts.comments {
        lines.push(BEGIN_MARKER.to_string());
    }

    for rule in rules {
        if !rule.origins.is_empty() {
            lines.push(provenance_comment(&rule.origins));
        }
        let mut selector_lines = wrap_selectors(&rule.selectors, opts.line_length);
        if let Some(last) = selector_lines.last_mut() {
            last.push_str(" {");
        }
        lines.extend(selector_lines);
        for decl in &rule.declarations {
            lines.push(format!("{}{};", declaration_indent, decl));
        }
        lines.push("}".to_string());
    }

    if opts.comments {
        lines.push(END_MARKER.to_string());
    }

    let indent = " ".repeat(opts.indent_css);
    lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| format!("{}{}", indent, line))
        .collect::<Vec<_>>()
        .join("\n")
}

fn provenance_comment(origins: &[String]) -> String {
    let names: Vec<String> = origins
        .iter()
        .map(|origin| format!("\"{}\"", origin.replace("*/", "* /")))
        .collect();
    format!("/* cssremap rule for {} */", names.join(", "))
}

/// Greedily pack `selectors` into lines of at most `max` characters.
///
/// A line breaks before the selector that would overflow it; a selector longer
/// than `max` gets a line of its own. Every line but the last ends with a comma.
pub fn wrap_selectors(selectors: &[String], max: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for selector in selectors {
        if current.is_empty() {
            current.push_str(selector);
            continue;
        }
        // ", " before the selector and the comma that would end this line
        let width = current.chars().count() + 2 + selector.chars().count() + 1;
        if width > max {
            current.push(',');
            lines.push(std::mem::take(&mut current));
            current.push_str(selector);
        } else {
            current.push_str(", ");
            current.push_str(selector);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
