use crate::error::RemapError;
use crate::mapping::CompiledMappings;
use crate::matcher::{match_source, MatchAssociation};
use crate::options::{RemapOptions, SourceSpec};
use crate::output;
use rayon::prelude::*;

pub mod remap_css {
    use super::*;

    /// Run the whole pipeline: compile the mappings, match every source, render.
    ///
    /// Sources are matched in parallel and merged in input order, so
    /// first-seen ordering follows the order of `sources`.
    pub fn generate(
        sources: &[SourceSpec],
        mappings: &[(String, String)],
        opts: &RemapOptions,
    ) -> Result<String, RemapError> {
        let compiled = CompiledMappings::compile(mappings, opts.limit_special);
        log::info!(
            "compiled {} mapping entries, matching {} sources",
            compiled.len(),
            sources.len()
        );

        let per_source: Vec<Result<MatchAssociation, RemapError>> = sources
            .par_iter()
            .map(|source| match_source(source, &compiled, opts))
            .collect();

        let mut merged = MatchAssociation::new();
        for association in per_source {
            merged.merge(association?);
        }

        Ok(output::render(&merged, &compiled, opts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn table(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(from, to)| (from.to_string(), to.to_string()))
            .collect()
    }

    #[test]
    fn test_generate_end_to_end() {
        let css = r#"
            .red { color: red; }
            #blue { color: blue; }
            p { color: #f00 !important; }
            .red > #blue { font-size: 20px; }
        "#;
        let out = remap_css::generate(
            &[SourceSpec::new(css)],
            &table(&[("color: red", "color: green")]),
            &RemapOptions::default(),
        )
        .unwrap();
        assert_eq!(out, ".red {\n  color: green;\n}\np {\n  color: green !important;\n}");
    }

    #[test]
    fn test_sources_are_merged() {
        let sources = [
            SourceSpec::new("b { color: red }"),
            SourceSpec::new("a { color: red }").with_prefix(".x"),
        ];
        let out = remap_css::generate(
            &sources,
            &table(&[("color: red", "color: blue")]),
            &RemapOptions::default(),
        )
        .unwrap();
        assert_eq!(out, ".x a, b {\n  color: blue;\n}");
    }
}
