use crate::dsl::ParserConfig;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Settings and named filters loaded from a filters file.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct FiltersConfig {
    #[serde(default)]
    pub parser: ParserConfig,
    #[serde(default)]
    pub distribute_not: bool,
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
}

impl FiltersConfig {
    /// Load a YAML, TOML or JSON file (by extension), with `DOMEX_*`
    /// environment overrides such as `DOMEX_PARSER__TRACE_TOKENS=true`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path))
            .add_source(
                ::config::Environment::with_prefix("DOMEX")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Canonical,
    Tree,
    Json,
}

impl OutputFormat {
    pub fn label(&self) -> &'static str {
        match self {
            OutputFormat::Canonical => "canonical",
            OutputFormat::Tree => "tree",
            OutputFormat::Json => "json",
        }
    }
}

/// Effective settings for one run, after CLI flags are applied.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default)]
pub struct RuntimeConfig {
    pub format: OutputFormat,
    pub distribute_not: bool,
    pub parser: ParserConfig,
}

impl RuntimeConfig {
    /// File settings, with any flag that is set on the command line winning.
    pub fn merge(
        file: Option<&FiltersConfig>,
        format: OutputFormat,
        distribute_not: bool,
        trace_tokens: bool,
    ) -> Self {
        let (file_not, file_parser) = file
            .map(|f| (f.distribute_not, f.parser))
            .unwrap_or_default();
        RuntimeConfig {
            format,
            distribute_not: distribute_not || file_not,
            parser: ParserConfig {
                trace_tokens: trace_tokens || file_parser.trace_tokens,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::with_suffix(suffix).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_yaml_filters() {
        let file = write_config(
            ".yaml",
            "parser:\n  trace_tokens: true\nfilters:\n  open: \"[('state', '=', 'open')]\"\n  mine: \"user_id = %s\"\n",
        );
        let config = FiltersConfig::load(file.path()).unwrap();
        assert!(config.parser.trace_tokens);
        assert!(!config.distribute_not);
        let names: Vec<&str> = config.filters.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["mine", "open"]);
        assert_eq!(config.filters["mine"], "user_id = %s");
    }

    #[test]
    fn missing_sections_default() {
        let file = write_config(".yaml", "distribute_not: true\n");
        let config = FiltersConfig::load(file.path()).unwrap();
        assert!(config.distribute_not);
        assert!(config.filters.is_empty());
        assert_eq!(config.parser, ParserConfig::default());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FiltersConfig::load(&dir.path().join("absent.yaml")).is_err());
    }

    #[test]
    fn output_format_values() {
        assert_eq!(OutputFormat::from_str("json", false), Ok(OutputFormat::Json));
        assert_eq!(OutputFormat::from_str("TREE", true), Ok(OutputFormat::Tree));
        assert!(OutputFormat::from_str("xml", false).is_err());
        for format in OutputFormat::value_variants() {
            let value = format.to_possible_value().unwrap();
            assert_eq!(value.get_name(), format.label());
        }
    }

    #[test]
    fn runtime_flags_override_file() {
        let file = FiltersConfig {
            distribute_not: true,
            ..Default::default()
        };
        let runtime = RuntimeConfig::merge(Some(&file), OutputFormat::Tree, false, true);
        assert!(runtime.distribute_not);
        assert!(runtime.parser.trace_tokens);
        assert_eq!(runtime.format, OutputFormat::Tree);

        let bare = RuntimeConfig::merge(None, OutputFormat::Canonical, false, false);
        assert!(!bare.distribute_not);
    }
}
