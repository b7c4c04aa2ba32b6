use anyhow::{Context, Result};
use clap::Parser;
use std::io::{Read, Write};
use std::path::PathBuf;

use domex::config::{FiltersConfig, OutputFormat, RuntimeConfig};
use domex::dsl::{FilterNode, parse_filter_with};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Filter expression (read from stdin when omitted and no --filters is given)
    pub expr: Option<String>,

    /// Named filters file (YAML, TOML or JSON)
    #[arg(short, long)]
    pub filters: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Canonical)]
    pub format: OutputFormat,

    /// Push `!` down into operands before rendering
    #[arg(long)]
    pub distribute_not: bool,

    /// Log every token the parser consumes
    #[arg(long, env = "DOMEX_TRACE_TOKENS")]
    pub trace_tokens: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// One expression to process, named when it comes from a filters file.
pub struct Job {
    pub name: Option<String>,
    pub source: String,
}

pub fn collect_jobs(cli: &Cli, file: Option<&FiltersConfig>) -> Result<Vec<Job>> {
    let mut jobs: Vec<Job> = file
        .map(|config| {
            config
                .filters
                .iter()
                .map(|(name, source)| Job {
                    name: Some(name.clone()),
                    source: source.clone(),
                })
                .collect()
        })
        .unwrap_or_default();

    if let Some(expr) = &cli.expr {
        jobs.push(Job {
            name: None,
            source: expr.clone(),
        });
    } else if file.is_none() {
        let mut source = String::new();
        std::io::stdin()
            .read_to_string(&mut source)
            .context("CLI: Failed to read filter from stdin")?;
        jobs.push(Job { name: None, source });
    }

    if jobs.is_empty() {
        anyhow::bail!("CLI: No filters to process");
    }
    Ok(jobs)
}

pub fn process_job(job: &Job, runtime: &RuntimeConfig) -> Result<FilterNode> {
    let label = job.name.as_deref().unwrap_or("<expr>");
    let node = parse_filter_with(job.source.trim(), runtime.parser)
        .with_context(|| format!("Parser: Failed to parse filter {}", label))?;
    tracing::info!("Parsed {}: {} top-level item(s)", label, node.count());

    if runtime.distribute_not {
        Ok(node.distribute_not())
    } else {
        Ok(node)
    }
}

pub fn write_node<W: Write>(
    out: &mut W,
    name: Option<&str>,
    node: &FilterNode,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Canonical => match name {
            Some(name) => writeln!(out, "{}: {}", name, node)?,
            None => writeln!(out, "{}", node)?,
        },
        OutputFormat::Tree => {
            if let Some(name) = name {
                writeln!(out, "# {}", name)?;
            }
            write!(out, "{}", node.pretty())?;
        }
        OutputFormat::Json => {
            let line = serde_json::json!({ "name": name, "domain": node });
            writeln!(out, "{}", line)?;
        }
    }
    Ok(())
}

pub fn run(cli: &Cli) -> Result<()> {
    let file = cli
        .filters
        .as_deref()
        .map(FiltersConfig::load)
        .transpose()
        .context("Config: Failed to load filters file")?;

    let runtime = RuntimeConfig::merge(
        file.as_ref(),
        cli.format,
        cli.distribute_not,
        cli.trace_tokens,
    );
    let jobs = collect_jobs(cli, file.as_ref())?;
    tracing::info!(
        "Processing {} filter(s) as {}",
        jobs.len(),
        runtime.format.label()
    );

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for job in &jobs {
        let node = process_job(job, &runtime)?;
        write_node(&mut out, job.name.as_deref(), &node, runtime.format)
            .context("CLI: Failed to write output")?;
    }
    out.flush().context("CLI: Failed to flush output")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use domex::dsl::parse_filter;

    fn render(node: &FilterNode, name: Option<&str>, format: OutputFormat) -> String {
        let mut buf = Vec::new();
        write_node(&mut buf, name, node, format).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn canonical_output_is_one_line() {
        let node = parse_filter("a = 1 and b = 2").unwrap();
        assert_eq!(render(&node, None, OutputFormat::Canonical), "[&,(a,=,1),(b,=,2)]\n");
        assert_eq!(
            render(&node, Some("both"), OutputFormat::Canonical),
            "both: [&,(a,=,1),(b,=,2)]\n"
        );
    }

    #[test]
    fn json_output_nests_arrays() {
        let node = parse_filter("[('state', 'in', ['open', 'draft'])]").unwrap();
        let line = render(&node, Some("open"), OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(value["name"], "open");
        assert_eq!(value["domain"], serde_json::json!(["state", "in", ["open", "draft"]]));
    }

    #[test]
    fn process_job_applies_not_distribution() {
        let job = Job {
            name: None,
            source: "['!', ('a', '=', 1)]\n".into(),
        };
        let runtime = RuntimeConfig {
            distribute_not: true,
            ..Default::default()
        };
        assert_eq!(process_job(&job, &runtime).unwrap().render(), "[(a,!=,1)]");
    }

    #[test]
    fn process_job_reports_lex_errors() {
        let job = Job {
            name: Some("broken".into()),
            source: "a = 'oops".into(),
        };
        let err = process_job(&job, &RuntimeConfig::default()).unwrap_err();
        assert!(format!("{:#}", err).contains("broken"));
    }
}
