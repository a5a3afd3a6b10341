//! CLI entry point for `omop-sql-lint`.

use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use omop_sql_lint::output::formatter::{self, DEFAULT_REPORT_PATH};
use omop_sql_lint::output::report::{QueryReport, Report, ValidationSummary};
use omop_sql_lint::parser::split::{compact_sql, split_statements};
use omop_sql_lint::validator::{self, RuleSelection, ValidationError, ValidationOutcome};
use omop_sql_lint::{default_registry, RuleRegistry};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "omop-sql-lint",
    about = "Validate SQL queries against OMOP CDM conventions and write a JSON report"
)]
struct Cli {
    /// SQL file to validate; reads stdin when omitted
    sql_file: Option<PathBuf>,

    /// SQL dialect used for parsing
    #[arg(long, env = "OMOP_SQL_LINT_DIALECT", default_value = "postgres")]
    dialect: String,

    /// Only run these rule ids
    #[arg(long, num_args = 1.., conflicts_with = "categories")]
    rules: Vec<String>,

    /// Only run rules in these categories
    #[arg(long, num_args = 1..)]
    categories: Vec<String>,

    /// Validate the whole input as one unit instead of query by query
    #[arg(long)]
    combined: bool,

    /// Path of the JSON report
    #[arg(short, long, default_value = DEFAULT_REPORT_PATH)]
    output: PathBuf,

    /// Print the registered rules and exit
    #[arg(long)]
    list_rules: bool,

    /// Print debug diagnostics to stderr
    #[arg(long)]
    verbose: bool,
}

impl Cli {
    fn selection(&self) -> RuleSelection {
        if !self.rules.is_empty() {
            RuleSelection::Rules(self.rules.clone())
        } else if !self.categories.is_empty() {
            RuleSelection::Categories(self.categories.clone())
        } else {
            RuleSelection::All
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_sql(path: Option<&Path>) -> Result<String, String> {
    if let Some(path) = path {
        return std::fs::read_to_string(path)
            .map_err(|e| format!("Error reading {}: {e}", path.display()));
    }
    let mut stdin = std::io::stdin();
    if stdin.is_terminal() {
        return Err("Provide a SQL file path or pipe SQL via stdin.".to_string());
    }
    let mut sql = String::new();
    stdin
        .read_to_string(&mut sql)
        .map_err(|e| format!("Error reading stdin: {e}"))?;
    Ok(sql)
}

fn validate_query(
    registry: &RuleRegistry,
    sql: &str,
    dialect: &str,
    selection: &RuleSelection,
    query_index: Option<usize>,
) -> Result<QueryReport, ValidationError> {
    let violations = validator::validate(registry, sql, dialect, selection)?;
    if let Err(e) = validator::parse_outcome(sql, dialect) {
        tracing::warn!(query = query_index.unwrap_or(1), error = %e, "query not validated");
    }
    Ok(QueryReport::new(
        sql,
        dialect,
        query_index,
        ValidationOutcome::new(violations),
    ))
}

fn build_report(
    registry: &RuleRegistry,
    sql: &str,
    dialect: &str,
    selection: &RuleSelection,
    combined: bool,
) -> Result<Report, ValidationError> {
    // Comment-only fragments are not queries.
    let queries: Vec<String> = split_statements(sql)
        .into_iter()
        .filter(|q| !compact_sql(q).trim_end_matches(';').trim().is_empty())
        .collect();
    tracing::debug!(queries = queries.len(), combined, "input split");

    if combined || queries.len() <= 1 {
        return validate_query(registry, sql, dialect, selection, None).map(Report::Single);
    }
    let results = queries
        .iter()
        .enumerate()
        .map(|(i, query)| validate_query(registry, query, dialect, selection, Some(i + 1)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Report::Multi(ValidationSummary::new(results)))
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let registry = match default_registry() {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("Error building rule registry: {e}");
            process::exit(2);
        }
    };

    if cli.list_rules {
        for meta in registry.list_rules() {
            println!("{:<50} {:<8} {}", meta.id, meta.severity, meta.name);
        }
        return;
    }

    let sql = match read_sql(cli.sql_file.as_deref()) {
        Ok(sql) => sql,
        Err(e) => {
            eprintln!("{e}");
            process::exit(2);
        }
    };

    let report = match build_report(&registry, &sql, &cli.dialect, &cli.selection(), cli.combined)
    {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(2);
        }
    };

    if let Err(e) = formatter::write_report(&cli.output, &report) {
        eprintln!("Error writing report: {e}");
        process::exit(2);
    }

    println!("{report}");
    let saved = std::path::absolute(&cli.output).unwrap_or_else(|_| cli.output.clone());
    println!("  Report saved to: {}", saved.display());

    if !report.is_valid() {
        process::exit(1);
    }
}
