//! Text and JSON rendering of run results.

use std::fmt;

use crate::exec::exit_code;
use crate::orchestrator::EnumerationStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

pub fn render(
    status: &EnumerationStatus,
    format: OutputFormat,
) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(status),
        OutputFormat::Text => Ok(TextReport(status).to_string()),
    }
}

/// Human readable report, one block per container.
pub struct TextReport<'a>(pub &'a EnumerationStatus);

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = self.0;
        writeln!(f, "STDIN COMMAND: {}", status.stdin_summary)?;
        writeln!(f, "COMMAND: {}\n", QuotedArgs(&status.args))?;
        writeln!(f, "Namespace: {}", status.namespace)?;

        for execution in &status.statuses {
            writeln!(f, "CONTAINER: {}/{}", execution.pod, execution.container)?;
            writeln!(
                f,
                "Returned exit code: {} [{}]",
                execution.exit_code,
                exit_code::describe(execution.exit_code)
            )?;
            let error = execution.error();
            if !error.trim_matches('\n').is_empty() {
                writeln!(f, "Returned error: {error}")?;
            }
            write!(f, "Standard output:\n{}", execution.stdout())?;
            write!(f, "Standard error:\n{}", execution.stderr())?;
            writeln!(f)?;
        }
        Ok(())
    }
}

/// `["ls" "-la"]`
struct QuotedArgs<'a>(&'a [String]);

impl fmt::Display for QuotedArgs<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, arg) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{arg:?}")?;
        }
        write!(f, "]")
    }
}
