use std::io::{self, Write};

use quoteflow_core::RunSummary;

use crate::error::CliError;

pub fn render_summary(summary: &RunSummary, pretty: bool) -> Result<(), CliError> {
    let rendered = if pretty {
        serde_json::to_string_pretty(summary)?
    } else {
        serde_json::to_string(summary)?
    };

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{rendered}")?;
    stdout.flush()?;
    Ok(())
}
