use anyhow::{Context, Result};
use colored::*;
use sniffer_core::baud::estimate_from_edges;
use sniffer_core::BaudEstimate;
use std::fs;
use std::io::Write;
use tracing::info;

/// Arguments of `serialsniffer baud`
#[derive(clap::Args, Debug, Clone)]
pub struct BaudArgs {
    /// File with one signal edge timestamp (microseconds) per line
    pub input: String,
}

/// Parse edge timestamps, skipping blank lines and `#` comments
pub fn parse_edges(text: &str) -> Result<Vec<u64>> {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(n, line)| {
            line.parse::<u64>()
                .with_context(|| format!("Invalid edge timestamp on line {}: '{}'", n, line))
        })
        .collect()
}

pub fn execute(args: &BaudArgs, out: &mut dyn Write) -> Result<()> {
    info!("Reading edge timestamps: {}", args.input);

    let text = fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read input file: {}", args.input))?;
    let edges = parse_edges(&text)?;
    let estimate = estimate_from_edges(&edges);

    writeln!(out, "\n=== Baud Detection ===")?;
    writeln!(out, "Edges:             {}", edges.len())?;

    let marker = match estimate {
        BaudEstimate::Standard(_) => "✓".green(),
        BaudEstimate::NonStandard(_) => "?".yellow(),
        BaudEstimate::Unknown => "✗".red(),
    };
    writeln!(out, "Baud rate:         {} {}", estimate, marker)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_edges() {
        let edges = parse_edges("# probe capture\n100\n\n 204 \n# gap\n308\n").unwrap();
        assert_eq!(edges, vec![100, 204, 308]);
    }

    #[test]
    fn test_parse_edges_rejects_garbage() {
        let err = parse_edges("100\nabc\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
