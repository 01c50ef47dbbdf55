//! Ranked column table

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;

use crate::pipeline::{Analysis, ColumnKind, ColumnSummary};

/// Display the top-ranked columns as a table, best regression score first.
pub fn display_ranking(analysis: &Analysis, top: usize) {
    println!();
    println!(
        "    {} {}",
        style("📋").cyan(),
        style("COLUMN RANKING").white().bold()
    );
    println!("    {}", style("─".repeat(50)).dim());
    println!();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Column").add_attribute(Attribute::Bold),
        Cell::new("Kind").add_attribute(Attribute::Bold),
        Cell::new("Risk group").add_attribute(Attribute::Bold),
        Cell::new("Risk ×").add_attribute(Attribute::Bold),
        Cell::new("Odds ratio").add_attribute(Attribute::Bold),
        Cell::new("Rel. risk").add_attribute(Attribute::Bold),
        Cell::new("Corr.").add_attribute(Attribute::Bold),
        Cell::new("Influence").add_attribute(Attribute::Bold),
        Cell::new("Signif.").add_attribute(Attribute::Bold),
    ]);

    let target = analysis.config.target.column();
    for summary in analysis.summaries.iter().filter(|s| s.name != target).take(top) {
        table.add_row(summary_row(summary));
    }

    for line in table.to_string().lines() {
        println!("    {}", line);
    }
}

fn summary_row(summary: &ColumnSummary) -> Vec<Cell> {
    let kind = match summary.kind {
        ColumnKind::Categorical => "cat",
        ColumnKind::Continuous => "cont",
    };
    let influence = summary.significance.scores.regression;
    let influence_color = if influence > 0.0 {
        Color::Green
    } else {
        Color::White
    };
    let significant = summary.significance.significant_buckets.len();

    vec![
        Cell::new(&summary.name).add_attribute(Attribute::Bold),
        Cell::new(kind),
        Cell::new(truncate(&summary.risk.label, 28)),
        Cell::new(format_metric(summary.risk.risk_multiplier, 1)),
        Cell::new(format_metric(summary.risk.odds_ratio, 2)),
        Cell::new(format_metric(summary.risk.relative_risk, 2)),
        Cell::new(format!("{:.2}", summary.correlation_with_target)),
        Cell::new(format!("{:.2}", influence)).fg(influence_color),
        Cell::new(significant).fg(if significant > 0 {
            Color::Yellow
        } else {
            Color::White
        }),
    ]
}

/// Display the columns similar to the named one, if any.
pub fn display_similar_columns(analysis: &Analysis, name: &str) {
    let similar = analysis.similar_columns(name);
    if similar.is_empty() {
        return;
    }

    println!();
    println!(
        "      {} {}:",
        style("Correlates with").yellow(),
        style(name).bold()
    );
    for entry in similar {
        println!(
            "        {} {} {}",
            style("•").dim(),
            entry.summary.name,
            style(format!("({:.2})", entry.similarity)).dim()
        );
    }
}

/// Format a nullable metric; degenerate values print as a dash.
fn format_metric(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", decimals, v),
        None => "–".to_string(),
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let prefix: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{}…", prefix)
    }
}
