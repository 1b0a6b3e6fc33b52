//! Cross-testplan summary page

use crate::error::{RenderError, Result};
use crate::format::{escape_html, Markup, OutputFormat};
use crate::renderer::Renderer;
use crate::results::html_document;
use crate::table::{Align, Table};
use std::fmt::Write;
use testplanner_reconcile::{StageProgress, SummaryRow, TOTAL_ROW_LABEL};

/// One testplan's line in the summary and where its results page lives
#[derive(Debug, Clone)]
pub struct SummaryEntry {
    pub row: SummaryRow,
    pub link: Option<String>,
}

impl Renderer {
    /// Summary of several testplans with their combined stage progress
    pub fn summary_page(
        &self,
        title: &str,
        entries: &[SummaryEntry],
        stages: &StageProgress,
    ) -> Result<String> {
        let markup = match self.config.format {
            OutputFormat::Csv => {
                return Err(RenderError::UnsupportedFormat(OutputFormat::Csv, "summary page"))
            }
            format => format.markup(),
        };

        let testplans = testplan_cells(entries, markup);
        let progress = stage_cells(stages, markup);

        let mut content = String::new();
        if markup == Markup::Html {
            writeln!(content, "<h1>{}</h1>", escape_html(title))?;
            writeln!(content, "<h2>Testplans</h2>")?;
            content.push_str(&testplans.to_html());
            if !stages.is_empty() {
                writeln!(content, "<h2>Stage Progress</h2>")?;
                content.push_str(&progress.to_html());
            }
            return Ok(html_document(title, &content));
        }

        writeln!(content, "# {}\n", title)?;
        writeln!(content, "## Testplans\n")?;
        writeln!(content, "{}", testplans.to_markdown())?;
        if !stages.is_empty() {
            writeln!(content, "## Stage Progress\n")?;
            writeln!(content, "{}", progress.to_markdown())?;
        }
        Ok(content)
    }
}

fn testplan_cells(entries: &[SummaryEntry], markup: Markup) -> Table {
    let mut table = Table::new([
        "Name",
        "Passing",
        "Written",
        "Total",
        "Implemented",
        "Pass Rate",
    ])
    .align(0, Align::Left);

    for entry in entries {
        let row = &entry.row;
        let name = match &entry.link {
            Some(link) => markup.link(&row.name, link),
            None => markup.text(&row.name),
        };
        table.push_row(vec![
            name,
            row.passing.to_string(),
            row.written.to_string(),
            row.total.to_string(),
            row.implemented(),
            row.pass_rate(),
        ]);
    }
    table
}

fn stage_cells(stages: &StageProgress, markup: Markup) -> Table {
    let mut table = Table::new(["Stage", "Passing", "Written", "Total", "Implemented", "Pass Rate"]);

    let total = stages.total();
    let rows = stages
        .iter()
        .map(|(stage, entry)| (markup.text(stage), entry))
        .chain(std::iter::once((markup.bold(TOTAL_ROW_LABEL), &total)));
    for (label, entry) in rows {
        table.push_row(vec![
            label,
            entry.passing.to_string(),
            entry.written.to_string(),
            entry.total.to_string(),
            entry.written_percentage(),
            entry.pass_rate(),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::RenderConfig;
    use testplanner_model::{TestResult, Testplan, Testpoint, TestpointRole};
    use testplanner_reconcile::{reconcile, summary_row};

    fn plan(name: &str, passing: u64) -> Testplan {
        let mut tp = Testpoint::synthetic("smoke", "", "V1", TestpointRole::Planned);
        tp.resolved_tests = vec![format!("{}_smoke", name), format!("{}_stress", name)];
        let mut plan = Testplan::new(name, format!("{}.hjson", name), vec![tp], vec![]);
        reconcile(
            &mut plan,
            vec![TestResult::with_counts(format!("{}_smoke", name), passing, 1)],
        )
        .unwrap();
        plan
    }

    fn summary(format: OutputFormat) -> Result<String> {
        let plans = [plan("uart", 1), plan("spi", 0)];
        let mut stages = StageProgress::new();
        let mut entries = Vec::new();
        for plan in &plans {
            stages.update(plan).unwrap();
            entries.push(SummaryEntry {
                row: summary_row(plan).unwrap(),
                link: Some(format!("{}.{}", plan.name, format.extension())),
            });
        }
        Renderer::new(RenderConfig {
            format,
            ..RenderConfig::default()
        })
        .summary_page("Simulation Summary", &entries, &stages)
    }

    #[test]
    fn test_summary_markdown() {
        let page = summary(OutputFormat::Markdown).unwrap();

        assert!(page.starts_with("# Simulation Summary\n\n## Testplans\n\n"));
        assert!(page.contains("| [uart](uart.md) | 1 | 1 | 2 | 50% | 100% |"));
        assert!(page.contains("| [spi](spi.md) | 0 | 1 | 2 | 50% | 0% |"));
        assert!(page.contains("| V1 | 1 | 2 | 4 | 50% | 50% |"));
        assert!(page.contains("| **Total** | 1 | 2 | 4 | 50% | 50% |"));
    }

    #[test]
    fn test_summary_html() {
        let page = summary(OutputFormat::Html).unwrap();

        assert!(page.contains("<title>Simulation Summary</title>"));
        assert!(page.contains("<a href=\"uart.html\">uart</a>"));
        assert!(page.contains("<b>Total</b>"));
    }

    #[test]
    fn test_summary_rejects_csv() {
        assert!(matches!(
            summary(OutputFormat::Csv),
            Err(RenderError::UnsupportedFormat(OutputFormat::Csv, _))
        ));
    }
}
