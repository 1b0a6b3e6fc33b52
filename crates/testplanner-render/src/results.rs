//! Simulation results pages

use crate::error::{RenderError, Result};
use crate::format::{escape_html, Markup, OutputFormat};
use crate::renderer::Renderer;
use crate::table::{Align, Table};
use std::fmt::Write;
use std::io;
use testplanner_loader::{CoverageResult, ResultSet};
use testplanner_model::{format_time, TestResult, Testplan};
use testplanner_reconcile::{progress_table, results_table, ResultRow};

impl Renderer {
    /// Results page in the configured format
    ///
    /// `summary_link` adds a link back to the cross-testplan summary.
    pub fn results_page(
        &self,
        plan: &Testplan,
        results: &ResultSet,
        summary_link: Option<&str>,
    ) -> Result<String> {
        match self.config.format {
            OutputFormat::Markdown => self.results_markdown(plan, results, summary_link),
            OutputFormat::Html => self.results_html(plan, results, summary_link),
            OutputFormat::Csv => Err(RenderError::UnsupportedFormat(
                OutputFormat::Csv,
                "results page",
            )),
        }
    }

    fn results_markdown(
        &self,
        plan: &Testplan,
        results: &ResultSet,
        summary_link: Option<&str>,
    ) -> Result<String> {
        let markup = Markup::Markdown;
        let mut content = String::new();

        writeln!(content, "# Simulation Results: {}\n", plan.name)?;
        writeln!(content, "## Run on {}\n", results.timestamp)?;
        if let Some(link) = summary_link {
            writeln!(content, "[<- back to summary]({})\n", link)?;
        }
        if let Some(url) = self.docs_url(plan)? {
            writeln!(content, "[view documentation]({})\n", url)?;
        }

        writeln!(content, "### Test Results\n")?;
        writeln!(content, "{}", self.results_cells(plan, markup)?.to_markdown())?;

        writeln!(content, "### Testplan Progress\n")?;
        writeln!(content, "{}", progress_cells(plan, markup)?.to_markdown())?;

        if let Some(table) = coverage_cells(&results.cov_results) {
            writeln!(content, "### Coverage Results\n")?;
            writeln!(content, "{}", table.to_markdown())?;
        }

        Ok(content)
    }

    fn results_html(
        &self,
        plan: &Testplan,
        results: &ResultSet,
        summary_link: Option<&str>,
    ) -> Result<String> {
        let markup = Markup::Html;
        let mut body = String::new();

        writeln!(body, "<h1>Simulation Results: {}</h1>", escape_html(&plan.name))?;
        writeln!(body, "<h2>Run on {}</h2>", escape_html(&results.timestamp))?;
        if let Some(link) = summary_link {
            writeln!(body, "<p>{}</p>", markup.link("<- back to summary", link))?;
        }
        if let Some(url) = self.docs_url(plan)? {
            writeln!(body, "<p>{}</p>", markup.link("view documentation", &url))?;
        }

        writeln!(body, "<h3>Test Results</h3>")?;
        body.push_str(&self.results_cells(plan, markup)?.to_html());

        writeln!(body, "<h3>Testplan Progress</h3>")?;
        body.push_str(&progress_cells(plan, markup)?.to_html());

        if let Some(table) = coverage_cells(&results.cov_results) {
            writeln!(body, "<h3>Coverage Results</h3>")?;
            body.push_str(&table.to_html());
        }

        Ok(html_document(&format!("{} Simulation Results", plan.name), &body))
    }

    /// Write the results table as CSV
    pub fn write_results_csv<W: io::Write>(&self, plan: &Testplan, writer: W) -> Result<()> {
        self.results_cells(plan, Markup::Plain)?.write_csv(writer)
    }

    /// Write the progress table as CSV
    pub fn write_progress_csv<W: io::Write>(&self, plan: &Testplan, writer: W) -> Result<()> {
        progress_cells(plan, Markup::Plain)?.write_csv(writer)
    }

    pub(crate) fn results_cells(&self, plan: &Testplan, markup: Markup) -> Result<Table> {
        let rows = results_table(plan, &self.config.table)?;

        let mut header = Vec::new();
        if rows.show_stage {
            header.push("Stage");
        }
        header.extend([
            "Name",
            "Tests",
            "Max Job Runtime",
            "Simulated Time",
            "Passing",
            "Total",
            "Pass Rate",
        ]);
        if rows.has_logs {
            header.push("Logs");
        }
        let tests_column = if rows.show_stage { 2 } else { 1 };
        let mut table = Table::new(header).align(tests_column, Align::Left);

        for row in &rows.rows {
            let result = row.result;
            let mut cells = Vec::new();
            if rows.show_stage {
                cells.push(markup.text(row.stage));
            }
            cells.push(testpoint_cell(row, markup));
            cells.push(self.test_cell(row, markup));
            cells.push(format_time(result.job_runtime.as_ref()));
            cells.push(format_time(result.simulated_time.as_ref()));
            cells.push(result.passing.to_string());
            cells.push(result.total.to_string());
            cells.push(row.pass_rate());
            if rows.has_logs {
                cells.push(logs_cell(result, markup));
            }
            table.push_row(cells);
        }
        Ok(table)
    }

    fn test_cell(&self, row: &ResultRow<'_>, markup: Markup) -> String {
        let result = row.result;
        if row.role.is_total() {
            return markup.bold(&result.name);
        }
        let mut cell = match self.result_url(result) {
            Some(url) => markup.link(&result.name, &url),
            None => markup.text(&result.name),
        };
        if markup == Markup::Html && !result.additional_sources.is_empty() {
            let links: Vec<String> = result
                .additional_sources
                .iter()
                .map(|(label, path)| markup.link(label, &self.source_url(path)))
                .collect();
            cell.push_str(&format!(
                "<br/><div class=\"additional-sources\">{}</div>",
                links.join(" | ")
            ));
        }
        cell
    }
}

fn testpoint_cell(row: &ResultRow<'_>, markup: Markup) -> String {
    match markup {
        Markup::Html if !row.testpoint.is_empty() => format!(
            "<span title=\"{}\">{}</span>",
            escape_html(row.testpoint_desc),
            escape_html(row.testpoint)
        ),
        _ => markup.text(row.testpoint),
    }
}

fn logs_cell(result: &TestResult, markup: Markup) -> String {
    let entries = result
        .passing_logs
        .iter()
        .enumerate()
        .map(|(i, url)| (format!("Passing log #{}", i + 1), url))
        .chain(
            result
                .failing_logs
                .iter()
                .enumerate()
                .map(|(i, url)| (format!("Failing log #{}", i + 1), url)),
        );

    let links: Vec<String> = entries
        .map(|(label, url)| match markup {
            Markup::Plain => url.clone(),
            _ => markup.link(&label, url),
        })
        .collect();
    match markup {
        Markup::Html => links.join("<br/>"),
        _ => links.join(" "),
    }
}

pub(crate) fn progress_cells(plan: &Testplan, markup: Markup) -> Result<Table> {
    let progress = progress_table(plan)?;

    let mut header = Vec::new();
    if progress.show_stage {
        header.push("Stage");
    }
    header.extend(["Passing", "Written", "Total", "Progress"]);
    let mut table = Table::new(header);

    for row in &progress.rows {
        let mut cells = Vec::new();
        if progress.show_stage {
            cells.push(if row.is_total {
                markup.bold(&row.label)
            } else {
                markup.text(&row.label)
            });
        }
        cells.push(row.entry.passing.to_string());
        cells.push(row.entry.written.to_string());
        cells.push(row.entry.total.to_string());
        cells.push(row.progress());
        table.push_row(cells);
    }
    Ok(table)
}

/// One row of coverage figures headed by the capitalized coverage names
fn coverage_cells(cov_results: &[CoverageResult]) -> Option<Table> {
    if cov_results.is_empty() {
        return None;
    }
    let mut table = Table::new(cov_results.iter().map(|cov| capitalize(&cov.name)));
    table.push_row(cov_results.iter().map(|cov| cov.result.clone()).collect());
    Some(table)
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Wrap an HTML body into a standalone document
pub(crate) fn html_document(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<title>{}</title>
<style>
body {{ font-family: sans-serif; max-width: 1200px; margin: 0 auto; padding: 20px; }}
table {{ border-collapse: collapse; margin: 1em 0; }}
th, td {{ border: 1px solid #ddd; padding: 6px 10px; }}
th {{ background-color: #f5f5f5; }}
.additional-sources {{ font-size: smaller; }}
</style>
</head>
<body>
{}</body>
</html>
"#,
        escape_html(title),
        body
    )
}
