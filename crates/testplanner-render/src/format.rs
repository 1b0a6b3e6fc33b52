//! Output formats and per-format markup

/// Supported report formats
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    #[default]
    Markdown,
    Html,
    /// Plain cells for spreadsheet import
    Csv,
}

impl OutputFormat {
    /// File extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Html => "html",
            OutputFormat::Csv => "csv",
        }
    }

    /// Parse format from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "md" | "markdown" => Some(OutputFormat::Markdown),
            "html" => Some(OutputFormat::Html),
            "csv" => Some(OutputFormat::Csv),
            _ => None,
        }
    }

    pub(crate) fn markup(&self) -> Markup {
        match self {
            OutputFormat::Markdown => Markup::Markdown,
            OutputFormat::Html => Markup::Html,
            OutputFormat::Csv => Markup::Plain,
        }
    }
}

/// How inline text is decorated inside table cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Markup {
    Markdown,
    Html,
    Plain,
}

impl Markup {
    pub(crate) fn text(self, text: &str) -> String {
        match self {
            Markup::Html => escape_html(text),
            Markup::Markdown | Markup::Plain => text.to_string(),
        }
    }

    pub(crate) fn bold(self, text: &str) -> String {
        match self {
            Markup::Markdown => format!("**{}**", text),
            Markup::Html => format!("<b>{}</b>", escape_html(text)),
            Markup::Plain => text.to_string(),
        }
    }

    pub(crate) fn link(self, text: &str, url: &str) -> String {
        match self {
            Markup::Markdown => format!("[{}]({})", text, url),
            Markup::Html => format!("<a href=\"{}\">{}</a>", escape_html(url), escape_html(text)),
            Markup::Plain => text.to_string(),
        }
    }
}

/// Escape text for use in HTML content and attribute values
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format() {
        assert_eq!(OutputFormat::parse("MD"), Some(OutputFormat::Markdown));
        assert_eq!(OutputFormat::parse("html"), Some(OutputFormat::Html));
        assert_eq!(OutputFormat::parse("xlsx"), None);
        assert_eq!(OutputFormat::Csv.extension(), "csv");
    }

    #[test]
    fn test_markup() {
        assert_eq!(Markup::Markdown.link("t1", "u/t1.py"), "[t1](u/t1.py)");
        assert_eq!(
            Markup::Html.link("a<b", "x?y=1&z"),
            "<a href=\"x?y=1&amp;z\">a&lt;b</a>"
        );
        assert_eq!(Markup::Plain.bold("TOTAL"), "TOTAL");
        assert_eq!(Markup::Markdown.bold("TOTAL"), "**TOTAL**");
    }
}
