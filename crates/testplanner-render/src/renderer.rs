//! Report generator configuration and link resolution

use crate::error::Result;
use crate::format::OutputFormat;
use std::path::{Path, PathBuf};
use testplanner_loader::{
    find_unique_file, Level, ResourceMap, ResourceQuery, ResultSet, DOCS_RESOURCE,
    SOURCE_RESOURCE,
};
use testplanner_model::{TestResult, Testplan};
use testplanner_reconcile::TableOptions;
use tracing::debug;

/// Report generation settings
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Root that testplan and test source paths are relative to
    pub project_root: PathBuf,

    /// Prepended to project-relative paths to build source links
    pub source_url_prefix: String,

    /// Prepended to `docs_html` resources
    pub docs_url_prefix: String,

    pub format: OutputFormat,
    pub table: TableOptions,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("."),
            source_url_prefix: String::new(),
            docs_url_prefix: String::new(),
            format: OutputFormat::Markdown,
            table: TableOptions::default(),
        }
    }
}

/// Writes documentation, results and summary pages
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    pub(crate) config: RenderConfig,
    pub(crate) resource_map: ResourceMap,
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            resource_map: ResourceMap::default(),
        }
    }

    pub fn with_resource_map(mut self, resource_map: ResourceMap) -> Self {
        self.resource_map = resource_map;
        self
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Testplan path as given to resource map rules and source links
    pub fn testplan_file(&self, plan: &Testplan) -> String {
        let source = plan.source();
        source
            .strip_prefix(&self.config.project_root)
            .unwrap_or(source)
            .to_string_lossy()
            .into_owned()
    }

    /// Link to a project-relative path
    pub fn source_url(&self, path: &str) -> String {
        let path = path.trim_start_matches("./");
        if self.config.source_url_prefix.is_empty() {
            path.to_string()
        } else {
            format!(
                "{}/{}",
                self.config.source_url_prefix.trim_end_matches('/'),
                path
            )
        }
    }

    /// Link to the line a result was reported from
    pub(crate) fn result_url(&self, result: &TestResult) -> Option<String> {
        let file = result.source_file.as_deref()?;
        let url = self.source_url(file);
        Some(match result.source_line {
            Some(line) => format!("{}#L{}", url, line),
            None => url,
        })
    }

    /// Documentation page of the testplan from the `docs_html` resource
    pub fn docs_url(&self, plan: &Testplan) -> Result<Option<String>> {
        let file = self.testplan_file(plan);
        let query = ResourceQuery::testplan(&file, &plan.name);
        Ok(self
            .resource_map
            .get(DOCS_RESOURCE, &query)?
            .map(|resource| {
                format!(
                    "{}/{}",
                    self.config.docs_url_prefix.trim_end_matches('/'),
                    resource
                )
            }))
    }

    /// Source file describing the testplan as a whole
    pub fn testplan_source(&self, plan: &Testplan) -> Result<Option<PathBuf>> {
        let file = self.testplan_file(plan);
        let query = ResourceQuery::testplan(&file, &plan.name);
        match self.resource_map.get(SOURCE_RESOURCE, &query)? {
            Some(pattern) => Ok(find_unique_file(
                &self.config.project_root,
                &pattern,
                &plan.name,
            )?),
            None => Ok(None),
        }
    }

    /// Source file of one test of a testpoint
    pub fn test_source(
        &self,
        plan: &Testplan,
        testpoint: &str,
        test: &str,
    ) -> Result<Option<PathBuf>> {
        let file = self.testplan_file(plan);
        let levels = [Level::Tests];
        let query = ResourceQuery::test(&file, &plan.name, testpoint, test).at_levels(&levels);
        let Some(pattern) = self.resource_map.get(SOURCE_RESOURCE, &query)? else {
            return Ok(None);
        };
        debug!("Test {} source pattern: {}", test, pattern);
        let target = format!("{}/{}/{}", plan.name, testpoint, test);
        Ok(find_unique_file(&self.config.project_root, &pattern, &target)?)
    }

    /// Link for a test, from a result set first, then from the resource map
    pub(crate) fn test_link(
        &self,
        plan: &Testplan,
        testpoint: &str,
        test: &str,
        results: Option<&ResultSet>,
    ) -> Result<Option<String>> {
        let reported = results.and_then(|set| {
            set.test_results
                .iter()
                .find(|result| result.name == test)
                .and_then(|result| self.result_url(result))
        });
        if reported.is_some() {
            return Ok(reported);
        }
        Ok(self
            .test_source(plan, testpoint, test)?
            .map(|path| self.source_url(&path_string(&path))))
    }
}

pub(crate) fn path_string(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer(prefix: &str) -> Renderer {
        Renderer::new(RenderConfig {
            project_root: PathBuf::from("/repo"),
            source_url_prefix: prefix.to_string(),
            ..RenderConfig::default()
        })
    }

    #[test]
    fn test_source_url() {
        assert_eq!(
            renderer("https://git.example/tree/main/").source_url("./hw/uart.hjson"),
            "https://git.example/tree/main/hw/uart.hjson"
        );
        assert_eq!(renderer("").source_url("hw/uart.hjson"), "hw/uart.hjson");
    }

    #[test]
    fn test_result_url() {
        let renderer = renderer("src");
        let mut result = TestResult::with_counts("t1", 1, 1);
        assert_eq!(renderer.result_url(&result), None);

        result.source_file = Some("tests/test_uart.py".to_string());
        assert_eq!(
            renderer.result_url(&result).as_deref(),
            Some("src/tests/test_uart.py")
        );
        result.source_line = Some(42);
        assert_eq!(
            renderer.result_url(&result).as_deref(),
            Some("src/tests/test_uart.py#L42")
        );
    }

    #[test]
    fn test_testplan_file_is_project_relative() {
        let plan = Testplan::new("uart", "/repo/hw/uart.hjson", vec![], vec![]);
        assert_eq!(renderer("").testplan_file(&plan), "hw/uart.hjson");
    }
}
