//! Testplan documentation pages

use crate::error::Result;
use crate::format::OutputFormat;
use crate::renderer::{path_string, Renderer};
use std::fmt::Write;
use testplanner_loader::ResultSet;
use testplanner_model::{Testplan, NO_STAGE};

impl Renderer {
    /// Markdown description of the testpoints and covergroups
    ///
    /// Test names link to their source when `results` reports a file for
    /// them or the resource map resolves a `source` for them.
    pub fn testplan_doc(&self, plan: &Testplan, results: Option<&ResultSet>) -> Result<String> {
        let markup = OutputFormat::Markdown.markup();
        let mut content = String::new();

        writeln!(content, "# {}\n", plan.name)?;
        if let Some(source) = self.testplan_source(plan)? {
            let url = self.source_url(&path_string(&source));
            writeln!(content, "{}\n", markup.link("Source file", &url))?;
        }

        writeln!(content, "## Testpoints\n")?;
        let mut current_stage: Option<&str> = None;
        for tp in plan.testpoints.iter().filter(|tp| tp.is_planned()) {
            let heading = if tp.stage == NO_STAGE {
                "###"
            } else {
                if current_stage != Some(tp.stage.as_str()) {
                    writeln!(content, "### Stage {} Testpoints\n", tp.stage)?;
                    current_stage = Some(tp.stage.as_str());
                }
                "####"
            };
            writeln!(content, "{} `{}`\n", heading, tp.name)?;

            let mut tests = Vec::with_capacity(tp.resolved_tests.len());
            for test in &tp.resolved_tests {
                tests.push(match self.test_link(plan, &tp.name, test, results)? {
                    Some(url) => markup.link(test, &url),
                    None => test.clone(),
                });
            }
            match tests.as_slice() {
                [] => writeln!(content, "No Tests Implemented")?,
                [test] => writeln!(content, "Test: {}", test)?,
                tests => {
                    writeln!(content, "Tests:")?;
                    for test in tests {
                        writeln!(content, "- {}", test)?;
                    }
                }
            }
            writeln!(content, "\n{}\n", tp.desc.trim())?;
        }

        if !plan.covergroups.is_empty() {
            writeln!(content, "## Covergroups\n")?;
            for cg in &plan.covergroups {
                writeln!(content, "### {}\n", cg.name)?;
                writeln!(content, "{}\n", cg.desc.trim())?;
            }
        }

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::RenderConfig;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;
    use testplanner_loader::ResourceMap;
    use testplanner_model::{Covergroup, TestResult, Testpoint, TestpointRole};

    fn testpoint(name: &str, stage: &str, tests: &[&str]) -> Testpoint {
        let mut tp = Testpoint::synthetic(name, "  Verify it.\n", stage, TestpointRole::Planned);
        tp.resolved_tests = tests.iter().map(|t| t.to_string()).collect();
        tp
    }

    fn covergroup(name: &str) -> Covergroup {
        Covergroup {
            name: name.to_string(),
            desc: "Parity modes".to_string(),
            tags: vec![],
            extra: Default::default(),
        }
    }

    #[test]
    fn test_doc_layout() {
        let plan = Testplan::new(
            "uart",
            "hw/uart.hjson",
            vec![
                testpoint("smoke", "V1", &["uart_smoke"]),
                testpoint("baud", "V2", &["uart_baud_9600", "uart_baud_115200"]),
                testpoint("fifo", "V2", &[]),
            ],
            vec![covergroup("uart_parity_cg")],
        );
        let doc = Renderer::default().testplan_doc(&plan, None).unwrap();

        assert_eq!(
            doc,
            "# uart\n\n\
             ## Testpoints\n\n\
             ### Stage V1 Testpoints\n\n\
             #### `smoke`\n\n\
             Test: uart_smoke\n\nVerify it.\n\n\
             ### Stage V2 Testpoints\n\n\
             #### `baud`\n\n\
             Tests:\n- uart_baud_9600\n- uart_baud_115200\n\nVerify it.\n\n\
             #### `fifo`\n\n\
             No Tests Implemented\n\nVerify it.\n\n\
             ## Covergroups\n\n\
             ### uart_parity_cg\n\nParity modes\n\n"
        );
    }

    #[test]
    fn test_unstaged_testpoints_use_top_heading() {
        let plan = Testplan::new(
            "gpio",
            "gpio.hjson",
            vec![testpoint("smoke", NO_STAGE, &["gpio_smoke"])],
            vec![],
        );
        let doc = Renderer::default().testplan_doc(&plan, None).unwrap();

        assert!(doc.contains("### `smoke`\n"));
        assert!(!doc.contains("Stage"));
        assert!(!doc.contains("## Covergroups"));
    }

    #[test]
    fn test_links_from_results() {
        let plan = Testplan::new(
            "uart",
            "hw/uart.hjson",
            vec![testpoint("smoke", "V1", &["uart_smoke"])],
            vec![],
        );
        let mut result = TestResult::with_counts("uart_smoke", 1, 1);
        result.source_file = Some("tests/test_uart.py".to_string());
        result.source_line = Some(3);
        let results = ResultSet {
            timestamp: "now".to_string(),
            test_results: vec![result],
            ..ResultSet::default()
        };

        let renderer = Renderer::new(RenderConfig {
            source_url_prefix: "https://git.example/blob/main".to_string(),
            ..RenderConfig::default()
        });
        let doc = renderer.testplan_doc(&plan, Some(&results)).unwrap();
        assert!(doc.contains(
            "Test: [uart_smoke](https://git.example/blob/main/tests/test_uart.py#L3)"
        ));
    }

    #[test]
    fn test_links_from_resource_map() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("hw/uart/tests")).unwrap();
        fs::write(root.join("hw/uart/tests/test_smoke.py"), "").unwrap();
        fs::write(root.join("hw/uart/README.md"), "").unwrap();

        let rules = match json!({
            "testplans": [{
                "name": "uart",
                "source": "hw/uart/README.md",
                "testpoints": [{
                    "name": ".*",
                    "tests": [{ "name": "uart_(.*)", "source": "hw/uart/tests/test_{{ regex_groups.test[0] }}.py" }]
                }]
            }]
        }) {
            serde_json::Value::Object(rules) => ResourceMap::new(rules),
            _ => unreachable!(),
        };

        let plan = Testplan::new(
            "uart",
            root.join("hw/uart/uart.hjson"),
            vec![testpoint("smoke", "V1", &["uart_smoke", "uart_missing"])],
            vec![],
        );
        let renderer = Renderer::new(RenderConfig {
            project_root: root.to_path_buf(),
            source_url_prefix: "src".to_string(),
            ..RenderConfig::default()
        })
        .with_resource_map(rules);
        let doc = renderer.testplan_doc(&plan, None).unwrap();

        assert!(doc.contains("[Source file](src/hw/uart/README.md)\n\n## Testpoints"));
        assert!(doc.contains("- [uart_smoke](src/hw/uart/tests/test_smoke.py)\n"));
        assert!(doc.contains("- uart_missing\n"));
    }
}
