//! Result files for CI: `results.json` and `junit.xml`

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::E2eResult;
use crate::runner::{SuiteResult, TestResult, TestStatus};

/// Write both reports into `dir`
pub fn write_reports(suite: &SuiteResult, dir: &Path) -> E2eResult<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let json = write_json(suite, dir)?;
    let junit = write_junit(suite, dir)?;
    Ok(vec![json, junit])
}

pub fn write_json(suite: &SuiteResult, dir: &Path) -> E2eResult<PathBuf> {
    let path = dir.join("results.json");
    std::fs::write(&path, serde_json::to_string_pretty(suite)?)?;
    info!("Results written to: {}", path.display());
    Ok(path)
}

pub fn write_junit(suite: &SuiteResult, dir: &Path) -> E2eResult<PathBuf> {
    let path = dir.join("junit.xml");
    std::fs::write(&path, junit_xml(suite))?;
    info!("JUnit report written to: {}", path.display());
    Ok(path)
}

fn seconds(ms: u64) -> f64 {
    ms as f64 / 1000.0
}

/// One `<testsuite>` per scenario suite, in first-seen order
pub fn junit_xml(suite: &SuiteResult) -> String {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: BTreeMap<&str, Vec<&TestResult>> = BTreeMap::new();
    for result in &suite.results {
        if !groups.contains_key(result.suite.as_str()) {
            order.push(&result.suite);
        }
        groups.entry(&result.suite).or_default().push(result);
    }

    let mut xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <testsuites name=\"petclinic-e2e\" tests=\"{}\" failures=\"{}\" time=\"{:.3}\">\n",
        suite.total,
        suite.failed,
        seconds(suite.duration_ms)
    );

    for name in order {
        let cases = &groups[name];
        let failures = cases.iter().filter(|c| c.status == TestStatus::Failed).count();
        let time: u64 = cases.iter().map(|c| c.duration_ms).sum();
        xml.push_str(&format!(
            "  <testsuite name=\"{}\" tests=\"{}\" failures=\"{}\" time=\"{:.3}\">\n",
            escape(name),
            cases.len(),
            failures,
            seconds(time)
        ));
        for case in cases {
            push_case(&mut xml, case);
        }
        xml.push_str("  </testsuite>\n");
    }

    xml.push_str("</testsuites>\n");
    xml
}

fn push_case(xml: &mut String, case: &TestResult) {
    xml.push_str(&format!(
        "    <testcase name=\"{}\" classname=\"{}\" time=\"{:.3}\">\n",
        escape(&case.name),
        escape(&case.suite),
        seconds(case.duration_ms)
    ));

    if case.status == TestStatus::Failed {
        let message = case.error.as_deref().unwrap_or("failed");
        let first_line = message.lines().next().unwrap_or("");
        xml.push_str(&format!(
            "      <failure message=\"{}\">{}</failure>\n",
            escape(first_line),
            escape(message)
        ));
    }

    let mut properties: Vec<(String, String)> = case
        .annotations
        .iter()
        .map(|a| (a.kind.clone(), a.description.clone()))
        .collect();
    if case.status == TestStatus::Flaky {
        properties.push(("flaky".into(), format!("passed on attempt {}", case.attempts)));
    }
    if !properties.is_empty() {
        xml.push_str("      <properties>\n");
        for (name, value) in properties {
            xml.push_str(&format!(
                "        <property name=\"{}\" value=\"{}\"/>\n",
                escape(&name),
                escape(&value)
            ));
        }
        xml.push_str("      </properties>\n");
    }

    xml.push_str("    </testcase>\n");
}

/// Escape text for XML attributes and element content
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if (c as u32) < 0x20 && !matches!(c, '\n' | '\r' | '\t') => {}
            c => out.push(c),
        }
    }
    out
}
