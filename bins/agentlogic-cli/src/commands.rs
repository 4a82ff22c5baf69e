// CLI commands for running submissions locally
use agentlogic_common::{Language, RequestLimits, RunPayload, RunResponse, TestStatus};
use agentlogic_runner::entrypoint::detect_function_name;
use agentlogic_runner::{LanguageConfigManager, TestRunner};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

fn load_languages(timeout_ms: Option<u64>) -> Result<LanguageConfigManager> {
    let manager = LanguageConfigManager::load_default()?;
    Ok(match timeout_ms {
        Some(ms) => manager.with_timeout_ms(ms),
        None => manager,
    })
}

/// Read a submission file shaped like the HTTP request body
fn load_payload(path: &Path) -> Result<RunPayload> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse submission {}", path.display()))
}

/// Run a submission file; returns whether every test passed
pub async fn run_submission(
    file: &Path,
    code_file: Option<&Path>,
    language: Option<&str>,
    function: Option<&str>,
    timeout_ms: Option<u64>,
    json_output: bool,
) -> Result<bool> {
    let mut payload = load_payload(file)?;
    if let Some(code_file) = code_file {
        let code = fs::read_to_string(code_file)
            .with_context(|| format!("Failed to read {}", code_file.display()))?;
        payload.code = Some(code);
    }
    if let Some(language) = language {
        payload.language = Some(language.to_string());
    }
    if let Some(function) = function {
        payload.function_name = Some(function.to_string());
    }

    let runner = TestRunner::new(load_languages(timeout_ms)?, RequestLimits::default());
    let request = runner.validate(payload)?;
    let response = runner.run_tests(&request).await?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_report(request.language, &response);
    }

    Ok(response.summary.all_passed)
}

fn print_report(language: Language, response: &RunResponse) {
    println!("→ {} test cases ({})", response.results.len(), language);
    println!();

    for (idx, result) in response.results.iter().enumerate() {
        let marker = if result.passed { "✓" } else { "✗" };
        println!(
            "  {} Test {} ({}ms) {:?}",
            marker,
            idx + 1,
            result.execution_time,
            result.status
        );
        match result.status {
            TestStatus::Passed => {}
            TestStatus::Failed => {
                println!("    Input:    {}", serde_json::Value::from(result.input.clone()));
                println!("    Expected: {}", result.expected_output);
                if let Some(actual) = &result.actual_output {
                    println!("    Got:      {}", actual);
                }
            }
            _ => {
                if let Some(error) = &result.error {
                    println!("    Error: {}", error.lines().next().unwrap_or(""));
                }
            }
        }
    }

    println!();
    println!(
        "→ {} / {} passed{}",
        response.summary.passed,
        response.summary.total,
        if response.summary.all_passed { "" } else { " (FAILED)" }
    );
}

pub fn list_languages() -> Result<()> {
    let manager = load_languages(None)?;
    for language in manager.list_languages() {
        let config = manager.get_config(&language)?;
        let command = config
            .execution
            .as_ref()
            .map(|e| {
                let mut parts = vec![e.command.as_str()];
                parts.extend(e.args.iter().map(String::as_str));
                format!(" [{}]", parts.join(" "))
            })
            .unwrap_or_default();
        println!(
            "{:<12} {:<8} timeout={}ms{}",
            language.as_str(),
            language.backend().to_string(),
            config.timeout_ms,
            command
        );
    }
    Ok(())
}

pub fn detect(file: &Path, language: &str) -> Result<()> {
    let language: Language = language.parse()?;
    let source = fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    match detect_function_name(language, &source) {
        Some(name) => println!("{}", name),
        None => println!("(none detected, default entry point will be used)"),
    }
    Ok(())
}
