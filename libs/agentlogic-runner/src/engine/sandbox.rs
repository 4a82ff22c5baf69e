use crate::config::LanguageConfig;
use crate::evaluator::{decode_output, ExecutionOutcome, TestExecutionOutput};
use anyhow::{Context as _, Result};
use rquickjs::convert::Coerced;
use rquickjs::{Context, Ctx, Runtime, Value as JsValue};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::warn;

const MAX_STACK_BYTES: usize = 1024 * 1024;

/// Slack past the timeout before the caller stops waiting on the interpreter
const WATCHDOG_GRACE: Duration = Duration::from_millis(250);

/// Embedded-interpreter execution engine (QuickJS).
///
/// Every call builds a new runtime and context with no host bindings: no
/// filesystem, network, timers or module loader. The runtime is dropped when
/// the call returns.
///
/// **Limits:**
/// - Wall-clock timeout via the interpreter's interrupt handler
/// - Watchdog on the caller side: if the interpreter has not answered by
///   timeout + grace, the case is reported as timed out and its thread is
///   detached. Regex backtracking and GC thrash poll the interrupt handler
///   rarely or not at all
/// - Heap limit per runtime
/// - Native stack limit, so runaway recursion raises a RangeError
#[derive(Debug, Clone)]
pub struct SandboxEngine {
    timeout_ms: u64,
    memory_limit_bytes: usize,
}

impl SandboxEngine {
    pub fn new(timeout_ms: u64, memory_limit_mb: u32) -> Self {
        Self {
            timeout_ms,
            memory_limit_bytes: memory_limit_mb as usize * 1024 * 1024,
        }
    }

    pub fn from_config(config: &LanguageConfig) -> Self {
        Self::new(config.timeout_ms, config.memory_limit_mb)
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    pub async fn execute(
        &self,
        source: &str,
        function_name: &str,
        input: &[Value],
    ) -> Result<TestExecutionOutput> {
        let script = build_js_script(source, function_name, input)?;
        let timeout_ms = self.timeout_ms;
        let memory_limit_bytes = self.memory_limit_bytes;
        let start = Instant::now();

        // QuickJS is synchronous. A plain thread rather than the blocking
        // pool, so an interpreter that ignores the deadline can be abandoned
        // without holding up runtime shutdown.
        let (tx, rx) = oneshot::channel();
        thread::Builder::new()
            .name("agentlogic-sandbox".to_string())
            .spawn(move || {
                let _ = tx.send(run_script(&script, timeout_ms, memory_limit_bytes));
            })
            .context("Failed to spawn sandbox thread")?;

        let limit = Duration::from_millis(timeout_ms) + WATCHDOG_GRACE;
        match tokio::time::timeout(limit, rx).await {
            Ok(result) => result.context("Sandbox thread exited without a result")?,
            Err(_) => {
                let execution_time_ms = start.elapsed().as_millis() as u64;
                warn!(timeout_ms, execution_time_ms, "Sandbox script missed its deadline, detaching");
                Ok(TestExecutionOutput::new(
                    ExecutionOutcome::TimedOut { timeout_ms },
                    execution_time_ms,
                ))
            }
        }
    }
}

/// Submission followed by a single call expression whose completion value is
/// the JSON encoding of the result
fn build_js_script(source: &str, function_name: &str, input: &[Value]) -> Result<String> {
    let args_json = serde_json::to_string(input).context("Failed to encode test input")?;
    Ok(format!(
        "{source}\n;JSON.stringify({function_name}(...{args_json}));\n"
    ))
}

fn run_script(script: &str, timeout_ms: u64, memory_limit_bytes: usize) -> Result<TestExecutionOutput> {
    let start = Instant::now();
    let deadline = start + Duration::from_millis(timeout_ms);
    let interrupted = Arc::new(AtomicBool::new(false));

    let runtime = Runtime::new()
        .map_err(|e| anyhow::anyhow!("Failed to create sandbox runtime: {}", e))?;
    if memory_limit_bytes > 0 {
        runtime.set_memory_limit(memory_limit_bytes);
    }
    runtime.set_max_stack_size(MAX_STACK_BYTES);

    let flag = interrupted.clone();
    runtime.set_interrupt_handler(Some(Box::new(move || {
        if Instant::now() >= deadline {
            flag.store(true, Ordering::Relaxed);
            true
        } else {
            false
        }
    })));

    let context = Context::full(&runtime)
        .map_err(|e| anyhow::anyhow!("Failed to create sandbox context: {}", e))?;

    let evaluated: std::result::Result<Option<String>, String> = context.with(|ctx| {
        match ctx.eval::<Option<String>, _>(script) {
            Ok(json) => Ok(json),
            Err(rquickjs::Error::Exception) => {
                let caught = ctx.catch();
                let message = if let Some(exception) = caught.as_exception() {
                    exception.message().unwrap_or_else(|| "Uncaught exception".to_string())
                } else if let Some(text) = caught.as_string() {
                    text.to_string().unwrap_or_else(|_| "Uncaught exception".to_string())
                } else {
                    describe_thrown(&ctx, caught)
                };
                Err(message)
            }
            Err(e) => Err(e.to_string()),
        }
    });
    let execution_time_ms = start.elapsed().as_millis() as u64;

    let outcome = if interrupted.load(Ordering::Relaxed) {
        warn!(timeout_ms, "Sandbox script interrupted");
        ExecutionOutcome::TimedOut { timeout_ms }
    } else {
        match evaluated {
            Ok(None) => ExecutionOutcome::Returned(Value::Null),
            Ok(Some(json)) => decode_output(&json),
            Err(message) => ExecutionOutcome::RuntimeError(message),
        }
    };

    Ok(TestExecutionOutput::new(outcome, execution_time_ms))
}

/// Render a thrown non-Error value (`throw {code: 1}`, `throw 42`) inside the
/// context: JSON when it has a JSON form, else its string coercion.
fn describe_thrown<'js>(ctx: &Ctx<'js>, value: JsValue<'js>) -> String {
    let rendered = ctx
        .json_stringify(value.clone())
        .ok()
        .flatten()
        .and_then(|json| json.to_string().ok())
        .or_else(|| {
            value
                .get::<Coerced<String>>()
                .ok()
                .map(|coerced| coerced.0)
        });

    match rendered {
        Some(text) => format!("Uncaught {}", text),
        None => "Uncaught exception".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn engine() -> SandboxEngine {
        SandboxEngine::new(5000, 64)
    }

    #[test]
    fn test_script_shape() {
        let script = build_js_script("function add(a,b){return a+b;}", "add", &[json!(2), json!(3)])
            .unwrap();
        assert_eq!(
            script,
            "function add(a,b){return a+b;}\n;JSON.stringify(add(...[2,3]));\n"
        );
    }

    #[tokio::test]
    async fn test_add_returns_value() {
        let output = engine()
            .execute("function add(a,b){return a+b;}", "add", &[json!(2), json!(3)])
            .await
            .unwrap();
        assert_eq!(output.outcome, ExecutionOutcome::Returned(json!(5)));
    }

    #[tokio::test]
    async fn test_structured_values() {
        let output = engine()
            .execute(
                "const pairs = (o) => Object.keys(o).sort().map(k => [k, o[k]]);",
                "pairs",
                &[json!({ "b": 2, "a": "x" })],
            )
            .await
            .unwrap();
        assert_eq!(
            output.outcome,
            ExecutionOutcome::Returned(json!([["a", "x"], ["b", 2]]))
        );
    }

    #[tokio::test]
    async fn test_undefined_is_null() {
        let output = engine()
            .execute("function noop() {}", "noop", &[])
            .await
            .unwrap();
        assert_eq!(output.outcome, ExecutionOutcome::Returned(Value::Null));
    }

    #[tokio::test]
    async fn test_thrown_error_message() {
        let output = engine()
            .execute("function boom() { throw new Error('kaboom'); }", "boom", &[])
            .await
            .unwrap();
        assert_eq!(output.outcome, ExecutionOutcome::RuntimeError("kaboom".to_string()));
    }

    #[tokio::test]
    async fn test_thrown_string() {
        let output = engine()
            .execute("function boom() { throw 'plain'; }", "boom", &[])
            .await
            .unwrap();
        assert_eq!(output.outcome, ExecutionOutcome::RuntimeError("plain".to_string()));
    }

    #[tokio::test]
    async fn test_thrown_object_is_rendered() {
        let output = engine()
            .execute("function boom() { throw {code: 1}; }", "boom", &[])
            .await
            .unwrap();
        assert_eq!(
            output.outcome,
            ExecutionOutcome::RuntimeError("Uncaught {\"code\":1}".to_string())
        );

        let output = engine()
            .execute("function boom() { throw 42; }", "boom", &[])
            .await
            .unwrap();
        assert_eq!(output.outcome, ExecutionOutcome::RuntimeError("Uncaught 42".to_string()));
    }

    #[tokio::test]
    async fn test_missing_function() {
        let output = engine()
            .execute("const x = 1;", "solution", &[])
            .await
            .unwrap();
        match output.outcome {
            ExecutionOutcome::RuntimeError(message) => assert!(message.contains("solution")),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_host_capabilities() {
        let output = engine()
            .execute(
                "function probe() { return [typeof require, typeof process, typeof fetch]; }",
                "probe",
                &[],
            )
            .await
            .unwrap();
        assert_eq!(
            output.outcome,
            ExecutionOutcome::Returned(json!(["undefined", "undefined", "undefined"]))
        );
    }

    #[tokio::test]
    async fn test_infinite_loop_times_out() {
        let engine = SandboxEngine::new(300, 64);
        let output = engine
            .execute("function spin() { while (true) {} }", "spin", &[])
            .await
            .unwrap();
        assert_eq!(output.outcome, ExecutionOutcome::TimedOut { timeout_ms: 300 });
        assert!(output.execution_time_ms >= 300);
        assert!(output.execution_time_ms < 1300);
    }

    #[tokio::test]
    async fn test_catastrophic_regex_times_out() {
        let engine = SandboxEngine::new(1000, 64);
        let output = engine
            .execute(
                "function f() { return /^(a+)+$/.test('a'.repeat(34) + 'b'); }",
                "f",
                &[],
            )
            .await
            .unwrap();
        assert_eq!(output.outcome, ExecutionOutcome::TimedOut { timeout_ms: 1000 });
        assert!(output.execution_time_ms < 2000, "took {}ms", output.execution_time_ms);
    }

    #[tokio::test]
    async fn test_allocation_loop_with_catch_stays_within_deadline() {
        let engine = SandboxEngine::new(1000, 64);
        let output = engine
            .execute(
                "function hog() { let a = []; for (;;) { try { a.push(new Array(100000).fill(1)); } catch (e) { a = []; } } }",
                "hog",
                &[],
            )
            .await
            .unwrap();
        assert_eq!(output.outcome, ExecutionOutcome::TimedOut { timeout_ms: 1000 });
        assert!(output.execution_time_ms < 2000, "took {}ms", output.execution_time_ms);
    }

    #[tokio::test]
    async fn test_deeply_nested_return() {
        let output = engine()
            .execute(
                "function nest(n) { let out = []; for (let i = 1; i < n; i++) { out = [out]; } return out; }",
                "nest",
                &[json!(200)],
            )
            .await
            .unwrap();
        match output.outcome {
            ExecutionOutcome::Returned(value) => assert!(value.is_array()),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_runaway_allocation_is_bounded() {
        let engine = SandboxEngine::new(5000, 16);
        let output = engine
            .execute(
                "function hog() { const a = []; while (true) { a.push(new Array(1024).fill(1)); } }",
                "hog",
                &[],
            )
            .await
            .unwrap();
        assert!(
            matches!(
                output.outcome,
                ExecutionOutcome::RuntimeError(_) | ExecutionOutcome::TimedOut { .. }
            ),
            "unexpected outcome: {:?}",
            output.outcome
        );
    }

    #[tokio::test]
    async fn test_fresh_context_per_call() {
        let engine = engine();
        let source = "var counter = (typeof counter === 'number') ? counter : 0;\nfunction bump() { counter += 1; return counter; }";
        for _ in 0..2 {
            let output = engine.execute(source, "bump", &[]).await.unwrap();
            assert_eq!(output.outcome, ExecutionOutcome::Returned(json!(1)));
        }
    }
}
