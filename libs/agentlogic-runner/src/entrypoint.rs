//! Entry-point resolution.
//!
//! An explicitly supplied function name always wins. Otherwise the source is
//! scanned for the first function definition the language allows; when
//! nothing matches, the configured default name is used and a missing
//! function surfaces later as a runtime error of the submission itself.

use agentlogic_common::Language;
use regex::Regex;
use std::sync::OnceLock;

fn python_def() -> &'static Regex {
    static PYTHON_DEF: OnceLock<Regex> = OnceLock::new();
    PYTHON_DEF.get_or_init(|| {
        Regex::new(r"(?m)^\s*(?:async\s+)?def\s+([A-Za-z_][A-Za-z0-9_]*)\s*\(").unwrap()
    })
}

fn js_function_decl() -> &'static Regex {
    static JS_FUNCTION: OnceLock<Regex> = OnceLock::new();
    JS_FUNCTION.get_or_init(|| {
        Regex::new(r"(?:^|[^A-Za-z0-9_$.])(?:async\s+)?function\s*\*?\s*([A-Za-z_$][A-Za-z0-9_$]*)\s*\(")
            .unwrap()
    })
}

fn js_function_expr() -> &'static Regex {
    static JS_EXPR: OnceLock<Regex> = OnceLock::new();
    JS_EXPR.get_or_init(|| {
        Regex::new(
            r"(?:^|[^A-Za-z0-9_$.])(?:const|let|var)\s+([A-Za-z_$][A-Za-z0-9_$]*)\s*=\s*(?:async\s+)?(?:function\b|\([^)]*\)\s*=>|[A-Za-z_$][A-Za-z0-9_$]*\s*=>)",
        )
        .unwrap()
    })
}

/// Find the first callable defined in `source`
pub fn detect_function_name(language: Language, source: &str) -> Option<String> {
    let first = |re: &Regex| re.captures(source).map(|c| c[1].to_string());
    match language {
        Language::Python => first(python_def()),
        Language::JavaScript => first(js_function_decl()).or_else(|| first(js_function_expr())),
    }
}

/// Name the runner will call for this submission
pub fn resolve_function_name(
    language: Language,
    source: &str,
    explicit: Option<&str>,
    default_name: &str,
) -> String {
    if let Some(name) = explicit {
        return name.to_string();
    }
    detect_function_name(language, source).unwrap_or_else(|| default_name.to_string())
}
