//! Bash script generation
//!
//! The generated script binds every argument as a shell variable (aggregate
//! parameters as arrays), runs the callable's source text, then appends one
//! `name\0value\0` record per output value to the file named by
//! `$LOOM_REPORT`.

use super::InvocationError;
use crate::tickets::Invocation;
use std::fmt::Write as _;

/// Environment variable naming the report file
pub const REPORT_ENV: &str = "LOOM_REPORT";

/// Render the complete script for `invocation`
pub fn render(invocation: &Invocation) -> Result<String, InvocationError> {
    let sign = &invocation.lambda.sign;
    let mut script = String::from("#!/usr/bin/env bash\nset -eu -o pipefail\n\n");

    for (name, values) in &invocation.args {
        check_name(name)?;
        if sign.is_aggregate_param(name) {
            let items: Vec<String> = values.iter().map(|v| quote(v)).collect();
            let _ = writeln!(script, "{}=({})", name, items.join(" "));
        } else {
            let value = values.first().map(String::as_str).unwrap_or_default();
            let _ = writeln!(script, "{}={}", name, quote(value));
        }
    }

    script.push('\n');
    script.push_str(&invocation.lambda.src);
    if !invocation.lambda.src.ends_with('\n') {
        script.push('\n');
    }

    script.push_str("\nset +u\n");
    for slot in &sign.outputs {
        check_name(&slot.name)?;
        let name = &slot.name;
        if slot.aggregate {
            let _ = writeln!(
                script,
                "if declare -p {name} >/dev/null 2>&1; then for __loom_v in \"${{{name}[@]}}\"; do printf '%s\\0%s\\0' {name} \"$__loom_v\" >> \"${REPORT_ENV}\"; done; fi"
            );
        } else {
            let _ = writeln!(
                script,
                "if declare -p {name} >/dev/null 2>&1; then printf '%s\\0%s\\0' {name} \"${name}\" >> \"${REPORT_ENV}\"; fi"
            );
        }
    }

    Ok(script)
}

/// Names become shell variables, so they must be plain identifiers
fn check_name(name: &str) -> Result<(), InvocationError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => chars.all(|c| c.is_ascii_alphanumeric() || c == '_'),
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(InvocationError::InvalidName {
            name: name.to_string(),
        })
    }
}

/// Single-quote `value` for bash
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}
