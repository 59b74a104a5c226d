//! Runs every `tests/scripts/*.pikchr` file. Files named `err_*` must fail;
//! all others must render to a non-empty drawing, identically every time.

use camino::Utf8Path;
use pikdraw::{Flags, pikchr};

/// Format a colored inline diff using dissimilar
fn format_inline_diff(first: &str, second: &str) -> String {
    use dissimilar::Chunk;

    let mut output = String::from("\n=== Inline Diff (first vs second run) ===\n");
    for chunk in dissimilar::diff(first, second) {
        match chunk {
            Chunk::Equal(s) => output.push_str(s),
            Chunk::Delete(s) => {
                output.push_str("\x1b[31m[-");
                output.push_str(s);
                output.push_str("-]\x1b[0m");
            }
            Chunk::Insert(s) => {
                output.push_str("\x1b[32m[+");
                output.push_str(s);
                output.push_str("+]\x1b[0m");
            }
        }
    }
    output
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn run_script(path: &Utf8Path) -> datatest_stable::Result<()> {
    init_tracing();
    let source = std::fs::read_to_string(path)?;
    let expect_error = path.file_name().is_some_and(|name| name.starts_with("err_"));

    let first = pikchr(&source, None, Flags::PLAINTEXT_ERRORS);
    if expect_error {
        if !first.is_error() {
            return Err(format!("{path} rendered but should have failed").into());
        }
        if first.width != -1 || first.height != -1 || !first.markup.contains("ERROR:") {
            return Err(format!("{path}: malformed error output:\n{}", first.markup).into());
        }
        return Ok(());
    }

    if first.is_error() {
        return Err(format!("{path} failed:\n{}", first.markup).into());
    }
    if first.width <= 0 || first.height <= 0 || !first.markup.contains("<svg") {
        return Err(format!("{path}: empty drawing {}x{}", first.width, first.height).into());
    }

    let second = pikchr(&source, None, Flags::PLAINTEXT_ERRORS);
    if first != second {
        return Err(format!(
            "{path}: output differs between runs{}",
            format_inline_diff(&first.markup, &second.markup)
        )
        .into());
    }
    Ok(())
}

datatest_stable::harness! {
    { test = run_script, root = "tests/scripts", pattern = r"\.pikchr$" },
}
