use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::info;

/// Replaces the value of `key` in a `KEY=value` env file, leaving every other
/// line byte-identical. The new content goes to a temp file in the same
/// directory followed by an atomic rename, so a concurrent reader sees either
/// the old file or the new one, never a partial write.
pub fn replace_key(path: &Path, key: &str, value: &str) -> Result<()> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read env file {}", path.display()))?;

    let rewritten = rewrite(&contents, key, value)
        .with_context(|| format!("Failed to rewrite env file {}", path.display()))?;

    // Temp file must live in the target directory, rename is only atomic
    // within one filesystem.
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file next to {}", path.display()))?;
    tmp.write_all(rewritten.as_bytes())
        .context("Failed to write rewritten env file")?;
    tmp.persist(path)
        .with_context(|| format!("Failed to replace env file {}", path.display()))?;

    info!("Updated {} to {}={}", path.display(), key, value);
    Ok(())
}

fn rewrite(contents: &str, key: &str, value: &str) -> Result<String> {
    let needle = format!("{}=", key);
    let mut found = false;
    let mut lines = Vec::new();
    // Split on '\n' only, keeping any '\r' attached: non-target lines must
    // stay byte-identical, CRLF files included, and join reproduces the
    // original trailing newline exactly.
    for line in contents.split('\n') {
        let (body, eol) = match line.strip_suffix('\r') {
            Some(body) => (body, "\r"),
            None => (line, ""),
        };
        if body.starts_with(&needle) {
            if found {
                anyhow::bail!("Key {} appears more than once", key);
            }
            lines.push(format!("{}{}{}", needle, value, eol));
            found = true;
        } else {
            lines.push(line.to_string());
        }
    }
    if !found {
        anyhow::bail!("Key {} not found", key);
    }

    Ok(lines.join("\n"))
}
