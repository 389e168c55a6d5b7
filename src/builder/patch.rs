//! Declarative text patches for toolchain project files.
//!
//! A patch rewrites every whole-token occurrence of `find` in one file to
//! `replace`. Tokens are maximal runs of `[A-Za-z0-9_.+-]`, which covers
//! library file names like `zlibd.lib` inside `;`-separated MSBuild lists.
//! Because a token equal to `find` never survives a pass and `replace` may
//! not contain `find` as a token, applying a patch twice is the same as
//! applying it once.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::errors::RecipeError;

/// One (file, find, replace, ignore-if-absent) rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Patch {
    /// Path relative to the source root.
    pub file: PathBuf,
    pub find: String,
    pub replace: String,
    /// Succeed without changes when `find` does not occur.
    pub ignore_if_absent: bool,
}

impl Patch {
    pub fn new(
        file: impl Into<PathBuf>,
        find: impl Into<String>,
        replace: impl Into<String>,
        ignore_if_absent: bool,
    ) -> Result<Self, RecipeError> {
        let patch = Patch {
            file: file.into(),
            find: find.into(),
            replace: replace.into(),
            ignore_if_absent,
        };

        if patch.find.is_empty() || !patch.find.chars().all(is_token_char) {
            return Err(patch.invalid(format!("`{}` is not a single token", patch.find)));
        }
        if tokens(&patch.replace).any(|t| t == patch.find) {
            return Err(patch.invalid(format!(
                "replacement `{}` reintroduces `{}`",
                patch.replace, patch.find
            )));
        }

        Ok(patch)
    }

    fn invalid(&self, message: String) -> RecipeError {
        RecipeError::Patch {
            file: self.file.clone(),
            message,
        }
    }
}

/// Outcome of applying a patch list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchReport {
    /// Files whose content changed.
    pub files_changed: Vec<PathBuf>,
    /// Total number of token replacements.
    pub replacements: usize,
}

fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '+' | '-')
}

fn tokens(s: &str) -> impl Iterator<Item = &str> {
    s.split(|c: char| !is_token_char(c)).filter(|t| !t.is_empty())
}

/// Replace every whole-token occurrence of `find` with `replace`.
///
/// Returns the new text and the number of replacements.
pub fn replace_tokens(text: &str, find: &str, replace: &str) -> (String, usize) {
    let mut out = String::with_capacity(text.len());
    let mut count = 0;
    let mut rest = text;

    while !rest.is_empty() {
        let token_len = rest
            .char_indices()
            .find(|&(_, c)| !is_token_char(c))
            .map_or(rest.len(), |(i, _)| i);

        if token_len == 0 {
            let sep = rest.chars().next().map_or(1, char::len_utf8);
            out.push_str(&rest[..sep]);
            rest = &rest[sep..];
            continue;
        }

        let token = &rest[..token_len];
        if token == find {
            out.push_str(replace);
            count += 1;
        } else {
            out.push_str(token);
        }
        rest = &rest[token_len..];
    }

    (out, count)
}

/// Apply `patches` below `source_root`.
///
/// Files are only rewritten when their content changes.
pub fn apply_patches(source_root: &Path, patches: &[Patch]) -> Result<PatchReport, RecipeError> {
    let mut report = PatchReport::default();

    for patch in patches {
        let path = source_root.join(&patch.file);
        let text = fs::read_to_string(&path).map_err(|e| RecipeError::Patch {
            file: path.clone(),
            message: format!("cannot read project file: {}", e),
        })?;

        let (patched, count) = replace_tokens(&text, &patch.find, &patch.replace);
        if count == 0 {
            if patch.ignore_if_absent {
                tracing::debug!("`{}` not in {}, skipping", patch.find, patch.file.display());
                continue;
            }
            return Err(RecipeError::Patch {
                file: path,
                message: format!("`{}` not found", patch.find),
            });
        }

        fs::write(&path, patched)
            .map_err(|e| RecipeError::io(format!("failed to write {}", path.display()), e))?;
        tracing::debug!(
            "{}: `{}` -> `{}` ({}x)",
            patch.file.display(),
            patch.find,
            patch.replace,
            count
        );

        report.replacements += count;
        if !report.files_changed.contains(&patch.file) {
            report.files_changed.push(patch.file.clone());
        }
    }

    Ok(report)
}
