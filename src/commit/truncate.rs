//! Size budgeting for the diff sent to AI providers.
//!
//! When the combined diff is over budget, the budget is shared out smallest
//! file first: each file gets at most an even split of what is left, and
//! whatever a small file does not use rolls over to the larger ones. Small
//! files therefore survive intact while the largest ones are cut hardest.
//! A file whose share cannot hold its `diff --git` line is left out whole,
//! so every kept segment starts with its header and ends with a newline.

use tracing::warn;

/// Default budget for the assembled diff, in bytes of UTF-8 text.
pub const DEFAULT_DIFF_BUDGET: usize = 12_000;

/// Diff text for a single file: header plus hunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub path: String,
    pub text: String,
}

/// The note appended after a truncated diff.
pub fn truncation_marker(omitted_bytes: usize, files: usize) -> String {
    format!("\n[diff truncated: {omitted_bytes} bytes omitted from {files} file(s)]\n")
}

/// Join per-file diffs, truncating to `budget` when needed.
///
/// The result is at most `budget` bytes plus the length of the truncation
/// marker, and the marker is present exactly when something was cut.
/// File order is preserved.
pub fn assemble(files: &[FileDiff], budget: usize) -> String {
    let total: usize = files.iter().map(|f| f.text.len()).sum();
    if total <= budget {
        return files.iter().map(|f| f.text.as_str()).collect();
    }

    let sizes: Vec<usize> = files.iter().map(|f| f.text.len()).collect();
    let floors: Vec<usize> = files.iter().map(|f| header_len(&f.text)).collect();
    let allotments = allot(&sizes, &floors, budget);

    let mut out = String::with_capacity(budget + 64);
    let mut omitted = 0usize;
    let mut cut_files = 0usize;

    for (file, limit) in files.iter().zip(allotments) {
        let kept = cut(&file.text, limit);
        if kept.len() < file.text.len() {
            omitted += file.text.len() - kept.len();
            cut_files += 1;
        }
        out.push_str(kept);
    }

    warn!(
        "Diff of {} bytes exceeds budget of {}; omitted {} bytes from {} file(s)",
        total, budget, omitted, cut_files
    );

    out.push_str(&truncation_marker(omitted, cut_files));
    out
}

/// Bytes of the first line including its newline, or the whole text.
fn header_len(text: &str) -> usize {
    text.find('\n').map_or(text.len(), |nl| nl + 1)
}

/// Split `budget` across files, smallest first.
///
/// A share below a file's floor gives that file nothing and the share stays
/// available to the files after it.
fn allot(sizes: &[usize], floors: &[usize], budget: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..sizes.len()).collect();
    order.sort_by_key(|&i| sizes[i]);

    let mut remaining = budget;
    let mut allotments = vec![0; sizes.len()];

    for (n, &i) in order.iter().enumerate() {
        let files_left = sizes.len() - n;
        let share = remaining / files_left;
        let given = sizes[i].min(share);
        if given < floors[i] {
            continue;
        }
        allotments[i] = given;
        remaining -= given;
    }

    allotments
}

/// Longest prefix of `text` within `limit` bytes, ending on a line break when
/// one is available and never inside a UTF-8 character.
fn cut(text: &str, limit: usize) -> &str {
    if text.len() <= limit {
        return text;
    }

    let mut end = limit;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }

    let head = &text[..end];
    match head.rfind('\n') {
        Some(nl) => &head[..=nl],
        None => head,
    }
}
