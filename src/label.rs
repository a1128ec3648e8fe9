//! Tab label elision
//!
//! Builds the fixed-width label a host shows on the session's tab: a
//! left-hand working directory and a right-hand summary of the running
//! command. Pure text-folding; identical inputs always give identical
//! output, and the display width never exceeds the budget.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const ELLIPSIS: char = '\u{2026}';
/// Marker standing in for collapsed middle path components.
const COLLAPSE: &str = "**";
const PROMPT_SYMBOL: char = '$';

/// Render `(cwd, command words)` into at most `width` display columns.
pub fn tab_label(cwd: &str, command_words: &[&str], width: usize) -> String {
    match width {
        0 => return String::new(),
        1 => return ELLIPSIS.to_string(),
        2 => return format!("{}{}", ELLIPSIS, PROMPT_SYMBOL),
        _ => {}
    }

    let command = command_words.join(" ");
    if command.is_empty() {
        return elide_path(cwd, width);
    }
    if cwd.is_empty() {
        return clip_right(&command, width);
    }

    // Give the command summary up to half the budget, or more when the path
    // is short enough to leave room.
    let half = (width - 1) / 2;
    let command_budget = half.max((width - 1).saturating_sub(cwd.width()));
    let command_shown = clip_right(&command, command_budget);
    let path_budget = width.saturating_sub(command_shown.width() + 1);
    let path_shown = elide_path(cwd, path_budget);
    if path_shown.is_empty() {
        command_shown
    } else {
        format!("{} {}", path_shown, command_shown)
    }
}

/// Keep a leading portion of `text` within `budget` columns, marking any
/// cut with an ellipsis.
fn clip_right(text: &str, budget: usize) -> String {
    if text.width() <= budget {
        return text.to_string();
    }
    if budget == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0usize;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > budget - 1 {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push(ELLIPSIS);
    out
}

/// Abbreviate a path into `budget` columns by collapsing middle components
/// into `**`, preferring to keep the first component and as many trailing
/// components as fit.
fn elide_path(path: &str, budget: usize) -> String {
    if budget == 0 {
        return String::new();
    }
    if path.width() <= budget {
        return path.to_string();
    }

    let leading = if path.starts_with('/') { "/" } else { "" };
    let comps: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();

    if comps.len() >= 3 {
        // first/**/<suffix>, growing the suffix from the end inward.
        for keep in (1..=comps.len() - 2).rev() {
            let candidate = format!(
                "{}{}/{}/{}",
                leading,
                comps[0],
                COLLAPSE,
                comps[comps.len() - keep..].join("/")
            );
            if candidate.width() <= budget {
                return candidate;
            }
        }
    }
    if comps.len() >= 2 {
        let candidate = format!("{}/{}", COLLAPSE, comps[comps.len() - 1]);
        if candidate.width() <= budget {
            return candidate;
        }
    }

    // Even the last component alone is too wide: keep its tail.
    let last = comps.last().copied().unwrap_or(path);
    clip_left(last, budget)
}

/// Keep a trailing portion of `text` within `budget` columns, marking the
/// cut with a leading ellipsis.
fn clip_left(text: &str, budget: usize) -> String {
    if budget == 0 {
        return String::new();
    }
    let mut kept: Vec<char> = Vec::new();
    let mut used = 0usize;
    for ch in text.chars().rev() {
        let w = ch.width().unwrap_or(0);
        if used + w > budget - 1 {
            break;
        }
        kept.push(ch);
        used += w;
    }
    let mut out = ELLIPSIS.to_string();
    out.extend(kept.into_iter().rev());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degenerate_widths() {
        assert_eq!(tab_label("/tmp", &["ls"], 0), "");
        assert_eq!(tab_label("/tmp", &["ls"], 1), "\u{2026}");
        assert_eq!(tab_label("/tmp", &["ls"], 2), "\u{2026}$");
    }

    #[test]
    fn test_everything_fits() {
        assert_eq!(tab_label("/tmp", &["ls", "-l"], 20), "/tmp ls -l");
    }

    #[test]
    fn test_path_only() {
        assert_eq!(tab_label("/tmp", &[], 10), "/tmp");
        assert_eq!(
            tab_label("/very/long/path/that/wont/fit", &[], 16),
            "/very/**/fit"
        );
    }

    #[test]
    fn test_path_suffix_grows_from_end() {
        let cwd = "/home/user/projects/shellbuf/src";
        assert_eq!(tab_label(cwd, &[], 32), cwd);
        assert_eq!(tab_label(cwd, &[], 30), "/home/**/projects/shellbuf/src");
        assert_eq!(tab_label(cwd, &[], 21), "/home/**/shellbuf/src");
        assert_eq!(tab_label(cwd, &[], 13), "/home/**/src");
    }

    #[test]
    fn test_collapsed_without_first_component() {
        assert_eq!(
            tab_label("/aaaaaaaaaa/bbb/ccc/src", &[], 8),
            "**/src"
        );
    }

    #[test]
    fn test_last_component_hard_truncated() {
        assert_eq!(
            tab_label("/a/extremelylongname", &[], 8),
            "\u{2026}ongname"
        );
    }

    #[test]
    fn test_command_elided_with_ellipsis() {
        let label = tab_label("/tmp", &["cargo", "build", "--release", "--verbose"], 20);
        assert!(label.starts_with("/tmp "), "{:?}", label);
        assert!(label.ends_with('\u{2026}'), "{:?}", label);
        assert!(unicode_width::UnicodeWidthStr::width(label.as_str()) <= 20);
    }

    #[test]
    fn test_command_only() {
        assert_eq!(tab_label("", &["make"], 10), "make");
        assert_eq!(tab_label("", &["make", "everything"], 8), "make ev\u{2026}");
    }

    #[test]
    fn test_short_path_leaves_room_for_command() {
        // The command may take more than half when the path is short.
        let label = tab_label("/t", &["cargo", "test", "--workspace"], 24);
        assert_eq!(label, "/t cargo test --workspa\u{2026}");
    }

    #[test]
    fn test_determinism() {
        let a = tab_label("/home/user/src", &["vi", "main.rs"], 17);
        let b = tab_label("/home/user/src", &["vi", "main.rs"], 17);
        assert_eq!(a, b);
    }

    #[test]
    fn test_bound_over_sampled_inputs() {
        let cwds = ["", "/", "/a", "/usr/local/share/doc", "rel/path/x", "日本語/パス"];
        let words: [&[&str]; 4] = [&[], &["ls"], &["cargo", "build"], &["漢字", "コマンド"]];
        for width in 0..40 {
            for cwd in cwds {
                for w in words {
                    let label = tab_label(cwd, w, width);
                    assert!(
                        unicode_width::UnicodeWidthStr::width(label.as_str()) <= width,
                        "cwd={:?} words={:?} width={} label={:?}",
                        cwd,
                        w,
                        width,
                        label
                    );
                }
            }
        }
    }
}
