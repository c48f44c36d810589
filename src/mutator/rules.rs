//! Pure line-oriented rewrite rules for the shell configuration file.
//!
//! Every rule maps old content to new content without touching the
//! filesystem, and applying a rule to its own output is a no-op.

use std::fmt;
use std::sync::OnceLock;

use regex_lite::Regex;

/// Prefix that identifies the framework's plugin array.
pub const PLUGINS_PREFIX: &str = "plugins=(";

/// A single rewrite applied to the configuration file.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationRule {
    /// Replace the quoted value of every `ZSH_THEME="..."` line.
    /// Leaves the file untouched when no such line exists.
    ReplaceTheme { theme: String },

    /// Insert `line` before the first line containing `anchor`, or after
    /// the line equal to `after`, or at the top of the file. Nothing is
    /// inserted when the text of `line` already appears in the file.
    InsertBefore {
        line: String,
        anchor: String,
        after: Option<String>,
    },

    /// Render `plugins` into the single `plugins=(...)` line, replacing any
    /// existing one or inserting it before the `anchor` line.
    Plugins {
        plugins: Vec<String>,
        anchor: String,
    },

    /// Append `line` at the end of the file unless its text already appears in it.
    AppendOnce { line: String },
}

impl fmt::Display for MutationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReplaceTheme { theme } => write!(f, "theme {}", theme),
            Self::InsertBefore { line, .. } => write!(f, "line `{}`", line),
            Self::Plugins { plugins, .. } => write!(f, "plugins ({})", plugins.len()),
            Self::AppendOnce { line } => write!(f, "marker `{}`", line),
        }
    }
}

/// Render a plugin list as a `plugins=(a b c)` line, keeping order and duplicates.
pub fn render_plugins(plugins: &[String]) -> String {
    format!("{}{})", PLUGINS_PREFIX, plugins.join(" "))
}

fn theme_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^ZSH_THEME="[^"]*""#).expect("theme pattern is valid"))
}

fn is_plugins_line(line: &str) -> bool {
    line.trim_start().starts_with(PLUGINS_PREFIX)
}

fn same_line(a: &str, b: &str) -> bool {
    a.trim_end() == b.trim_end()
}

/// Whether `target` already appears anywhere in the file, possibly as part of a longer line.
fn contains_line(lines: &[String], target: &str) -> bool {
    let target = target.trim_end();
    lines.iter().any(|l| l.contains(target))
}

fn split_lines(content: &str) -> Vec<String> {
    content.lines().map(str::to_string).collect()
}

fn join_lines(lines: &[String]) -> String {
    if lines.is_empty() {
        return String::new();
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

impl MutationRule {
    /// Apply the rule and return the resulting content.
    #[cfg(test)]
    pub fn apply(&self, content: &str) -> String {
        self.rewrite(content).unwrap_or_else(|| content.to_string())
    }

    /// Apply the rule, returning `None` when the content is already in its target state.
    pub fn rewrite(&self, content: &str) -> Option<String> {
        let lines = split_lines(content);
        let rewritten = match self {
            Self::ReplaceTheme { theme } => replace_theme(&lines, theme),
            Self::InsertBefore {
                line,
                anchor,
                after,
            } => insert_before(&lines, line, anchor, after.as_deref()),
            Self::Plugins { plugins, anchor } => replace_plugins(&lines, plugins, anchor),
            Self::AppendOnce { line } => append_once(&lines, line),
        }?;
        Some(join_lines(&rewritten)).filter(|new| new != content)
    }
}

fn replace_theme(lines: &[String], theme: &str) -> Option<Vec<String>> {
    let re = theme_regex();
    let replacement = format!("ZSH_THEME=\"{}\"", theme);
    let mut changed = false;

    let out: Vec<String> = lines
        .iter()
        .map(|line| match re.find(line) {
            Some(m) => {
                let new = format!("{}{}", replacement, &line[m.end()..]);
                changed |= new != *line;
                new
            }
            None => line.clone(),
        })
        .collect();

    changed.then_some(out)
}

fn insert_before(
    lines: &[String],
    line: &str,
    anchor: &str,
    after: Option<&str>,
) -> Option<Vec<String>> {
    if contains_line(lines, line) {
        return None;
    }

    let position = lines
        .iter()
        .position(|l| l.contains(anchor))
        .or_else(|| {
            after.and_then(|after| {
                lines
                    .iter()
                    .position(|l| same_line(l, after))
                    .map(|i| i + 1)
            })
        })
        .unwrap_or(0);

    let mut out = lines.to_vec();
    out.insert(position, line.to_string());
    Some(out)
}

/// The part of a line before any `#` comment.
fn code_part(line: &str) -> &str {
    line.split('#').next().unwrap_or(line)
}

fn is_array_item_text(text: &str) -> bool {
    text.chars()
        .all(|c| c.is_whitespace() || c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Index of the line closing the array opened at `start`.
///
/// Continuation lines may only hold plugin names and comments. Anything
/// else, or reaching the end of the file, means the array is not closed
/// and `None` is returned.
fn array_end(lines: &[String], start: usize) -> Option<usize> {
    if code_part(&lines[start]).contains(')') {
        return Some(start);
    }

    for (i, line) in lines.iter().enumerate().skip(start + 1) {
        let code = code_part(line);
        match code.find(')') {
            Some(close) => return is_array_item_text(&code[..close]).then_some(i),
            None if !is_array_item_text(code) => return None,
            None => {}
        }
    }
    None
}

fn replace_plugins(lines: &[String], plugins: &[String], anchor: &str) -> Option<Vec<String>> {
    let rendered = render_plugins(plugins);
    let mut out = Vec::with_capacity(lines.len() + 1);
    let mut placed = false;

    let mut i = 0;
    while i < lines.len() {
        let line = &lines[i];
        if !is_plugins_line(line) {
            out.push(line.clone());
            i += 1;
            continue;
        }

        // An unclosed array only owns its opening line.
        let end = array_end(lines, i).unwrap_or(i);
        if !placed {
            out.push(rendered.clone());
            placed = true;
        }
        i = end + 1;
    }

    if !placed {
        match out.iter().position(|l| l.contains(anchor)) {
            Some(i) => out.insert(i, rendered),
            None => out.push(rendered),
        }
    }

    (out != lines).then_some(out)
}

fn append_once(lines: &[String], line: &str) -> Option<Vec<String>> {
    if contains_line(lines, line) {
        return None;
    }
    let mut out = lines.to_vec();
    out.push(line.to_string());
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE_LINE: &str = "source $ZSH/oh-my-zsh.sh";
    const AUTO_UPDATE: &str = "export DISABLE_AUTO_UPDATE=\"true\"";
    const MARKER: &str = "[[ ! -f ~/.p10k.zsh ]] || source ~/.p10k.zsh";

    fn plugins(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn theme_rule() -> MutationRule {
        MutationRule::ReplaceTheme {
            theme: "powerlevel10k/powerlevel10k".to_string(),
        }
    }

    fn auto_update_rule() -> MutationRule {
        MutationRule::InsertBefore {
            line: AUTO_UPDATE.to_string(),
            anchor: SOURCE_LINE.to_string(),
            after: Some("export ZSH=\"$HOME/.oh-my-zsh\"".to_string()),
        }
    }

    fn plugins_rule(names: &[&str]) -> MutationRule {
        MutationRule::Plugins {
            plugins: plugins(names),
            anchor: SOURCE_LINE.to_string(),
        }
    }

    #[test]
    fn test_render_plugins() {
        assert_eq!(
            render_plugins(&plugins(&["git", "fzf", "you-should-use"])),
            "plugins=(git fzf you-should-use)"
        );
    }

    #[test]
    fn test_render_plugins_keeps_duplicates_and_order() {
        assert_eq!(
            render_plugins(&plugins(&["fzf", "git", "fzf"])),
            "plugins=(fzf git fzf)"
        );
        assert_eq!(render_plugins(&[]), "plugins=()");
    }

    #[test]
    fn test_replace_theme() {
        let content = "export ZSH=\"$HOME/.oh-my-zsh\"\nZSH_THEME=\"robbyrussell\"\nsource $ZSH/oh-my-zsh.sh\n";
        let result = theme_rule().apply(content);

        assert!(result.contains("ZSH_THEME=\"powerlevel10k/powerlevel10k\"\n"));
        assert_eq!(result.matches("ZSH_THEME=").count(), 1);
        assert!(!result.contains("robbyrussell"));
    }

    #[test]
    fn test_replace_theme_already_set_is_unchanged() {
        let content = "ZSH_THEME=\"powerlevel10k/powerlevel10k\"\n";
        assert_eq!(theme_rule().rewrite(content), None);
        assert_eq!(theme_rule().apply(content), content);
    }

    #[test]
    fn test_replace_theme_keeps_trailing_comment() {
        let content = "ZSH_THEME=\"agnoster\" # see themes\n";
        assert_eq!(
            theme_rule().apply(content),
            "ZSH_THEME=\"powerlevel10k/powerlevel10k\" # see themes\n"
        );
    }

    #[test]
    fn test_replace_theme_ignores_commented_lines() {
        let content = "# ZSH_THEME=\"robbyrussell\"\nZSH_THEME_RANDOM_CANDIDATES=( \"a\" )\n";
        assert_eq!(theme_rule().rewrite(content), None);
    }

    #[test]
    fn test_replace_theme_without_theme_line_is_noop() {
        // No trailing newline: untouched content must come back byte for byte.
        let content = "export PATH=$HOME/bin:$PATH";
        assert_eq!(theme_rule().apply(content), content);
    }

    #[test]
    fn test_insert_before_anchor() {
        let content = "ZSH_THEME=\"robbyrussell\"\nplugins=(git)\nsource $ZSH/oh-my-zsh.sh\n";
        let result = auto_update_rule().apply(content);

        assert_eq!(result.matches(AUTO_UPDATE).count(), 1);
        let export_at = result.find(AUTO_UPDATE).unwrap();
        let source_at = result.find(SOURCE_LINE).unwrap();
        assert!(export_at < source_at);
        assert_eq!(
            result,
            "ZSH_THEME=\"robbyrussell\"\nplugins=(git)\nexport DISABLE_AUTO_UPDATE=\"true\"\nsource $ZSH/oh-my-zsh.sh\n"
        );
    }

    #[test]
    fn test_insert_before_already_present() {
        let content = "export DISABLE_AUTO_UPDATE=\"true\"\nsource $ZSH/oh-my-zsh.sh\n";
        assert_eq!(auto_update_rule().rewrite(content), None);
    }

    #[test]
    fn test_insert_before_present_with_trailing_comment() {
        let content = "export DISABLE_AUTO_UPDATE=\"true\"  # keep\nsource $ZSH/oh-my-zsh.sh\n";
        assert_eq!(auto_update_rule().rewrite(content), None);
    }

    #[test]
    fn test_insert_before_falls_back_after_line() {
        let content = "# header\nexport ZSH=\"$HOME/.oh-my-zsh\"\nalias ll='ls -l'\n";
        assert_eq!(
            auto_update_rule().apply(content),
            "# header\nexport ZSH=\"$HOME/.oh-my-zsh\"\nexport DISABLE_AUTO_UPDATE=\"true\"\nalias ll='ls -l'\n"
        );
    }

    #[test]
    fn test_insert_before_prepends_without_anchor() {
        let content = "alias ll='ls -l'\n";
        assert_eq!(
            auto_update_rule().apply(content),
            "export DISABLE_AUTO_UPDATE=\"true\"\nalias ll='ls -l'\n"
        );
    }

    #[test]
    fn test_insert_before_into_empty_file() {
        assert_eq!(auto_update_rule().apply(""), format!("{}\n", AUTO_UPDATE));
    }

    #[test]
    fn test_plugins_replace_existing_line() {
        let content = "plugins=(git docker kubectl)\nsource $ZSH/oh-my-zsh.sh\n";
        let result = plugins_rule(&["git", "fzf", "you-should-use"]).apply(content);

        assert_eq!(
            result,
            "plugins=(git fzf you-should-use)\nsource $ZSH/oh-my-zsh.sh\n"
        );
        assert!(!result.contains("docker"));
    }

    #[test]
    fn test_plugins_indented_line_is_replaced() {
        let content = "  plugins=(git)\n";
        assert_eq!(plugins_rule(&["fzf"]).apply(content), "plugins=(fzf)\n");
    }

    #[test]
    fn test_plugins_insert_before_anchor() {
        let content = "ZSH_THEME=\"x\"\nsource $ZSH/oh-my-zsh.sh\nalias g=git\n";
        assert_eq!(
            plugins_rule(&["git"]).apply(content),
            "ZSH_THEME=\"x\"\nplugins=(git)\nsource $ZSH/oh-my-zsh.sh\nalias g=git\n"
        );
    }

    #[test]
    fn test_plugins_append_without_anchor() {
        let content = "alias g=git\nexport EDITOR=vim\n";
        let result = plugins_rule(&["git", "fzf"]).apply(content);

        assert!(result.ends_with("plugins=(git fzf)\n"));
        assert_eq!(result.matches(PLUGINS_PREFIX).count(), 1);
    }

    #[test]
    fn test_plugins_multiline_array_collapsed() {
        let content = "plugins=(\n  git\n  docker\n)\nsource $ZSH/oh-my-zsh.sh\n";
        assert_eq!(
            plugins_rule(&["git", "fzf"]).apply(content),
            "plugins=(git fzf)\nsource $ZSH/oh-my-zsh.sh\n"
        );
    }

    #[test]
    fn test_plugins_multiline_array_with_parens_in_comment() {
        let content = "plugins=(\n  git  # core (required)\n  docker\n)\nsource $ZSH/oh-my-zsh.sh\n";
        assert_eq!(
            plugins_rule(&["git", "fzf"]).apply(content),
            "plugins=(git fzf)\nsource $ZSH/oh-my-zsh.sh\n"
        );
    }

    #[test]
    fn test_plugins_unclosed_array_keeps_following_lines() {
        let content = "plugins=(git\nsource $ZSH/oh-my-zsh.sh\nalias g=git\n";
        assert_eq!(
            plugins_rule(&["git", "fzf"]).apply(content),
            "plugins=(git fzf)\nsource $ZSH/oh-my-zsh.sh\nalias g=git\n"
        );
    }

    #[test]
    fn test_plugins_unclosed_array_at_end_of_file() {
        let content = "alias g=git\nplugins=(\n  git\n  docker\n";
        assert_eq!(
            plugins_rule(&["fzf"]).apply(content),
            "alias g=git\nplugins=(fzf)\n  git\n  docker\n"
        );
    }

    #[test]
    fn test_plugins_duplicate_lines_collapsed() {
        let content = "plugins=(git)\nalias g=git\nplugins=(docker)\n";
        assert_eq!(
            plugins_rule(&["fzf"]).apply(content),
            "plugins=(fzf)\nalias g=git\n"
        );
    }

    #[test]
    fn test_plugins_unchanged_when_current() {
        let content = "plugins=(git fzf)\n";
        assert_eq!(plugins_rule(&["git", "fzf"]).rewrite(content), None);
    }

    #[test]
    fn test_append_once() {
        let content = "source $ZSH/oh-my-zsh.sh\n";
        let rule = MutationRule::AppendOnce {
            line: MARKER.to_string(),
        };
        let once = rule.apply(content);
        assert_eq!(once, format!("source $ZSH/oh-my-zsh.sh\n{}\n", MARKER));

        let twice = rule.apply(&once);
        assert_eq!(twice.lines().count(), once.lines().count());
    }

    #[test]
    fn test_append_once_ignores_trailing_whitespace() {
        let content = format!("{}   \n", MARKER);
        let rule = MutationRule::AppendOnce {
            line: MARKER.to_string(),
        };
        assert_eq!(rule.rewrite(&content), None);
    }

    #[test]
    fn test_append_once_finds_marker_inside_longer_line() {
        let content = format!("  {} # prompt\n", MARKER);
        let rule = MutationRule::AppendOnce {
            line: MARKER.to_string(),
        };
        assert_eq!(rule.rewrite(&content), None);
    }

    #[test]
    fn test_append_to_file_without_trailing_newline() {
        let rule = MutationRule::AppendOnce {
            line: MARKER.to_string(),
        };
        assert_eq!(
            rule.apply("alias g=git"),
            format!("alias g=git\n{}\n", MARKER)
        );
    }

    #[test]
    fn test_full_sequence_is_idempotent() {
        let rules = vec![
            theme_rule(),
            auto_update_rule(),
            plugins_rule(&["git", "fzf", "you-should-use"]),
            MutationRule::AppendOnce {
                line: MARKER.to_string(),
            },
        ];
        let content = "export ZSH=\"$HOME/.oh-my-zsh\"\nZSH_THEME=\"robbyrussell\"\nplugins=(git)\nsource $ZSH/oh-my-zsh.sh\n";

        let once = rules.iter().fold(content.to_string(), |acc, r| r.apply(&acc));
        let twice = rules.iter().fold(once.clone(), |acc, r| r.apply(&acc));

        assert_eq!(once, twice);
        assert_eq!(once.matches(AUTO_UPDATE).count(), 1);
        assert_eq!(once.matches(MARKER).count(), 1);
    }

    #[test]
    fn test_rule_display() {
        assert_eq!(theme_rule().to_string(), "theme powerlevel10k/powerlevel10k");
        assert_eq!(plugins_rule(&["git", "fzf"]).to_string(), "plugins (2)");
    }
}
