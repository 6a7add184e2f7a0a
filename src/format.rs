//! Terminal formatting for conversation entries and model answers.

use colored::Colorize;

use crate::constants::TOOL_RESULT_PREVIEW_CHARS;
use crate::conversation::{ConversationEntry, Role};
use crate::tools::ToolDescriptor;

/// Format one conversation entry for `/history`, with a role label and colors.
pub fn format_entry(entry: &ConversationEntry) -> String {
    match entry {
        ConversationEntry::Message { role, content } => {
            let label = format_role_label(role);
            let body = match role {
                Role::User => content.clone(),
                Role::Assistant => render_markdown_lite(content),
                Role::Developer => content.dimmed().to_string(),
            };
            format!("{}\n{}", label, body)
        }
        ConversationEntry::FunctionCall {
            call_id,
            name,
            arguments,
        } => format!(
            "{} {}({}) {}",
            "call:".yellow(),
            name.yellow().bold(),
            preview(&arguments.to_string()),
            format!("[{call_id}]").dimmed()
        ),
        ConversationEntry::FunctionResult { call_id, output } => format!(
            "{} {} {}",
            "result:".yellow(),
            preview(&output.to_string()).dimmed(),
            format!("[{call_id}]").dimmed()
        ),
    }
}

/// One line per tool: name, provider, and description.
pub fn format_tool(tool: &ToolDescriptor, provider: Option<&str>) -> String {
    let provider = provider
        .map(|p| format!("[{p}]").dimmed().to_string())
        .unwrap_or_default();
    let description = tool.description.lines().next().unwrap_or_default();
    format!("  {} {} {}", tool.name.cyan(), provider, description)
        .trim_end()
        .to_string()
}

fn format_role_label(role: &Role) -> String {
    match role {
        Role::User => format!("{role}:").green().bold().to_string(),
        Role::Assistant => format!("{role}:").cyan().bold().to_string(),
        Role::Developer => format!("{role}:").dimmed().to_string(),
    }
}

/// Shortens `text` to the preview width on a char boundary, appending `…`.
pub fn preview(text: &str) -> String {
    let single_line = text.replace('\n', " ");
    match single_line.char_indices().nth(TOOL_RESULT_PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}…", &single_line[..cut]),
        None => single_line,
    }
}

/// Minimal markdown renderer for terminal output.
/// Not a full parser. Handles the three most common patterns
/// in LLM output: bold, inline code, and fenced code blocks.
pub fn render_markdown_lite(text: &str) -> String {
    let mut output = String::new();
    let mut in_code_block = false;

    for line in text.lines() {
        if let Some(lang) = line.strip_prefix("```") {
            if in_code_block {
                output.push('\n');
            } else if !lang.is_empty() {
                output.push_str(&format!("  {}\n", lang.dimmed()));
            }
            in_code_block = !in_code_block;
            continue;
        }

        if in_code_block {
            output.push_str(&format!("  {}\n", line.dimmed()));
        } else {
            output.push_str(&render_inline(line));
            output.push('\n');
        }
    }

    if output.ends_with('\n') {
        output.pop();
    }
    output
}

/// Handle **bold** and `inline code` within a single line.
fn render_inline(line: &str) -> String {
    let mut result = String::new();
    let mut rest = line;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("**") {
            if let Some(end) = after.find("**") {
                result.push_str(&after[..end].bold().to_string());
                rest = &after[end + 2..];
                continue;
            }
        }
        if let Some(after) = rest.strip_prefix('`') {
            if let Some(end) = after.find('`') {
                result.push_str(&after[..end].dimmed().to_string());
                rest = &after[end + 1..];
                continue;
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            result.push(c);
        }
        rest = chars.as_str();
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn test_markdown_lite_strips_markers() {
        plain();
        assert_eq!(render_markdown_lite("a **bold** and `code`"), "a bold and code");
        assert_eq!(render_markdown_lite("```sql\nselect 1;\n```"), "  sql\n  select 1;\n");
    }

    #[test]
    fn test_unclosed_markers_are_kept() {
        plain();
        assert_eq!(render_markdown_lite("2 ** 3 and `x"), "2 ** 3 and `x");
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let long = "é".repeat(TOOL_RESULT_PREVIEW_CHARS + 5);
        let shown = preview(&long);
        assert!(shown.ends_with('…'));
        assert_eq!(shown.chars().count(), TOOL_RESULT_PREVIEW_CHARS + 1);
        assert_eq!(preview("short\ntext"), "short text");
    }

    #[test]
    fn test_format_entry_labels() {
        plain();
        let call = format_entry(&ConversationEntry::function_call("c1", "list_clients", json!({})));
        assert_eq!(call, "call: list_clients({}) [c1]");
        let user = format_entry(&ConversationEntry::user("hi"));
        assert_eq!(user, "you:\nhi");
    }

    #[test]
    fn test_format_tool_uses_first_description_line() {
        plain();
        let tool = ToolDescriptor::new("get_user", "Fetch a user.\nMore detail.", json!({}));
        assert_eq!(format_tool(&tool, Some("users")), "  get_user [users] Fetch a user.");
        let bare = ToolDescriptor::new("ping", "", json!({}));
        assert_eq!(format_tool(&bare, None), "  ping");
    }
}
