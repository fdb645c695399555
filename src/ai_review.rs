//! Extraction of structured suggestions from AI-generated review bodies.
//!
//! Review bodies arrive as markdown with collapsible `<details>` sections. Each section has a
//! type (nitpicks, duplicates, additional comments, actionable), each nested section names a
//! file, and each item inside looks like ``` `12-15`: **Title** ``` followed by a description
//! and an optional `diff` block. The parser is a line-driven state machine; turning its output
//! into [`Comment`]s happens in [`review_to_comments`].

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::github::GitHubReview;
use crate::models::{
    AiReviewMetadata, Category, CodeSuggestion, Comment, CommentType, PullRequestRef, Severity,
    SuggestionType,
};
use crate::normalize::{association, author_fields, build_action_commands};

/// Lines scanned after an item header before the item is closed.
pub const ITEM_LOOKAHEAD: usize = 20;

const NIT_ICON: char = '🧹';
const DUPLICATE_ICON: char = '♻';
const ADDITIONAL_ICON: char = '📜';

static SUMMARY_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<summary>\s*(.*?)\s*</summary>").expect("summary regex"));
static ITEM_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^`?(\d+)(?:\s*-\s*(\d+))?`?\s*:\s*\*\*(.+?)\*\*\s*$").expect("item regex")
});
static COUNT_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\(\d+\)\s*$").expect("count regex"));

const CATEGORY_KEYWORDS: [(Category, &[&str]); 4] = [
    (
        Category::Security,
        &[
            "security",
            "vulnerab",
            "injection",
            "xss",
            "csrf",
            "secret",
            "credential",
            "authentication",
            "authorization",
            "sanitiz",
        ],
    ),
    (
        Category::Performance,
        &[
            "performance",
            "slow",
            "optimi",
            "memory",
            "allocation",
            "complexity",
            "inefficient",
        ],
    ),
    (
        Category::Style,
        &["style", "format", "lint", "naming", "whitespace", "indent", "typo"],
    ),
    (
        Category::Bug,
        &["error", "bug", "crash", "panic", "exception", "incorrect", "null"],
    ),
];

/// Per-request generator for the negative ids given to synthetic comments.
#[derive(Debug)]
pub struct SyntheticIds {
    next: i64,
}

impl Default for SyntheticIds {
    fn default() -> Self {
        Self { next: -1 }
    }
}

impl SyntheticIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> i64 {
        let id = self.next;
        self.next -= 1;
        id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSuggestion {
    pub suggestion_type: SuggestionType,
    pub severity: Severity,
    pub category: Category,
    pub file_path: String,
    pub line_start: Option<u64>,
    pub line_end: Option<u64>,
    pub title: String,
    pub description: String,
    pub code_suggestion: Option<CodeSuggestion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    SeekingSection,
    InSection,
    InItem,
    InDiff,
}

#[derive(Debug)]
struct ItemDraft {
    suggestion_type: SuggestionType,
    file_path: String,
    line_start: Option<u64>,
    line_end: Option<u64>,
    title: String,
    lines: Vec<String>,
    old_lines: Vec<String>,
    new_lines: Vec<String>,
    scanned: usize,
}

enum Header {
    Section(SuggestionType),
    File(String),
    Other,
}

struct ReviewBodyParser {
    state: ParseState,
    section: Option<SuggestionType>,
    file: Option<String>,
    item: Option<ItemDraft>,
    parsed: Vec<ParsedSuggestion>,
}

/// Parses every suggestion item out of a review body. Bodies without the format yield nothing.
pub fn parse_review_body(body: &str) -> Vec<ParsedSuggestion> {
    let mut parser = ReviewBodyParser {
        state: ParseState::SeekingSection,
        section: None,
        file: None,
        item: None,
        parsed: Vec::new(),
    };
    for line in body.lines() {
        parser.feed(line.trim_end_matches('\r'));
    }
    parser.finish_item();
    parser.parsed
}

impl ReviewBodyParser {
    fn feed(&mut self, line: &str) {
        match self.state {
            ParseState::SeekingSection => self.seek_section(line),
            ParseState::InSection => self.seek_item(line),
            ParseState::InItem => self.collect_description(line),
            ParseState::InDiff => self.collect_diff(line),
        }
    }

    fn seek_section(&mut self, line: &str) {
        match classify_header(line, false) {
            Some(Header::Section(kind)) => self.enter_section(kind),
            Some(Header::File(path)) => {
                self.enter_section(SuggestionType::Actionable);
                self.file = Some(path);
            }
            Some(Header::Other) | None => {}
        }
    }

    fn seek_item(&mut self, line: &str) {
        if let Some(header) = classify_header(line, true) {
            match header {
                Header::Section(kind) => self.enter_section(kind),
                Header::File(path) => {
                    debug!(file = %path, "review section file");
                    self.file = Some(path);
                }
                Header::Other => {}
            }
            return;
        }

        if let Some(caps) = ITEM_LINE.captures(line.trim()) {
            let line_start = caps.get(1).and_then(|m| m.as_str().parse().ok());
            let line_end = caps
                .get(2)
                .and_then(|m| m.as_str().parse().ok())
                .or(line_start);
            let title = caps
                .get(3)
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default();
            self.item = Some(ItemDraft {
                suggestion_type: self.section.unwrap_or(SuggestionType::Actionable),
                file_path: self.file.clone().unwrap_or_default(),
                line_start,
                line_end,
                title,
                lines: Vec::new(),
                old_lines: Vec::new(),
                new_lines: Vec::new(),
                scanned: 0,
            });
            self.state = ParseState::InItem;
        }
    }

    fn collect_description(&mut self, line: &str) {
        if self.lookahead_exhausted() || ends_item(line) {
            self.finish_item();
            self.seek_item(line);
            return;
        }

        let trimmed = line.trim();
        if let Some(item) = self.item.as_mut() {
            item.scanned += 1;
            if trimmed.starts_with("```") {
                item.lines.push(trimmed.to_string());
                if trimmed.trim_start_matches('`').trim() == "diff" {
                    self.state = ParseState::InDiff;
                }
            } else if !is_markup_only(trimmed) {
                item.lines.push(line.trim_end().to_string());
            }
        }
    }

    fn collect_diff(&mut self, line: &str) {
        if self.lookahead_exhausted() {
            self.finish_item();
            self.seek_item(line);
            return;
        }

        let Some(item) = self.item.as_mut() else {
            self.state = ParseState::InSection;
            return;
        };
        item.scanned += 1;
        let content = line.trim_end();
        item.lines.push(content.to_string());

        if content.trim_start().starts_with("```") {
            self.state = ParseState::InItem;
        } else if let Some(old) = content.strip_prefix('-').filter(|_| !content.starts_with("---")) {
            item.old_lines.push(old.to_string());
        } else if let Some(new) = content.strip_prefix('+').filter(|_| !content.starts_with("+++")) {
            item.new_lines.push(new.to_string());
        }
    }

    fn lookahead_exhausted(&self) -> bool {
        self.item
            .as_ref()
            .map(|item| item.scanned >= ITEM_LOOKAHEAD)
            .unwrap_or(true)
    }

    fn enter_section(&mut self, kind: SuggestionType) {
        debug!(section = ?kind, "review section");
        self.section = Some(kind);
        self.file = None;
        self.state = ParseState::InSection;
    }

    fn finish_item(&mut self) {
        if let Some(item) = self.item.take() {
            self.parsed.push(item.into_suggestion());
        }
        if self.section.is_some() {
            self.state = ParseState::InSection;
        } else {
            self.state = ParseState::SeekingSection;
        }
    }
}

impl ItemDraft {
    fn into_suggestion(self) -> ParsedSuggestion {
        let description = trim_blank_lines(&self.lines);
        let category = infer_category(&format!("{}\n{}", self.title, description));
        let code_suggestion = if self.old_lines.is_empty() && self.new_lines.is_empty() {
            None
        } else {
            Some(CodeSuggestion {
                old_code: self.old_lines.join("\n"),
                new_code: self.new_lines.join("\n"),
                language: language_for_path(&self.file_path).to_string(),
            })
        };

        ParsedSuggestion {
            suggestion_type: self.suggestion_type,
            severity: Severity::for_suggestion(self.suggestion_type),
            category,
            file_path: self.file_path,
            line_start: self.line_start,
            line_end: self.line_end,
            title: self.title,
            description,
            code_suggestion,
        }
    }
}

fn classify_header(line: &str, in_section: bool) -> Option<Header> {
    let caps = SUMMARY_LINE.captures(line)?;
    let title = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();

    if let Some(path) = file_header_path(title) {
        return Some(Header::File(path));
    }
    if in_section && !is_section_title(title) {
        // Nested folds inside a section: proposed fixes, tool output, agent prompts.
        return Some(Header::Other);
    }
    if let Some(kind) = section_icon(title) {
        return Some(Header::Section(kind));
    }
    Some(Header::Section(SuggestionType::Actionable))
}

/// Section folds are titled like `🧹 Nitpick comments (3)`.
fn is_section_title(title: &str) -> bool {
    COUNT_SUFFIX
        .replace(title, "")
        .trim()
        .to_lowercase()
        .ends_with("comments")
}

fn section_icon(title: &str) -> Option<SuggestionType> {
    if title.contains(NIT_ICON) {
        Some(SuggestionType::Nit)
    } else if title.contains(DUPLICATE_ICON) {
        Some(SuggestionType::Duplicate)
    } else if title.contains(ADDITIONAL_ICON) {
        Some(SuggestionType::Additional)
    } else {
        None
    }
}

fn file_header_path(title: &str) -> Option<String> {
    let candidate = COUNT_SUFFIX.replace(title, "");
    let candidate = candidate.trim().trim_matches('`');
    let looks_like_path = !candidate.is_empty()
        && !candidate.chars().any(char::is_whitespace)
        && (candidate.contains('/') || candidate.contains('.'))
        && !candidate.ends_with('.');
    looks_like_path.then(|| candidate.to_string())
}

fn ends_item(line: &str) -> bool {
    let trimmed = line.trim();
    is_horizontal_rule(trimmed)
        || trimmed.starts_with("</blockquote>")
        || ITEM_LINE.is_match(trimmed)
}

fn is_horizontal_rule(trimmed: &str) -> bool {
    trimmed.len() >= 3
        && ['-', '*', '_']
            .iter()
            .any(|mark| trimmed.chars().all(|c| c == *mark))
}

fn is_markup_only(trimmed: &str) -> bool {
    trimmed.starts_with('<') && trimmed.ends_with('>')
}

fn trim_blank_lines(lines: &[String]) -> String {
    let start = lines.iter().position(|l| !l.trim().is_empty());
    let end = lines.iter().rposition(|l| !l.trim().is_empty());
    match (start, end) {
        (Some(start), Some(end)) => lines[start..=end].join("\n"),
        _ => String::new(),
    }
}

pub fn infer_category(text: &str) -> Category {
    let lower = text.to_lowercase();
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|word| lower.contains(word)))
        .map(|(category, _)| *category)
        .unwrap_or(Category::General)
}

pub fn language_for_path(path: &str) -> &'static str {
    let ext = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "rs" => "rust",
        "ts" => "typescript",
        "tsx" => "tsx",
        "js" | "mjs" | "cjs" => "javascript",
        "jsx" => "jsx",
        "py" => "python",
        "go" => "go",
        "java" => "java",
        "rb" => "ruby",
        "kt" => "kotlin",
        "swift" => "swift",
        "c" | "h" => "c",
        "cpp" | "cc" | "hpp" => "cpp",
        "cs" => "csharp",
        "md" | "markdown" => "markdown",
        "yaml" | "yml" => "yaml",
        "json" => "json",
        "toml" => "toml",
        "sh" | "bash" => "bash",
        _ => "text",
    }
}

fn priority_label(severity: Severity) -> &'static str {
    match severity {
        Severity::High => "high",
        Severity::Medium => "medium",
        Severity::Low => "low",
    }
}

fn effort_label(code: &CodeSuggestion) -> &'static str {
    let changed = code.old_code.lines().count().max(code.new_code.lines().count());
    match changed {
        0..=3 => "small",
        4..=15 => "medium",
        _ => "large",
    }
}

fn type_label(kind: SuggestionType) -> &'static str {
    match kind {
        SuggestionType::Nit => "nitpick",
        SuggestionType::Duplicate => "duplicate",
        SuggestionType::Additional => "additional",
        SuggestionType::Actionable => "actionable",
    }
}

/// Guidance text for an agent picking up the suggestion. `None` for items that are neither
/// actionable nor carry code.
pub fn build_agent_prompt(item: &ParsedSuggestion) -> Option<String> {
    if item.code_suggestion.is_none() && item.suggestion_type != SuggestionType::Actionable {
        return None;
    }

    let location = match (item.line_start, item.line_end) {
        (Some(start), Some(end)) if end != start => format!("lines {start}-{end}"),
        (Some(start), _) => format!("line {start}"),
        _ => "the reported location".to_string(),
    };
    let file = if item.file_path.is_empty() {
        "the affected file"
    } else {
        item.file_path.as_str()
    };

    let mut prompt = format!(
        "Address the {} review suggestion in `{file}` at {location}: {}.",
        type_label(item.suggestion_type),
        item.title
    );
    if let Some(code) = &item.code_suggestion {
        if !code.old_code.is_empty() {
            prompt.push_str(&format!(
                "\n\nCurrent code:\n```{}\n{}\n```",
                code.language, code.old_code
            ));
        }
        if !code.new_code.is_empty() {
            prompt.push_str(&format!(
                "\n\nSuggested code:\n```{}\n{}\n```",
                code.language, code.new_code
            ));
        }
        prompt.push_str(&format!(
            "\n\nSuggested priority: {}. Estimated effort: {}.",
            priority_label(item.severity),
            effort_label(code)
        ));
    } else {
        prompt.push_str(&format!(
            "\n\nSuggested priority: {}.",
            priority_label(item.severity)
        ));
    }
    Some(prompt)
}

/// Turns a parsed suggestion into a synthetic comment attributed to the review's author,
/// timestamped with the review's submission time.
pub fn suggestion_to_comment(
    item: ParsedSuggestion,
    review: &GitHubReview,
    submitted: DateTime<Utc>,
    pr: &PullRequestRef,
    ids: &mut SyntheticIds,
) -> Comment {
    let (author, is_bot) = author_fields(review.user.as_ref());
    let id = ids.next_id();
    let agent_prompt = build_agent_prompt(&item);

    let body = if item.description.is_empty() {
        item.title.clone()
    } else {
        format!("{}\n\n{}", item.title, item.description)
    };
    let (start_line, line_number) = match (item.line_start, item.line_end) {
        (Some(start), Some(end)) if end != start => (Some(start), Some(end)),
        (start, _) => (None, start),
    };
    let file_path = (!item.file_path.is_empty()).then(|| item.file_path.clone());

    Comment {
        id,
        comment_type: CommentType::AiReviewItem,
        author,
        author_association: association(review.author_association.as_deref()),
        is_bot,
        created_at: submitted,
        updated_at: submitted,
        file_path,
        line_number,
        start_line,
        diff_hunk: None,
        body,
        in_reply_to_id: None,
        outdated: None,
        reactions: None,
        html_url: review.html_url.clone(),
        action_commands: build_action_commands(
            pr,
            CommentType::AiReviewItem,
            id,
            &review.html_url,
            None,
        ),
        ai_review_metadata: Some(AiReviewMetadata {
            suggestion_type: item.suggestion_type,
            severity: item.severity,
            category: item.category,
            file_path: item.file_path,
            line_start: item.line_start,
            line_end: item.line_end,
            code_suggestion: item.code_suggestion,
            agent_prompt,
        }),
        status_indicators: None,
    }
}

pub fn review_to_comments(
    review: &GitHubReview,
    pr: &PullRequestRef,
    ids: &mut SyntheticIds,
) -> Vec<Comment> {
    let Some(body) = review.body.as_deref().filter(|b| !b.trim().is_empty()) else {
        return Vec::new();
    };
    // Pending reviews have no submission time and are only visible to their author.
    let Some(submitted) = review.submitted_at else {
        debug!(review_id = review.id, "skipping unsubmitted review");
        return Vec::new();
    };
    let items = parse_review_body(body);
    if !items.is_empty() {
        debug!(review_id = review.id, items = items.len(), "parsed AI review items");
    }
    items
        .into_iter()
        .map(|item| suggestion_to_comment(item, review, submitted, pr, ids))
        .collect()
}
