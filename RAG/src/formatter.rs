//! Cleans raw model output and reshapes it into bullet points.

use regex::Regex;
use std::sync::LazyLock;

pub const EMPTY_ASSESSMENT: &str = "• No clear assessment could be provided for this rule.";

const BULLET: &str = "• ";

/// Fraction of non-empty lines that must already be bulleted.
const FORMATTED_LINE_RATIO: f64 = 0.3;
const MIN_POINT_CHARS: usize = 10;
const MAX_POINTS: usize = 5;

const POINT_SEPARATORS: [&str; 8] = [
    ". ",
    "; ",
    ", and ",
    ", or ",
    " Also, ",
    " Additionally, ",
    " Furthermore, ",
    " Moreover, ",
];

static RE_THINK_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<think>.*?</think>").expect("think block regex"));
static RE_THINK_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</?think[^>]*>").expect("think tag regex"));
static RE_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex"));
static RE_FORMATTED_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[•·▪▫‣⁃]|[-*]|\d+\.|[a-zA-Z]\.)\s").expect("formatted line regex")
});
static RE_LEADING_BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[•·▪▫‣⁃\-*]\s*").expect("leading bullet regex"));

pub fn clean_and_format_response(response: &str) -> String {
    let cleaned = RE_THINK_BLOCK.replace_all(response, "");
    let cleaned = RE_THINK_TAG.replace_all(&cleaned, "");
    let cleaned = RE_WHITESPACE.replace_all(&cleaned, " ");
    let cleaned = cleaned.trim();

    if cleaned.is_empty() {
        return EMPTY_ASSESSMENT.to_string();
    }

    if is_already_formatted(cleaned) {
        return cleaned.to_string();
    }

    format_as_points(cleaned)
}

pub fn is_already_formatted(text: &str) -> bool {
    let non_empty: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    if non_empty.is_empty() {
        return false;
    }

    let formatted = non_empty
        .iter()
        .filter(|line| RE_FORMATTED_LINE.is_match(line))
        .count();

    formatted as f64 / non_empty.len() as f64 > FORMATTED_LINE_RATIO
}

pub fn format_as_points(text: &str) -> String {
    let points = split_into_logical_points(text);

    if points.len() <= 1 {
        return format!("{BULLET}{text}");
    }

    points
        .iter()
        .map(|point| point.trim())
        .filter(|point| !point.is_empty())
        .map(|point| format!("{BULLET}{}", RE_LEADING_BULLET.replace(point, "")))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn split_into_logical_points(text: &str) -> Vec<String> {
    let mut points = vec![text.to_string()];

    for separator in POINT_SEPARATORS {
        let mut next = Vec::with_capacity(points.len());

        for point in points {
            if !point.contains(separator) {
                next.push(point);
                continue;
            }

            let pieces: Vec<&str> = point.split(separator).collect();
            let last = pieces.len() - 1;
            for (i, piece) in pieces.into_iter().enumerate() {
                let piece = piece.trim();
                if piece.is_empty() {
                    continue;
                }
                let mut piece = piece.to_string();
                // Splitting on ". " eats the full stop of every sentence but the last.
                if separator == ". " && i < last && !piece.ends_with('.') {
                    piece.push('.');
                }
                next.push(piece);
            }
        }

        points = next;
    }

    let points: Vec<String> = points
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| p.chars().count() > MIN_POINT_CHARS)
        .collect();

    if points.is_empty() || points.len() > MAX_POINTS {
        return vec![text.to_string()];
    }

    points
}
