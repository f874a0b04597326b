use serde::{Deserialize, Serialize};

use crate::models::content::EditableContent;

pub const MAX_SCORE: u8 = 100;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QualityCheck {
    pub label: String,
    pub points: u8,
    pub passed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QualityReport {
    pub score: u8,
    pub checks: Vec<QualityCheck>,
}

/// Content-quality heuristic shown live in the editor.
///
/// | check                                | points |
/// |--------------------------------------|--------|
/// | title longer than 10 chars           | 20     |
/// | body longer than 100 chars           | 20     |
/// | body longer than 500 chars           | 10     |
/// | body has a line starting `# `        | 10     |
/// | body has a line starting `## `       | 10     |
/// | excerpt longer than 50 chars         | 20     |
/// | tag text longer than 3 chars         | 10     |
///
/// Heading checks look at line starts only and count hashes exactly: a
/// `## ` line earns the second-level points but not the top-level ones,
/// `### ` earns neither, and `#tag` without a space is not a heading.
///
/// The sum is capped at [`MAX_SCORE`].
pub fn assess_quality(draft: &EditableContent) -> QualityReport {
    let body_len = draft.content.chars().count();

    let rules: [(&str, u8, bool); 7] = [
        ("Title longer than 10 characters", 20, draft.title.chars().count() > 10),
        ("Body longer than 100 characters", 20, body_len > 100),
        ("Body longer than 500 characters", 10, body_len > 500),
        ("Body has a top-level heading", 10, has_heading(&draft.content, 1)),
        ("Body has a second-level heading", 10, has_heading(&draft.content, 2)),
        ("Excerpt longer than 50 characters", 20, draft.excerpt.chars().count() > 50),
        ("Tags filled in", 10, draft.tags.chars().count() > 3),
    ];

    let sum: u32 = rules
        .iter()
        .filter(|(_, _, passed)| *passed)
        .map(|(_, points, _)| u32::from(*points))
        .sum();

    QualityReport {
        score: sum.min(u32::from(MAX_SCORE)) as u8,
        checks: rules
            .into_iter()
            .map(|(label, points, passed)| QualityCheck {
                label: label.to_string(),
                points,
                passed,
            })
            .collect(),
    }
}

/// True if some line opens with exactly `level` `#` characters and a space.
fn has_heading(body: &str, level: usize) -> bool {
    body.lines().any(|line| {
        let line = line.trim_start();
        let hashes = line.chars().take_while(|&c| c == '#').count();
        hashes == level && line[hashes..].starts_with(' ')
    })
}
