//! Save pipeline: turns an in-memory draft into the commit payload.

use crate::models::content::{CommitPayload, EditableContent, SeoRecord};

/// Lower-cases `title`, collapses every run of characters outside `[a-z0-9]`
/// into one hyphen and strips hyphens from both ends.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;
    for c in title.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

/// Splits comma-separated tag text, trimming entries and dropping empties.
pub fn parse_tags(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

/// Assembles the payload for `draft`.
///
/// A new draft without a slug gets one derived from its title. Drafts with
/// an identity keep their slug as-is so existing permalinks never move.
pub fn build_payload(draft: &EditableContent) -> CommitPayload {
    let tags = parse_tags(&draft.tags);

    let slug = if draft.id.is_none() && draft.slug.trim().is_empty() {
        slugify(&draft.title)
    } else {
        draft.slug.trim().to_string()
    };

    let seo = draft.seo.as_ref().map(|overrides| SeoRecord {
        title: non_empty_or(&overrides.title, &draft.title),
        description: non_empty_or(&overrides.description, &draft.excerpt),
        keywords: if overrides.keywords.trim().is_empty() {
            tags.clone()
        } else {
            parse_tags(&overrides.keywords)
        },
    });

    CommitPayload {
        id: draft.id,
        title: draft.title.trim().to_string(),
        slug,
        content: draft.content.clone(),
        tags,
        status: draft.status,
        date: draft.date,
        excerpt: draft.excerpt.clone(),
        attributes: draft.attributes.clone(),
        seo,
    }
}
