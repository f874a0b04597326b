//! Field names at the edit boundary and the typed assignment of raw input.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::editor::schema::schema_for;
use crate::editor::session::SessionError;
use crate::models::content::{ContentStatus, EditableContent, KindAttributes};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldName {
    Title,
    Slug,
    Content,
    Tags,
    Status,
    Date,
    Excerpt,
    Company,
    Location,
    EndDate,
    ImageUrl,
    RepoUrl,
    LiveUrl,
    Views,
    Likes,
    CategoryId,
    Proficiency,
    SeoTitle,
    SeoDescription,
    SeoKeywords,
}

impl FieldName {
    /// Fields every kind has.
    pub const GENERIC: &'static [FieldName] = &[
        FieldName::Title,
        FieldName::Slug,
        FieldName::Content,
        FieldName::Tags,
        FieldName::Status,
        FieldName::Date,
        FieldName::Excerpt,
    ];

    pub const SEO: &'static [FieldName] = &[
        FieldName::SeoTitle,
        FieldName::SeoDescription,
        FieldName::SeoKeywords,
    ];

    const ALL: [FieldName; 20] = [
        FieldName::Title,
        FieldName::Slug,
        FieldName::Content,
        FieldName::Tags,
        FieldName::Status,
        FieldName::Date,
        FieldName::Excerpt,
        FieldName::Company,
        FieldName::Location,
        FieldName::EndDate,
        FieldName::ImageUrl,
        FieldName::RepoUrl,
        FieldName::LiveUrl,
        FieldName::Views,
        FieldName::Likes,
        FieldName::CategoryId,
        FieldName::Proficiency,
        FieldName::SeoTitle,
        FieldName::SeoDescription,
        FieldName::SeoKeywords,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldName::Title => "title",
            FieldName::Slug => "slug",
            FieldName::Content => "content",
            FieldName::Tags => "tags",
            FieldName::Status => "status",
            FieldName::Date => "date",
            FieldName::Excerpt => "excerpt",
            FieldName::Company => "company",
            FieldName::Location => "location",
            FieldName::EndDate => "endDate",
            FieldName::ImageUrl => "imageUrl",
            FieldName::RepoUrl => "repoUrl",
            FieldName::LiveUrl => "liveUrl",
            FieldName::Views => "views",
            FieldName::Likes => "likes",
            FieldName::CategoryId => "categoryId",
            FieldName::Proficiency => "proficiency",
            FieldName::SeoTitle => "seoTitle",
            FieldName::SeoDescription => "seoDescription",
            FieldName::SeoKeywords => "seoKeywords",
        }
    }

    /// Fields that may be populated from an uploaded file.
    pub fn accepts_upload(&self) -> bool {
        matches!(self, FieldName::ImageUrl)
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldName {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldName::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| SessionError::UnknownField(s.to_string()))
    }
}

/// Assigns `raw` to `field` on `draft`.
///
/// Returns `Ok(false)` without touching the draft when the field is not part
/// of the draft's schema. A value that does not parse for a typed field is an
/// error and also leaves the draft untouched.
pub fn apply_field(
    draft: &mut EditableContent,
    field: FieldName,
    raw: &str,
) -> Result<bool, SessionError> {
    if !schema_for(draft.kind()).allows(field) {
        return Ok(false);
    }

    match field {
        FieldName::Title => draft.title = raw.to_string(),
        FieldName::Slug => draft.slug = raw.to_string(),
        FieldName::Content => draft.content = raw.to_string(),
        FieldName::Tags => draft.tags = raw.to_string(),
        FieldName::Excerpt => draft.excerpt = raw.to_string(),
        FieldName::Status => {
            draft.status = raw
                .trim()
                .parse::<ContentStatus>()
                .map_err(|reason| invalid(field, reason))?
        }
        FieldName::Date => draft.date = parse_date(field, raw)?,
        FieldName::SeoTitle | FieldName::SeoDescription | FieldName::SeoKeywords => {
            let Some(seo) = draft.seo.as_mut() else {
                return Ok(false);
            };
            match field {
                FieldName::SeoTitle => seo.title = raw.to_string(),
                FieldName::SeoDescription => seo.description = raw.to_string(),
                _ => seo.keywords = raw.to_string(),
            }
        }
        _ => return apply_attribute(&mut draft.attributes, field, raw),
    }
    Ok(true)
}

fn apply_attribute(
    attributes: &mut KindAttributes,
    field: FieldName,
    raw: &str,
) -> Result<bool, SessionError> {
    use FieldName as F;
    use KindAttributes as K;

    match (attributes, field) {
        (K::Article(a), F::ImageUrl) => a.image_url = raw.to_string(),
        (K::Article(a), F::CategoryId) => a.category_id = parse_uuid(field, raw)?,
        (K::Article(a), F::Views) => a.views = parse_count(field, raw)?,
        (K::Article(a), F::Likes) => a.likes = parse_count(field, raw)?,

        (K::Project(p), F::ImageUrl) => p.image_url = raw.to_string(),
        (K::Project(p), F::RepoUrl) => p.repo_url = raw.to_string(),
        (K::Project(p), F::LiveUrl) => p.live_url = raw.to_string(),
        (K::Project(p), F::CategoryId) => p.category_id = parse_uuid(field, raw)?,

        (K::Experience(t) | K::Education(t), F::Company) => t.company = raw.to_string(),
        (K::Experience(t) | K::Education(t), F::Location) => t.location = raw.to_string(),
        (K::Experience(t) | K::Education(t), F::EndDate) => t.end_date = parse_date(field, raw)?,

        (K::Skill(s) | K::Language(s), F::Proficiency) => {
            s.proficiency = parse_proficiency(field, raw)?
        }

        (K::Certification(c), F::Company) => c.company = raw.to_string(),
        (K::Certification(c), F::EndDate) => c.end_date = parse_date(field, raw)?,
        (K::Certification(c), F::ImageUrl) => c.image_url = raw.to_string(),
        (K::Certification(c), F::LiveUrl) => c.live_url = raw.to_string(),

        (K::Award(o) | K::Testimonial(o), F::Company) => o.company = raw.to_string(),
        (K::Award(o) | K::Testimonial(o), F::ImageUrl) => o.image_url = raw.to_string(),

        _ => return Ok(false),
    }
    Ok(true)
}

fn invalid(field: FieldName, reason: impl Into<String>) -> SessionError {
    SessionError::InvalidValue {
        field,
        reason: reason.into(),
    }
}

fn parse_date(field: FieldName, raw: &str) -> Result<Option<NaiveDate>, SessionError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| invalid(field, format!("'{raw}' is not a YYYY-MM-DD date")))
}

fn parse_uuid(field: FieldName, raw: &str) -> Result<Option<Uuid>, SessionError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    Uuid::parse_str(raw)
        .map(Some)
        .map_err(|_| invalid(field, format!("'{raw}' is not a UUID")))
}

fn parse_count(field: FieldName, raw: &str) -> Result<u64, SessionError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0);
    }
    raw.parse::<u64>()
        .map_err(|_| invalid(field, format!("'{raw}' is not a non-negative integer")))
}

fn parse_proficiency(field: FieldName, raw: &str) -> Result<Option<u8>, SessionError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    match raw.parse::<u8>() {
        Ok(p) if p <= 100 => Ok(Some(p)),
        _ => Err(invalid(field, format!("'{raw}' is not between 0 and 100"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::content::ContentKind;

    fn blank(kind: ContentKind) -> EditableContent {
        EditableContent::blank(kind, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
    }

    #[test]
    fn test_wire_names_parse_back() {
        for field in FieldName::ALL {
            assert_eq!(field.as_str().parse::<FieldName>().unwrap(), field);
        }
        assert!(matches!(
            "repo_url".parse::<FieldName>(),
            Err(SessionError::UnknownField(_))
        ));
    }

    #[test]
    fn test_every_schema_field_is_assignable() {
        for kind in ContentKind::ALL {
            let schema = schema_for(kind);
            for field in schema.applicable_fields() {
                let mut draft = blank(kind);
                let raw = match field {
                    FieldName::Status => "published",
                    FieldName::Date | FieldName::EndDate => "2023-05-01",
                    FieldName::Views | FieldName::Likes | FieldName::Proficiency => "42",
                    FieldName::CategoryId => "67e55044-10b1-426f-9247-bb680e5fe0c8",
                    _ => "value",
                };
                assert!(
                    apply_field(&mut draft, field, raw).unwrap(),
                    "{kind} should accept {field}"
                );
            }
        }
    }

    #[test]
    fn test_out_of_schema_fields_are_ignored() {
        for kind in ContentKind::ALL {
            let schema = schema_for(kind);
            for field in FieldName::ALL {
                if schema.allows(field) {
                    continue;
                }
                let mut draft = blank(kind);
                let before = draft.clone();
                assert!(!apply_field(&mut draft, field, "x").unwrap());
                assert_eq!(draft, before, "{kind} must ignore {field}");
            }
        }
    }

    #[test]
    fn test_invalid_typed_value_leaves_draft_untouched() {
        let mut draft = blank(ContentKind::Skill);
        let before = draft.clone();
        let err = apply_field(&mut draft, FieldName::Proficiency, "140").unwrap_err();
        assert!(matches!(err, SessionError::InvalidValue { .. }));
        assert_eq!(draft, before);

        assert!(apply_field(&mut draft, FieldName::Date, "yesterday").is_err());
        assert_eq!(draft, before);
    }

    #[test]
    fn test_empty_date_clears() {
        let mut draft = blank(ContentKind::Article);
        assert!(apply_field(&mut draft, FieldName::Date, "").unwrap());
        assert_eq!(draft.date, None);
    }
}
