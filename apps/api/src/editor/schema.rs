//! Content-type schema resolver: which fields each kind carries.

use serde::Serialize;

use crate::editor::fields::FieldName;
use crate::models::content::{has_seo_block, ContentKind, EditableContent};

/// Static description of the form for one content kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDescriptor {
    pub kind: ContentKind,
    /// Kind-specific optional fields, in display order.
    pub fields: &'static [FieldName],
    /// Whether the SEO sub-block applies.
    pub seo: bool,
    /// Display label for the `company` field, where the kind has one.
    pub primary_label: Option<&'static str>,
    /// Kind-specific fields that must be non-empty to commit. Title is
    /// always required and not listed here.
    pub required: &'static [FieldName],
}

pub fn schema_for(kind: ContentKind) -> SchemaDescriptor {
    use FieldName::*;

    match kind {
        ContentKind::Article => descriptor(kind, &[ImageUrl, CategoryId, Views, Likes], None, &[]),
        ContentKind::Project => {
            descriptor(kind, &[ImageUrl, RepoUrl, LiveUrl, CategoryId], None, &[])
        }
        ContentKind::Experience => descriptor(
            kind,
            &[Company, Location, EndDate],
            Some("Company"),
            &[Company],
        ),
        ContentKind::Education => descriptor(
            kind,
            &[Company, Location, EndDate],
            Some("Institution"),
            &[Company],
        ),
        ContentKind::Skill => descriptor(kind, &[Proficiency], None, &[]),
        ContentKind::Certification => descriptor(
            kind,
            &[Company, EndDate, ImageUrl, LiveUrl],
            Some("Issuer"),
            &[],
        ),
        ContentKind::Award => descriptor(kind, &[Company, ImageUrl], Some("Issuer"), &[]),
        ContentKind::Testimonial => descriptor(kind, &[Company, ImageUrl], Some("Company"), &[]),
        ContentKind::Language => descriptor(kind, &[Proficiency], None, &[]),
        ContentKind::Strength => descriptor(kind, &[], None, &[]),
    }
}

fn descriptor(
    kind: ContentKind,
    fields: &'static [FieldName],
    primary_label: Option<&'static str>,
    required: &'static [FieldName],
) -> SchemaDescriptor {
    SchemaDescriptor {
        kind,
        fields,
        seo: has_seo_block(kind),
        primary_label,
        required,
    }
}

impl SchemaDescriptor {
    pub fn allows(&self, field: FieldName) -> bool {
        FieldName::GENERIC.contains(&field)
            || self.fields.contains(&field)
            || (self.seo && FieldName::SEO.contains(&field))
    }

    /// Every field a form for this kind shows.
    pub fn applicable_fields(&self) -> Vec<FieldName> {
        let mut all = FieldName::GENERIC.to_vec();
        all.extend_from_slice(self.fields);
        if self.seo {
            all.extend_from_slice(FieldName::SEO);
        }
        all
    }

    /// Required fields that are blank on `draft`.
    pub fn missing_required(&self, draft: &EditableContent) -> Vec<FieldName> {
        let mut missing = Vec::new();
        if draft.title.trim().is_empty() {
            missing.push(FieldName::Title);
        }
        for &field in self.required {
            let blank = match field {
                FieldName::Company => draft
                    .attributes
                    .company()
                    .map_or(true, |c| c.trim().is_empty()),
                FieldName::Content => draft.content.trim().is_empty(),
                _ => false,
            };
            if blank {
                missing.push(field);
            }
        }
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_seo_only_for_article_and_project() {
        for kind in ContentKind::ALL {
            let schema = schema_for(kind);
            let expected = matches!(kind, ContentKind::Article | ContentKind::Project);
            assert_eq!(schema.seo, expected, "{kind}");
            assert_eq!(schema.allows(FieldName::SeoTitle), expected);
        }
    }

    #[test]
    fn test_primary_labels() {
        assert_eq!(schema_for(ContentKind::Education).primary_label, Some("Institution"));
        assert_eq!(schema_for(ContentKind::Certification).primary_label, Some("Issuer"));
        assert_eq!(schema_for(ContentKind::Experience).primary_label, Some("Company"));
        assert_eq!(schema_for(ContentKind::Testimonial).primary_label, Some("Company"));
        assert_eq!(schema_for(ContentKind::Skill).primary_label, None);
    }

    #[test]
    fn test_skill_has_no_repo_url() {
        let schema = schema_for(ContentKind::Skill);
        assert!(!schema.allows(FieldName::RepoUrl));
        assert!(schema.allows(FieldName::Proficiency));
        assert!(schema.allows(FieldName::Title));
    }

    #[test]
    fn test_missing_required() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut draft = EditableContent::blank(ContentKind::Experience, today);
        let schema = schema_for(ContentKind::Experience);
        assert_eq!(
            schema.missing_required(&draft),
            vec![FieldName::Title, FieldName::Company]
        );

        draft.title = "Staff Engineer".to_string();
        assert_eq!(schema.missing_required(&draft), vec![FieldName::Company]);
    }

    #[test]
    fn test_schema_serializes_wire_names() {
        let json = serde_json::to_value(schema_for(ContentKind::Project)).unwrap();
        assert_eq!(json["kind"], "project");
        assert_eq!(json["fields"][1], "repoUrl");
        assert_eq!(json["seo"], true);
    }
}
