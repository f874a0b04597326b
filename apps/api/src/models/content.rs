use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The closed set of authorable content kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Article,
    Project,
    Experience,
    Education,
    Skill,
    Certification,
    Award,
    Testimonial,
    Language,
    Strength,
}

impl ContentKind {
    pub const ALL: [ContentKind; 10] = [
        ContentKind::Article,
        ContentKind::Project,
        ContentKind::Experience,
        ContentKind::Education,
        ContentKind::Skill,
        ContentKind::Certification,
        ContentKind::Award,
        ContentKind::Testimonial,
        ContentKind::Language,
        ContentKind::Strength,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Article => "article",
            ContentKind::Project => "project",
            ContentKind::Experience => "experience",
            ContentKind::Education => "education",
            ContentKind::Skill => "skill",
            ContentKind::Certification => "certification",
            ContentKind::Award => "award",
            ContentKind::Testimonial => "testimonial",
            ContentKind::Language => "language",
            ContentKind::Strength => "strength",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl ContentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentStatus::Draft => "draft",
            ContentStatus::Published => "published",
            ContentStatus::Archived => "archived",
        }
    }
}

impl FromStr for ContentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(ContentStatus::Draft),
            "published" => Ok(ContentStatus::Published),
            "archived" => Ok(ContentStatus::Archived),
            other => Err(format!("unknown status '{other}'")),
        }
    }
}

/// SEO overrides as typed by the author. Empty strings mean "fall back".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeoFields {
    pub title: String,
    pub description: String,
    pub keywords: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ArticleAttributes {
    pub image_url: String,
    pub category_id: Option<Uuid>,
    pub views: u64,
    pub likes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectAttributes {
    pub image_url: String,
    pub repo_url: String,
    pub live_url: String,
    pub category_id: Option<Uuid>,
}

/// Experience and education share the dated-position shape; `company`
/// is the employer or the institution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimelineAttributes {
    pub company: String,
    pub location: String,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProficiencyAttributes {
    pub proficiency: Option<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CredentialAttributes {
    pub company: String,
    pub end_date: Option<NaiveDate>,
    pub image_url: String,
    pub live_url: String,
}

/// Awards and testimonials: an issuing or endorsing organization plus an image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OrganizationAttributes {
    pub company: String,
    pub image_url: String,
}

/// Kind-dependent attributes. Only the fields valid for the active kind
/// can be constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KindAttributes {
    Article(ArticleAttributes),
    Project(ProjectAttributes),
    Experience(TimelineAttributes),
    Education(TimelineAttributes),
    Skill(ProficiencyAttributes),
    Certification(CredentialAttributes),
    Award(OrganizationAttributes),
    Testimonial(OrganizationAttributes),
    Language(ProficiencyAttributes),
    Strength,
}

impl KindAttributes {
    pub fn blank(kind: ContentKind) -> Self {
        match kind {
            ContentKind::Article => KindAttributes::Article(Default::default()),
            ContentKind::Project => KindAttributes::Project(Default::default()),
            ContentKind::Experience => KindAttributes::Experience(Default::default()),
            ContentKind::Education => KindAttributes::Education(Default::default()),
            ContentKind::Skill => KindAttributes::Skill(Default::default()),
            ContentKind::Certification => KindAttributes::Certification(Default::default()),
            ContentKind::Award => KindAttributes::Award(Default::default()),
            ContentKind::Testimonial => KindAttributes::Testimonial(Default::default()),
            ContentKind::Language => KindAttributes::Language(Default::default()),
            ContentKind::Strength => KindAttributes::Strength,
        }
    }

    pub fn kind(&self) -> ContentKind {
        match self {
            KindAttributes::Article(_) => ContentKind::Article,
            KindAttributes::Project(_) => ContentKind::Project,
            KindAttributes::Experience(_) => ContentKind::Experience,
            KindAttributes::Education(_) => ContentKind::Education,
            KindAttributes::Skill(_) => ContentKind::Skill,
            KindAttributes::Certification(_) => ContentKind::Certification,
            KindAttributes::Award(_) => ContentKind::Award,
            KindAttributes::Testimonial(_) => ContentKind::Testimonial,
            KindAttributes::Language(_) => ContentKind::Language,
            KindAttributes::Strength => ContentKind::Strength,
        }
    }

    /// The organization field, for kinds that carry one.
    pub fn company(&self) -> Option<&str> {
        match self {
            KindAttributes::Experience(a) | KindAttributes::Education(a) => Some(&a.company),
            KindAttributes::Certification(a) => Some(&a.company),
            KindAttributes::Award(a) | KindAttributes::Testimonial(a) => Some(&a.company),
            _ => None,
        }
    }

    fn write_flat(&self, record: &mut DraftRecord) {
        match self {
            KindAttributes::Article(a) => {
                record.image_url = Some(a.image_url.clone());
                record.category_id = a.category_id;
                record.views = Some(a.views);
                record.likes = Some(a.likes);
            }
            KindAttributes::Project(a) => {
                record.image_url = Some(a.image_url.clone());
                record.repo_url = Some(a.repo_url.clone());
                record.live_url = Some(a.live_url.clone());
                record.category_id = a.category_id;
            }
            KindAttributes::Experience(a) | KindAttributes::Education(a) => {
                record.company = Some(a.company.clone());
                record.location = Some(a.location.clone());
                record.end_date = a.end_date;
            }
            KindAttributes::Skill(a) | KindAttributes::Language(a) => {
                record.proficiency = a.proficiency;
            }
            KindAttributes::Certification(a) => {
                record.company = Some(a.company.clone());
                record.end_date = a.end_date;
                record.image_url = Some(a.image_url.clone());
                record.live_url = Some(a.live_url.clone());
            }
            KindAttributes::Award(a) | KindAttributes::Testimonial(a) => {
                record.company = Some(a.company.clone());
                record.image_url = Some(a.image_url.clone());
            }
            KindAttributes::Strength => {}
        }
    }

    /// Rebuilds the attributes of `kind` from a flat record, ignoring any
    /// stored field the kind does not have.
    fn from_flat(kind: ContentKind, r: &DraftRecord) -> Self {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        match kind {
            ContentKind::Article => KindAttributes::Article(ArticleAttributes {
                image_url: text(&r.image_url),
                category_id: r.category_id,
                views: r.views.unwrap_or(0),
                likes: r.likes.unwrap_or(0),
            }),
            ContentKind::Project => KindAttributes::Project(ProjectAttributes {
                image_url: text(&r.image_url),
                repo_url: text(&r.repo_url),
                live_url: text(&r.live_url),
                category_id: r.category_id,
            }),
            ContentKind::Experience | ContentKind::Education => {
                let timeline = TimelineAttributes {
                    company: text(&r.company),
                    location: text(&r.location),
                    end_date: r.end_date,
                };
                if kind == ContentKind::Experience {
                    KindAttributes::Experience(timeline)
                } else {
                    KindAttributes::Education(timeline)
                }
            }
            ContentKind::Skill | ContentKind::Language => {
                let attrs = ProficiencyAttributes {
                    proficiency: r.proficiency,
                };
                if kind == ContentKind::Skill {
                    KindAttributes::Skill(attrs)
                } else {
                    KindAttributes::Language(attrs)
                }
            }
            ContentKind::Certification => KindAttributes::Certification(CredentialAttributes {
                company: text(&r.company),
                end_date: r.end_date,
                image_url: text(&r.image_url),
                live_url: text(&r.live_url),
            }),
            ContentKind::Award | ContentKind::Testimonial => {
                let org = OrganizationAttributes {
                    company: text(&r.company),
                    image_url: text(&r.image_url),
                };
                if kind == ContentKind::Award {
                    KindAttributes::Award(org)
                } else {
                    KindAttributes::Testimonial(org)
                }
            }
            ContentKind::Strength => KindAttributes::Strength,
        }
    }
}

/// The in-memory draft being authored.
///
/// `tags` is kept as the comma-separated text typed by the author; it is
/// split into a list only when the commit payload is assembled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditableContent {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub status: ContentStatus,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub excerpt: String,
    pub attributes: KindAttributes,
    #[serde(default)]
    pub seo: Option<SeoFields>,
}

impl EditableContent {
    /// Blank defaults for new content of `kind`, dated `today`.
    pub fn blank(kind: ContentKind, today: NaiveDate) -> Self {
        let mut content = EditableContent {
            id: None,
            title: String::new(),
            slug: String::new(),
            content: String::new(),
            tags: String::new(),
            status: ContentStatus::Draft,
            date: Some(today),
            excerpt: String::new(),
            attributes: KindAttributes::blank(kind),
            seo: None,
        };
        content.normalize_seo();
        content
    }

    pub fn kind(&self) -> ContentKind {
        self.attributes.kind()
    }

    /// SEO overrides exist exactly for the kinds that publish an SEO block.
    pub fn normalize_seo(&mut self) {
        if has_seo_block(self.kind()) {
            self.seo.get_or_insert_with(SeoFields::default);
        } else {
            self.seo = None;
        }
    }

    /// Rebuilds a draft of `kind` from a stored snapshot.
    pub fn from_record(kind: ContentKind, id: Option<Uuid>, record: &DraftRecord) -> Self {
        let mut content = EditableContent {
            id,
            title: record.title.clone(),
            slug: record.slug.clone(),
            content: record.content.clone(),
            tags: record.tags.clone(),
            status: record.status,
            date: record.date,
            excerpt: record.excerpt.clone(),
            attributes: KindAttributes::from_flat(kind, record),
            seo: record.seo.clone(),
        };
        content.normalize_seo();
        content
    }
}

pub fn has_seo_block(kind: ContentKind) -> bool {
    matches!(kind, ContentKind::Article | ContentKind::Project)
}

/// The persisted JSON shape of an autosaved draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftRecord {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub status: ContentStatus,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub views: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proficiency: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seo: Option<SeoFields>,
    pub timestamp: DateTime<Utc>,
}

impl DraftRecord {
    pub fn capture(content: &EditableContent, timestamp: DateTime<Utc>) -> Self {
        let mut record = DraftRecord {
            title: content.title.clone(),
            slug: content.slug.clone(),
            content: content.content.clone(),
            tags: content.tags.clone(),
            status: content.status,
            date: content.date,
            excerpt: content.excerpt.clone(),
            company: None,
            location: None,
            end_date: None,
            image_url: None,
            repo_url: None,
            live_url: None,
            views: None,
            likes: None,
            category_id: None,
            proficiency: None,
            seo: content.seo.clone(),
            timestamp,
        };
        content.attributes.write_flat(&mut record);
        record
    }
}

/// The finished SEO block sent with a commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeoRecord {
    pub title: String,
    pub description: String,
    pub keywords: Vec<String>,
}

/// The normalized record handed to the commit collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitPayload {
    pub id: Option<Uuid>,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub tags: Vec<String>,
    pub status: ContentStatus,
    pub date: Option<NaiveDate>,
    pub excerpt: String,
    #[serde(flatten)]
    pub attributes: KindAttributes,
    pub seo: Option<SeoRecord>,
}

impl CommitPayload {
    pub fn kind(&self) -> ContentKind {
        self.attributes.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[test]
    fn test_kind_round_trips_through_str() {
        for kind in ContentKind::ALL {
            assert_eq!(kind.as_str().parse::<ContentKind>().unwrap(), kind);
        }
        assert!("blog".parse::<ContentKind>().is_err());
    }

    #[test]
    fn test_blank_has_seo_only_for_article_and_project() {
        for kind in ContentKind::ALL {
            let blank = EditableContent::blank(kind, today());
            assert_eq!(blank.kind(), kind);
            assert_eq!(blank.seo.is_some(), has_seo_block(kind), "kind {kind}");
            assert_eq!(blank.date, Some(today()));
        }
    }

    #[test]
    fn test_record_shape_is_flat_with_timestamp() {
        let mut draft = EditableContent::blank(ContentKind::Project, today());
        draft.title = "Alpha".to_string();
        if let KindAttributes::Project(p) = &mut draft.attributes {
            p.repo_url = "https://git.example/alpha".to_string();
        }
        let record = DraftRecord::capture(&draft, Utc::now());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["title"], "Alpha");
        assert_eq!(json["repoUrl"], "https://git.example/alpha");
        assert!(json.get("company").is_none());
        assert!(json["seo"].is_object());
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_from_record_drops_fields_foreign_to_kind() {
        let mut experience = EditableContent::blank(ContentKind::Experience, today());
        if let KindAttributes::Experience(t) = &mut experience.attributes {
            t.company = "Acme".to_string();
        }
        let mut record = DraftRecord::capture(&experience, Utc::now());
        record.repo_url = Some("https://stale".to_string());
        record.seo = Some(SeoFields::default());

        let restored = EditableContent::from_record(ContentKind::Experience, None, &record);
        assert_eq!(restored.attributes.company(), Some("Acme"));
        assert!(restored.seo.is_none());

        let as_skill = EditableContent::from_record(ContentKind::Skill, None, &record);
        assert_eq!(as_skill.attributes, KindAttributes::Skill(Default::default()));
    }

    #[test]
    fn test_payload_carries_kind_tag() {
        let payload = CommitPayload {
            id: None,
            title: "Rust".to_string(),
            slug: "rust".to_string(),
            content: String::new(),
            tags: vec![],
            status: ContentStatus::Published,
            date: None,
            excerpt: String::new(),
            attributes: KindAttributes::Skill(ProficiencyAttributes {
                proficiency: Some(90),
            }),
            seo: None,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["kind"], "skill");
        assert_eq!(json["proficiency"], 90);
        assert_eq!(json["status"], "published");
    }
}
