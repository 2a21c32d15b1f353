//! Resource registry
//!
//! Static descriptors for every content table. Table and column names used
//! in generated SQL come only from here.

use super::field::{Field, FieldKind};
use serde::Serialize;

/// Link from a child resource to its parent row
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Parent {
    /// Route name of the parent resource
    pub resource: &'static str,
    /// Foreign key column on the child table
    pub column: &'static str,
}

/// Describes one content table
#[derive(Debug, Serialize)]
pub struct Resource {
    /// Route name, e.g. `course-sections`
    pub name: &'static str,
    pub table: &'static str,
    pub label: &'static str,
    /// Key under which rows are embedded in their parent
    pub children_key: &'static str,
    /// Column searched by `search` and shown in delete summaries
    pub title_field: &'static str,
    /// Field the slug is derived from; `None` means the table has no slug
    pub slug_source: Option<&'static str>,
    pub publishable: bool,
    pub featurable: bool,
    pub public: bool,
    pub parent: Option<Parent>,
    pub fields: &'static [Field],
}

/// Read or write access to a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

impl Resource {
    pub fn has_slug(&self) -> bool {
        self.slug_source.is_some()
    }

    pub fn field(&self, name: &str) -> Option<&'static Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Children are ordered by position, top-level rows by recency
    pub fn order_by(&self) -> &'static str {
        if self.field("position").is_some() {
            "t.position ASC, t.id ASC"
        } else {
            "t.created_at DESC, t.id DESC"
        }
    }

    pub fn permission(&self, access: Access) -> String {
        match access {
            Access::Read => format!("{}:read", self.name),
            Access::Write => format!("{}:write", self.name),
        }
    }

    pub fn parent_resource(&self) -> Option<&'static Resource> {
        self.parent.and_then(|p| find(p.resource))
    }
}

const fn text(name: &'static str) -> Field {
    Field { name, kind: FieldKind::Text, required: false }
}

const fn required_text(name: &'static str) -> Field {
    Field { name, kind: FieldKind::Text, required: true }
}

const fn integer(name: &'static str) -> Field {
    Field { name, kind: FieldKind::Integer, required: false }
}

const fn big_integer(name: &'static str) -> Field {
    Field { name, kind: FieldKind::BigInt, required: false }
}

const fn float(name: &'static str) -> Field {
    Field { name, kind: FieldKind::Float, required: false }
}

const fn boolean(name: &'static str) -> Field {
    Field { name, kind: FieldKind::Boolean, required: false }
}

const fn json(name: &'static str) -> Field {
    Field { name, kind: FieldKind::Json, required: false }
}

const fn timestamp(name: &'static str) -> Field {
    Field { name, kind: FieldKind::Timestamp, required: false }
}

const fn foreign_key(name: &'static str) -> Field {
    Field { name, kind: FieldKind::Integer, required: true }
}

pub static RESOURCES: &[Resource] = &[
    Resource {
        name: "articles",
        table: "articles",
        label: "Article",
        children_key: "articles",
        title_field: "title",
        slug_source: Some("title"),
        publishable: true,
        featurable: true,
        public: true,
        parent: None,
        fields: &[
            required_text("title"),
            text("excerpt"),
            text("content"),
            text("cover_image"),
            text("category"),
            json("tags"),
            text("author_id"),
            text("author_name"),
            integer("reading_time"),
            json("meta"),
        ],
    },
    Resource {
        name: "news",
        table: "news",
        label: "News item",
        children_key: "news",
        title_field: "title",
        slug_source: Some("title"),
        publishable: true,
        featurable: true,
        public: true,
        parent: None,
        fields: &[
            required_text("title"),
            text("summary"),
            text("content"),
            text("source_name"),
            text("source_url"),
            text("image_url"),
            text("category"),
            json("tags"),
            text("author_id"),
        ],
    },
    Resource {
        name: "courses",
        table: "courses",
        label: "Course",
        children_key: "courses",
        title_field: "title",
        slug_source: Some("title"),
        publishable: true,
        featurable: true,
        public: true,
        parent: None,
        fields: &[
            required_text("title"),
            text("description"),
            text("level"),
            text("duration"),
            text("thumbnail"),
            float("price"),
            json("tags"),
            json("prerequisites"),
            text("instructor"),
        ],
    },
    Resource {
        name: "course-sections",
        table: "course_sections",
        label: "Course section",
        children_key: "sections",
        title_field: "title",
        slug_source: None,
        publishable: false,
        featurable: false,
        public: false,
        parent: Some(Parent { resource: "courses", column: "course_id" }),
        fields: &[
            foreign_key("course_id"),
            required_text("title"),
            text("description"),
            integer("position"),
        ],
    },
    Resource {
        name: "course-chapters",
        table: "course_chapters",
        label: "Course chapter",
        children_key: "chapters",
        title_field: "title",
        slug_source: Some("title"),
        publishable: false,
        featurable: false,
        public: false,
        parent: Some(Parent { resource: "course-sections", column: "section_id" }),
        fields: &[
            foreign_key("section_id"),
            required_text("title"),
            text("content"),
            text("video_url"),
            integer("duration_minutes"),
            boolean("is_free_preview"),
            integer("position"),
        ],
    },
    Resource {
        name: "tutorials",
        table: "tutorials",
        label: "Tutorial",
        children_key: "tutorials",
        title_field: "title",
        slug_source: Some("title"),
        publishable: true,
        featurable: true,
        public: true,
        parent: None,
        fields: &[
            required_text("title"),
            text("description"),
            text("content"),
            text("difficulty"),
            text("category"),
            text("thumbnail"),
            json("tags"),
            integer("estimated_minutes"),
        ],
    },
    Resource {
        name: "quizzes",
        table: "quizzes",
        label: "Quiz",
        children_key: "quizzes",
        title_field: "title",
        slug_source: Some("title"),
        publishable: true,
        featurable: false,
        public: true,
        parent: None,
        fields: &[
            required_text("title"),
            text("description"),
            text("category"),
            integer("time_limit_minutes"),
            integer("passing_score"),
        ],
    },
    Resource {
        name: "quiz-questions",
        table: "quiz_questions",
        label: "Quiz question",
        children_key: "questions",
        title_field: "question",
        slug_source: None,
        publishable: false,
        featurable: false,
        public: false,
        parent: Some(Parent { resource: "quizzes", column: "quiz_id" }),
        fields: &[
            foreign_key("quiz_id"),
            required_text("question"),
            json("options"),
            required_text("correct_answer"),
            text("explanation"),
            integer("points"),
            integer("position"),
        ],
    },
    Resource {
        name: "roadmaps",
        table: "roadmaps",
        label: "Roadmap",
        children_key: "roadmaps",
        title_field: "title",
        slug_source: Some("title"),
        publishable: true,
        featurable: true,
        public: true,
        parent: None,
        fields: &[
            required_text("title"),
            text("description"),
            text("difficulty"),
            text("estimated_time"),
            text("icon"),
            json("tags"),
        ],
    },
    Resource {
        name: "roadmap-modules",
        table: "roadmap_modules",
        label: "Roadmap module",
        children_key: "modules",
        title_field: "title",
        slug_source: None,
        publishable: false,
        featurable: false,
        public: false,
        parent: Some(Parent { resource: "roadmaps", column: "roadmap_id" }),
        fields: &[
            foreign_key("roadmap_id"),
            required_text("title"),
            text("description"),
            json("topics"),
            json("resources"),
            integer("position"),
        ],
    },
    Resource {
        name: "scripts",
        table: "scripts",
        label: "Script",
        children_key: "scripts",
        title_field: "title",
        slug_source: Some("title"),
        publishable: true,
        featurable: true,
        public: true,
        parent: None,
        fields: &[
            required_text("title"),
            text("description"),
            text("language"),
            text("category"),
            json("tags"),
            text("usage"),
        ],
    },
    Resource {
        name: "script-variants",
        table: "script_variants",
        label: "Script variant",
        children_key: "variants",
        title_field: "name",
        slug_source: None,
        publishable: false,
        featurable: false,
        public: false,
        parent: Some(Parent { resource: "scripts", column: "script_id" }),
        fields: &[
            foreign_key("script_id"),
            required_text("name"),
            text("platform"),
            required_text("code"),
            text("notes"),
            integer("position"),
        ],
    },
    Resource {
        name: "lab-exercises",
        table: "lab_exercises",
        label: "Lab exercise",
        children_key: "lab_exercises",
        title_field: "title",
        slug_source: Some("title"),
        publishable: true,
        featurable: false,
        public: true,
        parent: None,
        fields: &[
            required_text("title"),
            text("description"),
            text("instructions"),
            text("difficulty"),
            text("category"),
            json("hints"),
            text("solution"),
            json("tags"),
            integer("estimated_minutes"),
        ],
    },
    Resource {
        name: "ai-models",
        table: "ai_models",
        label: "AI model",
        children_key: "ai_models",
        title_field: "name",
        slug_source: Some("name"),
        publishable: true,
        featurable: true,
        public: true,
        parent: None,
        fields: &[
            required_text("name"),
            text("provider"),
            text("description"),
            text("model_type"),
            text("parameters"),
            text("license"),
            text("library"),
            text("source_url"),
            json("tags"),
            big_integer("downloads"),
            big_integer("likes"),
            json("metadata"),
        ],
    },
    Resource {
        name: "datasets",
        table: "datasets",
        label: "Dataset",
        children_key: "datasets",
        title_field: "name",
        slug_source: Some("name"),
        publishable: true,
        featurable: true,
        public: true,
        parent: None,
        fields: &[
            required_text("name"),
            text("description"),
            text("source_url"),
            text("format"),
            text("size"),
            text("license"),
            json("tags"),
            big_integer("row_count"),
            timestamp("last_updated"),
        ],
    },
    Resource {
        name: "commands",
        table: "commands",
        label: "Command",
        children_key: "commands",
        title_field: "name",
        slug_source: Some("name"),
        publishable: true,
        featurable: false,
        public: true,
        parent: None,
        fields: &[
            required_text("name"),
            text("description"),
            required_text("syntax"),
            json("examples"),
            text("category"),
            text("platform"),
            json("tags"),
        ],
    },
    Resource {
        name: "stories",
        table: "stories",
        label: "Story",
        children_key: "stories",
        title_field: "title",
        slug_source: Some("title"),
        publishable: true,
        featurable: true,
        public: true,
        parent: None,
        fields: &[
            required_text("title"),
            text("excerpt"),
            text("content"),
            text("author_name"),
            text("cover_image"),
            json("tags"),
        ],
    },
    Resource {
        name: "guests",
        table: "guests",
        label: "Guest",
        children_key: "guests",
        title_field: "name",
        slug_source: None,
        publishable: false,
        featurable: false,
        public: false,
        parent: None,
        fields: &[
            required_text("name"),
            text("email"),
            text("bio"),
            text("avatar_url"),
            text("website"),
            json("social_links"),
            text("company"),
        ],
    },
];

/// Look up a resource by route name
pub fn find(name: &str) -> Option<&'static Resource> {
    RESOURCES.iter().find(|r| r.name == name)
}

/// Resources whose parent is `resource`
pub fn children_of(resource: &Resource) -> impl Iterator<Item = &'static Resource> + '_ {
    RESOURCES
        .iter()
        .filter(move |r| r.parent.map(|p| p.resource) == Some(resource.name))
}

/// Resources without a parent
pub fn top_level() -> impl Iterator<Item = &'static Resource> {
    RESOURCES.iter().filter(|r| r.parent.is_none())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_and_tables_are_unique() {
        let names: HashSet<_> = RESOURCES.iter().map(|r| r.name).collect();
        let tables: HashSet<_> = RESOURCES.iter().map(|r| r.table).collect();
        assert_eq!(names.len(), RESOURCES.len());
        assert_eq!(tables.len(), RESOURCES.len());
    }

    #[test]
    fn test_parents_exist_and_have_fk_field() {
        for resource in RESOURCES {
            if let Some(parent) = resource.parent {
                assert!(find(parent.resource).is_some(), "{} parent missing", resource.name);
                let fk = resource.field(parent.column).expect("fk field");
                assert!(fk.required);
                assert_eq!(fk.kind, FieldKind::Integer);
            }
        }
    }

    #[test]
    fn test_slug_source_and_title_fields_exist() {
        for resource in RESOURCES {
            if let Some(source) = resource.slug_source {
                assert!(resource.field(source).is_some(), "{}", resource.name);
            }
            assert!(resource.field(resource.title_field).is_some(), "{}", resource.name);
        }
    }

    #[test]
    fn test_fields_do_not_shadow_managed_columns() {
        let managed = [
            "id", "slug", "status", "published", "published_at", "featured", "created_at", "updated_at",
        ];
        for resource in RESOURCES {
            for field in resource.fields {
                assert!(!managed.contains(&field.name), "{}.{}", resource.name, field.name);
            }
        }
    }

    #[test]
    fn test_children_lookup() {
        let courses = find("courses").unwrap();
        let children: Vec<_> = children_of(courses).map(|r| r.name).collect();
        assert_eq!(children, vec!["course-sections"]);

        let sections = find("course-sections").unwrap();
        let grandchildren: Vec<_> = children_of(sections).map(|r| r.name).collect();
        assert_eq!(grandchildren, vec!["course-chapters"]);
        assert_eq!(sections.parent_resource().map(|r| r.name), Some("courses"));
    }

    #[test]
    fn test_public_resources_are_top_level_and_publishable() {
        for resource in RESOURCES.iter().filter(|r| r.public) {
            assert!(resource.parent.is_none());
            assert!(resource.publishable);
        }
    }

    #[test]
    fn test_order_and_permissions() {
        assert_eq!(find("quiz-questions").unwrap().order_by(), "t.position ASC, t.id ASC");
        assert_eq!(find("articles").unwrap().order_by(), "t.created_at DESC, t.id DESC");
        assert_eq!(find("news").unwrap().permission(Access::Write), "news:write");
        assert!(find("unknown").is_none());
    }
}
