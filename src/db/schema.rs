//! Startup schema bootstrap
//!
//! Idempotent `CREATE ... IF NOT EXISTS` statements derived from the
//! resource registry, plus the fixed admin tables.

use crate::content::registry::{self, Resource};
use deadpool_postgres::Pool;
use tracing::info;

/// `CREATE TABLE` statement for a content resource
pub fn content_table_ddl(resource: &Resource) -> String {
    let mut columns = vec!["id SERIAL PRIMARY KEY".to_string()];

    for field in resource.fields {
        let mut column = format!("{} {}", field.name, field.kind.sql_type());
        if field.required {
            column.push_str(" NOT NULL");
        }
        if let Some(parent) = resource.parent.filter(|p| p.column == field.name) {
            if let Some(parent_resource) = registry::find(parent.resource) {
                column.push_str(&format!(" REFERENCES {}(id)", parent_resource.table));
            }
        }
        columns.push(column);
    }

    if resource.has_slug() {
        columns.push("slug VARCHAR(200) NOT NULL UNIQUE".to_string());
    }
    if resource.publishable {
        columns.push("status VARCHAR(20) NOT NULL DEFAULT 'draft'".to_string());
        columns.push("published BOOLEAN NOT NULL DEFAULT FALSE".to_string());
        columns.push("published_at TIMESTAMPTZ".to_string());
    }
    if resource.featurable {
        columns.push("featured BOOLEAN NOT NULL DEFAULT FALSE".to_string());
    }
    columns.push("created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()".to_string());
    columns.push("updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()".to_string());

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
        resource.table,
        columns.join(",\n    ")
    )
}

/// Index statements for a content resource
pub fn content_index_ddl(resource: &Resource) -> Vec<String> {
    let mut statements = Vec::new();
    if let Some(parent) = resource.parent {
        statements.push(format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_{column} ON {table}({column})",
            table = resource.table,
            column = parent.column
        ));
    }
    if resource.publishable {
        statements.push(format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_published ON {table}(published)",
            table = resource.table
        ));
    }
    statements
}

const ADMIN_TABLES: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS roles (
        id SERIAL PRIMARY KEY,
        name VARCHAR(50) UNIQUE NOT NULL,
        description TEXT,
        permissions TEXT[] NOT NULL DEFAULT '{}',
        is_system BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )",
    "CREATE TABLE IF NOT EXISTS integrations (
        id SERIAL PRIMARY KEY,
        provider VARCHAR(50) NOT NULL,
        name VARCHAR(255) NOT NULL,
        enabled BOOLEAN NOT NULL DEFAULT TRUE,
        config JSONB NOT NULL DEFAULT '{}',
        last_tested_at TIMESTAMPTZ,
        last_test_ok BOOLEAN,
        last_test_message TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )",
    "CREATE TABLE IF NOT EXISTS smtp_configs (
        id SERIAL PRIMARY KEY,
        name VARCHAR(255) NOT NULL,
        host VARCHAR(255) NOT NULL,
        port INTEGER NOT NULL,
        username VARCHAR(255),
        password TEXT,
        encryption VARCHAR(20) NOT NULL DEFAULT 'starttls',
        from_email VARCHAR(255) NOT NULL,
        from_name VARCHAR(255),
        is_default BOOLEAN NOT NULL DEFAULT FALSE,
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        last_tested_at TIMESTAMPTZ,
        last_test_ok BOOLEAN,
        last_test_message TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_smtp_configs_single_default
        ON smtp_configs(is_default) WHERE is_default",
    "CREATE INDEX IF NOT EXISTS idx_integrations_provider ON integrations(provider)",
];

const SEED_ROLES: &str = "INSERT INTO roles (name, description, permissions, is_system) VALUES
    ('admin', 'Administrator with full access', '{}', TRUE),
    ('editor', 'Can create and edit content', $1, TRUE),
    ('viewer', 'Read-only access to the admin area', $2, TRUE)
    ON CONFLICT (name) DO NOTHING";

/// Create all tables and seed the system roles
pub async fn bootstrap(pool: &Pool) -> anyhow::Result<()> {
    let client = pool.get().await?;

    // Parents are declared before children in the registry
    for resource in registry::RESOURCES {
        client.execute(content_table_ddl(resource).as_str(), &[]).await?;
        for statement in content_index_ddl(resource) {
            client.execute(statement.as_str(), &[]).await?;
        }
    }

    for statement in ADMIN_TABLES {
        client.execute(*statement, &[]).await?;
    }

    let editor: Vec<String> = registry::RESOURCES
        .iter()
        .flat_map(|r| {
            [
                r.permission(registry::Access::Read),
                r.permission(registry::Access::Write),
            ]
        })
        .collect();
    let viewer: Vec<String> = registry::RESOURCES
        .iter()
        .map(|r| r.permission(registry::Access::Read))
        .collect();
    client.execute(SEED_ROLES, &[&editor, &viewer]).await?;

    info!("✅ Database tables initialized ({} content tables)", registry::RESOURCES.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parents_declared_before_children() {
        for (index, resource) in registry::RESOURCES.iter().enumerate() {
            if let Some(parent) = resource.parent {
                let parent_index = registry::RESOURCES
                    .iter()
                    .position(|r| r.name == parent.resource)
                    .unwrap();
                assert!(parent_index < index, "{} declared before its parent", resource.name);
            }
        }
    }

    #[test]
    fn test_article_ddl() {
        let ddl = content_table_ddl(registry::find("articles").unwrap());
        assert!(ddl.starts_with("CREATE TABLE IF NOT EXISTS articles ("));
        assert!(ddl.contains("title TEXT NOT NULL"));
        assert!(ddl.contains("tags JSONB"));
        assert!(ddl.contains("slug VARCHAR(200) NOT NULL UNIQUE"));
        assert!(ddl.contains("published BOOLEAN NOT NULL DEFAULT FALSE"));
        assert!(ddl.contains("featured BOOLEAN NOT NULL DEFAULT FALSE"));
    }

    #[test]
    fn test_child_ddl_references_parent() {
        let ddl = content_table_ddl(registry::find("course-chapters").unwrap());
        assert!(ddl.contains("section_id INTEGER NOT NULL REFERENCES course_sections(id)"));
        assert!(!ddl.contains("published"));

        let indexes = content_index_ddl(registry::find("course-chapters").unwrap());
        assert_eq!(indexes.len(), 1);
        assert!(indexes[0].contains("course_chapters(section_id)"));
    }

    #[test]
    fn test_guest_ddl_has_no_slug() {
        let ddl = content_table_ddl(registry::find("guests").unwrap());
        assert!(!ddl.contains("slug"));
        assert!(ddl.contains("social_links JSONB"));
    }
}
