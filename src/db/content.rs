//! Content repository
//!
//! Generic CRUD over any registry resource. Rows are read back as
//! `to_jsonb(t)` so one code path serves every table.

use crate::content::field::convert_value;
use crate::content::publish::{self, PublishState, Status};
use crate::content::registry::{self, Resource};
use crate::content::slug::{ensure_unique_slug, slugify};
use crate::content::bulk::normalize_ids;
use crate::content::{BulkAction, BulkOutcome, FieldKind, SqlValue};
use crate::db::builder::{like_pattern, InsertBuilder, UpdateBuilder, WhereClause};
use crate::error::{not_found_error, validation_error, AppError};
use crate::models::content::{
    CategoryCount, DeletedSummary, ListQuery, Page, ResourceStats, SlugCheckResponse,
};
use deadpool_postgres::Pool;
use serde_json::{Map, Value};
use std::future::Future;
use std::pin::Pin;
use tokio_postgres::{Client, Transaction};
use tracing::{debug, info};

/// Who is reading: admins see every row, the public only published rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Admin,
    Public,
}

pub struct ContentRepository {
    pool: Pool,
    slug_max_attempts: u32,
}

impl ContentRepository {
    pub fn new(pool: Pool, slug_max_attempts: u32) -> Self {
        Self {
            pool,
            slug_max_attempts: slug_max_attempts.max(1),
        }
    }

    /// List rows with filters and pagination
    pub async fn list(
        &self,
        resource: &'static Resource,
        query: &ListQuery,
        scope: Scope,
    ) -> Result<Page<Value>, AppError> {
        let (page, per_page) = query.pagination();
        let mut clause = WhereClause::new();

        if scope == Scope::Public {
            clause.push_raw("t.published = TRUE");
        }
        if let Some(term) = query.search_term() {
            clause.push(
                &format!("t.{} ILIKE {{}}", resource.title_field),
                SqlValue::text(like_pattern(term)),
            );
        }
        if let (Some(status), Scope::Admin) = (query.status.as_deref(), scope) {
            if !resource.publishable {
                return Err(validation_error(format!("{} have no status", resource.name)));
            }
            let status: Status = status.parse()?;
            clause.push("t.status = {}", SqlValue::text(status.as_str()));
        }
        if let Some(featured) = query.featured.filter(|_| resource.featurable) {
            clause.push("t.featured = {}", SqlValue::Boolean(Some(featured)));
        }
        if let Some(parent_id) = query.parent_id {
            let parent = resource.parent.ok_or_else(|| {
                validation_error(format!("{} have no parent", resource.name))
            })?;
            clause.push(
                &format!("t.{} = {{}}", parent.column),
                SqlValue::Integer(Some(parent_id)),
            );
        }
        for (column, value) in [("category", &query.category), ("platform", &query.platform)] {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                if resource.field(column).is_some() {
                    clause.push(&format!("t.{} = {{}}", column), SqlValue::text(value));
                }
            }
        }

        let where_sql = clause.sql();
        let mut params = clause.into_params();
        let client = self.pool.get().await?;

        let count_sql = format!("SELECT COUNT(*) FROM {} t {}", resource.table, where_sql);
        let total: i64 = client
            .query_one(count_sql.as_str(), &params.as_refs())
            .await?
            .get(0);

        let limit = params.push(SqlValue::BigInt(Some(per_page)));
        let offset = params.push(SqlValue::BigInt(Some(query.offset())));
        let sql = format!(
            "SELECT to_jsonb(t) AS data FROM {table} t {where_sql} ORDER BY {order} LIMIT {limit} OFFSET {offset}",
            table = resource.table,
            order = resource.order_by(),
        );
        let rows = client.query(sql.as_str(), &params.as_refs()).await?;
        let items: Vec<Value> = rows.iter().map(|row| row.get("data")).collect();

        debug!("Listed {} of {} {}", items.len(), total, resource.name);
        Ok(Page::new(items, total, page, per_page))
    }

    /// Fetch one row by id, optionally with its descendants embedded
    pub async fn get(
        &self,
        resource: &'static Resource,
        id: i32,
        include_children: bool,
    ) -> Result<Option<Value>, AppError> {
        let client = self.pool.get().await?;
        let sql = format!("SELECT to_jsonb(t) AS data FROM {} t WHERE t.id = $1", resource.table);
        let Some(row) = client.query_opt(sql.as_str(), &[&id]).await? else {
            return Ok(None);
        };
        let mut item: Value = row.get("data");
        if include_children {
            attach_children(&client, resource, &mut item).await?;
        }
        Ok(Some(item))
    }

    /// Fetch a published row by slug with its descendants embedded
    pub async fn get_published_by_slug(
        &self,
        resource: &'static Resource,
        slug: &str,
    ) -> Result<Option<Value>, AppError> {
        if !resource.has_slug() || !resource.publishable {
            return Ok(None);
        }
        let client = self.pool.get().await?;
        let sql = format!(
            "SELECT to_jsonb(t) AS data FROM {} t WHERE t.slug = $1 AND t.published = TRUE",
            resource.table
        );
        let Some(row) = client.query_opt(sql.as_str(), &[&slug]).await? else {
            return Ok(None);
        };
        let mut item: Value = row.get("data");
        attach_children(&client, resource, &mut item).await?;
        Ok(Some(item))
    }

    /// Insert a row from a request body
    pub async fn create(&self, resource: &'static Resource, body: &Value) -> Result<Value, AppError> {
        let map = as_object(body)?;
        let mut insert = insert_from_body(resource, map)?;
        let slug_base = create_slug_base(resource, map)?;

        let client = self.pool.get().await?;
        self.check_parent(&client, resource, map).await?;

        if let Some(base) = slug_base {
            let slug = self.resolve_slug(&client, resource, &base, None).await?;
            insert.value("slug", SqlValue::text(slug));
        }

        let (sql, params) = insert.build();
        let row = client.query_one(sql.as_str(), &params.as_refs()).await?;
        let item: Value = row.get("data");

        let created_id = item.get("id").cloned().unwrap_or_default();
        info!("Created {} {}", resource.label, created_id);
        Ok(item)
    }

    /// Apply a partial update: only fields present in the body are written
    pub async fn update(
        &self,
        resource: &'static Resource,
        id: i32,
        body: &Value,
    ) -> Result<Value, AppError> {
        let map = as_object(body)?;
        let mut update = update_from_body(resource, map)?;
        let slug_base = update_slug_base(resource, map)?;

        let client = self.pool.get().await?;
        self.check_parent(&client, resource, map).await?;

        if let Some(base) = slug_base {
            let slug = self.resolve_slug(&client, resource, &base, Some(id)).await?;
            update.set("slug", SqlValue::text(slug));
        }

        let (sql, params) = update.build_by_id(id)?;
        let row = client
            .query_opt(sql.as_str(), &params.as_refs())
            .await?
            .ok_or_else(|| not_found_error(format!("{} {} not found", resource.label, id)))?;

        info!("Updated {} {}", resource.label, id);
        Ok(row.get("data"))
    }

    /// Delete a row and all of its descendants in one transaction
    pub async fn delete(&self, resource: &'static Resource, id: i32) -> Result<DeletedSummary, AppError> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        let descendants_deleted = delete_descendants(&tx, resource, &[id]).await?;

        let slug_expr = if resource.has_slug() { "t.slug" } else { "NULL::TEXT" };
        let sql = format!(
            "DELETE FROM {table} AS t WHERE t.id = $1 RETURNING t.id, t.{title}::TEXT AS title, {slug} AS slug",
            table = resource.table,
            title = resource.title_field,
            slug = slug_expr,
        );
        let Some(row) = tx.query_opt(sql.as_str(), &[&id]).await? else {
            tx.rollback().await?;
            return Err(not_found_error(format!("{} {} not found", resource.label, id)));
        };
        tx.commit().await?;

        info!(
            "Deleted {} {} ({} descendant rows)",
            resource.label, id, descendants_deleted
        );
        Ok(DeletedSummary {
            id: row.get("id"),
            title: row.get("title"),
            slug: row.get("slug"),
            descendants_deleted,
        })
    }

    /// Run one bulk action over a list of ids
    pub async fn bulk(
        &self,
        resource: &'static Resource,
        action: BulkAction,
        ids: &[i32],
    ) -> Result<BulkOutcome, AppError> {
        action.check_applicable(resource)?;
        let ids = normalize_ids(ids)?;
        let mut client = self.pool.get().await?;

        let affected: Vec<i32> = match action.set_clause() {
            Some(set) => {
                let sql = format!(
                    "UPDATE {} SET {}, updated_at = NOW() WHERE id = ANY($1) RETURNING id",
                    resource.table, set
                );
                client
                    .query(sql.as_str(), &[&ids])
                    .await?
                    .iter()
                    .map(|row| row.get(0))
                    .collect()
            }
            None => {
                let tx = client.transaction().await?;
                delete_descendants(&tx, resource, &ids).await?;
                let sql = format!("DELETE FROM {} WHERE id = ANY($1) RETURNING id", resource.table);
                let affected = tx
                    .query(sql.as_str(), &[&ids])
                    .await?
                    .iter()
                    .map(|row| row.get(0))
                    .collect();
                tx.commit().await?;
                affected
            }
        };

        let outcome = BulkOutcome::new(action, &ids, affected);
        info!(
            "Bulk {} on {}: {}/{} rows",
            action.as_str(),
            resource.name,
            outcome.affected.len(),
            outcome.requested
        );
        Ok(outcome)
    }

    /// Report whether a slug is free and the slug a create would pick
    pub async fn slug_check(
        &self,
        resource: &'static Resource,
        slug: &str,
        exclude_id: Option<i32>,
    ) -> Result<SlugCheckResponse, AppError> {
        if !resource.has_slug() {
            return Err(validation_error(format!("{} have no slug", resource.name)));
        }
        let base = slugify(slug);
        if base.is_empty() {
            return Err(validation_error("`slug` must contain letters or digits"));
        }
        let client = self.pool.get().await?;
        let available = !slug_taken(&client, resource, &base, exclude_id).await?;
        let suggestion = if available {
            base.clone()
        } else {
            self.resolve_slug(&client, resource, &base, exclude_id).await?
        };
        Ok(SlugCheckResponse {
            slug: base,
            available,
            suggestion,
        })
    }

    /// Whether any row has `column = value`; `column` must be a registry field
    pub async fn exists_with(
        &self,
        resource: &'static Resource,
        column: &str,
        value: &str,
    ) -> Result<bool, AppError> {
        let field = resource
            .field(column)
            .ok_or_else(|| AppError::Internal(format!("{} has no field {}", resource.name, column)))?;
        let client = self.pool.get().await?;
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = $1)",
            resource.table, field.name
        );
        Ok(client.query_one(sql.as_str(), &[&value]).await?.get(0))
    }

    /// Distinct categories of published rows with counts
    pub async fn categories(&self, resource: &'static Resource) -> Result<Vec<CategoryCount>, AppError> {
        if resource.field("category").is_none() {
            return Ok(Vec::new());
        }
        let client = self.pool.get().await?;
        let sql = format!(
            "SELECT category, COUNT(*) FROM {} WHERE published = TRUE AND category IS NOT NULL \
             GROUP BY category ORDER BY category",
            resource.table
        );
        let rows = client.query(sql.as_str(), &[]).await?;
        Ok(rows
            .iter()
            .map(|row| CategoryCount {
                category: row.get(0),
                count: row.get(1),
            })
            .collect())
    }

    /// Totals per top-level resource
    pub async fn stats(&self) -> Result<Vec<ResourceStats>, AppError> {
        let client = self.pool.get().await?;
        let mut stats = Vec::new();
        for resource in registry::top_level() {
            let published_expr = if resource.publishable {
                "COUNT(*) FILTER (WHERE published)"
            } else {
                "NULL::BIGINT"
            };
            let sql = format!("SELECT COUNT(*), {} FROM {}", published_expr, resource.table);
            let row = client.query_one(sql.as_str(), &[]).await?;
            stats.push(ResourceStats {
                resource: resource.name,
                label: resource.label,
                total: row.get(0),
                published: row.get(1),
            });
        }
        Ok(stats)
    }

    async fn resolve_slug(
        &self,
        client: &Client,
        resource: &'static Resource,
        base: &str,
        exclude_id: Option<i32>,
    ) -> Result<String, AppError> {
        ensure_unique_slug(base, self.slug_max_attempts, |candidate| async move {
            slug_taken(client, resource, &candidate, exclude_id).await
        })
        .await
    }

    /// 404 when the body names a parent row that does not exist
    async fn check_parent(
        &self,
        client: &Client,
        resource: &'static Resource,
        map: &Map<String, Value>,
    ) -> Result<(), AppError> {
        let (Some(parent), Some(parent_resource)) = (resource.parent, resource.parent_resource()) else {
            return Ok(());
        };
        let Some(value) = map.get(parent.column) else {
            return Ok(());
        };
        let SqlValue::Integer(Some(parent_id)) = convert_value(parent.column, FieldKind::Integer, value)? else {
            return Err(validation_error(format!("`{}` is required", parent.column)));
        };
        let sql = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1)", parent_resource.table);
        let exists: bool = client.query_one(sql.as_str(), &[&parent_id]).await?.get(0);
        if exists {
            Ok(())
        } else {
            Err(not_found_error(format!("{} {} not found", parent_resource.label, parent_id)))
        }
    }
}

fn as_object(body: &Value) -> Result<&Map<String, Value>, AppError> {
    body.as_object()
        .ok_or_else(|| validation_error("Request body must be a JSON object"))
}

/// Slug a create should start from: the body `slug`, else the slug source field
fn create_slug_base(
    resource: &Resource,
    map: &Map<String, Value>,
) -> Result<Option<String>, AppError> {
    let Some(source) = resource.slug_source else {
        return Ok(None);
    };
    let requested = map
        .get("slug")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty());
    let base = match requested {
        Some(slug) => slugify(slug),
        None => map.get(source).and_then(Value::as_str).map(slugify).unwrap_or_default(),
    };
    if base.is_empty() {
        return Err(validation_error(format!(
            "Could not derive a slug; provide `slug` or a `{}` containing letters or digits",
            source
        )));
    }
    Ok(Some(base))
}

/// Updates only touch the slug when the body carries one
fn update_slug_base(
    resource: &Resource,
    map: &Map<String, Value>,
) -> Result<Option<String>, AppError> {
    if !resource.has_slug() {
        return Ok(None);
    }
    let Some(value) = map.get("slug") else {
        return Ok(None);
    };
    value
        .as_str()
        .map(slugify)
        .filter(|s| !s.is_empty())
        .map(Some)
        .ok_or_else(|| validation_error("`slug` must contain letters or digits"))
}

/// Insert for a create body, minus the slug which needs a uniqueness check
fn insert_from_body(
    resource: &'static Resource,
    map: &Map<String, Value>,
) -> Result<InsertBuilder, AppError> {
    let mut insert = InsertBuilder::new(resource.table);

    for field in resource.fields {
        match map.get(field.name) {
            Some(value) => {
                insert.value(field.name, field.convert(value)?);
            }
            None if field.required => {
                return Err(validation_error(format!("`{}` is required", field.name)));
            }
            None => {}
        }
    }

    if resource.publishable {
        let state = publish_state(map)?.unwrap_or_else(PublishState::draft);
        let published_at = published_at(map)?;
        insert
            .value("status", SqlValue::text(state.status.as_str()))
            .value("published", SqlValue::Boolean(Some(state.published)));
        if !published_at.is_null() {
            insert.value("published_at", published_at);
        } else if state.published {
            insert.raw("published_at", "NOW()");
        }
    }

    if resource.featurable {
        if let Some(value) = map.get("featured") {
            let featured = convert_value("featured", FieldKind::Boolean, value)?;
            if !featured.is_null() {
                insert.value("featured", featured);
            }
        }
    }

    Ok(insert)
}

/// Update for a partial body, minus the slug which needs a uniqueness check
fn update_from_body(
    resource: &'static Resource,
    map: &Map<String, Value>,
) -> Result<UpdateBuilder, AppError> {
    let mut update = UpdateBuilder::new(resource.table);

    for field in resource.fields {
        if let Some(value) = map.get(field.name) {
            update.set(field.name, field.convert(value)?);
        }
    }

    if resource.publishable {
        let provided_at = published_at(map)?;
        match publish_state(map)? {
            Some(state) => {
                update
                    .set("status", SqlValue::text(state.status.as_str()))
                    .set("published", SqlValue::Boolean(Some(state.published)));
                if state.published {
                    update.set_with("published_at", "COALESCE({}, published_at, NOW())", provided_at);
                } else if map.contains_key("published_at") {
                    update.set("published_at", provided_at);
                }
            }
            None if map.contains_key("published_at") => {
                update.set("published_at", provided_at);
            }
            None => {}
        }
    }

    if resource.featurable {
        if let Some(value) = map.get("featured") {
            let featured = match convert_value("featured", FieldKind::Boolean, value)? {
                SqlValue::Boolean(b) => b.unwrap_or(false),
                _ => false,
            };
            update.set("featured", SqlValue::Boolean(Some(featured)));
        }
    }

    Ok(update)
}

/// Reconciled publish state from `status` / `published` in the body
fn publish_state(map: &Map<String, Value>) -> Result<Option<PublishState>, AppError> {
    let status = match map.get("status") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.as_str()),
        Some(_) => return Err(validation_error("`status` must be a string")),
    };
    let published = match map.get("published") {
        None => None,
        Some(value) => match convert_value("published", FieldKind::Boolean, value)? {
            SqlValue::Boolean(b) => b,
            _ => None,
        },
    };
    publish::reconcile(status, published)
}

fn published_at(map: &Map<String, Value>) -> Result<SqlValue, AppError> {
    match map.get("published_at") {
        Some(value) => convert_value("published_at", FieldKind::Timestamp, value),
        None => Ok(SqlValue::Timestamp(None)),
    }
}

async fn slug_taken(
    client: &Client,
    resource: &Resource,
    slug: &str,
    exclude_id: Option<i32>,
) -> Result<bool, AppError> {
    let sql = format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE slug = $1 AND ($2::INTEGER IS NULL OR id <> $2))",
        resource.table
    );
    Ok(client.query_one(sql.as_str(), &[&slug, &exclude_id]).await?.get(0))
}

/// Embed child rows (recursively) under each child resource's key
fn attach_children<'a>(
    client: &'a Client,
    resource: &'static Resource,
    item: &'a mut Value,
) -> Pin<Box<dyn Future<Output = Result<(), AppError>> + Send + 'a>> {
    Box::pin(async move {
        let Some(id) = item.get("id").and_then(Value::as_i64).and_then(|id| i32::try_from(id).ok()) else {
            return Ok(());
        };
        for child in registry::children_of(resource) {
            let Some(parent) = child.parent else { continue };
            let sql = format!(
                "SELECT to_jsonb(t) AS data FROM {} t WHERE t.{} = $1 ORDER BY {}",
                child.table,
                parent.column,
                child.order_by()
            );
            let rows = client.query(sql.as_str(), &[&id]).await?;
            let mut children: Vec<Value> = rows.iter().map(|row| row.get("data")).collect();
            for entry in children.iter_mut() {
                attach_children(client, child, entry).await?;
            }
            if let Value::Object(map) = item {
                map.insert(child.children_key.to_string(), Value::Array(children));
            }
        }
        Ok(())
    })
}

/// Delete all descendant rows of `ids`, deepest level first
async fn delete_descendants(
    tx: &Transaction<'_>,
    resource: &'static Resource,
    ids: &[i32],
) -> Result<u64, AppError> {
    let mut levels: Vec<(&'static Resource, Vec<i32>)> = Vec::new();
    let mut frontier: Vec<(&'static Resource, Vec<i32>)> = vec![(resource, ids.to_vec())];

    while let Some((current, current_ids)) = frontier.pop() {
        for child in registry::children_of(current) {
            let Some(parent) = child.parent else { continue };
            let sql = format!("SELECT id FROM {} WHERE {} = ANY($1)", child.table, parent.column);
            let child_ids: Vec<i32> = tx
                .query(sql.as_str(), &[&current_ids])
                .await?
                .iter()
                .map(|row| row.get(0))
                .collect();
            if !child_ids.is_empty() {
                levels.push((child, child_ids.clone()));
                frontier.push((child, child_ids));
            }
        }
    }

    let mut deleted = 0;
    for (level, level_ids) in levels.iter().rev() {
        let sql = format!("DELETE FROM {} WHERE id = ANY($1)", level.table);
        deleted += tx.execute(sql.as_str(), &[level_ids]).await?;
    }
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::registry::find;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn resource(name: &str) -> &'static Resource {
        find(name).unwrap()
    }

    fn insert_sql(name: &str, body: Value) -> (String, Vec<SqlValue>) {
        let (sql, params) = insert_from_body(resource(name), body.as_object().unwrap())
            .unwrap()
            .build();
        (sql, params.values().to_vec())
    }

    fn update_sql(name: &str, body: Value) -> Result<(String, Vec<SqlValue>), AppError> {
        let (sql, params) = update_from_body(resource(name), body.as_object().unwrap())?.build_by_id(7)?;
        Ok((sql, params.values().to_vec()))
    }

    #[test]
    fn test_create_defaults_to_draft() {
        let (sql, params) = insert_sql("articles", json!({"title": "Hello"}));
        assert_eq!(
            sql,
            "INSERT INTO articles AS t (title, status, published) VALUES ($1, $2, $3) RETURNING to_jsonb(t) AS data"
        );
        assert_eq!(
            params,
            vec![SqlValue::text("Hello"), SqlValue::text("draft"), SqlValue::Boolean(Some(false))]
        );
    }

    #[test]
    fn test_create_published_stamps_published_at() {
        let (sql, params) = insert_sql("news", json!({"title": "Breach", "published": "true"}));
        assert!(sql.contains("(title, status, published, published_at) VALUES ($1, $2, $3, NOW())"));
        assert_eq!(params[1], SqlValue::text("published"));
        assert_eq!(params[2], SqlValue::Boolean(Some(true)));
    }

    #[test]
    fn test_create_keeps_explicit_published_at_on_draft() {
        let (sql, params) = insert_sql(
            "articles",
            json!({"title": "Later", "status": "draft", "published_at": "2024-05-01"}),
        );
        assert!(sql.contains("(title, status, published, published_at) VALUES ($1, $2, $3, $4)"));
        assert_eq!(params[2], SqlValue::Boolean(Some(false)));
        let SqlValue::Timestamp(Some(at)) = &params[3] else {
            panic!("expected a timestamp parameter");
        };
        assert_eq!(at.to_rfc3339(), "2024-05-01T00:00:00+00:00");
    }

    #[test]
    fn test_published_always_agrees_with_status() {
        let statuses = [None, Some("draft"), Some("published"), Some("archived")];
        let flags = [None, Some(true), Some(false)];
        for status in statuses {
            for published in flags {
                let mut body = json!({"title": "T"});
                if let Some(status) = status {
                    body["status"] = json!(status);
                }
                if let Some(published) = published {
                    body["published"] = json!(published);
                }
                let (_, params) = insert_sql("articles", body);
                let expected = match (status, published) {
                    (Some(s), _) => s == "published",
                    (None, flag) => flag.unwrap_or(false),
                };
                assert_eq!(params[2], SqlValue::Boolean(Some(expected)), "{:?} {:?}", status, published);
                let status_is_published = params[1] == SqlValue::text("published");
                assert_eq!(status_is_published, expected, "{:?} {:?}", status, published);
            }
        }
    }

    #[test]
    fn test_create_requires_required_fields() {
        let err = insert_from_body(resource("articles"), json!({"excerpt": "x"}).as_object().unwrap())
            .unwrap_err();
        assert!(err.to_string().contains("title"));
    }

    #[test]
    fn test_create_featured_handling() {
        let (sql, params) = insert_sql("articles", json!({"title": "T", "featured": "yes"}));
        assert!(sql.contains("featured"));
        assert_eq!(params.last(), Some(&SqlValue::Boolean(Some(true))));

        let (sql, _) = insert_sql("articles", json!({"title": "T", "featured": null}));
        assert!(!sql.contains("featured"));

        // quizzes are not featurable
        let (sql, _) = insert_sql("quizzes", json!({"title": "T", "featured": true}));
        assert!(!sql.contains("featured"));
    }

    #[test]
    fn test_update_without_publish_keys_leaves_state_untouched() {
        let (sql, params) = update_sql("articles", json!({"title": "New"})).unwrap();
        assert_eq!(
            sql,
            "UPDATE articles AS t SET title = $1, updated_at = NOW() WHERE t.id = $2 RETURNING to_jsonb(t) AS data"
        );
        assert_eq!(params, vec![SqlValue::text("New"), SqlValue::Integer(Some(7))]);
    }

    #[test]
    fn test_update_publishing_keeps_existing_published_at() {
        let (sql, params) = update_sql("articles", json!({"published": true})).unwrap();
        assert_eq!(
            sql,
            "UPDATE articles AS t SET status = $1, published = $2, published_at = COALESCE($3, published_at, NOW()), \
             updated_at = NOW() WHERE t.id = $4 RETURNING to_jsonb(t) AS data"
        );
        assert_eq!(params[0], SqlValue::text("published"));
        assert_eq!(params[2], SqlValue::Timestamp(None));
    }

    #[test]
    fn test_update_status_wins_over_flag() {
        let (sql, params) = update_sql("news", json!({"status": "archived", "published": true})).unwrap();
        assert!(!sql.contains("published_at"));
        assert_eq!(params[0], SqlValue::text("archived"));
        assert_eq!(params[1], SqlValue::Boolean(Some(false)));
    }

    #[test]
    fn test_update_published_at_alone() {
        let (sql, params) = update_sql("articles", json!({"published_at": null})).unwrap();
        assert!(sql.starts_with("UPDATE articles AS t SET published_at = $1, updated_at = NOW()"));
        assert_eq!(params[0], SqlValue::Timestamp(None));
    }

    #[test]
    fn test_update_featured_null_clears_flag() {
        let (_, params) = update_sql("articles", json!({"featured": null})).unwrap();
        assert_eq!(params[0], SqlValue::Boolean(Some(false)));
    }

    #[test]
    fn test_empty_update_is_rejected() {
        assert!(matches!(update_sql("articles", json!({})), Err(AppError::Validation(_))));
        assert!(matches!(
            update_sql("articles", json!({"unknown": 1})),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_create_slug_base() {
        let articles = resource("articles");
        let base = |body: Value| create_slug_base(articles, body.as_object().unwrap());

        assert_eq!(base(json!({"title": "Hello World"})).unwrap(), Some("hello-world".to_string()));
        assert_eq!(
            base(json!({"title": "Hello World", "slug": "Custom Slug!"})).unwrap(),
            Some("custom-slug".to_string())
        );
        assert_eq!(
            base(json!({"title": "Hello World", "slug": "   "})).unwrap(),
            Some(slugify("Hello World"))
        );
        assert!(base(json!({"title": "!!!"})).is_err());

        let sections = resource("course-sections");
        assert_eq!(create_slug_base(sections, json!({"title": "x"}).as_object().unwrap()).unwrap(), None);
    }

    #[test]
    fn test_update_slug_base() {
        let articles = resource("articles");
        let base = |body: Value| update_slug_base(articles, body.as_object().unwrap());

        assert_eq!(base(json!({"title": "Renamed"})).unwrap(), None);
        assert_eq!(base(json!({"slug": "New Slug"})).unwrap(), Some("new-slug".to_string()));
        assert!(base(json!({"slug": "  "})).is_err());
        assert!(base(json!({"slug": 5})).is_err());
    }
}
