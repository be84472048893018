use sqlx::types::Json as SqlxJson;

use crate::db::models::TestBlueprint;

pub(crate) const COLUMNS: &str =
    "slug, name, counts_by_type, time_by_section_sec, total_items, created_at";

pub(crate) async fn find_by_slug(
    executor: impl sqlx::PgExecutor<'_>,
    slug: &str,
) -> Result<Option<TestBlueprint>, sqlx::Error> {
    sqlx::query_as::<_, TestBlueprint>(&format!(
        "SELECT {COLUMNS} FROM test_blueprints WHERE slug = $1"
    ))
    .bind(slug)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn insert(
    executor: impl sqlx::PgExecutor<'_>,
    blueprint: &TestBlueprint,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO test_blueprints (
            slug, name, counts_by_type, time_by_section_sec, total_items, created_at
         ) VALUES ($1,$2,$3,$4,$5,$6)",
    )
    .bind(&blueprint.slug)
    .bind(&blueprint.name)
    .bind(SqlxJson(&blueprint.counts_by_type.0))
    .bind(SqlxJson(&blueprint.time_by_section_sec.0))
    .bind(blueprint.total_items)
    .bind(blueprint.created_at)
    .execute(executor)
    .await?;
    Ok(())
}
