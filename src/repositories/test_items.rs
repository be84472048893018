use crate::db::models::TestItem;

pub(crate) const COLUMNS: &str = "session_id, question_id, order_index, time_limit_sec";

pub(crate) async fn insert_items(
    executor: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    items: &[TestItem],
) -> Result<(), sqlx::Error> {
    for item in items {
        sqlx::query(
            "INSERT INTO test_items (session_id, question_id, order_index, time_limit_sec)
             VALUES ($1,$2,$3,$4)",
        )
        .bind(&item.session_id)
        .bind(&item.question_id)
        .bind(item.order_index)
        .bind(item.time_limit_sec)
        .execute(&mut **executor)
        .await?;
    }

    Ok(())
}

pub(crate) async fn list_by_session(
    executor: impl sqlx::PgExecutor<'_>,
    session_id: &str,
) -> Result<Vec<TestItem>, sqlx::Error> {
    sqlx::query_as::<_, TestItem>(&format!(
        "SELECT {COLUMNS}
         FROM test_items
         WHERE session_id = $1
         ORDER BY order_index"
    ))
    .bind(session_id)
    .fetch_all(executor)
    .await
}
