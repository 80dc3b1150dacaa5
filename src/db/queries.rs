use crate::models::{OrderItemRecord, OrderRecord};
use sqlx::PgPool;

use super::repository::{OrderQuery, StatusFilter};

// 按创建时间倒序, 区间为半开区间
// 状态比较与 classifier::normalize 一致: 小写, 空白/下划线/连字符合并为单个空格
const LIST_ORDERS_SQL: &str = r#"
    SELECT o.id,
           o.total,
           o.status,
           o.created_at,
           o.updated_at,
           o.customer_name,
           o.kitchen_id,
           o.table_number,
           coalesce(o.is_delivery, false) as is_delivery,
           coalesce(o.discount_percentage, 0) as discount_percentage,
           (SELECT count(*) FROM order_items oi WHERE oi.order_id = o.id) as items_count
    FROM orders o
    WHERE ($1::timestamptz IS NULL OR o.created_at >= $1)
      AND ($2::timestamptz IS NULL OR o.created_at < $2)
      AND ($3::text[] IS NULL
           OR btrim(regexp_replace(lower(o.status), '[[:space:]_-]+', ' ', 'g')) = ANY($3))
    ORDER BY o.created_at DESC, o.id DESC
    LIMIT $4
"#;

/// 查询订单
pub async fn list_orders(pool: &PgPool, query: &OrderQuery) -> Result<Vec<OrderRecord>, sqlx::Error> {
    let statuses = query.status_filter.as_ref().map(|f| f.as_slice().to_vec());
    let limit = query.limit.map(|l| l as i64);

    sqlx::query_as::<_, OrderRecord>(LIST_ORDERS_SQL)
        .bind(query.range.map(|r| r.start))
        .bind(query.range.map(|r| r.end))
        .bind(statuses)
        .bind(limit)
        .fetch_all(pool)
        .await
}

/// 订单表中出现过的原始状态
pub async fn list_distinct_statuses(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT DISTINCT status FROM orders WHERE status IS NOT NULL")
        .fetch_all(pool)
        .await
}

/// 查询父订单状态命中过滤条件的订单明细 (联表附带父订单信息)
pub async fn list_order_items_by_parent_status(
    pool: &PgPool,
    filter: &StatusFilter,
) -> Result<Vec<OrderItemRecord>, sqlx::Error> {
    sqlx::query_as::<_, OrderItemRecord>(
        r#"
        SELECT oi.id,
               oi.order_id,
               oi.menu_item_id,
               oi.name,
               oi.quantity::bigint as quantity,
               oi.price,
               oi.notes,
               o.status as parent_status,
               o.created_at as parent_created_at,
               o.kitchen_id as parent_kitchen_id
        FROM order_items oi
        INNER JOIN orders o ON o.id = oi.order_id
        WHERE btrim(regexp_replace(lower(o.status), '[[:space:]_-]+', ' ', 'g')) = ANY($1)
        "#,
    )
    .bind(filter.as_slice())
    .fetch_all(pool)
    .await
}

/// 标记订单为优先处理
pub async fn mark_order_priority(pool: &PgPool, order_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE orders
        SET is_priority = true,
            updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(order_id)
    .execute(pool)
    .await?;

    tracing::info!("Order {} prioritized, {} row(s) affected", order_id, result.rows_affected());
    Ok(result.rows_affected() > 0)
}
