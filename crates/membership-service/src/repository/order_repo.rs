//! 订单、门店与库存仓储

use sqlx::{PgConnection, Row};

use crate::error::Result;
use crate::models::{Branch, Order, OrderItem, OrderStatus};

/// 订单仓储
pub struct OrderRepository;

impl OrderRepository {
    pub async fn create_order_in_tx(tx: &mut PgConnection, order: &Order) -> Result<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO orders (order_no, user_id, branch_id, promotion_id, status,
                                total_amount, discount_amount, payable_amount,
                                created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            "#,
        )
        .bind(&order.order_no)
        .bind(order.user_id)
        .bind(order.branch_id)
        .bind(order.promotion_id)
        .bind(order.status)
        .bind(order.total_amount)
        .bind(order.discount_amount)
        .bind(order.payable_amount)
        .bind(order.created_at)
        .bind(order.updated_at)
        .fetch_one(tx)
        .await?;

        Ok(row.get("id"))
    }

    pub async fn create_item_in_tx(tx: &mut PgConnection, item: &OrderItem) -> Result<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO order_items (order_id, product_id, quantity, unit_price)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(item.order_id)
        .bind(item.product_id)
        .bind(item.quantity)
        .bind(item.unit_price)
        .fetch_one(tx)
        .await?;

        Ok(row.get("id"))
    }

    pub async fn get_order_in_tx(tx: &mut PgConnection, id: i64) -> Result<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, order_no, user_id, branch_id, promotion_id, status,
                   total_amount, discount_amount, payable_amount, created_at, updated_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(tx)
        .await?;

        Ok(order)
    }

    /// 读取订单并锁定，状态流转时使用
    pub async fn get_order_for_update_in_tx(
        tx: &mut PgConnection,
        id: i64,
    ) -> Result<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, order_no, user_id, branch_id, promotion_id, status,
                   total_amount, discount_amount, payable_amount, created_at, updated_at
            FROM orders
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(tx)
        .await?;

        Ok(order)
    }

    pub async fn list_items_in_tx(tx: &mut PgConnection, order_id: i64) -> Result<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT id, order_id, product_id, quantity, unit_price
            FROM order_items
            WHERE order_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(order_id)
        .fetch_all(tx)
        .await?;

        Ok(items)
    }

    pub async fn update_status_in_tx(
        tx: &mut PgConnection,
        order_id: i64,
        status: OrderStatus,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE orders
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(order_id)
        .bind(status)
        .execute(tx)
        .await?;

        Ok(())
    }
}

/// 门店与库存仓储
pub struct BranchRepository;

impl BranchRepository {
    pub async fn get_branch_in_tx(tx: &mut PgConnection, id: i64) -> Result<Option<Branch>> {
        let branch = sqlx::query_as::<_, Branch>(
            r#"
            SELECT id, name, address, active
            FROM branches
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(tx)
        .await?;

        Ok(branch)
    }

    /// 条件扣减门店库存
    ///
    /// 库存不足或商品未上架时不修改任何数据，返回 false
    pub async fn decrement_stock_in_tx(
        tx: &mut PgConnection,
        branch_id: i64,
        product_id: i64,
        quantity: i32,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE branch_stocks
            SET quantity = quantity - $3
            WHERE branch_id = $1 AND product_id = $2 AND quantity >= $3
            "#,
        )
        .bind(branch_id)
        .bind(product_id)
        .bind(quantity)
        .execute(tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
