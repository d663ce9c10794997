//! 订单服务
//!
//! ## 下单流程（单个工作单元）
//!
//! 1. 请求校验 -> 2. 用户/门店存在性 -> 3. 促销可用性（锁定促销行）
//!    -> 4. 写入订单与明细 -> 5. 扣减门店库存 -> 6. 扣减促销数量
//!    -> 7. 核销用户领取记录 -> 8. 提交
//!
//! 任一步失败整体回滚，不会留下部分写入。

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use zentrix_shared::observability::metrics;

use crate::config::MembershipConfig;
use crate::error::{MembershipError, Result};
use crate::models::{Order, OrderItem, OrderStatus, UserRole};
use crate::repository::{TransactionManager, UnitOfWork};
use crate::service::dto::{Actor, AddOrderRequest, OrderDetail, OrderItemRequest};
use crate::service::rank_service::MembershipRankEngine;

/// 订单服务
pub struct OrderService<T: TransactionManager> {
    tm: Arc<T>,
    rank_engine: Arc<MembershipRankEngine<T>>,
    config: Arc<MembershipConfig>,
}

impl<T: TransactionManager> OrderService<T> {
    pub fn new(
        tm: Arc<T>,
        rank_engine: Arc<MembershipRankEngine<T>>,
        config: Arc<MembershipConfig>,
    ) -> Self {
        Self {
            tm,
            rank_engine,
            config,
        }
    }

    /// 下单
    #[instrument(skip(self, request), fields(user_id = request.user_id, branch_id = request.branch_id, promotion_id = ?request.promotion_id))]
    pub async fn add_order(&self, request: AddOrderRequest) -> Result<OrderDetail> {
        let started = Instant::now();
        let result = self.execute_add_order(&request).await;

        match &result {
            Ok(detail) => {
                metrics::record_order_placed(detail.order.promotion_id.is_some());
                info!(
                    order_id = detail.order.id,
                    order_no = %detail.order.order_no,
                    payable_amount = detail.order.payable_amount,
                    "下单成功"
                );
            }
            Err(e) if e.is_business_error() => {
                metrics::record_business_failure("add_order", e.error_code());
                warn!(error = %e, "下单被拒绝");
            }
            Err(_) => {}
        }
        metrics::record_operation_duration("add_order", started.elapsed().as_secs_f64());

        result
    }

    async fn execute_add_order(&self, request: &AddOrderRequest) -> Result<OrderDetail> {
        request.validate()?;
        let total_amount = order_total(&request.items)?;

        let mut uow = self.tm.begin().await?;

        uow.get_user(request.user_id)
            .await?
            .ok_or(MembershipError::UserNotFound(request.user_id))?;
        uow.get_branch(request.branch_id)
            .await?
            .ok_or(MembershipError::BranchNotFound(request.branch_id))?;

        let now = Utc::now();

        // 促销检查在任何写入之前完成
        let promotion = match request.promotion_id {
            Some(promotion_id) => {
                let promotion = uow
                    .get_promotion_for_update(promotion_id)
                    .await?
                    .ok_or(MembershipError::PromotionNotFound(promotion_id))?;
                if !promotion.has_stock() {
                    return Err(MembershipError::PromotionOutOfStock(promotion_id));
                }
                if let Some(reason) = promotion.unavailable_reason(now) {
                    return Err(MembershipError::PromotionUnavailable {
                        promotion_id,
                        reason: reason.to_string(),
                    });
                }
                Some(promotion)
            }
            None => None,
        };

        let discount_amount = promotion
            .as_ref()
            .map_or(0, |p| p.discount_for(total_amount));

        let mut order = Order {
            id: 0,
            order_no: generate_order_no(),
            user_id: request.user_id,
            branch_id: request.branch_id,
            promotion_id: request.promotion_id,
            status: OrderStatus::Pending,
            total_amount,
            discount_amount,
            payable_amount: total_amount - discount_amount,
            created_at: now,
            updated_at: now,
        };
        order.id = uow.create_order(&order).await?;

        let mut items = Vec::with_capacity(request.items.len());
        for line in &request.items {
            let mut item = OrderItem {
                id: 0,
                order_id: order.id,
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price: line.unit_price,
            };
            item.id = uow.create_order_item(&item).await?;
            items.push(item);
        }

        for item in &items {
            let decremented = uow
                .decrement_stock(request.branch_id, item.product_id, item.quantity)
                .await?;
            if !decremented {
                return Err(MembershipError::InsufficientStock {
                    branch_id: request.branch_id,
                    product_id: item.product_id,
                    requested: item.quantity,
                });
            }
        }

        if let Some(promotion) = &promotion {
            if !uow.decrement_promotion_quantity(promotion.id).await? {
                return Err(MembershipError::PromotionOutOfStock(promotion.id));
            }

            let claim = uow
                .find_first_claimed(request.user_id, promotion.id)
                .await?
                .ok_or(MembershipError::PromotionNotClaimed {
                    user_id: request.user_id,
                    promotion_id: promotion.id,
                })?;
            uow.mark_user_promotion_consumed(claim.id, now).await?;
        }

        uow.commit().await?;

        Ok(OrderDetail { order, items })
    }

    /// 查询订单详情
    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: i64) -> Result<OrderDetail> {
        let mut uow = self.tm.begin().await?;
        let order = uow
            .get_order(order_id)
            .await?
            .ok_or(MembershipError::OrderNotFound(order_id))?;
        let items = uow.list_order_items(order_id).await?;
        uow.rollback().await?;

        Ok(OrderDetail { order, items })
    }

    /// 更新订单状态
    ///
    /// 后台角色可执行任意合法流转；顾客只能取消自己的待处理订单。
    /// 订单完成时按实付金额累计积分并重新计算等级。
    #[instrument(skip(self))]
    pub async fn update_order_status(
        &self,
        actor: Actor,
        order_id: i64,
        status: OrderStatus,
    ) -> Result<OrderDetail> {
        let mut uow = self.tm.begin().await?;

        let mut order = uow
            .get_order_for_update(order_id)
            .await?
            .ok_or(MembershipError::OrderNotFound(order_id))?;

        if !order.status.can_transition_to(status) {
            return Err(MembershipError::InvalidOrderStatus {
                order_id,
                from: order.status,
                to: status,
            });
        }
        check_permission(&actor, &order, status)?;

        uow.update_order_status(order_id, status).await?;

        let membership = if status == OrderStatus::Completed {
            let user = uow
                .get_user_for_update(order.user_id)
                .await?
                .ok_or(MembershipError::UserNotFound(order.user_id))?;
            let earned = self.config.points_for(order.payable_amount);
            let total = user.accumulated_points.saturating_add(earned);
            info!(order_id, user_id = user.id, earned, total, "订单完成，累计积分");
            Some(
                self.rank_engine
                    .auto_update_membership_in_uow(&mut uow, user.id, total)
                    .await?,
            )
        } else {
            None
        };

        let items = uow.list_order_items(order_id).await?;
        uow.commit().await?;

        if let Some(result) = &membership {
            self.rank_engine.publish(result).await;
        }

        info!(order_id, from = ?order.status, to = ?status, actor_id = actor.user_id, "订单状态已更新");
        order.status = status;
        order.updated_at = Utc::now();

        Ok(OrderDetail { order, items })
    }
}

fn check_permission(actor: &Actor, order: &Order, next: OrderStatus) -> Result<()> {
    if actor.role.is_operator() {
        return Ok(());
    }
    let own_order = actor.role == UserRole::Customer && actor.user_id == order.user_id;
    if own_order && order.status == OrderStatus::Pending && next == OrderStatus::Cancelled {
        Ok(())
    } else {
        Err(MembershipError::Forbidden(format!(
            "用户 {} 无权将订单 {} 变更为 {:?}",
            actor.user_id, order.id, next
        )))
    }
}

/// 计算订单总额，溢出时视为非法请求
fn order_total(items: &[OrderItemRequest]) -> Result<i64> {
    items
        .iter()
        .try_fold(0i64, |total, item| {
            i64::from(item.quantity)
                .checked_mul(item.unit_price)
                .and_then(|subtotal| total.checked_add(subtotal))
        })
        .ok_or_else(|| MembershipError::Validation("订单金额超出范围".to_string()))
}

/// 生成订单号
///
/// 格式: OD + 时间戳(14位) + 随机数(6位)
fn generate_order_no() -> String {
    let now = Utc::now();
    let random = Uuid::new_v4().as_u128() % 1_000_000;
    format!("OD{}{:06}", now.format("%Y%m%d%H%M%S"), random)
}
