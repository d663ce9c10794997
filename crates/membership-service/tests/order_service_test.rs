//! 订单服务集成测试
//!
//! 覆盖促销核销、库存扣减、并发下单与订单状态流转

mod common;

use chrono::{Duration, Utc};

use common::*;
use zentrix_membership::service::Actor;
use zentrix_membership::{
    ClaimStatus, DiscountType, MembershipError, OrderStatus, Promotion, PromotionStatus, UserRole,
};

fn staff() -> Actor {
    Actor {
        user_id: STAFF,
        role: UserRole::Staff,
    }
}

fn customer(user_id: i64) -> Actor {
    Actor {
        user_id,
        role: UserRole::Customer,
    }
}

// ==================== 下单 ====================

#[tokio::test]
async fn test_out_of_stock_promotion_persists_nothing() {
    let fx = fixture().await;
    let promotion_id = seed_promotion(&fx.store, "EMPTY", Some(0)).await;
    seed_claim(&fx.store, ALICE, promotion_id).await;

    let err = fx
        .state
        .orders
        .add_order(order_request(ALICE, Some(promotion_id), &[(PRODUCT_A, 1, 50_000)]))
        .await
        .unwrap_err();

    assert!(matches!(err, MembershipError::PromotionOutOfStock(id) if id == promotion_id));
    assert!(fx.store.orders().await.is_empty());
    assert_eq!(fx.store.order_item_count().await, 0);
    assert_eq!(fx.store.stock(BRANCH, PRODUCT_A).await, Some(10));
}

#[tokio::test]
async fn test_null_remaining_quantity_is_out_of_stock() {
    let fx = fixture().await;
    let promotion_id = seed_promotion(&fx.store, "UNLIMITED?", None).await;

    let err = fx
        .state
        .orders
        .add_order(order_request(ALICE, Some(promotion_id), &[(PRODUCT_A, 1, 50_000)]))
        .await
        .unwrap_err();

    assert!(matches!(err, MembershipError::PromotionOutOfStock(_)));
}

#[tokio::test]
async fn test_order_with_promotion_consumes_one_claim() {
    let fx = fixture().await;
    let promotion_id = seed_promotion(&fx.store, "GOLD_ALICE", Some(5)).await;
    let first_claim = seed_claim(&fx.store, ALICE, promotion_id).await;
    let second_claim = seed_claim(&fx.store, ALICE, promotion_id).await;

    let detail = fx
        .state
        .orders
        .add_order(order_request(ALICE, Some(promotion_id), &[(PRODUCT_A, 2, 50_000)]))
        .await
        .unwrap();

    assert_eq!(detail.order.status, OrderStatus::Pending);
    assert_eq!(detail.order.promotion_id, Some(promotion_id));
    assert_eq!(detail.order.total_amount, 100_000);
    assert_eq!(detail.order.discount_amount, 10_000);
    assert_eq!(detail.order.payable_amount, 90_000);
    assert_eq!(detail.items.len(), 1);
    assert!(detail.order.order_no.starts_with("OD"));

    let promotion = fx.store.promotion(promotion_id).await.unwrap();
    assert_eq!(promotion.remaining_quantity, Some(4));

    let claims = fx.store.user_promotions(ALICE).await;
    let first = claims.iter().find(|c| c.id == first_claim).unwrap();
    let second = claims.iter().find(|c| c.id == second_claim).unwrap();
    assert_eq!(first.status, ClaimStatus::Consumed);
    assert!(first.consumed_at.is_some());
    assert_eq!(second.status, ClaimStatus::Claimed);

    assert_eq!(fx.store.stock(BRANCH, PRODUCT_A).await, Some(8));
}

#[tokio::test]
async fn test_order_without_promotion() {
    let fx = fixture().await;

    let detail = fx
        .state
        .orders
        .add_order(order_request(BOB, None, &[(PRODUCT_A, 3, 20_000), (PRODUCT_B, 1, 5_000)]))
        .await
        .unwrap();

    assert_eq!(detail.order.total_amount, 65_000);
    assert_eq!(detail.order.discount_amount, 0);
    assert_eq!(detail.order.payable_amount, 65_000);
    assert_eq!(detail.items.len(), 2);
    assert_eq!(fx.store.stock(BRANCH, PRODUCT_A).await, Some(7));
    assert_eq!(fx.store.stock(BRANCH, PRODUCT_B).await, Some(0));
}

#[tokio::test]
async fn test_amount_discount_capped_at_total() {
    let fx = fixture().await;
    let now = Utc::now();
    let promotion_id = seed_promotion_with(
        &fx.store,
        Promotion {
            id: 0,
            code: "FLAT100K".to_string(),
            description: None,
            discount_type: DiscountType::Amount,
            discount_value: 100_000,
            start_date: now - Duration::days(1),
            end_date: now + Duration::days(1),
            remaining_quantity: Some(1),
            status: PromotionStatus::Active,
            created_at: now,
            updated_at: now,
        },
    )
    .await;
    seed_claim(&fx.store, ALICE, promotion_id).await;

    let detail = fx
        .state
        .orders
        .add_order(order_request(ALICE, Some(promotion_id), &[(PRODUCT_A, 1, 30_000)]))
        .await
        .unwrap();

    assert_eq!(detail.order.discount_amount, 30_000);
    assert_eq!(detail.order.payable_amount, 0);
}

#[tokio::test]
async fn test_concurrent_orders_on_last_unit() {
    let fx = fixture().await;
    let promotion_id = seed_promotion(&fx.store, "LAST_ONE", Some(1)).await;
    seed_claim(&fx.store, ALICE, promotion_id).await;
    seed_claim(&fx.store, ALICE, promotion_id).await;

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let orders = fx.state.orders.clone();
            let request = order_request(ALICE, Some(promotion_id), &[(PRODUCT_A, 1, 50_000)]);
            tokio::spawn(async move { orders.add_order(request).await })
        })
        .collect();

    let mut succeeded = 0;
    let mut out_of_stock = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(MembershipError::PromotionOutOfStock(_)) => out_of_stock += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(succeeded, 1);
    assert_eq!(out_of_stock, 1);
    assert_eq!(
        fx.store.promotion(promotion_id).await.unwrap().remaining_quantity,
        Some(0)
    );
    assert_eq!(fx.store.orders().await.len(), 1);
    let claims = fx.store.user_promotions(ALICE).await;
    assert_eq!(claimed_count(&claims, promotion_id), 1);
}

#[tokio::test]
async fn test_insufficient_stock_rolls_back_everything() {
    let fx = fixture().await;
    let promotion_id = seed_promotion(&fx.store, "ROLLBACK", Some(3)).await;
    seed_claim(&fx.store, ALICE, promotion_id).await;

    let err = fx
        .state
        .orders
        .add_order(order_request(
            ALICE,
            Some(promotion_id),
            &[(PRODUCT_A, 2, 10_000), (PRODUCT_B, 2, 10_000)],
        ))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        MembershipError::InsufficientStock { product_id, requested: 2, .. } if product_id == PRODUCT_B
    ));
    assert!(fx.store.orders().await.is_empty());
    assert_eq!(fx.store.stock(BRANCH, PRODUCT_A).await, Some(10));
    assert_eq!(fx.store.stock(BRANCH, PRODUCT_B).await, Some(1));
    assert_eq!(
        fx.store.promotion(promotion_id).await.unwrap().remaining_quantity,
        Some(3)
    );
    let claims = fx.store.user_promotions(ALICE).await;
    assert_eq!(claimed_count(&claims, promotion_id), 1);
}

#[tokio::test]
async fn test_unstocked_product_rejected() {
    let fx = fixture().await;

    let err = fx
        .state
        .orders
        .add_order(order_request(BOB, None, &[(777, 1, 10_000)]))
        .await
        .unwrap_err();

    assert!(matches!(err, MembershipError::InsufficientStock { product_id: 777, .. }));
}

#[tokio::test]
async fn test_promotion_not_claimed_rolls_back() {
    let fx = fixture().await;
    let promotion_id = seed_promotion(&fx.store, "ALICE_ONLY", Some(2)).await;
    seed_claim(&fx.store, ALICE, promotion_id).await;

    let err = fx
        .state
        .orders
        .add_order(order_request(BOB, Some(promotion_id), &[(PRODUCT_A, 1, 10_000)]))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        MembershipError::PromotionNotClaimed { user_id: BOB, .. }
    ));
    assert!(fx.store.orders().await.is_empty());
    assert_eq!(
        fx.store.promotion(promotion_id).await.unwrap().remaining_quantity,
        Some(2)
    );
    assert_eq!(fx.store.stock(BRANCH, PRODUCT_A).await, Some(10));
}

#[tokio::test]
async fn test_expired_and_inactive_promotions_unavailable() {
    let fx = fixture().await;
    let now = Utc::now();
    let base = Promotion {
        id: 0,
        code: String::new(),
        description: None,
        discount_type: DiscountType::Percent,
        discount_value: 10,
        start_date: now - Duration::days(30),
        end_date: now - Duration::days(1),
        remaining_quantity: Some(5),
        status: PromotionStatus::Active,
        created_at: now,
        updated_at: now,
    };
    let expired = seed_promotion_with(
        &fx.store,
        Promotion {
            code: "EXPIRED".to_string(),
            ..base.clone()
        },
    )
    .await;
    let inactive = seed_promotion_with(
        &fx.store,
        Promotion {
            code: "INACTIVE".to_string(),
            end_date: now + Duration::days(30),
            status: PromotionStatus::Inactive,
            ..base
        },
    )
    .await;

    for promotion_id in [expired, inactive] {
        let err = fx
            .state
            .orders
            .add_order(order_request(ALICE, Some(promotion_id), &[(PRODUCT_A, 1, 10_000)]))
            .await
            .unwrap_err();
        assert!(matches!(err, MembershipError::PromotionUnavailable { .. }));
    }
    assert!(fx.store.orders().await.is_empty());
}

#[tokio::test]
async fn test_missing_references() {
    let fx = fixture().await;
    let orders = &fx.state.orders;

    assert!(matches!(
        orders
            .add_order(order_request(9999, None, &[(PRODUCT_A, 1, 1)]))
            .await,
        Err(MembershipError::UserNotFound(9999))
    ));

    let mut request = order_request(ALICE, None, &[(PRODUCT_A, 1, 1)]);
    request.branch_id = 9999;
    assert!(matches!(
        orders.add_order(request).await,
        Err(MembershipError::BranchNotFound(9999))
    ));

    assert!(matches!(
        orders
            .add_order(order_request(ALICE, Some(9999), &[(PRODUCT_A, 1, 1)]))
            .await,
        Err(MembershipError::PromotionNotFound(9999))
    ));
}

#[tokio::test]
async fn test_invalid_request_rejected() {
    let fx = fixture().await;
    let orders = &fx.state.orders;

    assert!(matches!(
        orders.add_order(order_request(ALICE, None, &[])).await,
        Err(MembershipError::Validation(_))
    ));
    assert!(matches!(
        orders
            .add_order(order_request(ALICE, None, &[(PRODUCT_A, 0, 10_000)]))
            .await,
        Err(MembershipError::Validation(_))
    ));
    assert!(matches!(
        orders
            .add_order(order_request(ALICE, None, &[(PRODUCT_A, 1, -5)]))
            .await,
        Err(MembershipError::Validation(_))
    ));
}

#[tokio::test]
async fn test_overflowing_total_rejected() {
    let fx = fixture().await;
    let promotion_id = seed_promotion(&fx.store, "BIG_SPENDER", Some(1)).await;
    seed_claim(&fx.store, ALICE, promotion_id).await;

    let err = fx
        .state
        .orders
        .add_order(order_request(
            ALICE,
            Some(promotion_id),
            &[(PRODUCT_A, 2, i64::MAX / 2 + 1)],
        ))
        .await
        .unwrap_err();

    assert!(matches!(err, MembershipError::Validation(_)));
    assert!(fx.store.orders().await.is_empty());
    assert_eq!(fx.store.stock(BRANCH, PRODUCT_A).await, Some(10));
    assert_eq!(
        fx.store.promotion(promotion_id).await.unwrap().remaining_quantity,
        Some(1)
    );
}

#[tokio::test]
async fn test_full_percent_discount_on_max_total() {
    let fx = fixture().await;
    let now = Utc::now();
    let promotion_id = seed_promotion_with(
        &fx.store,
        Promotion {
            id: 0,
            code: "FREE".to_string(),
            description: None,
            discount_type: DiscountType::Percent,
            discount_value: 100,
            start_date: now - Duration::days(1),
            end_date: now + Duration::days(1),
            remaining_quantity: Some(1),
            status: PromotionStatus::Active,
            created_at: now,
            updated_at: now,
        },
    )
    .await;
    seed_claim(&fx.store, ALICE, promotion_id).await;

    let detail = fx
        .state
        .orders
        .add_order(order_request(ALICE, Some(promotion_id), &[(PRODUCT_A, 1, i64::MAX)]))
        .await
        .unwrap();

    assert_eq!(detail.order.total_amount, i64::MAX);
    assert_eq!(detail.order.discount_amount, i64::MAX);
    assert_eq!(detail.order.payable_amount, 0);
}

#[tokio::test]
async fn test_get_order() {
    let fx = fixture().await;
    let created = fx
        .state
        .orders
        .add_order(order_request(BOB, None, &[(PRODUCT_A, 1, 10_000)]))
        .await
        .unwrap();

    let fetched = fx.state.orders.get_order(created.order.id).await.unwrap();
    assert_eq!(fetched.order.order_no, created.order.order_no);
    assert_eq!(fetched.items.len(), 1);

    assert!(matches!(
        fx.state.orders.get_order(9999).await,
        Err(MembershipError::OrderNotFound(9999))
    ));
}

// ==================== 状态流转 ====================

#[tokio::test]
async fn test_status_transitions() {
    let fx = fixture().await;
    let orders = &fx.state.orders;
    let order_id = orders
        .add_order(order_request(BOB, None, &[(PRODUCT_A, 1, 10_000)]))
        .await
        .unwrap()
        .order
        .id;

    let err = orders
        .update_order_status(staff(), order_id, OrderStatus::Completed)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MembershipError::InvalidOrderStatus {
            from: OrderStatus::Pending,
            to: OrderStatus::Completed,
            ..
        }
    ));

    let detail = orders
        .update_order_status(staff(), order_id, OrderStatus::Confirmed)
        .await
        .unwrap();
    assert_eq!(detail.order.status, OrderStatus::Confirmed);
    assert_eq!(
        orders.get_order(order_id).await.unwrap().order.status,
        OrderStatus::Confirmed
    );
}

#[tokio::test]
async fn test_customer_permissions() {
    let fx = fixture().await;
    let orders = &fx.state.orders;
    let order_id = orders
        .add_order(order_request(BOB, None, &[(PRODUCT_A, 1, 10_000)]))
        .await
        .unwrap()
        .order
        .id;

    assert!(matches!(
        orders
            .update_order_status(customer(BOB), order_id, OrderStatus::Confirmed)
            .await,
        Err(MembershipError::Forbidden(_))
    ));
    assert!(matches!(
        orders
            .update_order_status(customer(ALICE), order_id, OrderStatus::Cancelled)
            .await,
        Err(MembershipError::Forbidden(_))
    ));

    let detail = orders
        .update_order_status(customer(BOB), order_id, OrderStatus::Cancelled)
        .await
        .unwrap();
    assert_eq!(detail.order.status, OrderStatus::Cancelled);
}

#[tokio::test]
async fn test_completion_credits_points_and_ranks_up() {
    let fx = fixture().await;
    let orders = &fx.state.orders;
    let order_id = orders
        .add_order(order_request(ALICE, None, &[(PRODUCT_A, 1, 450_000)]))
        .await
        .unwrap()
        .order
        .id;

    for status in [OrderStatus::Confirmed, OrderStatus::Shipping] {
        orders
            .update_order_status(staff(), order_id, status)
            .await
            .unwrap();
        assert_eq!(fx.store.user(ALICE).await.unwrap().accumulated_points, 100);
    }

    orders
        .update_order_status(staff(), order_id, OrderStatus::Completed)
        .await
        .unwrap();

    let alice = fx.store.user(ALICE).await.unwrap();
    assert_eq!(alice.accumulated_points, 550);
    assert_eq!(alice.membership_id, Some(GOLD));
    assert!(fx.store.promotion_by_code("GOLD_ALICE_1").await.is_some());
    assert!(fx.store.promotion_by_code("GOLD_ALICE_2").await.is_some());

    let events = fx.notifier.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].tier_id, GOLD);
}
