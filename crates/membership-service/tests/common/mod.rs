//! 集成测试共享夹具
//!
//! 基于内存存储预置等级、用户、门店与库存

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::{Value, json};

use zentrix_membership::service::{AddOrderRequest, OrderItemRequest};
use zentrix_membership::{
    AppState, Branch, BranchStock, ClaimSource, ClaimStatus, DiscountType, MembershipConfig,
    MembershipNotifier, MembershipTier, MemoryStore, Promotion, PromotionStatus, RankUpEvent,
    User, UserPromotion, UserRole,
};

pub const SILVER: i64 = 1;
pub const GOLD: i64 = 2;
pub const DIAMOND: i64 = 3;

pub const ADMIN: i64 = 1;
pub const STAFF: i64 = 2;
/// Silver 会员，100 积分
pub const ALICE: i64 = 10;
/// 无等级，0 积分
pub const BOB: i64 = 11;
/// Gold 会员，600 积分
pub const CAROL: i64 = 12;

pub const BRANCH: i64 = 1;
/// 库存 10
pub const PRODUCT_A: i64 = 100;
/// 库存 1
pub const PRODUCT_B: i64 = 101;

/// 记录全部升级事件的通知实现
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<RankUpEvent>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<RankUpEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl MembershipNotifier for RecordingNotifier {
    async fn on_rank_up(&self, event: &RankUpEvent) -> zentrix_membership::Result<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

pub struct Fixture {
    pub store: MemoryStore,
    pub state: AppState<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
}

pub async fn fixture() -> Fixture {
    fixture_with(MembershipConfig::default()).await
}

pub async fn fixture_with(config: MembershipConfig) -> Fixture {
    let store = MemoryStore::new();
    seed(&store).await;

    let notifier = Arc::new(RecordingNotifier::default());
    let state = AppState::new(Arc::new(store.clone()), config, notifier.clone())
        .expect("装配服务失败");

    Fixture {
        store,
        state,
        notifier,
    }
}

pub fn tier(id: i64, name: &str, threshold: i64, description: &str) -> MembershipTier {
    MembershipTier {
        id,
        name: name.to_string(),
        point_threshold: threshold,
        description: description.to_string(),
        reward_config: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn tier_with_config(id: i64, name: &str, threshold: i64, config: Value) -> MembershipTier {
    MembershipTier {
        reward_config: Some(config),
        ..tier(id, name, threshold, "Provides 5 vouchers, valid for 2 months, 50% discount")
    }
}

pub fn user(id: i64, username: &str, role: UserRole, points: i64, tier: Option<i64>) -> User {
    User {
        id,
        username: username.to_string(),
        email: format!("{}@zentrix.vn", username.replace(' ', ".")),
        role,
        accumulated_points: points,
        membership_id: tier,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

async fn seed(store: &MemoryStore) {
    store
        .insert_tier(tier(
            SILVER,
            "Silver",
            100,
            "Provides 1 voucher, valid for 1 month, offering a 5% discount",
        ))
        .await;
    store
        .insert_tier(tier(
            GOLD,
            "Gold",
            500,
            "Provides 2 vouchers, valid for 3 months, offering a 10% discount",
        ))
        .await;
    store
        .insert_tier(tier_with_config(
            DIAMOND,
            "Diamond",
            2000,
            json!({"voucherCount": 1, "validityMonths": 12, "discountPercent": 25}),
        ))
        .await;

    store
        .insert_user(user(ADMIN, "admin", UserRole::Admin, 0, None))
        .await;
    store
        .insert_user(user(STAFF, "staff", UserRole::Staff, 0, None))
        .await;
    store
        .insert_user(user(ALICE, "alice", UserRole::Customer, 100, Some(SILVER)))
        .await;
    store
        .insert_user(user(BOB, "bob", UserRole::Customer, 0, None))
        .await;
    store
        .insert_user(user(CAROL, "carol", UserRole::Customer, 600, Some(GOLD)))
        .await;

    store
        .insert_branch(Branch {
            id: BRANCH,
            name: "Zentrix Hà Nội".to_string(),
            address: Some("1 Tràng Tiền".to_string()),
            active: true,
        })
        .await;
    store
        .set_stock(BranchStock {
            branch_id: BRANCH,
            product_id: PRODUCT_A,
            quantity: 10,
        })
        .await;
    store
        .set_stock(BranchStock {
            branch_id: BRANCH,
            product_id: PRODUCT_B,
            quantity: 1,
        })
        .await;
}

/// 预置一个当前有效的百分比促销
pub async fn seed_promotion(store: &MemoryStore, code: &str, remaining: Option<i32>) -> i64 {
    let now = Utc::now();
    seed_promotion_with(
        store,
        Promotion {
            id: 0,
            code: code.to_string(),
            description: None,
            discount_type: DiscountType::Percent,
            discount_value: 10,
            start_date: now - Duration::days(1),
            end_date: now + Duration::days(30),
            remaining_quantity: remaining,
            status: PromotionStatus::Active,
            created_at: now,
            updated_at: now,
        },
    )
    .await
}

pub async fn seed_promotion_with(store: &MemoryStore, promotion: Promotion) -> i64 {
    store.insert_promotion(promotion).await
}

/// 为用户预置一条可用的领取记录
pub async fn seed_claim(store: &MemoryStore, user_id: i64, promotion_id: i64) -> i64 {
    store
        .insert_user_promotion(UserPromotion {
            id: 0,
            user_id,
            promotion_id,
            status: ClaimStatus::Claimed,
            source: ClaimSource::Manual,
            claimed_at: Utc::now(),
            consumed_at: None,
        })
        .await
}

pub fn order_request(
    user_id: i64,
    promotion_id: Option<i64>,
    items: &[(i64, i32, i64)],
) -> AddOrderRequest {
    AddOrderRequest {
        user_id,
        branch_id: BRANCH,
        promotion_id,
        items: items
            .iter()
            .map(|&(product_id, quantity, unit_price)| OrderItemRequest {
                product_id,
                quantity,
                unit_price,
            })
            .collect(),
    }
}

pub fn claimed_count(claims: &[UserPromotion], promotion_id: i64) -> usize {
    claims
        .iter()
        .filter(|c| c.promotion_id == promotion_id && c.status == ClaimStatus::Claimed)
        .count()
}

pub fn months_after(start: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    zentrix_membership::service::promotion_generator::add_months(start, months)
        .expect("日期越界")
}
