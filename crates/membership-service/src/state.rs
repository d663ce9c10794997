//! 应用状态定义
//!
//! 包含 Axum 路由共享的服务实例，按存储后端泛型化

use std::sync::Arc;

use crate::config::MembershipConfig;
use crate::error::Result;
use crate::repository::TransactionManager;
use crate::service::{
    ClaimPolicy, MembershipNotifier, MembershipRankEngine, OrderService, PromotionGenerator,
    RewardTermsParser, UserPromotionLedger,
};

/// Axum 应用共享状态
pub struct AppState<T: TransactionManager> {
    pub rank_engine: Arc<MembershipRankEngine<T>>,
    pub generator: Arc<PromotionGenerator<T>>,
    pub ledger: Arc<UserPromotionLedger<T>>,
    pub orders: Arc<OrderService<T>>,
}

// 手动实现，避免 derive 要求 T: Clone
impl<T: TransactionManager> Clone for AppState<T> {
    fn clone(&self) -> Self {
        Self {
            rank_engine: self.rank_engine.clone(),
            generator: self.generator.clone(),
            ledger: self.ledger.clone(),
            orders: self.orders.clone(),
        }
    }
}

impl<T: TransactionManager> AppState<T> {
    /// 按配置装配全部服务
    pub fn new(
        tm: Arc<T>,
        config: MembershipConfig,
        notifier: Arc<dyn MembershipNotifier>,
    ) -> Result<Self> {
        let config = Arc::new(config);
        let parser = Arc::new(RewardTermsParser::new(
            config.default_reward.into(),
            config.max_vouchers_per_tier,
        )?);
        let policy = ClaimPolicy::new(config.max_claims_per_promotion);

        let generator = Arc::new(PromotionGenerator::new(tm.clone(), parser, policy));
        let rank_engine = Arc::new(MembershipRankEngine::new(
            tm.clone(),
            generator.clone(),
            notifier,
        ));
        let ledger = Arc::new(UserPromotionLedger::new(tm.clone(), policy));
        let orders = Arc::new(OrderService::new(tm, rank_engine.clone(), config));

        Ok(Self {
            rank_engine,
            generator,
            ledger,
            orders,
        })
    }
}
