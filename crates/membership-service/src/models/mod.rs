//! 领域模型
//!
//! 会员等级、促销、领取记录、订单等核心实体定义

pub mod enums;
pub mod membership;
pub mod order;
pub mod promotion;

pub use enums::{ClaimSource, ClaimStatus, DiscountType, OrderStatus, PromotionStatus, UserRole};
pub use membership::{MembershipTier, RewardTerms, User};
pub use order::{Branch, BranchStock, Order, OrderItem};
pub use promotion::{Promotion, UserPromotion};
