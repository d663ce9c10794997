//! HTTP 处理器

pub mod membership;
pub mod order;
pub mod promotion;
