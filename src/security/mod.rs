//! # 防滥用模块
//!
//! 封禁列表、IP信誉、速率限制、冷却熔断与准入管道

pub mod admission;
pub mod blocklist;
pub mod cooldown;
pub mod rate_limit;
pub mod reputation;

pub use admission::{AdmissionDecision, AdmissionPipeline};
pub use blocklist::BlocklistStore;
pub use cooldown::CooldownBreaker;
pub use rate_limit::FixedWindowLimiter;
pub use reputation::{ReputationChecker, ReputationTag, ReputationVerdict};
