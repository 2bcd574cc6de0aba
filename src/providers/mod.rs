//! # 上游服务商模块
//!
//! 三种上游集成档位（uncensored / multi-variant / standard）的
//! 请求构造、响应归一化与共享错误映射

pub mod manager;
pub mod profile;
pub mod standard;
pub mod traits;
pub mod types;
pub mod uncensored;
mod upstream;
pub mod variant;

pub use manager::ProviderManager;
pub use profile::ProviderProfile;
pub use traits::ImageProvider;
pub use types::{AspectRatio, GenerationOutcome, GenerationRequest};
