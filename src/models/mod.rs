//! 数据模型模块

pub mod auth;
pub mod card;
pub mod study_set;
pub mod user;
