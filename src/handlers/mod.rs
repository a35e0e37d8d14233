//! HTTP 处理器模块

pub mod auth;
pub mod card;
pub mod health;
pub mod set;
pub mod user;
