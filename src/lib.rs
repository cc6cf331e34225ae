//! MarketBoost studio: product photos and a short brief in, a marketplace
//! listing package out.

pub mod config;
pub mod llm;
pub mod model;
pub mod services;
pub mod state;
pub mod storage;
