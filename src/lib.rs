//! HabitLoop — onboarding profile and starter-commitment generation.

pub mod config;
pub mod error;
pub mod llm;
pub mod onboarding;
pub mod store;
