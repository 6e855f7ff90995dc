//! Tipos compartilhados do memofib.

pub mod config;
pub mod errors;
pub mod report;
