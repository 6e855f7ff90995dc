//! Hooks padrão do memofib.
//!
//! - `LoggingHook`: registra cada computação no log
//! - `CountingHook`: conta computações iniciadas, concluídas e falhas

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::types::errors::EvalResult;

use super::EvaluationHook;

// ═══════════════════════════════════════════════════════════════════════════
// LoggingHook
// ═══════════════════════════════════════════════════════════════════════════

/// Hook que registra computações no log (tracing).
#[derive(Debug, Default)]
pub struct LoggingHook;

impl LoggingHook {
    /// Cria um novo LoggingHook.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EvaluationHook for LoggingHook {
    fn name(&self) -> &str {
        "logging"
    }

    async fn after_compute(&self, key: u64, outcome: &EvalResult<u128>) {
        match outcome {
            Ok(value) => tracing::trace!(key, %value, "Computation finished"),
            Err(e) => tracing::warn!(key, error = %e, "Computation failed"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// CountingHook
// ═══════════════════════════════════════════════════════════════════════════

/// Hook que conta computações.
///
/// Como o avaliador só chama hooks para chaves que ele mesmo reivindicou,
/// `started_for(n)` é exatamente o número de vezes que `fib(n)` foi computado.
#[derive(Debug, Default)]
pub struct CountingHook {
    started: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    per_key: Mutex<HashMap<u64, u64>>,
}

impl CountingHook {
    /// Cria um novo CountingHook.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total de computações iniciadas.
    pub fn started(&self) -> u64 {
        self.started.load(Ordering::SeqCst)
    }

    /// Total de computações concluídas com sucesso.
    pub fn succeeded(&self) -> u64 {
        self.succeeded.load(Ordering::SeqCst)
    }

    /// Total de computações que falharam.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::SeqCst)
    }

    /// Computações iniciadas para uma chave específica.
    pub fn started_for(&self, key: u64) -> u64 {
        self.per_key
            .lock()
            .map(|counts| counts.get(&key).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Maior número de computações de uma mesma chave.
    pub fn max_per_key(&self) -> u64 {
        self.per_key
            .lock()
            .map(|counts| counts.values().copied().max().unwrap_or(0))
            .unwrap_or(0)
    }
}

#[async_trait]
impl EvaluationHook for CountingHook {
    fn name(&self) -> &str {
        "counting"
    }

    async fn before_compute(&self, key: u64) -> EvalResult<()> {
        self.started.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut counts) = self.per_key.lock() {
            *counts.entry(key).or_insert(0) += 1;
        }
        Ok(())
    }

    async fn after_compute(&self, _key: u64, outcome: &EvalResult<u128>) {
        match outcome {
            Ok(_) => self.succeeded.fetch_add(1, Ordering::SeqCst),
            Err(_) => self.failed.fetch_add(1, Ordering::SeqCst),
        };
    }
}
