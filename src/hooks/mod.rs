//! Sistema de hooks do memofib.
//!
//! Hooks permitem observar (ou interromper) cada computação reivindicada
//! pelo avaliador:
//!
//! - `before_compute`: antes de computar uma chave; um erro aqui vira a
//!   falha daquela chave
//! - `after_compute`: após o resultado ser conhecido, antes de publicá-lo
//!
//! Hooks não rodam para casos base nem para acertos de cache.

mod builtin;

pub use builtin::{CountingHook, LoggingHook};

use std::sync::Arc;

use async_trait::async_trait;

use crate::types::errors::EvalResult;

// ═══════════════════════════════════════════════════════════════════════════
// Trait EvaluationHook
// ═══════════════════════════════════════════════════════════════════════════

/// Trait para hooks de computação.
#[async_trait]
pub trait EvaluationHook: Send + Sync {
    /// Nome do hook.
    fn name(&self) -> &str;

    /// Executado pelo dono da chave antes de computá-la.
    async fn before_compute(&self, _key: u64) -> EvalResult<()> {
        Ok(())
    }

    /// Executado com o resultado da computação.
    async fn after_compute(&self, _key: u64, _outcome: &EvalResult<u128>) {}
}

// ═══════════════════════════════════════════════════════════════════════════
// Sistema de hooks
// ═══════════════════════════════════════════════════════════════════════════

/// Gerenciador de hooks.
#[derive(Clone, Default)]
pub struct HookSystem {
    hooks: Vec<Arc<dyn EvaluationHook>>,
}

impl HookSystem {
    /// Cria um novo sistema de hooks vazio.
    pub fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    /// Cria um sistema com hooks padrão (logging).
    pub fn with_defaults() -> Self {
        let mut system = Self::new();
        system.register(Arc::new(LoggingHook));
        system
    }

    /// Registra um hook.
    pub fn register(&mut self, hook: Arc<dyn EvaluationHook>) {
        tracing::debug!(hook_name = hook.name(), "Registering hook");
        self.hooks.push(hook);
    }

    /// Executa `before_compute` em ordem de registro.
    ///
    /// Para no primeiro erro.
    pub async fn run_before_compute(&self, key: u64) -> EvalResult<()> {
        for hook in &self.hooks {
            hook.before_compute(key).await?;
        }

        Ok(())
    }

    /// Executa `after_compute` em ordem de registro.
    pub async fn run_after_compute(&self, key: u64, outcome: &EvalResult<u128>) {
        for hook in &self.hooks {
            hook.after_compute(key, outcome).await;
        }
    }

    /// Retorna o número de hooks registrados.
    pub fn count(&self) -> usize {
        self.hooks.len()
    }

    /// Nomes dos hooks, em ordem de registro.
    pub fn names(&self) -> Vec<&str> {
        self.hooks.iter().map(|h| h.name()).collect()
    }
}

impl std::fmt::Debug for HookSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookSystem")
            .field("hooks", &self.names())
            .finish()
    }
}
