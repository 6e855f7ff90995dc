//! Avaliador concorrente com memoização.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::cache::{CacheStats, Lookup, MemoTable};
use crate::hooks::{EvaluationHook, HookSystem};
use crate::types::config::EvaluatorConfig;
use crate::types::errors::{EvalError, EvalResult};

/// Maior chave cujo valor cabe em `u128`.
pub const MAX_KEY: u64 = 186;

/// Futuro recursivo de avaliação.
type EvalFuture<'a> = Pin<Box<dyn Future<Output = EvalResult<u128>> + Send + 'a>>;

pub(super) struct EvaluatorInner {
    pub(super) table: MemoTable,
    pub(super) config: EvaluatorConfig,
    pub(super) hooks: HookSystem,
    pub(super) limiter: Option<Arc<Semaphore>>,
}

/// Avaliador de `fib(n)` com computação no máximo uma vez por chave.
///
/// Responsável por:
/// - Validar a entrada (`n >= 0`)
/// - Reivindicar chaves ausentes na [`MemoTable`] e computá-las fora do lock
/// - Aguardar computações já em andamento em vez de repeti-las
/// - Publicar o resultado (ou o erro) para todos os waiters
///
/// Clonar o avaliador compartilha a mesma tabela, configuração e hooks.
#[derive(Clone)]
pub struct MemoEvaluator {
    pub(super) inner: Arc<EvaluatorInner>,
}

impl MemoEvaluator {
    /// Cria um avaliador com tabela nova e hooks padrão.
    pub fn new(config: EvaluatorConfig) -> Self {
        Self::builder().config(config).build()
    }

    /// Cria um avaliador sobre uma tabela fornecida pelo chamador.
    pub fn with_table(table: MemoTable, config: EvaluatorConfig) -> Self {
        Self::builder().table(table).config(config).build()
    }

    /// Inicia um builder.
    pub fn builder() -> EvaluatorBuilder {
        EvaluatorBuilder::new()
    }

    /// Avalia `fib(n)`.
    ///
    /// Pode ser chamado concorrentemente por qualquer número de tarefas;
    /// cada chave `n >= 2` é computada no máximo uma vez enquanto estiver
    /// na tabela.
    ///
    /// # Errors
    ///
    /// - [`EvalError::InvalidInput`] se `n < 0` (a tabela não é tocada)
    /// - [`EvalError::ComputationFailure`] se a computação (ou um hook) falhar,
    ///   ou se `n > MAX_KEY` (o valor não cabe em `u128`)
    ///
    /// Se o dono de uma chave aguardada for descartado, o chamador tenta
    /// reivindicá-la de novo em vez de falhar.
    pub async fn evaluate(&self, n: i64) -> EvalResult<u128> {
        let key = u64::try_from(n).map_err(|_| EvalError::InvalidInput(n))?;
        self.evaluate_key(key).await
    }

    fn evaluate_key(&self, key: u64) -> EvalFuture<'_> {
        Box::pin(async move {
            if key < 2 {
                return Ok(u128::from(key));
            }
            if key > MAX_KEY {
                return Err(EvalError::failure(key, "resultado excede u128"));
            }

            loop {
                match self.inner.table.lookup(key) {
                    Lookup::Hit(value) => return Ok(value),
                    Lookup::Wait(pending) => {
                        tracing::trace!(key, "Waiting for in-flight computation");
                        match pending.wait().await {
                            // O dono foi descartado; a chave está livre de novo.
                            Err(EvalError::Cancelled(_)) => {
                                tracing::debug!(key, "Owner cancelled, retrying lookup");
                            }
                            outcome => return outcome,
                        }
                    }
                    Lookup::Claimed(claim) => {
                        tracing::trace!(key, "Claimed key");
                        let hooks = &self.inner.hooks;

                        let outcome = match hooks.run_before_compute(key).await {
                            Ok(()) => self.compute(key).await,
                            Err(e) => Err(e),
                        };
                        hooks.run_after_compute(key, &outcome).await;

                        return claim.complete(outcome);
                    }
                }
            }
        })
    }

    /// Computa `fib(key)` a partir das duas chaves anteriores.
    ///
    /// O primeiro erro descarta o outro ramo, e a chave dele volta a ficar livre.
    async fn compute(&self, key: u64) -> EvalResult<u128> {
        let delay = self.inner.config.simulated_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let (prev, prev2) =
            tokio::try_join!(self.evaluate_key(key - 1), self.evaluate_key(key - 2))?;

        prev.checked_add(prev2)
            .ok_or_else(|| EvalError::failure(key, "resultado excede u128"))
    }

    /// Tabela de memoização usada por este avaliador.
    pub fn table(&self) -> &MemoTable {
        &self.inner.table
    }

    /// Configuração do avaliador.
    pub fn config(&self) -> &EvaluatorConfig {
        &self.inner.config
    }

    /// Estatísticas da tabela.
    pub fn stats(&self) -> CacheStats {
        self.inner.table.stats()
    }

    /// Limpa a tabela entre execuções independentes.
    pub fn clear(&self) {
        self.inner.table.clear();
    }
}

impl Default for MemoEvaluator {
    fn default() -> Self {
        Self::new(EvaluatorConfig::default())
    }
}

impl std::fmt::Debug for MemoEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoEvaluator")
            .field("table", &self.inner.table)
            .field("config", &self.inner.config)
            .field("hooks", &self.inner.hooks)
            .finish()
    }
}

/// Builder de [`MemoEvaluator`].
pub struct EvaluatorBuilder {
    table: Option<MemoTable>,
    config: EvaluatorConfig,
    hooks: HookSystem,
}

impl EvaluatorBuilder {
    /// Cria um builder com configuração padrão e hooks padrão.
    pub fn new() -> Self {
        Self {
            table: None,
            config: EvaluatorConfig::default(),
            hooks: HookSystem::with_defaults(),
        }
    }

    /// Define a configuração.
    pub fn config(mut self, config: EvaluatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Usa uma tabela existente.
    pub fn table(mut self, table: MemoTable) -> Self {
        self.table = Some(table);
        self
    }

    /// Registra um hook.
    pub fn hook(mut self, hook: Arc<dyn EvaluationHook>) -> Self {
        self.hooks.register(hook);
        self
    }

    /// Substitui todos os hooks.
    pub fn hooks(mut self, hooks: HookSystem) -> Self {
        self.hooks = hooks;
        self
    }

    /// Constrói o avaliador.
    pub fn build(self) -> MemoEvaluator {
        let limiter = self
            .config
            .concurrency_limit
            .map(|limit| Arc::new(Semaphore::new(limit.max(1))));

        MemoEvaluator {
            inner: Arc::new(EvaluatorInner {
                table: self.table.unwrap_or_default(),
                config: self.config,
                hooks: self.hooks,
                limiter,
            }),
        }
    }
}

impl Default for EvaluatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
