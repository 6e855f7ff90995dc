//! Driver de lote: uma tarefa por chave, todas sobre a mesma tabela.

use std::collections::BTreeMap;
use std::time::Instant;

use tokio::task::JoinHandle;

use crate::types::errors::{EvalError, EvalResult};
use crate::types::report::{BatchReport, KeyOutcome};

use super::engine::MemoEvaluator;

impl MemoEvaluator {
    /// Avalia `fib(i)` para cada `i` em `0..=max_n`.
    ///
    /// Um `max_n` negativo produz um relatório vazio.
    pub async fn evaluate_range(&self, max_n: i64) -> BatchReport {
        self.evaluate_batch(0..=max_n).await
    }

    /// Avalia uma lista arbitrária de entradas, com falha parcial.
    ///
    /// Cada entrada válida roda em sua própria tarefa tokio; entradas
    /// negativas viram `InvalidInput` sem afetar as demais. Entradas
    /// repetidas ocupam uma única chave do relatório.
    pub async fn evaluate_batch<I>(&self, inputs: I) -> BatchReport
    where
        I: IntoIterator<Item = i64>,
    {
        let mut report = BatchReport::new();
        let start = Instant::now();
        let deadline = self
            .config()
            .batch_timeout()
            .map(|timeout| tokio::time::Instant::now() + timeout);

        let mut tasks: BTreeMap<u64, JoinHandle<EvalResult<u128>>> = BTreeMap::new();
        for n in inputs {
            let Ok(key) = u64::try_from(n) else {
                report.insert(n, KeyOutcome::Error(EvalError::InvalidInput(n)));
                continue;
            };
            if tasks.contains_key(&key) {
                continue;
            }

            let evaluator = self.clone();
            tasks.insert(key, tokio::spawn(async move { evaluator.run_task(n).await }));
        }

        tracing::info!(
            run_id = %report.run_id,
            tasks = tasks.len(),
            rejected = report.len(),
            "Batch dispatched"
        );

        let mut expired = false;
        for (key, mut handle) in tasks {
            let joined = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, &mut handle).await {
                    Ok(joined) => Some(joined),
                    Err(_) => {
                        handle.abort();
                        None
                    }
                },
                None => Some(handle.await),
            };

            let outcome = match joined {
                Some(Ok(Err(EvalError::Cancelled(_)))) if expired => Err(EvalError::Timeout(key)),
                Some(Ok(outcome)) => outcome,
                Some(Err(join_error)) => Err(EvalError::failure(
                    key,
                    format!("tarefa terminou de forma anormal: {}", join_error),
                )),
                None => {
                    expired = true;
                    Err(EvalError::Timeout(key))
                }
            };

            if let Err(e) = &outcome {
                tracing::debug!(key, error = %e, "Key failed");
            }
            report.insert(key as i64, outcome);
        }

        report.elapsed_ms = start.elapsed().as_millis() as u64;

        let summary = report.summary();
        if summary.failed > 0 {
            tracing::warn!(
                run_id = %report.run_id,
                failed = summary.failed,
                total = summary.total,
                "Batch finished with failures"
            );
        } else {
            tracing::info!(
                run_id = %report.run_id,
                total = summary.total,
                elapsed_ms = report.elapsed_ms,
                "Batch finished"
            );
        }

        report
    }

    /// Corpo de cada tarefa do lote, respeitando o limite de concorrência.
    async fn run_task(&self, n: i64) -> EvalResult<u128> {
        let _permit = match &self.inner.limiter {
            Some(limiter) => Some(
                limiter
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|_| EvalError::Cancelled(n as u64))?,
            ),
            None => None,
        };

        self.evaluate(n).await
    }
}
