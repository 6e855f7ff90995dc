//! Testes de integração para o avaliador concorrente do memofib.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use memofib::hooks::{CountingHook, EvaluationHook};
use memofib::types::config::EvaluatorConfig;
use memofib::{EvalError, EvalResult, MemoEvaluator, MemoTable};

const FIB_0_TO_15: [u128; 16] = [
    0, 1, 1, 2, 3, 5, 8, 13, 21, 34, 55, 89, 144, 233, 377, 610,
];

fn counted(config: EvaluatorConfig) -> (MemoEvaluator, Arc<CountingHook>) {
    let counter = Arc::new(CountingHook::new());
    let evaluator = MemoEvaluator::builder()
        .config(config)
        .hook(counter.clone())
        .build();
    (evaluator, counter)
}

/// Hook que segura a primeira computação de uma chave e então falha.
struct FlakyHook {
    key: u64,
    hold: Duration,
    tripped: AtomicBool,
}

impl FlakyHook {
    fn new(key: u64, hold: Duration) -> Self {
        Self {
            key,
            hold,
            tripped: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl EvaluationHook for FlakyHook {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn before_compute(&self, key: u64) -> EvalResult<()> {
        if key == self.key && !self.tripped.swap(true, Ordering::SeqCst) {
            tokio::time::sleep(self.hold).await;
            return Err(EvalError::failure(key, "falha injetada"));
        }
        Ok(())
    }
}

/// Hook que sempre falha para uma chave.
struct BrokenKeyHook {
    key: u64,
}

#[async_trait]
impl EvaluationHook for BrokenKeyHook {
    fn name(&self) -> &str {
        "broken-key"
    }

    async fn before_compute(&self, key: u64) -> EvalResult<()> {
        if key == self.key {
            return Err(EvalError::failure(key, "chave quebrada"));
        }
        Ok(())
    }
}

// Propriedades básicas
mod basic_tests {
    use super::*;

    #[tokio::test]
    async fn test_reference_values() {
        let evaluator = MemoEvaluator::default();

        assert_eq!(evaluator.evaluate(0).await, Ok(0));
        assert_eq!(evaluator.evaluate(1).await, Ok(1));
        assert_eq!(evaluator.evaluate(5).await, Ok(5));
        assert_eq!(evaluator.evaluate(10).await, Ok(55));
    }

    #[tokio::test]
    async fn test_negative_input_leaves_cache_unchanged() {
        let evaluator = MemoEvaluator::default();
        evaluator.evaluate(6).await.unwrap();
        let before = evaluator.table().done_keys();

        assert_eq!(evaluator.evaluate(-1).await, Err(EvalError::InvalidInput(-1)));
        assert_eq!(evaluator.table().done_keys(), before);
        assert_eq!(evaluator.stats().pending, 0);
    }

    #[tokio::test]
    async fn test_repeated_call_computes_once() {
        let (evaluator, counter) = counted(EvaluatorConfig::default());

        let first = evaluator.evaluate(25).await;
        let computations = counter.started();
        let second = evaluator.evaluate(25).await;

        assert_eq!(first, Ok(75025));
        assert_eq!(first, second);
        assert_eq!(counter.started(), computations);
        assert_eq!(counter.started_for(25), 1);
    }
}

// Concorrência
mod concurrency_tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_share_one_computation() {
        let config = EvaluatorConfig::new().with_simulated_delay(Duration::from_millis(2));
        let (evaluator, counter) = counted(config);

        let callers: Vec<_> = (0..32)
            .map(|_| {
                let evaluator = evaluator.clone();
                tokio::spawn(async move { evaluator.evaluate(20).await })
            })
            .collect();

        for caller in callers {
            assert_eq!(caller.await.unwrap(), Ok(6765));
        }

        assert_eq!(counter.started_for(20), 1);
        assert_eq!(counter.max_per_key(), 1);
        assert_eq!(counter.started(), 19);
        assert!(evaluator.stats().joins > 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_range_returns_canonical_sequence() {
        let (evaluator, counter) = counted(EvaluatorConfig::default());

        let report = evaluator.evaluate_range(15).await;

        assert_eq!(report.len(), 16);
        let keys: Vec<i64> = report.results.keys().copied().collect();
        assert_eq!(keys, (0..=15).collect::<Vec<i64>>());
        for (i, expected) in FIB_0_TO_15.iter().enumerate() {
            assert_eq!(report.value(i as i64), Some(*expected));
        }
        assert_eq!(counter.max_per_key(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_independent_tables_do_not_interfere() {
        let first = MemoEvaluator::with_table(MemoTable::new(), EvaluatorConfig::default());
        let second = MemoEvaluator::with_table(MemoTable::new(), EvaluatorConfig::default());

        first.evaluate_range(10).await;

        assert!(second.table().is_empty());
        assert_eq!(second.evaluate(10).await, Ok(55));
    }
}

// Falhas e cancelamento
mod failure_tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_failure_reaches_waiters_and_next_call_retries() {
        let counter = Arc::new(CountingHook::new());
        let evaluator = MemoEvaluator::builder()
            .hook(Arc::new(FlakyHook::new(10, Duration::from_millis(150))))
            .hook(counter.clone())
            .build();

        let owner = {
            let evaluator = evaluator.clone();
            tokio::spawn(async move { evaluator.evaluate(10).await })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(evaluator.table().is_pending(10));

        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let evaluator = evaluator.clone();
                tokio::spawn(async move { evaluator.evaluate(10).await })
            })
            .collect();

        let expected = Err(EvalError::failure(10, "falha injetada"));
        assert_eq!(owner.await.unwrap(), expected);
        for waiter in waiters {
            assert_eq!(waiter.await.unwrap(), expected);
        }

        // A chave foi liberada: nova chamada tenta de novo e tem sucesso
        assert!(!evaluator.table().contains(10));
        assert_eq!(evaluator.evaluate(10).await, Ok(55));
        assert_eq!(counter.started_for(10), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_failure_does_not_poison_other_keys() {
        let evaluator = MemoEvaluator::builder()
            .hook(Arc::new(FlakyHook::new(12, Duration::ZERO)))
            .build();

        let report = evaluator.evaluate_batch(vec![5, 9, 12]).await;

        assert_eq!(report.value(5), Some(5));
        assert_eq!(report.value(9), Some(34));
        assert!(matches!(
            report.get(12).and_then(|o| o.error()),
            Some(EvalError::ComputationFailure { key: 12, .. })
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_cancelled_owner_hands_key_to_waiter() {
        let config = EvaluatorConfig::new().with_simulated_delay(Duration::from_millis(100));
        let (evaluator, counter) = counted(config);

        let owner = {
            let evaluator = evaluator.clone();
            tokio::spawn(async move { evaluator.evaluate(3).await })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(evaluator.table().is_pending(3));

        let waiter = {
            let evaluator = evaluator.clone();
            tokio::spawn(async move { evaluator.evaluate(3).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        owner.abort();

        // O waiter reivindica a chave liberada e termina a computação
        assert_eq!(waiter.await.unwrap(), Ok(2));
        assert_eq!(counter.started_for(3), 2);
        assert_eq!(evaluator.table().get(3), Some(2));
        assert_eq!(evaluator.stats().pending, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_keys_far_above_limit_fail_per_key() {
        let evaluator = MemoEvaluator::default();

        assert!(matches!(
            evaluator.evaluate(1_000_000).await,
            Err(EvalError::ComputationFailure { key: 1_000_000, .. })
        ));

        let report = evaluator.evaluate_batch(vec![10, 600, 10_000, 186]).await;

        assert_eq!(report.value(10), Some(55));
        assert!(report.value(186).is_some());
        assert_eq!(report.summary().failed, 2);
        assert!(matches!(
            report.get(10_000).and_then(|o| o.error()),
            Some(EvalError::ComputationFailure { key: 10_000, .. })
        ));
        assert!(!evaluator.table().contains(600));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_persistent_failure_stays_linear() {
        let counter = Arc::new(CountingHook::new());
        let evaluator = MemoEvaluator::builder()
            .hook(Arc::new(BrokenKeyHook { key: 40 }))
            .hook(counter.clone())
            .build();

        let result = tokio::time::timeout(Duration::from_secs(5), evaluator.evaluate(70))
            .await
            .expect("evaluation did not finish");

        assert_eq!(result, Err(EvalError::failure(40, "chave quebrada")));
        // Cada chave acima da quebrada é tentada uma vez, sem reavaliar a sub-árvore
        assert!(counter.started() <= 68, "started = {}", counter.started());
        assert!(counter.max_per_key() <= 2);
        assert_eq!(evaluator.stats().pending, 0);

        // Chaves abaixo da quebrada continuam funcionando
        assert_eq!(evaluator.evaluate(39).await, Ok(63_245_986));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_failure_above_limit_does_not_recompute_prefix() {
        let (evaluator, counter) = counted(EvaluatorConfig::default());

        let report = evaluator.evaluate_batch(vec![186, 215, 250]).await;

        assert!(report.value(186).is_some());
        assert_eq!(report.summary().failed, 2);
        assert_eq!(counter.max_per_key(), 1);
        assert_eq!(counter.started(), 185); // chaves 2..=186
    }
}
