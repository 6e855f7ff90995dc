//! Avaliador concorrente com memoização.
//!
//! Este módulo implementa o avaliador de `fib(n)` que garante no máximo
//! uma computação por chave, mesmo com muitos chamadores concorrentes,
//! e o driver de lote que despacha uma tarefa por chave sobre a mesma
//! tabela compartilhada.
//!
//! ## Exemplo
//!
//! ```rust,ignore
//! use memofib::evaluator::MemoEvaluator;
//! use memofib::types::config::EvaluatorConfig;
//!
//! let evaluator = MemoEvaluator::new(EvaluatorConfig::default());
//!
//! assert_eq!(evaluator.evaluate(10).await, Ok(55));
//!
//! let report = evaluator.evaluate_range(15).await;
//! if report.has_failures() {
//!     println!("Falhas: {:?}", report.failures());
//! }
//! ```

mod batch;
mod engine;

pub use engine::{EvaluatorBuilder, MemoEvaluator, MAX_KEY};
