//! # memofib
//!
//! Avaliador concorrente de Fibonacci com memoização compartilhada.
//!
//! Muitas tarefas podem pedir `fib(n)` ao mesmo tempo; cada chave é
//! computada no máximo uma vez e todos os chamadores recebem o mesmo valor.
//!
//! ## Módulos
//!
//! - [`evaluator`] - Avaliador e driver de lote
//! - [`cache`] - Tabela de memoização (`Pending` / `Done`)
//! - [`hooks`] - Hooks em volta de cada computação
//! - [`cli`] - Interface de linha de comando
//! - [`types`] - Tipos compartilhados (configuração, erros, relatórios)

pub mod cache;
#[cfg(feature = "cli")]
pub mod cli;
pub mod evaluator;
pub mod hooks;
pub mod types;

pub use cache::MemoTable;
pub use evaluator::MemoEvaluator;
pub use types::config::Config;
pub use types::errors::{EvalError, EvalResult, MemoFibError, MemoFibResult};
pub use types::report::BatchReport;
