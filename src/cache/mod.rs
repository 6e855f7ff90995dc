//! Cache de memoização compartilhado.
//!
//! Este módulo implementa a tabela chave -> entrada usada por todos os
//! chamadores concorrentes do avaliador. Cada chave passa por no máximo
//! dois estados: `Pending` (computação em andamento, com canal para quem
//! quiser aguardar) e `Done` (valor final).

mod table;

pub use table::{CacheStats, Claim, Lookup, MemoTable, PendingHandle};
