//! Tabela de memoização compartilhada.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use crate::types::errors::{EvalError, EvalResult};

/// Resultado publicado pelo dono de uma computação.
type Outcome = EvalResult<u128>;

/// Estado de uma chave na tabela.
enum MemoEntry {
    /// Computação em andamento. Waiters assinam o canal `watch`.
    Pending {
        generation: u64,
        rx: watch::Receiver<Option<Outcome>>,
    },

    /// Valor final, nunca muda.
    Done(u128),
}

/// Estatísticas da tabela.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    /// Entradas concluídas.
    pub done: usize,

    /// Entradas em andamento.
    pub pending: usize,

    /// Consultas que encontraram `Done`.
    pub hits: u64,

    /// Consultas que reivindicaram a chave.
    pub misses: u64,

    /// Consultas que aguardaram uma computação alheia.
    pub joins: u64,

    /// Computações concluídas com sucesso.
    pub completed: u64,

    /// Computações que falharam ou foram canceladas.
    pub failed: u64,
}

impl CacheStats {
    /// Calcula a taxa de acerto (hits + joins sobre o total de consultas).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses + self.joins;
        if total == 0 {
            0.0
        } else {
            (self.hits + self.joins) as f64 / total as f64
        }
    }
}

/// Resultado de uma consulta à tabela.
pub enum Lookup {
    /// Valor já computado.
    Hit(u128),

    /// Outra tarefa está computando; aguarde o handle.
    Wait(PendingHandle),

    /// A chave foi reivindicada por quem consultou.
    Claimed(Claim),
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    joins: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
}

struct Inner {
    entries: Mutex<HashMap<u64, MemoEntry>>,
    next_generation: AtomicU64,
    counters: Counters,
}

/// Tabela chave -> `MemoEntry` compartilhada por todos os chamadores.
///
/// Todas as transições passam pelo mesmo `Mutex`, sempre em uma única seção
/// crítica e sem `.await` enquanto o lock está tomado:
///
/// - [`lookup`](Self::lookup) verifica a ausência e instala `Pending` juntos;
/// - [`Claim::complete`] troca `Pending` por `Done` (ou remove em caso de erro).
///
/// Clonar a tabela compartilha o mesmo estado.
#[derive(Clone)]
pub struct MemoTable {
    inner: Arc<Inner>,
}

impl MemoTable {
    /// Cria uma tabela vazia.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
                counters: Counters::default(),
            }),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<u64, MemoEntry>> {
        // Nenhuma seção crítica entra em pânico no meio de uma transição.
        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Consulta a chave e, se ausente, a reivindica atomicamente.
    pub fn lookup(&self, key: u64) -> Lookup {
        let counters = &self.inner.counters;
        let mut entries = self.entries();

        match entries.get(&key) {
            Some(MemoEntry::Done(value)) => {
                counters.hits.fetch_add(1, Ordering::Relaxed);
                Lookup::Hit(*value)
            }
            Some(MemoEntry::Pending { rx, .. }) => {
                counters.joins.fetch_add(1, Ordering::Relaxed);
                Lookup::Wait(PendingHandle {
                    key,
                    rx: rx.clone(),
                })
            }
            None => {
                let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
                let (tx, rx) = watch::channel(None);
                entries.insert(key, MemoEntry::Pending { generation, rx });
                counters.misses.fetch_add(1, Ordering::Relaxed);

                Lookup::Claimed(Claim {
                    table: self.clone(),
                    key,
                    generation,
                    tx,
                    settled: false,
                })
            }
        }
    }

    /// Encerra a reivindicação `generation` de `key` e avisa os waiters.
    fn settle(&self, key: u64, generation: u64, tx: &watch::Sender<Option<Outcome>>, outcome: &Outcome) {
        let counters = &self.inner.counters;
        let mut entries = self.entries();

        // A tabela pode ter sido limpa (e a chave reivindicada de novo) durante a computação.
        let owned = matches!(
            entries.get(&key),
            Some(MemoEntry::Pending { generation: g, .. }) if *g == generation
        );

        // Donos de uma geração anterior só avisam seus waiters.
        if owned {
            match outcome {
                Ok(value) => {
                    entries.insert(key, MemoEntry::Done(*value));
                    counters.completed.fetch_add(1, Ordering::Relaxed);
                }
                Err(_) => {
                    entries.remove(&key);
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        tx.send_replace(Some(outcome.clone()));
    }

    /// Retorna o valor concluído de `key`, sem reivindicar nem aguardar.
    pub fn get(&self, key: u64) -> Option<u128> {
        match self.entries().get(&key) {
            Some(MemoEntry::Done(value)) => Some(*value),
            _ => None,
        }
    }

    /// Verifica se existe qualquer entrada (pendente ou concluída) para `key`.
    pub fn contains(&self, key: u64) -> bool {
        self.entries().contains_key(&key)
    }

    /// Verifica se `key` está em computação.
    pub fn is_pending(&self, key: u64) -> bool {
        matches!(self.entries().get(&key), Some(MemoEntry::Pending { .. }))
    }

    /// Número total de entradas.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Verifica se a tabela está vazia.
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Chaves concluídas, em ordem crescente.
    pub fn done_keys(&self) -> Vec<u64> {
        let mut keys: Vec<u64> = self
            .entries()
            .iter()
            .filter(|(_, entry)| matches!(entry, MemoEntry::Done(_)))
            .map(|(key, _)| *key)
            .collect();
        keys.sort_unstable();
        keys
    }

    /// Limpa toda a tabela e zera as estatísticas.
    ///
    /// Computações em andamento ainda entregam o resultado aos seus waiters,
    /// mas não o gravam na tabela nova.
    pub fn clear(&self) {
        self.entries().clear();

        let counters = &self.inner.counters;
        counters.hits.store(0, Ordering::Relaxed);
        counters.misses.store(0, Ordering::Relaxed);
        counters.joins.store(0, Ordering::Relaxed);
        counters.completed.store(0, Ordering::Relaxed);
        counters.failed.store(0, Ordering::Relaxed);
    }

    /// Retorna estatísticas da tabela.
    pub fn stats(&self) -> CacheStats {
        let (done, pending) = {
            let entries = self.entries();
            let done = entries
                .values()
                .filter(|entry| matches!(entry, MemoEntry::Done(_)))
                .count();
            (done, entries.len() - done)
        };

        let counters = &self.inner.counters;
        CacheStats {
            done,
            pending,
            hits: counters.hits.load(Ordering::Relaxed),
            misses: counters.misses.load(Ordering::Relaxed),
            joins: counters.joins.load(Ordering::Relaxed),
            completed: counters.completed.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
        }
    }
}

impl Default for MemoTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        f.debug_struct("MemoTable")
            .field("done", &stats.done)
            .field("pending", &stats.pending)
            .finish()
    }
}

/// Handle para aguardar uma computação de outra tarefa.
pub struct PendingHandle {
    key: u64,
    rx: watch::Receiver<Option<Outcome>>,
}

impl PendingHandle {
    /// Chave aguardada.
    pub fn key(&self) -> u64 {
        self.key
    }

    /// Aguarda o dono publicar o resultado.
    pub async fn wait(mut self) -> Outcome {
        let key = self.key;
        match self.rx.wait_for(Option::is_some).await {
            Ok(published) => Option::clone(&published).unwrap_or(Err(EvalError::Cancelled(key))),
            Err(_) => Err(EvalError::Cancelled(key)),
        }
    }
}

/// Posse exclusiva da computação de uma chave.
///
/// Se for descartada sem [`complete`](Self::complete), a entrada `Pending`
/// é removida e os waiters recebem [`EvalError::Cancelled`].
pub struct Claim {
    table: MemoTable,
    key: u64,
    generation: u64,
    tx: watch::Sender<Option<Outcome>>,
    settled: bool,
}

impl Claim {
    /// Chave reivindicada.
    pub fn key(&self) -> u64 {
        self.key
    }

    /// Publica o resultado: `Ok` vira `Done`, `Err` libera a chave para nova tentativa.
    pub fn complete(mut self, outcome: Outcome) -> Outcome {
        self.table
            .settle(self.key, self.generation, &self.tx, &outcome);
        self.settled = true;
        outcome
    }
}

impl Drop for Claim {
    fn drop(&mut self) {
        if self.settled {
            return;
        }

        tracing::debug!(key = self.key, "Claim dropped before completion");
        let outcome = Err(EvalError::Cancelled(self.key));
        self.table
            .settle(self.key, self.generation, &self.tx, &outcome);
    }
}
