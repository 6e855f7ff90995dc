//! Relatório de execução em lote.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::errors::{EvalError, EvalResult};

/// Resultado de uma chave do lote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyOutcome {
    /// Valor computado.
    Value(u128),
    /// Erro daquela chave.
    Error(EvalError),
}

impl KeyOutcome {
    /// Retorna o valor, se houver.
    pub fn value(&self) -> Option<u128> {
        match self {
            KeyOutcome::Value(v) => Some(*v),
            KeyOutcome::Error(_) => None,
        }
    }

    /// Retorna o erro, se houver.
    pub fn error(&self) -> Option<&EvalError> {
        match self {
            KeyOutcome::Value(_) => None,
            KeyOutcome::Error(e) => Some(e),
        }
    }

    /// Verifica se a chave falhou.
    pub fn is_error(&self) -> bool {
        matches!(self, KeyOutcome::Error(_))
    }
}

impl From<EvalResult<u128>> for KeyOutcome {
    fn from(result: EvalResult<u128>) -> Self {
        match result {
            Ok(v) => KeyOutcome::Value(v),
            Err(e) => KeyOutcome::Error(e),
        }
    }
}

/// Resumo do lote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Total de chaves.
    pub total: usize,
    /// Chaves com valor.
    pub succeeded: usize,
    /// Chaves com erro.
    pub failed: usize,
}

impl std::fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} chaves: {} ok, {} com erro",
            self.total, self.succeeded, self.failed
        )
    }
}

/// Relatório de um lote: mapa chave -> sucesso ou erro.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// ID único da execução.
    pub run_id: String,

    /// Início da execução.
    pub started_at: chrono::DateTime<chrono::Utc>,

    /// Duração total em milissegundos.
    pub elapsed_ms: u64,

    /// Resultado por chave, em ordem crescente.
    pub results: BTreeMap<i64, KeyOutcome>,
}

impl BatchReport {
    /// Cria um relatório vazio.
    pub fn new() -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            started_at: chrono::Utc::now(),
            elapsed_ms: 0,
            results: BTreeMap::new(),
        }
    }

    /// Registra o resultado de uma chave.
    pub fn insert(&mut self, key: i64, outcome: impl Into<KeyOutcome>) {
        self.results.insert(key, outcome.into());
    }

    /// Número de chaves.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Verifica se o relatório está vazio.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Resultado de uma chave.
    pub fn get(&self, key: i64) -> Option<&KeyOutcome> {
        self.results.get(&key)
    }

    /// Valor de uma chave (None se ausente ou com erro).
    pub fn value(&self, key: i64) -> Option<u128> {
        self.get(key).and_then(KeyOutcome::value)
    }

    /// Verifica se alguma chave falhou.
    pub fn has_failures(&self) -> bool {
        self.results.values().any(KeyOutcome::is_error)
    }

    /// Chaves com erro, em ordem crescente.
    pub fn failures(&self) -> Vec<(i64, &EvalError)> {
        self.results
            .iter()
            .filter_map(|(k, o)| o.error().map(|e| (*k, e)))
            .collect()
    }

    /// Chaves com valor, em ordem crescente.
    pub fn successes(&self) -> Vec<(i64, u128)> {
        self.results
            .iter()
            .filter_map(|(k, o)| o.value().map(|v| (*k, v)))
            .collect()
    }

    /// Resumo de contagens.
    pub fn summary(&self) -> BatchSummary {
        let failed = self.results.values().filter(|o| o.is_error()).count();
        BatchSummary {
            total: self.results.len(),
            succeeded: self.results.len() - failed,
            failed,
        }
    }
}

impl Default for BatchReport {
    fn default() -> Self {
        Self::new()
    }
}
