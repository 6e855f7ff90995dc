//! Tipos de erro do memofib.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tipo de resultado padrão do memofib.
pub type MemoFibResult<T> = Result<T, MemoFibError>;

/// Resultado de uma avaliação individual.
pub type EvalResult<T> = Result<T, EvalError>;

/// Erros de avaliação de uma chave.
///
/// São clonáveis porque o mesmo erro é entregue ao dono da computação
/// e a todos os chamadores que aguardavam a mesma chave.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum EvalError {
    #[error("Entrada inválida: {0} (esperado inteiro não negativo)")]
    InvalidInput(i64),

    #[error("Falha ao computar fib({key}): {reason}")]
    ComputationFailure { key: u64, reason: String },

    #[error("Computação de fib({0}) cancelada antes de concluir")]
    Cancelled(u64),

    #[error("Prazo do lote esgotado antes de fib({0}) concluir")]
    Timeout(u64),
}

impl EvalError {
    /// Cria uma falha de computação.
    pub fn failure<S: Into<String>>(key: u64, reason: S) -> Self {
        Self::ComputationFailure {
            key,
            reason: reason.into(),
        }
    }

    /// Indica se o erro veio da validação da entrada.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}

/// Erros possíveis no memofib.
#[derive(Error, Debug)]
pub enum MemoFibError {
    #[error("Erro de configuração: {0}")]
    Config(String),

    #[error("Erro de IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("Erro ao parsear TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Erro ao serializar TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Erro de JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error("{0}")]
    Other(String),
}

impl MemoFibError {
    /// Cria um erro genérico.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Self::Other(msg.into())
    }

    /// Cria um erro de configuração.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eval_error_messages() {
        let err = EvalError::InvalidInput(-3);
        assert!(err.to_string().contains("-3"));
        assert!(err.is_invalid_input());

        let err = EvalError::failure(190, "overflow");
        assert!(err.to_string().contains("fib(190)"));
        assert!(!err.is_invalid_input());
    }

    #[test]
    fn test_eval_error_converts_into_app_error() {
        let err: MemoFibError = EvalError::Cancelled(7).into();
        assert!(matches!(err, MemoFibError::Eval(EvalError::Cancelled(7))));
    }

    #[test]
    fn test_eval_error_serializes_with_kind_tag() {
        let json = serde_json::to_value(EvalError::Timeout(12)).unwrap();
        assert_eq!(json["kind"], "timeout");
        assert_eq!(json["detail"], 12);

        let json = serde_json::to_value(EvalError::Cancelled(12)).unwrap();
        assert_eq!(json["kind"], "cancelled");
        assert_eq!(json["detail"], 12);
    }
}
