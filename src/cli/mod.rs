//! Interface de linha de comando do memofib.

pub mod commands;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// memofib - Fibonacci concorrente com memoização compartilhada.
#[derive(Parser, Debug)]
#[command(name = "memofib")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Arquivo de configuração.
    #[arg(short, long, default_value = "memofib.toml")]
    pub config: PathBuf,

    /// Modo verbose.
    #[arg(short, long)]
    pub verbose: bool,

    /// Modo silencioso.
    #[arg(short, long)]
    pub quiet: bool,

    /// Comando a executar.
    #[command(subcommand)]
    pub command: Commands,
}

/// Comandos disponíveis.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inicializa configuração no diretório atual.
    Init {
        /// Diretório de destino (padrão: diretório atual).
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// Calcula fib(0) até fib(MAX_N) concorrentemente.
    Range {
        /// Maior índice do intervalo (inclusivo).
        max_n: i64,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Calcula fib(n) para cada entrada informada.
    Eval {
        /// Entradas (valores negativos são reportados como erro).
        #[arg(required = true, allow_negative_numbers = true)]
        inputs: Vec<i64>,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Mostra versão.
    Version,
}

/// Opções de execução que sobrescrevem o arquivo de configuração.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Máximo de tarefas simultâneas.
    #[arg(long)]
    pub limit: Option<usize>,

    /// Pausa simulada por computação, em milissegundos.
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Prazo do lote inteiro, em milissegundos.
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Imprime o relatório em JSON.
    #[arg(long)]
    pub json: bool,
}
