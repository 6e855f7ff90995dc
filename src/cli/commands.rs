//! Implementação dos comandos CLI do memofib.

use std::path::{Path, PathBuf};

use crate::evaluator::MemoEvaluator;
use crate::types::config::{Config, EvaluatorConfig};
use crate::types::report::{BatchReport, KeyOutcome};
use crate::{MemoFibError, MemoFibResult};

use super::RunArgs;

/// Initializes configuration in the specified directory.
pub async fn init(path: Option<PathBuf>) -> MemoFibResult<()> {
    let target_dir = path.unwrap_or_else(|| PathBuf::from("."));

    if !target_dir.exists() {
        std::fs::create_dir_all(&target_dir)?;
        tracing::info!("Directory created: {}", target_dir.display());
    }

    let config_path = target_dir.join("memofib.toml");

    if config_path.exists() {
        println!("Configuration already exists at: {}", config_path.display());
        return Ok(());
    }

    let config = Config::default_config();
    config.save(&config_path)?;

    println!("memofib initialized successfully!");
    println!("Configuration created at: {}", config_path.display());
    println!();
    println!("Next steps:");
    println!("  1. Adjust [evaluator] in memofib.toml (concurrency_limit, simulated_delay_ms)");
    println!("  2. Run: memofib range 15");

    Ok(())
}

/// Calcula fib(0) até fib(max_n).
pub async fn range(max_n: i64, run: &RunArgs, config: &Config) -> MemoFibResult<()> {
    let evaluator = MemoEvaluator::new(apply_overrides(&config.evaluator, run));

    if !run.json {
        println!(
            "Calculando Fibonacci até {} concorrentemente ({})...",
            max_n,
            describe_limit(evaluator.config())
        );
    }

    let report = evaluator.evaluate_range(max_n).await;
    print_report(&report, &evaluator, run.json)?;
    finish(&report)
}

/// Calcula fib(n) para cada entrada.
pub async fn eval(inputs: &[i64], run: &RunArgs, config: &Config) -> MemoFibResult<()> {
    let evaluator = MemoEvaluator::new(apply_overrides(&config.evaluator, run));

    let report = evaluator.evaluate_batch(inputs.iter().copied()).await;
    print_report(&report, &evaluator, run.json)?;
    finish(&report)
}

/// Mostra versão.
pub fn version() {
    println!("memofib {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Fibonacci concorrente com memoização compartilhada");
}

/// Aplica as opções da linha de comando sobre a configuração.
fn apply_overrides(base: &EvaluatorConfig, run: &RunArgs) -> EvaluatorConfig {
    let mut config = base.clone();

    if let Some(limit) = run.limit {
        config.concurrency_limit = Some(limit.max(1));
    }
    if let Some(delay) = run.delay_ms {
        config.simulated_delay_ms = delay;
    }
    if let Some(timeout) = run.timeout_ms {
        config.batch_timeout_ms = Some(timeout);
    }

    tracing::debug!(?config, "Evaluator configuration");
    config
}

fn describe_limit(config: &EvaluatorConfig) -> String {
    match config.concurrency_limit {
        Some(limit) => format!("até {} tarefas simultâneas", limit),
        None => "tarefas ilimitadas".to_string(),
    }
}

fn print_report(report: &BatchReport, evaluator: &MemoEvaluator, json: bool) -> MemoFibResult<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    for (n, outcome) in &report.results {
        match outcome {
            KeyOutcome::Value(v) => println!("  fib({}) = {}", n, v),
            KeyOutcome::Error(e) => println!("  fib({}) ✗ {}", n, e),
        }
    }

    let stats = evaluator.stats();
    println!();
    println!(
        "Tempo total: {:.4} segundos",
        report.elapsed_ms as f64 / 1000.0
    );
    println!(
        "Cache: {} chaves, {} acertos, {} esperas, {} computações",
        stats.done, stats.hits, stats.joins, stats.completed
    );
    println!("Resumo: {}", report.summary());

    Ok(())
}

/// Converte falhas do lote em erro de saída.
fn finish(report: &BatchReport) -> MemoFibResult<()> {
    if !report.has_failures() {
        return Ok(());
    }

    let keys: Vec<String> = report
        .failures()
        .iter()
        .map(|(n, _)| n.to_string())
        .collect();
    Err(MemoFibError::other(format!(
        "Cálculo concluído com erros nas chaves: {}",
        keys.join(", ")
    )))
}

/// Carrega a configuração, caindo no padrão se o arquivo não existir.
pub fn load_config(path: &Path) -> MemoFibResult<Config> {
    if path.exists() {
        Config::load(path)
    } else {
        Ok(Config::default_config())
    }
}
