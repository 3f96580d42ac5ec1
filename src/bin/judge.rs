//! MAS 轨迹评审
//!
//! 读取轨迹目录下的 `*.json`，逐个交给评审模型，打印结论并写出 validation.json。
//!
//! 启动: cargo run --bin mas-judge -- --traces traces

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use mas::agent::create_llm;
use mas::config::load_config;
use mas::judge::TraceJudge;

#[derive(Parser)]
#[command(name = "mas-judge")]
#[command(about = "Judge saved pipeline traces with an LLM")]
struct Args {
    /// Directory containing trace JSON files (default: judge.traces_dir)
    #[arg(short, long)]
    traces: Option<PathBuf>,

    /// Output file (default: judge.output)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Judge model (default: judge.model, then llm.model)
    #[arg(short, long)]
    model: Option<String>,

    /// Use the offline mock LLM
    #[arg(long)]
    mock: bool,

    /// Extra config file (overrides config/default.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    mas::observability::init();

    let args = Args::parse();
    let mut cfg = load_config(args.config.clone()).context("Failed to load config")?;
    if args.mock {
        cfg.llm.provider = "mock".to_string();
    }

    let traces_dir = args.traces.unwrap_or_else(|| cfg.judge.traces_dir.clone());
    let output = args.output.unwrap_or_else(|| cfg.judge.output.clone());
    let model = args.model.or_else(|| cfg.judge.model.clone());

    let llm = create_llm(&cfg, model.as_deref(), cfg.judge.temperature);
    let judge = TraceJudge::new(llm);
    let report = judge
        .evaluate_dir(&traces_dir)
        .await
        .with_context(|| format!("Failed to judge traces in {}", traces_dir.display()))?;

    for result in &report.results {
        println!(
            "{}: {} (conf: {:.2})",
            result.file,
            if result.eval.correct { "CORRECT" } else { "WRONG" },
            result.eval.confidence
        );
    }

    report
        .save(&output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!(
        "\n{}/{} correct ({:.1}%)",
        report.correct(),
        report.total(),
        report.percentage()
    );

    Ok(())
}
