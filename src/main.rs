//! MAS - 多智能体流水线
//!
//! 入口：加载 .env 与配置，组装 planner → supervisor → validator → summarizer，
//! 按节点打印过程，最后输出总结并保存运行轨迹。

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use mas::agent::{create_pipeline, run_query, save_trace, trace_from_state};
use mas::config::load_config;
use mas::react::PipelineEvent;
use mas::tools::ToolGroup;
use tokio::sync::mpsc;

const DEFAULT_QUERY: &str =
    "calculate 21*2 and format the answer in one paragraph, use the calculator.";

#[derive(Parser)]
#[command(name = "mas")]
#[command(about = "Run the planner / supervisor / validator / summarizer pipeline")]
struct Args {
    /// Task for the pipeline
    #[arg(short, long, default_value = DEFAULT_QUERY)]
    query: String,

    /// Tool group given to the supervisor agent
    #[arg(short, long, default_value = "mas")]
    group: ToolGroup,

    /// Write the graph as Mermaid text to this file and exit
    #[arg(long)]
    mermaid: Option<PathBuf>,

    /// Use the offline mock LLM
    #[arg(long)]
    mock: bool,

    /// Extra config file (overrides config/default.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Do not write the run trace
    #[arg(long)]
    no_trace: bool,
}

fn print_event(event: &PipelineEvent) {
    match event {
        PipelineEvent::Plan { steps } => println!("\n--- PLANNER ---\n {:?}", steps),
        PipelineEvent::Draft { text } => println!("\n--- SUPERVISOR ---\n {}", text),
        PipelineEvent::Validation { comment, .. } => println!("\n--- VALIDATOR ---\n {}", comment),
        PipelineEvent::ToolCall { tool, args } => tracing::info!(tool = %tool, args = %args, "tool call"),
        PipelineEvent::Observation { tool, preview } => {
            tracing::info!(tool = %tool, preview = %preview, "observation")
        }
        PipelineEvent::NodeStarted { node } => tracing::debug!(node = %node, "node started"),
        PipelineEvent::Summary { .. } => {}
    }
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

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let runtime = create_pipeline(&cfg, args.group, Some(event_tx))
        .await
        .context("Failed to build pipeline")?;

    if let Some(path) = &args.mermaid {
        std::fs::write(path, runtime.graph.draw_mermaid())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Mermaid graph written to {}", path.display());
        runtime.shutdown().await;
        return Ok(());
    }

    let printer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            print_event(&event);
        }
    });

    let result = run_query(&runtime.graph, &args.query).await;
    // 关闭图中持有的发送端，打印任务随之结束
    runtime.shutdown().await;
    let _ = printer.await;
    let state = result.context("Pipeline run failed")?;

    println!("\n--- SUMMARY ---\n {}", state.summary.as_deref().unwrap_or(""));

    if !args.no_trace {
        if let Some(dir) = &cfg.app.trace_dir {
            let trace = trace_from_state(&args.query, &state);
            let path = save_trace(dir, &trace).context("Failed to save trace")?;
            tracing::info!(path = %path.display(), "trace saved");
        }
    }

    Ok(())
}
