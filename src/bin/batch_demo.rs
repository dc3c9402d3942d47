//! batch-demo: 用模拟的不稳定服务演示批处理编排
//!
//! Usage:
//!   batch-demo [--items N] [--concurrency C] [--fail-every K] [--config PATH]
//!
//! Every K-th item is rejected as invalid; every third item hits a rate limit once before
//! succeeding. Set `RUST_LOG=debug` to watch retries.

use ai_lib_orchestrator::batch::{BatchItem, CancellationToken};
use ai_lib_orchestrator::provider::{run_provider_batch, AnalysisProvider, ProviderResponse};
use ai_lib_orchestrator::usage::UsageDelta;
use ai_lib_orchestrator::{Error, OrchestratorConfig, ResponseMeta};
use anyhow::{bail, Context};
use async_trait::async_trait;
use rand::Rng;
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

struct Args {
    items: usize,
    concurrency: Option<usize>,
    fail_every: usize,
    config: Option<String>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = Args {
        items: 10,
        concurrency: None,
        fail_every: 4,
        config: None,
    };
    let mut it = std::env::args().skip(1);
    while let Some(flag) = it.next() {
        let mut value = || it.next().with_context(|| format!("{} needs a value", flag));
        match flag.as_str() {
            "--items" => args.items = value()?.parse().context("--items")?,
            "--concurrency" => args.concurrency = Some(value()?.parse().context("--concurrency")?),
            "--fail-every" => args.fail_every = value()?.parse().context("--fail-every")?,
            "--config" => args.config = Some(value()?),
            "help" | "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => bail!("unknown argument: {}", other),
        }
    }
    Ok(args)
}

fn print_usage() {
    println!(
        r#"batch-demo: run a simulated flaky provider through the orchestrator

USAGE:
    batch-demo [--items N] [--concurrency C] [--fail-every K] [--config PATH]

ENVIRONMENT:
    RUST_LOG                    Log filter (e.g. debug)
    AI_LIB_BATCH_CONCURRENCY    Overrides batch.concurrency"#
    );
}

struct SimulatedProvider {
    fail_every: usize,
    rate_limited_once: Mutex<HashSet<usize>>,
}

#[async_trait]
impl AnalysisProvider for SimulatedProvider {
    type Request = (usize, String);
    type Value = String;

    fn provider_id(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        "gpt-4o-mini"
    }

    async fn call(&self, request: &(usize, String)) -> ai_lib_orchestrator::Result<ProviderResponse<String>> {
        let (index, text) = request;
        let latency = rand::thread_rng().gen_range(20..120);
        tokio::time::sleep(Duration::from_millis(latency)).await;

        if self.fail_every > 0 && index % self.fail_every == self.fail_every - 1 {
            return Err(Error::remote(
                format!("item {} rejected: payload failed schema check", index),
                ResponseMeta::with_status(400),
            ));
        }

        let first_hit = index % 3 == 1
            && self
                .rate_limited_once
                .lock()
                .map(|mut seen| seen.insert(*index))
                .unwrap_or(false);
        if first_hit {
            return Err(Error::remote(
                "too many requests",
                ResponseMeta::with_status(429).with_header("retry-after", "0.2"),
            ));
        }

        let input = text.len() as u64 * 40;
        Ok(ProviderResponse::new(format!("summary of {}", text))
            .with_usage(UsageDelta::new(input, input / 4)))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = parse_args()?;
    let mut config = match &args.config {
        Some(path) => OrchestratorConfig::load(path).with_context(|| format!("loading {}", path))?,
        None => {
            let mut c = OrchestratorConfig::default();
            c.retry.base_delay_ms = 100;
            c.retry.max_delay_ms = 2_000;
            c.apply_env_overrides()
        }
    };
    if let Some(c) = args.concurrency {
        config.batch.concurrency = c;
    }
    config.validate()?;

    let provider = SimulatedProvider {
        fail_every: args.fail_every,
        rate_limited_once: Mutex::new(HashSet::new()),
    };
    let items: Vec<BatchItem<(usize, String)>> = (0..args.items)
        .map(|i| BatchItem::new(format!("doc-{}", i), (i, format!("document {}", i))))
        .collect();

    let token = CancellationToken::new();
    let ctrl_c = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let progress = |msg: &str| println!("  {}", msg);
    let report = run_provider_batch(
        &provider,
        items,
        &config.invoker(),
        &config.scheduler(),
        &token,
        Some(&progress),
    )
    .await?;

    for o in &report.outcomes {
        match &o.result {
            Ok(v) => println!("[{:>3}] {:<8} ok    {}", o.item_index, o.item_id, v),
            Err(f) => println!(
                "[{:>3}] {:<8} {:<10} {}",
                o.item_index,
                o.item_id,
                f.class.name(),
                f.actionable_message()
            ),
        }
    }
    println!(
        "\n{}/{} succeeded in {} window(s), {:?}",
        report.success_count(),
        report.len(),
        report.windows,
        report.elapsed
    );
    println!(
        "usage: {} in / {} out / {} total, est. ${:.6}",
        report.usage.input_units,
        report.usage.output_units,
        report.usage.total_units,
        report.usage.estimated_cost
    );
    Ok(())
}
