// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with `clap`.
// All workflow logic is delegated to Layer 2 (application).
//
//   1. `train`   — trains the MET model, one checkpoint per epoch
//   2. `predict` — loads the latest checkpoint and prints one
//                  {px, py} per event as JSON
//   3. `summary` — prints the layer table of a configuration

pub mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use commands::{Commands, PredictArgs, SummaryArgs, TrainArgs};

use crate::application::{
    predict_use_case::PredictUseCase,
    summary_use_case::SummaryUseCase,
    train_use_case::{TrainConfig, TrainUseCase},
};
use crate::ml::model::DenseEmbeddingConfig;

#[derive(Parser, Debug)]
#[command(
    name = "pupcandi-met",
    version = "0.1.0",
    about = "Learn missing transverse momentum from pile-up candidates with a dense-embedding network."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Route the subcommand to its use case; nothing is computed here.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)   => run_train(args),
            Commands::Predict(args) => run_predict(args),
            Commands::Summary(args) => run_summary(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    let config = TrainConfig::try_from(args)?;
    tracing::info!("Starting training, checkpoints in '{}'", config.checkpoint_dir);

    let history = TrainUseCase::new(config).execute()?;

    let best = history
        .iter()
        .min_by(|a, b| a.val_loss.total_cmp(&b.val_loss));
    match best {
        Some(m) => println!(
            "Training complete. Best epoch {}: val_mse={:.4}, val_mae={:.4}",
            m.epoch, m.val_loss, m.val_mae
        ),
        None => println!("Training complete (no epochs run)."),
    }
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<()> {
    let predictions = PredictUseCase::new(&args.checkpoint_dir)?.predict_file(&args.events_file)?;
    let json = serde_json::to_string_pretty(&predictions)?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Cannot write predictions to '{path}'"))?;
            println!("Wrote {} predictions to '{}'", predictions.len(), path);
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn run_summary(args: SummaryArgs) -> Result<()> {
    let use_case = match &args.checkpoint_dir {
        Some(dir) => SummaryUseCase::from_checkpoint(dir)?,
        None      => SummaryUseCase::new(DenseEmbeddingConfig::try_from(&args.model)?),
    };
    let summary = use_case.describe()?;

    println!(
        "DenseEmbedding (t_mode={}, {})",
        summary.t_mode,
        if summary.quantized { "quantized" } else { "full precision" }
    );
    for layer in &summary.layers {
        println!("  {layer}");
    }
    println!("Total parameters: {}", summary.total_params);
    Ok(())
}
