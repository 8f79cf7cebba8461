// ml_examples/src/main.rs
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use neuronet::datasets::NUM_CLASSES;
use neuronet::{
    accuracy, confusion_matrix, load_dataset, print_model_summary, print_summary_table, to_dataset,
    train, xor_dataset, Activation, Network, NetworkConfig, TrainConfig, WeightInit,
};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "ml_examples", about = "Train and evaluate a multilayer perceptron on MNIST")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Train the digit classifier, saving weights after every epoch
    Train(TrainArgs),
    /// Report accuracy of saved weights on a labelled set
    Eval(EvalArgs),
    /// Fit the XOR patterns with a small tanh network
    Xor(XorArgs),
}

#[derive(Debug, Args)]
struct ModelArgs {
    /// Hidden layer widths, comma separated
    #[arg(long, value_delimiter = ',', default_value = "100")]
    hidden: Vec<usize>,
    /// Flat weights file to resume from and save to
    #[arg(long, default_value = "brain.txt")]
    weights: PathBuf,
    /// Seed for the initial weights
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

#[derive(Debug, Args)]
struct TrainArgs {
    #[arg(long)]
    train_images: PathBuf,
    #[arg(long)]
    train_labels: PathBuf,
    #[arg(long, requires = "test_labels")]
    test_images: Option<PathBuf>,
    #[arg(long, requires = "test_images")]
    test_labels: Option<PathBuf>,
    #[command(flatten)]
    model: ModelArgs,
    /// JSON training config; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    epochs: Option<usize>,
    #[arg(long)]
    learning_rate: Option<f64>,
    /// Ignore an existing weights file
    #[arg(long)]
    fresh: bool,
}

#[derive(Debug, Args)]
struct EvalArgs {
    #[arg(long)]
    images: PathBuf,
    #[arg(long)]
    labels: PathBuf,
    #[command(flatten)]
    model: ModelArgs,
}

#[derive(Debug, Args)]
struct XorArgs {
    #[arg(long, default_value_t = 3)]
    hidden: usize,
    #[arg(long, default_value_t = 500)]
    epochs: usize,
    #[arg(long, default_value_t = 0.1)]
    learning_rate: f64,
    #[arg(long, default_value_t = 1)]
    seed: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Cli::parse().command {
        Command::Train(args) => run_train(args),
        Command::Eval(args) => run_eval(args),
        Command::Xor(args) => run_xor(args),
    }
}

fn build_classifier(model: &ModelArgs, input_size: usize) -> Result<Network> {
    Network::with_seed(
        &model.hidden,
        NUM_CLASSES,
        input_size,
        &NetworkConfig::default(),
        model.seed,
    )
    .context("building network")
}

fn input_width(images: &[neuronet::MnistImage], source: &Path) -> Result<usize> {
    match images.first() {
        Some(img) => Ok(img.pixels.len()),
        None => bail!("{} contains no images", source.display()),
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => TrainConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => TrainConfig::default(),
    };
    if let Some(epochs) = args.epochs {
        config.epochs = epochs;
    }
    if let Some(lr) = args.learning_rate {
        config.learning_rate = lr;
    }
    config.checkpoint = Some(args.model.weights.clone());

    let train_images =
        load_dataset(&args.train_images, &args.train_labels).context("loading training set")?;
    let mut network = build_classifier(&args.model, input_width(&train_images, &args.train_images)?)?;

    if !args.fresh && args.model.weights.exists() {
        network
            .load_network(&args.model.weights)
            .with_context(|| format!("resuming from {}", args.model.weights.display()))?;
        info!(weights = %args.model.weights.display(), "resuming training");
    } else {
        info!("no saved weights in use, starting fresh");
    }
    print_model_summary(&network);

    let history = train(&mut network, &to_dataset(&train_images, NUM_CLASSES), &config)?;
    print_summary_table(&history, "Training");

    if let (Some(images), Some(labels)) = (&args.test_images, &args.test_labels) {
        let test = load_dataset(images, labels).context("loading test set")?;
        let acc = accuracy(&to_dataset(&test, NUM_CLASSES), &network)?;
        println!("Test Accuracy: {:.2}%", acc * 100.0);
    }
    Ok(())
}

fn run_eval(args: EvalArgs) -> Result<()> {
    let images = load_dataset(&args.images, &args.labels).context("loading evaluation set")?;
    let mut network = build_classifier(&args.model, input_width(&images, &args.images)?)?;
    network
        .load_network(&args.model.weights)
        .with_context(|| format!("loading {}", args.model.weights.display()))?;

    let data = to_dataset(&images, NUM_CLASSES);
    let acc = accuracy(&data, &network)?;
    println!("Accuracy: {:.2}% over {} images", acc * 100.0, data.len());

    println!("Confusion matrix (rows = true digit, columns = prediction):");
    for (digit, row) in confusion_matrix(&data, &network, NUM_CLASSES)?.iter().enumerate() {
        let cells: Vec<String> = row.iter().map(|c| format!("{c:>5}")).collect();
        println!("{digit}: {}", cells.join(""));
    }
    Ok(())
}

fn run_xor(args: XorArgs) -> Result<()> {
    let config = NetworkConfig::uniform(Activation::Tanh, WeightInit::uniform(1.0));
    let mut network = Network::with_seed(&[args.hidden], 1, 2, &config, args.seed)?;
    print_model_summary(&network);

    let data = xor_dataset();
    let train_config = TrainConfig {
        epochs: args.epochs,
        learning_rate: args.learning_rate,
        shuffle: false,
        log_every: 0,
        ..TrainConfig::default()
    };
    let history = train(&mut network, &data, &train_config)?;
    if let Some(last) = history.last() {
        println!("Final mean loss: {:.6}", last.mean_loss);
    }

    let mut correct = 0;
    for (input, target) in &data {
        let out = network.predict(input)?[0];
        let hit = (out > 0.5) == (target[0] > 0.5);
        correct += hit as usize;
        println!("{input:?} -> {out:.4} (target {})", target[0]);
    }
    println!("XOR accuracy: {}/{}", correct, data.len());
    Ok(())
}
