//! Small helpers for demos: the XOR benchmark set and console summaries.
use crate::datasets::Sample;
use crate::network::Network;
use crate::training::EpochStats;

/// The four XOR patterns with a single `0.0`/`1.0` target.
pub fn xor_dataset() -> Vec<Sample> {
    [(0.0, 0.0), (0.0, 1.0), (1.0, 0.0), (1.0, 1.0)]
        .into_iter()
        .map(|(a, b): (f64, f64)| {
            let t = if (a > 0.5) != (b > 0.5) { 1.0 } else { 0.0 };
            (vec![a, b], vec![t])
        })
        .collect()
}

/// Print model summary
pub fn print_model_summary(network: &Network) {
    println!("Model Summary:\n{}", network);
    println!("Parameters: {}", network.parameter_count());
}

/// Print a per-epoch table of accuracy and mean loss.
pub fn print_summary_table(history: &[EpochStats], title: &str) {
    println!("\n{} Summary Table:", title);
    println!("+-------+----------+-----------+");
    println!("| Epoch | Accuracy | Mean loss |");
    println!("+-------+----------+-----------+");
    for s in history {
        println!(
            "| {:>5} | {:>7.2}% | {:>9.6} |",
            s.epoch,
            s.accuracy * 100.0,
            s.mean_loss
        );
    }
    println!("+-------+----------+-----------+");
}
