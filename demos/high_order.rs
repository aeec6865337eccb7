//! High-order sequence demo.
//!
//! Learns `A B C D` and `E B C F`, then shows that the shared middle `B C` is
//! ambiguous on its own and resolved by the first element.
//!
//! Run with `cargo run --example high_order`. Pass `-v` for debug logs or `-vv`
//! to also dump the learned segments after every learning step.

use anyhow::Result;
use seqmem::{Config, SequenceMemory};

const NAMES: [&str; 6] = ["A", "B", "C", "D", "E", "F"];

fn names(columns: &[usize]) -> String {
    columns
        .iter()
        .map(|&c| NAMES.get(c).copied().unwrap_or("?"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn predict(memory: &mut SequenceMemory, prefix: &[usize]) -> Result<Vec<usize>> {
    memory.reset();
    for &column in prefix {
        memory.compute(&[column], false, true)?;
    }
    Ok(memory.predicted_state().active_columns())
}

fn main() -> Result<()> {
    let verbosity = std::env::args()
        .skip(1)
        .map(|arg| match arg.as_str() {
            "-v" => 1,
            "-vv" => 2,
            _ => 0,
        })
        .max()
        .unwrap_or(0u8);

    tracing_subscriber::fmt()
        .with_max_level(if verbosity > 0 {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    let config = Config {
        number_of_columns: NAMES.len(),
        cells_per_column: 4,
        initial_permanence: 0.3,
        connected_permanence: 0.5,
        min_threshold: 1,
        activation_threshold: 1,
        new_synapse_count: 2,
        global_decay: 0.0,
        verbosity,
        ..Config::default()
    };
    let mut memory = SequenceMemory::new(config)?;

    let sequences: [[usize; 4]; 2] = [[0, 1, 2, 3], [4, 1, 2, 5]];
    for seq in &sequences {
        for _ in 0..5 {
            memory.reset();
            for &column in seq {
                memory.compute(&[column], true, true)?;
            }
        }
        tracing::info!(sequence = %names(seq), "learned");
    }

    tracing::info!(
        segments = memory.num_segments(),
        synapses = memory.num_synapses(),
        "training done"
    );

    for prefix in [&[1, 2][..], &[0, 1, 2][..], &[4, 1, 2][..]] {
        let predicted = predict(&mut memory, prefix)?;
        println!("{:>7} -> {}", names(prefix), names(&predicted));
    }

    Ok(())
}
