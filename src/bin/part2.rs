use anyhow::{Context, Result};
use clap::Parser;
use day10::{CLIArgs, Error};

fn main() -> Result<()> {
    let args = CLIArgs::parse();
    let machines = day10::read_machines(&args.input_path).with_context(|| {
        format!(
            "Failed to read machines from given file({}).",
            args.input_path.display()
        )
    })?;

    let machine_n = machines.len();
    let mut press_sum = 0;
    for (ind, machine) in machines.iter().enumerate() {
        let press_n = machine
            .min_presses()
            .ok_or(Error::UnreachableGoal(ind + 1))?;
        println!("Line {}/{}: answer {}", ind + 1, machine_n, press_n);
        press_sum += press_n;
    }

    println!(
        "The sum of minimum button presses for solving given machines is {}.",
        press_sum
    );

    Ok(())
}
