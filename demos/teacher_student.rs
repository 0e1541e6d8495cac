//! Teacher/student demo: train a 5-10-10-5 softsign network online with the
//! EKF against a fixed random teacher of the same architecture and print
//! the held-out log10 MSE at every checkpoint.
//!
//! Run with `cargo run --example teacher_student -- [batch_size]`.
use ekf_train::{
    filter::DifferentiableModel,
    network::{Activation, Mlp},
    training::{DriverOptions, TrainingResult, run_teacher_student, scenario_ekf_options},
};
use rand::{SeedableRng, rngs::StdRng};

fn main() -> TrainingResult<()> {
    let batch_size = std::env::args().nth(1).and_then(|arg| arg.parse().ok()).unwrap_or(1);
    let sizes = [5, 10, 10, 5];

    let mut teacher =
        Mlp::random(&sizes, Activation::Softsign, Activation::Softsign, &mut StdRng::seed_from_u64(1))?;
    let mut student =
        Mlp::random(&sizes, Activation::Softsign, Activation::Softsign, &mut StdRng::seed_from_u64(2))?;

    let options = scenario_ekf_options(student.num_parameters())?.with_verbose(false);
    let driver = DriverOptions::new(1000, batch_size, 100, 100, 0)?;

    println!("P = {}, batch size = {}", student.num_parameters(), batch_size);
    let trace = run_teacher_student(&mut teacher, &mut student, options, &driver)?;
    for checkpoint in &trace.checkpoints {
        println!(
            "update {:>5}  examples {:>6}  log10(mse) {:>8.3}",
            checkpoint.update, checkpoint.examples_seen, checkpoint.log10_mse
        );
    }
    Ok(())
}
