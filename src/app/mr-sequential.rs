use anyhow::{Context, Result};
use clap::Parser;
use mrlease::cmd::sequential::Args;
use mrlease::{standalone, utils, workload};

fn main() -> Result<()> {
    utils::init_tracing();
    let args = Args::parse();
    let engine = workload::named(&args.app)?;
    let inputs = utils::expand_inputs(std::slice::from_ref(&args.input))?;
    let serialized_args = utils::serialize_args(&args.args)?;

    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("cannot create {}", args.output.display()))?;
    let outputs = standalone::run_job(&inputs, &engine, &serialized_args, args.n_reduce, &args.output)?;
    for path in outputs {
        println!("{}", path.display());
    }
    Ok(())
}
