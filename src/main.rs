use clap::Parser;
use immunosim::args::Args;
use immunosim::runner::Runner;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut runner = Runner::new(args)?;
    runner.start()
}
