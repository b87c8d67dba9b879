use anyhow::Result;

fn main() -> Result<()> {
    dustpan_cli::run_cli()
}
