use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cli = tgcom::cli::Cli::parse();
    tgcom::init(cli.verbose);
    tgcom::cli::run(cli)
}
