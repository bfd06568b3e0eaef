use anyhow::Result;

mod app;
mod logging;

fn main() -> Result<()> {
    let args = zos_transfer::cli::parse();
    let code = app::run(args)?;
    std::process::exit(code)
}
