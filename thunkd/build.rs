use thunkd_cli_opts::Thunkd;

use std::env;
use std::error::Error;
use std::path::Path;

use clap_complete::generate_to;
use clap_complete::shells::{Bash, Zsh};

fn main() -> Result<(), Box<dyn Error>> {
    let mut command = Thunkd::meta_command();

    // OUT_DIR is unique per crate build; the completions belong next to the
    // binary, which sits 3 dirs above it.
    let out_dir = env::var("OUT_DIR")?;
    let target_dir = Path::new(&out_dir).join("../../..");
    generate_to(Zsh, &mut command, "thunkd", &target_dir)?;
    generate_to(Bash, &mut command, "thunkd", &target_dir)?;

    Ok(())
}
