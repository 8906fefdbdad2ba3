use std::path::PathBuf;

use clap::{CommandFactory, Parser, ValueEnum};

#[derive(Debug, Parser)]
#[clap(
    version,
    about = "Pull and push Thunkable projects",
    name = "thunkd"
)]
pub struct Thunkd {
    #[arg(name = "verbose", global = true, long, help = "Log more information")]
    pub verbose: bool,

    #[arg(
        long,
        short,
        default_value = "default",
        global = true,
        help = "User profile"
    )]
    pub profile: String,

    #[arg(
        long = "endpoint",
        short = 'e',
        global = true,
        help = "An explicit base url to use; for example, https://x.thunkable.com"
    )]
    pub endpoint: Option<String>,

    #[command(subcommand)]
    pub command: Subcommand,
}

impl Thunkd {
    /// The clap command tree, used by the build script to generate shell completions.
    pub fn meta_command() -> clap::Command {
        Self::command()
    }
}

#[derive(Debug, Parser)]
pub enum Subcommand {
    #[command(about = "Download a project to a local file")]
    Pull {
        #[arg(help = "Id of the project, as it appears in the project url")]
        project_id: String,

        #[arg(
            help = "File to write the project to. A directory when --modular is given.",
            value_name = "FILE_PATH"
        )]
        path: PathBuf,

        #[arg(
            long,
            help = "Strip account specific and volatile fields before writing"
        )]
        clean: bool,

        #[arg(long, help = "Split the project into one file per screen")]
        modular: bool,

        #[arg(
            long,
            short,
            help = "Do not ask before replacing the contents of a modular directory"
        )]
        yes: bool,
    },

    #[command(about = "Upload a local file, replacing the remote project")]
    Push {
        #[arg(help = "Id of the project, as it appears in the project url")]
        project_id: String,

        #[arg(
            help = "File to read the project from. A directory when --modular is given.",
            value_name = "FILE_PATH"
        )]
        path: PathBuf,

        #[arg(long, help = "Read a project written by `pull --modular`")]
        modular: bool,
    },

    /// Store a setting for the selected profile.
    ///
    /// The session token is the value of the `thunk_token` cookie of a
    /// logged in browser session.
    #[command(verbatim_doc_comment)]
    Set {
        #[arg(value_enum)]
        variable: Setting,

        #[arg(help = "Value to store")]
        value: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Setting {
    #[value(name = "thunk_token")]
    ThunkToken,
}

impl Setting {
    pub fn key(&self) -> &'static str {
        match self {
            Setting::ThunkToken => "thunk_token",
        }
    }
}
