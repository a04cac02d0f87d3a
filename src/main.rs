#[macro_use]
extern crate log;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, ValueEnum};
use geckoc::asm::Assembler;
use geckoc::project::{self, Layout, Options};

use std::path::PathBuf;
use std::process::ExitCode;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Output {
    /// Pack every game version into a GCT file.
    Gct,
    /// Pack every game version into a Dolphin ini.
    Ini,
    /// Assemble the assembly units before compiling.
    Asm,
}

#[derive(Parser, Debug)]
#[command(name = "geckoc", version, about = "Compile gecko codes for every version of a game")]
struct Cli {
    /// Only compile for game versions containing this.
    #[arg(long, default_value = "")]
    game: String,

    /// Only compile codes whose name contains this.
    #[arg(long, default_value = "")]
    code: String,

    /// Root folder of the project.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Alias file. Defaults to `src/aliases.toml` in the project.
    #[arg(long)]
    aliases: Option<PathBuf>,

    /// Command assembling a single assembly file to gecko lines on stdout.
    #[arg(long)]
    assembler: Option<String>,

    /// Group name written before each code in the Dolphin ini.
    #[arg(long, default_value = "geckoc")]
    prefix: String,

    #[arg(value_enum, required = true)]
    outputs: Vec<Output>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let assembler = match (&cli.assembler, cli.outputs.contains(&Output::Asm)) {
        (Some(command), true) => match Assembler::new(command) {
            Ok(assembler) => Some(assembler),
            Err(err) => {
                error!("{err}");
                return ExitCode::FAILURE;
            }
        },
        (None, true) => Cli::command()
            .error(ErrorKind::MissingRequiredArgument, "the asm output requires --assembler")
            .exit(),
        (_, false) => None,
    };

    let options = Options {
        game_filter: cli.game,
        code_filter: cli.code,
        gct: cli.outputs.contains(&Output::Gct),
        ini: cli.outputs.contains(&Output::Ini),
        assembler,
        prefix: cli.prefix,
        aliases: cli.aliases,
    };

    match project::run(&Layout::new(&cli.root), &options) {
        Ok(report) => {
            let codes: usize = report.encoded.values().map(Vec::len).sum();
            info!("encoded {codes} codes for {} game versions", report.encoded.len());
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
