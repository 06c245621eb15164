#[macro_use]
extern crate clap;

use clap::Arg;
use std::path::{Path, PathBuf};

use ugbc_core::CompileError;

#[derive(Debug)]
enum Error {
    Compile(String, CompileError),
    UnknownTarget(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Compile(source, CompileError::Critical(diag)) => write!(
                f,
                "CRITICAL ERROR during compilation of {}: {}",
                source, diag
            ),
            Error::Compile(_, other) => write!(f, "{}", other),
            Error::UnknownTarget(name) => write!(
                f,
                "unknown target \"{}\", known targets: {}",
                name,
                ugbc_target::registry::KNOWN_TARGETS.join(", ")
            ),
        }
    }
}

fn main() {
    env_logger::init();

    let matches = app_from_crate!()
        .arg(
            Arg::with_name("SOURCE")
                .help("Sets the BASIC source file to compile")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("OUTPUT")
                .help("Sets the assembly output file to write")
                .required(true)
                .index(2),
        )
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .takes_value(true)
                .value_name("LINKER_CONFIG")
                .help("Emits the linker configuration to this path"),
        )
        .arg(
            Arg::with_name("target")
                .short("t")
                .long("target")
                .takes_value(true)
                .value_name("TARGET")
                .default_value("c64")
                .help("Selects the chipset/target module (c64, coco)"),
        )
        .arg(
            Arg::with_name("no-warnings")
                .short("w")
                .long("no-warnings")
                .help("Suppresses warning diagnostics"),
        )
        .get_matches();

    let source = matches.value_of("SOURCE").unwrap();
    let output = matches.value_of("OUTPUT").unwrap();
    let config = matches.value_of("config");
    let target_name = matches.value_of("target").unwrap();
    let warnings_enabled = !matches.is_present("no-warnings");

    if let Err(err) = run(source, output, config, target_name, warnings_enabled) {
        eprintln!("{}", err);
        std::process::exit(1);
    }
}

fn run(
    source: &str,
    output: &str,
    config: Option<&str>,
    target_name: &str,
    warnings_enabled: bool,
) -> Result<(), Error> {
    let target = ugbc_target::registry::resolve(target_name)
        .ok_or_else(|| Error::UnknownTarget(target_name.to_owned()))?;

    let source_path = Path::new(source);
    let output_path = Path::new(output);
    let config_path: Option<PathBuf> = config.map(PathBuf::from);

    let outcome = ugbc_core::compile(
        source_path,
        output_path,
        config_path.as_deref(),
        target.as_ref(),
        warnings_enabled,
    )
    .map_err(|e| Error::Compile(source.to_owned(), e))?;

    // Critical errors abort compile() with Err before we get here, so
    // everything collected in diagnostics is a warning.
    if warnings_enabled {
        for diag in &outcome.diagnostics {
            eprintln!("WARNING during compilation of {}: {}", source, diag);
        }
    }

    Ok(())
}
