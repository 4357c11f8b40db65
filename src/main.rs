use std::fs;

use clap::Parser;
use miette::{IntoDiagnostic, NamedSource, Result};

mod cli;

fn main() -> Result<()> {
    let args = cli::Args::parse();

    let source = fs::read_to_string(&args.input_file).into_diagnostic()?;
    let input_file = args.input_file.display().to_string();

    let tokens = match cinder::lex(&source) {
        Ok(tokens) => tokens,
        Err(error) => {
            return Err(
                miette::Report::new(error).with_source_code(NamedSource::new(input_file, source))
            )
        }
    };

    for (token, span) in tokens {
        if args.spans {
            println!("{span}: {token}");
        } else {
            println!("{token}");
        }
    }

    Ok(())
}
