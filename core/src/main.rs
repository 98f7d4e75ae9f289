use clap::Parser;
use log::{error, info};
use mamoscan_core::batch::table;
use mamoscan_core::cli::{Cli, OutputFormat};
use mamoscan_core::{ConversionError, ConversionOutput, ReportConverter, Result, TextReport};
use std::process;

fn main() {
    let cli = Cli::parse();

    // Setup logging
    setup_logging(cli.verbose);

    if !cli.file.is_file() {
        eprintln!("Error: {} is not a file", cli.file.display());
        process::exit(1);
    }

    let converter = match cli.conversion_options().and_then(ReportConverter::new) {
        Ok(converter) => converter,
        Err(e) => fail(&e),
    };
    let converter = match cli.renderer() {
        Ok(renderer) => converter.with_renderer(renderer),
        Err(e) => fail(&e),
    };

    let output = match converter.convert_file(&cli.file) {
        Ok(output) => output,
        Err(e) => fail(&e),
    };

    let rendered = match render(&output, cli.format) {
        Ok(rendered) => rendered,
        Err(e) => fail(&e),
    };

    match (cli.output_dir.as_ref(), cli.table_path()) {
        (Some(dir), Some(path)) => {
            let written = std::fs::create_dir_all(dir).and_then(|_| std::fs::write(&path, rendered));
            if let Err(e) = written {
                fail(&ConversionError::IoError(e));
            }
            info!("Table written to {}", path.display());
        }
        _ => print!("{}", rendered),
    }
}

fn setup_logging(verbose: bool) {
    if verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    }
}

fn render(output: &ConversionOutput, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(TextReport::new(output).to_string()),
        OutputFormat::Csv => {
            let mut buffer = Vec::new();
            table::write_csv(&output.batch, &mut buffer)?;
            String::from_utf8(buffer).map_err(|e| ConversionError::Output(e.to_string()))
        }
        OutputFormat::Json => {
            #[cfg(feature = "json")]
            {
                table::to_json(&output.batch).map(|json| json + "\n")
            }
            #[cfg(not(feature = "json"))]
            {
                Err(ConversionError::Output(
                    "JSON output requires the 'json' feature".to_string(),
                ))
            }
        }
    }
}

/// 2: unreadable document, 3: no exam sections, 1: anything else
fn exit_code(e: &ConversionError) -> i32 {
    match e {
        ConversionError::UnreadableDocument(_) => 2,
        ConversionError::EmptyDocument => 3,
        _ => 1,
    }
}

fn fail(e: &ConversionError) -> ! {
    error!("Conversion failed [{}]: {}", e.code(), e);
    eprintln!("Error: {}", e);
    process::exit(exit_code(e))
}
