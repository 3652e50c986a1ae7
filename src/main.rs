use clap::{Parser, Subcommand};
use resizable::imaging::{self, Dimensions, FitMode, FitSpec, Quality, RustBackend};
use resizable::upload::{self, UploadRequest};
use resizable::{config, output};
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser)]
#[command(name = "resizable")]
#[command(about = "Image uploads with automatic resized derivatives")]
#[command(long_about = "\
Image uploads with automatic resized derivatives

An upload is validated, stored under a templated name, then rendered into
every size configured in resizable.toml, keeping the original format.

Stored layout:

  uploads/                   # base_dir
  └── files/                 # dir
      ├── original/          # sub_dir: the untouched upload
      │   └── 7-cat.jpg      # physical_name = \"{ID}-{FILENAME}\"
      ├── thumbnails/        # derivatives.thumbnail.sub_dir
      │   └── 7-cat.jpg
      └── gallery/           # derivatives.gallery.sub_dir
          └── 7-cat.jpg

Fit modes (dimension_type):
  exact      exactly WxH, aspect ignored
  portrait   height H, width from aspect
  landscape  width W, height from aspect
  auto       portrait or landscape by source orientation
  crop       cover WxH, centre-crop to exactly WxH

Run 'resizable gen-config' to generate a documented resizable.toml.")]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(long, default_value = config::CONFIG_FILENAME, global = true)]
    config: PathBuf,

    /// More log output on stderr (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store a file and generate its derivatives
    Upload {
        /// File to upload
        file: PathBuf,
        /// Record identifier used in the stored file name
        #[arg(long)]
        id: String,
        /// Client file name (defaults to FILE's name)
        #[arg(long)]
        name: Option<String>,
        /// Client-declared MIME type (defaults to the detected one)
        #[arg(long)]
        mime_type: Option<String>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Resize a single image
    Resize {
        source: PathBuf,
        output: PathBuf,
        /// Target box as WIDTHxHEIGHT
        #[arg(long)]
        size: Dimensions,
        #[arg(long, default_value_t = FitMode::Exact)]
        mode: FitMode,
        /// Encoding quality, 0-100
        #[arg(long, default_value_t = 100)]
        quality: u32,
    },
    /// Print format and dimensions of an image
    Identify { file: PathBuf },
    /// Validate the config file
    Check,
    /// Print a stock resizable.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Upload {
            file,
            id,
            name,
            mime_type,
            json,
        } => {
            let upload_config = config::load_config(&cli.config)?;
            init_thread_pool(&upload_config.processing);

            let mut request = UploadRequest::from_path(id, file);
            if let Some(name) = name {
                request.original_name = name;
            }
            request.mime_type = mime_type;

            match upload::upload(&upload_config, &request) {
                Ok(report) if json => println!("{}", serde_json::to_string_pretty(&report)?),
                Ok(report) => output::print_upload_report(&report),
                Err(e) => {
                    let message = upload_config.message_for(e.code());
                    if json {
                        let body = serde_json::json!({
                            "error": e.code(),
                            "message": message,
                            "detail": e.to_string(),
                        });
                        println!("{}", serde_json::to_string_pretty(&body)?);
                    } else {
                        for line in output::format_upload_error(e.code(), &message, &e.to_string())
                        {
                            eprintln!("{}", line);
                        }
                    }
                    std::process::exit(2);
                }
            }
        }
        Command::Resize {
            source,
            output: dest,
            size,
            mode,
            quality,
        } => {
            let backend = RustBackend::new();
            let fit = FitSpec::new(size, mode);
            let dims = imaging::resize_file(&backend, &source, &dest, fit, Quality::new(quality))?;
            output::print_resize(&source, &dest, dims);
        }
        Command::Identify { file } => {
            let info = imaging::get_info(&RustBackend::new(), &file)?;
            output::print_identify(&file, &info);
        }
        Command::Check => {
            println!("==> Checking {}", cli.config.display());
            let upload_config = config::load_config(&cli.config)?;
            for derivative in upload_config.derivative_configs()? {
                println!(
                    "    {} {}x{} {} → {}",
                    derivative.name,
                    derivative.fit.width,
                    derivative.fit.height,
                    derivative.fit.mode,
                    upload_config.upload_root().join(&derivative.sub_dir).display()
                );
            }
            println!("==> Config is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Log to stderr so stdout stays clean for reports and JSON.
fn init_tracing(verbose: u8) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let default = match verbose {
        0 => "warn",
        1 => "resizable=debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    debug!(threads, "derivative workers");
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
