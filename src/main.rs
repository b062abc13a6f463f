use clap::Parser;
use log::warn;
use std::fs::OpenOptions;
use std::path::PathBuf;
use stepback::config::Config;
use stepback::console::TerminalApplication;
use stepback::controller::Controller;
use stepback::dap::tracer::DapTrace;
use stepback::dap::{ClientOptions, DapClient};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Program to debug, used when `start`/`target` get no file.
    program: Option<PathBuf>,

    /// Configuration file (default: ~/.config/stepback/config.toml).
    #[clap(long, env = "STEPBACK_CONFIG")]
    config: Option<PathBuf>,

    /// Write logs into a file instead of stderr.
    #[clap(long)]
    log_file: Option<PathBuf>,

    /// Trace DAP traffic (requests/responses/events) into the log file.
    /// Requires --log-file.
    #[clap(long)]
    trace_dap: bool,

    /// Print every outcome as a JSON line.
    #[clap(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut logger = env_logger::Builder::from_default_env();
    if let Some(path) = &args.log_file {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        logger.target(env_logger::Target::Pipe(Box::new(file)));
    }
    logger.init();

    let tracer = match (&args.log_file, args.trace_dap) {
        (Some(path), true) => Some(DapTrace::open(path)?),
        (None, true) => {
            warn!(target: "dap", "--trace-dap requires --log-file; tracing disabled");
            None
        }
        _ => None,
    };

    let config = Config::load(args.config.as_deref());
    let client = DapClient::new(ClientOptions {
        request_timeout: config.timeouts.request(),
        tracer,
    });

    let mut controller = Controller::new(Box::new(client), config);
    controller.set_default_target(args.program);

    TerminalApplication::new(controller, args.json).run()
}
