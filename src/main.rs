use std::env;
use std::error::Error;
use std::io;
use std::path::Path;
use std::process::ExitCode;

use ember::{Driver, EngineConfig, WriteSink};

const USAGE: &str = "usage: ember <file> [--trace] [--dump] [--config <file.json>]";

fn main() -> Result<ExitCode, Box<dyn Error + Sync + Send>> {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Warn)
        .env()
        .init()?;

    let mut file = None;
    let (mut trace, mut dump, mut config_path) = (false, false, None);
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--trace" => trace = true,
            "--dump" => dump = true,
            "--config" => config_path = args.next(),
            _ if file.is_none() && !arg.starts_with("--") => file = Some(arg),
            _ => {
                eprintln!("{USAGE}");
                return Ok(ExitCode::from(2));
            }
        }
    }
    let Some(file) = file else {
        eprintln!("{USAGE}");
        return Ok(ExitCode::from(2));
    };

    let mut config = match config_path {
        Some(path) => EngineConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => EngineConfig::default(),
    };
    config.vm.trace_statements |= trace;

    let path = Path::new(&file);
    let mut driver = Driver::new(config)?;
    let unit = driver.add_file(path);
    if let Some(dir) = path.parent() {
        let ext = path.extension().map(|e| e.to_string_lossy().into_owned()).unwrap_or_default();
        let dir = if dir.as_os_str().is_empty() { Path::new(".") } else { dir };
        driver.add_directory(dir, ext);
    }

    let program = driver.parse(&unit)?;
    if !program.diagnostics.is_empty() {
        eprintln!("{}", driver.render_diagnostics(&program));
    }
    if dump {
        print!("{}", program.dump());
    }
    if program.has_errors() {
        return Ok(ExitCode::FAILURE);
    }

    let mut output = WriteSink(io::stdout());
    let mut trace_sink = WriteSink(io::stderr());
    let trace_sink: Option<&mut (dyn ember::TraceSink + Send)> = if trace { Some(&mut trace_sink) } else { None };
    match driver.execute(&program, &unit, trace_sink, Some(&mut output)) {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            eprintln!("runtime error: {err}");
            Ok(ExitCode::FAILURE)
        }
    }
}
