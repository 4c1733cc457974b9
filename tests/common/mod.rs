#![allow(dead_code)]

use ember::{Driver, EngineConfig, Program, RuntimeError};

/// A driver over in-memory units.
pub fn driver(units: &[(&str, &str)]) -> Driver {
    let mut driver = Driver::new(EngineConfig::default()).expect("default config compiles");
    for (name, text) in units {
        driver.add_source(*name, *text);
    }
    driver
}

pub fn parse(source: &str) -> Program {
    driver(&[("main", source)]).parse("main").expect("main unit exists")
}

/// Diagnostic codes of `program`, in report order.
pub fn codes(program: &Program) -> Vec<u16> {
    program.diagnostics.iter().map(|d| d.code).collect()
}

/// Parses `main` from `units` and runs it, collecting `print` output.
pub fn run_units(units: &[(&str, &str)]) -> Result<Vec<String>, RuntimeError> {
    let mut driver = driver(units);
    let program = driver.parse("main").expect("main unit exists");
    assert!(
        !program.has_errors(),
        "unexpected diagnostics:\n{}",
        driver.render_diagnostics(&program)
    );
    let mut output: Vec<String> = Vec::new();
    driver.execute(&program, "main", None, Some(&mut output))?;
    Ok(output)
}

pub fn run(source: &str) -> Result<Vec<String>, RuntimeError> {
    run_units(&[("main", source)])
}

/// Output of a program expected to run cleanly.
pub fn output(source: &str) -> Vec<String> {
    match run(source) {
        Ok(lines) => lines,
        Err(err) => panic!("runtime error: {err}"),
    }
}
