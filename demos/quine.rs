use color_eyre::eyre::Result;

use intcode::memory::Memory;
use intcode::processor::Program;
use log::LevelFilter;
use simple_logger::SimpleLogger;

/// Copies itself to the output, one cell per loop iteration.
const QUINE: &str = "109,1,204,-1,1001,100,1,100,1008,100,16,101,1006,101,0,99";

fn main() -> Result<()> {
    color_eyre::install()?; // rust error handling
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .init()
        .unwrap(); // logging

    let memory = QUINE.parse::<Memory>().unwrap();
    let mut program = Program::new(memory);

    let outputs = program.run_batch(&[])?;
    let rendered: Vec<String> = outputs.iter().map(ToString::to_string).collect();
    println!("{}", rendered.join(","));

    Ok(())
}
