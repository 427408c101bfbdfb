use color_eyre::eyre::Result;

use intcode::memory::Memory;
use intcode::processor::Program;
use simple_logger::SimpleLogger;

fn main() -> Result<()> {
    color_eyre::install()?; // rust error handling
    SimpleLogger::new().init().unwrap(); // logging

    let memory = "3,0,4,0,99".parse::<Memory>().unwrap();
    let mut program = Program::new(memory);

    let outputs = program.run_batch(&[7])?;
    println!("{:?}", outputs);

    Ok(())
}
