use color_eyre::eyre::Result;

use intcode::memory::Memory;
use intcode::scan::Scanner;
use log::LevelFilter;
use simple_logger::SimpleLogger;

/// Domain queried by the puzzle.
const WIDTH: usize = 50;
const HEIGHT: usize = 50;

fn main() -> Result<()> {
    color_eyre::install()?; // rust error handling
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .init()
        .unwrap(); // logging

    let image = Memory::from_file("demos/programs/beam.txt")?;
    let scanner = Scanner::new(image);

    let grid = scanner.scan(WIDTH, HEIGHT)?;
    println!("{}", grid.count());
    print!("{}", grid);

    Ok(())
}
