use std::convert::TryFrom;
use std::error;
use std::fmt;

use log::*;
use num_enum::IntoPrimitive;
use num_enum::TryFromPrimitive;

use crate::channel::Channel;
use crate::memory::{Cell, Memory, NegativeAddress};

/// Execution state of a [`Program`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Ready to execute the instruction at the instruction pointer.
    Running,
    /// Terminated normally by a `Halt` instruction.
    Halted,
    /// Suspended at an `Input` instruction with no input pending. Pushing
    /// input makes the program runnable again.
    Blocked,
    /// Terminated by a contract violation. Unrecoverable.
    Faulted,
}

/// The contract violations that stop a program for good.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// The cell at the instruction pointer does not encode an opcode.
    InvalidOpcode { word: Cell },
    /// A parameter mode digit outside `0..=2`.
    InvalidMode { digit: Cell },
    /// An address below zero was read or written.
    Memory(NegativeAddress),
    /// A write target declared immediate mode.
    ImmediateWrite { opcode: Opcode },
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultKind::InvalidOpcode { word } => {
                write!(f, "invalid instruction word `{}`", word)
            }
            FaultKind::InvalidMode { digit } => {
                write!(f, "invalid parameter mode digit `{}`", digit)
            }
            FaultKind::Memory(err) => err.fmt(f),
            FaultKind::ImmediateWrite { opcode } => {
                write!(f, "write target of {} cannot be in immediate mode", opcode)
            }
        }
    }
}

impl From<NegativeAddress> for FaultKind {
    fn from(err: NegativeAddress) -> Self {
        FaultKind::Memory(err)
    }
}

/// A fatal contract violation, located at the instruction that tripped it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fault {
    pub kind: FaultKind,
    /// Instruction pointer of the offending instruction.
    pub ip: Cell,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fault at address {}: {}", self.ip, self.kind)
    }
}

impl error::Error for Fault {}

/// Why a batch run came up short.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecError {
    /// The program violated the instruction contract.
    Fault(Fault),
    /// The program asked for input after the batch was exhausted. The
    /// caller supplied too few values; the program itself is intact.
    InputStarvation { ip: Cell },
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecError::Fault(fault) => fault.fmt(f),
            ExecError::InputStarvation { ip } => {
                write!(f, "input exhausted at address {}", ip)
            }
        }
    }
}

impl error::Error for ExecError {}

impl From<Fault> for ExecError {
    fn from(fault: Fault) -> Self {
        ExecError::Fault(fault)
    }
}

macro_rules! opcodes {
    ( $( $( #[doc = $doc:expr] )+ $name:ident = $code:literal , )+ ) => {
        /// Defines the instruction set
        #[repr(i64)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
        #[derive(TryFromPrimitive, IntoPrimitive)]
        pub enum Opcode {
            $(
                $( #[doc = $doc] )+
                $name = $code,
            )+
        }

        impl ::std::fmt::Display for Opcode {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                match self {
                    $( Self::$name => f.write_str(stringify!($name)) , )+
                }
            }
        }
    }
}

opcodes! {
    /// mem[p3] = val(p1) + val(p2)
    Add = 1,
    /// mem[p3] = val(p1) * val(p2)
    Multiply = 2,
    /// mem[p1] = next input value; blocks while the queue is empty
    Input = 3,
    /// Appends val(p1) to the output
    Output = 4,
    /// Jumps to val(p2) when val(p1) is nonzero
    JumpIfTrue = 5,
    /// Jumps to val(p2) when val(p1) is zero
    JumpIfFalse = 6,
    /// mem[p3] = 1 when val(p1) < val(p2), else 0
    LessThan = 7,
    /// mem[p3] = 1 when val(p1) = val(p2), else 0
    Equals = 8,
    /// Adds val(p1) to the relative base
    AdjustRelativeBase = 9,
    /// Stops execution
    Halt = 99,
}

/// How a parameter's raw cell is interpreted.
#[repr(i64)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
pub enum Mode {
    /// The raw cell is an address to dereference.
    Position = 0,
    /// The raw cell is the value itself. Not valid for write targets.
    Immediate = 1,
    /// The raw cell is an address offset by the relative base.
    Relative = 2,
}

/// The mode digits of one instruction word, handed out in parameter order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Modes {
    digits: Cell,
}

impl Modes {
    fn new(digits: Cell) -> Self {
        Self { digits }
    }

    /// Yields the mode for the next parameter, least-significant digit
    /// first. Exhausted digits read as `Position`.
    fn next(&mut self) -> Result<Mode, FaultKind> {
        let digit = self.digits % 10;
        self.digits /= 10;
        Mode::try_from(digit).map_err(|_| FaultKind::InvalidMode { digit })
    }
}

/// A decoded instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: Opcode,
    modes: Modes,
}

impl Instruction {
    /// Decodes an instruction word. The opcode lives in the low two decimal
    /// digits, with one mode digit per parameter above them. Negative words
    /// encode nothing.
    pub fn decode(word: Cell) -> Result<Self, FaultKind> {
        if word < 0 {
            return Err(FaultKind::InvalidOpcode { word });
        }

        let opcode =
            Opcode::try_from(word % 100).map_err(|_| FaultKind::InvalidOpcode { word })?;

        Ok(Self {
            opcode,
            modes: Modes::new(word / 100),
        })
    }
}

/// What an executed instruction asks the step loop to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Continue,
    Halt,
    Block,
}

/// A single execution of an image: memory, instruction pointer, relative
/// base, and I/O channel, all owned by value.
///
/// Cloning a program is a deep copy. Clones never observe each other's
/// state, so one loaded image can fan out into any number of independent
/// runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    memory: Memory,
    ip: Cell,
    relative_base: Cell,
    state: State,
    channel: Channel,
    fault: Option<Fault>,
}

impl Program {
    /// Creates a program poised at address 0 of `memory`.
    pub fn new(memory: Memory) -> Self {
        Self {
            memory,
            ip: 0,
            relative_base: 0,
            state: State::Running,
            channel: Channel::default(),
            fault: None,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// The fault that poisoned this program, if any.
    pub fn fault(&self) -> Option<Fault> {
        self.fault
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Output produced so far, without draining it.
    pub fn output(&self) -> &[Cell] {
        self.channel.output()
    }

    /// Drains the output produced so far.
    pub fn take_output(&mut self) -> Vec<Cell> {
        self.channel.take_output()
    }

    /// Queues an input value. A blocked program becomes runnable again.
    pub fn push_input(&mut self, value: Cell) {
        self.channel.push_input(value);
        if self.state == State::Blocked {
            self.state = State::Running;
        }
    }

    /// Executes a single instruction.
    ///
    /// A terminated program (halted or faulted) is left untouched. A
    /// blocked program re-attempts its pending `Input` from the top.
    pub fn step(&mut self) -> Result<(), Fault> {
        match self.state {
            State::Halted | State::Faulted => return Ok(()),
            State::Running | State::Blocked => {}
        }

        let start = self.ip;
        match self.step_inner() {
            Ok(Control::Continue) => {
                self.state = State::Running;
                Ok(())
            }
            Ok(Control::Halt) => {
                self.state = State::Halted;
                info!(
                    "program halted at address {} with {} output values",
                    self.ip,
                    self.channel.output().len()
                );
                Ok(())
            }
            Ok(Control::Block) => {
                // Nothing was consumed; resumption retries this instruction.
                self.ip = start;
                self.state = State::Blocked;
                Ok(())
            }
            Err(kind) => {
                self.state = State::Faulted;
                let fault = Fault { kind, ip: start };
                self.fault = Some(fault);
                error!("{}", fault);
                Err(fault)
            }
        }
    }

    fn step_inner(&mut self) -> Result<Control, FaultKind> {
        let word = self.memory.read(self.ip)?;
        let instruction = Instruction::decode(word)?;
        self.ip += 1;

        self.execute_instruction(instruction)
    }

    fn execute_instruction(&mut self, mut instruction: Instruction) -> Result<Control, FaultKind> {
        let opcode = instruction.opcode;
        match opcode {
            Opcode::Add => {
                let a = self.read_value(instruction.modes.next()?)?;
                let b = self.read_value(instruction.modes.next()?)?;
                let target = self.write_address(instruction.modes.next()?, opcode)?;
                self.memory.write(target, a + b)?;

                debug!("{} {} {} -> [{}]", opcode, a, b, target);
            }
            Opcode::Multiply => {
                let a = self.read_value(instruction.modes.next()?)?;
                let b = self.read_value(instruction.modes.next()?)?;
                let target = self.write_address(instruction.modes.next()?, opcode)?;
                self.memory.write(target, a * b)?;

                debug!("{} {} {} -> [{}]", opcode, a, b, target);
            }
            Opcode::Input => {
                let value = match self.channel.pop_input() {
                    Some(value) => value,
                    None => return Ok(Control::Block),
                };
                let target = self.write_address(instruction.modes.next()?, opcode)?;
                self.memory.write(target, value)?;

                debug!("{} {} -> [{}]", opcode, value, target);
            }
            Opcode::Output => {
                let value = self.read_value(instruction.modes.next()?)?;
                self.channel.push_output(value);

                debug!("{} {}", opcode, value);
            }
            Opcode::JumpIfTrue => {
                let condition = self.read_value(instruction.modes.next()?)?;
                let target = self.read_value(instruction.modes.next()?)?;
                if condition != 0 {
                    self.ip = target;
                }

                debug!("{} {} {}", opcode, condition, target);
            }
            Opcode::JumpIfFalse => {
                let condition = self.read_value(instruction.modes.next()?)?;
                let target = self.read_value(instruction.modes.next()?)?;
                if condition == 0 {
                    self.ip = target;
                }

                debug!("{} {} {}", opcode, condition, target);
            }
            Opcode::LessThan => {
                let a = self.read_value(instruction.modes.next()?)?;
                let b = self.read_value(instruction.modes.next()?)?;
                let target = self.write_address(instruction.modes.next()?, opcode)?;
                self.memory.write(target, (a < b) as Cell)?;

                debug!("{} {} {} -> [{}]", opcode, a, b, target);
            }
            Opcode::Equals => {
                let a = self.read_value(instruction.modes.next()?)?;
                let b = self.read_value(instruction.modes.next()?)?;
                let target = self.write_address(instruction.modes.next()?, opcode)?;
                self.memory.write(target, (a == b) as Cell)?;

                debug!("{} {} {} -> [{}]", opcode, a, b, target);
            }
            Opcode::AdjustRelativeBase => {
                let offset = self.read_value(instruction.modes.next()?)?;
                self.relative_base += offset;

                debug!("{} {} -> {}", opcode, offset, self.relative_base);
            }
            Opcode::Halt => {
                debug!("{}", opcode);

                return Ok(Control::Halt);
            }
        }

        Ok(Control::Continue)
    }

    /// Consumes the next raw parameter cell and resolves it to a value.
    fn read_value(&mut self, mode: Mode) -> Result<Cell, FaultKind> {
        let raw = self.next_raw()?;
        let value = match mode {
            Mode::Immediate => raw,
            Mode::Position => self.memory.read(raw)?,
            Mode::Relative => self.memory.read(raw + self.relative_base)?,
        };

        Ok(value)
    }

    /// Consumes the next raw parameter cell and resolves it to a write
    /// address. The raw cell is never dereferenced here, which is exactly
    /// why immediate mode has no meaning for a write target.
    fn write_address(&mut self, mode: Mode, opcode: Opcode) -> Result<Cell, FaultKind> {
        let raw = self.next_raw()?;
        match mode {
            Mode::Position => Ok(raw),
            Mode::Relative => Ok(raw + self.relative_base),
            Mode::Immediate => Err(FaultKind::ImmediateWrite { opcode }),
        }
    }

    fn next_raw(&mut self) -> Result<Cell, FaultKind> {
        let raw = self.memory.read(self.ip)?;
        self.ip += 1;

        Ok(raw)
    }

    /// Runs until the program halts or blocks on input. Faults stop the
    /// run immediately and poison the program for good: running a faulted
    /// program again re-surfaces its fault.
    pub fn run(&mut self) -> Result<State, Fault> {
        if let Some(fault) = self.fault {
            return Err(fault);
        }

        while self.state == State::Running {
            self.step()?;
            if self.state == State::Blocked {
                break;
            }
        }

        Ok(self.state)
    }

    /// Queues `inputs` up front and runs to completion, returning every
    /// output produced. Blocking with the batch exhausted is an error
    /// distinct from a fault.
    pub fn run_batch(&mut self, inputs: &[Cell]) -> Result<Vec<Cell>, ExecError> {
        for &value in inputs {
            self.push_input(value);
        }

        match self.run()? {
            State::Blocked => Err(ExecError::InputStarvation { ip: self.ip }),
            _ => Ok(self.take_output()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use color_eyre::eyre::Result;

    fn program(image: &[Cell]) -> Program {
        Program::new(Memory::new(image.to_vec()))
    }

    #[test]
    fn test_decode_word() -> Result<()> {
        let mut instruction = Instruction::decode(1002).map_err(|kind| Fault { kind, ip: 0 })?;

        assert_eq!(instruction.opcode, Opcode::Multiply);
        assert_eq!(instruction.modes.next().unwrap(), Mode::Position);
        assert_eq!(instruction.modes.next().unwrap(), Mode::Immediate);
        // Missing digits default to position.
        assert_eq!(instruction.modes.next().unwrap(), Mode::Position);

        Ok(())
    }

    #[test]
    fn test_decode_rejects_negative_word() {
        assert_eq!(
            Instruction::decode(-1),
            Err(FaultKind::InvalidOpcode { word: -1 })
        );
    }

    #[test]
    fn test_self_add() -> Result<()> {
        let mut program = program(&[1, 0, 0, 0, 99]);
        program.run()?;

        assert_eq!(program.state(), State::Halted);
        assert_eq!(program.memory().read(0)?, 2);

        Ok(())
    }

    #[test]
    fn test_multiply_with_immediate_mode() -> Result<()> {
        let mut program = program(&[1002, 4, 3, 4, 33]);
        program.run()?;

        assert_eq!(program.state(), State::Halted);
        assert_eq!(program.memory().read(4)?, 99);

        Ok(())
    }

    #[test]
    fn test_echo() -> Result<()> {
        let mut program = program(&[3, 0, 4, 0, 99]);
        let outputs = program.run_batch(&[7])?;

        assert_eq!(outputs, vec![7]);
        assert_eq!(program.state(), State::Halted);

        Ok(())
    }

    #[test]
    fn test_jump_distinguishes_zero() -> Result<()> {
        // Outputs 0 for input 0, 1 otherwise.
        let image = [3, 12, 6, 12, 15, 1, 13, 14, 13, 4, 13, 99, -1, 0, 1, 9];

        let mut zero = program(&image);
        assert_eq!(zero.run_batch(&[0])?, vec![0]);

        let mut nonzero = program(&image);
        assert_eq!(nonzero.run_batch(&[11])?, vec![1]);

        Ok(())
    }

    #[test]
    fn test_relative_base_write_target() -> Result<()> {
        // Base is adjusted to 5, so the relative target `-2` lands on 3.
        let mut program = program(&[109, 5, 21101, 7, 8, -2, 99]);
        program.run()?;

        assert_eq!(program.memory().read(3)?, 15);

        Ok(())
    }

    #[test]
    fn test_relative_read_past_extent_is_zero() -> Result<()> {
        let mut program = program(&[204, 10, 99]);
        let outputs = program.run_batch(&[])?;

        assert_eq!(outputs, vec![0]);

        Ok(())
    }

    #[test]
    fn test_quine_reproduces_its_image() -> Result<()> {
        let image = vec![
            109, 1, 204, -1, 1001, 100, 1, 100, 1008, 100, 16, 101, 1006, 101, 0, 99,
        ];
        let mut program = Program::new(Memory::new(image.clone()));
        let outputs = program.run_batch(&[])?;

        assert_eq!(outputs, image);

        Ok(())
    }

    #[test]
    fn test_sixty_four_bit_arithmetic() -> Result<()> {
        let mut squared = program(&[1102, 34915192, 34915192, 7, 4, 7, 99, 0]);
        assert_eq!(squared.run_batch(&[])?, vec![1219070632396864]);

        let mut literal = program(&[104, 1125899906842624, 99]);
        assert_eq!(literal.run_batch(&[])?, vec![1125899906842624]);

        Ok(())
    }

    #[test]
    fn test_input_starvation_in_batch_mode() {
        let mut program = program(&[3, 0, 99]);

        assert_eq!(
            program.run_batch(&[]),
            Err(ExecError::InputStarvation { ip: 0 })
        );
    }

    #[test]
    fn test_block_and_resume() -> Result<()> {
        let mut program = program(&[3, 0, 4, 0, 3, 1, 4, 1, 99]);

        program.push_input(7);
        assert_eq!(program.run()?, State::Blocked);
        assert_eq!(program.output(), &[7]);

        program.push_input(9);
        assert_eq!(program.run()?, State::Halted);
        assert_eq!(program.take_output(), vec![7, 9]);

        Ok(())
    }

    #[test]
    fn test_invalid_opcode_faults_without_mutation() {
        let image = [50, 1, 0, 0, 0, 99];
        let mut program = program(&image);

        let fault = program.run().unwrap_err();

        assert_eq!(fault.kind, FaultKind::InvalidOpcode { word: 50 });
        assert_eq!(fault.ip, 0);
        assert_eq!(program.state(), State::Faulted);
        assert_eq!(program.memory(), &Memory::new(image.to_vec()));
    }

    #[test]
    fn test_faulted_program_stays_poisoned() {
        let mut program = program(&[50, 99]);

        let fault = program.run().unwrap_err();

        assert_eq!(program.fault(), Some(fault));
        assert_eq!(program.run(), Err(fault));
        assert_eq!(program.run_batch(&[]), Err(ExecError::Fault(fault)));
    }

    #[test]
    fn test_immediate_write_target_faults() {
        let mut program = program(&[11101, 1, 1, 3, 99]);

        let fault = program.run().unwrap_err();

        assert_eq!(
            fault.kind,
            FaultKind::ImmediateWrite {
                opcode: Opcode::Add
            }
        );
        assert_eq!(program.state(), State::Faulted);
    }

    #[test]
    fn test_invalid_mode_digit_faults() {
        let mut program = program(&[304, 0, 99]);

        let fault = program.run().unwrap_err();

        assert_eq!(fault.kind, FaultKind::InvalidMode { digit: 3 });
    }

    #[test]
    fn test_negative_jump_target_faults() {
        let mut program = program(&[1105, 1, -5, 99]);

        let fault = program.run().unwrap_err();

        assert_eq!(
            fault.kind,
            FaultKind::Memory(crate::memory::NegativeAddress { address: -5 })
        );
        assert_eq!(program.state(), State::Faulted);
    }

    #[test]
    fn test_clones_are_isolated() -> Result<()> {
        // Outputs 1 when the input equals 8, else 0. The winning run
        // overwrites cell 9, which must never leak into the other clone.
        let base = program(&[3, 9, 8, 9, 10, 9, 4, 9, 99, -1, 8]);

        let mut eight = base.clone();
        let mut five = base.clone();

        assert_eq!(eight.run_batch(&[8])?, vec![1]);
        assert_eq!(five.run_batch(&[5])?, vec![0]);

        // Each clone behaves exactly like a fresh sequential run.
        assert_eq!(base.clone().run_batch(&[8])?, vec![1]);
        assert_eq!(base.clone().run_batch(&[5])?, vec![0]);

        Ok(())
    }

    #[test]
    fn test_step_after_halt_is_inert() -> Result<()> {
        let mut program = program(&[99]);
        program.run()?;

        assert_eq!(program.state(), State::Halted);
        program.step()?;
        assert_eq!(program.state(), State::Halted);

        Ok(())
    }
}
