//! Virtual machine instruction emitter.
use smol_str::SmolStr;
use std::{fmt, io};

/// Storage region in the target virtual machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Segment {
    Constant,
    Argument,
    Local,
    Static,
    This,
    That,
    Pointer,
    Temp,
}

impl fmt::Display for Segment {
    #[rustfmt::skip]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Segment as S;
        match self {
            S::Constant => write!(f, "constant"),
            S::Argument => write!(f, "argument"),
            S::Local    => write!(f, "local"),
            S::Static   => write!(f, "static"),
            S::This     => write!(f, "this"),
            S::That     => write!(f, "that"),
            S::Pointer  => write!(f, "pointer"),
            S::Temp     => write!(f, "temp"),
        }
    }
}

/// Arithmetic and logical operations. No operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum VmOp {
    Add,
    Sub,
    Neg,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Not,
}

impl fmt::Display for VmOp {
    #[rustfmt::skip]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use VmOp as O;
        match self {
            O::Add => write!(f, "add"),
            O::Sub => write!(f, "sub"),
            O::Neg => write!(f, "neg"),
            O::Eq  => write!(f, "eq"),
            O::Gt  => write!(f, "gt"),
            O::Lt  => write!(f, "lt"),
            O::And => write!(f, "and"),
            O::Or  => write!(f, "or"),
            O::Not => write!(f, "not"),
        }
    }
}

/// One emitted instruction.
///
/// Immutable once emitted; emission order is the target program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VmInstr {
    Push(Segment, u16),
    Pop(Segment, u16),
    Arith(VmOp),
    Label(SmolStr),
    Goto(SmolStr),
    IfGoto(SmolStr),
    Call(SmolStr, u16),
    Function(SmolStr, u16),
    Return,
}

impl fmt::Display for VmInstr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use VmInstr as I;
        match self {
            I::Push(segment, index) => write!(f, "push {} {}", segment, index),
            I::Pop(segment, index) => write!(f, "pop {} {}", segment, index),
            I::Arith(op) => write!(f, "{}", op),
            I::Label(name) => write!(f, "label {}", name),
            I::Goto(name) => write!(f, "goto {}", name),
            I::IfGoto(name) => write!(f, "if-goto {}", name),
            I::Call(name, n_args) => write!(f, "call {} {}", name, n_args),
            I::Function(name, n_locals) => write!(f, "function {} {}", name, n_locals),
            I::Return => write!(f, "return"),
        }
    }
}

/// Serializes abstract operations into the textual instruction format,
/// one instruction per line.
///
/// Instructions accumulate in memory and reach the destination only on
/// [`close`](VmWriter::close). The `Drop` impl performs the same flush
/// best-effort, so a unit that aborts partway still gets its buffered
/// instructions written out.
///
/// No validation of segment/index/argument-count values happens here;
/// operand correctness is the compile engine's responsibility.
pub struct VmWriter<W: io::Write> {
    out: W,
    instructions: Vec<VmInstr>,
    flushed: bool,
}

impl<W: io::Write> VmWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            instructions: vec![],
            flushed: false,
        }
    }

    /// Instructions emitted so far, in emission order.
    pub fn instructions(&self) -> &[VmInstr] {
        &self.instructions
    }

    #[inline]
    fn emit(&mut self, instr: VmInstr) {
        self.instructions.push(instr);
    }

    #[inline]
    pub fn write_push(&mut self, segment: Segment, index: u16) {
        self.emit(VmInstr::Push(segment, index));
    }

    #[inline]
    pub fn write_pop(&mut self, segment: Segment, index: u16) {
        self.emit(VmInstr::Pop(segment, index));
    }

    #[inline]
    pub fn write_arithmetic(&mut self, op: VmOp) {
        self.emit(VmInstr::Arith(op));
    }

    #[inline]
    pub fn write_label(&mut self, label: &str) {
        self.emit(VmInstr::Label(SmolStr::from(label)));
    }

    #[inline]
    pub fn write_goto(&mut self, label: &str) {
        self.emit(VmInstr::Goto(SmolStr::from(label)));
    }

    #[inline]
    pub fn write_if_goto(&mut self, label: &str) {
        self.emit(VmInstr::IfGoto(SmolStr::from(label)));
    }

    #[inline]
    pub fn write_call(&mut self, name: &str, n_args: u16) {
        self.emit(VmInstr::Call(SmolStr::from(name), n_args));
    }

    #[inline]
    pub fn write_function(&mut self, name: &str, n_locals: u16) {
        self.emit(VmInstr::Function(SmolStr::from(name), n_locals));
    }

    #[inline]
    pub fn write_return(&mut self) {
        self.emit(VmInstr::Return);
    }

    /// Write all buffered instructions to the destination and flush it.
    pub fn close(mut self) -> io::Result<()> {
        self.flush_out()
    }

    fn flush_out(&mut self) -> io::Result<()> {
        if self.flushed {
            return Ok(());
        }
        self.flushed = true;

        for instr in &self.instructions {
            writeln!(self.out, "{}", instr)?;
        }
        self.out.flush()
    }
}

impl<W: io::Write> Drop for VmWriter<W> {
    fn drop(&mut self) {
        let _ = self.flush_out();
    }
}
