//! IR instruction definitions

use std::fmt;

use crate::types::IrType;

/// A temporary value (virtual register)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Temp(pub u32);

impl fmt::Display for Temp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%t{}", self.0)
    }
}

/// Index of a basic block within its function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub usize);

/// An IR operand
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Temp(Temp),
    IntConst(i64),
    FloatConst(f64),
    BoolConst(bool),
    /// Constant float vector
    VectorConst(Vec<f64>),
    /// Unspecified contents, the starting point of lane-by-lane construction
    Undef,
    /// Incoming function argument
    Param(String),
    /// Address of a module-level variable
    Global(String),
    /// A function, as a call target
    Function(String),
}

impl Value {
    pub fn is_constant(&self) -> bool {
        matches!(
            self,
            Value::IntConst(_) | Value::FloatConst(_) | Value::BoolConst(_) | Value::VectorConst(_)
        )
    }

    pub fn as_temp(&self) -> Option<Temp> {
        match self {
            Value::Temp(t) => Some(*t),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Temp(t) => write!(f, "{}", t),
            Value::IntConst(n) => write!(f, "{}", n),
            Value::FloatConst(x) => write!(f, "{:?}", x),
            Value::BoolConst(b) => write!(f, "{}", b),
            Value::VectorConst(lanes) => {
                write!(f, "<")?;
                for (i, lane) in lanes.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}", lane)?;
                }
                write!(f, ">")
            }
            Value::Undef => write!(f, "undef"),
            Value::Param(name) => write!(f, "%{}", name),
            Value::Global(name) | Value::Function(name) => write!(f, "@{}", name),
        }
    }
}

/// Binary operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    SDiv,
    FAdd,
    FSub,
    FMul,
    FDiv,
    And,
    Or,
    Xor,
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinOp::Add => "add",
            BinOp::Sub => "sub",
            BinOp::Mul => "mul",
            BinOp::SDiv => "sdiv",
            BinOp::FAdd => "fadd",
            BinOp::FSub => "fsub",
            BinOp::FMul => "fmul",
            BinOp::FDiv => "fdiv",
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::Xor => "xor",
        };
        write!(f, "{}", s)
    }
}

/// Comparison predicates; integer predicates are signed, float ones ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpPred {
    Eq,
    Ne,
    Slt,
    Sle,
    Sgt,
    Sge,
    Oeq,
    One,
    Olt,
    Ole,
    Ogt,
    Oge,
}

impl CmpPred {
    pub fn is_float(self) -> bool {
        matches!(
            self,
            CmpPred::Oeq | CmpPred::One | CmpPred::Olt | CmpPred::Ole | CmpPred::Ogt | CmpPred::Oge
        )
    }
}

impl fmt::Display for CmpPred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CmpPred::Eq => "icmp eq",
            CmpPred::Ne => "icmp ne",
            CmpPred::Slt => "icmp slt",
            CmpPred::Sle => "icmp sle",
            CmpPred::Sgt => "icmp sgt",
            CmpPred::Sge => "icmp sge",
            CmpPred::Oeq => "fcmp oeq",
            CmpPred::One => "fcmp one",
            CmpPred::Olt => "fcmp olt",
            CmpPred::Ole => "fcmp ole",
            CmpPred::Ogt => "fcmp ogt",
            CmpPred::Oge => "fcmp oge",
        };
        write!(f, "{}", s)
    }
}

/// Scalar conversions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvOp {
    IntToFloat,
    FloatToInt,
    /// Zero-extend `false`/`true` to 0/1
    BoolToInt,
    BoolToFloat,
}

impl fmt::Display for ConvOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvOp::IntToFloat => write!(f, "sitofp"),
            ConvOp::FloatToInt => write!(f, "fptosi"),
            ConvOp::BoolToInt => write!(f, "zext"),
            ConvOp::BoolToFloat => write!(f, "uitofp"),
        }
    }
}

/// Non-terminating IR instruction
#[derive(Debug, Clone, PartialEq)]
pub enum Inst {
    /// dst = stack slot for a value of `ty`
    Alloca { dst: Temp, ty: IrType, name: String },

    /// dst = *addr
    Load { dst: Temp, ty: IrType, addr: Value },

    /// *addr = value
    Store { addr: Value, value: Value },

    /// dst = left op right (elementwise on vectors)
    Binary {
        dst: Temp,
        op: BinOp,
        ty: IrType,
        left: Value,
        right: Value,
    },

    /// dst = left pred right, an i1
    Cmp {
        dst: Temp,
        pred: CmpPred,
        left: Value,
        right: Value,
    },

    Convert { dst: Temp, op: ConvOp, value: Value },

    /// dst = vector[lane]
    ExtractLane { dst: Temp, vector: Value, lane: u32 },

    /// dst = vector with lane replaced by value
    InsertLane {
        dst: Temp,
        vector: Value,
        value: Value,
        lane: u32,
    },

    /// dst = <vector[mask[0]], vector[mask[1]], ...>
    Shuffle { dst: Temp, vector: Value, mask: Vec<u32> },

    /// dst = &base[index]
    ElementPtr { dst: Temp, base: Value, index: Value },

    Call {
        dst: Option<Temp>,
        func: String,
        args: Vec<Value>,
    },
}

impl Inst {
    /// Temp defined by this instruction
    pub fn dst(&self) -> Option<Temp> {
        match self {
            Inst::Alloca { dst, .. }
            | Inst::Load { dst, .. }
            | Inst::Binary { dst, .. }
            | Inst::Cmp { dst, .. }
            | Inst::Convert { dst, .. }
            | Inst::ExtractLane { dst, .. }
            | Inst::InsertLane { dst, .. }
            | Inst::Shuffle { dst, .. }
            | Inst::ElementPtr { dst, .. } => Some(*dst),
            Inst::Call { dst, .. } => *dst,
            Inst::Store { .. } => None,
        }
    }
}

impl fmt::Display for Inst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inst::Alloca { dst, ty, name } => write!(f, "  {} = alloca {} ; {}", dst, ty, name),
            Inst::Load { dst, ty, addr } => write!(f, "  {} = load {}, {}", dst, ty, addr),
            Inst::Store { addr, value } => write!(f, "  store {}, {}", value, addr),
            Inst::Binary { dst, op, ty, left, right } => {
                write!(f, "  {} = {} {} {}, {}", dst, op, ty, left, right)
            }
            Inst::Cmp { dst, pred, left, right } => {
                write!(f, "  {} = {} {}, {}", dst, pred, left, right)
            }
            Inst::Convert { dst, op, value } => write!(f, "  {} = {} {}", dst, op, value),
            Inst::ExtractLane { dst, vector, lane } => {
                write!(f, "  {} = extractelement {}, {}", dst, vector, lane)
            }
            Inst::InsertLane { dst, vector, value, lane } => {
                write!(f, "  {} = insertelement {}, {}, {}", dst, vector, value, lane)
            }
            Inst::Shuffle { dst, vector, mask } => {
                let mask: Vec<String> = mask.iter().map(|m| m.to_string()).collect();
                write!(f, "  {} = shufflevector {}, <{}>", dst, vector, mask.join(", "))
            }
            Inst::ElementPtr { dst, base, index } => {
                write!(f, "  {} = getelementptr {}, 0, {}", dst, base, index)
            }
            Inst::Call { dst, func, args } => {
                if let Some(d) = dst {
                    write!(f, "  {} = call @{}(", d, func)?;
                } else {
                    write!(f, "  call @{}(", func)?;
                }
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Control transfer closing a basic block
#[derive(Debug, Clone, PartialEq)]
pub enum Terminator {
    Branch(BlockId),
    CondBranch {
        cond: Value,
        then_block: BlockId,
        else_block: BlockId,
    },
    /// Multi-way dispatch on an int
    Switch {
        value: Value,
        default: BlockId,
        cases: Vec<(i64, BlockId)>,
    },
    Return(Option<Value>),
    Unreachable,
}

impl Terminator {
    /// Blocks control may continue in
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            Terminator::Branch(target) => vec![*target],
            Terminator::CondBranch { then_block, else_block, .. } => vec![*then_block, *else_block],
            Terminator::Switch { default, cases, .. } => {
                let mut targets = vec![*default];
                targets.extend(cases.iter().map(|(_, block)| *block));
                targets
            }
            Terminator::Return(_) | Terminator::Unreachable => Vec::new(),
        }
    }
}

/// A straight-line instruction sequence with one terminator
#[derive(Debug, Clone, PartialEq)]
pub struct BasicBlock {
    pub id: BlockId,
    pub name: String,
    pub insts: Vec<Inst>,
    pub terminator: Option<Terminator>,
}

impl BasicBlock {
    pub fn new(id: BlockId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            insts: Vec::new(),
            terminator: None,
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.terminator.is_some()
    }

    pub fn successors(&self) -> Vec<BlockId> {
        self.terminator
            .as_ref()
            .map(Terminator::successors)
            .unwrap_or_default()
    }
}

/// A function in IR form
#[derive(Debug, Clone, PartialEq)]
pub struct IrFunction {
    pub name: String,
    pub params: Vec<(String, IrType)>,
    pub return_type: IrType,
    pub blocks: Vec<BasicBlock>,
}

impl IrFunction {
    pub fn new(name: impl Into<String>, params: Vec<(String, IrType)>, return_type: IrType) -> Self {
        Self {
            name: name.into(),
            params,
            return_type,
            blocks: Vec::new(),
        }
    }

    pub fn block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.blocks.get(id.0)
    }

    pub fn block_mut(&mut self, id: BlockId) -> Option<&mut BasicBlock> {
        self.blocks.get_mut(id.0)
    }

    pub fn block_by_name(&self, name: &str) -> Option<&BasicBlock> {
        self.blocks.iter().find(|b| b.name == name)
    }

    pub fn entry(&self) -> Option<&BasicBlock> {
        self.blocks.first()
    }

    /// Every instruction in block order
    pub fn insts(&self) -> impl Iterator<Item = &Inst> {
        self.blocks.iter().flat_map(|b| b.insts.iter())
    }

    fn block_name(&self, id: BlockId) -> &str {
        self.block(id).map_or("?", |b| b.name.as_str())
    }

    fn fmt_terminator(&self, f: &mut fmt::Formatter<'_>, term: &Terminator) -> fmt::Result {
        match term {
            Terminator::Branch(target) => write!(f, "  br %{}", self.block_name(*target)),
            Terminator::CondBranch { cond, then_block, else_block } => write!(
                f,
                "  br {}, %{}, %{}",
                cond,
                self.block_name(*then_block),
                self.block_name(*else_block)
            ),
            Terminator::Switch { value, default, cases } => {
                write!(f, "  switch {}, %{} [", value, self.block_name(*default))?;
                for (i, (label, target)) in cases.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: %{}", label, self.block_name(*target))?;
                }
                write!(f, "]")
            }
            Terminator::Return(Some(v)) => write!(f, "  ret {}", v),
            Terminator::Return(None) => write!(f, "  ret void"),
            Terminator::Unreachable => write!(f, "  unreachable"),
        }
    }
}

impl fmt::Display for IrFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "define {} @{}(", self.return_type, self.name)?;
        for (i, (name, ty)) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} %{}", ty, name)?;
        }
        writeln!(f, ") {{")?;
        for block in &self.blocks {
            writeln!(f, "{}:", block.name)?;
            for inst in &block.insts {
                writeln!(f, "{}", inst)?;
            }
            if let Some(term) = &block.terminator {
                self.fmt_terminator(f, term)?;
                writeln!(f)?;
            }
        }
        writeln!(f, "}}")
    }
}

/// Module-level variable; `init: None` means zero-initialized
#[derive(Debug, Clone, PartialEq)]
pub struct IrGlobal {
    pub name: String,
    pub ty: IrType,
    pub init: Option<Value>,
}

/// IR module (one compiled program)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IrModule {
    pub name: String,
    pub globals: Vec<IrGlobal>,
    pub functions: Vec<IrFunction>,
}

impl IrModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            globals: Vec::new(),
            functions: Vec::new(),
        }
    }

    pub fn function(&self, name: &str) -> Option<&IrFunction> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn global(&self, name: &str) -> Option<&IrGlobal> {
        self.globals.iter().find(|g| g.name == name)
    }
}

impl fmt::Display for IrModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; module {}", self.name)?;
        for global in &self.globals {
            match &global.init {
                Some(init) => writeln!(f, "@{} = global {} {}", global.name, global.ty, init)?,
                None => writeln!(f, "@{} = global {} zeroinitializer", global.name, global.ty)?,
            }
        }
        for func in &self.functions {
            writeln!(f)?;
            write!(f, "{}", func)?;
        }
        Ok(())
    }
}
