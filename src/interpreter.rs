//! Stack VM that interprets a checked [`Program`] directly.
//!
//! Expression nodes implement [`Calculable`]: `calc` pushes exactly one
//! [`Variant`] on the thread's value stack. Statement nodes implement
//! [`Executable`]: `execute` returns the [`Flow`] that tells enclosing loops
//! and method calls how to continue.

mod errors;
mod evaluate;
mod execute;
mod frame;
mod native;
mod trace;
mod value;

pub use errors::RuntimeError;
pub use execute::Flow;
pub use frame::Frame;
pub use trace::{TraceSink, WriteSink};
pub use value::{Instance, MapKey, Object, Variant};

use std::collections::{HashMap, HashSet};

use crate::analyzer::scope::{SpaceId, SymbolTable};
use crate::ast::{Ast, NodeId, NodeKind};
use crate::config::VmOptions;
use crate::driver::Program;
use crate::source::SourceMap;
use crate::utils::Interner;

pub(crate) trait Calculable {
    fn calc(&self, id: NodeId, thread: &mut Thread<'_>) -> Result<(), RuntimeError>;
}

pub(crate) trait Executable {
    fn execute(&self, id: NodeId, thread: &mut Thread<'_>) -> Result<Flow, RuntimeError>;
}

impl NodeKind {
    pub(crate) fn calculable(&self) -> Option<&dyn Calculable> {
        match self {
            NodeKind::Constant(n) => Some(n),
            NodeKind::ListLiteral(n) => Some(n),
            NodeKind::MapLiteral(n) => Some(n),
            NodeKind::Name(n) => Some(n),
            NodeKind::Field(n) => Some(n),
            NodeKind::Index(n) => Some(n),
            NodeKind::Convert(n) => Some(n),
            NodeKind::Unary(n) => Some(n),
            NodeKind::Binary(n) => Some(n),
            NodeKind::Call(n) => Some(n),
            NodeKind::MemberCall(n) => Some(n),
            _ => None,
        }
    }

    pub(crate) fn executable(&self) -> Option<&dyn Executable> {
        match self {
            NodeKind::VarDef(n) => Some(n),
            NodeKind::ExprStmt(n) => Some(n),
            NodeKind::Block(n) => Some(n),
            NodeKind::If(n) => Some(n),
            NodeKind::While(n) => Some(n),
            NodeKind::Repeat(n) => Some(n),
            NodeKind::CountedFor(n) => Some(n),
            NodeKind::IteratedFor(n) => Some(n),
            NodeKind::MethodDef(n) => Some(n),
            NodeKind::ClassDef(n) => Some(n),
            NodeKind::Import(n) => Some(n),
            NodeKind::Return(n) => Some(n),
            NodeKind::Leave(n) => Some(n),
            NodeKind::Continue(n) => Some(n),
            _ => None,
        }
    }
}

/// One execution path over a program: a value stack, a frame stack and the
/// static storage of every module it has touched.
pub struct Thread<'p> {
    program: &'p Program,
    ast: &'p Ast,
    symbols: &'p SymbolTable,
    names: &'p Interner,
    map: &'p SourceMap,
    options: VmOptions,
    stack: Vec<Variant>,
    frames: Vec<Frame>,
    /// Frame of the innermost running method; `None` at module level.
    fp: Option<usize>,
    statics: HashMap<SpaceId, Vec<Variant>>,
    initialized: HashSet<SpaceId>,
    /// Value of the `return` being unwound.
    ret: Option<Variant>,
    trace: Option<&'p mut dyn TraceSink>,
    output: Option<&'p mut dyn TraceSink>,
}

impl<'p> Thread<'p> {
    pub fn new(program: &'p Program, options: VmOptions) -> Self {
        Self {
            program,
            ast: &program.ast,
            symbols: &program.symbols,
            names: &program.names,
            map: &program.map,
            options,
            stack: Vec::new(),
            frames: Vec::new(),
            fp: None,
            statics: HashMap::new(),
            initialized: HashSet::new(),
            ret: None,
            trace: None,
            output: None,
        }
    }

    /// Receives one line per traced step.
    pub fn with_trace(mut self, sink: &'p mut dyn TraceSink) -> Self {
        self.trace = Some(sink);
        self
    }

    /// Receives `print` output; without one it goes to `log::info!`.
    pub fn with_output(mut self, sink: &'p mut dyn TraceSink) -> Self {
        self.output = Some(sink);
        self
    }

    /// Runs the body of `module` (and, through its imports, the modules it
    /// depends on). Each module body runs at most once per thread.
    pub fn run(&mut self, module: &str) -> Result<(), RuntimeError> {
        let errors = self.program.error_count();
        if errors > 0 {
            return Err(RuntimeError::ProgramHasErrors(errors));
        }
        let space = self
            .program
            .module(module)
            .ok_or_else(|| RuntimeError::ModuleNotFound(module.to_string()))?;
        log::debug!("running module '{module}'");
        let result = self.init_module(space);
        if let Err(err) = &result {
            log::error!("{err}");
            self.stack.clear();
            self.frames.clear();
            self.fp = None;
        }
        result
    }

    /// Current value of a module-level variable, once its module has run.
    pub fn static_value(&self, module: &str, name: &str) -> Option<&Variant> {
        let space = self.program.module(module)?;
        let symbol = self.names.get(name)?;
        let var = self.symbols.lookup_var(space, symbol)?;
        let var = self.symbols.var(var);
        self.statics.get(&var.space)?.get(var.slot)
    }

    /// Values left on the stack; zero between statements.
    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    fn init_module(&mut self, space: SpaceId) -> Result<(), RuntimeError> {
        if !self.initialized.insert(space) {
            return Ok(());
        }
        self.ensure_statics(space);
        let Some(body) = self.symbols.space(space).body else {
            return Ok(());
        };
        let saved = self.fp.take();
        let flow = self.execute(body);
        self.fp = saved;
        flow.map(|_| ())
    }

    // --- dispatch ---

    pub(crate) fn calc(&mut self, id: NodeId) -> Result<(), RuntimeError> {
        let ast = self.ast;
        match ast.kind(id).calculable() {
            Some(node) => node.calc(id, self),
            None => Err(self.unimplemented(id, "evaluating this node")),
        }
    }

    pub(crate) fn execute(&mut self, id: NodeId) -> Result<Flow, RuntimeError> {
        let ast = self.ast;
        let kind = ast.kind(id);
        if self.options.trace_statements && !matches!(kind, NodeKind::Block(_)) {
            let at = self.at(id);
            self.trace_line(format!("{at} {}", kind.name()));
        }
        match kind.executable() {
            Some(node) => node.execute(id, self),
            None => Err(self.unimplemented(id, "executing this node")),
        }
    }

    /// Children of `id`, borrowed from the program rather than the thread.
    pub(crate) fn children(&self, id: NodeId) -> &'p [NodeId] {
        let ast = self.ast;
        ast.children(id)
    }

    /// Calculates `id` and takes its value off the stack.
    pub(crate) fn value(&mut self, id: NodeId) -> Result<Variant, RuntimeError> {
        self.calc(id)?;
        self.pop()
    }

    // --- value stack ---

    pub(crate) fn push(&mut self, value: Variant) {
        self.stack.push(value);
    }

    pub(crate) fn pop(&mut self) -> Result<Variant, RuntimeError> {
        self.stack.pop().ok_or(RuntimeError::StackUnderflow)
    }

    pub(crate) fn top_mut(&mut self) -> Result<&mut Variant, RuntimeError> {
        self.stack.last_mut().ok_or(RuntimeError::StackUnderflow)
    }

    /// Pops the values of the last `n` calculated nodes, oldest first.
    pub(crate) fn pop_n(&mut self, n: usize) -> Result<Vec<Variant>, RuntimeError> {
        let start = self
            .stack
            .len()
            .checked_sub(n)
            .ok_or(RuntimeError::StackUnderflow)?;
        Ok(self.stack.split_off(start))
    }

    // --- tracing and errors ---

    pub(crate) fn tracing(&self) -> bool {
        self.options.trace_statements
    }

    pub(crate) fn trace_line(&mut self, text: String) {
        match self.trace.as_deref_mut() {
            Some(sink) => sink.line(&text),
            None => log::trace!("{text}"),
        }
    }

    pub(crate) fn print_line(&mut self, text: String) {
        match self.output.as_deref_mut() {
            Some(sink) => sink.line(&text),
            None => log::info!("{text}"),
        }
    }

    pub(crate) fn at(&self, id: NodeId) -> String {
        locate(self.map, self.ast, id)
    }

    pub(crate) fn unimplemented(&self, id: NodeId, what: &str) -> RuntimeError {
        RuntimeError::Unimplemented {
            what: what.to_string(),
            at: self.at(id),
        }
    }
}

pub(crate) fn locate(map: &SourceMap, ast: &Ast, id: NodeId) -> String {
    map.location(ast.pos(id))
}
