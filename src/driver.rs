//! Embedding API: register sources, parse a unit into a [`Program`], run it.

use std::path::{Path, PathBuf};

use crate::analyzer;
use crate::analyzer::scope::{SpaceId, SymbolTable};
use crate::ast::{self, Ast};
use crate::config::{EngineConfig, VmOptions};
use crate::context::Context;
use crate::diagnostic::Diagnostic;
use crate::error::{ConfigError, Error};
use crate::interpreter::{RuntimeError, Thread, TraceSink};
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::source::{FileReader, SourceManager, SourceMap, SourceReader, unit_name_for};
use crate::utils::Interner;

/// A parsed and checked program. Owns everything the VM needs, including
/// the positions diagnostics and runtime errors are rendered against.
#[derive(Debug)]
pub struct Program {
    pub ast: Ast,
    pub symbols: SymbolTable,
    pub names: Interner,
    pub map: SourceMap,
    pub diagnostics: Vec<Diagnostic>,
    pub main: SpaceId,
    /// Unit name and space of every module, the main unit first.
    pub modules: Vec<(String, SpaceId)>,
}

impl Program {
    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics.len() - self.error_count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn module(&self, name: &str) -> Option<SpaceId> {
        self.modules.iter().find(|(unit, _)| unit == name).map(|(_, space)| *space)
    }

    /// Structural trace of the main unit.
    pub fn dump(&self) -> String {
        self.dump_space(self.main)
    }

    pub fn dump_module(&self, name: &str) -> Option<String> {
        self.module(name).map(|space| self.dump_space(space))
    }

    fn dump_space(&self, space: SpaceId) -> String {
        match self.symbols.space(space).body {
            Some(body) => ast::dump(&self.ast, body, &self.symbols, &self.names),
            None => String::new(),
        }
    }

    pub fn diagnostics_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.diagnostics)
    }
}

pub struct Driver {
    context: Context,
    sources: SourceManager,
}

impl Driver {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            context: Context::new(config)?,
            sources: SourceManager::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.context.config
    }

    pub fn vm_options_mut(&mut self) -> &mut VmOptions {
        &mut self.context.config.vm
    }

    /// Registers an in-memory unit.
    pub fn add_source(&mut self, unit: impl Into<String>, text: impl Into<String>) {
        self.sources.add_buffer(unit, text);
    }

    /// Registers a file under its stem and returns that unit name.
    pub fn add_file(&mut self, path: impl AsRef<Path>) -> String {
        let path = path.as_ref();
        let unit = unit_name_for(path);
        let mut reader = FileReader::named(path.display().to_string());
        reader.add_file(unit.clone(), path);
        self.sources.register_reader(Box::new(reader));
        unit
    }

    /// Resolves unit `a` to `<root>/a.<extension>`.
    pub fn add_directory(&mut self, root: impl Into<PathBuf>, extension: impl Into<String>) {
        self.sources
            .register_reader(Box::new(FileReader::rooted(root, extension)));
    }

    pub fn add_reader(&mut self, reader: Box<dyn SourceReader>) {
        self.sources.register_reader(reader);
    }

    /// Parses and checks `unit` and every unit it imports. Problems in the
    /// source come back as diagnostics inside the program.
    pub fn parse(&mut self, unit: &str) -> Result<Program, Error> {
        self.sources.begin();
        if !self.sources.open(unit) {
            return Err(Error::UnitNotFound(unit.to_string()));
        }

        let context = &self.context;
        let lexer = Lexer::new(&mut self.sources, &context.language.table);
        let parser = Parser::new(
            lexer,
            &context.language.vocab,
            &context.builtins,
            context.config.parser,
        );
        let mut output = parser.parse_program(unit);
        analyzer::check(&mut output, &context.builtins);

        let map = self.sources.take_map();
        let diagnostics = output.diagnostics.into_vec(&map);
        let program = Program {
            ast: output.ast,
            symbols: output.symbols,
            names: output.names,
            map,
            diagnostics,
            main: output.main,
            modules: output.modules,
        };
        log::debug!(
            "parsed '{unit}': {} nodes, {} errors, {} warnings",
            program.ast.len(),
            program.error_count(),
            program.warning_count()
        );
        Ok(program)
    }

    /// A fresh thread over `program`, for embedders that want to inspect
    /// module statics after a run. It runs on the caller's stack, which
    /// has to hold `max_depth` nested calls.
    pub fn thread<'p>(&self, program: &'p Program) -> Thread<'p> {
        Thread::new(program, self.context.config.vm)
    }

    /// Runs `module` on a fresh VM thread. The VM recurses on the native
    /// stack, so the run gets a stack sized for the configured call depth
    /// and nesting limit; exceeding `max_depth` is then always reported as
    /// [`RuntimeError::StackOverflow`].
    pub fn execute(
        &self,
        program: &Program,
        module: &str,
        trace: Option<&mut (dyn TraceSink + Send)>,
        output: Option<&mut (dyn TraceSink + Send)>,
    ) -> Result<(), RuntimeError> {
        let options = self.context.config.vm;
        let bytes = vm_stack_size(options.max_depth, self.context.config.parser.max_nesting);
        std::thread::scope(|scope| {
            let runner = std::thread::Builder::new()
                .name("ember-vm".into())
                .stack_size(bytes)
                .spawn_scoped(scope, move || {
                    let mut thread = Thread::new(program, options);
                    if let Some(sink) = trace {
                        thread = thread.with_trace(sink);
                    }
                    if let Some(sink) = output {
                        thread = thread.with_output(sink);
                    }
                    thread.run(module)
                })
                .map_err(|err| RuntimeError::NoStack {
                    bytes,
                    reason: err.to_string(),
                })?;
            runner
                .join()
                .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
        })
    }

    /// Every diagnostic of `program`, one block per diagnostic.
    pub fn render_diagnostics(&self, program: &Program) -> String {
        let blocks: Vec<String> = program.diagnostics.iter().map(ToString::to_string).collect();
        blocks.join("\n")
    }
}

/// Native stack for one VM run: a fixed base plus, per allowed call level,
/// a method's worth of statement and expression nesting.
fn vm_stack_size(max_depth: usize, max_nesting: usize) -> usize {
    const BASE: usize = 4 << 20;
    const PER_CALL: usize = 32 << 10;
    const PER_LEVEL: usize = 2 << 10;
    let per_call = PER_CALL.saturating_add(max_nesting.saturating_mul(PER_LEVEL));
    BASE.saturating_add(max_depth.saturating_mul(per_call))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vm_stack_grows_with_depth_and_nesting() {
        let small = vm_stack_size(16, 128);
        assert!(small > 4 << 20);
        assert!(vm_stack_size(32, 128) > small);
        assert!(vm_stack_size(16, 256) > small);
        assert_eq!(vm_stack_size(usize::MAX, 128), usize::MAX);
    }
}
