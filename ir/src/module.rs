use std::collections::HashSet;

use cranelift_entity::PrimaryMap;

use crate::function::Function;
use crate::global::{ConstantData, GlobalVariable};
use crate::{ConstantId, FunctionId, GlobalId};

/// A collection of functions, global variables, and constants (spec.md
/// §3). Owns everything the core passes touch; lifetime spans one
/// transformation pass.
#[derive(Clone, Debug, Default)]
pub struct Module {
    pub name: String,
    functions: PrimaryMap<FunctionId, Function>,
    function_order: Vec<FunctionId>,
    globals: PrimaryMap<GlobalId, GlobalVariable>,
    global_order: Vec<GlobalId>,
    constants: PrimaryMap<ConstantId, ConstantData>,
    /// Globals retained against dead-global elimination (spec.md §3, §6).
    compiler_used: HashSet<GlobalId>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Module {
            name: name.into(),
            functions: PrimaryMap::new(),
            function_order: Vec::new(),
            globals: PrimaryMap::new(),
            global_order: Vec::new(),
            constants: PrimaryMap::new(),
            compiler_used: HashSet::new(),
        }
    }

    pub fn create_function(&mut self, f: Function) -> FunctionId {
        let id = self.functions.push(f);
        self.function_order.push(id);
        id
    }

    pub fn functions(&self) -> impl Iterator<Item = FunctionId> + '_ {
        self.function_order.iter().copied()
    }

    pub fn function(&self, id: FunctionId) -> &Function {
        &self.functions[id]
    }

    pub fn function_mut(&mut self, id: FunctionId) -> &mut Function {
        &mut self.functions[id]
    }

    pub fn find_function(&self, name: &str) -> Option<FunctionId> {
        self.function_order.iter().copied().find(|&id| self.functions[id].name == name)
    }

    pub fn create_global(&mut self, g: GlobalVariable) -> GlobalId {
        let id = self.globals.push(g);
        self.global_order.push(id);
        id
    }

    pub fn globals(&self) -> impl Iterator<Item = GlobalId> + '_ {
        self.global_order.iter().copied()
    }

    pub fn global(&self, id: GlobalId) -> &GlobalVariable {
        &self.globals[id]
    }

    pub fn global_mut(&mut self, id: GlobalId) -> &mut GlobalVariable {
        &mut self.globals[id]
    }

    /// Erases `global` from the module. Callers must have already
    /// rewritten away every instruction use (spec.md §4.3 step 5).
    pub fn erase_global(&mut self, global: GlobalId) {
        self.global_order.retain(|&g| g != global);
        self.compiler_used.remove(&global);
    }

    pub fn add_compiler_used(&mut self, global: GlobalId) {
        self.compiler_used.insert(global);
    }

    pub fn is_compiler_used(&self, global: GlobalId) -> bool {
        self.compiler_used.contains(&global)
    }

    pub fn add_constant(&mut self, data: ConstantData) -> ConstantId {
        self.constants.push(data)
    }

    pub fn constant(&self, id: ConstantId) -> &ConstantData {
        &self.constants[id]
    }
}
