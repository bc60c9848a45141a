//! Capabilities the collector consumes from an exploration engine.
//!
//! The engine itself (path exploration, constraint solving, interpretation)
//! lives outside this crate. Adapters implement these traits; the collector
//! only ever talks to the traits.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Source of the path condition held by the most recent symbolic choice point.
pub trait PathConditionSource {
    /// Printed form of the active path condition, `None` when no symbolic
    /// constraints are active.
    fn current_condition(&self) -> Option<String>;
}

/// Names visible to a method, used to qualify fields in conditions.
pub trait MethodContext {
    /// Instance field names of the declaring type and its supertypes.
    fn field_names(&self) -> BTreeSet<String>;
    /// Parameter names of the method, excluding the receiver.
    fn parameter_names(&self) -> BTreeSet<String>;
}

/// Handle to an instruction inside a method known to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstructionRef {
    /// Engine-side method identifier
    pub method: String,
    /// Instruction offset inside the method body
    pub offset: u32,
}

impl InstructionRef {
    pub fn new(method: impl Into<String>, offset: u32) -> Self {
        Self {
            method: method.into(),
            offset,
        }
    }
}

/// Owning method of an instruction, as resolved by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedMethod {
    /// Fully qualified declaring type (e.g. `br.ufpe.cin.witup.jpf.Account`)
    pub class_name: String,
    /// Method name, `<init>` for constructors, `<clinit>` for static initializers
    pub method_name: String,
    /// Internal method descriptor (e.g. `(D)V`)
    pub descriptor: String,
    /// Source line of the resolved instruction
    pub line: Option<u32>,
    /// Instance fields visible through the declaring type
    pub field_names: BTreeSet<String>,
    /// Parameter names, receiver excluded
    pub parameter_names: BTreeSet<String>,
}

impl MethodContext for ResolvedMethod {
    fn field_names(&self) -> BTreeSet<String> {
        self.field_names.clone()
    }

    fn parameter_names(&self) -> BTreeSet<String> {
        self.parameter_names.clone()
    }
}

/// Engine-wide queries available while handling an event.
pub trait EngineContext {
    /// Path condition provider, `None` when the symbolic extension is not
    /// loaded and only concrete exploration is available.
    fn path_conditions(&self) -> Option<&dyn PathConditionSource>;

    /// Map an instruction to its owning method.
    fn resolve_method(&self, insn: &InstructionRef) -> Option<ResolvedMethod>;
}

/// Per-thread state at the moment of an event.
pub trait ThreadContext {
    fn current_instruction(&self) -> Option<InstructionRef>;
}

/// Thrown value handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrownValue {
    /// Fully qualified runtime type name
    pub type_name: String,
}

impl ThrownValue {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
        }
    }
}

/// Observer seam driven by the engine.
///
/// Every method defaults to a no-op so listeners only override the events
/// they care about. Handlers run synchronously on the exploration thread and
/// must not fail back into the engine.
pub trait RunListener {
    /// A choice point was registered; `condition` is present for symbolic ones.
    fn on_choice_point(&mut self, _condition: Option<&str>) {}

    fn on_exception_thrown(
        &mut self,
        _engine: &dyn EngineContext,
        _thread: &dyn ThreadContext,
        _thrown: Option<&ThrownValue>,
    ) {
    }

    fn on_run_finished(&mut self) {}
}
