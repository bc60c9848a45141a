//! Recorded exploration traces.
//!
//! A trace is a line-oriented JSON recording of one engine run: class and
//! method metadata, choice points (symbolic ones carry the printed path
//! condition), exception events and run completion. [`replay`] plays it
//! back through a [`RunListener`] exactly as a live engine would, with
//! [`ReplayEngine`] answering the engine-side queries.
//!
//! Blank lines and lines starting with `#` are ignored; the first `#` line is
//! the trace's description.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, warn};

use crate::engine::{
    EngineContext, InstructionRef, PathConditionSource, ResolvedMethod, RunListener,
    ThreadContext, ThrownValue,
};
use crate::error::{ExcondError, Result};

/// Receiver parameter name, never treated as a method parameter.
const RECEIVER_PARAM: &str = "this";

/// One recorded engine event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    /// Whether the symbolic path condition provider is loaded
    Symbolic { enabled: bool },
    /// Class metadata
    Class {
        name: String,
        #[serde(default)]
        superclass: Option<String>,
        #[serde(default)]
        fields: Vec<String>,
    },
    /// Method metadata; `lines` maps instruction offsets to source lines
    Method {
        id: String,
        class: String,
        name: String,
        descriptor: String,
        #[serde(default)]
        parameters: Vec<String>,
        #[serde(default)]
        lines: Vec<(u32, u32)>,
    },
    /// Choice point; `condition` is set for symbolic ones
    Choice {
        #[serde(default)]
        condition: Option<String>,
    },
    /// Exploration backtracked past the most recent choice point
    Backtrack,
    /// An exception was thrown at `method`/`offset`
    Exception {
        #[serde(default)]
        thrown: Option<String>,
        #[serde(default)]
        method: Option<String>,
        #[serde(default)]
        offset: u32,
    },
    /// Exploration is complete
    Finished,
}

/// A parsed trace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trace {
    pub description: Option<String>,
    pub events: Vec<TraceEvent>,
}

impl Trace {
    pub fn parse(text: &str) -> Result<Self> {
        let mut trace = Trace::default();
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(comment) = comment_text(line) {
                if trace.description.is_none() {
                    trace.description = Some(comment);
                }
                continue;
            }
            let event = serde_json::from_str(line)
                .map_err(|e| ExcondError::trace(idx + 1, e.to_string()))?;
            trace.events.push(event);
        }
        Ok(trace)
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::parse(&fs::read_to_string(path)?)
    }

    /// Description of a trace file (same rule as [`Trace::parse`]), without
    /// parsing the events.
    pub fn description_of(path: &Path) -> Result<Option<String>> {
        let reader = BufReader::new(fs::File::open(path)?);
        for line in reader.lines() {
            if let Some(comment) = comment_text(line?.trim()) {
                return Ok(Some(comment));
            }
        }
        Ok(None)
    }

    pub fn to_jsonl(&self) -> Result<String> {
        let mut out = String::new();
        if let Some(desc) = &self.description {
            out.push_str("# ");
            out.push_str(desc);
            out.push('\n');
        }
        for event in &self.events {
            out.push_str(&serde_json::to_string(event)?);
            out.push('\n');
        }
        Ok(out)
    }
}

/// Text of a trimmed `#` comment line.
fn comment_text(line: &str) -> Option<String> {
    line.strip_prefix('#').map(|c| c.trim().to_string())
}

#[derive(Debug, Clone, Default)]
struct ClassInfo {
    superclass: Option<String>,
    fields: Vec<String>,
}

#[derive(Debug, Clone, Default)]
struct MethodInfo {
    class: String,
    name: String,
    descriptor: String,
    parameters: Vec<String>,
    /// Sorted by offset
    lines: Vec<(u32, u32)>,
}

impl MethodInfo {
    /// Line of the closest line-table entry at or before `offset`.
    fn line_at(&self, offset: u32) -> Option<u32> {
        self.lines
            .iter()
            .take_while(|(start, _)| *start <= offset)
            .last()
            .map(|(_, line)| *line)
    }
}

/// Engine state reconstructed from a trace.
#[derive(Debug, Clone)]
pub struct ReplayEngine {
    symbolic: bool,
    choices: Vec<Option<String>>,
    classes: HashMap<String, ClassInfo>,
    methods: HashMap<String, MethodInfo>,
}

impl Default for ReplayEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplayEngine {
    pub fn new() -> Self {
        Self {
            symbolic: true,
            choices: Vec::new(),
            classes: HashMap::new(),
            methods: HashMap::new(),
        }
    }

    pub fn set_symbolic(&mut self, enabled: bool) {
        self.symbolic = enabled;
    }

    pub fn register_class(&mut self, name: &str, superclass: Option<&str>, fields: &[String]) {
        self.classes.insert(
            name.to_string(),
            ClassInfo {
                superclass: superclass.map(str::to_string),
                fields: fields.to_vec(),
            },
        );
    }

    pub fn register_method(
        &mut self,
        id: &str,
        class: &str,
        name: &str,
        descriptor: &str,
        parameters: &[String],
        lines: &[(u32, u32)],
    ) {
        let mut lines = lines.to_vec();
        lines.sort_unstable();
        self.methods.insert(
            id.to_string(),
            MethodInfo {
                class: class.to_string(),
                name: name.to_string(),
                descriptor: descriptor.to_string(),
                parameters: parameters.to_vec(),
                lines,
            },
        );
    }

    pub fn push_choice(&mut self, condition: Option<String>) {
        self.choices.push(condition);
    }

    /// Drop the most recent choice point. Returns `false` if there was none.
    pub fn backtrack(&mut self) -> bool {
        self.choices.pop().is_some()
    }

    /// Instance fields declared by `class` and every superclass.
    pub fn instance_fields(&self, class: &str) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        let mut seen = HashSet::new();
        let mut current = Some(class.to_string());
        while let Some(name) = current {
            if !seen.insert(name.clone()) {
                warn!("class hierarchy cycle at {}", name);
                break;
            }
            let Some(info) = self.classes.get(&name) else {
                break;
            };
            names.extend(info.fields.iter().cloned());
            current = info.superclass.clone();
        }
        names
    }

    fn apply(&mut self, event: &TraceEvent) {
        match event {
            TraceEvent::Symbolic { enabled } => self.set_symbolic(*enabled),
            TraceEvent::Class { name, superclass, fields } => {
                self.register_class(name, superclass.as_deref(), fields)
            }
            TraceEvent::Method { id, class, name, descriptor, parameters, lines } => {
                self.register_method(id, class, name, descriptor, parameters, lines)
            }
            TraceEvent::Choice { condition } => self.push_choice(condition.clone()),
            TraceEvent::Backtrack => {
                if !self.backtrack() {
                    warn!("backtrack with no choice point on the stack");
                }
            }
            TraceEvent::Exception { .. } | TraceEvent::Finished => {}
        }
    }
}

impl PathConditionSource for ReplayEngine {
    /// Condition of the most recent symbolic choice point; concrete choice
    /// points above it are skipped.
    fn current_condition(&self) -> Option<String> {
        self.choices.iter().rev().find_map(|c| c.clone())
    }
}

impl EngineContext for ReplayEngine {
    fn path_conditions(&self) -> Option<&dyn PathConditionSource> {
        if self.symbolic {
            Some(self as &dyn PathConditionSource)
        } else {
            None
        }
    }

    fn resolve_method(&self, insn: &InstructionRef) -> Option<ResolvedMethod> {
        let method = self.methods.get(&insn.method)?;
        Some(ResolvedMethod {
            class_name: method.class.clone(),
            method_name: method.name.clone(),
            descriptor: method.descriptor.clone(),
            line: method.line_at(insn.offset),
            field_names: self.instance_fields(&method.class),
            parameter_names: method
                .parameters
                .iter()
                .filter(|p| p.as_str() != RECEIVER_PARAM)
                .cloned()
                .collect(),
        })
    }
}

/// Thread state at a recorded exception.
#[derive(Debug, Clone, Default)]
pub struct ReplayThread {
    pub current: Option<InstructionRef>,
}

impl ThreadContext for ReplayThread {
    fn current_instruction(&self) -> Option<InstructionRef> {
        self.current.clone()
    }
}

/// Counts gathered while replaying a trace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub events: usize,
    pub choices: usize,
    pub exceptions: usize,
}

impl std::fmt::Display for ReplaySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} events, {} choice points, {} exceptions",
            self.events, self.choices, self.exceptions
        )
    }
}

/// Drive `listener` through `trace`.
///
/// The run always ends with exactly one `on_run_finished`, whether or not
/// the trace recorded a `finished` event. Events after `finished` are
/// ignored.
pub fn replay(trace: &Trace, listener: &mut dyn RunListener) -> ReplaySummary {
    let mut engine = ReplayEngine::new();
    let mut summary = ReplaySummary::default();

    for event in &trace.events {
        summary.events += 1;
        engine.apply(event);
        match event {
            TraceEvent::Choice { condition } => {
                summary.choices += 1;
                listener.on_choice_point(condition.as_deref());
            }
            TraceEvent::Exception { thrown, method, offset } => {
                summary.exceptions += 1;
                let thread = ReplayThread {
                    current: method.as_ref().map(|m| InstructionRef::new(m.clone(), *offset)),
                };
                let thrown = thrown.as_ref().map(ThrownValue::new);
                listener.on_exception_thrown(&engine, &thread, thrown.as_ref());
            }
            TraceEvent::Finished => {
                listener.on_run_finished();
                if summary.events < trace.events.len() {
                    warn!(
                        "{} events after run finished were ignored",
                        trace.events.len() - summary.events
                    );
                }
                return summary;
            }
            _ => {}
        }
    }

    debug!("trace ended without a finished event");
    listener.on_run_finished();
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[derive(Default)]
    struct Recorder {
        choices: Vec<Option<String>>,
        conditions: Vec<Option<String>>,
        finished: usize,
    }

    impl RunListener for Recorder {
        fn on_choice_point(&mut self, condition: Option<&str>) {
            self.choices.push(condition.map(str::to_string));
        }

        fn on_exception_thrown(
            &mut self,
            engine: &dyn EngineContext,
            _thread: &dyn ThreadContext,
            _thrown: Option<&ThrownValue>,
        ) {
            self.conditions
                .push(engine.path_conditions().and_then(|s| s.current_condition()));
        }

        fn on_run_finished(&mut self) {
            self.finished += 1;
        }
    }

    #[test]
    fn test_parse_skips_comments_and_blank_lines() {
        let text = "# Account.debit symbolic\n\n# second comment\n\
            {\"event\":\"choice\",\"condition\":\"x > 0\"}\n\
            {\"event\":\"backtrack\"}\n\
            {\"event\":\"finished\"}\n";
        let trace = Trace::parse(text).unwrap();
        assert_eq!(trace.description.as_deref(), Some("Account.debit symbolic"));
        assert_eq!(trace.events.len(), 3);
        assert_eq!(trace.events[1], TraceEvent::Backtrack);
    }

    #[test]
    fn test_parse_error_reports_line() {
        let text = "# bad\n{\"event\":\"finished\"}\n{\"event\":\"teleport\"}\n";
        match Trace::parse(text).unwrap_err() {
            ExcondError::Trace { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_description_matches_parse() {
        let text = "{\"event\":\"symbolic\",\"enabled\":true}\n\
            # Math.sum(a, b) symbolic\n\
            {\"event\":\"finished\"}\n\
            # later note\n";
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sum.jsonl");
        fs::write(&path, text).unwrap();

        let parsed = Trace::parse(text).unwrap();
        assert_eq!(parsed.description.as_deref(), Some("Math.sum(a, b) symbolic"));
        assert_eq!(Trace::description_of(&path).unwrap(), parsed.description);

        fs::write(&path, "{\"event\":\"finished\"}\n").unwrap();
        assert_eq!(Trace::description_of(&path).unwrap(), None);
    }

    #[test]
    fn test_jsonl_round_trip() {
        let trace = Trace {
            description: Some("demo".to_string()),
            events: vec![
                TraceEvent::Symbolic { enabled: false },
                TraceEvent::Choice { condition: None },
                TraceEvent::Exception {
                    thrown: None,
                    method: Some("M".to_string()),
                    offset: 4,
                },
                TraceEvent::Finished,
            ],
        };
        assert_eq!(Trace::parse(&trace.to_jsonl().unwrap()).unwrap(), trace);
    }

    #[test]
    fn test_instance_fields_walk_superclasses() {
        let mut engine = ReplayEngine::new();
        engine.register_class("SavingsAccount", Some("Account"), &names(&["rate"]));
        engine.register_class("Account", Some("java.lang.Object"), &names(&["balance"]));
        let fields: Vec<String> = engine.instance_fields("SavingsAccount").into_iter().collect();
        assert_eq!(fields, names(&["balance", "rate"]));
    }

    #[test]
    fn test_instance_fields_survive_cycles() {
        let mut engine = ReplayEngine::new();
        engine.register_class("A", Some("B"), &names(&["a"]));
        engine.register_class("B", Some("A"), &names(&["b"]));
        assert_eq!(engine.instance_fields("A").len(), 2);
    }

    #[test]
    fn test_resolve_method_line_and_names() {
        let mut engine = ReplayEngine::new();
        engine.register_class("Account", None, &names(&["balance"]));
        engine.register_method(
            "Account.debit",
            "Account",
            "debit",
            "(D)V",
            &names(&["this", "value"]),
            &[(16, 15), (0, 12), (6, 13)],
        );
        let m = engine.resolve_method(&InstructionRef::new("Account.debit", 9)).unwrap();
        assert_eq!(m.line, Some(13));
        assert!(m.parameter_names.contains("value"));
        assert!(!m.parameter_names.contains("this"));
        assert!(m.field_names.contains("balance"));
        assert!(engine.resolve_method(&InstructionRef::new("Nope.f", 0)).is_none());
    }

    #[test]
    fn test_current_condition_skips_concrete_choices() {
        let mut engine = ReplayEngine::new();
        assert_eq!(engine.current_condition(), None);
        engine.push_choice(Some("a".to_string()));
        engine.push_choice(None);
        assert_eq!(engine.current_condition().as_deref(), Some("a"));
        engine.push_choice(Some("b".to_string()));
        assert_eq!(engine.current_condition().as_deref(), Some("b"));
        assert!(engine.backtrack());
        assert!(engine.backtrack());
        assert!(engine.backtrack());
        assert!(!engine.backtrack());
    }

    #[test]
    fn test_concrete_engine_has_no_provider() {
        let mut engine = ReplayEngine::new();
        engine.set_symbolic(false);
        engine.push_choice(Some("x > 0".to_string()));
        assert!(engine.path_conditions().is_none());
    }

    #[test]
    fn test_replay_finishes_exactly_once() {
        let trace = Trace {
            description: None,
            events: vec![TraceEvent::Choice {
                condition: Some("x".to_string()),
            }],
        };
        let mut recorder = Recorder::default();
        let summary = replay(&trace, &mut recorder);
        assert_eq!(recorder.finished, 1);
        assert_eq!(summary.choices, 1);

        let trace = Trace {
            description: None,
            events: vec![
                TraceEvent::Finished,
                TraceEvent::Exception {
                    thrown: None,
                    method: None,
                    offset: 0,
                },
                TraceEvent::Finished,
            ],
        };
        let mut recorder = Recorder::default();
        let summary = replay(&trace, &mut recorder);
        assert_eq!(recorder.finished, 1);
        assert_eq!(summary.exceptions, 0);
        assert_eq!(summary.events, 1);
    }

    #[test]
    fn test_replay_tracks_choice_stack() {
        let trace = Trace {
            description: None,
            events: vec![
                TraceEvent::Choice {
                    condition: Some("c1".to_string()),
                },
                TraceEvent::Exception {
                    thrown: None,
                    method: None,
                    offset: 0,
                },
                TraceEvent::Backtrack,
                TraceEvent::Exception {
                    thrown: None,
                    method: None,
                    offset: 0,
                },
                TraceEvent::Finished,
            ],
        };
        let mut recorder = Recorder::default();
        replay(&trace, &mut recorder);
        assert_eq!(recorder.choices, vec![Some("c1".to_string())]);
        assert_eq!(recorder.conditions, vec![Some("c1".to_string()), None]);
    }
}
