//! Exception site collector.
//!
//! Listens to exception events during an exploration run, records one
//! [`ExceptionSite`] for every event raised under an active symbolic path
//! condition, and prints the report once the run finishes.
//!
//! Nothing in here fails back into the engine: unresolved provenance
//! degrades to `"unknown"` / `-1`, a missing path condition means the event
//! is skipped, and sink errors are logged.

use std::io::{self, Stdout, Write};
use tracing::{debug, info, trace, warn};

use crate::config::{self, ReportSettings};
use crate::engine::{
    EngineContext, MethodContext, ResolvedMethod, RunListener, ThreadContext, ThrownValue,
};
use crate::report::Report;
use crate::signature::signature_from_descriptor;
use crate::site::{ExceptionSite, LineNumber, UNKNOWN};

/// Run-scoped collector writing its report to `W`.
pub struct ExceptionSiteCollector<W: Write = Stdout> {
    report: Report,
    finished: bool,
    settings: ReportSettings,
    sink: W,
}

impl ExceptionSiteCollector<Stdout> {
    /// Collector printing to stdout with the process-wide report settings.
    pub fn new() -> Self {
        Self::with_sink(io::stdout(), config::get().report.clone())
    }
}

impl Default for ExceptionSiteCollector<Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> ExceptionSiteCollector<W> {
    pub fn with_sink(sink: W, settings: ReportSettings) -> Self {
        Self {
            report: Report::new(),
            finished: false,
            settings,
            sink,
        }
    }

    pub fn report(&self) -> &Report {
        &self.report
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn sink(&self) -> &W {
        &self.sink
    }

    pub fn into_parts(self) -> (Report, W) {
        (self.report, self.sink)
    }

    /// Record a site if the engine has an active symbolic path condition.
    pub fn on_exception_event(
        &mut self,
        engine: &dyn EngineContext,
        thread: &dyn ThreadContext,
        thrown: Option<&ThrownValue>,
    ) {
        if self.finished {
            warn!("exception event after run finished, ignoring");
            return;
        }

        let Some(source) = engine.path_conditions() else {
            trace!("no path condition provider, skipping exception event");
            return;
        };
        let Some(condition) = source.current_condition() else {
            trace!("no active path condition, skipping exception event");
            return;
        };
        if condition.trim().is_empty() {
            trace!("empty path condition, skipping exception event");
            return;
        }

        let thrown_name = thrown
            .map(|t| t.type_name.as_str())
            .filter(|name| !name.is_empty())
            .unwrap_or(UNKNOWN);

        let method = thread
            .current_instruction()
            .and_then(|insn| engine.resolve_method(&insn));
        let (signature, line) = match &method {
            Some(m) => (describe_method(m), LineNumber::from(m.line)),
            None => {
                debug!("throwing instruction has no method context");
                (UNKNOWN.to_string(), LineNumber::UNKNOWN)
            }
        };

        let context: Option<&dyn MethodContext> = if self.settings.qualify_fields {
            method.as_ref().map(|m| m as &dyn MethodContext)
        } else {
            None
        };

        let site = ExceptionSite::new(thrown_name, signature, line, condition, context);
        debug!(
            site = self.report.len(),
            exception = site.thrown_exception(),
            method = site.method_signature(),
            "recorded exception site: {}",
            site.condition_friendly()
        );
        self.report.push(site);
    }

    /// Print the report section to the sink. Only the first call emits.
    pub fn on_run_finished(&mut self) {
        if self.finished {
            debug!("run already finished, report not emitted again");
            return;
        }
        self.finished = true;
        info!("run finished with {} exception sites", self.report.len());

        if let Err(e) = self.emit() {
            warn!("failed to write exception condition report: {}", e);
        }
    }

    fn emit(&mut self) -> crate::error::Result<()> {
        let section = self.report.render_section(self.settings.pretty)?;
        self.sink.write_all(b"\n")?;
        self.sink.write_all(section.as_bytes())?;
        self.sink.flush()?;
        Ok(())
    }
}

/// Readable signature for a resolved method, `"unknown"` if its descriptor
/// cannot be parsed.
fn describe_method(method: &ResolvedMethod) -> String {
    match signature_from_descriptor(&method.class_name, &method.method_name, &method.descriptor) {
        Ok(sig) => sig,
        Err(e) => {
            warn!("cannot render signature of {}.{}: {}", method.class_name, method.method_name, e);
            UNKNOWN.to_string()
        }
    }
}

impl<W: Write> RunListener for ExceptionSiteCollector<W> {
    fn on_choice_point(&mut self, condition: Option<&str>) {
        trace!(symbolic = condition.is_some(), "choice point");
    }

    fn on_exception_thrown(
        &mut self,
        engine: &dyn EngineContext,
        thread: &dyn ThreadContext,
        thrown: Option<&ThrownValue>,
    ) {
        self.on_exception_event(engine, thread, thrown);
    }

    fn on_run_finished(&mut self) {
        ExceptionSiteCollector::<W>::on_run_finished(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{InstructionRef, PathConditionSource};
    use crate::report::BANNER_TITLE;

    struct FixedCondition(Option<String>);

    impl PathConditionSource for FixedCondition {
        fn current_condition(&self) -> Option<String> {
            self.0.clone()
        }
    }

    struct StubEngine {
        source: Option<FixedCondition>,
        method: Option<ResolvedMethod>,
    }

    impl EngineContext for StubEngine {
        fn path_conditions(&self) -> Option<&dyn PathConditionSource> {
            self.source.as_ref().map(|s| s as &dyn PathConditionSource)
        }

        fn resolve_method(&self, _insn: &InstructionRef) -> Option<ResolvedMethod> {
            self.method.clone()
        }
    }

    struct StubThread(Option<InstructionRef>);

    impl ThreadContext for StubThread {
        fn current_instruction(&self) -> Option<InstructionRef> {
            self.0.clone()
        }
    }

    fn debit() -> ResolvedMethod {
        ResolvedMethod {
            class_name: "br.ufpe.cin.witup.jpf.Account".to_string(),
            method_name: "debit".to_string(),
            descriptor: "(D)V".to_string(),
            line: Some(13),
            field_names: ["balance".to_string()].into_iter().collect(),
            parameter_names: ["value".to_string()].into_iter().collect(),
        }
    }

    fn symbolic(condition: &str) -> StubEngine {
        StubEngine {
            source: Some(FixedCondition(Some(condition.to_string()))),
            method: Some(debit()),
        }
    }

    fn collector() -> ExceptionSiteCollector<Vec<u8>> {
        ExceptionSiteCollector::with_sink(Vec::new(), ReportSettings::default())
    }

    fn at_debit() -> StubThread {
        StubThread(Some(InstructionRef::new("Account.debit", 7)))
    }

    fn runtime_exception() -> ThrownValue {
        ThrownValue::new("java.lang.RuntimeException")
    }

    #[test]
    fn test_records_symbolic_exception() {
        let mut c = collector();
        let engine = symbolic("constraint # = 1\nvalue_2_SYMREAL > balance_1_SYMREAL");
        c.on_exception_event(&engine, &at_debit(), Some(&runtime_exception()));

        assert_eq!(c.report().len(), 1);
        let site = &c.report().sites()[0];
        assert_eq!(site.thrown_exception(), "java.lang.RuntimeException");
        assert_eq!(site.method_signature(), "Account.debit(double)");
        assert_eq!(site.line_number().get(), Some(13));
        assert_eq!(site.condition_friendly(), "value > this.balance");
    }

    #[test]
    fn test_no_provider_no_record() {
        let mut c = collector();
        let engine = StubEngine {
            source: None,
            method: Some(debit()),
        };
        c.on_exception_event(&engine, &at_debit(), Some(&runtime_exception()));
        assert!(c.report().is_empty());
    }

    #[test]
    fn test_no_active_condition_no_record() {
        let mut c = collector();
        let engine = StubEngine {
            source: Some(FixedCondition(None)),
            method: Some(debit()),
        };
        c.on_exception_event(&engine, &at_debit(), Some(&runtime_exception()));
        assert!(c.report().is_empty());
    }

    #[test]
    fn test_empty_condition_no_record() {
        let mut c = collector();
        for text in ["", "   \n"] {
            c.on_exception_event(&symbolic(text), &at_debit(), Some(&runtime_exception()));
        }
        assert!(c.report().is_empty());
    }

    #[test]
    fn test_missing_provenance_degrades_to_sentinels() {
        let mut c = collector();
        let engine = StubEngine {
            source: Some(FixedCondition(Some("x_1_SYMINT > CONST_0".to_string()))),
            method: None,
        };
        c.on_exception_event(&engine, &StubThread(None), None);

        let site = &c.report().sites()[0];
        assert_eq!(site.thrown_exception(), UNKNOWN);
        assert_eq!(site.method_signature(), UNKNOWN);
        assert_eq!(site.line_number(), LineNumber::UNKNOWN);
        assert_eq!(site.condition_friendly(), "x > 0");
    }

    #[test]
    fn test_bad_descriptor_degrades_signature_only() {
        let mut c = collector();
        let mut method = debit();
        method.descriptor = "(Q)V".to_string();
        let engine = StubEngine {
            source: Some(FixedCondition(Some("value_2_SYMREAL > balance_1_SYMREAL".to_string()))),
            method: Some(method),
        };
        c.on_exception_event(&engine, &at_debit(), Some(&runtime_exception()));

        let site = &c.report().sites()[0];
        assert_eq!(site.method_signature(), UNKNOWN);
        assert_eq!(site.line_number().get(), Some(13));
        assert_eq!(site.condition_friendly(), "value > this.balance");
    }

    #[test]
    fn test_qualification_can_be_disabled() {
        let settings = ReportSettings {
            pretty: false,
            qualify_fields: false,
        };
        let mut c = ExceptionSiteCollector::with_sink(Vec::new(), settings);
        let engine = symbolic("value_2_SYMREAL > balance_1_SYMREAL");
        c.on_exception_event(&engine, &at_debit(), Some(&runtime_exception()));
        assert_eq!(c.report().sites()[0].condition_friendly(), "value > balance");
    }

    #[test]
    fn test_run_finished_emits_once() {
        let mut c = collector();
        let engine = symbolic("value_2_SYMREAL > balance_1_SYMREAL");
        c.on_exception_event(&engine, &at_debit(), Some(&runtime_exception()));
        c.on_run_finished();
        c.on_run_finished();

        let out = String::from_utf8(c.sink().clone()).unwrap();
        assert_eq!(out.matches(BANNER_TITLE).count(), 1);
        let report = Report::from_section(&out).unwrap();
        assert_eq!(&report, c.report());
    }

    #[test]
    fn test_events_after_finish_ignored() {
        let mut c = collector();
        c.on_run_finished();
        c.on_exception_event(&symbolic("x_1_SYMINT > 0"), &at_debit(), None);
        assert!(c.report().is_empty());
        assert!(c.is_finished());
    }

    #[test]
    fn test_empty_run_renders_empty_array() {
        let mut c = collector();
        c.on_run_finished();
        let out = String::from_utf8(c.sink().clone()).unwrap();
        assert!(out.contains(&format!("{}\n[]\n", BANNER_TITLE)));
    }

    #[test]
    fn test_listener_seam_delegates() {
        let mut c = collector();
        {
            let listener: &mut dyn RunListener = &mut c;
            listener.on_choice_point(Some("x_1_SYMINT > 0"));
            listener.on_exception_thrown(&symbolic("x_1_SYMINT > 0"), &at_debit(), None);
            listener.on_run_finished();
        }
        assert_eq!(c.report().len(), 1);
        assert!(c.is_finished());
    }
}
