use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::BuildError;
use crate::parser::pattern::{Pattern, PatternError};
use crate::parser::PipelineMetrics;

/// Initial state of every rule set: "expecting the head of a new record".
pub const START_STATE: &str = "start_state";

enum GroupAction {
    Append(String),
    FlushAndStartNew(String),
    Gap,
}

/// Declarative form of a [`ContinuationRule`], as written in log type
/// definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDef {
    pub state: String,
    pub next_state: String,
    pub regex: String,
    /// The rule fires when the line does NOT match `regex`.
    #[serde(default)]
    pub negate: bool,
}

impl RuleDef {
    pub fn new(state: &str, next_state: &str, regex: &str) -> Self {
        Self {
            state: state.to_string(),
            next_state: next_state.to_string(),
            regex: regex.to_string(),
            negate: false,
        }
    }

    pub fn negated(mut self) -> Self {
        self.negate = true;
        self
    }

    pub fn compile(&self) -> Result<ContinuationRule, PatternError> {
        Ok(ContinuationRule {
            state: self.state.clone(),
            next_state: self.next_state.clone(),
            pattern: Pattern::new(&self.regex)?,
            negate: self.negate,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ContinuationRule {
    pub state: String,
    pub next_state: String,
    pub pattern: Pattern,
    pub negate: bool,
}

impl ContinuationRule {
    pub fn matches(&self, line: &str) -> bool {
        self.pattern.is_match(line) != self.negate
    }
}

/// A validated graph of continuation rules.
///
/// A state may own several rules; they are tried in declaration order and
/// the first that fires decides the transition.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<ContinuationRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<ContinuationRule>) -> Result<Self, BuildError> {
        if !rules.iter().any(|r| r.state == START_STATE) {
            return Err(BuildError::InvalidRules(format!(
                "no rule for `{START_STATE}`"
            )));
        }

        for rule in &rules {
            if rule.state.is_empty() || rule.next_state.is_empty() {
                return Err(BuildError::InvalidRules("empty state name".to_string()));
            }
            let known = rule.next_state == START_STATE
                || rules.iter().any(|r| r.state == rule.next_state);
            if !known {
                return Err(BuildError::InvalidRules(format!(
                    "`{}` transitions to undeclared state `{}`",
                    rule.state, rule.next_state
                )));
            }
        }

        Ok(Self { rules })
    }

    /// Compile and validate the rules declared by `log_type`.
    pub fn from_defs(log_type: &str, defs: &[RuleDef]) -> Result<Self, BuildError> {
        let rules = defs
            .iter()
            .map(RuleDef::compile)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| BuildError::Pattern {
                log_type: log_type.to_string(),
                source,
            })?;
        Self::new(rules)
    }

    /// First rule of `state` that fires on `line`.
    fn fire(&self, state: &str, line: &str) -> Option<&ContinuationRule> {
        self.rules
            .iter()
            .filter(|r| r.state == state)
            .find(|r| r.matches(line))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// One or more physical lines joined into a single unit for parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalRecord {
    lines: Vec<String>,
    observed_at: DateTime<Utc>,
}

impl LogicalRecord {
    pub fn new(first: String, observed_at: DateTime<Utc>) -> Self {
        Self {
            lines: vec![first],
            observed_at,
        }
    }

    pub fn push(&mut self, line: String) {
        self.lines.push(line);
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn is_grouped(&self) -> bool {
        self.lines.len() > 1
    }

    /// When the first line of the record was seen.
    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }

    /// Lines joined with `\n`, ready for pattern matching.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Per-stream continuation state machine.
///
/// Holds the current state and the record being buffered. Lines must be
/// fed in arrival order; each call to [`process`](Self::process) returns
/// the records completed by that line (zero, one, or two when a timeout
/// flush and a gap coincide). A grouper without rules passes every line
/// through as its own record.
pub struct MultilineGrouper {
    rules: Option<Arc<RuleSet>>,
    state: String,
    pending: Option<LogicalRecord>,
    timeout: Duration,
    last_update: Option<Instant>,
    metrics: Option<Arc<PipelineMetrics>>,
}

impl MultilineGrouper {
    pub fn new(rules: Arc<RuleSet>, timeout: Duration) -> Self {
        Self {
            rules: Some(rules),
            state: START_STATE.to_string(),
            pending: None,
            timeout,
            last_update: None,
            metrics: None,
        }
    }

    pub fn passthrough() -> Self {
        Self {
            rules: None,
            state: START_STATE.to_string(),
            pending: None,
            timeout: Duration::ZERO,
            last_update: None,
            metrics: None,
        }
    }

    /// Count continuation gaps into `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<PipelineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn is_passthrough(&self) -> bool {
        self.rules.is_none()
    }

    pub fn process(&mut self, line: String, observed_at: DateTime<Utc>) -> Vec<LogicalRecord> {
        let Some(rules) = self.rules.clone() else {
            return vec![LogicalRecord::new(line, observed_at)];
        };

        let mut emit = Vec::new();

        if self.expired() {
            tracing::debug!(
                timeout_ms = self.timeout.as_millis() as u64,
                state = %self.state,
                "multiline: timeout expired on arrival, flushing pending record"
            );
            self.count(PipelineMetrics::record_timeout_flush);
            emit.extend(self.flush());
        }

        let action = if self.state != START_STATE && self.pending.is_some() {
            match rules.fire(&self.state, &line) {
                Some(rule) => GroupAction::Append(rule.next_state.clone()),
                None => match rules.fire(START_STATE, &line) {
                    Some(rule) => GroupAction::FlushAndStartNew(rule.next_state.clone()),
                    None => GroupAction::Gap,
                },
            }
        } else {
            match rules.fire(START_STATE, &line) {
                Some(rule) => GroupAction::FlushAndStartNew(rule.next_state.clone()),
                None => GroupAction::Gap,
            }
        };

        match action {
            GroupAction::Append(next) => {
                tracing::trace!(from = %self.state, to = %next, "multiline: continuation");
                if let Some(record) = self.pending.as_mut() {
                    record.push(line);
                }
                self.state = next;
                self.last_update = Some(Instant::now());
            }
            GroupAction::FlushAndStartNew(next) => {
                tracing::trace!(from = %self.state, to = %next, "multiline: record start");
                emit.extend(self.flush());
                self.start_new(line, observed_at);
                self.state = next;
            }
            GroupAction::Gap => {
                tracing::debug!(
                    state = %self.state,
                    "multiline: line matches no rule, starting a new record"
                );
                self.count(PipelineMetrics::record_continuation_gap);
                emit.extend(self.flush());
                self.start_new(line, observed_at);
            }
        }

        emit
    }

    /// Flush the pending record if no line has arrived within the timeout.
    /// Meant to be polled from an interval timer.
    pub fn check_timeout(&mut self) -> Option<LogicalRecord> {
        if self.expired() {
            tracing::debug!(
                state = %self.state,
                "multiline: proactive timeout flush"
            );
            self.count(PipelineMetrics::record_timeout_flush);
            return self.flush();
        }
        None
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    /// Emit whatever is buffered and go back to the start state.
    pub fn flush(&mut self) -> Option<LogicalRecord> {
        self.last_update = None;
        self.state = START_STATE.to_string();
        self.pending.take()
    }

    fn expired(&self) -> bool {
        match self.last_update {
            Some(last) => self.pending.is_some() && last.elapsed() > self.timeout,
            None => false,
        }
    }

    fn count(&self, record: fn(&PipelineMetrics)) {
        if let Some(metrics) = &self.metrics {
            record(metrics);
        }
    }

    fn start_new(&mut self, line: String, observed_at: DateTime<Utc>) {
        self.pending = Some(LogicalRecord::new(line, observed_at));
        self.last_update = Some(Instant::now());
    }
}
