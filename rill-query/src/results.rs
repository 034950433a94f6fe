//! Query results and the results-handler interface
//!
//! A [`QueryResult`] is either a solution sequence (SELECT, and the
//! solutions feeding CONSTRUCT/DESCRIBE) or a boolean (ASK). Consumers
//! receive it through [`ResultsHandler`] callbacks; every callback may stop
//! the stream by returning [`Flow::Stop`].

use crate::multiset::{Multiset, Solution, SolutionSet};
use crate::var::Var;

/// Continue/stop signal returned by handler callbacks
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

impl Flow {
    pub fn is_stop(self) -> bool {
        self == Flow::Stop
    }
}

/// Callback interface for result consumers
pub trait ResultsHandler {
    fn start(&mut self) -> Flow {
        Flow::Continue
    }

    /// Called once per declared variable, in projection order, before any
    /// solution
    fn handle_variable(&mut self, _var: &Var) -> Flow {
        Flow::Continue
    }

    fn handle_solution(&mut self, solution: &Solution) -> Flow;

    fn handle_boolean(&mut self, _value: bool) -> Flow {
        Flow::Continue
    }

    /// Always called, also after a stop
    fn end(&mut self, _stopped: bool) {}
}

/// Final result of a query
#[derive(Clone, Debug, PartialEq)]
pub enum QueryResult {
    Solutions(SolutionSet),
    Boolean(bool),
}

impl QueryResult {
    pub fn solutions(multiset: &Multiset) -> Self {
        QueryResult::Solutions(multiset.to_solution_set())
    }

    pub fn boolean(multiset: &Multiset) -> Self {
        QueryResult::Boolean(!multiset.is_empty())
    }

    pub fn as_solutions(&self) -> Option<&SolutionSet> {
        match self {
            QueryResult::Solutions(set) => Some(set),
            QueryResult::Boolean(_) => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            QueryResult::Boolean(b) => Some(*b),
            QueryResult::Solutions(_) => None,
        }
    }

    /// Feed the result to `handler`; returns false if the handler stopped
    /// early
    pub fn apply(&self, handler: &mut dyn ResultsHandler) -> bool {
        let stopped = self.drive(handler);
        handler.end(stopped);
        !stopped
    }

    fn drive(&self, handler: &mut dyn ResultsHandler) -> bool {
        if handler.start().is_stop() {
            return true;
        }
        match self {
            QueryResult::Boolean(value) => handler.handle_boolean(*value).is_stop(),
            QueryResult::Solutions(set) => {
                for var in set.vars() {
                    if handler.handle_variable(var).is_stop() {
                        return true;
                    }
                }
                set.rows().iter().any(|row| handler.handle_solution(row).is_stop())
            }
        }
    }
}

/// Handler collecting everything it is given, optionally up to a limit
#[derive(Debug, Default)]
pub struct CollectingHandler {
    pub vars: Vec<Var>,
    pub solutions: Vec<Solution>,
    pub boolean: Option<bool>,
    pub limit: Option<usize>,
    pub completed: bool,
}

impl CollectingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }
}

impl ResultsHandler for CollectingHandler {
    fn handle_variable(&mut self, var: &Var) -> Flow {
        self.vars.push(var.clone());
        Flow::Continue
    }

    fn handle_solution(&mut self, solution: &Solution) -> Flow {
        self.solutions.push(solution.clone());
        match self.limit {
            Some(limit) if self.solutions.len() >= limit => Flow::Stop,
            _ => Flow::Continue,
        }
    }

    fn handle_boolean(&mut self, value: bool) -> Flow {
        self.boolean = Some(value);
        Flow::Continue
    }

    fn end(&mut self, stopped: bool) {
        self.completed = !stopped;
    }
}
