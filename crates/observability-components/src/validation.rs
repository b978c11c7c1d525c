//! Aggregated validation of component configuration.
//!
//! Configuration problems are user errors, not programming errors, so they are
//! never returned as an [`Err`]. Every rule of a component runs and every
//! problem ends up in a single [`ValidationResult`], in the order the rules
//! were declared.

use std::{fmt::Display, str::FromStr};

use crate::{config::Resources, quantity::Quantity};

/// The outcome of validating a component's configuration.
///
/// ```
/// # use observability_components::validation::Validator;
/// let mut validator = Validator::new("pixie");
/// validator.require("", "missing cluster uuid");
/// let result = validator.finish();
///
/// assert!(!result.is_valid());
/// assert_eq!(result.message(), "pixie: missing cluster uuid");
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ValidationResult {
    component: String,
    problems: Vec<String>,
}

impl ValidationResult {
    /// A result without problems.
    pub fn valid(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            problems: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    /// The individual problems, without the component prefix.
    pub fn problems(&self) -> &[String] {
        &self.problems
    }

    /// Renders the problems prefixed with the component name.
    ///
    /// A single problem is rendered as is, several problems as a bracketed,
    /// comma separated list. Valid results render as an empty string.
    pub fn message(&self) -> String {
        match self.problems.as_slice() {
            [] => String::new(),
            [problem] => format!("{component}: {problem}", component = self.component),
            problems => format!(
                "{component}: [{problems}]",
                component = self.component,
                problems = problems.join(", ")
            ),
        }
    }
}

impl Display for ValidationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message())
    }
}

/// Accumulates problems for one component. Call [`Validator::finish`] once
/// all rules ran.
#[derive(Debug)]
pub struct Validator {
    result: ValidationResult,
}

impl Validator {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            result: ValidationResult::valid(component),
        }
    }

    /// Records `problem` unconditionally.
    pub fn problem(&mut self, problem: impl Into<String>) -> &mut Self {
        self.result.problems.push(problem.into());
        self
    }

    /// Records `problem` if `condition` does not hold.
    pub fn check(&mut self, condition: bool, problem: impl Into<String>) -> &mut Self {
        if !condition {
            self.problem(problem);
        }
        self
    }

    /// Records `problem` if `value` is empty or whitespace only.
    pub fn require(&mut self, value: &str, problem: impl Into<String>) -> &mut Self {
        self.check(!value.trim().is_empty(), problem)
    }

    /// Records a problem if `value` contains control characters, e.g. a
    /// newline. `field` names the value in the message.
    pub fn single_line(&mut self, value: &str, field: &str) -> &mut Self {
        self.check(
            !value.chars().any(char::is_control),
            format!("invalid {field}: must not contain control characters"),
        )
    }

    /// Requires both the memory and the cpu limit of `resources` to be set.
    ///
    /// Every missing field is its own problem, `path` names the container in
    /// messages, e.g. `vizier-pem` produces
    /// `invalid vizier-pem.resources.limits.memory must be set`.
    pub fn require_limits(&mut self, resources: &Resources, path: &str) -> &mut Self {
        self.require(
            &resources.limits.memory,
            format!("invalid {path}.resources.limits.memory must be set"),
        )
        .require(
            &resources.limits.cpu,
            format!("invalid {path}.resources.limits.cpu must be set"),
        )
    }

    /// Checks that every set quantity is well-formed and that requests don't
    /// exceed their limits.
    pub fn quantities(&mut self, resources: &Resources, path: &str) -> &mut Self {
        let parse = |kind: &str, name: &str, value: &str, validator: &mut Self| {
            if value.is_empty() {
                return None;
            }
            match Quantity::from_str(value) {
                Ok(quantity) => Some(quantity),
                Err(_) => {
                    validator.problem(format!(
                        "invalid {path}.resources.{kind}.{name}: '{value}' is not a valid quantity"
                    ));
                    None
                }
            }
        };

        let requests = resources
            .requests
            .named_values()
            .map(|(name, value)| (name, value, parse("requests", name, value, self)));
        let limits = resources
            .limits
            .named_values()
            .map(|(name, value)| parse("limits", name, value, self));

        for ((name, value, request), limit) in requests.into_iter().zip(limits) {
            if let (Some(request), Some(limit)) = (request, limit) {
                self.check(
                    request <= limit,
                    format!(
                        "invalid {path}.resources.requests.{name}: '{value}' must be less than or equal to {name} limit"
                    ),
                );
            }
        }

        self
    }

    pub fn finish(self) -> ValidationResult {
        self.result
    }
}
