//! Cardinality rules: how many raw values a field may legally receive.

use alloc::string::String;
use core::fmt;

/// Why a list of raw values failed a cardinality rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CardinalityError {
    /// The parameter was not supplied at all.
    ParamIsNull,
    /// The parameter was supplied with zero values.
    NoItems,
    /// The first value is the empty string.
    EmptyValue,
    /// Several values were supplied where only one is allowed.
    MoreThanOneItem,
}

impl fmt::Display for CardinalityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CardinalityError::ParamIsNull => "parameter is null",
            CardinalityError::NoItems => "parameter does not have one item",
            CardinalityError::EmptyValue => "parameter had no value",
            CardinalityError::MoreThanOneItem => "parameter has more than one item",
        })
    }
}

impl core::error::Error for CardinalityError {}

/// A predicate over the raw values bound to one field.
///
/// `values` is `None` when the parameter is absent, which is not the same
/// thing as an empty list.
pub trait CardinalityRule {
    /// Check `values`, allowing several of them when `allow_many` is set.
    fn run(&self, values: Option<&[String]>, allow_many: bool) -> Result<(), CardinalityError>;
}

/// Rule for required fields: the parameter must carry a non-empty value.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequiredRule;

impl CardinalityRule for RequiredRule {
    fn run(&self, values: Option<&[String]>, allow_many: bool) -> Result<(), CardinalityError> {
        let values = values.ok_or(CardinalityError::ParamIsNull)?;
        let first = values.first().ok_or(CardinalityError::NoItems)?;
        check_values(first, values.len(), allow_many)
    }
}

/// Rule for optional fields: absence is fine, a present value must be well formed.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptionalRule;

impl CardinalityRule for OptionalRule {
    fn run(&self, values: Option<&[String]>, allow_many: bool) -> Result<(), CardinalityError> {
        match values.and_then(|values| values.first().map(|first| (first, values.len()))) {
            Some((first, len)) => check_values(first, len, allow_many),
            None => Ok(()),
        }
    }
}

fn check_values(first: &str, len: usize, allow_many: bool) -> Result<(), CardinalityError> {
    if first.is_empty() {
        return Err(CardinalityError::EmptyValue);
    }
    if !allow_many && len > 1 {
        return Err(CardinalityError::MoreThanOneItem);
    }
    Ok(())
}

/// The rule that applies to a field with the given requiredness.
pub fn rule_for(required: bool) -> &'static dyn CardinalityRule {
    if required {
        &RequiredRule as &dyn CardinalityRule
    } else {
        &OptionalRule
    }
}
