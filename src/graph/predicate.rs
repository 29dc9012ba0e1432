//! Compiled field predicates.
//!
//! A [`FieldPredicate`] tests one positional field of an event against a
//! constant operand. Operand type and field type must agree at runtime; a
//! mismatch, like a position past the end of the field list, makes the
//! predicate false rather than an error. String comparisons are exact and
//! case-sensitive; integer operands compare against both 32-bit and 64-bit
//! fields, widened to i64.

use regex::Regex;

use crate::event::{Event, FieldValue};

/// Compiled predicate operator, specialized by operand type.
#[derive(Debug, Clone)]
pub enum PredicateOp {
    StrEq(String),
    StrNeq(String),
    StrContains(String),
    StrStartsWith(String),
    StrEndsWith(String),
    StrRegex(Regex),
    IntEq(i64),
    IntNeq(i64),
    IntLt(i64),
    IntGt(i64),
    IntLe(i64),
    IntGe(i64),
    FloatEq(f64),
    FloatLt(f64),
    FloatGt(f64),
    FloatLe(f64),
    FloatGe(f64),
    BoolEq(bool),
}

impl PredicateOp {
    /// Tests the operator against a single field value.
    pub fn matches_value(&self, value: &FieldValue) -> bool {
        match (self, value) {
            (PredicateOp::StrEq(want), FieldValue::Str(have)) => have == want,
            (PredicateOp::StrNeq(want), FieldValue::Str(have)) => have != want,
            (PredicateOp::StrContains(want), FieldValue::Str(have)) => {
                have.contains(want.as_str())
            }
            (PredicateOp::StrStartsWith(want), FieldValue::Str(have)) => {
                have.starts_with(want.as_str())
            }
            (PredicateOp::StrEndsWith(want), FieldValue::Str(have)) => {
                have.ends_with(want.as_str())
            }
            (PredicateOp::StrRegex(re), FieldValue::Str(have)) => re.is_match(have),
            (PredicateOp::IntEq(want), _) => int_value(value).is_some_and(|v| v == *want),
            (PredicateOp::IntNeq(want), _) => int_value(value).is_some_and(|v| v != *want),
            (PredicateOp::IntLt(want), _) => int_value(value).is_some_and(|v| v < *want),
            (PredicateOp::IntGt(want), _) => int_value(value).is_some_and(|v| v > *want),
            (PredicateOp::IntLe(want), _) => int_value(value).is_some_and(|v| v <= *want),
            (PredicateOp::IntGe(want), _) => int_value(value).is_some_and(|v| v >= *want),
            (PredicateOp::FloatEq(want), FieldValue::Float(have)) => have == want,
            (PredicateOp::FloatLt(want), FieldValue::Float(have)) => have < want,
            (PredicateOp::FloatGt(want), FieldValue::Float(have)) => have > want,
            (PredicateOp::FloatLe(want), FieldValue::Float(have)) => have <= want,
            (PredicateOp::FloatGe(want), FieldValue::Float(have)) => have >= want,
            (PredicateOp::BoolEq(want), FieldValue::Bool(have)) => have == want,
            _ => false,
        }
    }
}

/// One compiled predicate bound to a field position.
#[derive(Debug, Clone)]
pub struct FieldPredicate {
    pub position: usize,
    pub op: PredicateOp,
}

impl FieldPredicate {
    pub fn new(position: usize, op: PredicateOp) -> Self {
        Self { position, op }
    }

    /// Tests the predicate against the event.
    ///
    /// A position past the end of the event's field list is false.
    pub fn matches(&self, event: &Event) -> bool {
        match event.field(self.position) {
            Some(value) => self.op.matches_value(value),
            None => false,
        }
    }
}

/// Both integer widths compare through i64.
fn int_value(value: &FieldValue) -> Option<i64> {
    match value {
        FieldValue::Int32(v) => Some(i64::from(*v)),
        FieldValue::Int64(v) => Some(*v),
        _ => None,
    }
}
