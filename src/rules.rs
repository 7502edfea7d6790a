// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Filter seam used by [`ActivityDb::find`](crate::db::ActivityDb::find).
//!
//! The full query language lives outside this crate; the db only needs a
//! parser that turns filter strings into predicates. [`KeywordRules`] is the
//! built-in parser and understands:
//!
//! - `field=value` / `field:value` (equality, lists match on membership)
//! - `field>value`, `field>=value`, `field<value`, `field<=value` (numbers, or
//!   `YYYY-MM-DD` dates for time fields)
//! - `classifier:polar`, `service:polar`, `source:polar`
//! - a bare integer (activity id) or a bare word (classifier)

use chrono::NaiveDate;

use crate::error::{DbError, Result};
use crate::models::fields::{FieldDef, FieldRegistry};
use crate::models::Activity;

/// Predicate over activities.
pub trait ActivityFilter {
    fn matches(&self, activity: &Activity) -> bool;

    /// Keep only the matching activities, preserving order.
    fn filter<'a>(&self, activities: Vec<&'a Activity>) -> Vec<&'a Activity> {
        activities.into_iter().filter(|a| self.matches(a)).collect()
    }
}

/// Turns filter strings into predicates.
pub trait RuleParser {
    fn parse(&self, filters: &[&str]) -> Result<Vec<Box<dyn ActivityFilter>>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Eq,
    Gt,
    Ge,
    Lt,
    Le,
}

struct FieldRule {
    field: FieldDef,
    op: Op,
    operand: String,
}

impl FieldRule {
    fn numeric_operand(&self) -> Option<f64> {
        if let Ok(n) = self.operand.parse::<f64>() {
            return Some(n);
        }
        NaiveDate::parse_from_str(&self.operand, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc().timestamp() as f64)
    }
}

impl ActivityFilter for FieldRule {
    fn matches(&self, activity: &Activity) -> bool {
        let value = self.field.resolve(activity);
        if self.op == Op::Eq {
            return value.matches_str(&self.operand);
        }
        let (Some(lhs), Some(rhs)) = (value.as_f64(), self.numeric_operand()) else {
            return false;
        };
        match self.op {
            Op::Gt => lhs > rhs,
            Op::Ge => lhs >= rhs,
            Op::Lt => lhs < rhs,
            Op::Le => lhs <= rhs,
            Op::Eq => unreachable!(),
        }
    }
}

/// Built-in keyword/field filter parser.
#[derive(Debug, Clone, Default)]
pub struct KeywordRules {
    fields: FieldRegistry,
}

impl KeywordRules {
    pub fn new(fields: FieldRegistry) -> Self {
        Self { fields }
    }

    fn field_rule(&self, field: &str, op: Op, operand: &str) -> Result<Box<dyn ActivityFilter>> {
        let field = match field {
            "classifier" | "service" | "source" => "classifiers",
            other => other,
        };
        Ok(Box::new(FieldRule {
            field: self.fields.get(field)?.clone(),
            op,
            operand: operand.trim_matches('"').to_string(),
        }))
    }

    fn parse_one(&self, filter: &str) -> Result<Box<dyn ActivityFilter>> {
        let filter = filter.trim();
        if filter.is_empty() {
            return Err(DbError::InvalidFilter(filter.to_string()));
        }

        if let Some((field, op, operand)) = split_operator(filter) {
            if field.is_empty() {
                return Err(DbError::InvalidFilter(filter.to_string()));
            }
            return self.field_rule(field.trim(), op, operand.trim());
        }

        if filter.parse::<u64>().is_ok() {
            return self.field_rule("id", Op::Eq, filter);
        }
        self.field_rule("classifiers", Op::Eq, filter)
    }
}

/// Split at the leftmost operator; `>=` and `<=` win over `>` and `<`.
fn split_operator(filter: &str) -> Option<(&str, Op, &str)> {
    let start = filter.find(['=', ':', '<', '>'])?;
    let rest = &filter[start..];
    let (op, len) = if rest.starts_with(">=") {
        (Op::Ge, 2)
    } else if rest.starts_with("<=") {
        (Op::Le, 2)
    } else if rest.starts_with('>') {
        (Op::Gt, 1)
    } else if rest.starts_with('<') {
        (Op::Lt, 1)
    } else {
        (Op::Eq, 1)
    };
    Some((&filter[..start], op, &filter[start + len..]))
}

impl RuleParser for KeywordRules {
    fn parse(&self, filters: &[&str]) -> Result<Vec<Box<dyn ActivityFilter>>> {
        filters.iter().map(|f| self.parse_one(f)).collect()
    }
}
