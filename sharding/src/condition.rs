// Copyright 2022 SphereEx Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::cmp::Ordering;

use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Column {
    pub name: String,
    pub table_name: String,
}

impl Column {
    pub fn new<N: Into<String>, T: Into<String>>(name: N, table_name: T) -> Self {
        Column { name: name.into(), table_name: table_name.into() }
    }

    // An unqualified column is attributed to every table of the statement.
    pub(crate) fn belongs_to(&self, tables: &[&str]) -> bool {
        self.table_name.is_empty() || tables.iter().any(|t| t.eq_ignore_ascii_case(&self.table_name))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShardingOperator {
    Eq,
    In,
    Between,
}

/// A sharding predicate extracted from the statement and its bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ShardingCondition {
    pub column: Column,
    pub operator: ShardingOperator,
    pub values: Vec<Value>,
}

impl ShardingCondition {
    pub fn eq<V: Into<Value>>(column: Column, value: V) -> Self {
        ShardingCondition { column, operator: ShardingOperator::Eq, values: vec![value.into()] }
    }

    pub fn in_list(column: Column, values: Vec<Value>) -> Self {
        ShardingCondition { column, operator: ShardingOperator::In, values }
    }

    pub fn between<L: Into<Value>, U: Into<Value>>(column: Column, lower: L, upper: U) -> Self {
        ShardingCondition {
            column,
            operator: ShardingOperator::Between,
            values: vec![lower.into(), upper.into()],
        }
    }

    pub fn is_always_false(&self) -> bool {
        match self.operator {
            ShardingOperator::Eq | ShardingOperator::In => self.values.is_empty(),
            ShardingOperator::Between => {
                self.values.len() != 2 || self.range().map_or(true, |r| r.is_empty())
            }
        }
    }

    fn range(&self) -> Option<ValueRange> {
        match self.values.as_slice() {
            [lower, upper] => Some(ValueRange::closed(lower.clone(), upper.clone())),
            _ => None,
        }
    }
}

/// Inclusive range, unbounded on a missing side.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueRange {
    pub lower: Option<Value>,
    pub upper: Option<Value>,
}

impl ValueRange {
    pub fn closed(lower: Value, upper: Value) -> Self {
        ValueRange { lower: Some(lower), upper: Some(upper) }
    }

    pub fn contains(&self, value: &Value) -> bool {
        let above = self
            .lower
            .as_ref()
            .map_or(true, |l| matches!(value.partial_cmp(l), Some(Ordering::Greater | Ordering::Equal)));
        let below = self
            .upper
            .as_ref()
            .map_or(true, |u| matches!(value.partial_cmp(u), Some(Ordering::Less | Ordering::Equal)));
        above && below
    }

    pub fn is_empty(&self) -> bool {
        match (&self.lower, &self.upper) {
            (Some(l), Some(u)) => matches!(l.partial_cmp(u), Some(Ordering::Greater)),
            _ => false,
        }
    }

    fn intersect(self, other: ValueRange) -> ValueRange {
        let lower = match (self.lower, other.lower) {
            (Some(a), Some(b)) => Some(if b > a { b } else { a }),
            (a, b) => a.or(b),
        };
        let upper = match (self.upper, other.upper) {
            (Some(a), Some(b)) => Some(if b < a { b } else { a }),
            (a, b) => a.or(b),
        };
        ValueRange { lower, upper }
    }
}

/// Value set of one column after merging every condition on it.
#[derive(Debug, Clone, PartialEq)]
pub enum ShardingValue {
    List(Vec<Value>),
    Range(ValueRange),
}

impl ShardingValue {
    pub fn is_empty(&self) -> bool {
        match self {
            ShardingValue::List(values) => values.is_empty(),
            ShardingValue::Range(range) => range.is_empty(),
        }
    }
}

/// Merges the given conditions, which the caller has already narrowed to one column.
/// Lists intersect with each other and are then filtered by every range.
pub fn merge_sharding_value<'a, I>(conditions: I) -> Option<ShardingValue>
where
    I: IntoIterator<Item = &'a ShardingCondition>,
{
    let mut list: Option<Vec<Value>> = None;
    let mut range: Option<ValueRange> = None;

    for each in conditions {
        match each.operator {
            ShardingOperator::Eq | ShardingOperator::In => {
                list = Some(match list {
                    None => {
                        let mut values: Vec<Value> = Vec::with_capacity(each.values.len());
                        for v in each.values.iter() {
                            if !values.contains(v) {
                                values.push(v.clone());
                            }
                        }
                        values
                    }
                    Some(prev) => prev.into_iter().filter(|v| each.values.contains(v)).collect(),
                });
            }
            ShardingOperator::Between => {
                let r = ValueRange {
                    lower: each.values.get(0).cloned(),
                    upper: each.values.get(1).cloned(),
                };
                range = Some(match range {
                    None => r,
                    Some(prev) => prev.intersect(r),
                });
            }
        }
    }

    match (list, range) {
        (Some(list), Some(range)) => {
            Some(ShardingValue::List(list.into_iter().filter(|v| range.contains(v)).collect()))
        }
        (Some(list), None) => Some(ShardingValue::List(list)),
        (None, Some(range)) => Some(ShardingValue::Range(range)),
        (None, None) => None,
    }
}

/// AND-connected conditions. One group per OR branch, or one per row of an INSERT.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShardingConditionGroup {
    pub conditions: Vec<ShardingCondition>,
}

impl ShardingConditionGroup {
    pub fn new(conditions: Vec<ShardingCondition>) -> Self {
        ShardingConditionGroup { conditions }
    }

    pub fn is_always_false(&self) -> bool {
        if self.conditions.iter().any(|c| c.is_always_false()) {
            return true;
        }

        let mut seen: Vec<&Column> = vec![];
        for each in self.conditions.iter() {
            if seen.iter().any(|c| same_column(c, &each.column)) {
                continue;
            }
            seen.push(&each.column);

            let merged = merge_sharding_value(
                self.conditions.iter().filter(|c| same_column(&c.column, &each.column)),
            );
            if merged.map_or(false, |v| v.is_empty()) {
                return true;
            }
        }

        false
    }

    /// Like [`is_always_false`](Self::is_always_false), but conditions of `tables` sharing a
    /// column name merge into one value, the way bound tables are routed together.
    pub fn is_always_false_for(&self, tables: &[&str]) -> bool {
        let conditions = self.for_tables(tables);
        if conditions.iter().any(|c| c.is_always_false()) {
            return true;
        }

        let mut seen: Vec<&str> = vec![];
        for each in conditions.iter() {
            let name = each.column.name.as_str();
            if seen.iter().any(|s| s.eq_ignore_ascii_case(name)) {
                continue;
            }
            seen.push(name);

            let merged =
                merge_sharding_value(conditions.iter().filter(|c| c.column.name.eq_ignore_ascii_case(name)));
            if merged.map_or(false, |v| v.is_empty()) {
                return true;
            }
        }

        false
    }

    pub(crate) fn for_tables(&self, tables: &[&str]) -> Vec<ShardingCondition> {
        self.conditions.iter().filter(|c| c.column.belongs_to(tables)).cloned().collect()
    }
}

fn same_column(a: &Column, b: &Column) -> bool {
    a.name.eq_ignore_ascii_case(&b.name) && a.table_name.eq_ignore_ascii_case(&b.table_name)
}

/// OR-connected condition groups handed over by the condition optimizer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShardingConditions {
    pub groups: Vec<ShardingConditionGroup>,
    always_false: bool,
}

impl ShardingConditions {
    pub fn new(groups: Vec<ShardingConditionGroup>) -> Self {
        ShardingConditions { groups, always_false: false }
    }

    pub fn single(conditions: Vec<ShardingCondition>) -> Self {
        ShardingConditions::new(vec![ShardingConditionGroup::new(conditions)])
    }

    /// The optimizer proved the WHERE clause can not match any row.
    pub fn always_false() -> Self {
        ShardingConditions { groups: vec![], always_false: true }
    }

    pub fn is_always_false(&self) -> bool {
        self.always_false
            || (!self.groups.is_empty() && self.groups.iter().all(|g| g.is_always_false()))
    }

    /// Every group is always false once routed across `tables` as one binding group.
    pub fn is_always_false_for(&self, tables: &[&str]) -> bool {
        self.always_false
            || (!self.groups.is_empty() && self.groups.iter().all(|g| g.is_always_false_for(tables)))
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
