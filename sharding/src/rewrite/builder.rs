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

use crate::{route::TableUnit, value::Value};

#[derive(Debug, Clone, PartialEq)]
enum SqlSegment {
    Literal(String),
    // token text as written, quotes included
    Table { logic_table: String, text: String },
    InsertValues,
}

/// Rewritten SQL split at the places that differ between route units.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlBuilder {
    segments: Vec<SqlSegment>,
    parameters: Vec<Value>,
}

impl SqlBuilder {
    pub fn new(parameters: Vec<Value>) -> Self {
        SqlBuilder { segments: vec![], parameters }
    }

    pub fn append_literal(&mut self, literal: &str) {
        if literal.is_empty() {
            return;
        }
        match self.segments.last_mut() {
            Some(SqlSegment::Literal(last)) => last.push_str(literal),
            _ => self.segments.push(SqlSegment::Literal(literal.to_string())),
        }
    }

    pub fn append_table(&mut self, logic_table: &str, text: &str) {
        self.segments.push(SqlSegment::Table { logic_table: logic_table.to_string(), text: text.to_string() });
    }

    pub fn append_insert_values(&mut self) {
        self.segments.push(SqlSegment::InsertValues);
    }

    pub fn has_insert_values(&self) -> bool {
        self.segments.iter().any(|s| *s == SqlSegment::InsertValues)
    }

    pub fn parameters(&self) -> &[Value] {
        &self.parameters
    }

    /// Renders the SQL of one unit. Logic tables without an actual table in `unit` keep their
    /// text.
    pub fn to_sql(&self, unit: Option<&TableUnit>, insert_values: &str) -> String {
        let mut sql = String::new();
        for segment in self.segments.iter() {
            match segment {
                SqlSegment::Literal(literal) => sql.push_str(literal),
                SqlSegment::Table { logic_table, text } => {
                    match unit.and_then(|u| u.find_actual_table(logic_table)) {
                        Some(actual) => sql.push_str(&change_table(text, actual)),
                        None => sql.push_str(text),
                    }
                }
                SqlSegment::InsertValues => sql.push_str(insert_values),
            }
        }
        sql
    }
}

fn change_table(text: &str, actual: &str) -> String {
    let mut target = String::with_capacity(actual.len() + 2);
    match text.chars().next() {
        Some(quote) if (quote == '`' || quote == '"') && text.len() > 1 && text.ends_with(quote) => {
            target.push(quote);
            target.push_str(actual);
            target.push(quote);
        }
        _ => target.push_str(actual),
    }
    target
}
