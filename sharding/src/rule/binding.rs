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

use super::TableRule;
use crate::error::{ConfigError, Error};

/// Logic tables sharded identically. The i-th actual table of a data source in one member
/// lives beside the i-th actual table of that data source in every other member.
#[derive(Debug, Clone)]
pub struct BindingTableRule {
    pub table_rules: Vec<TableRule>,
}

impl BindingTableRule {
    pub fn new(table_rules: Vec<TableRule>) -> Result<Self, Error> {
        if let Some((primary, members)) = table_rules.split_first() {
            for member in members {
                check_symmetric(primary, member)?;
            }
        }
        Ok(BindingTableRule { table_rules })
    }

    pub fn primary(&self) -> Option<&TableRule> {
        self.table_rules.first()
    }

    pub fn has_logic_table(&self, logic_table: &str) -> bool {
        self.table_rules.iter().any(|r| r.logic_table.eq_ignore_ascii_case(logic_table))
    }

    pub fn logic_tables(&self) -> Vec<&str> {
        self.table_rules.iter().map(|r| r.logic_table.as_str()).collect()
    }

    fn table_rule(&self, logic_table: &str) -> Option<&TableRule> {
        self.table_rules.iter().find(|r| r.logic_table.eq_ignore_ascii_case(logic_table))
    }

    /// Actual table of `logic_table` aligned with `other_actual_table` of `other_logic_table`.
    pub fn binding_actual_table(
        &self,
        data_source: &str,
        logic_table: &str,
        other_logic_table: &str,
        other_actual_table: &str,
    ) -> Result<String, Error> {
        let asymmetric = |expected: usize, actual: usize| -> Error {
            ConfigError::AsymmetricBindingTables {
                primary: other_logic_table.to_string(),
                member: logic_table.to_string(),
                data_source: data_source.to_string(),
                expected,
                actual,
            }
            .into()
        };

        let other = self
            .table_rule(other_logic_table)
            .ok_or_else(|| ConfigError::BindingTableNotFound(other_logic_table.to_string()))?;
        let member = self
            .table_rule(logic_table)
            .ok_or_else(|| ConfigError::BindingTableNotFound(logic_table.to_string()))?;

        let other_tables = other.actual_table_names(data_source);
        let index = other
            .find_actual_table_index(data_source, other_actual_table)
            .ok_or_else(|| asymmetric(other_tables.len(), 0))?;
        let member_tables = member.actual_table_names(data_source);

        member_tables.get(index).cloned().ok_or_else(|| asymmetric(other_tables.len(), member_tables.len()))
    }
}

fn check_symmetric(primary: &TableRule, member: &TableRule) -> Result<(), Error> {
    let mut data_sources = primary.data_source_names();
    for ds in member.data_source_names() {
        if !data_sources.contains(&ds) {
            data_sources.push(ds);
        }
    }

    for ds in data_sources {
        let expected = primary.actual_table_names(&ds).len();
        let actual = member.actual_table_names(&ds).len();
        if expected != actual {
            return Err(ConfigError::AsymmetricBindingTables {
                primary: primary.logic_table.clone(),
                member: member.logic_table.clone(),
                data_source: ds,
                expected,
                actual,
            }
            .into());
        }
    }
    Ok(())
}
