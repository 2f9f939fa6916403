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

use super::{RoutingResult, RoutingTable, TableUnit};
use crate::{
    error::{Error, RouteError},
    rule::ShardingRule,
};

/// Exactly one target. The choice is deterministic: the first data source holding every table,
/// and the first actual table of each there.
pub(super) fn route(rule: &ShardingRule, logic_tables: &[String]) -> Result<RoutingResult, Error> {
    let mut table_rules = Vec::with_capacity(logic_tables.len());
    for logic_table in logic_tables.iter() {
        table_rules.push(rule.table_rule(logic_table)?);
    }

    let data_source = match table_rules.first() {
        None => rule.data_source_names().first(),
        Some(first) if table_rules.len() == 1 => {
            first.actual_data_nodes.first().map(|n| &n.data_source_name)
        }
        Some(_) => rule
            .data_source_names()
            .iter()
            .find(|ds| table_rules.iter().all(|r| !r.actual_table_names(ds).is_empty())),
    };
    let data_source = match data_source {
        Some(ds) => ds.clone(),
        None => return Err(RouteError::NoCommonDataSource(logic_tables.to_vec()).into()),
    };

    let mut routing_tables = vec![];
    for (logic_table, table_rule) in logic_tables.iter().zip(table_rules.iter()) {
        if let Some(actual) = table_rule.actual_table_names(&data_source).first() {
            routing_tables.push(RoutingTable::new(logic_table.as_str(), actual.as_str()));
        }
    }

    Ok(RoutingResult::new(vec![TableUnit::with_tables(data_source, routing_tables)]))
}
