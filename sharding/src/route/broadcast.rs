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
use crate::{error::Error, rule::ShardingRule};

pub(super) fn database_broadcast(rule: &ShardingRule) -> RoutingResult {
    RoutingResult::new(rule.data_source_names().iter().map(|ds| TableUnit::new(ds.as_str())).collect())
}

/// Every actual table of every logic table. Without tables it falls back to one unit per data
/// source.
pub(super) fn table_broadcast(rule: &ShardingRule, logic_tables: &[String]) -> Result<RoutingResult, Error> {
    if logic_tables.is_empty() {
        return Ok(database_broadcast(rule));
    }

    let mut table_units = vec![];
    for logic_table in logic_tables.iter() {
        let table_rule = rule.table_rule(logic_table)?;
        for node in table_rule.actual_data_nodes.iter() {
            table_units.push(TableUnit::with_tables(
                node.data_source_name.as_str(),
                vec![RoutingTable::new(logic_table.as_str(), node.table_name.as_str())],
            ));
        }
    }
    Ok(RoutingResult::new(table_units))
}

/// One unit per physical instance, keeping the first data source of each.
pub(super) fn instance_broadcast(rule: &ShardingRule) -> RoutingResult {
    let mut instances: Vec<&str> = vec![];
    let mut table_units = vec![];
    for ds in rule.data_source_names() {
        let instance = rule.instance_of(ds);
        if !instances.contains(&instance) {
            instances.push(instance);
            table_units.push(TableUnit::new(ds.as_str()));
        }
    }
    RoutingResult::new(table_units)
}
