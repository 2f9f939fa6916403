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

use tracing::debug;

use super::{RoutingResult, RoutingTable, TableUnit};
use crate::{
    condition::{ShardingCondition, ShardingConditions},
    error::{Error, RouteError},
    hint::HintManager,
    rule::{DataNode, ShardingRule, TableRule},
};

/// Routes one sharded table, or several tables of one binding group. The group is routed once
/// through the driving table and the other members follow by position.
pub(super) fn route(
    rule: &ShardingRule,
    logic_tables: &[String],
    conditions: &ShardingConditions,
    hint: &HintManager,
) -> Result<RoutingResult, Error> {
    let first = match logic_tables.first() {
        Some(first) => first.as_str(),
        None => return Ok(RoutingResult::default()),
    };

    let binding = rule.find_binding_rule(first);
    let driving = binding
        .and_then(|b| b.primary())
        .and_then(|p| logic_tables.iter().find(|t| t.eq_ignore_ascii_case(&p.logic_table)))
        .map_or(first, |t| t.as_str());
    let members: Vec<&str> = logic_tables
        .iter()
        .map(|t| t.as_str())
        .filter(|t| !t.eq_ignore_ascii_case(driving) && binding.map_or(false, |b| b.has_logic_table(t)))
        .collect();

    let table_rule = rule.table_rule(driving)?;
    let table_names: Vec<&str> = logic_tables.iter().map(|t| t.as_str()).collect();

    let mut nodes: Vec<DataNode> = vec![];
    let mut group_data_nodes = vec![];
    if conditions.groups.is_empty() {
        nodes = route_data_nodes(rule, &table_rule, &[], hint)?;
    } else {
        for group in conditions.groups.iter() {
            let group_nodes = if group.is_always_false() || group.is_always_false_for(&table_names) {
                vec![]
            } else {
                route_data_nodes(rule, &table_rule, &group.for_tables(&table_names), hint)?
            };
            for node in group_nodes.iter() {
                if !nodes.contains(node) {
                    nodes.push(node.clone());
                }
            }
            group_data_nodes.push(group_nodes);
        }
    }
    nodes.sort_by_key(|n| table_rule.data_node_index(n));

    let mut table_units = Vec::with_capacity(nodes.len());
    for node in nodes {
        let mut routing_tables = vec![RoutingTable::new(driving, node.table_name.as_str())];
        if let Some(binding) = binding {
            for member in members.iter() {
                let actual =
                    binding.binding_actual_table(&node.data_source_name, member, driving, &node.table_name)?;
                routing_tables.push(RoutingTable::new(*member, actual));
            }
        }
        table_units.push(TableUnit::with_tables(node.data_source_name, routing_tables));
    }

    debug!("standard routing {:?} to {} units", logic_tables, table_units.len());
    Ok(RoutingResult { table_units, group_data_nodes })
}

fn route_data_nodes(
    rule: &ShardingRule,
    table_rule: &TableRule,
    conditions: &[ShardingCondition],
    hint: &HintManager,
) -> Result<Vec<DataNode>, Error> {
    let logic_table = table_rule.logic_table.as_str();
    let no_target = |level: &'static str| -> Error {
        RouteError::NoRouteTarget { level, logic_table: logic_table.to_string() }.into()
    };

    let data_sources = rule.database_strategy(table_rule).route(
        logic_table,
        &table_rule.data_source_names(),
        conditions,
        hint.database_sharding_values(logic_table),
    )?;
    if data_sources.is_empty() {
        return Err(no_target("data source"));
    }

    let mut nodes = vec![];
    for ds in data_sources {
        let tables = rule.table_strategy(table_rule).route(
            logic_table,
            table_rule.actual_table_names(&ds),
            conditions,
            hint.table_sharding_values(logic_table),
        )?;
        if tables.is_empty() {
            return Err(no_target("table"));
        }
        nodes.extend(tables.into_iter().map(|t| DataNode::new(ds.as_str(), t)));
    }
    Ok(nodes)
}
