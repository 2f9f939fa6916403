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

use itertools::Itertools;
use tracing::debug;

use super::{standard, RoutingResult, TableUnit};
use crate::{
    condition::ShardingConditions,
    error::{Error, RouteError},
    hint::HintManager,
    rule::ShardingRule,
};

/// Routes every independent table (or binding group) on its own, then joins the results
/// inside each data source they all reach.
pub(super) fn route(
    rule: &ShardingRule,
    logic_tables: &[String],
    conditions: &ShardingConditions,
    hint: &HintManager,
) -> Result<RoutingResult, Error> {
    if logic_tables.is_empty() {
        return Err(RouteError::ComplexWithoutTables.into());
    }

    let mut routed: Vec<&str> = vec![];
    let mut results = vec![];
    for table in logic_tables.iter() {
        if routed.iter().any(|t| t.eq_ignore_ascii_case(table)) {
            continue;
        }

        let group: Vec<String> = match rule.find_binding_rule(table) {
            Some(binding) => logic_tables.iter().filter(|t| binding.has_logic_table(t)).cloned().collect(),
            None => vec![table.clone()],
        };
        routed.extend(logic_tables.iter().filter(|t| group.contains(t)).map(|t| t.as_str()));
        results.push(standard::route(rule, &group, conditions, hint)?);
    }

    if results.len() == 1 {
        return Ok(results.remove(0));
    }
    cartesian(logic_tables, &results)
}

fn cartesian(logic_tables: &[String], results: &[RoutingResult]) -> Result<RoutingResult, Error> {
    let common: Vec<&str> = match results.first() {
        Some(first) => first
            .data_source_names()
            .into_iter()
            .filter(|ds| results.iter().all(|r| r.data_source_names().contains(ds)))
            .collect(),
        None => vec![],
    };
    if common.is_empty() {
        return Err(RouteError::NoCommonDataSource(logic_tables.to_vec()).into());
    }

    let mut table_units = vec![];
    for ds in common {
        let combinations = results.iter().map(|r| r.table_units_of(ds)).multi_cartesian_product();
        for combination in combinations {
            let routing_tables = combination.iter().flat_map(|u| u.routing_tables.iter().cloned()).collect();
            table_units.push(TableUnit::with_tables(ds, routing_tables));
        }
    }

    debug!("cartesian routing {:?} to {} units", logic_tables, table_units.len());
    Ok(RoutingResult::new(table_units))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        condition::{Column, ShardingCondition},
        error::ErrorKind,
        rule::DataNode,
        test_util::{order_rule, rule_of},
    };

    fn tables(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_cartesian_in_common_data_source() {
        let rule = order_rule();
        let conditions = ShardingConditions::single(vec![
            ShardingCondition::eq(Column::new("order_id", "t_order"), 1),
            ShardingCondition::in_list(Column::new("user_id", "t_user"), vec![1.into(), 3.into()]),
        ]);
        let result = route(&rule, &tables(&["t_order", "t_user"]), &conditions, &HintManager::new()).unwrap();

        assert_eq!(result.table_units.len(), 1);
        assert_eq!(result.table_units[0].data_source_name, "ds1");
        assert_eq!(result.table_units[0].find_actual_table("t_order"), Some("t_order1"));
        assert_eq!(result.table_units[0].find_actual_table("t_user"), Some("t_user1"));
    }

    #[test]
    fn test_cartesian_product() {
        let rule = order_rule();
        let conditions = ShardingConditions::single(vec![ShardingCondition::eq(
            Column::new("order_id", "t_order"),
            1,
        )]);
        let result = route(&rule, &tables(&["t_order", "t_user"]), &conditions, &HintManager::new()).unwrap();

        // t_order routes to ds1.t_order1, t_user to ds1.t_user0 and ds1.t_user1 inside ds1
        assert_eq!(result.data_source_names(), vec!["ds1"]);
        assert_eq!(result.table_units.len(), 2);
        assert_eq!(
            result.data_nodes(),
            vec![
                DataNode::new("ds1", "t_order1"),
                DataNode::new("ds1", "t_user0"),
                DataNode::new("ds1", "t_order1"),
                DataNode::new("ds1", "t_user1"),
            ]
        );
    }

    #[test]
    fn test_binding_group_routed_once() {
        let rule = order_rule();
        let conditions = ShardingConditions::single(vec![ShardingCondition::eq(Column::new("order_id", ""), 2)]);
        let result =
            route(&rule, &tables(&["t_order", "t_user", "t_order_item"]), &conditions, &HintManager::new()).unwrap();

        // the unqualified order_id only narrows the binding group, t_user spans ds0
        assert_eq!(result.table_units.len(), 2);
        for unit in result.table_units.iter() {
            assert_eq!(unit.data_source_name, "ds0");
            assert_eq!(unit.find_actual_table("t_order"), Some("t_order0"));
            assert_eq!(unit.find_actual_table("t_order_item"), Some("t_order_item0"));
        }
    }

    #[test]
    fn test_no_common_data_source() {
        let rule = rule_of(
            r#"
[[data_sources]]
name = "ds0"

[[data_sources]]
name = "ds1"

[[table]]
logic_table = "t_a"
actual_data_nodes = "ds0.t_a"

[[table]]
logic_table = "t_b"
actual_data_nodes = "ds1.t_b"
"#,
        );
        let err = route(&rule, &tables(&["t_a", "t_b"]), &ShardingConditions::default(), &HintManager::new())
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Route(RouteError::NoCommonDataSource(_))));

        let err = route(&rule, &[], &ShardingConditions::default(), &HintManager::new()).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Route(RouteError::ComplexWithoutTables)));
    }
}
