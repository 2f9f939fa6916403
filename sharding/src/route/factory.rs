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

use super::RoutingEngine;
use crate::{
    condition::ShardingConditions,
    error::{Error, RouteError},
    rule::ShardingRule,
    statement::{SqlStatementContext, StatementKind},
};

pub struct RoutingEngineFactory;

impl RoutingEngineFactory {
    /// Picks the routing engine of a statement. The checks run in a fixed order and the first
    /// match wins: administrative and broadcast shapes are settled before any sharding value is
    /// looked at.
    pub fn new_instance(
        rule: &ShardingRule,
        statement: &SqlStatementContext,
        conditions: &ShardingConditions,
    ) -> Result<RoutingEngine, Error> {
        let engine = Self::select(rule, statement, conditions)?;
        debug!("routing engine {} for {:?} on {:?}", engine.name(), statement.kind, statement.tables);
        Ok(engine)
    }

    fn select(
        rule: &ShardingRule,
        statement: &SqlStatementContext,
        conditions: &ShardingConditions,
    ) -> Result<RoutingEngine, Error> {
        let kind = statement.kind;
        let tables = statement.table_names();
        let owned = || statement.tables.clone();

        if kind == StatementKind::Use {
            return Ok(RoutingEngine::Ignore);
        }

        let show_without_tables =
            matches!(kind, StatementKind::ShowTables | StatementKind::ShowTableStatus) && tables.is_empty();
        if show_without_tables
            || matches!(
                kind,
                StatementKind::Tcl
                    | StatementKind::ShowDatabases
                    | StatementKind::Set
                    | StatementKind::ResetParameter
            )
        {
            return Ok(RoutingEngine::DatabaseBroadcast);
        }

        if kind.is_dml() && rule.is_all_broadcast_tables(&tables) {
            return Ok(RoutingEngine::DatabaseBroadcast);
        }

        // DDL, or a grant on a single table
        if kind == StatementKind::Ddl || (kind == StatementKind::Dcl && !tables.is_empty()) {
            return Ok(RoutingEngine::TableBroadcast { logic_tables: owned() });
        }

        if kind == StatementKind::Dcl {
            return Ok(RoutingEngine::InstanceBroadcast);
        }

        if rule.is_all_in_default_data_source(&tables) {
            return Ok(RoutingEngine::DefaultDatabase { logic_tables: owned() });
        }

        let sharding_refs = rule.sharding_logic_tables(&tables);
        let bound = sharding_refs.len() == 1 || rule.is_all_binding_tables(&sharding_refs);
        let always_false =
            conditions.is_always_false() || (bound && conditions.is_always_false_for(&sharding_refs));
        if always_false || kind.is_dal() {
            return Ok(RoutingEngine::Unicast { logic_tables: owned() });
        }

        if kind.is_dql() && (tables.is_empty() || rule.is_all_broadcast_tables(&tables)) {
            return Ok(RoutingEngine::Unicast { logic_tables: owned() });
        }

        if tables.is_empty() {
            return Ok(RoutingEngine::DatabaseBroadcast);
        }

        // a table with no rule of its own can only live in the default data source
        if rule.default_data_source().is_none() {
            if let Some(missing) = tables.iter().find(|t| rule.find_table_rule(t).is_none() && !rule.is_broadcast_table(t)) {
                return Err(RouteError::MissingTableRule(missing.to_string()).into());
            }
        }

        let sharding_tables: Vec<String> = sharding_refs.iter().map(|t| t.to_string()).collect();
        if bound {
            return Ok(RoutingEngine::Standard { logic_tables: sharding_tables });
        }

        Ok(RoutingEngine::Complex { logic_tables: sharding_tables })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        condition::{Column, ShardingCondition},
        error::ErrorKind,
        test_util::{order_rule, rule_of},
    };

    fn select(kind: StatementKind, tables: &[&str]) -> RoutingEngine {
        select_with(kind, tables, &ShardingConditions::default())
    }

    fn select_with(kind: StatementKind, tables: &[&str], conditions: &ShardingConditions) -> RoutingEngine {
        let statement = tables.iter().fold(SqlStatementContext::new("", kind), |s, t| s.with_table(t));
        RoutingEngineFactory::new_instance(&order_rule(), &statement, conditions).unwrap()
    }

    fn owned(tables: &[&str]) -> Vec<String> {
        tables.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_use_is_ignored_even_with_tables() {
        assert_eq!(select(StatementKind::Use, &["t_order"]), RoutingEngine::Ignore);
    }

    #[test]
    fn test_database_broadcast() {
        assert_eq!(select(StatementKind::ShowDatabases, &[]), RoutingEngine::DatabaseBroadcast);
        assert_eq!(select(StatementKind::ShowTables, &[]), RoutingEngine::DatabaseBroadcast);
        assert_eq!(select(StatementKind::Set, &[]), RoutingEngine::DatabaseBroadcast);
        assert_eq!(select(StatementKind::Tcl, &[]), RoutingEngine::DatabaseBroadcast);
        assert_eq!(select(StatementKind::Update, &["t_config"]), RoutingEngine::DatabaseBroadcast);
        assert_eq!(select(StatementKind::Delete, &[]), RoutingEngine::DatabaseBroadcast);
    }

    #[test]
    fn test_show_tables_with_table_is_unicast() {
        assert_eq!(
            select(StatementKind::ShowTableStatus, &["t_order"]),
            RoutingEngine::Unicast { logic_tables: owned(&["t_order"]) }
        );
    }

    #[test]
    fn test_ddl_wins_over_always_false() {
        let engine = select_with(StatementKind::Ddl, &["t_order"], &ShardingConditions::always_false());
        assert_eq!(engine, RoutingEngine::TableBroadcast { logic_tables: owned(&["t_order"]) });
        assert_eq!(select(StatementKind::Ddl, &[]), RoutingEngine::TableBroadcast { logic_tables: vec![] });
    }

    #[test]
    fn test_dcl() {
        assert_eq!(
            select(StatementKind::Dcl, &["t_order"]),
            RoutingEngine::TableBroadcast { logic_tables: owned(&["t_order"]) }
        );
        assert_eq!(select(StatementKind::Dcl, &[]), RoutingEngine::InstanceBroadcast);
    }

    #[test]
    fn test_default_database() {
        assert_eq!(
            select(StatementKind::Select, &["t_log", "t_config"]),
            RoutingEngine::DefaultDatabase { logic_tables: owned(&["t_log", "t_config"]) }
        );
    }

    #[test]
    fn test_unicast() {
        let conditions = ShardingConditions::single(vec![ShardingCondition::in_list(
            Column::new("order_id", "t_order"),
            vec![],
        )]);
        assert_eq!(
            select_with(StatementKind::Select, &["t_order"], &conditions),
            RoutingEngine::Unicast { logic_tables: owned(&["t_order"]) }
        );
        assert_eq!(select(StatementKind::Select, &[]), RoutingEngine::Unicast { logic_tables: vec![] });
        assert_eq!(
            select(StatementKind::Select, &["t_config"]),
            RoutingEngine::Unicast { logic_tables: owned(&["t_config"]) }
        );
        assert_eq!(select(StatementKind::Dal, &[]), RoutingEngine::Unicast { logic_tables: vec![] });
    }

    #[test]
    fn test_standard() {
        assert_eq!(
            select(StatementKind::Select, &["t_order", "t_config"]),
            RoutingEngine::Standard { logic_tables: owned(&["t_order"]) }
        );
        assert_eq!(
            select(StatementKind::Select, &["t_order", "t_order_item"]),
            RoutingEngine::Standard { logic_tables: owned(&["t_order", "t_order_item"]) }
        );
    }

    #[test]
    fn test_conflicting_values_on_bound_tables_is_unicast() {
        let conditions = ShardingConditions::single(vec![
            ShardingCondition::eq(Column::new("order_id", "t_order"), 1),
            ShardingCondition::eq(Column::new("order_id", "t_order_item"), 2),
        ]);
        assert_eq!(
            select_with(StatementKind::Select, &["t_order", "t_order_item"], &conditions),
            RoutingEngine::Unicast { logic_tables: owned(&["t_order", "t_order_item"]) }
        );

        let unbound = ShardingConditions::single(vec![
            ShardingCondition::eq(Column::new("user_id", "t_order"), 1),
            ShardingCondition::eq(Column::new("user_id", "t_user"), 2),
        ]);
        assert_eq!(
            select_with(StatementKind::Select, &["t_order", "t_user"], &unbound),
            RoutingEngine::Complex { logic_tables: owned(&["t_order", "t_user"]) }
        );
    }

    #[test]
    fn test_complex() {
        assert_eq!(
            select(StatementKind::Select, &["t_order", "t_user"]),
            RoutingEngine::Complex { logic_tables: owned(&["t_order", "t_user"]) }
        );
    }

    #[test]
    fn test_missing_rule() {
        let rule = rule_of(
            r#"
[[data_sources]]
name = "ds0"

[[data_sources]]
name = "ds1"

[[table]]
logic_table = "t_order"
actual_data_nodes = "ds${0..1}.t_order"
"#,
        );
        let statement =
            SqlStatementContext::new("", StatementKind::Select).with_table("t_order").with_table("t_log");
        let err = RoutingEngineFactory::new_instance(&rule, &statement, &ShardingConditions::default()).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Route(RouteError::MissingTableRule(t)) if t == "t_log"));
    }
}
