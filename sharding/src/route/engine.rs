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

use super::{broadcast, complex, standard, unicast, RoutingResult, RoutingTable, TableUnit};
use crate::{
    condition::ShardingConditions,
    error::{Error, RouteError},
    hint::HintManager,
    rule::ShardingRule,
};

/// Routing algorithms, picked per statement by [`super::RoutingEngineFactory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingEngine {
    /// Handled by the session itself, nothing is sent.
    Ignore,
    DatabaseBroadcast,
    TableBroadcast { logic_tables: Vec<String> },
    InstanceBroadcast,
    DefaultDatabase { logic_tables: Vec<String> },
    Unicast { logic_tables: Vec<String> },
    Standard { logic_tables: Vec<String> },
    Complex { logic_tables: Vec<String> },
}

impl RoutingEngine {
    pub fn name(&self) -> &'static str {
        match self {
            RoutingEngine::Ignore => "ignore",
            RoutingEngine::DatabaseBroadcast => "database_broadcast",
            RoutingEngine::TableBroadcast { .. } => "table_broadcast",
            RoutingEngine::InstanceBroadcast => "instance_broadcast",
            RoutingEngine::DefaultDatabase { .. } => "default_database",
            RoutingEngine::Unicast { .. } => "unicast",
            RoutingEngine::Standard { .. } => "standard",
            RoutingEngine::Complex { .. } => "complex",
        }
    }

    pub fn route(
        &self,
        rule: &ShardingRule,
        conditions: &ShardingConditions,
        hint: &HintManager,
    ) -> Result<RoutingResult, Error> {
        let result = match self {
            RoutingEngine::Ignore => RoutingResult::default(),
            RoutingEngine::DatabaseBroadcast => broadcast::database_broadcast(rule),
            RoutingEngine::TableBroadcast { logic_tables } => broadcast::table_broadcast(rule, logic_tables)?,
            RoutingEngine::InstanceBroadcast => broadcast::instance_broadcast(rule),
            RoutingEngine::DefaultDatabase { logic_tables } => default_database(rule, logic_tables)?,
            RoutingEngine::Unicast { logic_tables } => unicast::route(rule, logic_tables)?,
            RoutingEngine::Standard { logic_tables } => standard::route(rule, logic_tables, conditions, hint)?,
            RoutingEngine::Complex { logic_tables } => complex::route(rule, logic_tables, conditions, hint)?,
        };

        debug!("{} routing result {:?}", self.name(), result.table_units);
        Ok(result)
    }
}

fn default_database(rule: &ShardingRule, logic_tables: &[String]) -> Result<RoutingResult, Error> {
    let ds = rule.default_data_source().ok_or_else(|| {
        RouteError::MissingTableRule(logic_tables.first().cloned().unwrap_or_default())
    })?;

    let routing_tables = logic_tables.iter().map(|t| RoutingTable::new(t.as_str(), t.as_str())).collect();
    Ok(RoutingResult::new(vec![TableUnit::with_tables(ds, routing_tables)]))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_util::order_rule;

    #[test]
    fn test_default_database() {
        let rule = order_rule();
        let engine = RoutingEngine::DefaultDatabase { logic_tables: vec!["t_log".to_string()] };
        let result = engine.route(&rule, &ShardingConditions::default(), &HintManager::new()).unwrap();
        assert_eq!(result.table_units, vec![TableUnit::with_tables("ds0", vec![RoutingTable::new("t_log", "t_log")])]);
    }

    #[test]
    fn test_ignore() {
        let result = RoutingEngine::Ignore.route(&order_rule(), &ShardingConditions::default(), &HintManager::new()).unwrap();
        assert!(result.is_empty());
    }
}
