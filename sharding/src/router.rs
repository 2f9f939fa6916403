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

use std::sync::Arc;

use tracing::info;

use crate::{
    condition::{ShardingCondition, ShardingConditionGroup, ShardingConditions},
    config::ShardingRuleConfig,
    error::{DataError, Error},
    keygen::GeneratedKey,
    readwritesplitting::{ReadWriteSplittingRule, TargetRole},
    rewrite::{RouteUnit, SqlRewriteEngine},
    route::{RoutingEngine, RoutingEngineFactory, RoutingResult},
    rule::ShardingRule,
    session::SessionContext,
    statement::SqlStatementContext,
    strategy::AlgorithmRegistry,
    value::Value,
};

#[derive(Debug, Clone, PartialEq)]
pub struct SqlRouteResult {
    pub routing_engine: RoutingEngine,
    pub routing_result: RoutingResult,
    pub generated_key: Option<GeneratedKey>,
    pub route_units: Vec<RouteUnit>,
}

/// Entry point of the sharding core: picks a routing engine, routes, then rewrites the SQL
/// for every target.
#[derive(Debug, Clone)]
pub struct ShardingRouter {
    rule: Arc<ShardingRule>,
}

impl ShardingRouter {
    pub fn new(rule: Arc<ShardingRule>) -> Self {
        ShardingRouter { rule }
    }

    pub fn from_config(config: &ShardingRuleConfig, registry: &AlgorithmRegistry) -> Result<Self, Error> {
        Ok(ShardingRouter::new(Arc::new(ShardingRule::new(config, registry)?)))
    }

    pub fn rule(&self) -> &Arc<ShardingRule> {
        &self.rule
    }

    pub fn route(
        &self,
        statement: &SqlStatementContext,
        conditions: ShardingConditions,
        parameters: &[Value],
        session: &mut SessionContext,
    ) -> Result<SqlRouteResult, Error> {
        let generated_key = GeneratedKey::resolve(&self.rule, statement, parameters)?;
        let conditions = match &generated_key {
            Some(key) if key.generated && self.rule.is_sharding_column(&key.column.name, &key.column.table_name) => {
                with_generated_key(conditions, key)?
            }
            _ => conditions,
        };

        let routing_engine = RoutingEngineFactory::new_instance(&self.rule, statement, &conditions)?;
        let routing_result = routing_engine.route(&self.rule, &conditions, &session.hint)?;

        let mut route_units = SqlRewriteEngine::new(statement, parameters, generated_key.as_ref())
            .rewrite_all(&routing_result)?;
        self.split_read_write(statement, &mut route_units, session);

        if self.rule.sql_show() {
            info!("Logic SQL: {}", statement.sql);
            for unit in route_units.iter() {
                info!("Actual SQL: {} ::: {} ::: {:?}", unit.data_source_name, unit.sql, unit.parameters);
            }
        }

        Ok(SqlRouteResult { routing_engine, routing_result, generated_key, route_units })
    }

    /// Routes one statement executed with several parameter sets. Generated keys of all
    /// executions are collected in execution order.
    pub fn route_batch(
        &self,
        statement: &SqlStatementContext,
        executions: &[(ShardingConditions, Vec<Value>)],
        session: &mut SessionContext,
    ) -> Result<(Vec<SqlRouteResult>, Option<GeneratedKey>), Error> {
        let mut results = Vec::with_capacity(executions.len());
        let mut generated_key: Option<GeneratedKey> = None;

        for (conditions, parameters) in executions.iter() {
            let result = self.route(statement, conditions.clone(), parameters, session)?;
            if let Some(key) = result.generated_key.clone() {
                match generated_key.as_mut() {
                    Some(acc) => acc.accumulate(key),
                    None => generated_key = Some(key),
                }
            }
            results.push(result);
        }

        Ok((results, generated_key))
    }

    // Replaces logical read write splitting names with a master or replica.
    fn split_read_write(
        &self,
        statement: &SqlStatementContext,
        route_units: &mut [RouteUnit],
        session: &mut SessionContext,
    ) {
        let mut role: Option<TargetRole> = None;
        for unit in route_units.iter_mut() {
            if let Some(rw) = self.rule.find_rw_rule(&unit.data_source_name) {
                let role = *role.get_or_insert_with(|| ReadWriteSplittingRule::target_role(statement.kind, session));
                unit.data_source_name = rw.route(role, session);
            }
        }
    }
}

// One condition group per INSERT row carries the key of that row.
fn with_generated_key(conditions: ShardingConditions, key: &GeneratedKey) -> Result<ShardingConditions, Error> {
    if conditions.is_empty() {
        let groups = key
            .values
            .iter()
            .map(|v| ShardingConditionGroup::new(vec![ShardingCondition::eq(key.column.clone(), v.clone())]))
            .collect();
        return Ok(ShardingConditions::new(groups));
    }

    if conditions.groups.len() != key.values.len() {
        return Err(
            DataError::GeneratedKeyCountMismatch { expected: conditions.groups.len(), actual: key.values.len() }.into()
        );
    }

    let mut conditions = conditions;
    for (group, value) in conditions.groups.iter_mut().zip(key.values.iter()) {
        group.conditions.push(ShardingCondition::eq(key.column.clone(), value.clone()));
    }
    Ok(conditions)
}
