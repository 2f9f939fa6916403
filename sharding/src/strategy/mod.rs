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

pub mod algorithm;
pub mod builtin;
mod registry;

use std::sync::Arc;

use indexmap::IndexMap;
use itertools::Itertools;
use tracing::trace;

pub use self::registry::AlgorithmRegistry;
use self::algorithm::{
    ComplexKeysShardingAlgorithm, ComplexShardingValue, HintShardingAlgorithm, HintShardingValue,
    PreciseShardingAlgorithm, PreciseShardingValue, RangeShardingAlgorithm, RangeShardingValue,
};
use crate::{
    condition::{merge_sharding_value, ShardingCondition, ShardingValue},
    config::{ShardingAlgorithmConfig, ShardingStrategyConfig},
    error::{ConfigError, Error, RouteError},
    value::Value,
};

#[derive(Debug, Clone)]
pub enum ShardingStrategy {
    None,
    Standard(StandardShardingStrategy),
    Complex(ComplexShardingStrategy),
    Hint(HintShardingStrategy),
}

#[derive(Debug, Clone)]
pub struct StandardShardingStrategy {
    sharding_column: Option<String>,
    precise: Arc<dyn PreciseShardingAlgorithm>,
    range: Option<Arc<dyn RangeShardingAlgorithm>>,
}

#[derive(Debug, Clone)]
pub struct ComplexShardingStrategy {
    sharding_columns: Vec<String>,
    algorithm: Arc<dyn ComplexKeysShardingAlgorithm>,
}

#[derive(Debug, Clone)]
pub struct HintShardingStrategy {
    algorithm: Arc<dyn HintShardingAlgorithm>,
}

fn split_columns(columns: &str) -> Vec<String> {
    columns.split(',').map(|c| c.trim()).filter(|c| !c.is_empty()).map(|c| c.to_string()).collect()
}

impl StandardShardingStrategy {
    pub fn new(
        sharding_column: &str,
        precise: Arc<dyn PreciseShardingAlgorithm>,
        range: Option<Arc<dyn RangeShardingAlgorithm>>,
    ) -> Result<Self, Error> {
        let mut columns = split_columns(sharding_column);
        if columns.len() > 1 {
            return Err(
                ConfigError::UnsupportedShardingColumns { strategy: "standard", count: columns.len() }.into()
            );
        }
        Ok(StandardShardingStrategy { sharding_column: columns.pop(), precise, range })
    }

    fn route(
        &self,
        logic_table: &str,
        available: &[String],
        conditions: &[ShardingCondition],
    ) -> Result<Vec<String>, Error> {
        let column = match &self.sharding_column {
            Some(column) => column,
            None => return Ok(available.to_vec()),
        };

        let merged = merge_sharding_value(
            conditions.iter().filter(|c| c.column.name.eq_ignore_ascii_case(column)),
        );
        trace!("standard sharding {}.{} with {:?}", logic_table, column, merged);

        match merged {
            None => Ok(available.to_vec()),
            Some(ShardingValue::List(values)) => {
                let mut targets = vec![];
                for value in values {
                    let value = PreciseShardingValue {
                        logic_table: logic_table.to_string(),
                        column: column.clone(),
                        value,
                    };
                    targets.push(self.precise.do_sharding(available, &value)?);
                }
                Ok(targets)
            }
            Some(ShardingValue::Range(range)) => match &self.range {
                Some(algorithm) => {
                    let value = RangeShardingValue {
                        logic_table: logic_table.to_string(),
                        column: column.clone(),
                        range,
                    };
                    algorithm.do_sharding(available, &value)
                }
                None => Err(RouteError::RangeAlgorithmMissing(logic_table.to_string()).into()),
            },
        }
    }
}

impl ComplexShardingStrategy {
    pub fn new(sharding_columns: &str, algorithm: Arc<dyn ComplexKeysShardingAlgorithm>) -> Result<Self, Error> {
        let sharding_columns = split_columns(sharding_columns);
        if sharding_columns.is_empty() {
            return Err(ConfigError::UnsupportedShardingColumns { strategy: "complex", count: 0 }.into());
        }
        Ok(ComplexShardingStrategy { sharding_columns, algorithm })
    }

    fn route(
        &self,
        logic_table: &str,
        available: &[String],
        conditions: &[ShardingCondition],
    ) -> Result<Vec<String>, Error> {
        let mut columns = vec![];
        let mut lists = vec![];
        let mut ranges = IndexMap::new();

        for column in self.sharding_columns.iter() {
            match merge_sharding_value(
                conditions.iter().filter(|c| c.column.name.eq_ignore_ascii_case(column)),
            ) {
                Some(ShardingValue::List(values)) => {
                    columns.push(column.clone());
                    lists.push(values);
                }
                Some(ShardingValue::Range(range)) => {
                    ranges.insert(column.clone(), range);
                }
                None => {}
            }
        }

        if columns.is_empty() && ranges.is_empty() {
            return Ok(available.to_vec());
        }

        let tuples: Vec<Vec<Value>> =
            if lists.is_empty() { vec![] } else { lists.into_iter().multi_cartesian_product().collect() };
        trace!("complex sharding {} with {:?} {:?} {:?}", logic_table, columns, tuples, ranges);

        let value = ComplexShardingValue { logic_table: logic_table.to_string(), columns, tuples, ranges };
        self.algorithm.do_sharding(available, &value)
    }
}

impl HintShardingStrategy {
    pub fn new(algorithm: Arc<dyn HintShardingAlgorithm>) -> Self {
        HintShardingStrategy { algorithm }
    }

    fn route(&self, logic_table: &str, available: &[String], hint_values: &[Value]) -> Result<Vec<String>, Error> {
        trace!("hint sharding {} with {:?}", logic_table, hint_values);
        if hint_values.is_empty() {
            return Ok(available.to_vec());
        }

        let value = HintShardingValue { logic_table: logic_table.to_string(), values: hint_values.to_vec() };
        self.algorithm.do_sharding(available, &value)
    }
}

impl ShardingStrategy {
    pub fn from_config(
        config: &ShardingStrategyConfig,
        registry: &AlgorithmRegistry,
        algorithms: &IndexMap<String, ShardingAlgorithmConfig>,
    ) -> Result<ShardingStrategy, Error> {
        Ok(match config {
            ShardingStrategyConfig::None => ShardingStrategy::None,
            ShardingStrategyConfig::Standard {
                sharding_column,
                precise_algorithm_name,
                range_algorithm_name,
            } => {
                let precise = registry.precise(precise_algorithm_name, algorithms)?;
                let range = match range_algorithm_name {
                    Some(name) => Some(registry.range(name, algorithms)?),
                    None => None,
                };
                ShardingStrategy::Standard(StandardShardingStrategy::new(sharding_column, precise, range)?)
            }
            ShardingStrategyConfig::Complex { sharding_columns, algorithm_name } => ShardingStrategy::Complex(
                ComplexShardingStrategy::new(sharding_columns, registry.complex(algorithm_name)?)?,
            ),
            ShardingStrategyConfig::Hint { algorithm_name } => ShardingStrategy::Hint(
                HintShardingStrategy::new(registry.hint(algorithm_name, algorithms)?),
            ),
        })
    }

    pub fn sharding_columns(&self) -> Vec<&str> {
        match self {
            ShardingStrategy::Standard(s) => s.sharding_column.iter().map(|c| c.as_str()).collect(),
            ShardingStrategy::Complex(s) => s.sharding_columns.iter().map(|c| c.as_str()).collect(),
            ShardingStrategy::None | ShardingStrategy::Hint(_) => vec![],
        }
    }

    pub fn is_hint(&self) -> bool {
        matches!(self, ShardingStrategy::Hint(_))
    }

    /// Picks the targets among `available` for the given conditions. Hint strategies read
    /// `hint_values` and ignore the conditions. The result is a de-duplicated subset of
    /// `available`, in its order.
    pub fn route(
        &self,
        logic_table: &str,
        available: &[String],
        conditions: &[ShardingCondition],
        hint_values: &[Value],
    ) -> Result<Vec<String>, Error> {
        if available.is_empty() {
            return Ok(vec![]);
        }

        let targets = match self {
            ShardingStrategy::None => return Ok(available.to_vec()),
            ShardingStrategy::Standard(s) => s.route(logic_table, available, conditions)?,
            ShardingStrategy::Complex(s) => s.route(logic_table, available, conditions)?,
            ShardingStrategy::Hint(s) => s.route(logic_table, available, hint_values)?,
        };

        if let Some(target) = targets.iter().find(|t| !available.contains(t)) {
            return Err(RouteError::InvalidAlgorithmOutput {
                logic_table: logic_table.to_string(),
                target: target.clone(),
            }
            .into());
        }

        Ok(available.iter().filter(|a| targets.contains(a)).cloned().collect())
    }
}
