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

use std::{collections::HashMap, sync::Arc};

use indexmap::IndexMap;

use super::{
    algorithm::{
        ComplexKeysShardingAlgorithm, HintShardingAlgorithm, PreciseShardingAlgorithm,
        RangeShardingAlgorithm,
    },
    builtin::BuiltinShardingAlgorithm,
};
use crate::{
    config::{KeyGeneratorConfig, ShardingAlgorithmConfig},
    error::{ConfigError, Error},
    keygen::{IncrementKeyGenerator, ShardingKeyGenerator, SnowflakeKeyGenerator},
};

/// Algorithms and key generators registered in code by name. A registered name shadows a
/// configured built-in algorithm of the same name.
#[derive(Debug, Default, Clone)]
pub struct AlgorithmRegistry {
    precise: HashMap<String, Arc<dyn PreciseShardingAlgorithm>>,
    range: HashMap<String, Arc<dyn RangeShardingAlgorithm>>,
    complex: HashMap<String, Arc<dyn ComplexKeysShardingAlgorithm>>,
    hint: HashMap<String, Arc<dyn HintShardingAlgorithm>>,
    key_generators: HashMap<String, Arc<dyn ShardingKeyGenerator>>,
}

impl AlgorithmRegistry {
    pub fn new() -> Self {
        AlgorithmRegistry::default()
    }

    pub fn register_precise<A>(&mut self, name: &str, algorithm: A) -> &mut Self
    where
        A: PreciseShardingAlgorithm + 'static,
    {
        self.precise.insert(name.to_string(), Arc::new(algorithm));
        self
    }

    pub fn register_range<A>(&mut self, name: &str, algorithm: A) -> &mut Self
    where
        A: RangeShardingAlgorithm + 'static,
    {
        self.range.insert(name.to_string(), Arc::new(algorithm));
        self
    }

    pub fn register_complex<A>(&mut self, name: &str, algorithm: A) -> &mut Self
    where
        A: ComplexKeysShardingAlgorithm + 'static,
    {
        self.complex.insert(name.to_string(), Arc::new(algorithm));
        self
    }

    pub fn register_hint<A>(&mut self, name: &str, algorithm: A) -> &mut Self
    where
        A: HintShardingAlgorithm + 'static,
    {
        self.hint.insert(name.to_string(), Arc::new(algorithm));
        self
    }

    pub fn register_key_generator<G>(&mut self, name: &str, generator: G) -> &mut Self
    where
        G: ShardingKeyGenerator + 'static,
    {
        self.key_generators.insert(name.to_string(), Arc::new(generator));
        self
    }

    pub(crate) fn precise(
        &self,
        name: &str,
        configs: &IndexMap<String, ShardingAlgorithmConfig>,
    ) -> Result<Arc<dyn PreciseShardingAlgorithm>, Error> {
        match self.precise.get(name) {
            Some(algorithm) => Ok(algorithm.clone()),
            None => Ok(builtin(name, configs)?),
        }
    }

    pub(crate) fn range(
        &self,
        name: &str,
        configs: &IndexMap<String, ShardingAlgorithmConfig>,
    ) -> Result<Arc<dyn RangeShardingAlgorithm>, Error> {
        match self.range.get(name) {
            Some(algorithm) => Ok(algorithm.clone()),
            None => Ok(builtin(name, configs)?),
        }
    }

    pub(crate) fn complex(&self, name: &str) -> Result<Arc<dyn ComplexKeysShardingAlgorithm>, Error> {
        self.complex
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::AlgorithmNotRegistered(name.to_string()).into())
    }

    pub(crate) fn hint(
        &self,
        name: &str,
        configs: &IndexMap<String, ShardingAlgorithmConfig>,
    ) -> Result<Arc<dyn HintShardingAlgorithm>, Error> {
        match self.hint.get(name) {
            Some(algorithm) => Ok(algorithm.clone()),
            None => Ok(builtin(name, configs)?),
        }
    }

    pub(crate) fn key_generator(
        &self,
        config: &KeyGeneratorConfig,
    ) -> Result<Arc<dyn ShardingKeyGenerator>, Error> {
        if let Some(generator) = self.key_generators.get(&config.generator_type) {
            return Ok(generator.clone());
        }

        match config.generator_type.to_lowercase().as_str() {
            "snowflake" => Ok(Arc::new(SnowflakeKeyGenerator::from_props(&config.props)?)),
            "increment" => Ok(Arc::new(IncrementKeyGenerator::from_props(&config.props))),
            _ => Err(ConfigError::KeyGeneratorNotRegistered(config.generator_type.clone()).into()),
        }
    }
}

fn builtin(
    name: &str,
    configs: &IndexMap<String, ShardingAlgorithmConfig>,
) -> Result<Arc<BuiltinShardingAlgorithm>, Error> {
    let config =
        configs.get(name).ok_or_else(|| ConfigError::AlgorithmNotRegistered(name.to_string()))?;
    Ok(Arc::new(BuiltinShardingAlgorithm::from_config(name, config)?))
}
