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

use serde::{Deserialize, Serialize};

use crate::{random_weighted::RandomWeighted, roundrobin_weighted::RoundRobinWeighted};

/// A named, weighted target, e.g. one read replica data source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub name: String,
    pub weight: i64,
}

impl Endpoint {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Endpoint { name: name.into(), weight: 1 }
    }

    pub fn with_weight<S: Into<String>>(name: S, weight: i64) -> Self {
        Endpoint { name: name.into(), weight }
    }
}

pub struct Balance;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AlgorithmName {
    Random,
    RoundRobin,
}

impl Default for AlgorithmName {
    fn default() -> Self {
        AlgorithmName::RoundRobin
    }
}

pub trait LoadBalance {
    fn next(&mut self) -> Option<&Endpoint>;
    fn add(&mut self, endpoint: Endpoint);
    fn item_exists(&self, endpoint: &Endpoint) -> bool;
    fn get_all(&self) -> &[Endpoint];
}

#[derive(Debug)]
pub enum BalanceType {
    Random(RandomWeighted),
    RoundRobin(RoundRobinWeighted),
}

impl LoadBalance for BalanceType {
    fn next(&mut self) -> Option<&Endpoint> {
        match self {
            BalanceType::Random(inner_random) => inner_random.next(),
            BalanceType::RoundRobin(inner_roundrobin) => inner_roundrobin.next(),
        }
    }

    fn add(&mut self, endpoint: Endpoint) {
        match self {
            BalanceType::Random(inner_random) => inner_random.add(endpoint),
            BalanceType::RoundRobin(inner_roundrobin) => inner_roundrobin.add(endpoint),
        }
    }

    fn item_exists(&self, endpoint: &Endpoint) -> bool {
        match self {
            BalanceType::Random(inner_random) => inner_random.item_exists(endpoint),
            BalanceType::RoundRobin(inner_roundrobin) => inner_roundrobin.item_exists(endpoint),
        }
    }

    fn get_all(&self) -> &[Endpoint] {
        match self {
            BalanceType::Random(inner_random) => inner_random.get_all(),
            BalanceType::RoundRobin(inner_roundrobin) => inner_roundrobin.get_all(),
        }
    }
}

impl Balance {
    pub fn build_balance(&self, algorithm_name: AlgorithmName) -> BalanceType {
        match algorithm_name {
            AlgorithmName::Random => BalanceType::Random(RandomWeighted::default()),
            AlgorithmName::RoundRobin => BalanceType::RoundRobin(RoundRobinWeighted::default()),
        }
    }

    pub fn build_balance_with<I>(&self, algorithm_name: AlgorithmName, endpoints: I) -> BalanceType
    where
        I: IntoIterator<Item = Endpoint>,
    {
        let mut balance = self.build_balance(algorithm_name);
        for endpoint in endpoints {
            balance.add(endpoint);
        }
        balance
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_build_balance_dedup() {
        let balance = Balance.build_balance_with(
            AlgorithmName::RoundRobin,
            vec![Endpoint::new("ds0_slave0"), Endpoint::new("ds0_slave0"), Endpoint::new("ds0_slave1")],
        );
        assert_eq!(balance.get_all().len(), 2);
        assert!(balance.item_exists(&Endpoint::new("ds0_slave1")));
    }

    #[test]
    fn test_default_algorithm() {
        match Balance.build_balance(AlgorithmName::default()) {
            BalanceType::RoundRobin(_) => {}
            other => panic!("unexpected balance {:?}", other),
        }
    }
}
