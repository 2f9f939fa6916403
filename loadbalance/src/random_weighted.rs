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

use chrono::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::balance::{Endpoint, LoadBalance};

#[derive(Debug)]
pub struct RandomWeighted {
    pub items: Vec<Endpoint>,
    pub sum_of_weights: i64,
    pub r: StdRng,
}

impl Default for RandomWeighted {
    fn default() -> RandomWeighted {
        RandomWeighted {
            items: vec![],
            sum_of_weights: 0,
            r: StdRng::seed_from_u64(Utc::now().timestamp_subsec_nanos().into()),
        }
    }
}

impl LoadBalance for RandomWeighted {
    fn next(&mut self) -> Option<&Endpoint> {
        if self.items.is_empty() || self.sum_of_weights <= 0 {
            return None;
        }

        let mut random_weight = self.r.gen_range(0..self.sum_of_weights) + 1;
        for i in &self.items {
            random_weight -= i.weight;
            if random_weight <= 0 {
                return Some(i);
            }
        }

        self.items.last()
    }

    fn add(&mut self, endpoint: Endpoint) {
        if !self.item_exists(&endpoint) {
            self.sum_of_weights += endpoint.weight.max(0);
            self.items.push(endpoint);
        }
    }

    fn item_exists(&self, endpoint: &Endpoint) -> bool {
        self.items.iter().any(|x| x.name == endpoint.name)
    }

    fn get_all(&self) -> &[Endpoint] {
        &self.items
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_random_only_returns_weighted_items() {
        let mut r = RandomWeighted::default();
        r.add(Endpoint::with_weight("slave0", 0));
        r.add(Endpoint::with_weight("slave1", 3));

        for _ in 0..32 {
            assert_eq!(r.next().map(|x| x.name.as_str()), Some("slave1"));
        }
    }

    #[test]
    fn test_random_empty() {
        let mut r = RandomWeighted::default();
        assert!(r.next().is_none());
    }
}
