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

use crate::balance::{Endpoint, LoadBalance};

/// Interleaved weighted round robin.
#[derive(Debug, Default)]
pub struct RoundRobinWeighted {
    pub items: Vec<Endpoint>,
    pub gcd: i64,
    pub max_weight: i64,
    pub i: i64,
    pub cw: i64,
}

impl LoadBalance for RoundRobinWeighted {
    fn add(&mut self, endpoint: Endpoint) {
        if self.item_exists(&endpoint) {
            return;
        }

        let weight = endpoint.weight;
        if weight > 0 {
            if self.gcd == 0 {
                self.gcd = weight;
                self.max_weight = weight;
                self.i = -1;
                self.cw = 0;
            } else {
                self.gcd = gcd(self.gcd, weight);
                if self.max_weight < weight {
                    self.max_weight = weight;
                }
            }
        }
        self.items.push(endpoint);
    }

    fn next(&mut self) -> Option<&Endpoint> {
        let n = self.items.len() as i64;
        if n == 0 || self.max_weight == 0 {
            return None;
        }

        if n == 1 {
            return self.items.first();
        }

        loop {
            self.i = (self.i + 1) % n;
            if self.i == 0 {
                self.cw -= self.gcd;
                if self.cw <= 0 {
                    self.cw = self.max_weight;
                }
            }

            if self.items[self.i as usize].weight >= self.cw {
                return self.items.get(self.i as usize);
            }
        }
    }

    fn item_exists(&self, endpoint: &Endpoint) -> bool {
        self.items.iter().any(|x| x.name == endpoint.name)
    }

    fn get_all(&self) -> &[Endpoint] {
        &self.items
    }
}

#[inline]
fn gcd(mut x: i64, mut y: i64) -> i64 {
    loop {
        let t = x % y;
        if t > 0 {
            x = y;
            y = t;
        } else {
            return y;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_roundrobin_equal_weight() {
        let mut rr = RoundRobinWeighted::default();
        rr.add(Endpoint::new("slave0"));
        rr.add(Endpoint::new("slave1"));

        let picked = (0..4).map(|_| rr.next().unwrap().name.clone()).collect::<Vec<_>>();
        assert_eq!(picked, vec!["slave0", "slave1", "slave0", "slave1"]);
    }

    #[test]
    fn test_roundrobin_weighted() {
        let mut rr = RoundRobinWeighted::default();
        rr.add(Endpoint::with_weight("slave0", 2));
        rr.add(Endpoint::with_weight("slave1", 1));

        let picked = (0..3).map(|_| rr.next().unwrap().name.clone()).collect::<Vec<_>>();
        assert_eq!(picked, vec!["slave0", "slave0", "slave1"]);
    }
}
