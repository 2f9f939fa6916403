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

use std::collections::HashMap;

use loadbalance::balance::{AlgorithmName, Balance, BalanceType, Endpoint};

use crate::hint::HintManager;

/// Per connection state threaded through the router. One session must not be shared by
/// concurrent statements.
#[derive(Debug, Default)]
pub struct SessionContext {
    pub hint: HintManager,
    master_visited: bool,
    balances: HashMap<String, BalanceType>,
}

impl SessionContext {
    pub fn new() -> Self {
        SessionContext::default()
    }

    pub fn with_hint(hint: HintManager) -> Self {
        SessionContext { hint, ..Default::default() }
    }

    /// Set once a write went to a master. Reads stay on the master until it is cleared.
    pub fn is_master_visited(&self) -> bool {
        self.master_visited
    }

    pub fn set_master_visited(&mut self) {
        self.master_visited = true;
    }

    pub fn clear_master_visited(&mut self) {
        self.master_visited = false;
    }

    pub(crate) fn balance(
        &mut self,
        rule_name: &str,
        algorithm: AlgorithmName,
        slaves: &[String],
    ) -> &mut BalanceType {
        self.balances.entry(rule_name.to_string()).or_insert_with(|| {
            Balance.build_balance_with(algorithm, slaves.iter().map(Endpoint::new))
        })
    }
}
