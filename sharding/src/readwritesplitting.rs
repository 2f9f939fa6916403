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

use loadbalance::balance::{AlgorithmName, LoadBalance};
use tracing::debug;

use crate::{
    config::ReadWriteSplittingConfig,
    error::{ConfigError, Error},
    session::SessionContext,
    statement::StatementKind,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetRole {
    Read,
    ReadWrite,
}

/// A logical data source backed by one master and its replicas.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadWriteSplittingRule {
    pub name: String,
    pub master_data_source_name: String,
    pub slave_data_source_names: Vec<String>,
    pub load_balance_algorithm: AlgorithmName,
}

impl ReadWriteSplittingRule {
    pub fn from_config(config: &ReadWriteSplittingConfig) -> Result<Self, Error> {
        if config.master_data_source_name.is_empty() || config.slave_data_source_names.is_empty() {
            return Err(ConfigError::InvalidReadWriteSplitting(config.name.clone()).into());
        }

        Ok(ReadWriteSplittingRule {
            name: config.name.clone(),
            master_data_source_name: config.master_data_source_name.clone(),
            slave_data_source_names: config.slave_data_source_names.clone(),
            load_balance_algorithm: config.load_balance_algorithm,
        })
    }

    /// Reads go to a replica unless the session already wrote to a master or the hint forces
    /// the master. Any other statement goes to the master and marks the session.
    pub fn target_role(kind: StatementKind, session: &mut SessionContext) -> TargetRole {
        if kind.is_dql() && !session.is_master_visited() && !session.hint.is_master_route_only() {
            return TargetRole::Read;
        }

        if !kind.is_dql() {
            session.set_master_visited();
        }
        TargetRole::ReadWrite
    }

    pub fn route(&self, role: TargetRole, session: &mut SessionContext) -> String {
        let target = match role {
            TargetRole::ReadWrite => self.master_data_source_name.clone(),
            TargetRole::Read => {
                let balance =
                    session.balance(&self.name, self.load_balance_algorithm, &self.slave_data_source_names);
                match balance.next() {
                    Some(endpoint) => endpoint.name.clone(),
                    None => self.master_data_source_name.clone(),
                }
            }
        };

        debug!("read write splitting {} routed {:?} to {}", self.name, role, target);
        target
    }
}
