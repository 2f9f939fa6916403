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

use std::{
    fmt::Debug,
    sync::atomic::{AtomicI64, Ordering},
    thread,
    time::Duration,
};

use chrono::Utc;
use parking_lot::Mutex;
use tracing::debug;

use crate::{
    condition::Column,
    config::KeyGeneratorProps,
    error::{ConfigError, DataError, Error},
    rule::ShardingRule,
    statement::{InsertValueExpr, SqlStatementContext},
    value::Value,
};

pub trait ShardingKeyGenerator: Debug + Send + Sync {
    fn generate_key(&self, logic_table: &str) -> Result<Value, Error>;
}

/// 2016-11-01T00:00:00Z
pub const SNOWFLAKE_EPOCH_MILLIS: i64 = 1_477_958_400_000;

const SEQUENCE_BITS: u64 = 12;
const WORKER_ID_BITS: u64 = 10;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;
const WORKER_ID_LEFT_SHIFT: u64 = SEQUENCE_BITS;
const TIMESTAMP_LEFT_SHIFT: u64 = WORKER_ID_BITS + SEQUENCE_BITS;
const MAX_WORKER_ID: u64 = (1 << WORKER_ID_BITS) - 1;
const DEFAULT_MAX_TOLERATE_MILLIS: i64 = 10;

#[derive(Debug, Default)]
struct SnowflakeState {
    last_millis: i64,
    sequence: u64,
}

/// 41 bits of milliseconds since the epoch, 10 bits of worker id, 12 bits of sequence.
#[derive(Debug)]
pub struct SnowflakeKeyGenerator {
    worker_id: u64,
    max_tolerate_millis: i64,
    state: Mutex<SnowflakeState>,
}

impl SnowflakeKeyGenerator {
    pub fn new(worker_id: u64) -> Result<Self, Error> {
        if worker_id > MAX_WORKER_ID {
            return Err(ConfigError::InvalidKeyGeneratorProps(format!(
                "worker_id {} exceeds {}",
                worker_id, MAX_WORKER_ID
            ))
            .into());
        }

        Ok(SnowflakeKeyGenerator {
            worker_id,
            max_tolerate_millis: DEFAULT_MAX_TOLERATE_MILLIS,
            state: Mutex::new(SnowflakeState::default()),
        })
    }

    pub fn from_props(props: &KeyGeneratorProps) -> Result<Self, Error> {
        let mut generator = SnowflakeKeyGenerator::new(props.worker_id.unwrap_or(0))?;
        if let Some(millis) = props.max_tolerate_time_difference_milliseconds {
            if millis < 0 {
                return Err(ConfigError::InvalidKeyGeneratorProps(format!(
                    "max_tolerate_time_difference_milliseconds {}",
                    millis
                ))
                .into());
            }
            generator.max_tolerate_millis = millis;
        }
        Ok(generator)
    }

    fn current_millis() -> i64 {
        Utc::now().timestamp_millis()
    }

    fn wait_until_after(last_millis: i64) -> i64 {
        let mut millis = Self::current_millis();
        while millis <= last_millis {
            thread::yield_now();
            millis = Self::current_millis();
        }
        millis
    }
}

impl ShardingKeyGenerator for SnowflakeKeyGenerator {
    fn generate_key(&self, _logic_table: &str) -> Result<Value, Error> {
        let mut state = self.state.lock();
        let mut millis = Self::current_millis();

        if millis < state.last_millis {
            let diff = state.last_millis - millis;
            if diff > self.max_tolerate_millis {
                return Err(DataError::ClockMovedBackwards(diff).into());
            }
            thread::sleep(Duration::from_millis(diff as u64));
            millis = Self::current_millis();
            if millis < state.last_millis {
                return Err(DataError::ClockMovedBackwards(state.last_millis - millis).into());
            }
        }

        if millis == state.last_millis {
            state.sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if state.sequence == 0 {
                millis = Self::wait_until_after(state.last_millis);
            }
        } else {
            state.sequence = 0;
        }
        state.last_millis = millis;

        let id = ((millis - SNOWFLAKE_EPOCH_MILLIS) as u64) << TIMESTAMP_LEFT_SHIFT
            | self.worker_id << WORKER_ID_LEFT_SHIFT
            | state.sequence;
        Ok(Value::Int(id as i64))
    }
}

#[derive(Debug)]
pub struct IncrementKeyGenerator {
    next: AtomicI64,
    step: i64,
}

impl IncrementKeyGenerator {
    pub fn new(initial_value: i64, step: i64) -> Self {
        IncrementKeyGenerator { next: AtomicI64::new(initial_value), step }
    }

    pub fn from_props(props: &KeyGeneratorProps) -> Self {
        IncrementKeyGenerator::new(props.initial_value.unwrap_or(1), props.step.unwrap_or(1))
    }
}

impl ShardingKeyGenerator for IncrementKeyGenerator {
    fn generate_key(&self, _logic_table: &str) -> Result<Value, Error> {
        Ok(Value::Int(self.next.fetch_add(self.step, Ordering::SeqCst)))
    }
}

/// Key values of an INSERT, one per row in row order. `generated` is false when the statement
/// supplied the key column itself.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedKey {
    pub column: Column,
    pub values: Vec<Value>,
    pub generated: bool,
}

impl GeneratedKey {
    pub fn resolve(
        rule: &ShardingRule,
        statement: &SqlStatementContext,
        parameters: &[Value],
    ) -> Result<Option<GeneratedKey>, Error> {
        let insert = match &statement.insert {
            Some(insert) => insert,
            None => return Ok(None),
        };
        let column = match rule.key_generate_column(&insert.table) {
            Some(column) => column,
            None => return Ok(None),
        };

        let key = match insert.column_index(column) {
            Some(idx) => {
                let mut values = Vec::with_capacity(insert.rows.len());
                for row in insert.rows.iter() {
                    match row.values.get(idx) {
                        Some(InsertValueExpr::Literal(v)) => values.push(v.clone()),
                        Some(InsertValueExpr::Parameter(p)) => values.push(
                            parameters
                                .get(*p)
                                .cloned()
                                .ok_or(DataError::ParameterIndexOutOfRange { index: *p, len: parameters.len() })?,
                        ),
                        None => break,
                    }
                }
                GeneratedKey { column: Column::new(column, insert.table.as_str()), values, generated: false }
            }
            None => {
                if insert.columns_end.is_none() {
                    return Err(DataError::InsertColumnsMissing(insert.table.clone()).into());
                }
                let mut values = Vec::with_capacity(insert.rows.len());
                for _ in insert.rows.iter() {
                    values.push(rule.generate_key(&insert.table)?);
                }
                GeneratedKey { column: Column::new(column, insert.table.as_str()), values, generated: true }
            }
        };

        if key.values.len() != insert.rows.len() {
            return Err(
                DataError::GeneratedKeyCountMismatch { expected: insert.rows.len(), actual: key.values.len() }.into()
            );
        }

        debug!("generated key {}: {:?}", key.column.name, key.values);
        Ok(Some(key))
    }

    /// Appends the keys of another execution of the same statement.
    pub fn accumulate(&mut self, other: GeneratedKey) {
        self.values.extend(other.values);
        self.generated |= other.generated;
    }
}
