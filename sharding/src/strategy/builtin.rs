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

use crc32fast::Hasher;

use super::algorithm::{
    HintShardingAlgorithm, HintShardingValue, PreciseShardingAlgorithm, PreciseShardingValue,
    RangeShardingAlgorithm, RangeShardingValue,
};
use crate::{
    config::{ShardingAlgorithmConfig, ShardingAlgorithmType},
    error::{ConfigError, DataError, Error, RouteError},
    value::Value,
};

pub trait CalcShardingIdx {
    fn calc(&self, algo: &BuiltinAlgorithm, sharding_count: u64) -> Option<u64>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinAlgorithm {
    Mod,
    HashMod,
}

impl_calc_sharding_idx!(u64, i64);

/// Algorithms configured by `type` under `sharding_algorithms`. Targets are matched by the
/// number their name ends with, `t_order1` is shard 1.
#[derive(Debug, Clone, PartialEq)]
pub enum BuiltinShardingAlgorithm {
    Mod { sharding_count: u64 },
    HashMod { sharding_count: u64 },
    VolumeRange { range_lower: i64, range_upper: i64, sharding_volume: i64 },
}

impl BuiltinShardingAlgorithm {
    pub fn from_config(name: &str, config: &ShardingAlgorithmConfig) -> Result<Self, Error> {
        let props = &config.props;
        let missing = |prop: &'static str| -> Error {
            ConfigError::MissingAlgorithmProps { name: name.to_string(), prop }.into()
        };
        let invalid = |reason: &'static str| -> Error {
            ConfigError::InvalidAlgorithmProps { name: name.to_string(), reason }.into()
        };

        match config.algorithm_type {
            ShardingAlgorithmType::Mod | ShardingAlgorithmType::HashMod => {
                let sharding_count = props.sharding_count.ok_or_else(|| missing("sharding_count"))?;
                if sharding_count == 0 {
                    return Err(invalid("sharding_count must be positive"));
                }
                Ok(if config.algorithm_type == ShardingAlgorithmType::Mod {
                    BuiltinShardingAlgorithm::Mod { sharding_count }
                } else {
                    BuiltinShardingAlgorithm::HashMod { sharding_count }
                })
            }
            ShardingAlgorithmType::VolumeRange => {
                let range_lower = props.range_lower.ok_or_else(|| missing("range_lower"))?;
                let range_upper = props.range_upper.ok_or_else(|| missing("range_upper"))?;
                let sharding_volume = props.sharding_volume.ok_or_else(|| missing("sharding_volume"))?;
                if sharding_volume <= 0 {
                    return Err(invalid("sharding_volume must be positive"));
                }
                if range_upper <= range_lower {
                    return Err(invalid("range_upper must be greater than range_lower"));
                }
                Ok(BuiltinShardingAlgorithm::VolumeRange { range_lower, range_upper, sharding_volume })
            }
        }
    }

    fn shard_of(&self, value: &Value) -> Result<u64, Error> {
        let non_numeric = || -> Error { DataError::NonNumericShardingValue(value.to_string()).into() };

        match self {
            BuiltinShardingAlgorithm::Mod { sharding_count } => {
                calc_index(value, &BuiltinAlgorithm::Mod, *sharding_count).ok_or_else(non_numeric)
            }
            BuiltinShardingAlgorithm::HashMod { sharding_count } => {
                calc_index(value, &BuiltinAlgorithm::HashMod, *sharding_count).ok_or_else(non_numeric)
            }
            BuiltinShardingAlgorithm::VolumeRange { .. } => {
                let v = value.as_i64().ok_or_else(non_numeric)?;
                Ok(self.partition_of(v))
            }
        }
    }

    fn partition_of(&self, v: i64) -> u64 {
        match self {
            BuiltinShardingAlgorithm::VolumeRange { range_lower, range_upper, sharding_volume } => {
                if v < *range_lower {
                    0
                } else if v >= *range_upper {
                    self.last_partition()
                } else {
                    (((v as i128 - *range_lower as i128) / *sharding_volume as i128) as u64).saturating_add(1)
                }
            }
            _ => 0,
        }
    }

    fn last_partition(&self) -> u64 {
        match self {
            BuiltinShardingAlgorithm::VolumeRange { range_lower, range_upper, sharding_volume } => {
                let span = *range_upper as i128 - *range_lower as i128;
                let volume = *sharding_volume as i128;
                (((span + volume - 1) / volume) as u64).saturating_add(1)
            }
            _ => 0,
        }
    }

    fn shards_of_range(&self, value: &RangeShardingValue) -> Result<RangeShards, Error> {
        let bound = |v: &Option<Value>| -> Result<Option<i64>, Error> {
            match v {
                Some(v) => v
                    .as_i64()
                    .map(Some)
                    .ok_or_else(|| DataError::NonNumericShardingValue(v.to_string()).into()),
                None => Ok(None),
            }
        };

        match self {
            BuiltinShardingAlgorithm::Mod { sharding_count } => {
                let (lower, upper) = match (bound(&value.range.lower)?, bound(&value.range.upper)?) {
                    (Some(lower), Some(upper)) => (lower, upper),
                    _ => return Ok(RangeShards::All),
                };
                if lower > upper {
                    return Ok(RangeShards::Listed(vec![]));
                }
                if (upper as i128 - lower as i128) + 1 >= *sharding_count as i128 {
                    return Ok(RangeShards::All);
                }
                let mut shards = vec![];
                for v in lower..=upper {
                    if let Some(idx) = v.calc(&BuiltinAlgorithm::Mod, *sharding_count) {
                        if !shards.contains(&idx) {
                            shards.push(idx);
                        }
                    }
                }
                Ok(RangeShards::Listed(shards))
            }
            BuiltinShardingAlgorithm::HashMod { .. } => Ok(RangeShards::All),
            BuiltinShardingAlgorithm::VolumeRange { .. } => {
                let first = bound(&value.range.lower)?.map_or(0, |v| self.partition_of(v));
                let last = bound(&value.range.upper)?.map_or(self.last_partition(), |v| self.partition_of(v));
                Ok(RangeShards::Between(first, last))
            }
        }
    }
}

enum RangeShards {
    All,
    Listed(Vec<u64>),
    Between(u64, u64),
}

impl RangeShards {
    fn contains(&self, shard: Option<u64>) -> bool {
        match (self, shard) {
            (RangeShards::All, _) => true,
            (RangeShards::Listed(shards), Some(n)) => shards.contains(&n),
            (RangeShards::Between(first, last), Some(n)) => (*first..=*last).contains(&n),
            (_, None) => false,
        }
    }
}

fn calc_index(value: &Value, algo: &BuiltinAlgorithm, sharding_count: u64) -> Option<u64> {
    match value {
        Value::Int(v) => v.calc(algo, sharding_count),
        Value::UInt(v) => v.calc(algo, sharding_count),
        Value::Text(v) if *algo == BuiltinAlgorithm::HashMod && v.trim().parse::<i64>().is_err() => {
            let mut hasher = Hasher::new();
            hasher.update(v.as_bytes());
            Some(u64::from(hasher.finalize()) % sharding_count)
        }
        other => other.as_i64().and_then(|v| v.calc(algo, sharding_count)),
    }
}

/// Trailing decimal number of a target name.
pub(crate) fn suffix_number(target: &str) -> Option<u64> {
    let prefix_len = target.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    if prefix_len == target.len() {
        return None;
    }
    target[prefix_len..].parse().ok()
}

impl PreciseShardingAlgorithm for BuiltinShardingAlgorithm {
    fn do_sharding(&self, available: &[String], value: &PreciseShardingValue) -> Result<String, Error> {
        let shard = self.shard_of(&value.value)?;
        available.iter().find(|t| suffix_number(t) == Some(shard)).cloned().ok_or_else(|| {
            RouteError::ShardingValueNotMatched {
                logic_table: value.logic_table.clone(),
                value: value.value.to_string(),
            }
            .into()
        })
    }
}

impl RangeShardingAlgorithm for BuiltinShardingAlgorithm {
    fn do_sharding(&self, available: &[String], value: &RangeShardingValue) -> Result<Vec<String>, Error> {
        let shards = self.shards_of_range(value)?;
        Ok(available.iter().filter(|t| shards.contains(suffix_number(t))).cloned().collect())
    }
}

impl HintShardingAlgorithm for BuiltinShardingAlgorithm {
    fn do_sharding(&self, available: &[String], value: &HintShardingValue) -> Result<Vec<String>, Error> {
        let mut targets: Vec<String> = vec![];
        for each in value.values.iter() {
            let precise = PreciseShardingValue {
                logic_table: value.logic_table.clone(),
                column: String::new(),
                value: each.clone(),
            };
            let target = PreciseShardingAlgorithm::do_sharding(self, available, &precise)?;
            if !targets.contains(&target) {
                targets.push(target);
            }
        }
        Ok(targets)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{condition::ValueRange, config::AlgorithmProps, error::ErrorKind};

    fn targets(prefix: &str, count: u64) -> Vec<String> {
        (0..count).map(|i| format!("{}{}", prefix, i)).collect()
    }

    fn precise(value: Value) -> PreciseShardingValue {
        PreciseShardingValue { logic_table: "t_order".to_string(), column: "order_id".to_string(), value }
    }

    fn range(lower: Option<i64>, upper: Option<i64>) -> RangeShardingValue {
        RangeShardingValue {
            logic_table: "t_order".to_string(),
            column: "order_id".to_string(),
            range: ValueRange { lower: lower.map(Value::from), upper: upper.map(Value::from) },
        }
    }

    #[test]
    fn test_calc_sharding_idx() {
        assert_eq!(7u64.calc(&BuiltinAlgorithm::Mod, 4), Some(3));
        assert_eq!((-7i64).calc(&BuiltinAlgorithm::Mod, 4), Some(1));
        assert_eq!(7u64.calc(&BuiltinAlgorithm::Mod, 0), None);
        assert_eq!(7u64.calc(&BuiltinAlgorithm::HashMod, 4), 7i64.calc(&BuiltinAlgorithm::HashMod, 4));
    }

    #[test]
    fn test_suffix_number() {
        assert_eq!(suffix_number("t_order1"), Some(1));
        assert_eq!(suffix_number("t_log_2021"), Some(2021));
        assert_eq!(suffix_number("t_order"), None);
    }

    #[test]
    fn test_mod_precise() {
        let algo = BuiltinShardingAlgorithm::Mod { sharding_count: 2 };
        let available = targets("t_order", 2);
        assert_eq!(PreciseShardingAlgorithm::do_sharding(&algo, &available, &precise(3.into())).unwrap(), "t_order1");
        assert_eq!(PreciseShardingAlgorithm::do_sharding(&algo, &available, &precise("4".into())).unwrap(), "t_order0");

        let err = PreciseShardingAlgorithm::do_sharding(&algo, &available, &precise("abc".into())).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Data(DataError::NonNumericShardingValue(_))));

        let err = PreciseShardingAlgorithm::do_sharding(&algo, &available[..1], &precise(3.into())).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Route(RouteError::ShardingValueNotMatched { .. })));
    }

    #[test]
    fn test_mod_range() {
        let algo = BuiltinShardingAlgorithm::Mod { sharding_count: 4 };
        let available = targets("t_order", 4);
        assert_eq!(
            RangeShardingAlgorithm::do_sharding(&algo, &available, &range(Some(5), Some(6))).unwrap(),
            vec!["t_order1", "t_order2"]
        );
        assert_eq!(RangeShardingAlgorithm::do_sharding(&algo, &available, &range(Some(1), Some(9))).unwrap(), available);
        assert_eq!(RangeShardingAlgorithm::do_sharding(&algo, &available, &range(Some(1), None)).unwrap(), available);
    }

    #[test]
    fn test_hash_mod_text() {
        let algo = BuiltinShardingAlgorithm::HashMod { sharding_count: 3 };
        let available = targets("ds", 3);
        let first = PreciseShardingAlgorithm::do_sharding(&algo, &available, &precise("alice".into())).unwrap();
        let second = PreciseShardingAlgorithm::do_sharding(&algo, &available, &precise("alice".into())).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            PreciseShardingAlgorithm::do_sharding(&algo, &available, &precise("10".into())).unwrap(),
            PreciseShardingAlgorithm::do_sharding(&algo, &available, &precise(10.into())).unwrap()
        );
    }

    #[test]
    fn test_volume_range() {
        let algo = BuiltinShardingAlgorithm::VolumeRange { range_lower: 10, range_upper: 45, sharding_volume: 10 };
        let available = targets("t_order", 6);
        let shard = |v: i64| PreciseShardingAlgorithm::do_sharding(&algo, &available, &precise(v.into())).unwrap();
        assert_eq!(shard(3), "t_order0");
        assert_eq!(shard(10), "t_order1");
        assert_eq!(shard(44), "t_order4");
        assert_eq!(shard(45), "t_order5");
        assert_eq!(shard(1000), "t_order5");
        assert_eq!(
            RangeShardingAlgorithm::do_sharding(&algo, &available, &range(Some(15), Some(25))).unwrap(),
            vec!["t_order1", "t_order2"]
        );
        assert_eq!(
            RangeShardingAlgorithm::do_sharding(&algo, &available, &range(None, Some(12))).unwrap(),
            vec!["t_order0", "t_order1"]
        );
    }

    #[test]
    fn test_volume_range_extreme_bounds() {
        let algo = BuiltinShardingAlgorithm::VolumeRange {
            range_lower: i64::MIN,
            range_upper: i64::MAX,
            sharding_volume: 1,
        };
        let available = targets("t_order", 3);
        let shard = |v: i64| PreciseShardingAlgorithm::do_sharding(&algo, &available, &precise(v.into()));
        assert_eq!(shard(i64::MIN).unwrap(), "t_order1");
        assert_eq!(shard(i64::MIN + 1).unwrap(), "t_order2");
        assert!(shard(0).is_err());
        assert_eq!(
            RangeShardingAlgorithm::do_sharding(&algo, &available, &range(None, None)).unwrap(),
            vec!["t_order0", "t_order1", "t_order2"]
        );

        let wide = BuiltinShardingAlgorithm::VolumeRange {
            range_lower: -10,
            range_upper: i64::MAX,
            sharding_volume: i64::MAX,
        };
        let available = targets("t_order", 4);
        let shard = |v: i64| PreciseShardingAlgorithm::do_sharding(&wide, &available, &precise(v.into())).unwrap();
        assert_eq!(shard(-11), "t_order0");
        assert_eq!(shard(1), "t_order1");
        assert_eq!(shard(i64::MAX - 10), "t_order2");
        assert_eq!(shard(i64::MAX), "t_order3");
    }

    #[test]
    fn test_hint() {
        let algo = BuiltinShardingAlgorithm::Mod { sharding_count: 2 };
        let available = targets("ds", 2);
        let value = HintShardingValue { logic_table: "t_order".to_string(), values: vec![1.into(), 3.into(), 2.into()] };
        assert_eq!(HintShardingAlgorithm::do_sharding(&algo, &available, &value).unwrap(), vec!["ds1", "ds0"]);
    }

    #[test]
    fn test_from_config() {
        let config = ShardingAlgorithmConfig { algorithm_type: ShardingAlgorithmType::Mod, props: AlgorithmProps::default() };
        let err = BuiltinShardingAlgorithm::from_config("t_mod", &config).unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::Config(ConfigError::MissingAlgorithmProps { prop: "sharding_count", .. })
        ));

        let config = ShardingAlgorithmConfig {
            algorithm_type: ShardingAlgorithmType::VolumeRange,
            props: AlgorithmProps { range_lower: Some(0), range_upper: Some(100), sharding_volume: Some(0), ..Default::default() },
        };
        assert!(BuiltinShardingAlgorithm::from_config("t_volume", &config).is_err());
    }
}
