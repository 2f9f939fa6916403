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

#[macro_export]
macro_rules! impl_error_from {
    ($($err:ty),*) => {
        $(
            impl From<$err> for Error {
                fn from(e: $err) -> Self {
                    Error::new(ErrorKind::from(e))
                }
            }
        )*
    };
}

#[macro_export]
macro_rules! impl_calc_sharding_idx {
    ($($typ:ty),*) => {
        $(
            impl CalcShardingIdx for $typ {
                fn calc(&self, algo: &BuiltinAlgorithm, sharding_count: u64) -> Option<u64> {
                    if sharding_count == 0 {
                        return None;
                    }

                    match algo {
                        BuiltinAlgorithm::Mod => {
                            Some((*self as i128).rem_euclid(sharding_count as i128) as u64)
                        }
                        BuiltinAlgorithm::HashMod => {
                            let mut hasher = Hasher::new();
                            hasher.update(&self.to_be_bytes());
                            Some(u64::from(hasher.finalize()) % sharding_count)
                        }
                    }
                }
            }
        )*
    };
}

