// Aggregation kinds and the fixed set chosen when a time series is created.

use serde::{Deserialize, Serialize};
use wincode::{SchemaRead, SchemaWrite};

/// One aggregate a time bin can maintain. Serializes upper-case (e.g. "AVG").
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, SchemaRead, SchemaWrite,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum AggregationType {
    Avg,
    Min,
    Max,
    Sum,
    Latest,
}

impl AggregationType {
    pub const ALL: [AggregationType; 5] = [
        AggregationType::Avg,
        AggregationType::Min,
        AggregationType::Max,
        AggregationType::Sum,
        AggregationType::Latest,
    ];

    fn bit(self) -> u8 {
        match self {
            AggregationType::Avg => 1,
            AggregationType::Min => 1 << 1,
            AggregationType::Max => 1 << 2,
            AggregationType::Sum => 1 << 3,
            AggregationType::Latest => 1 << 4,
        }
    }
}

/// Set of aggregation kinds, fixed for the lifetime of a time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "Vec<AggregationType>", from = "Vec<AggregationType>")]
pub struct AggregationSet(u8);

impl AggregationSet {
    pub const EMPTY: AggregationSet = AggregationSet(0);
    pub const AVG_ONLY: AggregationSet = AggregationSet(1);
    pub const SUM_ONLY: AggregationSet = AggregationSet(1 << 3);
    pub const ALL: AggregationSet = AggregationSet(0b1_1111);

    pub fn contains(self, kind: AggregationType) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn insert(&mut self, kind: AggregationType) {
        self.0 |= kind.bit();
    }

    pub fn with(mut self, kind: AggregationType) -> Self {
        self.insert(kind);
        self
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True when any of SUM/MIN/MAX/LATEST is active, i.e. bins carry more than avg/var/count.
    pub fn is_extended(self) -> bool {
        self.0 & !AggregationType::Avg.bit() != 0
    }

    /// Active kinds in declaration order.
    pub fn iter(self) -> impl Iterator<Item = AggregationType> {
        AggregationType::ALL
            .into_iter()
            .filter(move |k| self.contains(*k))
    }
}

impl FromIterator<AggregationType> for AggregationSet {
    fn from_iter<I: IntoIterator<Item = AggregationType>>(iter: I) -> Self {
        let mut set = AggregationSet::EMPTY;
        for kind in iter {
            set.insert(kind);
        }
        set
    }
}

impl From<Vec<AggregationType>> for AggregationSet {
    fn from(kinds: Vec<AggregationType>) -> Self {
        kinds.into_iter().collect()
    }
}

impl From<AggregationSet> for Vec<AggregationType> {
    fn from(set: AggregationSet) -> Self {
        set.iter().collect()
    }
}
