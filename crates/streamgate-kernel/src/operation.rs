//! Backend operations exposed through the gateway.
//!
//! The set is fixed: every [`Operation`] has exactly one route template, one
//! permission flag and one IAM action.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire prefix of the Kinesis JSON protocol `X-Amz-Target` header.
pub const TARGET_PREFIX: &str = "Kinesis_20131202";

/// One backend capability reachable through a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Operation {
    ListStreams,
    DescribeStream,
    ListShards,
    GetRecords,
    GetShardIterator,
    PutRecord,
    PutRecords,
}

impl Operation {
    /// Every operation, in policy statement order.
    pub const ALL: [Operation; 7] = [
        Operation::ListStreams,
        Operation::DescribeStream,
        Operation::ListShards,
        Operation::GetRecords,
        Operation::GetShardIterator,
        Operation::PutRecord,
        Operation::PutRecords,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::ListStreams => "ListStreams",
            Operation::DescribeStream => "DescribeStream",
            Operation::ListShards => "ListShards",
            Operation::GetRecords => "GetRecords",
            Operation::GetShardIterator => "GetShardIterator",
            Operation::PutRecord => "PutRecord",
            Operation::PutRecords => "PutRecords",
        }
    }

    /// IAM action name, e.g. `kinesis:PutRecord`.
    pub fn iam_action(&self) -> String {
        format!("kinesis:{}", self.as_str())
    }

    /// Value of the `X-Amz-Target` header for this operation.
    pub fn target(&self) -> String {
        format!("{TARGET_PREFIX}.{}", self.as_str())
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
