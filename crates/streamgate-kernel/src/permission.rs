//! Permission flags and the execution-role policy derived from them.
//!
//! The same [`PermissionFlags`] drive two independent decisions:
//!
//! 1. which route templates become live routes (see [`crate::route`]), and
//! 2. which statements the generated IAM policy contains.
//!
//! The generated policy is *total*: every [`Operation`] gets either an
//! `Allow` statement (flag on) or an explicit wildcard `Deny` (flag off).

use crate::operation::Operation;
use serde::{Deserialize, Serialize};

/// IAM policy language version used for every generated document.
pub const POLICY_VERSION: &str = "2012-10-17";

/// Service principal allowed to assume the execution role.
pub const GATEWAY_SERVICE_PRINCIPAL: &str = "apigateway.amazonaws.com";

const WILDCARD: &str = "*";

// ─────────────────────────────────────────────────────────────────────────────
// Flags
// ─────────────────────────────────────────────────────────────────────────────

/// One enable flag per [`Operation`].  Unset flags are `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionFlags {
    pub list_streams: bool,
    pub describe_stream: bool,
    pub list_shards: bool,
    pub get_records: bool,
    pub get_shard_iterator: bool,
    pub put_record: bool,
    pub put_records: bool,
}

impl PermissionFlags {
    /// Every flag on.
    pub fn all() -> Self {
        Self {
            list_streams: true,
            describe_stream: true,
            list_shards: true,
            get_records: true,
            get_shard_iterator: true,
            put_record: true,
            put_records: true,
        }
    }

    pub fn is_enabled(&self, op: Operation) -> bool {
        match op {
            Operation::ListStreams => self.list_streams,
            Operation::DescribeStream => self.describe_stream,
            Operation::ListShards => self.list_shards,
            Operation::GetRecords => self.get_records,
            Operation::GetShardIterator => self.get_shard_iterator,
            Operation::PutRecord => self.put_record,
            Operation::PutRecords => self.put_records,
        }
    }

    /// Builder: flip a single operation's flag.
    pub fn with(mut self, op: Operation, enabled: bool) -> Self {
        let slot = match op {
            Operation::ListStreams => &mut self.list_streams,
            Operation::DescribeStream => &mut self.describe_stream,
            Operation::ListShards => &mut self.list_shards,
            Operation::GetRecords => &mut self.get_records,
            Operation::GetShardIterator => &mut self.get_shard_iterator,
            Operation::PutRecord => &mut self.put_record,
            Operation::PutRecords => &mut self.put_records,
        };
        *slot = enabled;
        self
    }

    pub fn enabled_operations(&self) -> Vec<Operation> {
        Operation::ALL
            .into_iter()
            .filter(|op| self.is_enabled(*op))
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Policy document
// ─────────────────────────────────────────────────────────────────────────────

/// Resources an `Allow` statement applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceScope {
    Wildcard,
    Streams(Vec<String>),
}

impl ResourceScope {
    /// Empty list widens to the wildcard.
    pub fn from_resources(resources: &[String]) -> Self {
        if resources.is_empty() {
            ResourceScope::Wildcard
        } else {
            ResourceScope::Streams(resources.to_vec())
        }
    }

    pub fn to_resources(&self) -> Vec<String> {
        match self {
            ResourceScope::Wildcard => vec![WILDCARD.to_string()],
            ResourceScope::Streams(list) => list.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    pub sid: String,
    pub effect: Effect,
    pub action: Vec<String>,
    pub resource: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<PolicyStatement>,
}

impl PolicyDocument {
    /// Statement covering `op`, if any.
    pub fn statement_for(&self, op: Operation) -> Option<&PolicyStatement> {
        let action = op.iam_action();
        self.statement.iter().find(|s| s.action.contains(&action))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PermissionSet
// ─────────────────────────────────────────────────────────────────────────────

/// Flags plus the stream identifiers `Allow` statements are narrowed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionSet {
    flags: PermissionFlags,
    scope: ResourceScope,
}

impl PermissionSet {
    pub fn new(flags: PermissionFlags, resources: &[String]) -> Self {
        Self {
            flags,
            scope: ResourceScope::from_resources(resources),
        }
    }

    pub fn flags(&self) -> &PermissionFlags {
        &self.flags
    }

    pub fn scope(&self) -> &ResourceScope {
        &self.scope
    }

    /// Generate the total policy document: one statement per operation.
    pub fn policy_document(&self) -> PolicyDocument {
        let statement = Operation::ALL
            .into_iter()
            .map(|op| {
                let (effect, resource) = if self.flags.is_enabled(op) {
                    (Effect::Allow, self.scope.to_resources())
                } else {
                    (Effect::Deny, vec![WILDCARD.to_string()])
                };
                PolicyStatement {
                    sid: format!("{effect:?}{}", op.as_str()),
                    effect,
                    action: vec![op.iam_action()],
                    resource,
                }
            })
            .collect();

        PolicyDocument {
            version: POLICY_VERSION.to_string(),
            statement,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Execution role
// ─────────────────────────────────────────────────────────────────────────────

/// Policy attached to the execution role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachedPolicy {
    Generated(PolicyDocument),
    /// Operator-supplied document, kept byte-for-byte.
    Custom(String),
}

impl AttachedPolicy {
    pub fn is_custom(&self) -> bool {
        matches!(self, AttachedPolicy::Custom(_))
    }

    /// The document text as it is attached to the role.
    pub fn document_json(&self) -> String {
        match self {
            AttachedPolicy::Generated(doc) => {
                serde_json::to_string_pretty(doc).unwrap_or_else(|_| "{}".to_string())
            }
            AttachedPolicy::Custom(raw) => raw.clone(),
        }
    }
}

/// Credential identity the gateway uses when calling the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRole {
    pub name: String,
    pub policy_name: String,
    pub policy: AttachedPolicy,
}

impl ExecutionRole {
    /// Trust policy letting the gateway service assume this role.
    pub fn assume_role_policy(&self) -> serde_json::Value {
        serde_json::json!({
            "Version": POLICY_VERSION,
            "Statement": [{
                "Effect": "Allow",
                "Principal": { "Service": GATEWAY_SERVICE_PRINCIPAL },
                "Action": "sts:AssumeRole",
            }],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arns() -> Vec<String> {
        vec![
            "arn:aws:kinesis:eu-west-1:123456789012:stream/orders".to_string(),
            "arn:aws:kinesis:eu-west-1:123456789012:stream/audit".to_string(),
        ]
    }

    #[test]
    fn flags_default_to_disabled() {
        let flags = PermissionFlags::default();
        assert!(Operation::ALL.iter().all(|op| !flags.is_enabled(*op)));
        assert!(flags.enabled_operations().is_empty());
    }

    #[test]
    fn policy_is_total_over_operations() {
        let set = PermissionSet::new(PermissionFlags::default(), &[]);
        let doc = set.policy_document();
        assert_eq!(doc.version, POLICY_VERSION);
        assert_eq!(doc.statement.len(), Operation::ALL.len());
        for op in Operation::ALL {
            let stmt = doc.statement_for(op).unwrap();
            assert_eq!(stmt.effect, Effect::Deny);
            assert_eq!(stmt.resource, vec!["*"]);
        }
    }

    #[test]
    fn allow_scope_equals_configured_streams() {
        let flags = PermissionFlags::default().with(Operation::PutRecord, true);
        let doc = PermissionSet::new(flags, &arns()).policy_document();

        let allow = doc.statement_for(Operation::PutRecord).unwrap();
        assert_eq!(allow.effect, Effect::Allow);
        assert_eq!(allow.resource, arns());

        let deny = doc.statement_for(Operation::GetRecords).unwrap();
        assert_eq!(deny.effect, Effect::Deny);
        assert_eq!(deny.resource, vec!["*"]);
    }

    #[test]
    fn empty_resource_list_widens_to_wildcard() {
        let set = PermissionSet::new(PermissionFlags::all(), &[]);
        assert_eq!(set.scope(), &ResourceScope::Wildcard);
        let doc = set.policy_document();
        assert!(doc
            .statement
            .iter()
            .all(|s| s.effect == Effect::Allow && s.resource == vec!["*"]));
    }

    #[test]
    fn policy_serializes_with_iam_field_names() {
        let flags = PermissionFlags::default().with(Operation::ListStreams, true);
        let doc = PermissionSet::new(flags, &[]).policy_document();
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["Version"], "2012-10-17");
        assert_eq!(value["Statement"][0]["Sid"], "AllowListStreams");
        assert_eq!(value["Statement"][0]["Effect"], "Allow");
        assert_eq!(value["Statement"][0]["Action"][0], "kinesis:ListStreams");
        assert_eq!(value["Statement"][1]["Sid"], "DenyDescribeStream");
    }

    #[test]
    fn custom_policy_is_attached_verbatim() {
        let raw = "{ \"Version\": \"2012-10-17\",\n  \"Statement\": [] }";
        let policy = AttachedPolicy::Custom(raw.to_string());
        assert!(policy.is_custom());
        assert_eq!(policy.document_json(), raw);
    }

    #[test]
    fn trust_policy_names_gateway_service() {
        let role = ExecutionRole {
            name: "proxy-role".to_string(),
            policy_name: "proxy-role-policy".to_string(),
            policy: AttachedPolicy::Custom("{}".to_string()),
        };
        let trust = role.assume_role_policy();
        assert_eq!(
            trust["Statement"][0]["Principal"]["Service"],
            GATEWAY_SERVICE_PRINCIPAL
        );
    }
}
