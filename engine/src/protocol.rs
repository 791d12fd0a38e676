//! Request and response shapes exchanged with a [`crate::Transport`].
//!
//! These are the only types a transport implementation has to understand.
//! They are serde-serializable so a transport may ship them as JSON.

use crate::durability::DurabilityLevel;
use crate::status::Status;
use crate::{Cas, MutationToken, PartitionId, PartitionUuid, SequenceNumber};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SCOPE: &str = "_default";
pub const DEFAULT_COLLECTION: &str = "_default";

/// Single-document commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Opcode {
    Get,
    Upsert,
    Insert,
    Replace,
    Remove,
    Increment,
    Decrement,
    Append,
    Prepend,
    Touch,
    GetAndTouch,
    GetAndLock,
    Unlock,
    Exists,
}

impl Opcode {
    /// Memcached binary protocol opcode.
    pub const fn code(self) -> u8 {
        match self {
            Opcode::Get => 0x00,
            Opcode::Upsert => 0x01,
            Opcode::Insert => 0x02,
            Opcode::Replace => 0x03,
            Opcode::Remove => 0x04,
            Opcode::Increment => 0x05,
            Opcode::Decrement => 0x06,
            Opcode::Append => 0x0e,
            Opcode::Prepend => 0x0f,
            Opcode::Touch => 0x1c,
            Opcode::GetAndTouch => 0x1d,
            Opcode::GetAndLock => 0x94,
            Opcode::Unlock => 0x95,
            Opcode::Exists => 0xa0,
        }
    }

    /// Whether a successful response carries a fresh CAS for a changed
    /// document (and possibly a mutation token).
    pub fn is_mutation(self) -> bool {
        matches!(
            self,
            Opcode::Upsert
                | Opcode::Insert
                | Opcode::Replace
                | Opcode::Remove
                | Opcode::Increment
                | Opcode::Decrement
                | Opcode::Append
                | Opcode::Prepend
        )
    }
}

/// Subdocument operation codes, one per spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubdocOpcode {
    GetDoc,
    SetDoc,
    Get,
    Exists,
    DictAdd,
    DictUpsert,
    Delete,
    Replace,
    ArrayPushLast,
    ArrayPushFirst,
    ArrayInsert,
    ArrayAddUnique,
    Counter,
    GetCount,
}

impl SubdocOpcode {
    pub const fn code(self) -> u8 {
        match self {
            SubdocOpcode::GetDoc => 0x00,
            SubdocOpcode::SetDoc => 0x01,
            SubdocOpcode::Get => 0xc5,
            SubdocOpcode::Exists => 0xc6,
            SubdocOpcode::DictAdd => 0xc7,
            SubdocOpcode::DictUpsert => 0xc8,
            SubdocOpcode::Delete => 0xc9,
            SubdocOpcode::Replace => 0xca,
            SubdocOpcode::ArrayPushLast => 0xcb,
            SubdocOpcode::ArrayPushFirst => 0xcc,
            SubdocOpcode::ArrayInsert => 0xcd,
            SubdocOpcode::ArrayAddUnique => 0xce,
            SubdocOpcode::Counter => 0xcf,
            SubdocOpcode::GetCount => 0xd2,
        }
    }

    pub fn is_lookup(self) -> bool {
        matches!(
            self,
            SubdocOpcode::GetDoc | SubdocOpcode::Get | SubdocOpcode::Exists | SubdocOpcode::GetCount
        )
    }
}

/// Per-spec path flags.
pub mod path_flags {
    /// Create missing intermediate components.
    pub const CREATE_PATH: u8 = 0x01;
    /// Address extended attributes instead of the body.
    pub const XATTR: u8 = 0x04;
    /// Replace `${Mutation.*}` macros in the value.
    pub const EXPAND_MACROS: u8 = 0x10;
}

/// Per-request document flags for mutateIn.
pub mod doc_flags {
    /// Create the document if it does not exist.
    pub const MKDOC: u8 = 0x01;
    /// Fail if the document exists.
    pub const ADD: u8 = 0x02;
}

/// Macro values understood when `EXPAND_MACROS` is set.
pub mod macros {
    pub const CAS: &str = "\"${Mutation.CAS}\"";
    pub const SEQNO: &str = "\"${Mutation.seqno}\"";
    pub const VALUE_CRC32C: &str = "\"${Mutation.value_crc32c}\"";
}

/// Where a keyed request is going.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentTarget {
    pub bucket: String,
    pub scope: String,
    pub collection: String,
    pub key: String,
    pub partition: PartitionId,
}

/// One single-document request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyedRequest {
    pub opcode: Opcode,
    pub target: DocumentTarget,
    #[serde(default)]
    pub value: Vec<u8>,
    #[serde(default)]
    pub flags: u32,
    /// CAS precondition, zero for none.
    #[serde(default)]
    pub cas: Cas,
    /// Wire expiry: relative seconds below 30 days, epoch seconds above.
    #[serde(default)]
    pub expiry: u32,
    #[serde(default)]
    pub lock_time: u32,
    #[serde(default)]
    pub delta: u64,
    /// Counter seed when the document is missing.
    #[serde(default)]
    pub initial: Option<u64>,
    #[serde(default)]
    pub durability: DurabilityLevel,
    #[serde(default)]
    pub timeout_ms: u64,
}

impl KeyedRequest {
    pub fn new(opcode: Opcode, target: DocumentTarget) -> Self {
        Self {
            opcode,
            target,
            value: Vec::new(),
            flags: 0,
            cas: 0,
            expiry: 0,
            lock_time: 0,
            delta: 0,
            initial: None,
            durability: DurabilityLevel::None,
            timeout_ms: 0,
        }
    }
}

/// Response to a [`KeyedRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyedResponse {
    pub status: Status,
    #[serde(default)]
    pub cas: Cas,
    #[serde(default)]
    pub value: Vec<u8>,
    #[serde(default)]
    pub flags: u32,
    /// Absolute expiry in epoch seconds, when requested and set.
    #[serde(default)]
    pub expiry: Option<u32>,
    #[serde(default)]
    pub token: Option<MutationToken>,
}

impl KeyedResponse {
    pub fn with_status(status: Status) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }
}

/// Whether a subdocument request reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubdocCommand {
    MultiLookup,
    MultiMutation,
}

/// One encoded spec. Wire order may differ from caller order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireSpec {
    pub opcode: SubdocOpcode,
    #[serde(default)]
    pub flags: u8,
    pub path: String,
    /// JSON fragment; several comma-joined values for multi-value array ops.
    #[serde(default)]
    pub value: Vec<u8>,
}

impl WireSpec {
    pub fn is_xattr(&self) -> bool {
        self.flags & path_flags::XATTR != 0
    }

    pub fn create_path(&self) -> bool {
        self.flags & path_flags::CREATE_PATH != 0
    }

    pub fn expand_macros(&self) -> bool {
        self.flags & path_flags::EXPAND_MACROS != 0
    }
}

/// A lookupIn or mutateIn request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubdocRequest {
    pub command: SubdocCommand,
    pub target: DocumentTarget,
    pub specs: Vec<WireSpec>,
    #[serde(default)]
    pub doc_flags: u8,
    #[serde(default)]
    pub cas: Cas,
    #[serde(default)]
    pub expiry: u32,
    #[serde(default)]
    pub durability: DurabilityLevel,
    #[serde(default)]
    pub timeout_ms: u64,
}

/// Result of one spec, addressed by its wire position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireEntry {
    pub index: u8,
    pub status: Status,
    #[serde(default)]
    pub value: Vec<u8>,
}

/// Response to a [`SubdocRequest`].
///
/// Lookups report one entry per spec in wire order. Mutations report only
/// the specs that failed or produced a value; the rest succeeded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubdocResponse {
    pub status: Status,
    #[serde(default)]
    pub cas: Cas,
    #[serde(default)]
    pub token: Option<MutationToken>,
    #[serde(default)]
    pub entries: Vec<WireEntry>,
}

/// Observe the state of a partition on every node holding it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObserveRequest {
    pub bucket: String,
    pub partition: PartitionId,
    pub partition_uuid: PartitionUuid,
}

/// Sequence numbers of one copy of a partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSeqnos {
    pub active: bool,
    pub partition_uuid: PartitionUuid,
    pub current_seqno: SequenceNumber,
    pub persisted_seqno: SequenceNumber,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObserveResponse {
    pub nodes: Vec<NodeSeqnos>,
}

/// Credentials presented when a bucket is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenBucketRequest {
    pub bucket: String,
    pub username: String,
    pub password: String,
}

/// What the engine needs to know about an open bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketInfo {
    pub name: String,
    pub partitions: u16,
    pub replicas: u8,
    /// Whether mutation responses carry tokens.
    pub mutation_tokens: bool,
}
