//! Wire status codes.
//!
//! Values follow the memcached binary protocol and its subdocument and
//! synchronous-durability extensions. They travel as plain `u16` numbers.

use serde::{Deserialize, Serialize};

/// A response status as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "u16", into = "u16")]
pub enum Status {
    #[default]
    Success,
    KeyNotFound,
    KeyExists,
    ValueTooBig,
    Invalid,
    NotStored,
    DeltaBadValue,
    NotMyPartition,
    Locked,
    NotLocked,
    AuthError,
    UnknownCommand,
    TempFail,
    DurabilityInvalidLevel,
    DurabilityImpossible,
    SyncWriteInProgress,
    SyncWriteAmbiguous,
    PathNotFound,
    PathMismatch,
    PathInvalid,
    PathTooBig,
    DocTooDeep,
    ValueCannotInsert,
    DocNotJson,
    NumRange,
    DeltaInvalid,
    PathExists,
    ValueTooDeep,
    InvalidCombo,
    MultiPathFailure,
    SuccessDeleted,
    XattrInvalidFlagCombo,
    XattrInvalidKeyCombo,
    XattrUnknownMacro,
    Unknown(u16),
}

impl Status {
    /// Numeric wire value.
    pub const fn code(self) -> u16 {
        match self {
            Status::Success => 0x00,
            Status::KeyNotFound => 0x01,
            Status::KeyExists => 0x02,
            Status::ValueTooBig => 0x03,
            Status::Invalid => 0x04,
            Status::NotStored => 0x05,
            Status::DeltaBadValue => 0x06,
            Status::NotMyPartition => 0x07,
            Status::Locked => 0x09,
            Status::NotLocked => 0x0e,
            Status::AuthError => 0x20,
            Status::UnknownCommand => 0x81,
            Status::TempFail => 0x86,
            Status::DurabilityInvalidLevel => 0xa0,
            Status::DurabilityImpossible => 0xa1,
            Status::SyncWriteInProgress => 0xa2,
            Status::SyncWriteAmbiguous => 0xa3,
            Status::PathNotFound => 0xc0,
            Status::PathMismatch => 0xc1,
            Status::PathInvalid => 0xc2,
            Status::PathTooBig => 0xc3,
            Status::DocTooDeep => 0xc4,
            Status::ValueCannotInsert => 0xc5,
            Status::DocNotJson => 0xc6,
            Status::NumRange => 0xc7,
            Status::DeltaInvalid => 0xc8,
            Status::PathExists => 0xc9,
            Status::ValueTooDeep => 0xca,
            Status::InvalidCombo => 0xcb,
            Status::MultiPathFailure => 0xcc,
            Status::SuccessDeleted => 0xcd,
            Status::XattrInvalidFlagCombo => 0xce,
            Status::XattrInvalidKeyCombo => 0xcf,
            Status::XattrUnknownMacro => 0xd0,
            Status::Unknown(code) => code,
        }
    }

    /// Whether the status reports success.
    pub fn is_success(self) -> bool {
        matches!(self, Status::Success | Status::SuccessDeleted)
    }

    /// Statuses that describe a single subdocument path rather than the
    /// whole document.
    pub fn is_path_level(self) -> bool {
        matches!(
            self,
            Status::PathNotFound
                | Status::PathMismatch
                | Status::PathInvalid
                | Status::PathTooBig
                | Status::DocTooDeep
                | Status::ValueCannotInsert
                | Status::DocNotJson
                | Status::NumRange
                | Status::DeltaInvalid
                | Status::PathExists
                | Status::ValueTooDeep
                | Status::XattrUnknownMacro
        )
    }
}

impl From<u16> for Status {
    fn from(code: u16) -> Self {
        match code {
            0x00 => Status::Success,
            0x01 => Status::KeyNotFound,
            0x02 => Status::KeyExists,
            0x03 => Status::ValueTooBig,
            0x04 => Status::Invalid,
            0x05 => Status::NotStored,
            0x06 => Status::DeltaBadValue,
            0x07 => Status::NotMyPartition,
            0x09 => Status::Locked,
            0x0e => Status::NotLocked,
            0x20 => Status::AuthError,
            0x81 => Status::UnknownCommand,
            0x86 => Status::TempFail,
            0xa0 => Status::DurabilityInvalidLevel,
            0xa1 => Status::DurabilityImpossible,
            0xa2 => Status::SyncWriteInProgress,
            0xa3 => Status::SyncWriteAmbiguous,
            0xc0 => Status::PathNotFound,
            0xc1 => Status::PathMismatch,
            0xc2 => Status::PathInvalid,
            0xc3 => Status::PathTooBig,
            0xc4 => Status::DocTooDeep,
            0xc5 => Status::ValueCannotInsert,
            0xc6 => Status::DocNotJson,
            0xc7 => Status::NumRange,
            0xc8 => Status::DeltaInvalid,
            0xc9 => Status::PathExists,
            0xca => Status::ValueTooDeep,
            0xcb => Status::InvalidCombo,
            0xcc => Status::MultiPathFailure,
            0xcd => Status::SuccessDeleted,
            0xce => Status::XattrInvalidFlagCombo,
            0xcf => Status::XattrInvalidKeyCombo,
            0xd0 => Status::XattrUnknownMacro,
            other => Status::Unknown(other),
        }
    }
}

impl From<Status> for u16 {
    fn from(status: Status) -> Self {
        status.code()
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} (0x{:02x})", self, self.code())
    }
}
