//! Module for working with 12 byte object ids.
//!
//! Layout (big endian): 4 bytes unix seconds, 5 process unique bytes,
//! 3 bytes counter. Rendered as 24 lowercase hex characters.

use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{Error, Unexpected},
};
use std::{
    fmt::{Display, Formatter, Write},
    str::FromStr,
};
use thiserror::Error;
use time::OffsetDateTime;

pub const OBJECT_ID_LEN: usize = 12;
pub const OBJECT_ID_HEX_LEN: usize = OBJECT_ID_LEN * 2;

pub const TIMESTAMP_OFFSET: usize = 0;
pub const TIMESTAMP_LENGTH: usize = 4;
pub const PROCESS_UNIQUE_OFFSET: usize = 4;
pub const PROCESS_UNIQUE_LENGTH: usize = 5;
pub const COUNTER_OFFSET: usize = 9;
pub const COUNTER_LENGTH: usize = 3;

pub const COUNTER_MAX: u32 = (1 << (COUNTER_LENGTH * 8)) - 1;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum ObjectIdParseError {
    #[error("Object id must be {OBJECT_ID_HEX_LEN} characters long, got {0}")]
    InvalidLength(usize),
    #[error("Object id contains a non hex character")]
    InvalidCharacter,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct ObjectId([u8; OBJECT_ID_LEN]);

impl ObjectId {
    #[must_use]
    pub fn from_bytes(bytes: [u8; OBJECT_ID_LEN]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn from_parts(
        timestamp: u32,
        process_unique: [u8; PROCESS_UNIQUE_LENGTH],
        counter: u32,
    ) -> Self {
        let mut bytes = [0; OBJECT_ID_LEN];
        bytes[TIMESTAMP_OFFSET..TIMESTAMP_OFFSET + TIMESTAMP_LENGTH]
            .copy_from_slice(&timestamp.to_be_bytes());
        bytes[PROCESS_UNIQUE_OFFSET..PROCESS_UNIQUE_OFFSET + PROCESS_UNIQUE_LENGTH]
            .copy_from_slice(&process_unique);
        bytes[COUNTER_OFFSET..COUNTER_OFFSET + COUNTER_LENGTH]
            .copy_from_slice(&(counter & COUNTER_MAX).to_be_bytes()[1..]);

        Self(bytes)
    }

    #[must_use]
    pub fn bytes(self) -> [u8; OBJECT_ID_LEN] {
        self.0
    }

    /// Seconds since the unix epoch at which the id was generated.
    #[must_use]
    pub fn timestamp(self) -> u32 {
        let mut timestamp = [0; TIMESTAMP_LENGTH];
        timestamp
            .copy_from_slice(&self.0[TIMESTAMP_OFFSET..TIMESTAMP_OFFSET + TIMESTAMP_LENGTH]);
        u32::from_be_bytes(timestamp)
    }

    #[must_use]
    pub fn process_unique(self) -> [u8; PROCESS_UNIQUE_LENGTH] {
        let mut process_unique = [0; PROCESS_UNIQUE_LENGTH];
        process_unique.copy_from_slice(
            &self.0[PROCESS_UNIQUE_OFFSET..PROCESS_UNIQUE_OFFSET + PROCESS_UNIQUE_LENGTH],
        );
        process_unique
    }

    #[must_use]
    pub fn counter(self) -> u32 {
        let mut counter = [0; 4];
        counter[1..].copy_from_slice(&self.0[COUNTER_OFFSET..COUNTER_OFFSET + COUNTER_LENGTH]);
        u32::from_be_bytes(counter)
    }
}

impl Display for ObjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut hex = String::with_capacity(OBJECT_ID_HEX_LEN);
        for byte in self.0 {
            write!(hex, "{byte:02x}")?;
        }
        f.write_str(&hex)
    }
}

impl FromStr for ObjectId {
    type Err = ObjectIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != OBJECT_ID_HEX_LEN {
            return Err(Self::Err::InvalidLength(s.len()));
        }
        if !s.bytes().all(|byte| byte.is_ascii_hexdigit()) {
            return Err(Self::Err::InvalidCharacter);
        }

        let mut bytes = [0; OBJECT_ID_LEN];
        for (byte, pair) in bytes.iter_mut().zip(s.as_bytes().chunks_exact(2)) {
            let pair = std::str::from_utf8(pair).map_err(|_| Self::Err::InvalidCharacter)?;
            *byte = u8::from_str_radix(pair, 16).map_err(|_| Self::Err::InvalidCharacter)?;
        }

        Ok(Self(bytes))
    }
}

impl Serialize for ObjectId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        inner
            .parse()
            .map_err(|_| Error::invalid_value(Unexpected::Str(&inner), &"ObjectId"))
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct ObjectIdGenerator {
    process_unique: [u8; PROCESS_UNIQUE_LENGTH],
    next_counter: u32,
}

impl ObjectIdGenerator {
    #[must_use]
    pub fn new(process_unique: [u8; PROCESS_UNIQUE_LENGTH], counter_start: u32) -> Self {
        Self {
            process_unique,
            next_counter: counter_start & COUNTER_MAX,
        }
    }

    #[must_use]
    pub fn random() -> Self {
        Self::new(rand::random(), rand::random())
    }

    #[must_use]
    pub fn process_unique(self) -> [u8; PROCESS_UNIQUE_LENGTH] {
        self.process_unique
    }

    pub fn generate_at(&mut self, time: OffsetDateTime) -> ObjectId {
        let counter = self.next_counter;
        self.next_counter = (self.next_counter + 1) & COUNTER_MAX;

        // Times outside the 32 bit range saturate instead of wrapping.
        let timestamp = u32::try_from(time.unix_timestamp().max(0)).unwrap_or(u32::MAX);

        ObjectId::from_parts(timestamp, self.process_unique, counter)
    }

    pub fn generate(&mut self) -> ObjectId {
        self.generate_at(OffsetDateTime::now_utc())
    }
}

#[cfg(test)]
mod tests {
    use crate::object_id::{COUNTER_MAX, ObjectId, ObjectIdGenerator, ObjectIdParseError};
    use time::macros::datetime;

    #[test]
    fn object_id_from_into_parts() {
        let id = ObjectId::from_parts(0x6500_0000, [1, 2, 3, 4, 5], 0x00AB_CDEF);

        assert_eq!(id.timestamp(), 0x6500_0000);
        assert_eq!(id.process_unique(), [1, 2, 3, 4, 5]);
        assert_eq!(id.counter(), 0x00AB_CDEF);
        assert_eq!(id.to_string(), "650000000102030405abcdef");
    }

    #[test]
    fn counter_is_truncated_to_three_bytes() {
        let id = ObjectId::from_parts(0, [0; 5], 0xFF00_0001);
        assert_eq!(id.counter(), 1);
    }

    #[test]
    fn parse_object_id() {
        let id: ObjectId = "650000000102030405abcdef".parse().unwrap();
        assert_eq!(id, ObjectId::from_parts(0x6500_0000, [1, 2, 3, 4, 5], 0x00AB_CDEF));

        let upper: ObjectId = "650000000102030405ABCDEF".parse().unwrap();
        assert_eq!(upper, id);

        assert_eq!(
            "abc".parse::<ObjectId>(),
            Err(ObjectIdParseError::InvalidLength(3))
        );
        assert_eq!(
            "65000000010203040zabcdef".parse::<ObjectId>(),
            Err(ObjectIdParseError::InvalidCharacter)
        );
        assert_eq!(
            "+5000000010203040aabcdef".parse::<ObjectId>(),
            Err(ObjectIdParseError::InvalidCharacter)
        );
    }

    #[test]
    fn serde_uses_hex_string() {
        let id = ObjectId::from_parts(1, [0; 5], 2);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"000000010000000000000002\"");
        assert_eq!(serde_json::from_str::<ObjectId>(&json).unwrap(), id);
        assert!(serde_json::from_str::<ObjectId>("\"nope\"").is_err());
    }

    #[test]
    fn object_id_generator() {
        let time = datetime!(2025-10-24 10:55 UTC);
        let mut generator = ObjectIdGenerator::new([9; 5], COUNTER_MAX);

        let first = generator.generate_at(time);
        let second = generator.generate_at(time);

        assert_eq!(first.timestamp(), 1_761_303_300);
        assert_eq!(first.process_unique(), [9; 5]);
        assert_eq!(first.counter(), COUNTER_MAX);
        assert_eq!(second.counter(), 0);
        assert_ne!(first, second);
    }

    #[test]
    fn generated_ids_sort_in_creation_order() {
        let mut generator = ObjectIdGenerator::new([7; 5], 0);
        let time = datetime!(2025-01-01 00:00 UTC);

        let ids: Vec<_> = (0..5).map(|_| generator.generate_at(time)).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);

        let hex: Vec<_> = ids.iter().map(ToString::to_string).collect();
        let mut sorted_hex = hex.clone();
        sorted_hex.sort();
        assert_eq!(hex, sorted_hex);
    }
}
