//! Read/write concern descriptors
//!
//! A [`Concern`] travels alongside a command to say how durable a write must be
//! before it is acknowledged, and which snapshot a read observes. fsmload does
//! not interpret concerns; it forwards them to the [`CommandTarget`].
//!
//! [`CommandTarget`]: crate::traits::CommandTarget

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Read isolation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReadConcernLevel {
    /// Most recent data on the node, may roll back
    Local,
    /// Data acknowledged by a majority
    Majority,
    /// Majority data that reflects all prior acknowledged writes
    Linearizable,
    /// Like local, without shard-ownership filtering
    Available,
    /// A point-in-time snapshot
    Snapshot,
}

/// Read concern descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadConcern {
    /// Isolation level
    pub level: ReadConcernLevel,
}

/// Number of nodes that must acknowledge a write.
///
/// On the wire this is either a number or the string `"majority"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteAcknowledgement {
    /// An explicit node count
    Nodes(u32),
    /// A majority of voting nodes
    Majority,
}

impl Serialize for WriteAcknowledgement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            WriteAcknowledgement::Nodes(n) => serializer.serialize_u32(*n),
            WriteAcknowledgement::Majority => serializer.serialize_str("majority"),
        }
    }
}

impl<'de> Deserialize<'de> for WriteAcknowledgement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Nodes(u32),
            Named(String),
        }

        match Wire::deserialize(deserializer)? {
            Wire::Nodes(n) => Ok(WriteAcknowledgement::Nodes(n)),
            Wire::Named(s) if s == "majority" => Ok(WriteAcknowledgement::Majority),
            Wire::Named(s) => Err(de::Error::custom(format!(
                "expected a node count or \"majority\", got {s:?}"
            ))),
        }
    }
}

/// Write concern descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteConcern {
    /// Acknowledgement requirement
    pub w: WriteAcknowledgement,
    /// Require the write to reach the on-disk journal
    #[serde(default, rename = "j", skip_serializing_if = "Option::is_none")]
    pub journal: Option<bool>,
    /// How long the server may wait for acknowledgement
    #[serde(default, rename = "wtimeout", skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl WriteConcern {
    /// `{w: "majority"}`
    pub fn majority() -> Self {
        WriteConcern {
            w: WriteAcknowledgement::Majority,
            journal: None,
            timeout_ms: None,
        }
    }

    /// `{w: n}`
    pub fn nodes(n: u32) -> Self {
        WriteConcern {
            w: WriteAcknowledgement::Nodes(n),
            journal: None,
            timeout_ms: None,
        }
    }
}

/// Read and write concern sent with a command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Concern {
    /// Read concern, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_concern: Option<ReadConcern>,
    /// Write concern, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_concern: Option<WriteConcern>,
}

impl Concern {
    /// Concern with only a read part.
    pub fn read(level: ReadConcernLevel) -> Self {
        Concern {
            read_concern: Some(ReadConcern { level }),
            write_concern: None,
        }
    }

    /// Concern with only a write part.
    pub fn write(write_concern: WriteConcern) -> Self {
        Concern {
            read_concern: None,
            write_concern: Some(write_concern),
        }
    }
}
