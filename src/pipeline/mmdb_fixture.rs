//! Tiny IPv4 MaxMind DB writer for tests
//!
//! Produces 24-bit record databases with a handful of CIDR entries, enough to
//! drive [`MaxMindSource`](crate::pipeline::MaxMindSource) through real
//! `Reader` lookups without shipping binary fixtures.

use std::io::Write;
use std::net::Ipv4Addr;
use tempfile::NamedTempFile;

const METADATA_MARKER: &[u8] = b"\xab\xcd\xefMaxMind.com";
const SEPARATOR_SIZE: usize = 16;

/// A value in the MMDB data section
#[derive(Debug, Clone)]
pub enum Field {
    Str(&'static str),
    Double(f64),
    U16(u16),
    U32(u32),
    U64(u64),
    Map(Vec<(&'static str, Field)>),
    Array(Vec<Field>),
}

impl Field {
    fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Field::Str(s) => {
                assert!(s.len() < 29, "fixture strings must be short");
                out.push((2 << 5) | s.len() as u8);
                out.extend_from_slice(s.as_bytes());
            }
            Field::Double(v) => {
                out.push((3 << 5) | 8);
                out.extend_from_slice(&v.to_be_bytes());
            }
            Field::U16(v) => {
                out.push((5 << 5) | 2);
                out.extend_from_slice(&v.to_be_bytes());
            }
            Field::U32(v) => {
                out.push((6 << 5) | 4);
                out.extend_from_slice(&v.to_be_bytes());
            }
            Field::U64(v) => {
                // Extended type 9
                out.push(8);
                out.push(9 - 7);
                out.extend_from_slice(&v.to_be_bytes());
            }
            Field::Map(entries) => {
                assert!(entries.len() < 29);
                out.push((7 << 5) | entries.len() as u8);
                for (key, value) in entries {
                    Field::Str(key).encode(out);
                    value.encode(out);
                }
            }
            Field::Array(items) => {
                assert!(items.len() < 29);
                // Extended type 11
                out.push(items.len() as u8);
                out.push(11 - 7);
                for item in items {
                    item.encode(out);
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Child {
    Empty,
    Node(usize),
    Data(usize),
}

/// Builder for an IPv4-only database
pub struct MmdbBuilder {
    database_type: &'static str,
    nodes: Vec<[Child; 2]>,
    records: Vec<Field>,
}

impl MmdbBuilder {
    pub fn new(database_type: &'static str) -> Self {
        Self {
            database_type,
            nodes: vec![[Child::Empty, Child::Empty]],
            records: Vec::new(),
        }
    }

    /// Map `network/prefix_len` to `record`; prefixes must not overlap
    pub fn insert(mut self, network: &str, prefix_len: u32, record: Field) -> Self {
        assert!((1..=32).contains(&prefix_len));
        let bits = u32::from(network.parse::<Ipv4Addr>().unwrap());
        let data = self.records.len();
        self.records.push(record);

        let mut node = 0;
        for depth in 0..prefix_len {
            let bit = ((bits >> (31 - depth)) & 1) as usize;
            if depth == prefix_len - 1 {
                self.nodes[node][bit] = Child::Data(data);
                break;
            }
            node = match self.nodes[node][bit] {
                Child::Node(next) => next,
                Child::Empty => {
                    self.nodes.push([Child::Empty, Child::Empty]);
                    let next = self.nodes.len() - 1;
                    self.nodes[node][bit] = Child::Node(next);
                    next
                }
                Child::Data(_) => panic!("overlapping fixture networks"),
            };
        }
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let node_count = self.nodes.len();

        let mut data = Vec::new();
        let mut offsets = Vec::with_capacity(self.records.len());
        for record in &self.records {
            offsets.push(data.len());
            record.encode(&mut data);
        }

        let mut out = Vec::new();
        for children in &self.nodes {
            for child in children {
                let value = match *child {
                    Child::Empty => node_count,
                    Child::Node(next) => next,
                    Child::Data(index) => node_count + SEPARATOR_SIZE + offsets[index],
                };
                out.extend_from_slice(&(value as u32).to_be_bytes()[1..]);
            }
        }
        out.extend_from_slice(&[0u8; SEPARATOR_SIZE]);
        out.extend_from_slice(&data);
        out.extend_from_slice(METADATA_MARKER);

        Field::Map(vec![
            ("binary_format_major_version", Field::U16(2)),
            ("binary_format_minor_version", Field::U16(0)),
            ("build_epoch", Field::U64(1_760_000_000)),
            ("database_type", Field::Str(self.database_type)),
            (
                "description",
                Field::Map(vec![("en", Field::Str("banmap fixture"))]),
            ),
            ("ip_version", Field::U16(4)),
            ("languages", Field::Array(vec![Field::Str("en")])),
            ("node_count", Field::U32(node_count as u32)),
            ("record_size", Field::U16(24)),
        ])
        .encode(&mut out);

        out
    }

    pub fn write(&self) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&self.to_bytes()).unwrap();
        file.flush().unwrap();
        file
    }
}
