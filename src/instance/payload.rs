//! Wire shape of [`ServiceInstance::payload`](super::ServiceInstance).
//!
//! Written as a standard base64 string, or `null` when empty. Read from
//! `null`, a base64 string, or a JSON array of byte values, which covers
//! records written by Curator-style clients as well as older records of
//! this crate.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use serde::de;
use serde::Deserializer;
use serde::Serializer;

pub(super) fn serialize<S>(
    payload: &Bytes,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if payload.is_empty() {
        serializer.serialize_none()
    } else {
        serializer.serialize_str(&STANDARD.encode(payload))
    }
}

pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Bytes, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(PayloadVisitor)
}

struct PayloadVisitor;

impl<'de> de::Visitor<'de> for PayloadVisitor {
    type Value = Bytes;

    fn expecting(
        &self,
        f: &mut fmt::Formatter,
    ) -> fmt::Result {
        f.write_str("null, a base64 string or an array of bytes")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Bytes, E> {
        Ok(Bytes::new())
    }

    fn visit_none<E: de::Error>(self) -> Result<Bytes, E> {
        Ok(Bytes::new())
    }

    fn visit_some<D>(
        self,
        deserializer: D,
    ) -> Result<Bytes, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }

    fn visit_str<E: de::Error>(
        self,
        value: &str,
    ) -> Result<Bytes, E> {
        STANDARD
            .decode(value)
            .map(Bytes::from)
            .map_err(|e| E::custom(format!("invalid base64 payload: {e}")))
    }

    fn visit_bytes<E: de::Error>(
        self,
        value: &[u8],
    ) -> Result<Bytes, E> {
        Ok(Bytes::copy_from_slice(value))
    }

    fn visit_seq<A>(
        self,
        mut seq: A,
    ) -> Result<Bytes, A::Error>
    where
        A: de::SeqAccess<'de>,
    {
        let mut data = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(byte) = seq.next_element::<u8>()? {
            data.push(byte);
        }
        Ok(Bytes::from(data))
    }
}
