//! Optional trailing fields and extension splicing shared by carriers.

use keel_codec::{is_absent_marker, CodecError, Decodable, Encodable, Kind, ListEncoder, Stream};

use crate::extras::{CarrierKind, ExtraPayload, Registry};

/// An optional carrier field, encoded up front if present.
pub(crate) struct Optional {
    kind: Kind,
    encoded: Option<Vec<u8>>,
}

impl Optional {
    pub(crate) fn scalar<T: Encodable>(value: Option<&T>) -> Self {
        Self {
            kind: Kind::String,
            encoded: value.map(keel_codec::encode),
        }
    }

    pub(crate) fn list<T: Encodable>(value: Option<&T>) -> Self {
        Self {
            kind: Kind::List,
            encoded: value.map(keel_codec::encode),
        }
    }
}

/// Writes the optional tail and the extension fields, then closes the list.
///
/// Trailing absent fields are dropped. When the extension writes anything the
/// whole tail is written, absent entries as absent markers, so extension
/// items always start at the same position.
pub(crate) fn finish_with_extras(
    mut list: ListEncoder,
    tail: &[Optional],
    extras: &ExtraPayload,
    out: &mut Vec<u8>,
) {
    let mut extra_fields = ListEncoder::new();
    extras.encode_fields(&mut extra_fields);

    let written = if extra_fields.is_empty() {
        tail.iter()
            .rposition(|f| f.encoded.is_some())
            .map_or(0, |i| i + 1)
    } else {
        tail.len()
    };
    for field in &tail[..written] {
        match &field.encoded {
            Some(encoded) => list.push_raw(encoded),
            None => list.push_absent(field.kind),
        };
    }
    list.push_raw(extra_fields.payload());
    list.finish_into(out);
}

/// Reads an optional tail and the extension fields after it, rejecting
/// layouts [`finish_with_extras`] never writes.
#[derive(Debug, Default)]
pub(crate) struct TailReader {
    /// The last tail item read was an absent marker.
    dangling_marker: bool,
}

impl TailReader {
    /// Reads an optional field: absent at the end of the list or on an
    /// absent marker.
    pub(crate) fn optional<T: Decodable>(
        &mut self,
        rest: &mut Stream<'_>,
        kind: Kind,
    ) -> Result<Option<T>, CodecError> {
        if rest.is_empty() {
            return Ok(None);
        }
        if is_absent_marker(rest, kind)? {
            rest.raw()?;
            self.dangling_marker = true;
            return Ok(None);
        }
        self.dangling_marker = false;
        rest.decode().map(Some)
    }

    /// Hands what is left to the payload `registry` binds to `kind`.
    ///
    /// Absent markers are only written ahead of a present field or of
    /// extension fields, so a marker followed by nothing is rejected.
    pub(crate) fn extras(
        self,
        registry: &Registry,
        kind: CarrierKind,
        rest: &mut Stream<'_>,
    ) -> Result<ExtraPayload, CodecError> {
        let before = rest.remaining().len();
        let extras = registry.decode_extras(kind, rest)?;
        let consumed = rest.remaining().len() != before;
        if self.dangling_marker && !consumed && rest.is_empty() {
            return Err(CodecError::RedundantField);
        }
        Ok(extras)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;
    use hex_literal::hex;

    fn finish(tail: &[Optional], extras: &ExtraPayload) -> Vec<u8> {
        let mut list = ListEncoder::new();
        list.push(&1u64);
        let mut out = Vec::new();
        finish_with_extras(list, tail, extras, &mut out);
        out
    }

    #[test]
    fn trailing_absent_fields_are_dropped() {
        let tail = [
            Optional::scalar(Some(&U256::from(7u64))),
            Optional::scalar(None::<&u64>),
        ];
        assert_eq!(finish(&tail, &ExtraPayload::default()), hex!("c20107"));
    }

    #[test]
    fn interior_absent_fields_use_markers() {
        let tail = [
            Optional::scalar(None::<&u64>),
            Optional::list(None::<&Vec<u64>>),
            Optional::scalar(Some(&0u64)),
        ];
        assert_eq!(finish(&tail, &ExtraPayload::default()), hex!("c401c08080"));
    }

    #[test]
    fn extension_forces_full_tail() {
        let tail = [Optional::scalar(None::<&u64>), Optional::list(None::<&Vec<u64>>)];
        let extras = ExtraPayload::new(true);
        assert_eq!(finish(&tail, &extras), hex!("c401c08001"));
        assert_eq!(finish(&tail, &ExtraPayload::new(false)), hex!("c101"));
    }

    fn read_tail(bytes: &[u8], kinds: &[Kind]) -> Result<Vec<Option<u64>>, CodecError> {
        let mut s = Stream::new(bytes);
        let mut tail = TailReader::default();
        let mut values = Vec::new();
        for kind in kinds {
            values.push(tail.optional::<u64>(&mut s, *kind)?);
        }
        tail.extras(&Registry::empty(), CarrierKind::Header, &mut s)?;
        s.finish()?;
        Ok(values)
    }

    #[test]
    fn optional_decoding() {
        let bytes = hex!("c08080");
        let mut s = Stream::new(&bytes);
        let mut tail = TailReader::default();
        assert_eq!(tail.optional::<u64>(&mut s, Kind::String), Ok(None));
        assert_eq!(tail.optional::<Vec<u64>>(&mut s, Kind::List), Ok(None));
        assert_eq!(tail.optional::<u64>(&mut s, Kind::String), Ok(Some(0)));
        assert_eq!(tail.optional::<u64>(&mut s, Kind::String), Ok(None));
        assert!(tail
            .extras(&Registry::empty(), CarrierKind::Header, &mut s)
            .is_ok());
    }

    #[test]
    fn marker_before_present_field_is_accepted() {
        let kinds = [Kind::String, Kind::String];
        assert_eq!(read_tail(&hex!("c007"), &kinds), Ok(vec![None, Some(7)]));
    }

    #[test]
    fn trailing_marker_is_rejected() {
        let kinds = [Kind::String, Kind::String];
        assert_eq!(read_tail(&hex!("07c0"), &kinds), Err(CodecError::RedundantField));
    }

    #[test]
    fn markers_with_nothing_after_them_are_rejected() {
        let kinds = [Kind::String, Kind::String, Kind::String];
        assert_eq!(read_tail(&hex!("c0c0"), &kinds), Err(CodecError::RedundantField));
        assert_eq!(read_tail(&hex!("c0"), &kinds), Err(CodecError::RedundantField));
    }

    #[test]
    fn markers_ahead_of_extension_fields_are_accepted() {
        let registry = Registry::builder()
            .register::<crate::Header, bool>()
            .unwrap()
            .finalize();
        let bytes = hex!("c0c001");
        let mut s = Stream::new(&bytes);
        let mut tail = TailReader::default();
        assert_eq!(tail.optional::<u64>(&mut s, Kind::String), Ok(None));
        assert_eq!(tail.optional::<u64>(&mut s, Kind::String), Ok(None));
        let extras = tail.extras(&registry, CarrierKind::Header, &mut s).unwrap();
        assert_eq!(extras.downcast_ref::<bool>(), Some(&true));
        assert!(s.is_empty());
    }
}
