pub mod stream;

use stream::{Stream, remaining};
use winnow::{
    ModalResult, Parser,
    binary::{
        Endianness,
        bits::{bits, bool as take_bool, take as take_bits},
    },
    error::{ContextError, ErrMode},
    token::{any, take},
};

use crate::{NdefError, header::NdefHeader, ndef_type::NdefType, record::NdefRecord};

/// Parse a complete serialized NDEF message
///
/// Parsing stops after the record carrying the message end flag, or when the
/// input runs out on a record boundary. Empty input is an empty message.
pub fn parse_message(bytes: &[u8]) -> Result<Vec<NdefRecord>, NdefError> {
    let mut input = stream::new(bytes);
    let mut records = Vec::new();

    while remaining(&input) > 0 {
        let (header, record) = parse_ndef_record(&mut input)?;
        records.push(record);

        if header.message_end {
            break;
        }
    }

    let trailing = remaining(&input);
    if trailing > 0 {
        tracing::debug!("ignoring {trailing} trailing bytes after message end");
    }

    Ok(records)
}

pub fn parse_ndef_record(input: &mut Stream<'_>) -> ModalResult<(NdefHeader, NdefRecord)> {
    let header = parse_header.parse_next(input)?;
    let type_ = parse_type(input, header.type_length)?;
    let id = parse_id(input, header.id_length)?;
    let payload = parse_payload(input, header.payload_length)?;

    let record = NdefRecord { type_name_format: header.type_name_format, type_, id, payload };
    Ok((header, record))
}

// private
fn parse_header_byte(input: &mut Stream<'_>) -> ModalResult<(bool, bool, bool, bool, bool, u8)> {
    bits::<_, _, ErrMode<ContextError>, _, _>((
        take_bool,
        take_bool,
        take_bool,
        take_bool,
        take_bool,
        take_bits(3_u8),
    ))
    .parse_next(input)
}

fn parse_header(input: &mut Stream<'_>) -> ModalResult<NdefHeader> {
    let (message_begin, message_end, chunked, short_record, has_id_length, type_name_format) =
        parse_header_byte(input)?;

    let type_length = winnow::binary::u8.parse_next(input)?;

    let payload_length = if short_record {
        any.map(|x: u8| x as u32).parse_next(input)?
    } else {
        winnow::binary::u32(Endianness::Big).parse_next(input)?
    };

    let id_length = if has_id_length { Some(any.parse_next(input)?) } else { None };

    Ok(NdefHeader {
        message_begin,
        message_end,
        chunked,
        short_record,
        has_id_length,
        type_name_format: NdefType::from_bits(type_name_format),
        type_length,
        payload_length,
        id_length,
    })
}

fn parse_type(input: &mut Stream<'_>, type_length: u8) -> ModalResult<Vec<u8>> {
    take(type_length as usize).map(|s: &[u8]| s.to_vec()).parse_next(input)
}

fn parse_id(input: &mut Stream<'_>, id_length: Option<u8>) -> ModalResult<Option<Vec<u8>>> {
    if let Some(id_len) = id_length {
        take(id_len as usize).map(|s: &[u8]| Some(s.to_vec())).parse_next(input)
    } else {
        Ok(None)
    }
}

fn parse_payload(input: &mut Stream<'_>, payload_length: u32) -> ModalResult<Vec<u8>> {
    take(payload_length as usize).map(|s: &[u8]| s.to_vec()).parse_next(input)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::payload::{NdefPayload, decode_uri};

    // "https://www.example.com" as a short Well-Known URI record
    const URI_MESSAGE: &[u8] = &[
        0xD1, 0x01, 0x0D, 0x55, 0x02, b'e', b'x', b'a', b'm', b'p', b'l', b'e', b'.', b'c', b'o',
        b'm', b'/',
    ];

    #[test]
    fn known_header_parse() {
        let mut header_bytes = stream::new(&[0xD1, 0x01, 0x0D, 0x55, 0x02]);
        let header: NdefHeader = parse_header(&mut header_bytes).unwrap();

        assert!(header.message_begin);
        assert!(header.message_end);
        assert!(!header.chunked);
        assert!(header.short_record);
        assert!(!header.has_id_length);
        assert_eq!(header.type_name_format, NdefType::WellKnown);
        assert_eq!(header.type_length, 1);
        assert_eq!(header.payload_length, 13);
        assert_eq!(header.flags_byte(), 0xD1);
    }

    #[test]
    fn parse_single_uri_record() {
        let records = parse_message(URI_MESSAGE).unwrap();
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.type_, b"U");
        assert_eq!(record.id, None);
        assert_eq!(decode_uri(&record.payload), "https://www.example.com/");
        assert_eq!(
            record.decoded_payload(),
            NdefPayload::Uri("https://www.example.com/".to_string())
        );
    }

    #[test]
    fn parse_long_record_with_id() {
        // MB | ME | IL, TNF mime, 4 byte payload length
        let mut bytes = vec![0xC0 | 0x08 | 0x02, 0x0A, 0x00, 0x00, 0x00, 0x02, 0x01];
        bytes.extend_from_slice(b"text/plain");
        bytes.push(b'7');
        bytes.extend_from_slice(b"ok");

        let records = parse_message(&bytes).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].type_name_format, NdefType::Mime);
        assert_eq!(records[0].type_string(), "text/plain");
        assert_eq!(records[0].id, Some(b"7".to_vec()));
        assert_eq!(records[0].payload, b"ok");
    }

    #[test]
    fn parse_stops_at_message_end() {
        let mut bytes = URI_MESSAGE.to_vec();
        bytes.extend_from_slice(&[0x00, 0x00, 0xFE]);

        let records = parse_message(&bytes).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn truncated_message_is_incomplete() {
        let result = parse_message(&URI_MESSAGE[..8]);
        assert!(matches!(result, Err(NdefError::Incomplete { .. })));
    }

    #[test]
    fn empty_input_is_empty_message() {
        assert_eq!(parse_message(&[]).unwrap(), vec![]);
    }
}
