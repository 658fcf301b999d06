use crate::{NdefError, header::NdefHeader, ndef_type::NdefType, record::NdefRecord};

/// Serialize records into a single NDEF message
///
/// An empty slice serializes to the single empty record NFC Forum uses for an
/// empty message.
pub fn encode_message(records: &[NdefRecord]) -> Result<Vec<u8>, NdefError> {
    if records.is_empty() {
        let empty = NdefRecord::new(NdefType::Empty, Vec::new(), Vec::new());
        return encode_message(std::slice::from_ref(&empty));
    }

    let last = records.len() - 1;
    let mut message = Vec::new();

    for (index, record) in records.iter().enumerate() {
        encode_record(record, index == 0, index == last, &mut message)?;
    }

    Ok(message)
}

fn encode_record(
    record: &NdefRecord,
    message_begin: bool,
    message_end: bool,
    out: &mut Vec<u8>,
) -> Result<(), NdefError> {
    let type_length = u8::try_from(record.type_.len())
        .map_err(|_| NdefError::FieldTooLong { field: "type", length: record.type_.len() })?;

    let id_length = match &record.id {
        Some(id) => Some(
            u8::try_from(id.len())
                .map_err(|_| NdefError::FieldTooLong { field: "id", length: id.len() })?,
        ),
        None => None,
    };

    let payload_length = u32::try_from(record.payload.len()).map_err(|_| {
        NdefError::FieldTooLong { field: "payload", length: record.payload.len() }
    })?;

    let header = NdefHeader {
        message_begin,
        message_end,
        chunked: false,
        short_record: payload_length <= u8::MAX as u32,
        has_id_length: id_length.is_some(),
        type_name_format: record.type_name_format,
        type_length,
        payload_length,
        id_length,
    };

    out.push(header.flags_byte());
    out.push(header.type_length);

    if header.short_record {
        out.push(payload_length as u8);
    } else {
        out.extend_from_slice(&payload_length.to_be_bytes());
    }

    if let Some(id_length) = header.id_length {
        out.push(id_length);
    }

    out.extend_from_slice(&record.type_);
    if let Some(id) = &record.id {
        out.extend_from_slice(id);
    }
    out.extend_from_slice(&record.payload);

    Ok(())
}
